//! Channel-driven inference with timing
//!
//! Runs one kernel call the way a host sees it: input words pushed into a
//! bounded channel, the kernel on its own thread, output words collected
//! and checked for framing on the far side.

use crate::error::{Cnn1dError, Result};
use crate::io::frame_vector;
use crate::kernel::Cnn1dKernel;
use bytes::{BufMut, Bytes, BytesMut};
use cnn1d_ip::{Dims, StreamWord};
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Executor configuration
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Depth of each word channel; small depths exercise backpressure.
    pub channel_depth: usize,

    /// Wall-clock limit for the whole call (ms). `None` blocks until the
    /// kernel finishes.
    pub timeout_ms: Option<u64>,
}

impl InferenceConfig {
    /// Configuration sized from the model, with no timeout.
    pub fn for_dims(dims: &Dims) -> Self {
        let channel_depth = dims.d_in.max(dims.classes).max(1);
        debug!("Inference config: {dims}, depth {channel_depth}");
        Self {
            channel_depth,
            timeout_ms: None,
        }
    }

    /// Override the channel depth (at least one word).
    #[must_use]
    pub fn with_channel_depth(mut self, depth: usize) -> Self {
        self.channel_depth = depth.max(1);
        self
    }

    /// Give up on the call after `timeout_ms` milliseconds.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Inference executor
#[derive(Debug, Clone)]
pub struct InferenceExecutor {
    kernel: Cnn1dKernel,
    config: InferenceConfig,
}

impl InferenceExecutor {
    /// Executor for `kernel` with a configuration derived from its dimensions.
    pub fn new(kernel: Cnn1dKernel) -> Self {
        let config = InferenceConfig::for_dims(&kernel.dims());
        Self::with_config(kernel, config)
    }

    /// Executor with an explicit configuration.
    pub fn with_config(kernel: Cnn1dKernel, config: InferenceConfig) -> Self {
        info!(
            "Creating inference executor ({}, depth {})",
            kernel.schedule().describe(),
            config.channel_depth
        );
        Self { kernel, config }
    }

    /// Run one vector through the kernel over word channels.
    ///
    /// The kernel runs on its own thread. Without a timeout the call blocks
    /// until the kernel finishes the message. With one, the call returns
    /// [`Cnn1dError::Timeout`] once the deadline passes; the kernel thread is
    /// left to finish on its own and its output is discarded.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `input.len()` differs from `D_IN` (checked host-side before sending)
    /// - the configured timeout expires before the full message arrives
    /// - the kernel fails or the output message is not framed correctly
    pub fn infer(&self, input: &[f32]) -> Result<InferenceResult> {
        let dims = self.kernel.dims();
        if input.len() != dims.d_in {
            return Err(Cnn1dError::dimension_mismatch("input vector", input.len(), dims.d_in));
        }
        let depth = self.config.channel_depth;

        let start = Instant::now();
        let deadline = self
            .config
            .timeout_ms
            .map(|ms| start + Duration::from_millis(ms));

        let (in_tx, mut in_rx) = bounded::<StreamWord>(depth);
        let (mut out_tx, out_rx) = bounded::<StreamWord>(depth);
        let kernel = self.kernel.clone();
        let worker = thread::Builder::new()
            .name("cnn1d-kernel".into())
            .spawn(move || kernel.invoke(&mut in_rx, &mut out_tx))
            .map_err(|e| Cnn1dError::invalid_state(format!("cannot spawn kernel thread: {e}")))?;

        for word in frame_vector(input) {
            if in_tx.send(word).is_err() {
                // Kernel gave up reading; its own error explains why.
                break;
            }
        }
        drop(in_tx);
        let input_transfer_duration = start.elapsed();

        let mut words = Vec::with_capacity(dims.classes);
        while words.len() < dims.classes {
            let received = match deadline {
                Some(d) => out_rx.recv_deadline(d),
                None => out_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(w) => words.push(w),
                Err(RecvTimeoutError::Timeout) => {
                    let duration_ms = self.config.timeout_ms.unwrap_or_default();
                    warn!("Inference timed out after {duration_ms}ms");
                    return Err(Cnn1dError::Timeout { duration_ms });
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        worker
            .join()
            .map_err(|_| Cnn1dError::invalid_state("kernel thread panicked"))??;
        let total_duration = start.elapsed();

        check_framing(&words, dims.classes)?;

        let mut raw = BytesMut::with_capacity(words.len() * 4);
        for w in &words {
            raw.put_u32_le(w.data);
        }
        let logits: Vec<f32> = words.iter().map(StreamWord::value).collect();

        debug!("Inference complete in {total_duration:?}");

        Ok(InferenceResult {
            logits,
            words,
            output: raw.freeze(),
            input_transfer_duration,
            total_duration,
        })
    }

    /// Kernel being driven.
    pub const fn kernel(&self) -> &Cnn1dKernel {
        &self.kernel
    }

    /// Executor configuration.
    pub const fn config(&self) -> &InferenceConfig {
        &self.config
    }
}

/// Check that `words` is exactly one message of `expected` words with the
/// end-of-message flag on the last word and nowhere else.
///
/// # Errors
///
/// Returns [`Cnn1dError::Framing`] describing the first violation.
pub fn check_framing(words: &[StreamWord], expected: usize) -> Result<()> {
    if words.len() != expected {
        return Err(Cnn1dError::framing(format!(
            "got {} words, expected {expected}",
            words.len()
        )));
    }
    if let Some(i) = words.iter().rev().skip(1).position(|w| w.last) {
        return Err(Cnn1dError::framing(format!(
            "end-of-message flag on word {} of {expected}",
            expected - 2 - i
        )));
    }
    match words.last() {
        Some(w) if !w.last => Err(Cnn1dError::framing("final word lacks end-of-message flag")),
        _ => Ok(()),
    }
}

/// Inference result with metrics
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// Logits decoded from the output words, in class order
    pub logits: Vec<f32>,

    /// Output words as received, end-of-message flags included
    pub words: Vec<StreamWord>,

    /// Output word data as little-endian bytes
    pub output: Bytes,

    /// Time to push every input word into the channel
    pub input_transfer_duration: Duration,

    /// First input word to last output word
    pub total_duration: Duration,
}

impl InferenceResult {
    /// Calculate throughput (inferences per second)
    pub fn throughput_ips(&self) -> f64 {
        if self.total_duration.as_secs_f64() == 0.0 {
            return 0.0;
        }
        1.0 / self.total_duration.as_secs_f64()
    }

    /// Calculate latency in microseconds
    pub fn latency_us(&self) -> f64 {
        self.total_duration.as_secs_f64() * 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{ConvLayer, DenseLayer, Tables};
    use std::sync::Arc;

    fn kernel(dims: Dims) -> Cnn1dKernel {
        let conv = ConvLayer {
            weights: (0..dims.conv_out)
                .map(|f| [0.1 * f as f32, 0.5, -0.2])
                .collect(),
            bias: vec![0.05; dims.conv_out],
        };
        let dense = DenseLayer {
            weights: (0..dims.dense_weight_len())
                .map(|i| ((i % 5) as f32 - 2.0) * 0.25)
                .collect(),
            bias: (0..dims.classes).map(|c| c as f32).collect(),
        };
        Cnn1dKernel::new(Arc::new(Tables::new(dims, conv, dense).unwrap()))
    }

    #[test]
    fn channel_run_matches_direct_call() {
        let k = kernel(Dims::new(6, 3, 4));
        let x = [0.3, -0.1, 0.8, 1.5, -0.6, 0.2];
        let direct = k.infer(&x).unwrap().to_bits();
        let result = InferenceExecutor::new(k).infer(&x).unwrap();
        let bits: Vec<u32> = result.logits.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits, direct);
        assert_eq!(result.output.len(), 16);
        assert_eq!(&result.output[0..4], &direct[0].to_le_bytes());
    }

    #[test]
    fn depth_one_channels_still_complete() {
        let k = kernel(Dims::new(8, 2, 5));
        let x = [1.0; 8];
        let expected = k.infer(&x).unwrap().into_vec();
        let cfg = InferenceConfig::for_dims(&k.dims()).with_channel_depth(1);
        let result = InferenceExecutor::with_config(k, cfg).infer(&x).unwrap();
        assert_eq!(result.logits, expected);
        assert!(result.latency_us() >= 0.0);
    }

    #[test]
    fn wrong_length_rejected_before_sending() {
        let exec = InferenceExecutor::new(kernel(Dims::new(4, 1, 2)));
        assert!(matches!(
            exec.infer(&[1.0, 2.0]),
            Err(Cnn1dError::DimensionMismatch { got: 2, expected: 4, .. })
        ));
    }

    #[test]
    fn framing_checker() {
        let good = frame_vector(&[1.0, 2.0, 3.0]);
        assert!(check_framing(&good, 3).is_ok());
        assert!(check_framing(&good, 4).is_err());

        let mut early = good.clone();
        early[0].last = true;
        assert!(check_framing(&early, 3).is_err());

        let mut missing = good;
        missing[2].last = false;
        assert!(check_framing(&missing, 3).is_err());

        assert!(check_framing(&[], 0).is_ok());
    }

    /// Delegates to `Sequential` after stalling for a fixed time.
    #[derive(Debug)]
    struct Stalled(Duration);

    impl crate::schedule::Schedule for Stalled {
        fn mul_budget(&self) -> usize {
            1
        }

        fn lanes(&self) -> usize {
            1
        }

        fn dispatch(&self, logits: &mut [f32], band: &crate::schedule::Band<'_>) {
            thread::sleep(self.0);
            band(0, logits);
        }

        fn describe(&self) -> String {
            format!("stalled {:?}", self.0)
        }
    }

    #[test]
    fn no_timeout_by_default() {
        let k = kernel(Dims::new(4, 1, 2));
        assert_eq!(InferenceExecutor::new(k).config().timeout_ms, None);
    }

    #[test]
    fn slow_call_completes_under_default_config() {
        let k = kernel(Dims::new(6, 3, 4));
        let x = [0.3, -0.1, 0.8, 1.5, -0.6, 0.2];
        let expected = k.infer(&x).unwrap().to_bits();
        let slow = k.with_schedule(Stalled(Duration::from_millis(300)));
        let result = InferenceExecutor::new(slow).infer(&x).unwrap();
        let bits: Vec<u32> = result.logits.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits, expected);
        assert!(result.total_duration >= Duration::from_millis(300));
    }

    #[test]
    fn large_model_completes_under_default_config() {
        let k = kernel(Dims::new(1024, 64, 64));
        let x: Vec<f32> = (0..1024).map(|t| (t as f32 * 0.01).sin()).collect();
        let expected = k.infer(&x).unwrap().into_vec();
        let result = InferenceExecutor::new(k).infer(&x).unwrap();
        assert_eq!(result.logits, expected);
    }

    #[test]
    fn timeout_returns_before_kernel_finishes() {
        let stall = Duration::from_secs(3);
        let k = kernel(Dims::new(4, 1, 2)).with_schedule(Stalled(stall));
        let cfg = InferenceConfig::for_dims(&k.dims()).with_timeout_ms(50);
        let exec = InferenceExecutor::with_config(k, cfg);

        let t0 = Instant::now();
        let err = exec.infer(&[1.0, 2.0, 3.0, 4.0]).unwrap_err();
        assert!(matches!(err, Cnn1dError::Timeout { duration_ms: 50 }));
        assert!(t0.elapsed() < stall / 2, "waited {:?}", t0.elapsed());
    }

    #[test]
    fn generous_timeout_does_not_fire() {
        let k = kernel(Dims::new(6, 3, 4));
        let cfg = InferenceConfig::for_dims(&k.dims()).with_timeout_ms(60_000);
        let result = InferenceExecutor::with_config(k, cfg)
            .infer(&[0.0; 6])
            .unwrap();
        assert_eq!(result.logits.len(), 4);
    }

    #[test]
    fn received_flags_are_kept() {
        let k = kernel(Dims::new(6, 3, 4));
        let result = InferenceExecutor::new(k).infer(&[1.0; 6]).unwrap();
        let flags: Vec<bool> = result.words.iter().map(|w| w.last).collect();
        assert_eq!(flags, vec![false, false, false, true]);
        for (w, v) in result.words.iter().zip(&result.logits) {
            assert_eq!(w.data, v.to_bits());
        }
    }
}
