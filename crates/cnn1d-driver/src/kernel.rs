//! Kernel invocation
//!
//! One call consumes one input vector and produces one framed logits
//! message: decode fully, sweep, then encode. The accumulator is rebuilt on
//! every call, so nothing carries over between invocations.

use crate::engine::{FusedEngine, InputVector, Logits};
use crate::error::Result;
use crate::io::{WordSink, WordSource};
use crate::schedule::{schedule_for, Schedule, Sequential};
use crate::stream::{decode_vector, encode_logits};
use crate::tables::Tables;
use cnn1d_ip::{Dims, ResourceBudget};
use std::sync::Arc;
use tracing::{debug, info};

/// The streaming kernel: shared read-only tables and a multiplier schedule.
#[derive(Debug, Clone)]
pub struct Cnn1dKernel {
    tables: Arc<Tables>,
    schedule: Arc<dyn Schedule>,
}

impl Cnn1dKernel {
    /// Kernel with a single shared multiplier.
    pub fn new(tables: Arc<Tables>) -> Self {
        info!("cnn1d kernel: {}", tables.dims());
        Self {
            tables,
            schedule: Arc::new(Sequential),
        }
    }

    /// Replace the schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: impl Schedule + 'static) -> Self {
        self.schedule = Arc::new(schedule);
        self
    }

    /// Replace the schedule with an already boxed one.
    #[must_use]
    pub fn with_boxed_schedule(mut self, schedule: Box<dyn Schedule>) -> Self {
        self.schedule = Arc::from(schedule);
        self
    }

    /// Size the schedule from a multiplier budget.
    ///
    /// # Errors
    ///
    /// Returns error if a worker pool is needed and cannot be built.
    pub fn with_budget(self, budget: ResourceBudget) -> Result<Self> {
        let schedule = schedule_for(budget, &self.tables.dims())?;
        Ok(self.with_boxed_schedule(schedule))
    }

    /// Model dimensions.
    pub fn dims(&self) -> Dims {
        self.tables.dims()
    }

    /// Shared tables.
    pub fn tables(&self) -> &Arc<Tables> {
        &self.tables
    }

    /// Active schedule.
    pub fn schedule(&self) -> &dyn Schedule {
        self.schedule.as_ref()
    }

    /// Process exactly one vector from `source` and write one message to `sink`.
    ///
    /// Blocks on input until `D_IN` words have arrived and on output while the
    /// sink applies backpressure. The first output word is written only after
    /// the whole sweep has finished.
    ///
    /// # Errors
    ///
    /// Returns error if either channel closes mid-message.
    pub fn invoke<I, O>(&self, source: &mut I, sink: &mut O) -> Result<Logits>
    where
        I: WordSource + ?Sized,
        O: WordSink + ?Sized,
    {
        let dims = self.dims();
        let input = decode_vector(source, &dims)?;
        let logits = self.sweep(&input);
        encode_logits(&logits, sink)?;
        debug!("invoke complete: {} words out", logits.len());
        Ok(logits)
    }

    /// Sweep an already decoded vector.
    pub fn sweep(&self, input: &InputVector) -> Logits {
        FusedEngine::new(&self.tables, self.schedule.as_ref()).sweep(input)
    }

    /// Run on an in-memory vector.
    ///
    /// # Errors
    ///
    /// Returns error if `input.len() != D_IN`.
    pub fn infer(&self, input: &[f32]) -> Result<Logits> {
        let input = InputVector::new(&self.dims(), input.to_vec())?;
        Ok(self.sweep(&input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::frame_vector;
    use crate::schedule::Lanes;
    use crate::tables::{ConvLayer, DenseLayer};
    use cnn1d_ip::StreamWord;
    use std::collections::VecDeque;

    fn kernel() -> Cnn1dKernel {
        let dims = Dims::new(5, 2, 3);
        let conv = ConvLayer {
            weights: vec![[0.2, 0.5, -0.1], [-0.3, 0.8, 0.4]],
            bias: vec![0.05, -0.1],
        };
        let dense = DenseLayer {
            weights: (0..dims.dense_weight_len())
                .map(|i| ((i * 7 % 11) as f32 - 5.0) * 0.1)
                .collect(),
            bias: vec![0.1, 0.2, 0.3],
        };
        Cnn1dKernel::new(Arc::new(Tables::new(dims, conv, dense).unwrap()))
    }

    #[test]
    fn invoke_frames_one_message() {
        let k = kernel();
        let mut src: VecDeque<StreamWord> = frame_vector(&[0.1, 0.9, -0.4, 1.2, 0.3]).into();
        let mut out = Vec::new();
        let logits = k.invoke(&mut src, &mut out).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.iter().filter(|w| w.last).count(), 1);
        assert!(out[2].last);
        let words: Vec<u32> = out.iter().map(|w| w.data).collect();
        assert_eq!(words, logits.to_bits());
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let k = kernel();
        let x = [0.1, 0.9, -0.4, 1.2, 0.3];
        let first = k.infer(&x).unwrap().to_bits();
        // a different vector in between must not leak into the next call
        let _ = k.infer(&[5.0, -5.0, 5.0, -5.0, 5.0]).unwrap();
        assert_eq!(k.infer(&x).unwrap().to_bits(), first);
    }

    #[test]
    fn back_to_back_vectors_on_one_channel() {
        let k = kernel().with_schedule(Lanes::new(2));
        let a = [0.1, 0.2, 0.3, 0.4, 0.5];
        let b = [1.0, 0.0, -1.0, 0.0, 1.0];
        let mut words = frame_vector(&a);
        words.extend(frame_vector(&b));
        let mut src: VecDeque<StreamWord> = words.into();
        let mut out = Vec::new();
        let la = k.invoke(&mut src, &mut out).unwrap();
        let lb = k.invoke(&mut src, &mut out).unwrap();
        assert!(src.is_empty());
        assert_eq!(la.to_bits(), k.infer(&a).unwrap().to_bits());
        assert_eq!(lb.to_bits(), k.infer(&b).unwrap().to_bits());
        let lasts: Vec<usize> = out
            .iter()
            .enumerate()
            .filter(|(_, w)| w.last)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(lasts, [2, 5]);
    }

    #[test]
    fn budget_sized_kernel_matches_sequential() {
        let seq = kernel();
        let wide = kernel().with_budget(ResourceBudget::with_mul_limit(180)).unwrap();
        let x = [0.7, -0.2, 0.0, 3.1, -1.4];
        assert_eq!(seq.infer(&x).unwrap().to_bits(), wide.infer(&x).unwrap().to_bits());
    }
}
