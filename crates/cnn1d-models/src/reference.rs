//! Unfused reference model
//!
//! Evaluates the network the textbook way: materialise the whole
//! activation map in f64, then run the dense layer over it. Used to check
//! the fused f32 kernel and never on a serving path.

use crate::error::Result;
use cnn1d_driver::{BackendType, Cnn1dError, InferenceBackend, Tables};
use cnn1d_ip::{Dims, KERNEL_WIDTH};
use std::sync::Arc;

/// Default relative tolerance for fused-versus-reference checks
pub const DEFAULT_REL_TOLERANCE: f64 = 1e-5;

/// Default absolute tolerance for fused-versus-reference checks
pub const DEFAULT_ABS_TOLERANCE: f64 = 1e-5;

/// f64 unfused evaluator over the same tables as the kernel
#[derive(Debug, Clone)]
pub struct ReferenceModel {
    tables: Arc<Tables>,
}

impl ReferenceModel {
    /// Wrap shared tables.
    pub fn new(tables: Arc<Tables>) -> Self {
        Self { tables }
    }

    /// Convolution + ReLU output for every position, flattened `t·F + f`.
    ///
    /// # Errors
    ///
    /// Returns error if `input.len() != D_IN`.
    pub fn activation_map(&self, input: &[f32]) -> std::result::Result<Vec<f64>, Cnn1dError> {
        let dims = self.tables.dims();
        if input.len() != dims.d_in {
            return Err(Cnn1dError::dimension_mismatch(
                "input vector",
                input.len(),
                dims.d_in,
            ));
        }
        let conv = self.tables.conv();
        let x = |i: isize| -> f64 {
            usize::try_from(i)
                .ok()
                .and_then(|i| input.get(i))
                .map_or(0.0, |&v| f64::from(v))
        };

        let mut map = Vec::with_capacity(dims.activation_map_len());
        for t in 0..dims.d_in {
            for (w, &b) in conv.weights.iter().zip(&conv.bias) {
                let mut v = f64::from(b);
                for (k, &wk) in w.iter().enumerate() {
                    #[allow(clippy::cast_possible_wrap)]
                    let offset = (t + k) as isize - (KERNEL_WIDTH / 2) as isize;
                    v += f64::from(wk) * x(offset);
                }
                map.push(if v < 0.0 { 0.0 } else { v });
            }
        }
        Ok(map)
    }

    /// Full forward pass in f64.
    ///
    /// # Errors
    ///
    /// Returns error if `input.len() != D_IN`.
    pub fn forward(&self, input: &[f32]) -> std::result::Result<Vec<f64>, Cnn1dError> {
        let dims = self.tables.dims();
        let map = self.activation_map(input)?;
        let dense = self.tables.dense();

        let mut logits: Vec<f64> = dense.bias.iter().copied().map(f64::from).collect();
        for (row, &a) in map.iter().enumerate() {
            let weights = &dense.weights[row * dims.classes..(row + 1) * dims.classes];
            for (l, &w) in logits.iter_mut().zip(weights) {
                *l += a * f64::from(w);
            }
        }
        Ok(logits)
    }
}

impl InferenceBackend for ReferenceModel {
    fn dims(&self) -> Dims {
        self.tables.dims()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn infer(&self, input: &[f32]) -> cnn1d_driver::Result<Vec<f32>> {
        Ok(self.forward(input)?.into_iter().map(|v| v as f32).collect())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Reference
    }
}

/// Worst-case deviation of fused logits from the reference
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParityReport {
    /// Largest absolute difference seen
    pub max_abs: f64,

    /// Largest difference relative to `max(|reference|, 1)`
    pub max_rel: f64,

    /// Number of logits compared
    pub compared: usize,
}

impl ParityReport {
    /// Compare one vector of fused logits with reference logits.
    pub fn compare(fused: &[f32], reference: &[f64]) -> Self {
        let mut report = Self::default();
        report.record(fused, reference);
        report
    }

    /// Fold another comparison into this report.
    pub fn record(&mut self, fused: &[f32], reference: &[f64]) {
        if fused.len() != reference.len() {
            self.max_abs = f64::INFINITY;
            self.max_rel = f64::INFINITY;
        }
        for (&f, &r) in fused.iter().zip(reference) {
            let mut abs = (f64::from(f) - r).abs();
            if abs.is_nan() {
                abs = if f.is_nan() && r.is_nan() { 0.0 } else { f64::INFINITY };
            }
            let rel = abs / r.abs().max(1.0);
            self.max_abs = self.max_abs.max(abs);
            self.max_rel = self.max_rel.max(rel);
            self.compared += 1;
        }
    }

    /// True if every logit is within `abs` absolutely or `rel` relatively.
    pub fn within(&self, rel: f64, abs: f64) -> bool {
        self.max_abs <= abs || self.max_rel <= rel
    }
}

/// Run every input through both backends and report the worst deviation.
///
/// # Errors
///
/// Returns the first backend error.
pub fn compare_backends(
    fused: &dyn InferenceBackend,
    reference: &ReferenceModel,
    inputs: &[Vec<f32>],
) -> Result<ParityReport> {
    let mut report = ParityReport::default();
    for input in inputs {
        let got = fused.infer(input)?;
        let want = reference.forward(input)?;
        report.record(&got, &want);
    }
    tracing::debug!(
        "parity over {} inputs: max_abs={:.3e} max_rel={:.3e}",
        inputs.len(),
        report.max_abs,
        report.max_rel
    );
    Ok(report)
}
