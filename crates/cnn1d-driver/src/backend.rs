//! Backend abstraction
//!
//! Lets the fused kernel and an unfused reference be driven and compared
//! through one interface.

use crate::error::Result;
use cnn1d_ip::Dims;
use std::fmt::Debug;

/// Anything that maps an input vector to per-class logits.
pub trait InferenceBackend: Debug + Send + Sync {
    /// Model dimensions.
    fn dims(&self) -> Dims;

    /// Run one input vector.
    ///
    /// # Errors
    ///
    /// Returns error if the input length differs from `D_IN`.
    fn infer(&self, input: &[f32]) -> Result<Vec<f32>>;

    /// Backend type for reporting.
    fn backend_type(&self) -> BackendType;
}

/// Backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Fused streaming kernel (f32, fixed summation order)
    Fused,

    /// Unfused reference (f64, full activation map)
    Reference,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fused => write!(f, "Fused"),
            Self::Reference => write!(f, "Reference (unfused f64)"),
        }
    }
}
