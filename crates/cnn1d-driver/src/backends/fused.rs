// SPDX-License-Identifier: AGPL-3.0-only

//! Fused kernel as an [`InferenceBackend`].

use crate::backend::{BackendType, InferenceBackend};
use crate::error::Result;
use crate::kernel::Cnn1dKernel;
use cnn1d_ip::Dims;

/// The streaming kernel, driven with in-memory vectors.
#[derive(Debug, Clone)]
pub struct FusedBackend {
    kernel: Cnn1dKernel,
}

impl FusedBackend {
    /// Wrap a kernel.
    pub fn new(kernel: Cnn1dKernel) -> Self {
        Self { kernel }
    }

    /// Underlying kernel.
    pub const fn kernel(&self) -> &Cnn1dKernel {
        &self.kernel
    }
}

impl InferenceBackend for FusedBackend {
    fn dims(&self) -> Dims {
        self.kernel.dims()
    }

    fn infer(&self, input: &[f32]) -> Result<Vec<f32>> {
        Ok(self.kernel.infer(input)?.into_vec())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Fused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{ConvLayer, DenseLayer, Tables};
    use std::sync::Arc;

    fn backend() -> FusedBackend {
        let dims = Dims::new(2, 1, 1);
        let tables = Tables::new(
            dims,
            ConvLayer {
                weights: vec![[0.0, 1.0, 0.0]],
                bias: vec![0.0],
            },
            DenseLayer {
                weights: vec![1.0, 1.0],
                bias: vec![0.5],
            },
        )
        .unwrap();
        FusedBackend::new(Cnn1dKernel::new(Arc::new(tables)))
    }

    #[test]
    fn identity_conv_sums_positive_inputs() {
        let b = backend();
        assert_eq!(b.infer(&[1.0, 2.0]).unwrap(), vec![3.5]);
        // negative sample clamped by ReLU
        assert_eq!(b.infer(&[-4.0, 2.0]).unwrap(), vec![2.5]);
    }

    #[test]
    fn backend_type_is_fused() {
        assert_eq!(backend().backend_type(), BackendType::Fused);
        assert_eq!(backend().dims(), Dims::new(2, 1, 1));
    }
}
