//! Weight and bias tables
//!
//! Supplied once at deploy time and never mutated. The kernel shares them
//! through an `Arc`; readers need no locking.

use crate::error::{Cnn1dError, Result};
use cnn1d_ip::{Dims, KERNEL_WIDTH};
use tracing::info;

/// Convolution layer: one 3-tap kernel and one bias per filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvLayer {
    /// `[CONV1_OUT][3]`, taps ordered (previous, current, next).
    pub weights: Vec<[f32; KERNEL_WIDTH]>,
    /// `[CONV1_OUT]`
    pub bias: Vec<f32>,
}

impl ConvLayer {
    /// Build from a flat row-major `CONV1_OUT × 3` slice.
    ///
    /// # Errors
    ///
    /// Returns error if `flat` is not a whole number of 3-tap rows.
    pub fn from_flat(flat: &[f32], bias: Vec<f32>) -> Result<Self> {
        if flat.len() % KERNEL_WIDTH != 0 {
            return Err(Cnn1dError::dimension_mismatch(
                "conv weights",
                flat.len(),
                flat.len().next_multiple_of(KERNEL_WIDTH),
            ));
        }
        let weights = flat
            .chunks_exact(KERNEL_WIDTH)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Ok(Self { weights, bias })
    }
}

/// Dense layer over the flattened activation map.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    /// Row-major `(D_IN · CONV1_OUT) × CLASSES`; row `t·CONV1_OUT + f`.
    pub weights: Vec<f32>,
    /// `[CLASSES]`
    pub bias: Vec<f32>,
}

/// Complete, shape-checked parameter set for one kernel instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Tables {
    dims: Dims,
    conv: ConvLayer,
    dense: DenseLayer,
}

impl Tables {
    /// Bind tables to dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`Cnn1dError::DimensionMismatch`] naming the first table whose
    /// length disagrees with `dims`.
    pub fn new(dims: Dims, conv: ConvLayer, dense: DenseLayer) -> Result<Self> {
        let checks = [
            ("conv weights", conv.weights.len(), dims.conv_out),
            ("conv bias", conv.bias.len(), dims.conv_out),
            ("dense weights", dense.weights.len(), dims.dense_weight_len()),
            ("dense bias", dense.bias.len(), dims.classes),
        ];
        for (table, got, expected) in checks {
            if got != expected {
                return Err(Cnn1dError::dimension_mismatch(table, got, expected));
            }
        }
        info!("Tables bound: {dims} ({} parameters)", dims.parameter_count());
        Ok(Self { dims, conv, dense })
    }

    /// Dimensions the tables were checked against.
    pub const fn dims(&self) -> Dims {
        self.dims
    }

    /// Convolution layer.
    pub const fn conv(&self) -> &ConvLayer {
        &self.conv
    }

    /// Dense layer.
    pub const fn dense(&self) -> &DenseLayer {
        &self.dense
    }

    /// Dense row for position `t`, filter `f`, restricted to classes
    /// `offset..offset + len`.
    #[inline]
    pub(crate) fn dense_row(&self, t: usize, f: usize, offset: usize, len: usize) -> &[f32] {
        let start = (t * self.dims.conv_out + f) * self.dims.classes + offset;
        &self.dense.weights[start..start + len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layers(dims: Dims) -> (ConvLayer, DenseLayer) {
        (
            ConvLayer {
                weights: vec![[0.0; 3]; dims.conv_out],
                bias: vec![0.0; dims.conv_out],
            },
            DenseLayer {
                weights: vec![0.0; dims.dense_weight_len()],
                bias: vec![0.0; dims.classes],
            },
        )
    }

    #[test]
    fn matching_tables_bind() {
        let dims = Dims::new(5, 2, 3);
        let (conv, dense) = layers(dims);
        let t = Tables::new(dims, conv, dense).unwrap();
        assert_eq!(t.dims(), dims);
    }

    #[test]
    fn short_dense_table_is_named() {
        let dims = Dims::new(5, 2, 3);
        let (conv, mut dense) = layers(dims);
        dense.weights.pop();
        match Tables::new(dims, conv, dense) {
            Err(Cnn1dError::DimensionMismatch { table, got, expected }) => {
                assert_eq!(table, "dense weights");
                assert_eq!(got, 29);
                assert_eq!(expected, 30);
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn conv_from_flat_groups_taps() {
        let conv = ConvLayer::from_flat(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![0.0, 0.0]).unwrap();
        assert_eq!(conv.weights, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert!(ConvLayer::from_flat(&[1.0, 2.0], vec![0.0]).is_err());
    }

    #[test]
    fn dense_row_indexing() {
        let dims = Dims::new(2, 2, 3);
        let (conv, mut dense) = layers(dims);
        dense.weights = (0..12).map(|i| i as f32).collect();
        let t = Tables::new(dims, conv, dense).unwrap();
        // row t=1,f=0 → index 2 → [6, 7, 8]
        assert_eq!(t.dense_row(1, 0, 0, 3), &[6.0, 7.0, 8.0]);
        assert_eq!(t.dense_row(1, 1, 1, 2), &[10.0, 11.0]);
    }
}
