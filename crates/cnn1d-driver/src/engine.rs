// SPDX-License-Identifier: AGPL-3.0-only

//! Fused Conv1D → ReLU → Dense engine
//!
//! For every position `t` and filter `f` the engine computes one scalar
//! activation and folds it straight into the class logits:
//!
//! ```text
//! a        = ReLU(b[f] + w[f][0]·x[t-1] + w[f][1]·x[t] + w[f][2]·x[t+1])
//! logit[c] += a · W[t·F + f][c]          for every class c
//! ```
//!
//! The `D_IN × CONV1_OUT` activation map is never stored; only one
//! activation is live at a time.
//!
//! ## Summation order
//!
//! Position is the outer loop, filter the middle loop, class the inner loop.
//! That order is fixed, so results are reproducible bit for bit, but they are
//! only numerically close to an unfused evaluation, not identical to it.

use crate::error::{Cnn1dError, Result};
use crate::schedule::Schedule;
use crate::tables::Tables;
use crate::window::{SlidingWindow, Taps};
use cnn1d_ip::{Dims, KERNEL_WIDTH};
use tracing::debug;

/// Input vector of exactly `D_IN` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct InputVector(Vec<f32>);

impl InputVector {
    /// Wrap `values` for a model of shape `dims`.
    ///
    /// # Errors
    ///
    /// Returns error if `values.len() != dims.d_in`.
    pub fn new(dims: &Dims, values: Vec<f32>) -> Result<Self> {
        if values.len() != dims.d_in {
            return Err(Cnn1dError::dimension_mismatch(
                "input vector",
                values.len(),
                dims.d_in,
            ));
        }
        Ok(Self(values))
    }

    /// Decoder-side constructor; the word count is already exact.
    pub(crate) fn from_decoded(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Samples in index order.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Per-class running sums during a sweep.
///
/// Cannot be read; call [`finish`](Self::finish) once every `(t, f)` pair has
/// contributed.
#[derive(Debug)]
pub struct LogitsAccumulator(Vec<f32>);

impl LogitsAccumulator {
    /// Start from the dense bias.
    pub fn from_bias(bias: &[f32]) -> Self {
        Self(bias.to_vec())
    }

    fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.0
    }

    /// Seal the accumulator.
    pub fn finish(self) -> Logits {
        Logits(self.0)
    }
}

/// Final per-class logits of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Logits(Vec<f32>);

impl Logits {
    /// Scores in class order.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no classes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take the scores.
    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }

    /// Bit patterns of every score, for bit-exact comparison.
    pub fn to_bits(&self) -> Vec<u32> {
        self.0.iter().map(|v| v.to_bits()).collect()
    }
}

/// `max(v, 0)`. NaN passes through unchanged.
#[inline]
pub fn relu(v: f32) -> f32 {
    if v < 0.0 {
        0.0
    } else {
        v
    }
}

/// Convolution activation for one filter at one position.
///
/// Accumulates `((bias + w0·prev) + w1·curr) + w2·next` in that order.
#[inline]
pub fn activation(taps: Taps, weights: &[f32; KERNEL_WIDTH], bias: f32) -> f32 {
    let mut acc = bias;
    acc += taps.prev * weights[0];
    acc += taps.curr * weights[1];
    acc += taps.next * weights[2];
    relu(acc)
}

/// Numeric core: tables plus the schedule that spreads the class loop.
#[derive(Debug)]
pub struct FusedEngine<'k> {
    tables: &'k Tables,
    schedule: &'k dyn Schedule,
}

impl<'k> FusedEngine<'k> {
    /// Engine over shared tables.
    pub fn new(tables: &'k Tables, schedule: &'k dyn Schedule) -> Self {
        Self { tables, schedule }
    }

    /// Run the full sweep over one input vector.
    pub fn sweep(&self, input: &InputVector) -> Logits {
        let dims = self.tables.dims();
        let mut acc = LogitsAccumulator::from_bias(&self.tables.dense().bias);
        let lanes = self.schedule.lanes();
        let x = input.as_slice();

        debug!(
            "sweep: {dims}, schedule {}",
            self.schedule.describe()
        );

        self.schedule.dispatch(acc.as_mut_slice(), &|offset: usize, band: &mut [f32]| {
            self.sweep_band(x, offset, band, lanes);
        });

        acc.finish()
    }

    /// Sweep every position and filter, folding into `band` (classes
    /// `offset..offset + band.len()`), `lanes` classes at a time.
    fn sweep_band(&self, x: &[f32], offset: usize, band: &mut [f32], lanes: usize) {
        let conv = self.tables.conv();
        let filters = self.tables.dims().conv_out;

        for (t, taps) in SlidingWindow::new(x).enumerate() {
            for f in 0..filters {
                let a = activation(taps, &conv.weights[f], conv.bias[f]);
                let row = self.tables.dense_row(t, f, offset, band.len());
                for (lane_acc, lane_w) in band.chunks_mut(lanes).zip(row.chunks(lanes)) {
                    for (l, w) in lane_acc.iter_mut().zip(lane_w) {
                        *l += a * w;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Lanes, Sequential, WorkerPool};
    use crate::tables::{ConvLayer, DenseLayer};

    /// D_IN=4, CONV1_OUT=1, CLASSES=2 with a hand-checkable answer.
    fn tiny() -> Tables {
        Tables::new(
            Dims::new(4, 1, 2),
            ConvLayer {
                weights: vec![[0.5, -1.0, 0.5]],
                bias: vec![0.1],
            },
            DenseLayer {
                weights: vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0, -1.0, 0.0],
                bias: vec![0.0, 0.0],
            },
        )
        .unwrap()
    }

    #[test]
    fn relu_clamps_negative_only() {
        assert_eq!(relu(-1.5), 0.0);
        assert_eq!(relu(2.0), 2.0);
        assert!(relu(f32::NAN).is_nan());
    }

    #[test]
    fn concrete_scenario() {
        let tables = tiny();
        let engine = FusedEngine::new(&tables, &Sequential);
        let input = InputVector::new(&tables.dims(), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let logits = engine.sweep(&input);

        // activations: t0 = 0.1, t1 = 0.1, t2 = 0.1, t3 = ReLU(-2.4) = 0
        // c0 = 0.1·1 + 0.1·0 + 0.1·1 + 0·(-1) = 0.2
        // c1 = 0.1·0 + 0.1·1 + 0.1·1 + 0·0    = 0.2
        assert_eq!(logits.len(), 2);
        for &v in logits.as_slice() {
            assert!((v - 0.2).abs() < 1e-6, "got {v}");
        }
    }

    #[test]
    fn boundary_taps_are_zero_not_wrapped() {
        // Only the left tap is weighted: t=0 must see 0, not x[D_IN-1].
        let dims = Dims::new(3, 1, 3);
        let mut dense = vec![0.0; 9];
        dense[0] = 1.0; // t0 → c0
        dense[4] = 1.0; // t1 → c1
        dense[8] = 1.0; // t2 → c2
        let tables = Tables::new(
            dims,
            ConvLayer {
                weights: vec![[1.0, 0.0, 0.0]],
                bias: vec![0.0],
            },
            DenseLayer {
                weights: dense,
                bias: vec![0.0; 3],
            },
        )
        .unwrap();
        let engine = FusedEngine::new(&tables, &Sequential);
        let input = InputVector::new(&dims, vec![5.0, 6.0, 7.0]).unwrap();
        assert_eq!(engine.sweep(&input).as_slice(), &[0.0, 5.0, 6.0]);
    }

    #[test]
    fn right_edge_tap_is_zero_not_wrapped() {
        // Only the right tap is weighted: t=D_IN-1 must see 0, not x[0].
        let dims = Dims::new(3, 1, 3);
        let mut dense = vec![0.0; 9];
        dense[0] = 1.0; // t0 → c0
        dense[4] = 1.0; // t1 → c1
        dense[8] = 1.0; // t2 → c2
        let tables = Tables::new(
            dims,
            ConvLayer {
                weights: vec![[0.0, 0.0, 1.0]],
                bias: vec![0.0],
            },
            DenseLayer {
                weights: dense,
                bias: vec![0.0; 3],
            },
        )
        .unwrap();
        let engine = FusedEngine::new(&tables, &Sequential);
        let input = InputVector::new(&dims, vec![5.0, 6.0, 7.0]).unwrap();
        assert_eq!(engine.sweep(&input).as_slice(), &[6.0, 7.0, 0.0]);
    }

    #[test]
    fn bias_only_when_all_activations_clamp() {
        let dims = Dims::new(3, 2, 2);
        let tables = Tables::new(
            dims,
            ConvLayer {
                weights: vec![[0.0; 3]; 2],
                bias: vec![-1.0, -0.5],
            },
            DenseLayer {
                weights: vec![3.0; dims.dense_weight_len()],
                bias: vec![0.25, -4.0],
            },
        )
        .unwrap();
        let engine = FusedEngine::new(&tables, &Sequential);
        let input = InputVector::new(&dims, vec![9.0, 9.0, 9.0]).unwrap();
        assert_eq!(engine.sweep(&input).as_slice(), &[0.25, -4.0]);
    }

    #[test]
    fn schedules_agree_bit_for_bit() {
        let tables = tiny();
        let input = InputVector::new(&tables.dims(), vec![-0.3, 1.7, 2.2, 0.9]).unwrap();
        let base = FusedEngine::new(&tables, &Sequential).sweep(&input).to_bits();
        let lanes = Lanes::new(2);
        let pool = WorkerPool::new(2, 1).unwrap();
        assert_eq!(FusedEngine::new(&tables, &lanes).sweep(&input).to_bits(), base);
        assert_eq!(FusedEngine::new(&tables, &pool).sweep(&input).to_bits(), base);
    }

    #[test]
    fn input_length_is_checked_at_the_boundary() {
        let dims = Dims::new(4, 1, 2);
        assert!(InputVector::new(&dims, vec![1.0; 3]).is_err());
    }
}
