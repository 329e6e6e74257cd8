//! Fixed-function model of the fused Conv1D → ReLU → Dense streaming kernel.
//!
//! This crate has **no dependencies** and does no arithmetic on activations.
//! It records the facts every stage of the kernel must agree on: layer
//! dimensions, the on-wire word format, and the multiplier budget the kernel
//! was sized against.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`params`] | `D_IN`, `CONV1_OUT`, `CLASSES` as a [`Dims`](params::Dims) value, kernel width |
//! | [`word`] | binary32 codec, [`StreamWord`](word::StreamWord), legacy AXI-Stream beat |
//! | [`resources`] | Multiplier cap, initiation intervals, cycle estimate |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod params;
pub mod resources;
pub mod word;

pub use params::{Dims, KERNEL_WIDTH};
pub use resources::{CycleEstimate, ResourceBudget};
pub use word::{decode_f32, encode_f32, AxisBeat, StreamWord};
