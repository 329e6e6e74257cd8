//! Fused Conv1D → ReLU → Dense streaming inference kernel.
//!
//! Consumes a fixed-length vector of binary32 words, runs a 3-tap
//! convolution with ReLU, folds each activation straight into a dense layer,
//! and emits one word per class with the end-of-message flag on the last.
//!
//! # Pipeline
//!
//! ```text
//! WordSource ─▶ decode_vector ─▶ SlidingWindow ─▶ FusedEngine ─▶ encode_logits ─▶ WordSink
//!                                                   │
//!                                              Schedule (multiplier budget)
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use cnn1d_driver::{Cnn1dKernel, ConvLayer, DenseLayer, Tables};
//! use cnn1d_ip::Dims;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dims = Dims::new(4, 1, 2);
//! let tables = Tables::new(
//!     dims,
//!     ConvLayer { weights: vec![[0.5, -1.0, 0.5]], bias: vec![0.1] },
//!     DenseLayer {
//!         weights: vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0, -1.0, 0.0],
//!         bias: vec![0.0, 0.0],
//!     },
//! )?;
//! let kernel = Cnn1dKernel::new(Arc::new(tables));
//! let logits = kernel.infer(&[1.0, 2.0, 3.0, 4.0])?;
//! println!("{:?}", logits.as_slice());
//! # Ok(())
//! # }
//! ```
//!
//! Softmax and argmax are left to the host.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]

mod backend;
pub mod backends;
mod engine;
mod error;
mod inference;
pub mod io;
mod kernel;
pub mod schedule;
mod stream;
mod tables;
mod window;

pub use backend::{BackendType, InferenceBackend};
pub use backends::FusedBackend;
pub use engine::{activation, relu, FusedEngine, InputVector, Logits, LogitsAccumulator};
pub use error::{Cnn1dError, Result};
pub use inference::{check_framing, InferenceConfig, InferenceExecutor, InferenceResult};
pub use io::{frame_vector, WordSink, WordSource};
pub use kernel::Cnn1dKernel;
pub use schedule::{schedule_for, Lanes, Schedule, Sequential, WorkerPool};
pub use stream::{decode_vector, encode_logits};
pub use tables::{ConvLayer, DenseLayer, Tables};
pub use window::{SlidingWindow, Taps};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Cnn1dError, Cnn1dKernel, ConvLayer, DenseLayer, InferenceBackend, InferenceExecutor,
        Logits, Result, Schedule, Tables,
    };
}
