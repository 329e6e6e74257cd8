#![deny(unsafe_code)]

//! Model blobs, unfused reference and model zoo for the cnn1d kernel
//!
//! # Format
//!
//! Models are stored as `.c1dn` blobs: a 20-byte little-endian header
//! (magic `C1DN`, format version, kernel width, `D_IN`, `CONV1_OUT`,
//! `CLASSES`) followed by the four weight tables as raw binary32. See
//! [`parser`] for the byte layout.
//!
//! # Example
//!
//! ```no_run
//! use cnn1d_models::{Model, ReferenceModel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = Model::from_file("gesture.c1dn")?;
//! let kernel = model.kernel();
//! let reference = ReferenceModel::new(model.tables().clone());
//!
//! let x = vec![0.0f32; model.dims().d_in];
//! println!("fused:     {:?}", kernel.infer(&x)?.as_slice());
//! println!("reference: {:?}", reference.forward(&x)?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

mod error;
mod model;
pub mod parser;
mod reference;
pub mod zoo;

pub use error::{ModelError, Result};
pub use model::Model;
pub use parser::{ModelHeader, FORMAT_VERSION, MODEL_MAGIC};
pub use reference::{
    compare_backends, ParityReport, ReferenceModel, DEFAULT_ABS_TOLERANCE, DEFAULT_REL_TOLERANCE,
};
pub use zoo::{ModelZoo, SampleGenerator, ZooModel};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{Model, ModelZoo, ParityReport, ReferenceModel, Result, ZooModel};
}
