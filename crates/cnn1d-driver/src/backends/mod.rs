//! Backend implementations
//!
//! Only the fused kernel lives here; the unfused reference is part of
//! `cnn1d-models`.

pub mod fused;

pub use fused::FusedBackend;
