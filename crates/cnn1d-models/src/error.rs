//! Error types for model blobs and the model zoo

use cnn1d_driver::Cnn1dError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while parsing, packing or loading models
#[derive(Debug, Error)]
pub enum ModelError {
    /// File not found or cannot be read
    #[error("Model file not found: {path}")]
    FileNotFound {
        /// Path that was attempted
        path: PathBuf,
    },

    /// Blob does not start with the expected magic bytes
    #[error("Invalid model header: expected magic \"C1DN\", found {found:02x?}")]
    InvalidHeader {
        /// First four bytes of the blob (zero filled if shorter)
        found: [u8; 4],
    },

    /// Blob format version this build cannot read
    #[error("Unsupported model format version: {version}")]
    UnsupportedVersion {
        /// Version field from the header
        version: u16,
    },

    /// Convolution width other than three taps
    #[error("Unsupported kernel width: {width} (only 3 is supported)")]
    UnsupportedKernelWidth {
        /// Width field from the header
        width: u16,
    },

    /// Blob ends inside a section
    #[error("Model truncated in {section}: need {needed} bytes, {available} available")]
    Truncated {
        /// Section being read
        section: &'static str,
        /// Bytes the section needs
        needed: usize,
        /// Bytes left in the blob
        available: usize,
    },

    /// Bytes left over after the last table
    #[error("{count} trailing bytes after dense bias")]
    TrailingBytes {
        /// Number of unread bytes
        count: usize,
    },

    /// Dimension too large for the header field
    #[error("Dimension {value} does not fit in a u32 header field")]
    DimensionTooLarge {
        /// Offending dimension
        value: usize,
    },

    /// Name does not match a zoo model
    #[error("Unknown zoo model: {name}")]
    UnknownModel {
        /// Name that was looked up
        name: String,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Kernel rejected the tables or an invocation failed
    #[error(transparent)]
    Kernel(#[from] Cnn1dError),
}

impl ModelError {
    /// Create a truncation error
    pub fn truncated(section: &'static str, needed: usize, available: usize) -> Self {
        Self::Truncated {
            section,
            needed,
            available,
        }
    }

    /// Create an unknown model error
    pub fn unknown_model(name: impl Into<String>) -> Self {
        Self::UnknownModel { name: name.into() }
    }
}
