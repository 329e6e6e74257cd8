//! Error types for kernel operations

use thiserror::Error;

/// Result type alias for kernel operations
pub type Result<T> = std::result::Result<T, Cnn1dError>;

/// Errors that can occur while building or invoking the kernel
#[derive(Debug, Error)]
pub enum Cnn1dError {
    /// Input channel closed before a full vector arrived
    #[error("Input channel closed after {received} of {expected} words")]
    ChannelClosed {
        /// Words read before the channel closed
        received: usize,
        /// Words the decoder needed
        expected: usize,
    },

    /// Output channel stopped accepting words mid-message
    #[error("Output channel closed after {written} of {expected} words")]
    SinkClosed {
        /// Words accepted before the channel closed
        written: usize,
        /// Words in the full message
        expected: usize,
    },

    /// A weight or bias table does not match the configured dimensions
    #[error("{table} has {got} entries, expected {expected}")]
    DimensionMismatch {
        /// Table name
        table: &'static str,
        /// Entries supplied
        got: usize,
        /// Entries required by the dimensions
        expected: usize,
    },

    /// Output message broke the framing contract
    #[error("Framing violation: {reason}")]
    Framing {
        /// What was wrong with the message
        reason: String,
    },

    /// No output word arrived in time
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// Kernel worker died before finishing the call
    #[error("Kernel in invalid state: {state}")]
    InvalidState {
        /// Current state description
        state: String,
    },

    /// Schedule or executor could not be configured
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for failure
        reason: String,
    },
}

impl Cnn1dError {
    /// Create a dimension mismatch error
    pub fn dimension_mismatch(table: &'static str, got: usize, expected: usize) -> Self {
        Self::DimensionMismatch {
            table,
            got,
            expected,
        }
    }

    /// Create a framing error
    pub fn framing(reason: impl Into<String>) -> Self {
        Self::Framing {
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
