//! Error types for the Rosetta filter policies.

use thiserror::Error;

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for filter construction, loading and querying.
#[derive(Debug, Error)]
pub enum Error {
    /// An invalid argument was provided (short keys, bad options).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The object is in a state that does not allow the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The filter core failed to build or to load a serialized filter.
    #[error("Filter core error: {0}")]
    FilterCore(String),

    /// A checksum mismatch was detected while loading a filter.
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// The checksum stored in the filter.
        expected: u32,
        /// The checksum computed over the filter contents.
        actual: u32,
    },

    /// A persisted filter was written by a different policy.
    #[error("Filter policy mismatch: expected {expected}, got {actual}")]
    PolicyMismatch {
        /// Name of the active policy.
        expected: String,
        /// Name recorded alongside the persisted filter.
        actual: String,
    },

    /// Options could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates a new invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Creates a new filter core error.
    pub fn filter_core(msg: impl Into<String>) -> Self {
        Error::FilterCore(msg.into())
    }
}
