//! Error types for Riftblade.

use thiserror::Error;

/// Top-level error type for Riftblade operations.
#[derive(Debug, Error)]
pub enum RiftbladeError {
    /// Serialization errors (config and report files)
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Result type alias for Riftblade operations.
pub type RiftbladeResult<T> = Result<T, RiftbladeError>;
