//! Error types for the core value types.

use thiserror::Error;

/// Errors raised while constructing core values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid origin {input:?}: {reason}")]
    InvalidOrigin { input: String, reason: String },

    #[error("origin {0:?} is opaque and cannot be used for correlation")]
    OpaqueOrigin(String),

    #[error("unknown capability type: {0}")]
    UnknownCapability(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
