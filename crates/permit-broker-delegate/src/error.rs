//! Error types for delegates.

use permit_broker_core::CapabilityType;
use thiserror::Error;

/// Errors a delegate may report back to the broker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DelegateError {
    /// No handler is registered for the capability.
    #[error("no handler routed for capability {0}")]
    Unrouted(CapabilityType),
}

/// Result type for delegate operations.
pub type Result<T> = std::result::Result<T, DelegateError>;
