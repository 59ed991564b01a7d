//! Error types for the broker.

use permit_broker_delegate::DelegateError;
use thiserror::Error;

/// Errors that can occur during broker operations.
///
/// Callers never see these through a completion: a completion only ever
/// receives a status. Errors are returned from the call that issued the
/// request, and in that case the completion is dropped without firing.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The delegate could not take the request.
    #[error("delegate error: {0}")]
    Delegate(#[from] DelegateError),

    /// Configuration is malformed or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
