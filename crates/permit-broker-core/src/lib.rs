//! # Permit Broker Core
//!
//! Pure value types shared by the broker, its delegates and their callers.
//!
//! This crate has no state and no I/O. It defines the identities that the
//! broker correlates on:
//!
//! - [`RequestId`] - Identifier of an outstanding request, with the
//!   [`RequestId::NO_PENDING`] sentinel
//! - [`Origin`] - Normalized `scheme://host[:port]` identity of a requester
//! - [`CapabilityType`] - The permission being asked for
//! - [`CorrelationKey`] - `(origin, capability)` pair that decisions fan out on
//! - [`PermissionStatus`] - Outcome delivered to callers
//! - [`CallerContext`] - Caller identity used to select a delegate

pub mod capability;
pub mod error;
pub mod origin;
pub mod types;

pub use capability::{CapabilityType, PermissionStatus};
pub use error::{CoreError, Result};
pub use origin::Origin;
pub use types::{CallerContext, CorrelationKey, RequestId};
