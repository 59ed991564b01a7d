//! # Permit Broker
//!
//! Routes permission requests to decision delegates and delivers the
//! outcome back to the caller.
//!
//! ## Overview
//!
//! A caller asks for a capability (geolocation, protected media identifier,
//! ...) on behalf of an origin. The broker asks the caller's
//! [`DecisionDelegate`](permit_broker_delegate::DecisionDelegate), which
//! either decides on the spot or calls back later:
//!
//! - **Synchronous**: the completion fires before `request_permission`
//!   returns, and the returned id is [`RequestId::NO_PENDING`]
//! - **Asynchronous**: a fresh id is returned; the completion fires when
//!   the delegate decides, or never if the request is cancelled first
//!
//! ## Key Properties
//!
//! - **Fan-out**: one decision resolves every outstanding request sharing
//!   `(origin, capability)`, in creation order
//! - **Isolated cancellation**: cancelling one request never touches its
//!   siblings on the same key
//! - **Silent teardown**: dropping the broker cancels everything without
//!   firing completions; late delegate callbacks are ignored
//! - **No hidden state**: delegates are selected by an injected
//!   [`DelegateResolver`] from an explicit [`CallerContext`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use permit_broker::{BrokerConfig, PermissionBroker};
//! use permit_broker::core::{CallerContext, CapabilityType, Origin};
//!
//! let broker = PermissionBroker::with_delegate(Arc::new(my_delegate), BrokerConfig::default())?;
//! let origin = Origin::parse("https://maps.example")?;
//!
//! let id = broker.request_permission(
//!     CapabilityType::Geolocation,
//!     &CallerContext::new(process_id, frame_id),
//!     &origin,
//!     true,
//!     |status| println!("geolocation: {:?}", status),
//! )?;
//!
//! // Later, if the caller gives up:
//! broker.cancel_permission_request(id);
//! ```

pub mod broker;
pub mod cache;
pub mod config;
pub mod error;
pub mod resolver;
pub mod table;
pub mod wait;

// Re-export component crates
pub use permit_broker_core as core;
pub use permit_broker_delegate as delegate;

pub use broker::PermissionBroker;
pub use cache::DecisionCache;
pub use config::BrokerConfig;
pub use error::{BrokerError, Result};
pub use resolver::{DelegateResolver, SharedDelegate};
pub use table::{Completion, PendingRequest, RequestTable};
pub use wait::PendingDecision;

pub use permit_broker_core::{
    CallerContext, CapabilityType, CorrelationKey, Origin, PermissionStatus, RequestId,
};
