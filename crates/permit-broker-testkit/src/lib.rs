//! # Permit Broker Testkit
//!
//! Testing utilities for the permit broker.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Queued delegate**: a [`DecisionDelegate`](permit_broker_delegate::DecisionDelegate)
//!   whose decisions are supplied by the test, either ahead of a request
//!   (the request then decides synchronously) or while it is awaiting
//! - **Fixtures**: well-known origins, a caller context, and a [`Recorder`]
//!   capturing completions in firing order
//! - **Generators**: proptest strategies producing request/cancel/decide
//!   scenarios
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use permit_broker::{BrokerConfig, PermissionBroker};
//! use permit_broker_core::CapabilityType;
//! use permit_broker_testkit::{fixtures, QueuedDelegate, Recorder};
//!
//! let delegate = Arc::new(QueuedDelegate::geolocation());
//! let broker = PermissionBroker::with_delegate(delegate.clone(), BrokerConfig::default())?;
//! let recorder = Recorder::new();
//!
//! let id = broker.request_permission(
//!     CapabilityType::Geolocation,
//!     &fixtures::test_context(),
//!     &fixtures::origin_a(),
//!     true,
//!     recorder.callback(1),
//! )?;
//! delegate.enqueue_response(&fixtures::origin_a(), CapabilityType::Geolocation, true);
//! assert_eq!(recorder.tags(), vec![1]);
//! ```

pub mod delegate;
pub mod fixtures;
pub mod generators;

pub use delegate::{QueuedDelegate, QueuedHandler};
pub use fixtures::{test_context, Recorder, Resolved};
pub use generators::{ops, Op};
