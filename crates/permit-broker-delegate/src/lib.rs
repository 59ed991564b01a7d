//! # Permit Broker Delegate
//!
//! The contract between the broker and whatever actually decides.
//!
//! ## Overview
//!
//! A [`DecisionDelegate`] receives `(capability, origin, user_gesture)` and a
//! one-shot [`DecisionCallback`]. It may invoke the callback before
//! returning (the decision was already known) or keep it and invoke it
//! later. The broker never looks inside the delegate; the delegate never
//! looks inside the broker's request table.
//!
//! ## Routing
//!
//! Rather than one method pair per capability, handlers are registered per
//! capability tag on a [`CapabilityRouter`], which is itself a
//! `DecisionDelegate`:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use permit_broker_core::CapabilityType;
//! use permit_broker_delegate::CapabilityRouter;
//!
//! let router = CapabilityRouter::new()
//!     .route(CapabilityType::Geolocation, Arc::new(geolocation_prompt));
//! ```

pub mod delegate;
pub mod error;
pub mod router;

pub use delegate::{CapabilityHandler, DecisionCallback, DecisionDelegate};
pub use error::{DelegateError, Result};
pub use router::CapabilityRouter;
