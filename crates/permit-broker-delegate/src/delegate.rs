//! Delegate traits.
//!
//! Implementations must be thread-safe (Send + Sync): the broker may be
//! shared across threads and decisions may arrive on any of them.

use permit_broker_core::{CapabilityType, Origin};

use crate::error::Result;

/// One-shot completion handed to a delegate. `true` grants, `false` denies.
pub type DecisionCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Produces grant/deny decisions for `(capability, origin)` pairs.
pub trait DecisionDelegate: Send + Sync {
    /// Ask for a decision.
    ///
    /// If the decision is already known, `on_decided` is invoked before this
    /// returns. Otherwise the delegate records it and invokes it once a
    /// decision becomes available. An `Err` means `on_decided` was dropped
    /// without being called.
    fn request(
        &self,
        capability: CapabilityType,
        origin: &Origin,
        user_gesture: bool,
        on_decided: DecisionCallback,
    ) -> Result<()>;

    /// Drop one awaiting request for `(capability, origin)`.
    ///
    /// Spurious cancels must leave the delegate's state intact.
    fn cancel(&self, capability: CapabilityType, origin: &Origin) -> Result<()>;
}

/// Decides for a single capability. Registered on a
/// [`CapabilityRouter`](crate::CapabilityRouter).
pub trait CapabilityHandler: Send + Sync {
    fn request(&self, origin: &Origin, user_gesture: bool, on_decided: DecisionCallback);

    fn cancel(&self, origin: &Origin);
}
