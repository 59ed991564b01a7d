//! Capability routing.
//!
//! Maps each capability tag to the handler that decides it.

use std::collections::HashMap;
use std::sync::Arc;

use permit_broker_core::{CapabilityType, Origin};
use tracing::{trace, warn};

use crate::delegate::{CapabilityHandler, DecisionCallback, DecisionDelegate};
use crate::error::{DelegateError, Result};

/// A [`DecisionDelegate`] that dispatches on the capability tag.
#[derive(Default, Clone)]
pub struct CapabilityRouter {
    handlers: HashMap<CapabilityType, Arc<dyn CapabilityHandler>>,
}

impl CapabilityRouter {
    /// Create a router with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `capability`, replacing any previous route.
    pub fn route(mut self, capability: CapabilityType, handler: Arc<dyn CapabilityHandler>) -> Self {
        self.insert(capability, handler);
        self
    }

    /// Register `handler` for `capability` in place.
    pub fn insert(&mut self, capability: CapabilityType, handler: Arc<dyn CapabilityHandler>) {
        self.handlers.insert(capability, handler);
    }

    /// Whether a handler is registered for `capability`.
    pub fn is_routed(&self, capability: CapabilityType) -> bool {
        self.handlers.contains_key(&capability)
    }

    /// Capabilities with a registered handler.
    pub fn routed(&self) -> Vec<CapabilityType> {
        let mut routed: Vec<_> = self.handlers.keys().copied().collect();
        routed.sort();
        routed
    }

    fn handler(&self, capability: CapabilityType) -> Result<&Arc<dyn CapabilityHandler>> {
        self.handlers.get(&capability).ok_or_else(|| {
            warn!(%capability, "no handler routed for capability");
            DelegateError::Unrouted(capability)
        })
    }
}

impl std::fmt::Debug for CapabilityRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRouter")
            .field("routed", &self.routed())
            .finish()
    }
}

impl DecisionDelegate for CapabilityRouter {
    fn request(
        &self,
        capability: CapabilityType,
        origin: &Origin,
        user_gesture: bool,
        on_decided: DecisionCallback,
    ) -> Result<()> {
        let handler = self.handler(capability)?;
        trace!(%capability, %origin, user_gesture, "routing decision request");
        handler.request(origin, user_gesture, on_decided);
        Ok(())
    }

    fn cancel(&self, capability: CapabilityType, origin: &Origin) -> Result<()> {
        let handler = self.handler(capability)?;
        trace!(%capability, %origin, "routing cancel");
        handler.cancel(origin);
        Ok(())
    }
}
