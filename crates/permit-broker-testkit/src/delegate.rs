//! A scriptable decision delegate.
//!
//! Decisions are supplied by the test with
//! [`QueuedDelegate::enqueue_response`]. A decision supplied while requests
//! are awaiting resolves all of them; one supplied while nothing is awaiting
//! is queued and consumed by the next matching request, which then decides
//! synchronously.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use permit_broker_core::{CapabilityType, Origin};
use permit_broker_delegate::{
    CapabilityHandler, CapabilityRouter, DecisionCallback, DecisionDelegate, Result,
};
use tracing::warn;

#[derive(Default)]
struct HandlerState {
    awaiting: Vec<(Origin, DecisionCallback)>,
    queued: VecDeque<(Origin, bool)>,
    seen: Vec<(Origin, bool)>,
    spurious_cancels: usize,
}

/// Queue-backed handler for one capability.
#[derive(Default)]
pub struct QueuedHandler {
    state: Mutex<HandlerState>,
}

impl QueuedHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HandlerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Supply a decision for `origin`.
    pub fn decide(&self, origin: &Origin, granted: bool) {
        let ready: Vec<DecisionCallback> = {
            let mut state = self.lock();
            let (ready, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut state.awaiting)
                .into_iter()
                .partition(|(o, _)| o == origin);
            state.awaiting = rest;

            if ready.is_empty() {
                state.queued.push_back((origin.clone(), granted));
            }

            ready.into_iter().map(|(_, callback)| callback).collect()
        };

        for callback in ready {
            callback(granted);
        }
    }

    /// Number of requests awaiting a decision for `origin`.
    pub fn awaiting(&self, origin: &Origin) -> usize {
        self.lock().awaiting.iter().filter(|(o, _)| o == origin).count()
    }

    /// Number of queued decisions not yet consumed.
    pub fn queued(&self) -> usize {
        self.lock().queued.len()
    }

    /// Every `(origin, user_gesture)` this handler was asked about.
    pub fn seen(&self) -> Vec<(Origin, bool)> {
        self.lock().seen.clone()
    }

    /// Cancels that matched nothing.
    pub fn spurious_cancels(&self) -> usize {
        self.lock().spurious_cancels
    }
}

impl CapabilityHandler for QueuedHandler {
    fn request(&self, origin: &Origin, user_gesture: bool, on_decided: DecisionCallback) {
        let queued = {
            let mut state = self.lock();
            state.seen.push((origin.clone(), user_gesture));

            match state.queued.iter().position(|(o, _)| o == origin) {
                Some(index) => state.queued.remove(index).map(|(_, granted)| granted),
                None => {
                    state.awaiting.push((origin.clone(), on_decided));
                    return;
                }
            }
        };

        if let Some(granted) = queued {
            on_decided(granted);
        }
    }

    fn cancel(&self, origin: &Origin) {
        let mut state = self.lock();
        match state.awaiting.iter().position(|(o, _)| o == origin) {
            Some(index) => {
                state.awaiting.remove(index);
            }
            None => {
                warn!(%origin, "cancel with nothing awaiting");
                state.spurious_cancels += 1;
            }
        }
    }
}

/// A delegate routing a set of capabilities to [`QueuedHandler`]s.
pub struct QueuedDelegate {
    router: CapabilityRouter,
    handlers: BTreeMap<CapabilityType, Arc<QueuedHandler>>,
}

impl QueuedDelegate {
    /// Route each of `capabilities` to its own queued handler.
    pub fn new(capabilities: &[CapabilityType]) -> Self {
        let mut router = CapabilityRouter::new();
        let mut handlers = BTreeMap::new();
        for &capability in capabilities {
            let handler = Arc::new(QueuedHandler::new());
            router.insert(capability, handler.clone());
            handlers.insert(capability, handler);
        }
        Self { router, handlers }
    }

    /// Routes only geolocation.
    pub fn geolocation() -> Self {
        Self::new(&[CapabilityType::Geolocation])
    }

    /// Routes every known capability.
    pub fn all() -> Self {
        Self::new(&CapabilityType::ALL)
    }

    pub fn handler(&self, capability: CapabilityType) -> Option<&Arc<QueuedHandler>> {
        self.handlers.get(&capability)
    }

    /// Supply a decision for `(origin, capability)`.
    pub fn enqueue_response(&self, origin: &Origin, capability: CapabilityType, granted: bool) {
        match self.handlers.get(&capability) {
            Some(handler) => handler.decide(origin, granted),
            None => warn!(%capability, "decision for unrouted capability dropped"),
        }
    }

    /// Requests awaiting a decision for `(origin, capability)`.
    pub fn awaiting(&self, origin: &Origin, capability: CapabilityType) -> usize {
        self.handlers
            .get(&capability)
            .map(|h| h.awaiting(origin))
            .unwrap_or(0)
    }

    /// Requests awaiting a decision across every capability.
    pub fn total_awaiting(&self) -> usize {
        self.handlers
            .values()
            .map(|h| h.lock().awaiting.len())
            .sum()
    }

    /// Cancels that matched nothing, across every capability.
    pub fn spurious_cancels(&self) -> usize {
        self.handlers.values().map(|h| h.spurious_cancels()).sum()
    }
}

impl DecisionDelegate for QueuedDelegate {
    fn request(
        &self,
        capability: CapabilityType,
        origin: &Origin,
        user_gesture: bool,
        on_decided: DecisionCallback,
    ) -> Result<()> {
        self.router.request(capability, origin, user_gesture, on_decided)
    }

    fn cancel(&self, capability: CapabilityType, origin: &Origin) -> Result<()> {
        self.router.cancel(capability, origin)
    }
}
