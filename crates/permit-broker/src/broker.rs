//! The permission broker.
//!
//! Accepts requests, parks them in the [`RequestTable`], asks the caller's
//! delegate for a decision and delivers the outcome. One decision resolves
//! every request waiting on the same `(origin, capability)` pair.
//!
//! The table lock is never held while calling into a delegate or firing a
//! completion, so both may re-enter the broker.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use permit_broker_core::{
    CallerContext, CapabilityType, CorrelationKey, Origin, PermissionStatus, RequestId,
};
use permit_broker_delegate::{DecisionCallback, DecisionDelegate};
use tracing::{debug, trace, warn};

use crate::cache::DecisionCache;
use crate::config::BrokerConfig;
use crate::error::Result;
use crate::resolver::{DelegateResolver, SharedDelegate};
use crate::table::{
    fill_unresolved, slot_statuses, unresolved_capabilities, Completion, PendingRequest,
    RequestTable, Slot,
};

struct BrokerState {
    table: RequestTable,
    cache: DecisionCache,
}

/// State reachable from delegate callbacks. Callbacks hold it weakly, so a
/// decision arriving after the broker is gone does nothing.
struct Shared {
    state: Mutex<BrokerState>,
    config: BrokerConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a decision to every request waiting on `key`, provided the
    /// wait it was issued for in `round` is still open.
    fn resolve(&self, key: &CorrelationKey, round: u64, granted: bool) {
        let status = PermissionStatus::from_grant(granted);

        let resolution = {
            let mut guard = self.lock();
            let BrokerState { table, cache } = &mut *guard;
            let Some(resolution) = table.resolve(key, round, status) else {
                trace!(%key, round, granted, "decision for a closed round; ignored");
                return;
            };

            if self.config.is_cached(key.capability) {
                for embedder in &resolution.embedders {
                    cache.record(key.capability, &key.origin, embedder, status);
                }
            }

            resolution
        };

        debug!(
            %key,
            granted,
            touched = resolution.touched,
            completed = resolution.completed.len(),
            "decision delivered"
        );

        for request in resolution.completed {
            trace!(request_id = %request.id, "completing request");
            request.complete();
        }
    }

    fn decision_callback(self: &Arc<Self>, key: CorrelationKey, round: u64) -> DecisionCallback {
        let shared: Weak<Shared> = Arc::downgrade(self);
        Box::new(move |granted| match shared.upgrade() {
            Some(shared) => shared.resolve(&key, round, granted),
            None => trace!(%key, granted, "decision arrived after teardown; ignored"),
        })
    }
}

/// Tell the request's delegate to forget the capabilities in `capabilities`
/// and drop the completion unfired.
fn release(request: PendingRequest, capabilities: &[CapabilityType]) {
    for &capability in capabilities {
        if let Err(e) = request.delegate.cancel(capability, &request.origin) {
            warn!(
                request_id = %request.id,
                %capability,
                origin = %request.origin,
                error = %e,
                "delegate failed to cancel"
            );
        }
    }
}

/// Routes permission requests to decision delegates and delivers outcomes.
///
/// Dropping the broker cancels every outstanding request without firing any
/// completion.
pub struct PermissionBroker {
    shared: Arc<Shared>,
    resolver: Box<dyn DelegateResolver>,
}

impl PermissionBroker {
    /// Create a broker selecting delegates through `resolver`.
    ///
    /// Fails if `config` does not pass [`BrokerConfig::validate`].
    pub fn new(resolver: impl DelegateResolver + 'static, config: BrokerConfig) -> Result<Self> {
        config.validate()?;
        let cache = DecisionCache::new(config.max_cached_decisions);
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BrokerState {
                    table: RequestTable::new(),
                    cache,
                }),
                config,
            }),
            resolver: Box::new(resolver),
        })
    }

    /// Create a broker that sends every caller to `delegate`.
    pub fn with_delegate(delegate: Arc<dyn DecisionDelegate>, config: BrokerConfig) -> Result<Self> {
        Self::new(SharedDelegate::new(delegate), config)
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.shared.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Request a single capability for `origin`.
    ///
    /// Returns [`RequestId::NO_PENDING`] if `completion` already fired
    /// before this returned, otherwise an id usable with
    /// [`cancel_permission_request`](Self::cancel_permission_request).
    ///
    /// On `Err` the completion is dropped without firing.
    pub fn request_permission(
        &self,
        capability: CapabilityType,
        context: &CallerContext,
        origin: &Origin,
        user_gesture: bool,
        completion: impl FnOnce(PermissionStatus) + Send + 'static,
    ) -> Result<RequestId> {
        self.submit(
            &[capability],
            context,
            origin,
            user_gesture,
            Completion::Single(Box::new(completion)),
        )
    }

    /// Request several capabilities under one id.
    ///
    /// `completion` fires once every capability has a decision, with the
    /// statuses in the order requested.
    pub fn request_permissions(
        &self,
        capabilities: &[CapabilityType],
        context: &CallerContext,
        origin: &Origin,
        user_gesture: bool,
        completion: impl FnOnce(Vec<PermissionStatus>) + Send + 'static,
    ) -> Result<RequestId> {
        self.submit(
            capabilities,
            context,
            origin,
            user_gesture,
            Completion::Batch(Box::new(completion)),
        )
    }

    fn submit(
        &self,
        capabilities: &[CapabilityType],
        context: &CallerContext,
        origin: &Origin,
        user_gesture: bool,
        completion: Completion,
    ) -> Result<RequestId> {
        let config = &self.shared.config;
        let mut slots: Vec<Slot> = capabilities
            .iter()
            .map(|&c| Slot::new(c, config.fixed_decision(c)))
            .collect();

        let delegated = unresolved_capabilities(&slots);
        if delegated.is_empty() {
            trace!(%origin, ?capabilities, "answered from fixed decisions");
            completion.fire(slot_statuses(&slots));
            return Ok(RequestId::NO_PENDING);
        }

        let Some(delegate) = self.resolver.resolve(context) else {
            warn!(
                %origin,
                process_id = context.process_id,
                frame_id = context.frame_id,
                "no delegate for caller; denying"
            );
            fill_unresolved(&mut slots, PermissionStatus::Denied);
            completion.fire(slot_statuses(&slots));
            return Ok(RequestId::NO_PENDING);
        };

        let (id, waits) = {
            let mut state = self.shared.lock();
            let id = state.table.allocate_id();
            let waits = state.table.insert(PendingRequest {
                id,
                origin: origin.clone(),
                embedding_origin: context.embedding_origin.clone(),
                user_gesture,
                delegate: Arc::clone(&delegate),
                slots,
                completion,
            });
            (id, waits)
        };

        debug!(request_id = %id, %origin, ?delegated, user_gesture, "permission requested");

        for (i, (key, round)) in waits.into_iter().enumerate() {
            let capability = key.capability;
            let on_decided = self.shared.decision_callback(key, round);

            if let Err(e) = delegate.request(capability, origin, user_gesture, on_decided) {
                warn!(request_id = %id, %capability, %origin, error = %e, "delegate refused request");
                self.abandon(id, &delegated[..i]);
                return Err(e.into());
            }
        }

        if self.shared.lock().table.contains(id) {
            Ok(id)
        } else {
            trace!(request_id = %id, "resolved synchronously");
            Ok(RequestId::NO_PENDING)
        }
    }

    /// Undo a partially submitted request. Only `requested` capabilities
    /// reached the delegate, so only those are cancelled with it.
    fn abandon(&self, id: RequestId, requested: &[CapabilityType]) {
        let removed = self.shared.lock().table.remove(id);
        if let Some(request) = removed {
            let outstanding: Vec<CapabilityType> = request
                .unresolved_capabilities()
                .into_iter()
                .filter(|c| requested.contains(c))
                .collect();
            release(request, &outstanding);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cancellation
    // ─────────────────────────────────────────────────────────────────────────

    /// Cancel an outstanding request. Its completion will never fire.
    ///
    /// Unknown, already resolved, already cancelled and sentinel ids are
    /// ignored.
    pub fn cancel_permission_request(&self, id: RequestId) {
        if !id.is_pending_operation() {
            return;
        }

        let removed = self.shared.lock().table.remove(id);
        match removed {
            Some(request) => {
                let capabilities = request.unresolved_capabilities();
                debug!(request_id = %id, origin = %request.origin, ?capabilities, "request cancelled");
                release(request, &capabilities);
            }
            None => debug!(request_id = %id, "cancel for unknown request ignored"),
        }
    }

    /// Cancel every outstanding request without firing completions.
    ///
    /// Returns how many requests were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained = self.shared.lock().table.drain();
        let count = drained.len();
        if count > 0 {
            debug!(count, "cancelling all outstanding requests");
        }

        for request in drained {
            let capabilities = request.unresolved_capabilities();
            release(request, &capabilities);
        }

        count
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status
    // ─────────────────────────────────────────────────────────────────────────

    /// Current status of `capability` for `requesting` embedded in
    /// `embedding`, without asking anyone.
    ///
    /// Fixed decisions are returned as configured. Cached capabilities
    /// report the last decision, or `Ask` if none is known. Everything else
    /// is `Denied`.
    pub fn permission_status(
        &self,
        capability: CapabilityType,
        requesting: &Origin,
        embedding: &Origin,
    ) -> PermissionStatus {
        let config = &self.shared.config;
        if let Some(status) = config.fixed_decision(capability) {
            return status;
        }

        if config.is_cached(capability) {
            return self
                .shared
                .lock()
                .cache
                .get(capability, requesting, embedding)
                .unwrap_or(PermissionStatus::Ask);
        }

        PermissionStatus::Denied
    }

    /// Forget the remembered decision for the pair.
    pub fn reset_permission(
        &self,
        capability: CapabilityType,
        requesting: &Origin,
        embedding: &Origin,
    ) {
        let forgot = self
            .shared
            .lock()
            .cache
            .forget(capability, requesting, embedding);
        if forgot {
            debug!(%capability, %requesting, %embedding, "remembered decision reset");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of outstanding requests.
    pub fn pending_count(&self) -> usize {
        self.shared.lock().table.len()
    }

    /// Whether `id` is still outstanding.
    pub fn is_pending(&self, id: RequestId) -> bool {
        id.is_pending_operation() && self.shared.lock().table.contains(id)
    }
}

impl Drop for PermissionBroker {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl std::fmt::Debug for PermissionBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionBroker")
            .field("config", &self.shared.config)
            .field("pending", &self.pending_count())
            .finish()
    }
}
