//! The request table.
//!
//! Holds every outstanding request and an index from correlation key to the
//! ids waiting on it, in creation order. A decision for a key drains that
//! key's index; a request is complete once every one of its capability slots
//! holds a status.
//!
//! Each wait on a key is numbered with a round. The round is handed to the
//! delegate callbacks issued during that wait, and a decision is only applied
//! if its round is still the key's current one. Once a key is resolved or
//! emptied its round is retired, so leftover callbacks from the same
//! decision can not reach requests made afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use permit_broker_core::{CapabilityType, CorrelationKey, Origin, PermissionStatus, RequestId};
use permit_broker_delegate::DecisionDelegate;

/// Completion for a single-capability request.
pub type StatusCallback = Box<dyn FnOnce(PermissionStatus) + Send + 'static>;

/// Completion for a batch request; statuses follow the requested order.
pub type StatusesCallback = Box<dyn FnOnce(Vec<PermissionStatus>) + Send + 'static>;

/// The caller's one-shot completion.
pub enum Completion {
    Single(StatusCallback),
    Batch(StatusesCallback),
}

impl Completion {
    /// Invoke the completion, consuming it.
    pub fn fire(self, statuses: Vec<PermissionStatus>) {
        match self {
            Completion::Single(callback) => {
                let status = statuses
                    .into_iter()
                    .next()
                    .unwrap_or(PermissionStatus::Denied);
                callback(status);
            }
            Completion::Batch(callback) => callback(statuses),
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Single(_) => f.write_str("Completion::Single"),
            Completion::Batch(_) => f.write_str("Completion::Batch"),
        }
    }
}

/// One requested capability and its decision, once known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub capability: CapabilityType,
    pub status: Option<PermissionStatus>,
}

impl Slot {
    pub fn new(capability: CapabilityType, status: Option<PermissionStatus>) -> Self {
        Self { capability, status }
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_some()
    }
}

/// Fill every empty slot with `status`.
pub fn fill_unresolved(slots: &mut [Slot], status: PermissionStatus) {
    for slot in slots.iter_mut().filter(|s| !s.is_resolved()) {
        slot.status = Some(status);
    }
}

/// Collect slot statuses in requested order.
pub fn slot_statuses(slots: &[Slot]) -> Vec<PermissionStatus> {
    slots
        .iter()
        .map(|s| s.status.unwrap_or(PermissionStatus::Ask))
        .collect()
}

/// Distinct capabilities among `slots` that have no status yet, in first
/// occurrence order.
pub fn unresolved_capabilities(slots: &[Slot]) -> Vec<CapabilityType> {
    let mut out: Vec<CapabilityType> = Vec::new();
    for slot in slots.iter().filter(|s| !s.is_resolved()) {
        if !out.contains(&slot.capability) {
            out.push(slot.capability);
        }
    }
    out
}

/// An outstanding, not yet resolved request.
pub struct PendingRequest {
    pub id: RequestId,

    /// Requesting origin; decisions correlate on it.
    pub origin: Origin,

    /// Embedding origin from the caller context, used for the decision cache.
    pub embedding_origin: Option<Origin>,

    /// Forwarded to the delegate only.
    pub user_gesture: bool,

    /// Delegate selected for this request's caller.
    pub delegate: Arc<dyn DecisionDelegate>,

    pub slots: Vec<Slot>,

    pub completion: Completion,
}

impl PendingRequest {
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Slot::is_resolved)
    }

    pub fn unresolved_capabilities(&self) -> Vec<CapabilityType> {
        unresolved_capabilities(&self.slots)
    }

    fn keys(&self) -> impl Iterator<Item = CorrelationKey> + '_ {
        self.unresolved_capabilities()
            .into_iter()
            .map(move |capability| CorrelationKey::new(self.origin.clone(), capability))
    }

    /// Fire the completion with the collected statuses.
    pub fn complete(self) {
        let statuses = slot_statuses(&self.slots);
        self.completion.fire(statuses);
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("embedding_origin", &self.embedding_origin)
            .field("user_gesture", &self.user_gesture)
            .field("slots", &self.slots)
            .finish()
    }
}

/// Outcome of applying one decision to the table.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Requests that became complete, in creation order.
    pub completed: Vec<PendingRequest>,

    /// Embedding origins of every request that received the decision.
    pub embedders: Vec<Origin>,

    /// Number of requests that received the decision.
    pub touched: usize,
}

struct Entry {
    /// Creation sequence; ids may wrap, this does not.
    created: u64,
    request: PendingRequest,
}

/// Requests waiting on one key during one round.
#[derive(Debug)]
struct Waiters {
    round: u64,
    ids: Vec<RequestId>,
}

/// Outstanding requests indexed by id and by correlation key.
pub struct RequestTable {
    next_id: RequestId,
    next_created: u64,
    next_round: u64,
    entries: HashMap<RequestId, Entry>,
    by_key: HashMap<CorrelationKey, Waiters>,
}

impl RequestTable {
    /// Create an empty table whose first id is [`RequestId::FIRST`].
    pub fn new() -> Self {
        Self::starting_at(RequestId::FIRST)
    }

    /// Create an empty table handing out ids from `first`.
    pub fn starting_at(first: RequestId) -> Self {
        let first = if first.is_pending_operation() {
            first
        } else {
            RequestId::FIRST
        };

        Self {
            next_id: first,
            next_created: 0,
            next_round: 0,
            entries: HashMap::new(),
            by_key: HashMap::new(),
        }
    }

    /// Reserve a fresh id not used by any outstanding request.
    pub fn allocate_id(&mut self) -> RequestId {
        loop {
            let id = self.next_id;
            self.next_id = id.next();
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    /// Insert a request and index it under each unresolved capability.
    ///
    /// Returns each key the request now waits on with the key's current
    /// round, in first occurrence order. The request's id must come from
    /// [`allocate_id`](Self::allocate_id).
    pub fn insert(&mut self, request: PendingRequest) -> Vec<(CorrelationKey, u64)> {
        let id = request.id;
        let mut waits = Vec::new();
        for key in request.keys() {
            let next_round = &mut self.next_round;
            let waiters = self.by_key.entry(key.clone()).or_insert_with(|| {
                let round = *next_round;
                *next_round += 1;
                Waiters {
                    round,
                    ids: Vec::new(),
                }
            });
            waiters.ids.push(id);
            waits.push((key, waiters.round));
        }

        let created = self.next_created;
        self.next_created += 1;
        self.entries.insert(id, Entry { created, request });
        waits
    }

    /// The current round of `key`, if anything is waiting on it.
    pub fn round(&self, key: &CorrelationKey) -> Option<u64> {
        self.by_key.get(key).map(|w| w.round)
    }

    /// Deliver `status` to every request waiting on `key` in `round`.
    ///
    /// Returns `None` if `round` is not the key's current round: the
    /// decision belongs to a wait that was already resolved or emptied.
    pub fn resolve(
        &mut self,
        key: &CorrelationKey,
        round: u64,
        status: PermissionStatus,
    ) -> Option<Resolution> {
        if self.round(key) != Some(round) {
            return None;
        }

        let mut resolution = Resolution::default();
        let ids = self.by_key.remove(key).map(|w| w.ids).unwrap_or_default();

        for id in ids {
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };

            for slot in entry
                .request
                .slots
                .iter_mut()
                .filter(|s| s.capability == key.capability && !s.is_resolved())
            {
                slot.status = Some(status);
            }

            resolution.touched += 1;
            if let Some(embedder) = &entry.request.embedding_origin {
                resolution.embedders.push(embedder.clone());
            }

            if entry.request.is_complete() {
                if let Some(entry) = self.entries.remove(&id) {
                    resolution.completed.push(entry.request);
                }
            }
        }

        Some(resolution)
    }

    /// Remove a request and all of its index entries.
    pub fn remove(&mut self, id: RequestId) -> Option<PendingRequest> {
        let entry = self.entries.remove(&id)?;
        for key in entry.request.keys() {
            self.unindex(&key, id);
        }
        Some(entry.request)
    }

    /// Remove every request, oldest first.
    pub fn drain(&mut self) -> Vec<PendingRequest> {
        self.by_key.clear();
        let mut entries: Vec<Entry> = self.entries.drain().map(|(_, e)| e).collect();
        entries.sort_by_key(|e| e.created);
        entries.into_iter().map(|e| e.request).collect()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: RequestId) -> Option<&PendingRequest> {
        self.entries.get(&id).map(|e| &e.request)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids waiting on `key`, oldest first.
    pub fn waiting_on(&self, key: &CorrelationKey) -> &[RequestId] {
        self.by_key
            .get(key)
            .map(|w| w.ids.as_slice())
            .unwrap_or_default()
    }

    fn unindex(&mut self, key: &CorrelationKey, id: RequestId) {
        if let Some(waiters) = self.by_key.get_mut(key) {
            waiters.ids.retain(|other| *other != id);
            if waiters.ids.is_empty() {
                self.by_key.remove(key);
            }
        }
    }
}

impl Default for RequestTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestTable")
            .field("next_id", &self.next_id)
            .field("pending", &self.entries.len())
            .field("keys", &self.by_key.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use permit_broker_delegate::{DecisionCallback, Result as DelegateResult};

    struct NullDelegate;

    impl DecisionDelegate for NullDelegate {
        fn request(
            &self,
            _capability: CapabilityType,
            _origin: &Origin,
            _user_gesture: bool,
            _on_decided: DecisionCallback,
        ) -> DelegateResult<()> {
            Ok(())
        }

        fn cancel(&self, _capability: CapabilityType, _origin: &Origin) -> DelegateResult<()> {
            Ok(())
        }
    }

    type Log = Arc<Mutex<Vec<(u32, Vec<PermissionStatus>)>>>;

    fn origin(s: &str) -> Origin {
        Origin::parse(s).unwrap()
    }

    fn request(
        table: &mut RequestTable,
        tag: u32,
        origin: &Origin,
        capabilities: &[CapabilityType],
        log: &Log,
    ) -> RequestId {
        let id = table.allocate_id();
        let log = log.clone();
        table.insert(PendingRequest {
            id,
            origin: origin.clone(),
            embedding_origin: None,
            user_gesture: true,
            delegate: Arc::new(NullDelegate),
            slots: capabilities.iter().map(|&c| Slot::new(c, None)).collect(),
            completion: Completion::Batch(Box::new(move |statuses| {
                log.lock().unwrap().push((tag, statuses));
            })),
        });
        id
    }

    /// Resolve `key` in its current round.
    fn decide(table: &mut RequestTable, key: &CorrelationKey, status: PermissionStatus) -> Resolution {
        let round = table.round(key).expect("key has waiters");
        table.resolve(key, round, status).expect("round is current")
    }

    fn fire_all(resolution: Resolution) {
        for request in resolution.completed {
            request.complete();
        }
    }

    #[test]
    fn test_ids_are_distinct() {
        let mut table = RequestTable::new();
        let a = table.allocate_id();
        let b = table.allocate_id();
        assert_eq!(a, RequestId::FIRST);
        assert_ne!(a, b);
        assert!(a.is_pending_operation() && b.is_pending_operation());
    }

    #[test]
    fn test_wrapped_ids_skip_outstanding() {
        let mut table = RequestTable::starting_at(RequestId::from_raw(i64::MAX));
        let log = Log::default();
        let geo = [CapabilityType::Geolocation];
        let a = origin("https://a.example");

        let last = request(&mut table, 1, &a, &geo, &log);
        assert_eq!(last, RequestId::from_raw(i64::MAX));

        // Wraps to FIRST.
        let first = request(&mut table, 2, &a, &geo, &log);
        assert_eq!(first, RequestId::FIRST);

        // Force another wrap and check FIRST is skipped while outstanding.
        table.next_id = RequestId::from_raw(i64::MAX);
        let next = table.allocate_id();
        assert_eq!(next, RequestId::from_raw(1));
    }

    #[test]
    fn test_resolve_fans_out_in_creation_order() {
        let mut table = RequestTable::new();
        let log = Log::default();
        let a = origin("https://a.example");
        let geo = [CapabilityType::Geolocation];

        request(&mut table, 1, &a, &geo, &log);
        request(&mut table, 2, &a, &geo, &log);

        let key = CorrelationKey::new(a, CapabilityType::Geolocation);
        let resolution = decide(&mut table, &key, PermissionStatus::Granted);
        assert_eq!(resolution.touched, 2);
        fire_all(resolution);

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                (1, vec![PermissionStatus::Granted]),
                (2, vec![PermissionStatus::Granted]),
            ]
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_resolve_leaves_other_keys_pending() {
        let mut table = RequestTable::new();
        let log = Log::default();
        let a = origin("https://a.example");
        let b = origin("https://b.example");
        let geo = [CapabilityType::Geolocation];

        request(&mut table, 1, &a, &geo, &log);
        let rb = request(&mut table, 2, &b, &geo, &log);
        let rmidi = request(&mut table, 3, &a, &[CapabilityType::MidiSysex], &log);

        fire_all(decide(
            &mut table,
            &CorrelationKey::new(a.clone(), CapabilityType::Geolocation),
            PermissionStatus::Granted,
        ));

        assert_eq!(log.lock().unwrap().len(), 1);
        assert!(table.contains(rb));
        assert!(table.contains(rmidi));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_remove_unindexes() {
        let mut table = RequestTable::new();
        let log = Log::default();
        let a = origin("https://a.example");
        let geo = [CapabilityType::Geolocation];
        let key = CorrelationKey::new(a.clone(), CapabilityType::Geolocation);

        let r1 = request(&mut table, 1, &a, &geo, &log);
        let r2 = request(&mut table, 2, &a, &geo, &log);
        assert_eq!(table.waiting_on(&key), &[r1, r2]);

        let removed = table.remove(r1).unwrap();
        assert_eq!(removed.id, r1);
        assert_eq!(table.waiting_on(&key), &[r2]);
        assert!(table.remove(r1).is_none());

        fire_all(decide(&mut table, &key, PermissionStatus::Denied));
        assert_eq!(*log.lock().unwrap(), vec![(2, vec![PermissionStatus::Denied])]);
    }

    #[test]
    fn test_batch_completes_after_every_slot() {
        let mut table = RequestTable::new();
        let log = Log::default();
        let a = origin("https://a.example");

        let id = request(
            &mut table,
            7,
            &a,
            &[CapabilityType::Geolocation, CapabilityType::MidiSysex],
            &log,
        );

        let partial = decide(
            &mut table,
            &CorrelationKey::new(a.clone(), CapabilityType::MidiSysex),
            PermissionStatus::Denied,
        );
        assert!(partial.completed.is_empty());
        assert_eq!(partial.touched, 1);
        assert!(table.contains(id));
        assert_eq!(
            table.get(id).unwrap().unresolved_capabilities(),
            vec![CapabilityType::Geolocation]
        );

        fire_all(decide(
            &mut table,
            &CorrelationKey::new(a, CapabilityType::Geolocation),
            PermissionStatus::Granted,
        ));
        assert_eq!(
            *log.lock().unwrap(),
            vec![(7, vec![PermissionStatus::Granted, PermissionStatus::Denied])]
        );
    }

    #[test]
    fn test_stale_round_is_ignored() {
        let mut table = RequestTable::new();
        let log = Log::default();
        let a = origin("https://a.example");
        let geo = [CapabilityType::Geolocation];
        let key = CorrelationKey::new(a.clone(), CapabilityType::Geolocation);

        request(&mut table, 1, &a, &geo, &log);
        let first_round = table.round(&key).unwrap();
        fire_all(decide(&mut table, &key, PermissionStatus::Granted));

        // A request arriving after the decision starts a new round.
        let later = request(&mut table, 2, &a, &geo, &log);
        assert_ne!(table.round(&key), Some(first_round));
        assert!(table
            .resolve(&key, first_round, PermissionStatus::Denied)
            .is_none());
        assert!(table.contains(later));
        assert_eq!(*log.lock().unwrap(), vec![(1, vec![PermissionStatus::Granted])]);
    }

    #[test]
    fn test_round_survives_partial_cancel() {
        let mut table = RequestTable::new();
        let log = Log::default();
        let a = origin("https://a.example");
        let geo = [CapabilityType::Geolocation];
        let key = CorrelationKey::new(a.clone(), CapabilityType::Geolocation);

        let r1 = request(&mut table, 1, &a, &geo, &log);
        let round = table.round(&key).unwrap();
        let r2 = request(&mut table, 2, &a, &geo, &log);
        assert_eq!(table.round(&key), Some(round));

        table.remove(r2);
        assert_eq!(table.round(&key), Some(round));

        table.remove(r1);
        assert_eq!(table.round(&key), None);
    }

    #[test]
    fn test_drain_is_oldest_first_and_silent() {
        let mut table = RequestTable::new();
        let log = Log::default();
        let a = origin("https://a.example");
        let geo = [CapabilityType::Geolocation];

        let r1 = request(&mut table, 1, &a, &geo, &log);
        let r2 = request(&mut table, 2, &a, &geo, &log);

        let drained: Vec<RequestId> = table.drain().into_iter().map(|r| r.id).collect();
        assert_eq!(drained, vec![r1, r2]);
        assert!(table.is_empty());
        assert!(log.lock().unwrap().is_empty());
        assert!(table
            .waiting_on(&CorrelationKey::new(a, CapabilityType::Geolocation))
            .is_empty());
    }

    #[test]
    fn test_slot_helpers() {
        let mut slots = vec![
            Slot::new(CapabilityType::Midi, Some(PermissionStatus::Granted)),
            Slot::new(CapabilityType::Geolocation, None),
            Slot::new(CapabilityType::Geolocation, None),
        ];
        assert_eq!(unresolved_capabilities(&slots), vec![CapabilityType::Geolocation]);

        fill_unresolved(&mut slots, PermissionStatus::Denied);
        assert_eq!(
            slot_statuses(&slots),
            vec![
                PermissionStatus::Granted,
                PermissionStatus::Denied,
                PermissionStatus::Denied
            ]
        );
    }
}
