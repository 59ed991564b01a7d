//! Last-decision cache.
//!
//! Remembers the most recent decision for a capability per
//! (requesting origin, embedding origin) pair, so status queries can be
//! answered without asking the delegate. Bounded; the oldest entry is
//! evicted first.

use std::collections::{HashMap, VecDeque};

use permit_broker_core::{CapabilityType, Origin, PermissionStatus};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    capability: CapabilityType,
    requesting: Origin,
    embedding: Origin,
}

/// Bounded map of remembered decisions.
#[derive(Debug)]
pub struct DecisionCache {
    capacity: usize,
    entries: HashMap<CacheKey, PermissionStatus>,
    order: VecDeque<CacheKey>,
}

impl DecisionCache {
    /// Create a cache holding at most `capacity` decisions. A zero capacity
    /// remembers nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Remember `status`. `Ask` is never stored.
    pub fn record(
        &mut self,
        capability: CapabilityType,
        requesting: &Origin,
        embedding: &Origin,
        status: PermissionStatus,
    ) {
        if self.capacity == 0 || status == PermissionStatus::Ask {
            return;
        }

        let key = CacheKey {
            capability,
            requesting: requesting.clone(),
            embedding: embedding.clone(),
        };

        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = status;
            return;
        }

        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, status);
    }

    /// The remembered decision, if any.
    pub fn get(
        &self,
        capability: CapabilityType,
        requesting: &Origin,
        embedding: &Origin,
    ) -> Option<PermissionStatus> {
        let key = CacheKey {
            capability,
            requesting: requesting.clone(),
            embedding: embedding.clone(),
        };
        self.entries.get(&key).copied()
    }

    /// Forget the remembered decision. Returns whether one existed.
    pub fn forget(
        &mut self,
        capability: CapabilityType,
        requesting: &Origin,
        embedding: &Origin,
    ) -> bool {
        let key = CacheKey {
            capability,
            requesting: requesting.clone(),
            embedding: embedding.clone(),
        };
        if self.entries.remove(&key).is_some() {
            self.order.retain(|k| *k != key);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
