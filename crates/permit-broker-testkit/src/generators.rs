//! Proptest generators for property-based testing.

use proptest::prelude::*;

use permit_broker_core::{CapabilityType, Origin};

use crate::fixtures::origin;

/// Origins used by generated scenarios. Kept small so keys collide often.
pub const ORIGIN_POOL: [&str; 3] = [
    "https://a.example",
    "https://b.example",
    "https://c.example:8443",
];

/// Capabilities used by generated scenarios.
pub const CAPABILITY_POOL: [CapabilityType; 3] = [
    CapabilityType::Geolocation,
    CapabilityType::ProtectedMediaIdentifier,
    CapabilityType::MidiSysex,
];

/// Generate a pool origin index.
pub fn origin_index() -> impl Strategy<Value = usize> {
    0..ORIGIN_POOL.len()
}

/// Resolve a pool origin index.
pub fn pool_origin(index: usize) -> Origin {
    origin(ORIGIN_POOL[index % ORIGIN_POOL.len()])
}

/// Generate a pool capability.
pub fn capability() -> impl Strategy<Value = CapabilityType> {
    prop::sample::select(CAPABILITY_POOL.to_vec())
}

/// One step of a generated broker scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Issue a request for `(ORIGIN_POOL[origin], capability)`.
    Request { origin: usize, capability: CapabilityType },

    /// Cancel the `pick`-th id issued so far (modulo the count), whether or
    /// not it is still pending.
    Cancel { pick: usize },

    /// Cancel an id the broker never issued.
    CancelUnknown { raw: i64 },

    /// Supply a decision through the delegate.
    Decide {
        origin: usize,
        capability: CapabilityType,
        granted: bool,
    },
}

/// Generate a single scenario step.
pub fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (origin_index(), capability())
            .prop_map(|(origin, capability)| Op::Request { origin, capability }),
        2 => any::<usize>().prop_map(|pick| Op::Cancel { pick }),
        1 => (1_000_000i64..i64::MAX).prop_map(|raw| Op::CancelUnknown { raw }),
        3 => (origin_index(), capability(), any::<bool>()).prop_map(
            |(origin, capability, granted)| Op::Decide {
                origin,
                capability,
                granted,
            }
        ),
    ]
}

/// Generate a scenario of up to `max_len` steps.
pub fn ops(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op(), 0..=max_len)
}
