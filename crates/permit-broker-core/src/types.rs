//! Strong type definitions for the broker.
//!
//! Identifiers are newtypes so a request id can't be mixed up with a
//! process or frame id at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capability::CapabilityType;
use crate::origin::Origin;

/// Identifier of an outstanding permission request.
///
/// Real ids are non-negative. [`RequestId::NO_PENDING`] is returned when a
/// request finished before the call returned, so there is nothing to cancel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(i64);

impl RequestId {
    /// Sentinel meaning "no pending operation was created".
    pub const NO_PENDING: Self = Self(-1);

    /// The first id handed out by a fresh broker.
    pub const FIRST: Self = Self(0);

    /// Wrap a raw value. Negative values other than `-1` are not produced by
    /// the broker but are accepted so callers can round-trip ids they stored.
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(&self) -> i64 {
        self.0
    }

    /// Whether this id refers to an operation that may still be pending.
    pub const fn is_pending_operation(&self) -> bool {
        self.0 >= 0
    }

    /// The id following this one; wraps to [`RequestId::FIRST`] on exhaustion.
    pub const fn next(&self) -> Self {
        match self.0.checked_add(1) {
            Some(n) => Self(n),
            None => Self::FIRST,
        }
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::NO_PENDING {
            f.write_str("RequestId(NO_PENDING)")
        } else {
            write!(f, "RequestId({})", self.0)
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RequestId> for i64 {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

/// The pair a decision is correlated on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationKey {
    pub origin: Origin,
    pub capability: CapabilityType,
}

impl CorrelationKey {
    pub fn new(origin: Origin, capability: CapabilityType) -> Self {
        Self { origin, capability }
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.capability, self.origin)
    }
}

/// Identity of the party issuing a request.
///
/// Resolved by the caller before reaching the broker; the broker only uses
/// it to pick a delegate and, for cached capabilities, the embedding origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerContext {
    /// Process hosting the requesting frame.
    pub process_id: i32,

    /// Frame within that process.
    pub frame_id: i32,

    /// Top-level origin the requesting frame is embedded in, if known.
    pub embedding_origin: Option<Origin>,
}

impl CallerContext {
    pub fn new(process_id: i32, frame_id: i32) -> Self {
        Self {
            process_id,
            frame_id,
            embedding_origin: None,
        }
    }

    pub fn with_embedding_origin(mut self, origin: Origin) -> Self {
        self.embedding_origin = Some(origin);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_not_pending() {
        assert!(!RequestId::NO_PENDING.is_pending_operation());
        assert!(RequestId::FIRST.is_pending_operation());
        assert_eq!(RequestId::NO_PENDING.as_raw(), -1);
    }

    #[test]
    fn test_next_wraps_to_first() {
        assert_eq!(RequestId::from_raw(4).next(), RequestId::from_raw(5));
        assert_eq!(RequestId::from_raw(i64::MAX).next(), RequestId::FIRST);
    }

    #[test]
    fn test_request_id_debug() {
        assert_eq!(format!("{:?}", RequestId::NO_PENDING), "RequestId(NO_PENDING)");
        assert_eq!(format!("{:?}", RequestId::from_raw(7)), "RequestId(7)");
    }

    #[test]
    fn test_correlation_key_display() {
        let key = CorrelationKey::new(
            Origin::parse("https://a.example").unwrap(),
            CapabilityType::Geolocation,
        );
        assert_eq!(key.to_string(), "geolocation@https://a.example");
    }
}
