//! Test fixtures and helpers.
//!
//! Common setup code for broker tests: well-known origins, a caller
//! context, and a recorder for completions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use permit_broker_core::{CallerContext, Origin, PermissionStatus};

pub const PROCESS_ID: i32 = 8;
pub const FRAME_ID: i32 = 19;
pub const EMBEDDING_ORIGIN: &str = "https://top.example";
pub const ORIGIN_A: &str = "https://a.example";
pub const ORIGIN_B: &str = "https://b.example";

/// Parse a fixture origin.
pub fn origin(s: &str) -> Origin {
    match Origin::parse(s) {
        Ok(origin) => origin,
        Err(e) => panic!("fixture origin {s:?} must parse: {e}"),
    }
}

pub fn origin_a() -> Origin {
    origin(ORIGIN_A)
}

pub fn origin_b() -> Origin {
    origin(ORIGIN_B)
}

/// The caller context used throughout the tests.
pub fn test_context() -> CallerContext {
    CallerContext::new(PROCESS_ID, FRAME_ID).with_embedding_origin(origin(EMBEDDING_ORIGIN))
}

/// One fired completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Caller-chosen tag identifying which request this was.
    pub tag: u32,
    pub status: PermissionStatus,
}

/// Records completions in the order they fire.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    resolved: Arc<Mutex<Vec<Resolved>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Resolved>> {
        self.resolved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A single-capability completion tagged `tag`.
    pub fn callback(&self, tag: u32) -> impl FnOnce(PermissionStatus) + Send + 'static {
        let resolved = Arc::clone(&self.resolved);
        move |status| {
            resolved
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Resolved { tag, status });
        }
    }

    /// A batch completion tagged `tag`; each status is recorded in order.
    pub fn batch_callback(&self, tag: u32) -> impl FnOnce(Vec<PermissionStatus>) + Send + 'static {
        let resolved = Arc::clone(&self.resolved);
        move |statuses| {
            let mut resolved = resolved.lock().unwrap_or_else(PoisonError::into_inner);
            resolved.extend(statuses.into_iter().map(|status| Resolved { tag, status }));
        }
    }

    pub fn resolved(&self) -> Vec<Resolved> {
        self.lock().clone()
    }

    pub fn statuses(&self) -> Vec<PermissionStatus> {
        self.lock().iter().map(|r| r.status).collect()
    }

    pub fn tags(&self) -> Vec<u32> {
        self.lock().iter().map(|r| r.tag).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
