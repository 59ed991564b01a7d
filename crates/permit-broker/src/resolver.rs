//! Delegate selection.
//!
//! The broker is handed a resolver at construction instead of looking up
//! delegates through ambient state. Resolution is a pure function of the
//! caller context.

use std::sync::Arc;

use permit_broker_core::CallerContext;
use permit_broker_delegate::DecisionDelegate;

/// Picks the delegate responsible for a caller.
pub trait DelegateResolver: Send + Sync {
    /// `None` means nobody can decide for this caller; the broker denies.
    fn resolve(&self, context: &CallerContext) -> Option<Arc<dyn DecisionDelegate>>;
}

impl<F> DelegateResolver for F
where
    F: Fn(&CallerContext) -> Option<Arc<dyn DecisionDelegate>> + Send + Sync,
{
    fn resolve(&self, context: &CallerContext) -> Option<Arc<dyn DecisionDelegate>> {
        self(context)
    }
}

/// Resolves every caller to the same delegate.
#[derive(Clone)]
pub struct SharedDelegate(Arc<dyn DecisionDelegate>);

impl SharedDelegate {
    pub fn new(delegate: Arc<dyn DecisionDelegate>) -> Self {
        Self(delegate)
    }
}

impl DelegateResolver for SharedDelegate {
    fn resolve(&self, _context: &CallerContext) -> Option<Arc<dyn DecisionDelegate>> {
        Some(Arc::clone(&self.0))
    }
}
