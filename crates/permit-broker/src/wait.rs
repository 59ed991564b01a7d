//! Awaitable requests.
//!
//! The broker itself has no timeouts: a request stays pending until it is
//! decided or cancelled. These helpers wrap the callback API in a oneshot
//! channel and let async callers bound how long they wait.

use std::time::Duration;

use permit_broker_core::{CallerContext, CapabilityType, Origin, PermissionStatus, RequestId};
use tokio::sync::oneshot;
use tracing::debug;

use crate::broker::PermissionBroker;
use crate::error::Result;

/// A request whose outcome can be awaited.
#[derive(Debug)]
pub struct PendingDecision {
    id: RequestId,
    receiver: oneshot::Receiver<PermissionStatus>,
}

impl PendingDecision {
    /// The broker id, or [`RequestId::NO_PENDING`] if already decided.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wait for the outcome. `None` if the request was cancelled or the
    /// broker was dropped first.
    pub async fn wait(self) -> Option<PermissionStatus> {
        self.receiver.await.ok()
    }

    /// The outcome, if it has already arrived.
    pub fn try_decided(&mut self) -> Option<PermissionStatus> {
        self.receiver.try_recv().ok()
    }
}

impl PermissionBroker {
    /// Request a capability and get a handle to await its outcome.
    pub fn request(
        &self,
        capability: CapabilityType,
        context: &CallerContext,
        origin: &Origin,
        user_gesture: bool,
    ) -> Result<PendingDecision> {
        let (sender, receiver) = oneshot::channel();
        let id = self.request_permission(capability, context, origin, user_gesture, move |status| {
            // The receiver may already be gone; nobody is waiting then.
            let _ = sender.send(status);
        })?;

        Ok(PendingDecision { id, receiver })
    }

    /// Request a capability and wait at most `timeout` for the outcome.
    ///
    /// On timeout the request is cancelled and `None` is returned, unless
    /// the decision landed in the meantime.
    pub async fn request_with_timeout(
        &self,
        capability: CapabilityType,
        context: &CallerContext,
        origin: &Origin,
        user_gesture: bool,
        timeout: Duration,
    ) -> Result<Option<PermissionStatus>> {
        let PendingDecision { id, mut receiver } =
            self.request(capability, context, origin, user_gesture)?;

        match tokio::time::timeout(timeout, &mut receiver).await {
            Ok(outcome) => Ok(outcome.ok()),
            Err(_) => {
                debug!(request_id = %id, ?timeout, %capability, %origin, "request timed out; cancelling");
                self.cancel_permission_request(id);
                Ok(receiver.try_recv().ok())
            }
        }
    }
}
