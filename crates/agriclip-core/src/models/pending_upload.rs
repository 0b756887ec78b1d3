use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// The single in-flight record linking an uploaded image to the
/// conversation, alive between upload completion and domain selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingClassificationRequest {
    pub upload_id: String,
    pub session_id: Option<String>,
    pub message_text: String,
}

/// Single-slot holder for the pending classification request.
///
/// At most one request may be outstanding at a time; an upload attempted
/// while the slot is occupied is rejected rather than queued. The slot is
/// consumed exactly once when a job is submitted, or released when the user
/// cancels domain selection.
#[derive(Clone, Default)]
pub struct PendingSlot {
    inner: Arc<Mutex<Option<PendingClassificationRequest>>>,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupy the slot. Returns `false` when a request is already pending.
    pub fn try_occupy(&self, request: PendingClassificationRequest) -> bool {
        let mut slot = self.inner.lock();
        if slot.is_some() {
            debug!(upload_id = %request.upload_id, "pending slot busy, rejecting");
            return false;
        }
        *slot = Some(request);
        true
    }

    /// Consume the pending request, leaving the slot free.
    pub fn take(&self) -> Option<PendingClassificationRequest> {
        self.inner.lock().take()
    }

    pub fn is_occupied(&self) -> bool {
        self.inner.lock().is_some()
    }

    pub fn clear(&self) {
        *self.inner.lock() = None;
    }
}
