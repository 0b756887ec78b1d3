use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// Conversation identifier and bearer token.
///
/// Created lazily: the session id is assigned by the backend on the first
/// successful message or upload and reused for every later call.
#[derive(Debug, Default)]
struct SessionState {
    session_id: Option<String>,
    auth_token: Option<String>,
}

/// Shared handle to the session state.
///
/// Every component gets an explicit clone of this handle instead of reading
/// ambient globals, so tests can inject their own. Locking stays inside the
/// accessors; callers never hold the lock across an await point.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.inner.lock().auth_token = Some(token.into());
    }

    pub fn token(&self) -> Option<String> {
        self.inner.lock().auth_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().auth_token.is_some()
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.lock().session_id.clone()
    }

    pub fn set_session_id(&self, id: impl Into<String>) {
        self.inner.lock().session_id = Some(id.into());
    }

    /// Keep the current session id if one exists, otherwise adopt the id the
    /// backend just returned. Returns the effective id.
    pub fn adopt_session_id(&self, id: &str) -> String {
        let mut state = self.inner.lock();
        match &state.session_id {
            Some(existing) => existing.clone(),
            None => {
                debug!(session_id = %id, "adopting session id from backend");
                state.session_id = Some(id.to_string());
                id.to_string()
            }
        }
    }

    /// Forget the session id only ("clear chat" keeps the token).
    pub fn clear_session_id(&self) {
        self.inner.lock().session_id = None;
    }

    /// Full teardown after a 401: both the token and the session id are
    /// dropped so no further call can be attempted with stale credentials.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.auth_token = None;
        state.session_id = None;
    }
}
