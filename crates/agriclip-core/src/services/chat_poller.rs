//! Polls the session history for an asynchronously generated assistant
//! reply.
//!
//! The backend stores a sent message immediately but generates the reply in
//! the background, so the client re-reads the full history on a fixed
//! cadence until a new assistant entry shows up or the attempt budget runs
//! out. Exhaustion is silent: the typing indicator clears and no error
//! entry is added, unlike the classification poller which does surface its
//! terminal failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::PollPolicy;
use crate::events::{CoreEvent, EventSender};
use crate::models::SharedLog;

use super::api_client::ApiClient;
use super::error::{CoreError, CoreResult};

pub(crate) struct ChatPoller {
    pub api: Arc<ApiClient>,
    pub log: SharedLog,
    pub events: EventSender,
    pub policy: PollPolicy,
    pub cancel: Arc<AtomicBool>,
}

impl ChatPoller {
    /// Spawn the poll loop for `session_id`. The task owns its state and
    /// runs to its own terminal condition or until the cancel flag is set.
    pub fn spawn(self, session_id: String) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(session_id).await })
    }

    async fn run(self, session_id: String) {
        sleep(self.policy.initial_delay).await;

        let budget = self.policy.max_attempts.unwrap_or(u32::MAX);
        let mut attempts: u32 = 0;
        while attempts < budget {
            if self.cancel.load(Ordering::Relaxed) {
                debug!(session_id = %session_id, "chat poll cancelled");
                return;
            }
            attempts += 1;

            match self.poll_once(&session_id).await {
                Ok(true) => {
                    debug!(session_id = %session_id, attempts, "assistant reply received");
                    self.events.emit(CoreEvent::Typing(false));
                    return;
                }
                Ok(false) => {
                    debug!(session_id = %session_id, attempt = attempts, "no new assistant entry yet");
                }
                Err(CoreError::AuthExpired) => {
                    // Session already torn down by the client; nothing left
                    // to poll with.
                    self.events.emit(CoreEvent::Typing(false));
                    return;
                }
                Err(err) => {
                    // Presumed transient; the attempt still counts.
                    warn!(session_id = %session_id, attempt = attempts, error = %err, "history poll failed, retrying");
                }
            }

            if attempts < budget {
                sleep(self.policy.interval).await;
            }
        }

        debug!(session_id = %session_id, attempts = budget, "assistant reply did not arrive within the poll budget");
        self.events.emit(CoreEvent::Typing(false));
    }

    /// One history fetch. Returns `Ok(true)` when a new assistant entry was
    /// appended to the log.
    async fn poll_once(&self, session_id: &str) -> CoreResult<bool> {
        let history = self.api.history(session_id).await?;
        let Some(latest) = history
            .messages
            .into_iter()
            .filter(|message| message.is_assistant())
            .next_back()
        else {
            return Ok(false);
        };
        if latest.content.text.as_deref().unwrap_or("").is_empty() {
            return Ok(false);
        }

        // The id-presence check is the sole deduplication guard: a stale
        // reply from a previous exchange is already in the log and counts
        // as "nothing new", so polling continues.
        let appended = self.log.lock().append_unique(latest.into_message());
        if appended {
            self.events.emit(CoreEvent::LogChanged);
        }
        Ok(appended)
    }
}
