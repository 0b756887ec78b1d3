//! Drives a submitted classification job to its terminal state.
//!
//! After submission the backend processes the image asynchronously; the
//! client polls the status endpoint on a fixed cadence with no attempt
//! ceiling — a job that never terminates keeps the loop alive until the
//! cancel flag stops it. A 401 stops the loop outright (the session is torn
//! down by the client); every other outcome produces a terminal update that
//! replaces the "analyzing" placeholder in place, guarded by the placeholder
//! still being present: if the conversation was cleared meanwhile, the
//! result is dropped instead of appended.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::PollPolicy;
use crate::events::{CoreEvent, EventSender};
use crate::models::{ClassificationResult, Domain, Message, SharedLog};

use super::api_client::ApiClient;
use super::error::CoreError;
use super::wire::{ClassificationStatus, JobStatus};

/// Everything the poll loop needs about the submitted job.
pub(crate) struct ClassificationJob {
    pub upload_id: String,
    /// The domain the user chose. The terminal message is always built from
    /// this value, never from a domain echoed by the server.
    pub domain: Domain,
    pub placeholder_id: String,
}

pub(crate) struct ClassificationPoller {
    pub api: Arc<ApiClient>,
    pub log: SharedLog,
    pub events: EventSender,
    pub policy: PollPolicy,
    pub cancel: Arc<AtomicBool>,
}

impl ClassificationPoller {
    pub fn spawn(self, job: ClassificationJob) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(job).await })
    }

    async fn run(self, job: ClassificationJob) {
        sleep(self.policy.initial_delay).await;

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                debug!(upload_id = %job.upload_id, "classification poll cancelled");
                return;
            }

            match self.api.classification_status(&job.upload_id).await {
                Ok(status) => match status.status {
                    JobStatus::Processing => {
                        debug!(upload_id = %job.upload_id, "classification still processing");
                    }
                    JobStatus::Completed => {
                        info!(upload_id = %job.upload_id, "classification completed");
                        self.finish(&job, completed_message(&job, status));
                        return;
                    }
                    JobStatus::Failed => {
                        warn!(upload_id = %job.upload_id, error = ?status.error, "classification failed");
                        self.finish(&job, failed_message(status.error.as_deref()));
                        return;
                    }
                },
                Err(CoreError::AuthExpired) => {
                    // Session already torn down by the client; the
                    // placeholder stays as-is.
                    debug!(upload_id = %job.upload_id, "status poll unauthorized, stopping");
                    return;
                }
                Err(err) => {
                    // A failed status poll is terminal for this poller; the
                    // poll call itself is not retried.
                    warn!(upload_id = %job.upload_id, error = %err, "status poll failed, giving up");
                    self.finish(
                        &job,
                        Message::assistant(
                            "Analysis error: the analysis results could not be retrieved. \
                             Please try again.",
                        ),
                    );
                    return;
                }
            }

            sleep(self.policy.interval).await;
        }
    }

    /// Apply the terminal update, guarded by the placeholder still existing.
    fn finish(&self, job: &ClassificationJob, terminal: Message) {
        let applied = self.log.lock().replace(&job.placeholder_id, terminal);
        if applied {
            self.events.emit(CoreEvent::LogChanged);
        } else {
            debug!(
                upload_id = %job.upload_id,
                placeholder_id = %job.placeholder_id,
                "placeholder gone, dropping terminal classification update"
            );
        }
    }
}

/// Text shown while the job is processing.
pub(crate) fn placeholder_message(domain: Domain) -> Message {
    Message::assistant(format!(
        "Analyzing your {} image with the AgriClip model... This may take a few seconds.",
        domain.label()
    ))
}

fn completed_message(job: &ClassificationJob, status: ClassificationStatus) -> Message {
    let classification = status
        .classification
        .as_ref()
        .map(|value| ClassificationResult::from_wire(job.domain, value));

    // Prefer the narrative report; fall back to the raw structured result
    // so a completed job never produces an empty message.
    let text = match (status.report, &status.classification) {
        (Some(report), _) => report,
        (None, Some(value)) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        (None, None) => "Analysis completed, but no result details were returned.".to_string(),
    };

    let mut message = Message::assistant(text);
    message.domain = Some(job.domain);
    message.classification = classification;
    message
}

fn failed_message(error: Option<&str>) -> Message {
    Message::assistant(format!(
        "Analysis failed: {}. Please try uploading the image again or contact support \
         if the issue persists.",
        error.unwrap_or("unknown error")
    ))
}
