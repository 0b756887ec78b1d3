//! Upload input validation and progress reporting.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::CoreConfig;
use crate::events::{CoreEvent, EventSender};
use crate::models::SessionHandle;

use super::error::{CoreError, CoreResult};

/// An image the host wants to upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Where the upload originates, which decides the stored upload type, the
/// provisional message text and the conversation topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadContext {
    CropAnalysis,
    ChatAttachment,
}

impl UploadContext {
    pub fn upload_type(&self) -> &'static str {
        match self {
            UploadContext::CropAnalysis => "crop_analysis",
            UploadContext::ChatAttachment => "chat_attachment",
        }
    }

    pub fn provisional_text(&self) -> &'static str {
        match self {
            UploadContext::CropAnalysis => "I've uploaded an image for analysis",
            UploadContext::ChatAttachment => "I've attached an image",
        }
    }

    pub fn conversation_topic(&self) -> &'static str {
        match self {
            UploadContext::CropAnalysis => "crop_analysis",
            UploadContext::ChatAttachment => "general",
        }
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub upload_id: String,
    pub url: String,
}

/// Fail fast with `InvalidInput` before any network call: a token must be
/// present, the payload must be an image, and it must fit the size ceiling.
pub fn validate(
    file: &UploadFile,
    config: &CoreConfig,
    session: &SessionHandle,
) -> CoreResult<()> {
    if !session.is_authenticated() {
        return Err(CoreError::InvalidInput(
            "not logged in, cannot upload".to_string(),
        ));
    }
    if !file.mime_type.starts_with("image/") {
        return Err(CoreError::InvalidInput(format!(
            "unsupported content type {}, expected an image",
            file.mime_type
        )));
    }
    if file.bytes.len() > config.max_upload_bytes {
        return Err(CoreError::InvalidInput(format!(
            "image is {} bytes, limit is {}",
            file.bytes.len(),
            config.max_upload_bytes
        )));
    }
    Ok(())
}

/// Emits a monotonically increasing progress ramp while an upload request
/// is in flight.
///
/// The backend gives no byte-level feedback, so progress is synthetic: it
/// climbs in steps toward 90 and holds there until the request resolves.
/// The caller emits the final 100 on success; on failure the ramp just
/// stops, keeping the sequence monotonic.
pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

const PROGRESS_STEP_INTERVAL: Duration = Duration::from_millis(100);
const PROGRESS_STEP: u8 = 15;
const PROGRESS_HOLD_AT: u8 = 90;

impl ProgressTicker {
    pub fn start(events: EventSender) -> Self {
        events.emit(CoreEvent::UploadProgress(0));
        let handle = tokio::spawn(async move {
            let mut percent: u8 = 0;
            while percent < PROGRESS_HOLD_AT {
                tokio::time::sleep(PROGRESS_STEP_INTERVAL).await;
                percent = percent.saturating_add(PROGRESS_STEP).min(PROGRESS_HOLD_AT);
                events.emit(CoreEvent::UploadProgress(percent));
            }
        });
        Self { handle }
    }

    /// Stop the ramp and report completion.
    pub fn finish(self, events: &EventSender) {
        self.handle.abort();
        events.emit(CoreEvent::UploadProgress(100));
    }

    /// Stop the ramp without reporting completion.
    pub fn cancel(self) {
        debug!("upload failed, stopping progress ramp");
        self.handle.abort();
    }
}
