//! HTTP client for the AgriClip backend.
//!
//! One shared `reqwest::Client` behind a thin wrapper that owns the bearer
//! token lookup, the response envelope handling and the global 401 policy:
//! an unauthorized response from *any* endpoint tears the session down and
//! notifies the host, so no later call is attempted with a stale token.

use reqwest::{Response, StatusCode, multipart};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::CoreConfig;
use crate::events::{CoreEvent, EventSender};
use crate::models::SessionHandle;

use super::error::{CoreError, CoreResult};
use super::upload_service::UploadFile;
use super::wire::{
    ApiEnvelope, ClassificationStatus, ClassifyRequest, HistoryData, MessageAck,
    SendMessageRequest, SessionsData, UploadData,
};

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionHandle,
    events: EventSender,
}

impl ApiClient {
    pub fn new(config: &CoreConfig, session: SessionHandle, events: EventSender) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            events,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Current bearer token, or `AuthExpired` when the session has already
    /// been torn down.
    fn bearer(&self) -> CoreResult<String> {
        self.session.token().ok_or(CoreError::AuthExpired)
    }

    fn force_logout(&self) {
        warn!("backend returned 401, tearing down session");
        self.session.clear();
        self.events.emit(CoreEvent::LoggedOut);
    }

    /// Unwrap the `{ success, data, message }` envelope around `T`.
    async fn handle_envelope<T: DeserializeOwned>(&self, response: Response) -> CoreResult<T> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.force_logout();
            return Err(CoreError::AuthExpired);
        }
        if !status.is_success() {
            let message = response
                .json::<ApiEnvelope<serde_json::Value>>()
                .await
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| format!("request failed with status {status}"));
            return Err(CoreError::ServerRejected(message));
        }

        let envelope: ApiEnvelope<T> = response.json().await?;
        if !envelope.success {
            return Err(CoreError::ServerRejected(
                envelope
                    .message
                    .unwrap_or_else(|| "request rejected by server".to_string()),
            ));
        }
        envelope
            .data
            .ok_or_else(|| CoreError::Transport("response envelope is missing data".to_string()))
    }

    /// Like [`Self::handle_envelope`] for endpoints that acknowledge without
    /// a payload.
    async fn handle_ack(&self, response: Response) -> CoreResult<()> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.force_logout();
            return Err(CoreError::AuthExpired);
        }
        let envelope = response
            .json::<ApiEnvelope<serde_json::Value>>()
            .await
            .unwrap_or(ApiEnvelope {
                success: status.is_success(),
                data: None,
                message: None,
            });
        if !status.is_success() || !envelope.success {
            return Err(CoreError::ServerRejected(
                envelope
                    .message
                    .unwrap_or_else(|| format!("request failed with status {status}")),
            ));
        }
        Ok(())
    }

    /// `POST /api/upload/image` — multipart upload of a validated image.
    pub async fn upload_image(
        &self,
        file: &UploadFile,
        upload_type: &str,
    ) -> CoreResult<UploadData> {
        let token = self.bearer()?;
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|err| CoreError::InvalidInput(format!("bad mime type: {err}")))?;
        let form = multipart::Form::new()
            .part("image", part)
            .text("uploadType", upload_type.to_string());

        debug!(name = %file.name, size = file.bytes.len(), upload_type, "uploading image");
        let response = self
            .http
            .post(self.url("/api/upload/image"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        self.handle_envelope(response).await
    }

    /// `POST /api/chat/message` — store a user message; the backend assigns
    /// a session id on the first call.
    pub async fn send_message(&self, request: &SendMessageRequest) -> CoreResult<MessageAck> {
        let token = self.bearer()?;
        let response = self
            .http
            .post(self.url("/api/chat/message"))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        self.handle_envelope(response).await
    }

    /// `GET /api/chat/sessions` — most recent first.
    pub async fn list_sessions(&self) -> CoreResult<SessionsData> {
        let token = self.bearer()?;
        let response = self
            .http
            .get(self.url("/api/chat/sessions"))
            .bearer_auth(token)
            .send()
            .await?;
        self.handle_envelope(response).await
    }

    /// `GET /api/chat/history/{sessionId}` — the full stored history.
    pub async fn history(&self, session_id: &str) -> CoreResult<HistoryData> {
        let token = self.bearer()?;
        let response = self
            .http
            .get(self.url(&format!("/api/chat/history/{session_id}")))
            .bearer_auth(token)
            .send()
            .await?;
        self.handle_envelope(response).await
    }

    /// `POST /api/model/classify` — submit a classification job. Ack only.
    pub async fn submit_classification(&self, request: &ClassifyRequest) -> CoreResult<()> {
        let token = self.bearer()?;
        debug!(upload_id = %request.upload_id, domain = request.image_domain.as_str(), "submitting classification job");
        let response = self
            .http
            .post(self.url("/api/model/classify"))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        self.handle_ack(response).await
    }

    /// `GET /api/model/classify/{uploadId}/status`.
    pub async fn classification_status(
        &self,
        upload_id: &str,
    ) -> CoreResult<ClassificationStatus> {
        let token = self.bearer()?;
        let response = self
            .http
            .get(self.url(&format!("/api/model/classify/{upload_id}/status")))
            .bearer_auth(token)
            .send()
            .await?;
        self.handle_envelope(response).await
    }

    /// `DELETE /api/chat/session/{sessionId}` — used by "clear chat".
    pub async fn delete_session(&self, session_id: &str) -> CoreResult<()> {
        let token = self.bearer()?;
        let response = self
            .http
            .delete(self.url(&format!("/api/chat/session/{session_id}")))
            .bearer_auth(token)
            .send()
            .await?;
        self.handle_ack(response).await
    }
}
