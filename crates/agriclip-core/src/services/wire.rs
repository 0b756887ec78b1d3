//! Wire-level payload shapes of the AgriClip backend API.
//!
//! Every response is wrapped in the uniform `{ success, data?, message? }`
//! envelope; request and payload fields are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Attachment, Domain, Message, Role};

/// Uniform response envelope.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /api/upload/image` success payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadData {
    pub upload_id: String,
    pub filename: String,
}

/// `POST /api/chat/message` success payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAck {
    pub session_id: String,
}

/// `GET /api/chat/sessions` success payload. Sessions are ordered most
/// recent first by the backend.
#[derive(Debug, Deserialize)]
pub struct SessionsData {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Deserialize)]
pub struct SessionSummary {
    #[serde(rename = "_id")]
    pub id: String,
}

/// `GET /api/chat/history/{sessionId}` success payload.
#[derive(Debug, Deserialize)]
pub struct HistoryData {
    pub messages: Vec<WireMessage>,
}

/// A stored message as the backend returns it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    #[serde(rename = "_id")]
    pub id: String,
    /// `"user"` or `"ai"`.
    pub message_type: String,
    #[serde(default)]
    pub content: WireContent,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireContent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<WireAttachment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAttachment {
    pub original_name: String,
    pub mime_type: String,
    pub file_url: String,
}

impl WireMessage {
    pub fn is_assistant(&self) -> bool {
        self.message_type == "ai"
    }

    pub fn into_message(self) -> Message {
        let role = if self.message_type == "user" {
            Role::User
        } else {
            Role::Assistant
        };
        Message {
            id: self.id,
            role,
            text: self.content.text.unwrap_or_default(),
            created_at: self.created_at,
            attachments: self
                .content
                .attachments
                .into_iter()
                .map(|att| Attachment {
                    name: att.original_name,
                    mime_type: att.mime_type,
                    url: att.file_url,
                })
                .collect(),
            classification: None,
            domain: None,
        }
    }
}

/// `POST /api/chat/message` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: OutgoingContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub message_type: &'static str,
    pub context: MessageContext,
}

#[derive(Debug, Serialize)]
pub struct OutgoingContent {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<OutgoingAttachment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingAttachment {
    pub upload_id: String,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContext {
    pub conversation_topic: &'static str,
}

/// `POST /api/model/classify` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub upload_id: String,
    pub image_domain: Domain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub additional_info: AdditionalInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfo {
    pub message_content: String,
}

/// `GET /api/model/classify/{uploadId}/status` success payload.
#[derive(Debug, Deserialize)]
pub struct ClassificationStatus {
    pub status: JobStatus,
    #[serde(default)]
    pub classification: Option<serde_json::Value>,
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_message_maps_to_message() {
        let wire: WireMessage = serde_json::from_value(json!({
            "_id": "m1",
            "messageType": "ai",
            "content": {
                "text": "hello",
                "attachments": [{
                    "originalName": "cow.jpg",
                    "mimeType": "image/jpeg",
                    "fileUrl": "/uploads/cow-1.jpg",
                }],
            },
            "createdAt": "2025-03-01T10:00:00Z",
        }))
        .unwrap();

        assert!(wire.is_assistant());
        let message = wire.into_message();
        assert_eq!(message.id, "m1");
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.attachments[0].url, "/uploads/cow-1.jpg");
    }

    #[test]
    fn test_send_request_omits_empty_session_and_attachments() {
        let request = SendMessageRequest {
            content: OutgoingContent {
                text: "why are my tomato leaves yellow?".to_string(),
                attachments: Vec::new(),
            },
            session_id: None,
            message_type: "user",
            context: MessageContext {
                conversation_topic: "general",
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("sessionId").is_none());
        assert!(value["content"].get("attachments").is_none());
        assert_eq!(value["context"]["conversationTopic"], "general");
    }

    #[test]
    fn test_classify_request_uses_camel_case_domain() {
        let request = ClassifyRequest {
            upload_id: "u1".to_string(),
            image_domain: Domain::Livestock,
            session_id: Some("s1".to_string()),
            additional_info: AdditionalInfo {
                message_content: "I've uploaded an image for analysis".to_string(),
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["imageDomain"], "livestock");
        assert_eq!(value["additionalInfo"]["messageContent"]
            .as_str()
            .unwrap(), "I've uploaded an image for analysis");
    }

    #[test]
    fn test_status_payload_tolerates_missing_optionals() {
        let status: ClassificationStatus =
            serde_json::from_value(json!({ "status": "processing" })).unwrap();
        assert_eq!(status.status, JobStatus::Processing);
        assert!(status.classification.is_none());
        assert!(status.report.is_none());
        assert!(status.error.is_none());
    }
}
