use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classification::ClassificationResult;

/// Analysis category chosen by the user for an uploaded image.
///
/// The domain determines which classification fields apply and which
/// narrative template the backend uses for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Plant,
    Livestock,
    Fish,
}

impl Domain {
    /// Wire value sent as `imageDomain` when submitting a job.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Plant => "plant",
            Domain::Livestock => "livestock",
            Domain::Fish => "fish",
        }
    }

    /// Human label used in conversation text ("crop" reads better than
    /// "plant" in the analysis placeholder).
    pub fn label(&self) -> &'static str {
        match self {
            Domain::Plant => "crop",
            Domain::Livestock => "livestock",
            Domain::Fish => "fish",
        }
    }
}

/// Author of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Reference to a previously uploaded binary. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub url: String,
}

/// A single conversation entry.
///
/// Append-only once committed; an entry may be replaced in place only while
/// it represents a transient "analyzing…" placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within a session. Locally minted entries get a UUID; entries
    /// read back from the backend keep their server id.
    pub id: String,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
}

impl Message {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            created_at: Utc::now(),
            attachments: Vec::new(),
            classification: None,
            domain: None,
        }
    }

    /// Create a user message with a fresh local id.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant message with a fresh local id.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_classification(
        mut self,
        domain: Domain,
        classification: ClassificationResult,
    ) -> Self {
        self.domain = Some(domain);
        self.classification = Some(classification);
        self
    }
}
