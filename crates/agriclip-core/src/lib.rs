//! Orchestration core of the AgriClip assistant.
//!
//! This crate implements the asynchronous upload → classification → chat
//! pipeline shared by every AgriClip frontend: uploading an image, assigning
//! it to an analysis domain (plant, livestock or fish), submitting the
//! classification job and polling it to a terminal state, sending chat text
//! and polling for the asynchronously generated reply, and reconciling all
//! of it into a single ordered, deduplicated conversation log.
//!
//! The entry point is [`AssistantController`], which owns the shared state
//! and emits [`CoreEvent`]s for the host application (UI, domain prompt,
//! credential store). Rendering, persistence and authentication are the
//! host's concern; the core talks to the backend through a fixed HTTP/JSON
//! contract.

pub mod config;
pub mod controllers;
pub mod events;
pub mod models;
pub mod services;

pub use config::{CoreConfig, PollPolicy};
pub use controllers::AssistantController;
pub use events::CoreEvent;
pub use models::{
    Attachment, ClassificationResult, ConversationLog, Domain, Message,
    PendingClassificationRequest, Role, SessionHandle,
};
pub use services::{CoreError, CoreResult, UploadContext, UploadFile, UploadRecord};
