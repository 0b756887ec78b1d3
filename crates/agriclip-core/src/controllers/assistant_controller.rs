//! Public facade of the orchestration core.
//!
//! Owns the shared state (API client, conversation log, session, pending
//! slot, cancel flag) and exposes the operations a frontend drives:
//! uploading, domain selection, sending text, clearing and resuming the
//! conversation. Background pollers get explicit clones of the shared
//! handles; nothing is looked up ambiently.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::events::{CoreEvent, EventSender};
use crate::models::{
    Attachment, ConversationLog, Domain, Message, PendingClassificationRequest, PendingSlot,
    SessionHandle, SharedLog,
};
use crate::services::chat_poller::ChatPoller;
use crate::services::classification_poller::{
    ClassificationJob, ClassificationPoller, placeholder_message,
};
use crate::services::wire::{
    AdditionalInfo, ClassifyRequest, MessageContext, OutgoingAttachment, OutgoingContent,
    SendMessageRequest,
};
use crate::services::{
    ApiClient, CoreError, CoreResult, UploadContext, UploadFile, UploadRecord, upload_service,
};

const WELCOME_TEXT: &str = "Hello! I'm your AgriClip AI assistant. I can help you identify \
     crop diseases, provide treatment recommendations, and answer agricultural questions. \
     Upload an image or ask me anything!";

const CLEARED_TEXT: &str = "Chat cleared! How can I help you today?";

pub struct AssistantController {
    config: CoreConfig,
    api: Arc<ApiClient>,
    log: SharedLog,
    session: SessionHandle,
    pending: PendingSlot,
    /// Cancellation handle for the pollers of the current conversation.
    /// Swapped for a fresh flag on every reset so old loops stop while new
    /// ones keep running.
    cancel: Mutex<Arc<AtomicBool>>,
    events: EventSender,
}

impl AssistantController {
    /// Build a controller and the event stream the host subscribes to.
    pub fn new(config: CoreConfig) -> (Self, UnboundedReceiver<CoreEvent>) {
        let (events, rx) = EventSender::channel();
        let session = SessionHandle::new();
        let api = Arc::new(ApiClient::new(&config, session.clone(), events.clone()));
        let controller = Self {
            config,
            api,
            log: Arc::new(Mutex::new(ConversationLog::new())),
            session,
            pending: PendingSlot::new(),
            cancel: Mutex::new(Arc::new(AtomicBool::new(false))),
            events,
        };
        (controller, rx)
    }

    /// Inject the bearer token from the host's credential store.
    pub fn set_auth_token(&self, token: impl Into<String>) {
        self.session.set_token(token);
    }

    pub fn session_id(&self) -> Option<String> {
        self.session.session_id()
    }

    /// Whether an upload is waiting for the user to choose a domain.
    pub fn is_awaiting_domain(&self) -> bool {
        self.pending.is_occupied()
    }

    /// Snapshot of the conversation in stored order.
    pub fn log_snapshot(&self) -> Vec<Message> {
        self.log.lock().messages().to_vec()
    }

    /// Upload an image and stage it for classification.
    ///
    /// On success the provisional user message is in the log, the pending
    /// slot is occupied and `AwaitingDomainChoice` has been emitted. When
    /// the store-message call fails the provisional message is deliberately
    /// left in place so the user can retry.
    pub async fn upload(
        &self,
        file: UploadFile,
        context: UploadContext,
    ) -> CoreResult<UploadRecord> {
        upload_service::validate(&file, &self.config, &self.session)?;
        if self.pending.is_occupied() {
            return Err(CoreError::ClassificationPending);
        }

        let ticker = upload_service::ProgressTicker::start(self.events.clone());
        let uploaded = match self.api.upload_image(&file, context.upload_type()).await {
            Ok(data) => {
                ticker.finish(&self.events);
                data
            }
            Err(err) => {
                ticker.cancel();
                return Err(err);
            }
        };
        info!(upload_id = %uploaded.upload_id, "image uploaded");

        let url = format!("/uploads/{}", uploaded.filename);
        let provisional = Message::user(context.provisional_text()).with_attachment(Attachment {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            url: url.clone(),
        });
        let message_text = provisional.text.clone();
        self.log.lock().append_unique(provisional);
        self.events.emit(CoreEvent::LogChanged);

        let request = SendMessageRequest {
            content: OutgoingContent {
                text: message_text.clone(),
                attachments: vec![OutgoingAttachment {
                    upload_id: uploaded.upload_id.clone(),
                    filename: uploaded.filename.clone(),
                    original_name: file.name,
                    mime_type: file.mime_type,
                }],
            },
            session_id: self.session.session_id(),
            message_type: "user",
            context: MessageContext {
                conversation_topic: context.conversation_topic(),
            },
        };
        let ack = self.api.send_message(&request).await?;
        let session_id = self.session.adopt_session_id(&ack.session_id);

        let pending = PendingClassificationRequest {
            upload_id: uploaded.upload_id.clone(),
            session_id: Some(session_id),
            message_text,
        };
        if !self.pending.try_occupy(pending) {
            return Err(CoreError::ClassificationPending);
        }
        self.events.emit(CoreEvent::AwaitingDomainChoice {
            upload_id: uploaded.upload_id.clone(),
        });

        Ok(UploadRecord {
            upload_id: uploaded.upload_id,
            url,
        })
    }

    /// Submit the pending upload for classification under the chosen domain
    /// and start the background status poller.
    pub async fn classify(&self, domain: Domain) -> CoreResult<()> {
        let Some(pending) = self.pending.take() else {
            return Err(CoreError::InvalidInput(
                "no upload is awaiting classification".to_string(),
            ));
        };

        let request = ClassifyRequest {
            upload_id: pending.upload_id.clone(),
            image_domain: domain,
            session_id: pending.session_id.clone(),
            additional_info: AdditionalInfo {
                message_content: pending.message_text.clone(),
            },
        };
        if let Err(err) = self.api.submit_classification(&request).await {
            // Surfaced into the conversation so history doubles as an
            // error log. The image itself was stored fine.
            let note = Message::assistant(format!(
                "Analysis unavailable: I received your image but couldn't start the \
                 AI analysis. Error: {err}"
            ));
            self.log.lock().append_unique(note);
            self.events.emit(CoreEvent::LogChanged);
            return Err(err);
        }

        let placeholder = placeholder_message(domain);
        let placeholder_id = placeholder.id.clone();
        self.log.lock().append_unique(placeholder);
        self.events.emit(CoreEvent::LogChanged);

        let poller = ClassificationPoller {
            api: self.api.clone(),
            log: self.log.clone(),
            events: self.events.clone(),
            policy: self.config.classify_poll.clone(),
            cancel: self.current_cancel(),
        };
        poller.spawn(ClassificationJob {
            upload_id: pending.upload_id,
            domain,
            placeholder_id,
        });
        Ok(())
    }

    /// Abandon the pending upload without submitting a job.
    pub fn cancel_domain_selection(&self) {
        if let Some(pending) = self.pending.take() {
            debug!(upload_id = %pending.upload_id, "domain selection cancelled");
        }
    }

    /// Send chat text and start polling for the assistant's reply.
    pub async fn send_text(&self, text: impl Into<String>) -> CoreResult<()> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(CoreError::InvalidInput("message text is empty".to_string()));
        }

        let message = Message::user(text.clone());
        self.log.lock().append_unique(message);
        self.events.emit(CoreEvent::LogChanged);
        self.events.emit(CoreEvent::Typing(true));

        let request = SendMessageRequest {
            content: OutgoingContent {
                text,
                attachments: Vec::new(),
            },
            session_id: self.session.session_id(),
            message_type: "user",
            context: MessageContext {
                conversation_topic: "general",
            },
        };
        let ack = match self.api.send_message(&request).await {
            Ok(ack) => ack,
            Err(err) => {
                self.events.emit(CoreEvent::Typing(false));
                return Err(err);
            }
        };
        let session_id = self.session.adopt_session_id(&ack.session_id);

        let poller = ChatPoller {
            api: self.api.clone(),
            log: self.log.clone(),
            events: self.events.clone(),
            policy: self.config.chat_poll.clone(),
            cancel: self.current_cancel(),
        };
        poller.spawn(session_id);
        Ok(())
    }

    /// Delete the backend session and reset the conversation. Stops every
    /// in-flight poller before the local state is rebuilt.
    pub async fn clear_chat(&self) -> CoreResult<()> {
        if let Some(session_id) = self.session.session_id() {
            self.api.delete_session(&session_id).await?;
        }

        self.cancel_pollers();
        self.pending.clear();
        self.session.clear_session_id();
        self.log.lock().reset(Message::assistant(CLEARED_TEXT));
        self.events.emit(CoreEvent::Typing(false));
        self.events.emit(CoreEvent::LogChanged);
        Ok(())
    }

    /// Resume the most recent backend session, loading its history into the
    /// log. Falls back to the welcome greeting when there is nothing to
    /// resume or the backend is unreachable; a 401 still propagates after
    /// the usual teardown.
    pub async fn resume_latest_session(&self) -> CoreResult<()> {
        match self.try_resume().await {
            Ok(()) => Ok(()),
            Err(CoreError::AuthExpired) => Err(CoreError::AuthExpired),
            Err(err) => {
                warn!(error = %err, "failed to resume session, starting fresh");
                self.seed_welcome();
                Ok(())
            }
        }
    }

    async fn try_resume(&self) -> CoreResult<()> {
        let sessions = self.api.list_sessions().await?;
        let Some(latest) = sessions.sessions.into_iter().next() else {
            self.seed_welcome();
            return Ok(());
        };

        let history = self.api.history(&latest.id).await?;
        self.session.set_session_id(&latest.id);
        info!(session_id = %latest.id, messages = history.messages.len(), "resumed session");

        let mut log = self.log.lock();
        for wire in history.messages {
            log.append_unique(wire.into_message());
        }
        if log.is_empty() {
            log.append_unique(Message::assistant(WELCOME_TEXT));
        }
        drop(log);
        self.events.emit(CoreEvent::LogChanged);
        Ok(())
    }

    fn seed_welcome(&self) {
        let mut log = self.log.lock();
        if log.is_empty() {
            log.append_unique(Message::assistant(WELCOME_TEXT));
            drop(log);
            self.events.emit(CoreEvent::LogChanged);
        }
    }

    /// Stop all pollers tied to the current conversation and install a
    /// fresh flag for the next one.
    fn cancel_pollers(&self) {
        let mut guard = self.cancel.lock();
        guard.store(true, Ordering::Relaxed);
        *guard = Arc::new(AtomicBool::new(false));
    }

    fn current_cancel(&self) -> Arc<AtomicBool> {
        self.cancel.lock().clone()
    }

    /// Stop every background poller permanently (host shutdown).
    pub fn shutdown(&self) {
        self.cancel.lock().store(true, Ordering::Relaxed);
    }
}
