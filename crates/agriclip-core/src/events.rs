use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Notifications emitted by the core for the host application.
///
/// The host subscribes once at construction and dispatches from there: the
/// UI re-renders on `LogChanged`, the domain-selection prompt opens on
/// `AwaitingDomainChoice`, the credential store reacts to `LoggedOut`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Upload progress in percent. Values are monotonically increasing
    /// within one upload, ending at 100 only on success.
    UploadProgress(u8),
    /// An upload completed and its classification awaits a domain choice.
    AwaitingDomainChoice { upload_id: String },
    /// The conversation log changed (append, replace, remove or reset).
    LogChanged,
    /// Whether the assistant "typing" indicator should be shown.
    Typing(bool),
    /// A 401 tore down the session; the host must re-authenticate.
    LoggedOut,
}

/// Sending half of the core's event channel.
///
/// Cheap to clone into background tasks. A send to a dropped receiver is
/// ignored: pollers may outlive the subscriber during shutdown.
#[derive(Clone)]
pub struct EventSender {
    tx: UnboundedSender<CoreEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: CoreEvent) {
        let _ = self.tx.send(event);
    }
}
