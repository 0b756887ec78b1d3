pub mod classification;
pub mod conversation_log;
pub mod message;
pub mod pending_upload;
pub mod session;

pub use classification::ClassificationResult;
pub use conversation_log::{ConversationLog, SharedLog};
pub use message::{Attachment, Domain, Message, Role};
pub use pending_upload::{PendingClassificationRequest, PendingSlot};
pub use session::SessionHandle;
