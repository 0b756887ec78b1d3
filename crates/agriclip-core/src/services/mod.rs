pub mod api_client;
pub mod chat_poller;
pub mod classification_poller;
pub mod error;
pub mod upload_service;
pub mod wire;

pub use api_client::ApiClient;
pub use error::{CoreError, CoreResult};
pub use upload_service::{UploadContext, UploadFile, UploadRecord};
