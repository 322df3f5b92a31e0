pub mod config;
pub mod error;
pub mod openai;
pub mod poll;
pub mod service;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{AssistantConfig, ClientConfig};
pub use error::{AssistantError, Result};
pub use openai::OpenAIAssistantClient;
pub use poll::RunPoller;
pub use service::{AssistantService, UploadOutcome, IMAGES_UNSUPPORTED, NO_MESSAGE};
pub use traits::AssistantApi;
pub use types::{Assistant, FileObject, MessageContent, Run, RunStatus, Thread, ThreadMessage};

pub use repotalk_types::{AssistantId, Cleanup, FileId, RunId, ThreadId};
