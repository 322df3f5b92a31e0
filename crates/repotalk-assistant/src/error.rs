use repotalk_types::RunId;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Assistant API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid API key format")]
    InvalidApiKey,

    #[error("Failed to delete assistant {0}")]
    DeleteRefused(String),

    #[error("Run {run} ended with status '{status}'")]
    RunFailed { run: RunId, status: String },

    #[error("Run {run} did not complete within {waited:?}")]
    PollTimeout { run: RunId, waited: Duration },

    #[error("Run {run} was cancelled while waiting for completion")]
    Cancelled { run: RunId },

    #[error("Cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AssistantError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssistantError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
