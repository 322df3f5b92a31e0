use crate::config::AssistantConfig;
use crate::error::Result;
use crate::types::{Assistant, FileObject, Run, Thread, ThreadMessage};
use async_trait::async_trait;
use repotalk_types::{AssistantId, FileId, RunId, ThreadId};
use std::path::Path;

/// One method per remote endpoint of the assistant service.
///
/// Implementations do no orchestration; sequencing (find-or-create, upload
/// dedup, run polling) lives in [`crate::AssistantService`].
#[async_trait]
pub trait AssistantApi: Send + Sync {
    // Assistants
    async fn list_assistants(&self) -> Result<Vec<Assistant>>;

    async fn create_assistant(&self, config: &AssistantConfig) -> Result<Assistant>;

    /// Returns whether the service reports the assistant as deleted
    async fn delete_assistant(&self, id: &AssistantId) -> Result<bool>;

    async fn update_instructions(&self, id: &AssistantId, instructions: &str) -> Result<()>;

    // Threads
    async fn create_thread(&self) -> Result<Thread>;

    /// Fails with [`crate::AssistantError::NotFound`] when the thread does not exist
    async fn retrieve_thread(&self, id: &ThreadId) -> Result<Thread>;

    // Files
    /// Files currently attached to the assistant
    async fn list_assistant_files(&self, assistant: &AssistantId) -> Result<Vec<FileId>>;

    /// All files owned by the account
    async fn list_files(&self) -> Result<Vec<FileObject>>;

    async fn upload_file(&self, path: &Path) -> Result<FileObject>;

    async fn attach_file(&self, assistant: &AssistantId, file: &FileId) -> Result<()>;

    async fn detach_file(&self, assistant: &AssistantId, file: &FileId) -> Result<()>;

    async fn delete_file(&self, file: &FileId) -> Result<()>;

    // Messages and runs
    async fn create_message(&self, thread: &ThreadId, text: &str) -> Result<()>;

    async fn create_run(&self, thread: &ThreadId, assistant: &AssistantId) -> Result<Run>;

    async fn retrieve_run(&self, thread: &ThreadId, run: &RunId) -> Result<Run>;

    /// Most recent messages first
    async fn list_messages(&self, thread: &ThreadId, limit: u32) -> Result<Vec<ThreadMessage>>;
}
