use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::poll::RunPoller;
use crate::traits::AssistantApi;
use crate::types::{MessageContent, Thread, ThreadMessage};
use repotalk_types::{AssistantId, Cleanup, FileId, ThreadId};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Returned by [`AssistantService::latest_message`] when the thread has no usable message
pub const NO_MESSAGE: &str = "no message found";
/// Returned by [`AssistantService::latest_message`] when the latest message is an image
pub const IMAGES_UNSUPPORTED: &str = "images not supported";

/// Result of [`AssistantService::upload_file_if_absent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub file_id: FileId,
    /// `false` when an attached file with the same name was reused
    pub uploaded: bool,
    /// Detach/delete of the replaced remote file, when there was one
    pub stale_cleanup: Option<Cleanup>,
}

/// Orchestrates assistant, thread, file and run operations over an [`AssistantApi`]
#[derive(Clone)]
pub struct AssistantService {
    api: Arc<dyn AssistantApi>,
    poller: RunPoller,
}

impl AssistantService {
    pub fn new(api: Arc<dyn AssistantApi>, poller: RunPoller) -> Self {
        Self { api, poller }
    }

    pub fn api(&self) -> &Arc<dyn AssistantApi> {
        &self.api
    }

    pub fn poller(&self) -> RunPoller {
        self.poller
    }

    // ========================================================================
    // ASSISTANT LIFECYCLE
    // ========================================================================

    /// Find the assistant named in `config`, creating it when missing.
    ///
    /// With `force_recreate` an existing assistant is deleted and a fresh one
    /// created. Any failure is returned; callers at startup treat it as fatal.
    pub async fn load_or_create_assistant(
        &self,
        config: &AssistantConfig,
        force_recreate: bool,
    ) -> Result<AssistantId> {
        let existing = self
            .api
            .list_assistants()
            .await?
            .into_iter()
            .find(|a| a.name.as_deref() == Some(config.name.as_str()));

        if let Some(existing) = existing {
            if !force_recreate {
                tracing::info!(assistant = %existing.id, name = %config.name, "Assistant loaded");
                return Ok(existing.id);
            }

            if !self.api.delete_assistant(&existing.id).await? {
                return Err(AssistantError::DeleteRefused(existing.id.to_string()));
            }
            tracing::info!(assistant = %existing.id, "Assistant deleted");
        }

        let created = self.api.create_assistant(config).await?;
        tracing::info!(assistant = %created.id, name = %config.name, model = %config.model, "Assistant created");
        Ok(created.id)
    }

    /// Overwrite the assistant's system instructions
    pub async fn set_instructions(&self, id: &AssistantId, instructions: &str) -> Result<()> {
        self.api.update_instructions(id, instructions).await?;
        tracing::info!(assistant = %id, bytes = instructions.len(), "Instructions uploaded");
        Ok(())
    }

    // ========================================================================
    // THREADS
    // ========================================================================

    pub async fn create_thread(&self) -> Result<ThreadId> {
        let thread = self.api.create_thread().await?;
        tracing::debug!(thread = %thread.id, "Thread created");
        Ok(thread.id)
    }

    /// `Ok(None)` when the thread does not exist; transport and API failures stay errors
    pub async fn get_thread(&self, id: &ThreadId) -> Result<Option<Thread>> {
        match self.api.retrieve_thread(id).await {
            Ok(thread) => Ok(Some(thread)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // FILES
    // ========================================================================

    /// Name → id of the files attached to the assistant, built by intersecting
    /// the assistant's attachments with the account's file list
    pub async fn file_ids_by_name(&self, assistant: &AssistantId) -> Result<HashMap<String, FileId>> {
        let attached: HashSet<FileId> = self
            .api
            .list_assistant_files(assistant)
            .await?
            .into_iter()
            .collect();

        Ok(self
            .api
            .list_files()
            .await?
            .into_iter()
            .filter(|f| attached.contains(&f.id))
            .map(|f| (f.filename, f.id))
            .collect())
    }

    /// Upload `path` and attach it to the assistant unless a file with the same
    /// name is already attached.
    ///
    /// With `force` the attached file is detached and deleted first. Failures of
    /// that cleanup are reported in the outcome, never as an error.
    pub async fn upload_file_if_absent(
        &self,
        assistant: &AssistantId,
        path: &Path,
        force: bool,
    ) -> Result<UploadOutcome> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let existing = self.file_ids_by_name(assistant).await?.remove(&file_name);

        let stale_cleanup = match existing {
            Some(file_id) if !force => {
                tracing::info!(file = %file_id, name = %file_name, "Existing file found");
                return Ok(UploadOutcome {
                    file_id,
                    uploaded: false,
                    stale_cleanup: None,
                });
            }
            Some(stale) => Some(self.remove_stale_file(assistant, &stale, &file_name).await),
            None => None,
        };

        let uploaded = self.api.upload_file(path).await?;
        self.api.attach_file(assistant, &uploaded.id).await?;
        tracing::info!(file = %uploaded.id, name = %file_name, bytes = uploaded.bytes, "Uploaded and attached file");

        Ok(UploadOutcome {
            file_id: uploaded.id,
            uploaded: true,
            stale_cleanup,
        })
    }

    async fn remove_stale_file(&self, assistant: &AssistantId, file: &FileId, name: &str) -> Cleanup {
        let detached = match self.api.detach_file(assistant, file).await {
            Ok(()) => Cleanup::Done,
            Err(e) => {
                tracing::warn!(file = %file, name = %name, error = %e, "Can't detach assistant file");
                Cleanup::failed(format!("detach {}: {}", file, e))
            }
        };
        let deleted = match self.api.delete_file(file).await {
            Ok(()) => Cleanup::Done,
            Err(e) => {
                tracing::warn!(file = %file, name = %name, error = %e, "Can't delete file");
                Cleanup::failed(format!("delete {}: {}", file, e))
            }
        };
        detached.and(deleted)
    }

    // ========================================================================
    // MESSAGES AND RUNS
    // ========================================================================

    /// Append a user message, run the assistant on the thread and wait for the
    /// run to finish. Returns the latest message text.
    pub async fn run_message(
        &self,
        assistant: &AssistantId,
        thread: &ThreadId,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.api.create_message(thread, text).await?;
        let run = self.api.create_run(thread, assistant).await?;
        tracing::debug!(run = %run.id, thread = %thread, "Run started");

        self.poller
            .wait(&*self.api, thread, &run.id, cancel)
            .await?;

        self.latest_message(thread).await
    }

    /// Primary text of the most recent message in the thread
    pub async fn latest_message(&self, thread: &ThreadId) -> Result<String> {
        let messages = self.api.list_messages(thread, 1).await?;
        Ok(messages
            .first()
            .map(message_text)
            .unwrap_or_else(|| NO_MESSAGE.to_string()))
    }
}

fn message_text(message: &ThreadMessage) -> String {
    match message.content.first() {
        Some(MessageContent::Text { text }) => text.value.clone(),
        Some(MessageContent::ImageFile { .. }) | Some(MessageContent::ImageUrl { .. }) => {
            IMAGES_UNSUPPORTED.to_string()
        }
        _ => NO_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryAssistantApi;
    use std::time::Duration;

    fn service(api: &Arc<InMemoryAssistantApi>) -> AssistantService {
        AssistantService::new(
            api.clone(),
            RunPoller::new(Duration::from_millis(10), Duration::from_secs(5)),
        )
    }

    fn config() -> AssistantConfig {
        AssistantConfig::new("repo_talk_01", "gpt-4o-mini")
    }

    #[tokio::test]
    async fn test_creates_assistant_when_missing() {
        let api = Arc::new(InMemoryAssistantApi::new());
        let id = service(&api).load_or_create_assistant(&config(), false).await.unwrap();

        assert_eq!(api.call_count("create_assistant"), 1);
        assert_eq!(api.assistants()[0].id, id);
    }

    #[tokio::test]
    async fn test_loads_existing_assistant() {
        let api = Arc::new(InMemoryAssistantApi::new());
        api.seed_assistant("other", "gpt-4o-mini");
        let existing = api.seed_assistant("repo_talk_01", "gpt-4o-mini");

        let id = service(&api).load_or_create_assistant(&config(), false).await.unwrap();

        assert_eq!(id, existing);
        assert_eq!(api.call_count("create_assistant"), 0);
    }

    #[tokio::test]
    async fn test_force_recreate_replaces_assistant() {
        let api = Arc::new(InMemoryAssistantApi::new());
        let existing = api.seed_assistant("repo_talk_01", "gpt-4o-mini");

        let id = service(&api).load_or_create_assistant(&config(), true).await.unwrap();

        assert_ne!(id, existing);
        assert_eq!(api.call_count("delete_assistant"), 1);
        assert_eq!(api.assistants().len(), 1);
    }

    #[tokio::test]
    async fn test_refused_delete_is_an_error() {
        let api = Arc::new(InMemoryAssistantApi::new());
        api.seed_assistant("repo_talk_01", "gpt-4o-mini");
        api.refuse_delete();

        let err = service(&api).load_or_create_assistant(&config(), true).await.unwrap_err();

        assert!(matches!(err, AssistantError::DeleteRefused(_)));
        assert_eq!(api.call_count("create_assistant"), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let api = Arc::new(InMemoryAssistantApi::new());
        api.fail_on("list_assistants");

        let result = service(&api).load_or_create_assistant(&config(), false).await;
        assert!(matches!(result, Err(AssistantError::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_set_instructions() {
        let api = Arc::new(InMemoryAssistantApi::new());
        let id = api.seed_assistant("repo_talk_01", "gpt-4o-mini");

        service(&api).set_instructions(&id, "Answer about the repo").await.unwrap();
        assert_eq!(api.instructions(&id).as_deref(), Some("Answer about the repo"));
    }

    #[tokio::test]
    async fn test_get_thread_distinguishes_missing_from_failure() {
        let api = Arc::new(InMemoryAssistantApi::new());
        let svc = service(&api);
        let thread = api.seed_thread();

        assert!(svc.get_thread(&thread).await.unwrap().is_some());
        assert!(svc.get_thread(&ThreadId::new("thread_nope")).await.unwrap().is_none());

        api.fail_on("retrieve_thread");
        assert!(svc.get_thread(&thread).await.is_err());
    }

    #[tokio::test]
    async fn test_upload_reuses_attached_file() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("alice-bob-bundle.txt");
        std::fs::write(&bundle, "// ==== file path: main.go\n").unwrap();

        let api = Arc::new(InMemoryAssistantApi::new());
        let assistant = api.seed_assistant("repo_talk_01", "gpt-4o-mini");
        let svc = service(&api);

        let first = svc.upload_file_if_absent(&assistant, &bundle, false).await.unwrap();
        let second = svc.upload_file_if_absent(&assistant, &bundle, false).await.unwrap();

        assert!(first.uploaded);
        assert!(!second.uploaded);
        assert_eq!(first.file_id, second.file_id);
        assert_eq!(api.call_count("upload_file"), 1);
    }

    #[tokio::test]
    async fn test_forced_upload_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("alice-bob-bundle.txt");
        std::fs::write(&bundle, "content").unwrap();

        let api = Arc::new(InMemoryAssistantApi::new());
        let assistant = api.seed_assistant("repo_talk_01", "gpt-4o-mini");
        let svc = service(&api);

        let first = svc.upload_file_if_absent(&assistant, &bundle, false).await.unwrap();
        let second = svc.upload_file_if_absent(&assistant, &bundle, true).await.unwrap();

        assert!(second.uploaded);
        assert_ne!(first.file_id, second.file_id);
        assert_eq!(second.stale_cleanup, Some(Cleanup::Done));
        assert_eq!(api.call_count("delete_file"), 1);
        assert_eq!(api.attached(&assistant), vec![second.file_id.clone()]);
        assert!(api.files().iter().all(|f| f.id != first.file_id));
    }

    #[tokio::test]
    async fn test_stale_cleanup_failure_does_not_fail_upload() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("alice-bob-bundle.txt");
        std::fs::write(&bundle, "content").unwrap();

        let api = Arc::new(InMemoryAssistantApi::new());
        let assistant = api.seed_assistant("repo_talk_01", "gpt-4o-mini");
        let svc = service(&api);

        svc.upload_file_if_absent(&assistant, &bundle, false).await.unwrap();
        api.fail_on("delete_file");
        let outcome = svc.upload_file_if_absent(&assistant, &bundle, true).await.unwrap();

        assert!(outcome.uploaded);
        assert!(matches!(outcome.stale_cleanup, Some(Cleanup::Failed(_))));
    }

    #[tokio::test]
    async fn test_files_owned_but_not_attached_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("alice-bob-bundle.txt");
        std::fs::write(&bundle, "content").unwrap();

        let api = Arc::new(InMemoryAssistantApi::new());
        let assistant = api.seed_assistant("repo_talk_01", "gpt-4o-mini");
        // Uploaded directly, never attached
        api.upload_file(&bundle).await.unwrap();

        let outcome = service(&api)
            .upload_file_if_absent(&assistant, &bundle, false)
            .await
            .unwrap();
        assert!(outcome.uploaded);
    }

    #[tokio::test]
    async fn test_run_message_returns_reply() {
        let api = Arc::new(InMemoryAssistantApi::new());
        let assistant = api.seed_assistant("repo_talk_01", "gpt-4o-mini");
        let thread = api.seed_thread();
        api.set_reply(Some("It is a web server."));
        api.script_run_statuses(["queued", "in_progress", "completed"]);

        let reply = service(&api)
            .run_message(&assistant, &thread, "What is this repo?", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reply, "It is a web server.");
        assert_eq!(api.user_messages(&thread), vec!["What is this repo?".to_string()]);
    }

    #[tokio::test]
    async fn test_latest_message_placeholders() {
        let api = Arc::new(InMemoryAssistantApi::new());
        let svc = service(&api);
        let thread = api.seed_thread();

        assert_eq!(svc.latest_message(&thread).await.unwrap(), NO_MESSAGE);

        api.push_message(
            &thread,
            "assistant",
            vec![MessageContent::ImageFile {
                image_file: serde_json::json!({"file_id": "file-9"}),
            }],
        );
        assert_eq!(svc.latest_message(&thread).await.unwrap(), IMAGES_UNSUPPORTED);

        api.push_message(&thread, "assistant", vec![]);
        assert_eq!(svc.latest_message(&thread).await.unwrap(), NO_MESSAGE);
    }
}
