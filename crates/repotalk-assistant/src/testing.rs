//! In-memory [`AssistantApi`] for tests.
//!
//! Ids are sequential (`asst_1`, `thread_2`, `file-3`, ...), every call is
//! counted by operation name, and run statuses can be scripted.

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::traits::AssistantApi;
use crate::types::{Assistant, FileObject, MessageContent, Run, RunStatus, Thread, ThreadMessage};
use async_trait::async_trait;
use repotalk_types::{AssistantId, FileId, RunId, ThreadId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    next_id: u64,
    assistants: Vec<Assistant>,
    threads: HashSet<ThreadId>,
    files: Vec<FileObject>,
    attachments: HashMap<AssistantId, Vec<FileId>>,
    messages: HashMap<ThreadId, Vec<ThreadMessage>>,
    runs: HashMap<RunId, ThreadId>,
    statuses: VecDeque<RunStatus>,
    reply: Option<String>,
    calls: HashMap<&'static str, usize>,
    failing: HashSet<&'static str>,
    refuse_delete: bool,
}

impl State {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }
}

pub struct InMemoryAssistantApi {
    state: Mutex<State>,
}

impl Default for InMemoryAssistantApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAssistantApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                reply: Some("ok".to_string()),
                ..State::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and fail it when the operation was marked failing
    fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        *state.calls.entry(op).or_default() += 1;
        if state.failing.contains(op) {
            return Err(AssistantError::Api {
                status: 500,
                body: format!("injected failure: {}", op),
            });
        }
        Ok(state)
    }

    /// Assistant reply appended to the thread by each run; `None` appends nothing
    pub fn set_reply(&self, reply: Option<&str>) {
        self.lock().reply = reply.map(str::to_string);
    }

    /// Statuses returned by successive `retrieve_run` calls; `completed` once exhausted
    pub fn script_run_statuses<I, S>(&self, statuses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<RunStatus>,
    {
        self.lock().statuses = statuses.into_iter().map(Into::into).collect();
    }

    pub fn fail_on(&self, op: &'static str) {
        self.lock().failing.insert(op);
    }

    /// Make `delete_assistant` answer `deleted: false`
    pub fn refuse_delete(&self) {
        self.lock().refuse_delete = true;
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// Insert an assistant without counting a call
    pub fn seed_assistant(&self, name: &str, model: &str) -> AssistantId {
        let mut state = self.lock();
        let id = AssistantId::new(state.next("asst_"));
        state.assistants.push(Assistant {
            id: id.clone(),
            name: Some(name.to_string()),
            model: model.to_string(),
            instructions: None,
            tool_resources: None,
        });
        id
    }

    /// Insert a thread without counting a call
    pub fn seed_thread(&self) -> ThreadId {
        let mut state = self.lock();
        let id = ThreadId::new(state.next("thread_"));
        state.threads.insert(id.clone());
        id
    }

    /// Append a message without counting a call
    pub fn push_message(&self, thread: &ThreadId, role: &str, content: Vec<MessageContent>) {
        let mut state = self.lock();
        let id = state.next("msg_");
        state.messages.entry(thread.clone()).or_default().push(ThreadMessage {
            id,
            role: role.to_string(),
            content,
        });
    }

    pub fn assistants(&self) -> Vec<Assistant> {
        self.lock().assistants.clone()
    }

    pub fn instructions(&self, id: &AssistantId) -> Option<String> {
        self.lock()
            .assistants
            .iter()
            .find(|a| &a.id == id)
            .and_then(|a| a.instructions.clone())
    }

    pub fn files(&self) -> Vec<FileObject> {
        self.lock().files.clone()
    }

    pub fn attached(&self, assistant: &AssistantId) -> Vec<FileId> {
        self.lock()
            .attachments
            .get(assistant)
            .cloned()
            .unwrap_or_default()
    }

    /// Texts of user messages in a thread, oldest first
    pub fn user_messages(&self, thread: &ThreadId) -> Vec<String> {
        self.lock()
            .messages
            .get(thread)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.role == "user")
                    .filter_map(|m| match m.content.first() {
                        Some(MessageContent::Text { text }) => Some(text.value.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl AssistantApi for InMemoryAssistantApi {
    async fn list_assistants(&self) -> Result<Vec<Assistant>> {
        let state = self.enter("list_assistants")?;
        Ok(state.assistants.clone())
    }

    async fn create_assistant(&self, config: &AssistantConfig) -> Result<Assistant> {
        let mut state = self.enter("create_assistant")?;
        let assistant = Assistant {
            id: AssistantId::new(state.next("asst_")),
            name: Some(config.name.clone()),
            model: config.model.clone(),
            instructions: None,
            tool_resources: None,
        };
        state.assistants.push(assistant.clone());
        Ok(assistant)
    }

    async fn delete_assistant(&self, id: &AssistantId) -> Result<bool> {
        let mut state = self.enter("delete_assistant")?;
        if state.refuse_delete {
            return Ok(false);
        }
        let before = state.assistants.len();
        state.assistants.retain(|a| &a.id != id);
        if state.assistants.len() == before {
            return Err(AssistantError::NotFound(format!("assistant {}", id)));
        }
        state.attachments.remove(id);
        Ok(true)
    }

    async fn update_instructions(&self, id: &AssistantId, instructions: &str) -> Result<()> {
        let mut state = self.enter("update_instructions")?;
        let assistant = state
            .assistants
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| AssistantError::NotFound(format!("assistant {}", id)))?;
        assistant.instructions = Some(instructions.to_string());
        Ok(())
    }

    async fn create_thread(&self) -> Result<Thread> {
        let mut state = self.enter("create_thread")?;
        let id = ThreadId::new(state.next("thread_"));
        state.threads.insert(id.clone());
        Ok(Thread { id, created_at: 0 })
    }

    async fn retrieve_thread(&self, id: &ThreadId) -> Result<Thread> {
        let state = self.enter("retrieve_thread")?;
        if state.threads.contains(id) {
            Ok(Thread {
                id: id.clone(),
                created_at: 0,
            })
        } else {
            Err(AssistantError::NotFound(format!("thread {}", id)))
        }
    }

    async fn list_assistant_files(&self, assistant: &AssistantId) -> Result<Vec<FileId>> {
        let state = self.enter("list_assistant_files")?;
        Ok(state.attachments.get(assistant).cloned().unwrap_or_default())
    }

    async fn list_files(&self) -> Result<Vec<FileObject>> {
        let state = self.enter("list_files")?;
        Ok(state.files.clone())
    }

    async fn upload_file(&self, path: &Path) -> Result<FileObject> {
        let mut state = self.enter("upload_file")?;
        let metadata = std::fs::metadata(path).map_err(|source| AssistantError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = FileObject {
            id: FileId::new(state.next("file-")),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            bytes: metadata.len(),
            purpose: "assistants".to_string(),
        };
        state.files.push(file.clone());
        Ok(file)
    }

    async fn attach_file(&self, assistant: &AssistantId, file: &FileId) -> Result<()> {
        let mut state = self.enter("attach_file")?;
        state
            .attachments
            .entry(assistant.clone())
            .or_default()
            .push(file.clone());
        Ok(())
    }

    async fn detach_file(&self, assistant: &AssistantId, file: &FileId) -> Result<()> {
        let mut state = self.enter("detach_file")?;
        if let Some(files) = state.attachments.get_mut(assistant) {
            files.retain(|f| f != file);
        }
        Ok(())
    }

    async fn delete_file(&self, file: &FileId) -> Result<()> {
        let mut state = self.enter("delete_file")?;
        let before = state.files.len();
        state.files.retain(|f| &f.id != file);
        if state.files.len() == before {
            return Err(AssistantError::NotFound(format!("file {}", file)));
        }
        Ok(())
    }

    async fn create_message(&self, thread: &ThreadId, text: &str) -> Result<()> {
        let mut state = self.enter("create_message")?;
        if !state.threads.contains(thread) {
            return Err(AssistantError::NotFound(format!("thread {}", thread)));
        }
        let id = state.next("msg_");
        state.messages.entry(thread.clone()).or_default().push(ThreadMessage {
            id,
            role: "user".to_string(),
            content: vec![MessageContent::text(text)],
        });
        Ok(())
    }

    async fn create_run(&self, thread: &ThreadId, _assistant: &AssistantId) -> Result<Run> {
        let mut state = self.enter("create_run")?;
        if !state.threads.contains(thread) {
            return Err(AssistantError::NotFound(format!("thread {}", thread)));
        }
        let id = RunId::new(state.next("run_"));
        state.runs.insert(id.clone(), thread.clone());
        if let Some(reply) = state.reply.clone() {
            let message_id = state.next("msg_");
            state.messages.entry(thread.clone()).or_default().push(ThreadMessage {
                id: message_id,
                role: "assistant".to_string(),
                content: vec![MessageContent::text(reply)],
            });
        }
        Ok(Run {
            id,
            thread_id: thread.clone(),
            status: RunStatus::Queued,
        })
    }

    async fn retrieve_run(&self, thread: &ThreadId, run: &RunId) -> Result<Run> {
        let mut state = self.enter("retrieve_run")?;
        if state.runs.get(run) != Some(thread) {
            return Err(AssistantError::NotFound(format!("run {}", run)));
        }
        let status = state.statuses.pop_front().unwrap_or(RunStatus::Completed);
        Ok(Run {
            id: run.clone(),
            thread_id: thread.clone(),
            status,
        })
    }

    async fn list_messages(&self, thread: &ThreadId, limit: u32) -> Result<Vec<ThreadMessage>> {
        let state = self.enter("list_messages")?;
        Ok(state
            .messages
            .get(thread)
            .map(|messages| {
                messages
                    .iter()
                    .rev()
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
