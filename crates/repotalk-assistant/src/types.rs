// Wire types for the assistants REST API
// https://platform.openai.com/docs/api-reference/assistants

use repotalk_types::{AssistantId, FileId, RunId, ThreadId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Paginated list envelope (`{"object": "list", "data": [...]}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: AssistantId,
    #[serde(default)]
    pub name: Option<String>,
    pub model: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
}

impl Assistant {
    /// Vector stores backing the assistant's `file_search` tool
    pub fn vector_store_ids(&self) -> &[String] {
        self.tool_resources
            .as_ref()
            .and_then(|r| r.file_search.as_ref())
            .map(|fs| fs.vector_store_ids.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_search: Option<FileSearchResources>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSearchResources {
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    #[serde(default)]
    pub created_at: i64,
}

/// File owned by the account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileObject {
    pub id: FileId,
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub purpose: String,
}

/// Membership record of a file inside a vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreFile {
    pub id: FileId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStore {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionStatus {
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub thread_id: ThreadId,
    pub status: RunStatus,
}

/// Run lifecycle status.
///
/// Only `queued` and `in_progress` are considered live; everything other than
/// `completed` is terminal for the poller. Unknown strings are preserved so the
/// error can name them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Other(s) => s,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::InProgress)
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "completed" => RunStatus::Completed,
            _ => RunStatus::Other(s),
        }
    }
}

impl From<&str> for RunStatus {
    fn from(s: &str) -> Self {
        RunStatus::from(s.to_string())
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

/// Content part of a thread message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: TextContent,
    },
    ImageFile {
        image_file: serde_json::Value,
    },
    ImageUrl {
        image_url: serde_json::Value,
    },
    #[serde(other)]
    Unsupported,
}

impl MessageContent {
    pub fn text(value: impl Into<String>) -> Self {
        MessageContent::Text {
            text: TextContent {
                value: value.into(),
                annotations: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_status_parsing() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1",
            "thread_id": "thread_1",
            "status": "in_progress"
        }))
        .unwrap();
        assert_eq!(run.status, RunStatus::InProgress);
        assert!(run.status.is_pending());

        let odd: RunStatus = serde_json::from_value(json!("requires_action")).unwrap();
        assert_eq!(odd, RunStatus::Other("requires_action".to_string()));
        assert_eq!(odd.to_string(), "requires_action");
    }

    #[test]
    fn test_message_content_variants() {
        let message: ThreadMessage = serde_json::from_value(json!({
            "id": "msg_1",
            "role": "assistant",
            "content": [
                {"type": "text", "text": {"value": "hello", "annotations": []}},
                {"type": "image_file", "image_file": {"file_id": "file-1"}},
                {"type": "refusal", "refusal": "no"}
            ]
        }))
        .unwrap();

        assert_eq!(message.content[0], MessageContent::text("hello"));
        assert!(matches!(message.content[1], MessageContent::ImageFile { .. }));
        assert_eq!(message.content[2], MessageContent::Unsupported);
    }

    #[test]
    fn test_assistant_vector_stores() {
        let assistant: Assistant = serde_json::from_value(json!({
            "id": "asst_1",
            "name": "repo_talk_01",
            "model": "gpt-4o-mini",
            "instructions": null,
            "tool_resources": {"file_search": {"vector_store_ids": ["vs_1"]}}
        }))
        .unwrap();
        assert_eq!(assistant.vector_store_ids(), &["vs_1".to_string()]);

        let bare: Assistant = serde_json::from_value(json!({
            "id": "asst_2",
            "model": "gpt-4o-mini"
        }))
        .unwrap();
        assert!(bare.vector_store_ids().is_empty());
    }
}
