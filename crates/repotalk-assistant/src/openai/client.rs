// OpenAI Assistants v2 client implementation

use crate::config::{AssistantConfig, ClientConfig};
use crate::error::{AssistantError, Result};
use crate::traits::AssistantApi;
use crate::types::{
    Assistant, DeletionStatus, FileObject, List, Run, Thread, ThreadMessage, VectorStore,
    VectorStoreFile,
};
use async_trait::async_trait;
use dashmap::DashMap;
use repotalk_types::{AssistantId, FileId, RunId, ThreadId};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;

const PAGE_LIMIT: u32 = 100;

/// Assistants API client (HTTP direct, no SDK)
///
/// "Files attached to an assistant" are the files of the vector store behind
/// its `file_search` tool. The store is resolved on first use per assistant and
/// created (and linked) when the assistant has none. Resolution runs at most
/// once at a time per assistant, so concurrent first uses share one store.
pub struct OpenAIAssistantClient {
    http_client: reqwest::Client,
    base_url: String,
    vector_stores: DashMap<AssistantId, Arc<OnceCell<String>>>,
}

impl OpenAIAssistantClient {
    /// Create new client from connection settings
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|_| AssistantError::InvalidApiKey)?,
        );
        headers.insert(
            HeaderName::from_static("openai-beta"),
            HeaderValue::from_static("assistants=v2"),
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url().to_string(),
            vector_stores: DashMap::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode the JSON body; `resource` names the target for
    /// not-found errors.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, resource: &str) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(AssistantError::NotFound(resource.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn retrieve_assistant(&self, id: &AssistantId) -> Result<Assistant> {
        self.send(
            self.http_client.get(self.url(&format!("/assistants/{}", id))),
            &format!("assistant {}", id),
        )
        .await
    }

    /// GET every page of a list endpoint, following `after` while `has_more`.
    /// `cursor` yields the id passed as `after` for the next page.
    async fn list_all<T, F>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        resource: &str,
        cursor: F,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> String,
    {
        let mut items = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(self.url(path))
                .query(query)
                .query(&[("limit", PAGE_LIMIT)]);
            if let Some(after) = &after {
                request = request.query(&[("after", after)]);
            }

            let page: List<T> = self.send(request, resource).await?;
            let next = page.data.last().map(&cursor);
            items.extend(page.data);

            match next {
                Some(next) if page.has_more => after = Some(next),
                _ => break,
            }
        }

        Ok(items)
    }

    /// Vector store backing the assistant's file_search tool, created on demand
    async fn vector_store_for(&self, assistant: &AssistantId) -> Result<String> {
        let cell = self
            .vector_stores
            .entry(assistant.clone())
            .or_default()
            .value()
            .clone();

        let store = cell
            .get_or_try_init(|| self.resolve_vector_store(assistant))
            .await?;
        Ok(store.clone())
    }

    async fn resolve_vector_store(&self, assistant: &AssistantId) -> Result<String> {
        let current = self.retrieve_assistant(assistant).await?;
        if let Some(id) = current.vector_store_ids().first() {
            return Ok(id.clone());
        }

        let name = format!("{}-files", current.name.as_deref().unwrap_or(assistant.as_str()));
        let store: VectorStore = self
            .send(
                self.http_client
                    .post(self.url("/vector_stores"))
                    .json(&json!({ "name": name })),
                "vector store",
            )
            .await?;

        let _: Assistant = self
            .send(
                self.http_client
                    .post(self.url(&format!("/assistants/{}", assistant)))
                    .json(&json!({
                        "tool_resources": {
                            "file_search": { "vector_store_ids": [store.id] }
                        }
                    })),
                &format!("assistant {}", assistant),
            )
            .await?;

        tracing::info!(assistant = %assistant, vector_store = %store.id, "Linked new vector store");
        Ok(store.id)
    }
}

// ============================================================================
// TRAIT IMPLEMENTATION
// ============================================================================

#[async_trait]
impl AssistantApi for OpenAIAssistantClient {
    async fn list_assistants(&self) -> Result<Vec<Assistant>> {
        self.list_all("/assistants", &[("order", "desc")], "assistants", |a: &Assistant| {
            a.id.to_string()
        })
        .await
    }

    async fn create_assistant(&self, config: &AssistantConfig) -> Result<Assistant> {
        self.send(
            self.http_client.post(self.url("/assistants")).json(&json!({
                "model": config.model,
                "name": config.name,
                "tools": [{ "type": "file_search" }],
            })),
            "assistants",
        )
        .await
    }

    async fn delete_assistant(&self, id: &AssistantId) -> Result<bool> {
        let status: DeletionStatus = self
            .send(
                self.http_client.delete(self.url(&format!("/assistants/{}", id))),
                &format!("assistant {}", id),
            )
            .await?;
        self.vector_stores.remove(id);
        Ok(status.deleted)
    }

    async fn update_instructions(&self, id: &AssistantId, instructions: &str) -> Result<()> {
        let _: Assistant = self
            .send(
                self.http_client
                    .post(self.url(&format!("/assistants/{}", id)))
                    .json(&json!({ "instructions": instructions })),
                &format!("assistant {}", id),
            )
            .await?;
        Ok(())
    }

    async fn create_thread(&self) -> Result<Thread> {
        self.send(
            self.http_client.post(self.url("/threads")).json(&json!({})),
            "threads",
        )
        .await
    }

    async fn retrieve_thread(&self, id: &ThreadId) -> Result<Thread> {
        self.send(
            self.http_client.get(self.url(&format!("/threads/{}", id))),
            &format!("thread {}", id),
        )
        .await
    }

    async fn list_assistant_files(&self, assistant: &AssistantId) -> Result<Vec<FileId>> {
        let store = self.vector_store_for(assistant).await?;
        let files: Vec<VectorStoreFile> = self
            .list_all(
                &format!("/vector_stores/{}/files", store),
                &[],
                &format!("vector store {}", store),
                |f: &VectorStoreFile| f.id.to_string(),
            )
            .await?;
        Ok(files.into_iter().map(|f| f.id).collect())
    }

    async fn list_files(&self) -> Result<Vec<FileObject>> {
        self.list_all("/files", &[("purpose", "assistants")], "files", |f: &FileObject| {
            f.id.to_string()
        })
        .await
    }

    async fn upload_file(&self, path: &Path) -> Result<FileObject> {
        let contents = tokio::fs::read(path)
            .await
            .map_err(|source| AssistantError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle.txt".to_string());

        let part = reqwest::multipart::Part::bytes(contents)
            .file_name(file_name)
            .mime_str("text/plain")?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        self.send(
            self.http_client.post(self.url("/files")).multipart(form),
            "files",
        )
        .await
    }

    async fn attach_file(&self, assistant: &AssistantId, file: &FileId) -> Result<()> {
        let store = self.vector_store_for(assistant).await?;
        let _: VectorStoreFile = self
            .send(
                self.http_client
                    .post(self.url(&format!("/vector_stores/{}/files", store)))
                    .json(&json!({ "file_id": file })),
                &format!("vector store {}", store),
            )
            .await?;
        Ok(())
    }

    async fn detach_file(&self, assistant: &AssistantId, file: &FileId) -> Result<()> {
        let store = self.vector_store_for(assistant).await?;
        let _: DeletionStatus = self
            .send(
                self.http_client
                    .delete(self.url(&format!("/vector_stores/{}/files/{}", store, file))),
                &format!("file {} in vector store {}", file, store),
            )
            .await?;
        Ok(())
    }

    async fn delete_file(&self, file: &FileId) -> Result<()> {
        let _: DeletionStatus = self
            .send(
                self.http_client.delete(self.url(&format!("/files/{}", file))),
                &format!("file {}", file),
            )
            .await?;
        Ok(())
    }

    async fn create_message(&self, thread: &ThreadId, text: &str) -> Result<()> {
        let _: ThreadMessage = self
            .send(
                self.http_client
                    .post(self.url(&format!("/threads/{}/messages", thread)))
                    .json(&json!({ "role": "user", "content": text })),
                &format!("thread {}", thread),
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread: &ThreadId, assistant: &AssistantId) -> Result<Run> {
        self.send(
            self.http_client
                .post(self.url(&format!("/threads/{}/runs", thread)))
                .json(&json!({ "assistant_id": assistant })),
            &format!("thread {}", thread),
        )
        .await
    }

    async fn retrieve_run(&self, thread: &ThreadId, run: &RunId) -> Result<Run> {
        self.send(
            self.http_client
                .get(self.url(&format!("/threads/{}/runs/{}", thread, run))),
            &format!("run {}", run),
        )
        .await
    }

    async fn list_messages(&self, thread: &ThreadId, limit: u32) -> Result<Vec<ThreadMessage>> {
        let list: List<ThreadMessage> = self
            .send(
                self.http_client
                    .get(self.url(&format!("/threads/{}/messages", thread)))
                    .query(&[("limit", limit.to_string()), ("order", "desc".to_string())]),
                &format!("thread {}", thread),
            )
            .await?;
        Ok(list.data)
    }
}
