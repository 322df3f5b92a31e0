use axum::{body::Bytes, extract::State, Json};
use repotalk_assistant::ThreadId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::decode_json;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    /// Existing thread to continue; a new thread is created when absent
    pub tid: Option<String>,
    pub question: String,
    #[serde(rename = "githubUser")]
    pub github_user: String,
    #[serde(rename = "repoName")]
    pub repo_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub message: String,
    pub username: String,
    pub reponame: String,
    pub response: String,
    #[serde(rename = "threadID")]
    pub thread_id: String,
}

/// Ask a question on a thread
///
/// A supplied `tid` is used verbatim without an existence check.
pub async fn query(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<QueryResponse>> {
    let req: QueryRequest = decode_json(&body)?;

    if req.question.trim().is_empty() {
        return Err(ApiError::bad_request("Question is required"));
    }

    let thread = match req.tid.filter(|tid| !tid.is_empty()) {
        Some(tid) => ThreadId::new(tid),
        None => {
            let thread = state
                .assistants
                .create_thread()
                .await
                .map_err(ApiError::assistant("Error creating thread"))?;
            tracing::info!(thread = %thread, "Created thread for query");
            thread
        }
    };

    let cancel = state.shutdown.child_token();
    let response = state
        .assistants
        .run_message(&state.assistant_id, &thread, &req.question, &cancel)
        .await
        .map_err(ApiError::assistant("Error sending message to thread"))?;

    Ok(Json(QueryResponse {
        message: "Query initiated successfully".to_string(),
        username: req.github_user,
        reponame: req.repo_name,
        response,
        thread_id: thread.into_inner(),
    }))
}
