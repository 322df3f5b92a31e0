use axum::{body::Bytes, extract::State, Json};
use repotalk_ingest::{
    bundle_files, collect_files, parse_repo_url, Cleanup, IngestError, RepoRef, Workspace,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::decode_json;
use crate::{
    error::{ApiError, ApiResult},
    locks::RepoLocks,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CrawlRequest {
    #[serde(rename = "githubUrl")]
    pub github_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub message: String,
    pub url: String,
    pub username: String,
    pub reponame: String,
    pub response: String,
    #[serde(rename = "threadID")]
    pub thread_id: String,
    #[serde(rename = "fileID")]
    pub file_id: String,
}

/// Bundle a repository, hand the bundle to the assistant and ask for an analysis
///
/// The bundle on disk acts as a cache keyed by `(owner, repo)`: when present
/// the clone and bundling are skipped. Crawls of the same repository are
/// serialized up to and including the upload.
pub async fn crawl(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<CrawlResponse>> {
    let req: CrawlRequest = decode_json(&body)?;

    if req.github_url.trim().is_empty() {
        return Err(ApiError::bad_request("GitHub URL is required"));
    }
    let repo = parse_repo_url(&req.github_url)
        .map_err(|e| ApiError::bad_request(format!("Invalid GitHub URL: {}", e)))?;

    let (bundle, upload) = {
        let _guard = state.repo_locks.lock(&repo).await;

        let bundle = ensure_bundle(&state, &req.github_url, &repo).await?;
        let upload = state
            .assistants
            .upload_file_if_absent(&state.assistant_id, &bundle, false)
            .await
            .map_err(ApiError::assistant("Error uploading file"))?;
        (bundle, upload)
    };
    tracing::info!(repo = %repo, file = %upload.file_id, uploaded = upload.uploaded, "Bundle available to assistant");

    let thread = state
        .assistants
        .create_thread()
        .await
        .map_err(ApiError::assistant("Error creating thread"))?;

    let file_name = bundle
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let message = format!("Uploaded file '{}'. Please analyze its contents.", file_name);

    let cancel = state.shutdown.child_token();
    let response = state
        .assistants
        .run_message(&state.assistant_id, &thread, &message, &cancel)
        .await
        .map_err(ApiError::assistant("Error starting thread"))?;

    Ok(Json(CrawlResponse {
        message: "Crawl initiated successfully".to_string(),
        url: req.github_url,
        username: repo.owner,
        reponame: repo.repo,
        response,
        thread_id: thread.into_inner(),
        file_id: upload.file_id.into_inner(),
    }))
}

/// Return the cached bundle, or clone, collect and bundle the repository.
/// The working copy is removed whatever the outcome.
async fn ensure_bundle(state: &AppState, url: &str, repo: &RepoRef) -> ApiResult<PathBuf> {
    let workspace = &state.workspace;

    if workspace
        .has_bundle(repo)
        .map_err(ApiError::ingest("Error checking for bundled file"))?
    {
        tracing::info!(repo = %repo, "Bundled file already exists, skipping clone and bundling");
        return Ok(workspace.bundle_path(repo));
    }

    // Left behind by an interrupted crawl
    let stale = remove_working_copy(Arc::clone(workspace), repo.clone()).await;
    if !matches!(stale, Cleanup::Skipped) {
        tracing::info!(repo = %repo, cleanup = %stale, "Removed stale working copy");
    }

    let working_copy = WorkingCopy::new(state, repo);
    let fetched = state
        .fetcher
        .fetch(url, working_copy.path())
        .await
        .map_err(ApiError::ingest("Error cloning repository"));

    let result = match fetched {
        Ok(()) => {
            let workspace = Arc::clone(workspace);
            let repo = repo.clone();
            let path = working_copy.path().to_path_buf();
            tokio::task::spawn_blocking(move || build_bundle(&workspace, &repo, &path))
                .await
                .unwrap_or_else(|e| Err(ApiError::Internal(format!("Bundling task failed: {}", e))))
        }
        Err(e) => Err(e),
    };

    let cleanup = working_copy.remove().await;
    tracing::debug!(repo = %repo, cleanup = %cleanup, "Working copy cleanup");

    result
}

async fn remove_working_copy(workspace: Arc<Workspace>, repo: RepoRef) -> Cleanup {
    tokio::task::spawn_blocking(move || workspace.remove_working_copy(&repo))
        .await
        .unwrap_or_else(|e| Cleanup::failed(format!("cleanup task failed: {}", e)))
}

/// Working copy owned by one crawl.
///
/// [`WorkingCopy::remove`] deletes it on the blocking pool. If the crawl is
/// dropped first (client gone mid-clone or mid-bundle), removal is handed to a
/// task that holds the repository lock while deleting.
struct WorkingCopy {
    workspace: Arc<Workspace>,
    locks: Arc<RepoLocks>,
    repo: RepoRef,
    path: PathBuf,
    armed: bool,
}

impl WorkingCopy {
    fn new(state: &AppState, repo: &RepoRef) -> Self {
        Self {
            workspace: Arc::clone(&state.workspace),
            locks: Arc::clone(&state.repo_locks),
            repo: repo.clone(),
            path: state.workspace.working_copy(repo),
            armed: true,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn remove(mut self) -> Cleanup {
        self.armed = false;
        remove_working_copy(Arc::clone(&self.workspace), self.repo.clone()).await
    }
}

impl Drop for WorkingCopy {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let workspace = Arc::clone(&self.workspace);
        let locks = Arc::clone(&self.locks);
        let repo = self.repo.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _guard = locks.lock(&repo).await;
                    let cleanup = remove_working_copy(workspace, repo.clone()).await;
                    tracing::info!(repo = %repo, cleanup = %cleanup, "Removed working copy of abandoned crawl");
                });
            }
            Err(_) => {
                let _ = workspace.remove_working_copy(&repo);
            }
        }
    }
}

fn build_bundle(workspace: &Workspace, repo: &RepoRef, working_copy: &Path) -> ApiResult<PathBuf> {
    let files = collect_files(working_copy).map_err(ApiError::ingest("Error listing directory"))?;
    if files.is_empty() {
        return Err(ApiError::ingest("No valid files")(IngestError::NoSourceFiles(
            working_copy.to_path_buf(),
        )));
    }

    let bundle = workspace
        .prepare_bundle_dir(repo)
        .map_err(ApiError::ingest("Error checking directory"))?;

    match bundle_files(&files, &bundle, Some(working_copy)) {
        Ok(stats) => {
            tracing::info!(
                repo = %repo,
                files = stats.files,
                lines = stats.lines,
                bundle = %bundle.display(),
                "Repository bundled"
            );
            Ok(bundle)
        }
        Err(e) => {
            let cleanup = workspace.discard_bundle(repo);
            tracing::warn!(repo = %repo, cleanup = %cleanup, "Discarded partial bundle");
            Err(ApiError::ingest("Failed to bundle files")(e))
        }
    }
}
