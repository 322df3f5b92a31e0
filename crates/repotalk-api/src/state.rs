use crate::config::Config;
use crate::locks::RepoLocks;
use repotalk_assistant::{AssistantId, AssistantService};
use repotalk_ingest::{RepoFetcher, Workspace};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared application state passed to all handlers
///
/// Built once at startup. The assistant id is fixed for the life of the
/// process; `shutdown` is cancelled when the server stops so in-flight polls
/// return early.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub assistants: AssistantService,
    pub assistant_id: AssistantId,
    pub fetcher: Arc<dyn RepoFetcher>,
    pub workspace: Arc<Workspace>,
    pub repo_locks: Arc<RepoLocks>,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Config,
        assistants: AssistantService,
        assistant_id: AssistantId,
        fetcher: Arc<dyn RepoFetcher>,
        shutdown: CancellationToken,
    ) -> Self {
        let workspace = Workspace::from(&config.workspace);
        Self {
            config: Arc::new(config),
            assistants,
            assistant_id,
            fetcher,
            workspace: Arc::new(workspace),
            repo_locks: Arc::new(RepoLocks::new()),
            shutdown,
        }
    }
}
