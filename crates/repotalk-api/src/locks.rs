use dashmap::DashMap;
use repotalk_ingest::RepoRef;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-repository mutual exclusion for the crawl critical section
///
/// Crawls of the same `(owner, repo)` serialize on one mutex; different
/// repositories never contend. Entries are dropped once no task holds or
/// waits on them.
#[derive(Debug, Default)]
pub struct RepoLocks {
    locks: DashMap<RepoRef, Arc<Mutex<()>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, repo: &RepoRef) -> RepoGuard<'_> {
        let mutex = self.locks.entry(repo.clone()).or_default().value().clone();
        let guard = mutex.lock_owned().await;
        RepoGuard {
            locks: self,
            repo: repo.clone(),
            guard: Some(guard),
        }
    }

    /// Number of repositories with a live lock entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held for the duration of a crawl's critical section
pub struct RepoGuard<'a> {
    locks: &'a RepoLocks,
    repo: RepoRef,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RepoGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The map holds one reference; any other means a holder or waiter
        self.locks
            .locks
            .remove_if(&self.repo, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
