use crate::error::{IngestError, Result};
use crate::repo::RepoRef;
use repotalk_types::Cleanup;
use std::path::{Path, PathBuf};

/// On-disk layout for transient working copies and cached bundles
///
/// - working copy: `{repos_dir}/{owner}/{repo}`
/// - bundle: `{bundles_dir}/{owner}/{repo}/{owner}-{repo}-bundle.txt`
#[derive(Debug, Clone)]
pub struct Workspace {
    repos_dir: PathBuf,
    bundles_dir: PathBuf,
}

impl Workspace {
    pub fn new(repos_dir: impl Into<PathBuf>, bundles_dir: impl Into<PathBuf>) -> Self {
        Self {
            repos_dir: repos_dir.into(),
            bundles_dir: bundles_dir.into(),
        }
    }

    pub fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }

    pub fn bundles_dir(&self) -> &Path {
        &self.bundles_dir
    }

    pub fn working_copy(&self, repo: &RepoRef) -> PathBuf {
        self.repos_dir.join(&repo.owner).join(&repo.repo)
    }

    pub fn bundle_path(&self, repo: &RepoRef) -> PathBuf {
        self.bundles_dir
            .join(&repo.owner)
            .join(&repo.repo)
            .join(format!("{}-{}-bundle.txt", repo.owner, repo.repo))
    }

    /// Whether a bundle is cached for the repository. Presence is the only check.
    pub fn has_bundle(&self, repo: &RepoRef) -> Result<bool> {
        let path = self.bundle_path(repo);
        path.try_exists().map_err(IngestError::io(path))
    }

    /// Create the directory the bundle is written into
    pub fn prepare_bundle_dir(&self, repo: &RepoRef) -> Result<PathBuf> {
        let path = self.bundle_path(repo);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(IngestError::io(dir))?;
        }
        Ok(path)
    }

    /// Remove the repository's working copy, then its owner directory if that
    /// became empty. Other repositories of the same owner are left alone.
    pub fn remove_working_copy(&self, repo: &RepoRef) -> Cleanup {
        let path = self.working_copy(repo);
        let cleanup = remove_dir(&path);

        if let Some(owner_dir) = path.parent() {
            // Fails while other working copies of this owner exist
            let _ = std::fs::remove_dir(owner_dir);
        }
        cleanup
    }

    /// Remove a partially written bundle so the cache never serves it
    pub fn discard_bundle(&self, repo: &RepoRef) -> Cleanup {
        let path = self.bundle_path(repo);
        match std::fs::remove_file(&path) {
            Ok(()) => Cleanup::Done,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Cleanup::Skipped,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to discard bundle");
                Cleanup::failed(format!("{}: {}", path.display(), e))
            }
        }
    }
}

fn remove_dir(path: &Path) -> Cleanup {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Cleanup::Done,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Cleanup::Skipped,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete directory");
            Cleanup::failed(format!("{}: {}", path.display(), e))
        }
    }
}
