use crate::error::{IngestError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Produces a working copy of a remote repository
#[async_trait]
pub trait RepoFetcher: Send + Sync {
    /// Clone `url` into `target`. `target` must be absent or an empty directory.
    async fn fetch(&self, url: &str, target: &Path) -> Result<()>;
}

/// Shells out to `git clone` (default branch, full history). Dropping the
/// fetch future kills the clone.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: String,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitFetcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl RepoFetcher for GitFetcher {
    async fn fetch(&self, url: &str, target: &Path) -> Result<()> {
        ensure_clone_target(target).await?;

        tracing::info!(url = %url, target = %target.display(), "Cloning repository");
        let output = Command::new(&self.program)
            .arg("clone")
            .arg("--quiet")
            .arg("--")
            .arg(url)
            .arg(target)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(IngestError::io(target))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(url = %url, stderr = %stderr, "git clone failed");
            return Err(IngestError::Clone {
                url: url.to_string(),
                stderr,
            });
        }

        Ok(())
    }
}

/// Create the parent directory and reject a non-empty target
async fn ensure_clone_target(target: &Path) -> Result<()> {
    match tokio::fs::read_dir(target).await {
        Ok(mut entries) => {
            if entries
                .next_entry()
                .await
                .map_err(IngestError::io(target))?
                .is_some()
            {
                return Err(IngestError::TargetNotEmpty(target.to_path_buf()));
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(IngestError::Io { path: target.to_path_buf(), source: e }),
    }

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(IngestError::io(parent))?;
    }
    Ok(())
}
