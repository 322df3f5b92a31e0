use crate::error::{IngestError, Result};
use std::fmt;

/// `(owner, repo)` pair naming a remote repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Extract `(owner, repo)` from the last two `/`-delimited segments of a URL.
///
/// A trailing slash and a `.git` suffix are ignored. Segments end up as
/// directory names on disk, so anything other than `[A-Za-z0-9._-]` (and the
/// `.`/`..` segments) is rejected.
pub fn parse_repo_url(url: &str) -> Result<RepoRef> {
    let invalid = |reason| IngestError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let trimmed = url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let mut segments = trimmed.rsplit('/');
    let repo = segments.next().unwrap_or_default();
    let owner = segments
        .next()
        .ok_or_else(|| invalid("expected .../<owner>/<repo>"))?;

    for segment in [owner, repo] {
        if segment.is_empty() {
            return Err(invalid("empty owner or repository name"));
        }
        if segment == "." || segment == ".." {
            return Err(invalid("relative path segment"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid("unexpected character in owner or repository name"));
        }
    }

    Ok(RepoRef::new(owner, repo))
}
