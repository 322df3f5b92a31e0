use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: &'static str },

    #[error("cannot walk '{root}': {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot bundle '{0}': it is not a file")]
    NotAFile(PathBuf),

    #[error("target directory '{0}' already exists and is not empty")]
    TargetNotEmpty(PathBuf),

    #[error("git clone of '{url}' failed: {stderr}")]
    Clone { url: String, stderr: String },

    #[error("no source files with an allowed extension under '{0}'")]
    NoSourceFiles(PathBuf),
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| IngestError::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
