pub mod bundle;
pub mod collect;
pub mod error;
pub mod fetch;
pub mod repo;
pub mod workspace;

pub use bundle::{bundle_files, BundleStats, FILE_HEADER_PREFIX};
pub use collect::{collect_files, is_allowed, ALLOWED_EXTENSIONS};
pub use error::{IngestError, Result};
pub use fetch::{GitFetcher, RepoFetcher};
pub use repo::{parse_repo_url, RepoRef};
pub use workspace::Workspace;

pub use repotalk_types::Cleanup;
