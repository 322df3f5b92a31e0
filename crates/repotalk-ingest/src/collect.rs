use crate::error::{IngestError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Source and config extensions included in a bundle
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "go", "rs", "ts", "tsx", "js", "jsx", "py", "java", "rb", "cpp", "cs", "zig", "sh", "html",
    "yaml", "toml", "c", "kt", "kts", "php",
];

pub fn is_allowed(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Recursively list files under `root` whose extension is in
/// [`ALLOWED_EXTENSIONS`], in traversal order. Directories are never returned
/// and `.git` is not descended into.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == ".git"));

    for entry in walker {
        let entry = entry.map_err(|source| IngestError::Walk {
            root: root.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_file() && is_allowed(entry.path()) {
            files.push(entry.into_path());
        }
    }

    tracing::debug!(root = %root.display(), count = files.len(), "Collected source files");
    Ok(files)
}
