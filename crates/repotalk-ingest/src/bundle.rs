use crate::error::{IngestError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Start of the marker line written before each file's content
pub const FILE_HEADER_PREFIX: &str = "// ==== file path: ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleStats {
    pub files: usize,
    pub lines: usize,
}

/// Concatenate `files` into `dst`.
///
/// Each file becomes a blank line, a `// ==== file path: <path>` header, its
/// lines verbatim, then two blank lines. Lines are copied as bytes, so files
/// need not be UTF-8; a trailing `\r` is dropped with the line ending. Header
/// paths use forward slashes and are shown relative to `display_root` when
/// given. `dst` is truncated first.
/// The first unreadable input aborts the bundle; the partially written
/// destination is left for the caller to discard.
pub fn bundle_files(files: &[PathBuf], dst: &Path, display_root: Option<&Path>) -> Result<BundleStats> {
    let out = File::create(dst).map_err(IngestError::io(dst))?;
    let mut writer = BufWriter::new(out);
    let mut stats = BundleStats::default();

    for file in files {
        let metadata = std::fs::metadata(file).map_err(IngestError::io(file))?;
        if !metadata.is_file() {
            return Err(IngestError::NotAFile(file.clone()));
        }
        let mut reader = BufReader::new(File::open(file).map_err(IngestError::io(file))?);

        let shown = display_root
            .and_then(|root| file.strip_prefix(root).ok())
            .unwrap_or(file.as_path());
        write!(writer, "\n{}{}\n", FILE_HEADER_PREFIX, shown.to_string_lossy().replace('\\', "/"))
            .map_err(IngestError::io(dst))?;

        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line).map_err(IngestError::io(file))?;
            if read == 0 {
                break;
            }
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            writer.write_all(&line).map_err(IngestError::io(dst))?;
            writer.write_all(b"\n").map_err(IngestError::io(dst))?;
            stats.lines += 1;
        }

        writer.write_all(b"\n\n").map_err(IngestError::io(dst))?;
        stats.files += 1;
    }

    writer.flush().map_err(IngestError::io(dst))?;
    Ok(stats)
}
