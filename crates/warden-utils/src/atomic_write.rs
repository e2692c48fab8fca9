//! Atomic file writes: write to a temp file in the target directory, fsync,
//! then rename into place. A reader never observes a partially written file.

use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;

#[derive(Debug, Default, Clone)]
pub struct AtomicWriteResult {
    pub rename_retry_count: u32,
    pub used_cross_filesystem_fallback: bool,
}

/// Normalizes line endings to `\n`, writes atomically, and fsyncs both the
/// file and its parent directory before returning.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> std::io::Result<AtomicWriteResult> {
    let normalized = content.replace("\r\n", "\n");

    let parent = path
        .parent()
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    std::fs::create_dir_all(&parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    tmp.write_all(normalized.as_bytes())?;
    tmp.as_file().sync_all()?;

    let mut result = AtomicWriteResult::default();
    match tmp.persist(path.as_std_path()) {
        Ok(_) => {}
        Err(e) if is_cross_filesystem_error(&e.error) => {
            std::fs::copy(e.file.path(), path.as_std_path())?;
            drop(e.file);
            result.used_cross_filesystem_fallback = true;
        }
        Err(e) => return Err(e.error),
    }

    if let Ok(dir) = std::fs::File::open(&parent) {
        let _ = dir.sync_all();
    }

    Ok(result)
}

fn is_cross_filesystem_error(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(18) // EXDEV
}

/// Reads a file, tolerating CRLF line endings by normalizing to LF.
pub fn read_file_with_crlf_tolerance(path: &Utf8Path) -> std::io::Result<String> {
    let raw = std::fs::read_to_string(path.as_std_path())?;
    Ok(raw.replace("\r\n", "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("a.txt")).unwrap();
        write_file_atomic(&path, "hello").unwrap();
        assert_eq!(read_file_with_crlf_tolerance(&path).unwrap(), "hello");
    }

    #[test]
    fn normalizes_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("b.txt")).unwrap();
        write_file_atomic(&path, "line1\r\nline2\r\n").unwrap();
        let back = std::fs::read_to_string(path.as_std_path()).unwrap();
        assert_eq!(back, "line1\nline2\n");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/deep/c.txt")).unwrap();
        write_file_atomic(&path, "x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("d.txt")).unwrap();
        write_file_atomic(&path, "first").unwrap();
        write_file_atomic(&path, "second").unwrap();
        assert_eq!(read_file_with_crlf_tolerance(&path).unwrap(), "second");
    }

    #[test]
    fn empty_content_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("e.txt")).unwrap();
        write_file_atomic(&path, "").unwrap();
        assert_eq!(read_file_with_crlf_tolerance(&path).unwrap(), "");
    }
}
