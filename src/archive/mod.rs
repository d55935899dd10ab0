//! Per-check append-only log files and their compressed archive segments.
//!
//! Layout under the archive root:
//!
//! ```text
//! <root>/<checkId>.log                 active log, one JSON entry per line
//! <root>/<checkId>-<millis>.gz.b64     archive segment (gzip, then base64)
//! ```
//!
//! Rotation is `compress` followed by `truncate`. The two steps are not
//! atomic: a crash between them leaves the entries in the active log, and
//! they are archived again by the next rotation.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::domain::LogEntry;
use crate::domain::check_id::is_path_safe;
use crate::error::MonitorError;

/// Suffix of active log files.
pub const LOG_SUFFIX: &str = ".log";
/// Suffix of archive segments.
pub const ARCHIVE_SUFFIX: &str = ".gz.b64";

/// File-backed log archive rooted at a directory.
#[derive(Debug, Clone)]
pub struct LogArchive {
    root: PathBuf,
}

impl LogArchive {
    /// Creates an archive rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the archive.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the active log for `log_id`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidRequest`] if `log_id` is not a safe
    /// file name.
    pub fn log_path(&self, log_id: &str) -> Result<PathBuf, MonitorError> {
        self.file_path(log_id, LOG_SUFFIX)
    }

    /// Path of the archive segment `archive_id`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidRequest`] if `archive_id` is not a
    /// safe file name.
    pub fn archive_path(&self, archive_id: &str) -> Result<PathBuf, MonitorError> {
        self.file_path(archive_id, ARCHIVE_SUFFIX)
    }

    fn file_path(&self, id: &str, suffix: &str) -> Result<PathBuf, MonitorError> {
        if !is_path_safe(id) {
            return Err(MonitorError::InvalidRequest(format!(
                "`{id}` is not a valid log name"
            )));
        }
        Ok(self.root.join(format!("{id}{suffix}")))
    }

    /// Appends `entry` as one newline-terminated JSON line to the log of
    /// `log_id`, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns a [`MonitorError`] if the entry cannot be serialized or the
    /// file cannot be written.
    pub async fn append(&self, log_id: &str, entry: &LogEntry) -> Result<(), MonitorError> {
        let mut line = entry.to_line()?;
        line.push('\n');
        self.append_line(log_id, &line).await
    }

    /// Appends a preformatted line (must already end with `\n`).
    async fn append_line(&self, log_id: &str, line: &str) -> Result<(), MonitorError> {
        let path = self.log_path(log_id)?;
        fs::create_dir_all(&self.root).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Lists log ids, sorted. With `include_archived`, archive segment ids
    /// are listed too.
    ///
    /// A missing root directory lists as empty.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Io`] if the directory cannot be read.
    pub async fn list(&self, include_archived: bool) -> Result<Vec<String>, MonitorError> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let name = item.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(id) = name.strip_suffix(LOG_SUFFIX) {
                ids.push(id.to_string());
            } else if include_archived && let Some(id) = name.strip_suffix(ARCHIVE_SUFFIX) {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Writes the current content of log `log_id` as a new archive segment
    /// `archive_id`. The source log is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Io`] if the source cannot be read or the
    /// destination already exists, and [`MonitorError::Archive`] if the
    /// content cannot be compressed.
    pub async fn compress(&self, log_id: &str, archive_id: &str) -> Result<(), MonitorError> {
        let source = self.log_path(log_id)?;
        let destination = self.archive_path(archive_id)?;
        let content = fs::read(&source).await?;

        let encoded = tokio::task::spawn_blocking(move || encode_segment(&content))
            .await
            .map_err(|e| MonitorError::Internal(format!("compression task failed: {e}")))??;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
            .await?;
        file.write_all(encoded.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Returns the decompressed content of archive segment `archive_id`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Io`] if the segment cannot be read and
    /// [`MonitorError::Archive`] if it is not valid base64 gzip data.
    pub async fn decompress(&self, archive_id: &str) -> Result<String, MonitorError> {
        let path = self.archive_path(archive_id)?;
        let encoded = fs::read_to_string(&path).await?;
        tokio::task::spawn_blocking(move || decode_segment(&encoded))
            .await
            .map_err(|e| MonitorError::Internal(format!("decompression task failed: {e}")))?
    }

    /// Empties the active log of `log_id` without deleting it.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Io`] if the log does not exist or cannot be
    /// truncated.
    pub async fn truncate(&self, log_id: &str) -> Result<(), MonitorError> {
        let path = self.log_path(log_id)?;
        let file = OpenOptions::new().write(true).open(&path).await?;
        file.set_len(0).await?;
        Ok(())
    }
}

fn encode_segment(content: &[u8]) -> Result<String, MonitorError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(content)
        .map_err(|e| MonitorError::Archive(format!("gzip failed: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| MonitorError::Archive(format!("gzip failed: {e}")))?;
    Ok(STANDARD.encode(compressed))
}

fn decode_segment(encoded: &str) -> Result<String, MonitorError> {
    let compressed = STANDARD
        .decode(encoded.trim())
        .map_err(|e| MonitorError::Archive(format!("invalid base64: {e}")))?;
    let mut content = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut content)
        .map_err(|e| MonitorError::Archive(format!("gunzip failed: {e}")))?;
    Ok(content)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn archive() -> (tempfile::TempDir, LogArchive) {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let archive = LogArchive::new(dir.path().join("logs"));
        (dir, archive)
    }

    async fn read_active(archive: &LogArchive, id: &str) -> String {
        let Ok(path) = archive.log_path(id) else {
            panic!("bad id");
        };
        tokio::fs::read_to_string(path).await.unwrap_or_else(|e| {
            panic!("read failed: {e}");
        })
    }

    #[tokio::test]
    async fn append_creates_and_extends() {
        let (_dir, archive) = archive();
        tokio_test::assert_ok!(archive.append_line("abc", "one\n").await);
        tokio_test::assert_ok!(archive.append_line("abc", "two\n").await);
        assert_eq!(read_active(&archive, "abc").await, "one\ntwo\n");
    }

    #[tokio::test]
    async fn round_trip_preserves_order() {
        let (_dir, archive) = archive();
        let lines: Vec<String> = (0..25).map(|i| format!("{{\"n\":{i}}}\n")).collect();
        for line in &lines {
            tokio_test::assert_ok!(archive.append_line("check", line).await);
        }

        tokio_test::assert_ok!(archive.compress("check", "check-1").await);
        tokio_test::assert_ok!(archive.truncate("check").await);

        assert_eq!(read_active(&archive, "check").await, "");
        let Ok(restored) = archive.decompress("check-1").await else {
            panic!("decompress failed");
        };
        assert_eq!(restored, lines.concat());
    }

    #[tokio::test]
    async fn empty_log_compresses_to_empty_segment() {
        let (_dir, archive) = archive();
        tokio_test::assert_ok!(archive.append_line("empty", "").await);
        tokio_test::assert_ok!(archive.compress("empty", "empty-1").await);
        let Ok(restored) = archive.decompress("empty-1").await else {
            panic!("decompress failed");
        };
        assert!(restored.is_empty());
    }

    #[tokio::test]
    async fn compress_refuses_existing_destination() {
        let (_dir, archive) = archive();
        tokio_test::assert_ok!(archive.append_line("a", "x\n").await);
        tokio_test::assert_ok!(archive.compress("a", "a-1").await);
        let second = archive.compress("a", "a-1").await;
        assert!(matches!(second, Err(MonitorError::Io(_))));
    }

    #[tokio::test]
    async fn compress_missing_source_fails() {
        let (_dir, archive) = archive();
        tokio_test::assert_ok!(archive.append_line("other", "x\n").await);
        assert!(archive.compress("missing", "missing-1").await.is_err());
    }

    #[tokio::test]
    async fn list_filters_archived() {
        let (_dir, archive) = archive();
        tokio_test::assert_ok!(archive.append_line("b", "x\n").await);
        tokio_test::assert_ok!(archive.append_line("a", "x\n").await);
        tokio_test::assert_ok!(archive.compress("a", "a-100").await);

        let Ok(active) = archive.list(false).await else {
            panic!("list failed");
        };
        assert_eq!(active, vec!["a".to_string(), "b".to_string()]);

        let Ok(all) = archive.list(true).await else {
            panic!("list failed");
        };
        assert_eq!(all, vec!["a", "a-100", "b"]);
    }

    #[tokio::test]
    async fn list_missing_root_is_empty() {
        let (_dir, archive) = archive();
        let Ok(ids) = archive.list(true).await else {
            panic!("list failed");
        };
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn rejects_unsafe_names() {
        let (_dir, archive) = archive();
        assert!(archive.append_line("../escape", "x\n").await.is_err());
        assert!(archive.truncate("a/b").await.is_err());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_segment("not base64!!"),
            Err(MonitorError::Archive(_))
        ));
    }
}
