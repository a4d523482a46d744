//! Append-only posting audit log
//!
//! Every delivery attempt gets exactly one entry, success or failure, in
//! send order. The file implementation appends JSON lines; retrieval reads
//! them back most-recent-first. Entries are never rewritten.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::rotation::{RotationError, RotationResult};

// ============================================================================
// Log Entry
// ============================================================================

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Success,
    Error,
}

/// One immutable audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLogEntry {
    /// When the attempt happened
    pub timestamp: DateTime<Utc>,

    /// Topic that was attempted; `None` for the no-topics-available case
    pub topic_id: Option<String>,

    /// Success or error
    pub status: PostStatus,

    /// Channel message id, present on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,

    /// Error description, present on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PostLogEntry {
    /// Entry for a confirmed delivery
    pub fn success(topic_id: impl Into<String>, message_id: i64) -> Self {
        Self {
            timestamp: Utc::now(),
            topic_id: Some(topic_id.into()),
            status: PostStatus::Success,
            message_id: Some(message_id),
            error: None,
        }
    }

    /// Entry for a failed delivery
    pub fn failure(topic_id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            topic_id,
            status: PostStatus::Error,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// Post Log
// ============================================================================

/// Durable append-only log of posting attempts
///
/// Injected into the orchestrator; tests use the in-memory implementation.
#[async_trait]
pub trait PostLog: Send + Sync {
    /// Append one entry
    async fn append(&self, entry: PostLogEntry) -> RotationResult<()>;

    /// Read up to `limit` entries, most recent first
    async fn recent(&self, limit: usize) -> RotationResult<Vec<PostLogEntry>>;
}

// ============================================================================
// File Log
// ============================================================================

/// JSONL-file-backed posting log
///
/// One JSON document per line; appends only, so a crash can at worst lose
/// the in-flight line, never corrupt earlier entries. Growth is unbounded;
/// rotation of the file is left to the operator.
pub struct FilePostLog {
    path: PathBuf,
}

impl FilePostLog {
    /// Create a log backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PostLog for FilePostLog {
    async fn append(&self, entry: PostLogEntry) -> RotationResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    RotationError::persistence_failed(parent.display().to_string(), e.to_string())
                })?;
            }
        }

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                RotationError::persistence_failed(self.path.display().to_string(), e.to_string())
            })?;

        file.write_all(line.as_bytes()).await.map_err(|e| {
            RotationError::persistence_failed(self.path.display().to_string(), e.to_string())
        })?;
        file.flush().await.map_err(|e| {
            RotationError::persistence_failed(self.path.display().to_string(), e.to_string())
        })?;

        Ok(())
    }

    async fn recent(&self, limit: usize) -> RotationResult<Vec<PostLogEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RotationError::persistence_failed(
                    self.path.display().to_string(),
                    e.to_string(),
                ))
            }
        };

        let mut entries = Vec::new();
        for line in content.lines().rev() {
            if entries.len() >= limit {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                // A torn trailing line from a crash is skipped, not fatal.
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed posting log line");
                }
            }
        }

        Ok(entries)
    }
}

// ============================================================================
// Memory Log
// ============================================================================

/// In-memory posting log for tests
#[derive(Default)]
pub struct MemoryPostLog {
    entries: RwLock<Vec<PostLogEntry>>,
}

impl MemoryPostLog {
    /// Create an empty in-memory log
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostLog for MemoryPostLog {
    async fn append(&self, entry: PostLogEntry) -> RotationResult<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> RotationResult<Vec<PostLogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_log_append_and_recent() {
        let dir = tempfile::tempdir().unwrap();
        let log = FilePostLog::new(dir.path().join("posts.jsonl"));

        log.append(PostLogEntry::success("closures", 100)).await.unwrap();
        log.append(PostLogEntry::failure(Some("hoisting".into()), "timeout"))
            .await
            .unwrap();
        log.append(PostLogEntry::success("currying", 101)).await.unwrap();

        let recent = log.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].topic_id.as_deref(), Some("currying"));
        assert_eq!(recent[1].topic_id.as_deref(), Some("hoisting"));
        assert_eq!(recent[1].status, PostStatus::Error);
    }

    #[tokio::test]
    async fn test_file_log_empty_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let log = FilePostLog::new(dir.path().join("never.jsonl"));

        assert!(log.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_log_skips_torn_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.jsonl");
        let log = FilePostLog::new(&path);

        log.append(PostLogEntry::success("closures", 5)).await.unwrap();

        // Simulate a crash mid-append.
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"timestamp\":\"2024-01-");
        std::fs::write(&path, content).unwrap();

        let recent = log.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].topic_id.as_deref(), Some("closures"));
    }

    #[tokio::test]
    async fn test_entry_immutable_once_appended() {
        let log = MemoryPostLog::new();
        let entry = PostLogEntry::success("closures", 7);

        log.append(entry.clone()).await.unwrap();
        let recent = log.recent(1).await.unwrap();

        assert_eq!(recent, vec![entry]);
    }

    #[tokio::test]
    async fn test_degenerate_no_topic_entry() {
        let log = MemoryPostLog::new();
        log.append(PostLogEntry::failure(None, "catalog is empty"))
            .await
            .unwrap();

        let recent = log.recent(1).await.unwrap();
        assert_eq!(recent[0].topic_id, None);
        assert_eq!(recent[0].status, PostStatus::Error);
    }

    #[test]
    fn test_entry_serialization_shape() {
        let entry = PostLogEntry::success("closures", 42);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["message_id"], 42);
        assert!(json.get("error").is_none());
    }
}
