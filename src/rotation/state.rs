//! Durable rotation state
//!
//! `RotationState` records which topics have been posted in the current
//! cycle. It is the one piece of state the bot owns across restarts, so the
//! file-backed store writes atomically (temp file + rename) and treats an
//! unreadable file as "start a fresh cycle" rather than an error.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::error::{RotationError, RotationResult};

// ============================================================================
// Rotation State
// ============================================================================

/// Progress through the current posting cycle
///
/// `posted_ids` keeps insertion order (the order topics were committed) with
/// set semantics: `mark_posted` refuses duplicates within a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    /// Ids posted so far in this cycle, in commit order
    #[serde(default)]
    pub posted_ids: Vec<String>,

    /// Date of the most recent successful post
    #[serde(default)]
    pub last_post_date: Option<NaiveDate>,
}

impl RotationState {
    /// Fresh state at the start of a cycle
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a topic id has already been posted this cycle
    pub fn is_posted(&self, id: &str) -> bool {
        self.posted_ids.iter().any(|p| p == id)
    }

    /// Record a topic as posted
    ///
    /// Returns `false` (and leaves the state untouched) if the id is already
    /// present, preserving set semantics within a cycle.
    pub fn mark_posted(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.is_posted(&id) {
            return false;
        }
        self.posted_ids.push(id);
        true
    }

    /// Remove a topic id (used to roll back an uncommitted mark)
    pub fn unmark(&mut self, id: &str) {
        self.posted_ids.retain(|p| p != id);
    }

    /// Number of topics posted this cycle
    pub fn posted_count(&self) -> usize {
        self.posted_ids.len()
    }

    /// Start a fresh cycle
    pub fn reset(&mut self) {
        self.posted_ids.clear();
    }
}

// ============================================================================
// State Store
// ============================================================================

/// Durable load/save of rotation progress
///
/// Injected into the orchestrator so tests can run against the in-memory
/// implementation instead of the filesystem.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted state
    ///
    /// Missing or unreadable data yields the default empty state; the current
    /// cycle restarts but the process never fails on a corrupt state file.
    async fn load(&self) -> RotationState;

    /// Persist the state durably
    async fn save(&self, state: &RotationState) -> RotationResult<()>;
}

// ============================================================================
// File Store
// ============================================================================

/// JSON-file-backed state store
///
/// Writes go to a sibling temp file first and are renamed into place, so an
/// interrupted write never leaves a half-written file that parses as valid
/// state.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> RotationState {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No rotation state file, starting fresh cycle");
                return RotationState::new();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read rotation state, starting fresh cycle"
                );
                return RotationState::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Rotation state file is malformed, starting fresh cycle"
                );
                RotationState::new()
            }
        }
    }

    async fn save(&self, state: &RotationState) -> RotationResult<()> {
        let json = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    RotationError::persistence_failed(parent.display().to_string(), e.to_string())
                })?;
            }
        }

        // Write to temp file first, then rename (atomic)
        let temp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&temp_path, json.as_bytes())
            .await
            .map_err(|e| {
                RotationError::persistence_failed(temp_path.display().to_string(), e.to_string())
            })?;

        tokio::fs::rename(&temp_path, &self.path).await.map_err(|e| {
            RotationError::persistence_failed(self.path.display().to_string(), e.to_string())
        })?;

        tracing::debug!(
            path = %self.path.display(),
            posted = state.posted_count(),
            "Rotation state saved"
        );
        Ok(())
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-memory state store for tests and dry runs
#[derive(Default)]
pub struct MemoryStateStore {
    state: RwLock<Option<RotationState>>,
}

impl MemoryStateStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a state
    pub fn with_state(state: RotationState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> RotationState {
        self.state.read().await.clone().unwrap_or_default()
    }

    async fn save(&self, state: &RotationState) -> RotationResult<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_posted_keeps_set_semantics() {
        let mut state = RotationState::new();

        assert!(state.mark_posted("a"));
        assert!(state.mark_posted("b"));
        assert!(!state.mark_posted("a"));

        assert_eq!(state.posted_ids, vec!["a", "b"]);
        assert_eq!(state.posted_count(), 2);
    }

    #[test]
    fn test_unmark_and_reset() {
        let mut state = RotationState::new();
        state.mark_posted("a");
        state.mark_posted("b");

        state.unmark("a");
        assert!(!state.is_posted("a"));
        assert!(state.is_posted("b"));

        state.reset();
        assert_eq!(state.posted_count(), 0);
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));

        let mut state = RotationState::new();
        state.mark_posted("closures");
        state.last_post_date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1);

        store.save(&state).await.unwrap();
        let loaded = store.load().await;

        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_file_store_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("never_written.json"));

        let loaded = store.load().await;
        assert_eq!(loaded, RotationState::new());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"{ not json at all").await.unwrap();

        let store = FileStateStore::new(&path);
        let loaded = store.load().await;
        assert_eq!(loaded, RotationState::new());
    }

    #[tokio::test]
    async fn test_file_store_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));

        store.save(&RotationState::new()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["state.json"]);
    }

    #[tokio::test]
    async fn test_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("nested/deeper/state.json"));

        store.save(&RotationState::new()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStateStore::new();
        assert_eq!(store.load().await, RotationState::new());

        let mut state = RotationState::new();
        state.mark_posted("x");
        store.save(&state).await.unwrap();

        assert_eq!(store.load().await, state);
    }
}
