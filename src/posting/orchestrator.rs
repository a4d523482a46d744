//! Posting orchestrator
//!
//! Ties selection, formatting, delivery, state persistence and audit logging
//! together for one run. Runs are best-effort batches: candidates are sent
//! one at a time with a politeness pause, a failed send never aborts the
//! rest, and each success is committed durably on its own before the next
//! send starts. A crash mid-run therefore loses at most the in-flight item.

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{Catalog, Topic};
use crate::rotation::{RotationError, RotationSelector, RotationState, StateStore};

use super::channel::ChannelClient;
use super::formatter;
use super::log::{PostLog, PostLogEntry};

// ============================================================================
// Run Report
// ============================================================================

/// Aggregated outcome of one run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Topic ids committed this run, in send order
    pub posted: Vec<String>,

    /// Per-item error descriptions, in attempt order
    pub errors: Vec<String>,
}

impl RunReport {
    /// A run counts as successful when no attempt failed
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            posted: Vec::new(),
            errors: vec![error.into()],
        }
    }
}

/// Snapshot of rotation progress for status surfaces
#[derive(Debug, Clone, serde::Serialize)]
pub struct RotationStatus {
    /// Topics in the catalog
    pub catalog_size: usize,

    /// Topics posted in the current cycle
    pub posted_this_cycle: usize,

    /// Date of the most recent successful post
    pub last_post_date: Option<chrono::NaiveDate>,

    /// Per-category progress, categories in sorted order
    pub categories: Vec<CategoryProgress>,
}

/// Cycle progress within one category
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryProgress {
    pub category_id: String,
    pub posted: usize,
    pub total: usize,
}

// ============================================================================
// Poster
// ============================================================================

/// Orchestrates one posting run end to end
pub struct Poster {
    catalog: Arc<Catalog>,
    store: Arc<dyn StateStore>,
    log: Arc<dyn PostLog>,
    channel: Arc<dyn ChannelClient>,
    pause_between_sends: Duration,
    selector_seed: Option<u64>,
}

impl Poster {
    /// Create a poster over the given collaborators
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn StateStore>,
        log: Arc<dyn PostLog>,
        channel: Arc<dyn ChannelClient>,
    ) -> Self {
        Self {
            catalog,
            store,
            log,
            channel,
            pause_between_sends: Duration::from_secs(2),
            selector_seed: None,
        }
    }

    /// Set the pause between consecutive sends in a batch
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause_between_sends = pause;
        self
    }

    /// Fix the selection seed (reproducible runs for tests)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.selector_seed = Some(seed);
        self
    }

    /// Run one rotation batch of `count` topics
    pub async fn run(&self, count: usize) -> RunReport {
        let mut state = self.store.load().await;
        let mut selector = self.selector();

        let topics = match selector.next_topics(&mut state, count) {
            Ok(topics) => topics,
            Err(e) => return self.abort_run(e).await,
        };

        self.deliver(&mut state, topics).await
    }

    /// Run one post with a uniformly random unposted topic
    pub async fn run_random(&self) -> RunReport {
        let mut state = self.store.load().await;
        let mut selector = self.selector();

        let topic = match selector.pick_random(&mut state) {
            Ok(topic) => topic,
            Err(e) => return self.abort_run(e).await,
        };

        self.deliver(&mut state, vec![topic]).await
    }

    /// Post a specific topic, bypassing rotation (manual override)
    pub async fn run_topic(&self, id: &str) -> RunReport {
        let mut state = self.store.load().await;
        let selector = self.selector();

        let topic = match selector.pick_by_id(&state, id) {
            Ok((topic, already_posted)) => {
                if already_posted {
                    tracing::warn!(
                        topic = id,
                        "Topic was already posted this cycle, posting again on request"
                    );
                }
                topic
            }
            Err(e) => return self.abort_run(e).await,
        };

        self.deliver(&mut state, vec![topic]).await
    }

    /// Preview the next batch without sending or persisting anything
    ///
    /// Runs selection against a throwaway copy of the state.
    pub async fn preview(&self, count: usize) -> Result<Vec<Topic>, RotationError> {
        let mut state = self.store.load().await;
        let mut selector = self.selector();
        selector.next_topics(&mut state, count)
    }

    /// Snapshot rotation progress without mutating anything
    pub async fn status(&self) -> RotationStatus {
        let state = self.store.load().await;

        let categories = self
            .catalog
            .by_category()
            .into_iter()
            .map(|(category_id, topics)| CategoryProgress {
                category_id: category_id.to_string(),
                posted: topics.iter().filter(|t| state.is_posted(&t.id)).count(),
                total: topics.len(),
            })
            .collect();

        RotationStatus {
            catalog_size: self.catalog.len(),
            posted_this_cycle: state.posted_count(),
            last_post_date: state.last_post_date,
            categories,
        }
    }

    fn selector(&self) -> RotationSelector {
        match self.selector_seed {
            Some(seed) => RotationSelector::with_seed(self.catalog.clone(), seed),
            None => RotationSelector::new(self.catalog.clone()),
        }
    }

    /// Record a run that failed before any send was attempted
    async fn abort_run(&self, error: RotationError) -> RunReport {
        tracing::error!(error = %error, "Posting run aborted during selection");

        let topic_id = match &error {
            RotationError::TopicNotFound { id } => Some(id.clone()),
            _ => None,
        };
        if let Err(log_err) = self
            .log
            .append(PostLogEntry::failure(topic_id, error.to_string()))
            .await
        {
            tracing::error!(error = %log_err, "Failed to append posting log entry");
        }

        RunReport::failed(error.to_string())
    }

    /// Send candidates sequentially, committing each success on its own
    async fn deliver(&self, state: &mut RotationState, topics: Vec<Topic>) -> RunReport {
        let mut report = RunReport::default();
        let total = topics.len();

        for (i, topic) in topics.into_iter().enumerate() {
            let text = formatter::render(&topic);

            match self.channel.send(&text).await {
                Ok(sent) => {
                    // Commit: the id joins the cycle only once the write is
                    // durable. A failed save leaves the topic eligible for
                    // the next run.
                    let mut candidate = state.clone();
                    candidate.mark_posted(topic.id.clone());
                    candidate.last_post_date = Some(chrono::Local::now().date_naive());

                    match self.store.save(&candidate).await {
                        Ok(()) => {
                            *state = candidate;
                            tracing::info!(
                                topic = %topic.id,
                                message_id = sent.message_id,
                                channel = self.channel.name(),
                                "Topic posted"
                            );
                            self.append_entry(PostLogEntry::success(
                                topic.id.clone(),
                                sent.message_id,
                            ))
                            .await;
                            report.posted.push(topic.id);
                        }
                        Err(e) => {
                            tracing::error!(
                                topic = %topic.id,
                                error = %e,
                                "Delivered but failed to persist rotation state"
                            );
                            self.append_entry(PostLogEntry::failure(
                                Some(topic.id.clone()),
                                format!("state save failed after delivery: {e}"),
                            ))
                            .await;
                            report.errors.push(e.to_string());
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        topic = %topic.id,
                        error = %e,
                        "Send failed, topic stays eligible for the next run"
                    );
                    self.append_entry(PostLogEntry::failure(
                        Some(topic.id.clone()),
                        e.to_string(),
                    ))
                    .await;
                    report.errors.push(e.to_string());
                }
            }

            if i + 1 < total && !self.pause_between_sends.is_zero() {
                tokio::time::sleep(self.pause_between_sends).await;
            }
        }

        report
    }

    async fn append_entry(&self, entry: PostLogEntry) {
        if let Err(e) = self.log.append(entry).await {
            tracing::error!(error = %e, "Failed to append posting log entry");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::channel::{ChannelError, ChannelResult, SentMessage};
    use crate::posting::log::{MemoryPostLog, PostStatus};
    use crate::rotation::MemoryStateStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Channel that succeeds with increasing message ids
    struct OkChannel {
        next_id: AtomicI64,
    }

    impl OkChannel {
        fn new() -> Self {
            Self {
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl ChannelClient for OkChannel {
        fn name(&self) -> &str {
            "fake"
        }

        async fn send(&self, _text: &str) -> ChannelResult<SentMessage> {
            Ok(SentMessage {
                message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
            })
        }
    }

    /// Channel that always rejects
    struct FailChannel;

    #[async_trait]
    impl ChannelClient for FailChannel {
        fn name(&self) -> &str {
            "fake"
        }

        async fn send(&self, _text: &str) -> ChannelResult<SentMessage> {
            Err(ChannelError::Rejected {
                status: 429,
                description: "flood".to_string(),
            })
        }
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::from_topics(vec![
                Topic::new("a1", "cat-a", "A1", "s"),
                Topic::new("a2", "cat-a", "A2", "s"),
                Topic::new("b1", "cat-b", "B1", "s"),
            ])
            .unwrap(),
        )
    }

    fn poster(channel: Arc<dyn ChannelClient>) -> (Poster, Arc<MemoryStateStore>, Arc<MemoryPostLog>) {
        let store = Arc::new(MemoryStateStore::new());
        let log = Arc::new(MemoryPostLog::new());
        let poster = Poster::new(catalog(), store.clone(), log.clone(), channel)
            .with_pause(Duration::ZERO)
            .with_seed(3);
        (poster, store, log)
    }

    #[tokio::test]
    async fn test_successful_run_commits_and_logs() {
        let (poster, store, log) = poster(Arc::new(OkChannel::new()));

        let report = poster.run(2).await;
        assert!(report.success());
        assert_eq!(report.posted.len(), 2);

        let state = store.load().await;
        assert_eq!(state.posted_count(), 2);
        assert!(state.last_post_date.is_some());

        let entries = log.recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.status == PostStatus::Success));
        assert!(entries.iter().all(|e| e.message_id.is_some()));
    }

    #[tokio::test]
    async fn test_failed_send_does_not_advance_state() {
        let (poster, store, log) = poster(Arc::new(FailChannel));

        let report = poster.run(1).await;
        assert!(!report.success());
        assert!(report.posted.is_empty());
        assert_eq!(report.errors.len(), 1);

        let state = store.load().await;
        assert_eq!(state.posted_count(), 0);

        let entries = log.recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, PostStatus::Error);
        assert!(entries[0].topic_id.is_some());
    }

    #[tokio::test]
    async fn test_empty_catalog_logs_degenerate_entry() {
        let store = Arc::new(MemoryStateStore::new());
        let log = Arc::new(MemoryPostLog::new());
        let empty = Arc::new(Catalog::from_topics(vec![]).unwrap());
        let poster = Poster::new(empty, store, log.clone(), Arc::new(OkChannel::new()))
            .with_pause(Duration::ZERO);

        let report = poster.run(1).await;
        assert!(!report.success());

        let entries = log.recent(1).await.unwrap();
        assert_eq!(entries[0].topic_id, None);
        assert_eq!(entries[0].status, PostStatus::Error);
    }

    #[tokio::test]
    async fn test_run_topic_override_reposts() {
        let (poster, store, _log) = poster(Arc::new(OkChannel::new()));

        let first = poster.run_topic("a1").await;
        assert!(first.success());

        // Already posted this cycle: warned, not blocked.
        let second = poster.run_topic("a1").await;
        assert!(second.success());
        assert_eq!(second.posted, vec!["a1"]);

        // Set semantics keep the id single in the cycle.
        assert_eq!(store.load().await.posted_count(), 1);
    }

    #[tokio::test]
    async fn test_run_topic_unknown_id() {
        let (poster, _store, log) = poster(Arc::new(OkChannel::new()));

        let report = poster.run_topic("missing").await;
        assert!(!report.success());

        let entries = log.recent(1).await.unwrap();
        assert_eq!(entries[0].topic_id.as_deref(), Some("missing"));
    }

    #[tokio::test]
    async fn test_run_random_posts_one() {
        let (poster, store, _log) = poster(Arc::new(OkChannel::new()));

        let report = poster.run_random().await;
        assert!(report.success());
        assert_eq!(report.posted.len(), 1);
        assert_eq!(store.load().await.posted_count(), 1);
    }

    #[tokio::test]
    async fn test_status_reports_per_category_progress() {
        let (poster, _store, _log) = poster(Arc::new(OkChannel::new()));

        poster.run_topic("a1").await;
        let status = poster.status().await;

        assert_eq!(status.catalog_size, 3);
        assert_eq!(status.posted_this_cycle, 1);
        assert!(status.last_post_date.is_some());

        let cat_a = status
            .categories
            .iter()
            .find(|c| c.category_id == "cat-a")
            .unwrap();
        assert_eq!(cat_a.posted, 1);
        assert_eq!(cat_a.total, 2);
    }

    #[tokio::test]
    async fn test_preview_does_not_touch_state() {
        let (poster, store, log) = poster(Arc::new(OkChannel::new()));

        let topics = poster.preview(2).await.unwrap();
        assert_eq!(topics.len(), 2);

        assert_eq!(store.load().await.posted_count(), 0);
        assert!(log.recent(10).await.unwrap().is_empty());
    }
}
