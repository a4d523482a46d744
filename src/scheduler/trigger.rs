//! Time-of-day trigger for scheduled posting runs
//!
//! The trigger wakes at each configured local time and fires one posting
//! run. Times are plain `HH:MM` strings validated up front; the loop
//! recomputes the next wake-up after every run, so clock drift and long runs
//! cannot skew the schedule.

use chrono::{Duration, Local, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::posting::Poster;

// ============================================================================
// Schedule Configuration
// ============================================================================

/// Configuration for the posting schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Local times of day to post at, in `HH:MM` format
    pub post_times: Vec<String>,

    /// Topics per scheduled run
    pub topics_per_run: usize,

    /// Fire one run immediately when the trigger starts
    pub run_on_startup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            post_times: vec!["09:00".to_string(), "18:00".to_string()],
            topics_per_run: 1,
            run_on_startup: false,
        }
    }
}

impl ScheduleConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.post_times.is_empty() {
            return Err(Error::config("post_times cannot be empty"));
        }
        for time in &self.post_times {
            if NaiveTime::parse_from_str(time, "%H:%M").is_err() {
                return Err(Error::config(format!(
                    "Invalid post time '{time}'. Expected HH:MM"
                )));
            }
        }
        if self.topics_per_run == 0 {
            return Err(Error::config("topics_per_run must be at least 1"));
        }
        Ok(())
    }

    /// Parse the configured times
    pub fn parsed_times(&self) -> Result<Vec<NaiveTime>> {
        self.post_times
            .iter()
            .map(|t| {
                NaiveTime::parse_from_str(t, "%H:%M")
                    .map_err(|_| Error::config(format!("Invalid post time: {t}")))
            })
            .collect()
    }
}

// ============================================================================
// Post Trigger
// ============================================================================

/// Fires posting runs at the configured times of day
pub struct PostTrigger {
    config: ScheduleConfig,
    poster: Arc<Poster>,
    is_running: Arc<RwLock<bool>>,
}

impl PostTrigger {
    /// Create a new trigger
    pub fn new(config: ScheduleConfig, poster: Arc<Poster>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            poster,
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Duration until the nearest configured post time
    pub fn duration_until_next(&self) -> Result<Duration> {
        let times = self.config.parsed_times()?;
        let now = Local::now();
        let today = now.date_naive();

        let mut nearest: Option<Duration> = None;
        for time in times {
            for day_offset in 0..2 {
                let date = today + Duration::days(day_offset);
                let naive = date.and_time(time);
                if let Some(target) = Local.from_local_datetime(&naive).earliest() {
                    if target > now {
                        let until = target.signed_duration_since(now);
                        if nearest.map_or(true, |n| until < n) {
                            nearest = Some(until);
                        }
                        break;
                    }
                }
            }
        }

        nearest.ok_or_else(|| Error::config("No upcoming post time could be computed"))
    }

    /// Start the trigger loop (runs until stopped)
    pub async fn start(&self) -> Result<()> {
        *self.is_running.write().await = true;
        tracing::info!(
            times = ?self.config.post_times,
            topics_per_run = self.config.topics_per_run,
            "Posting schedule started"
        );

        if self.config.run_on_startup {
            self.fire().await;
        }

        while *self.is_running.read().await {
            let until_next = self.duration_until_next()?;
            let sleep = until_next
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60));

            tracing::debug!(seconds = sleep.as_secs(), "Sleeping until next post time");

            tokio::select! {
                _ = tokio::time::sleep(sleep) => {
                    if *self.is_running.read().await {
                        self.fire().await;
                    }
                }
                _ = self.wait_for_stop() => {
                    break;
                }
            }
        }

        tracing::info!("Posting schedule stopped");
        Ok(())
    }

    /// Stop the trigger loop
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
    }

    /// Check if the trigger loop is active
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get trigger status
    pub async fn status(&self) -> TriggerStatus {
        TriggerStatus {
            is_running: *self.is_running.read().await,
            post_times: self.config.post_times.clone(),
            seconds_until_next: self.duration_until_next().ok().map(|d| d.num_seconds()),
        }
    }

    // Fire one scheduled run; failures surface through the posting log.
    async fn fire(&self) {
        let report = self.poster.run(self.config.topics_per_run).await;
        if report.success() {
            tracing::info!(posted = ?report.posted, "Scheduled run completed");
        } else {
            tracing::error!(
                posted = ?report.posted,
                errors = ?report.errors,
                "Scheduled run finished with errors"
            );
        }
    }

    async fn wait_for_stop(&self) {
        loop {
            if !*self.is_running.read().await {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

/// Trigger status information
#[derive(Debug, Clone, Serialize)]
pub struct TriggerStatus {
    pub is_running: bool,
    pub post_times: Vec<String>,
    pub seconds_until_next: Option<i64>,
}

// ============================================================================
// Tests
// ============================================================================
