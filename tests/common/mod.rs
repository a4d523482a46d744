//! Common test utilities
#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use baeum::catalog::{Catalog, Topic};
use baeum::posting::{ChannelClient, ChannelError, SentMessage};
use tokio::sync::Mutex;

/// Build a topic with a url derived from its id
pub fn topic(id: &str, category: &str) -> Topic {
    Topic::new(id, category, format!("Title {id}"), format!("Summary for {id}"))
        .with_url(format!("https://example.com/topics/{id}"))
}

/// The catalog used across suites: 5 topics, 3 in `functions`, 2 in `types`
pub fn five_topic_catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::from_topics(vec![
            topic("closures", "functions"),
            topic("currying", "functions"),
            topic("recursion", "functions"),
            topic("generics", "types"),
            topic("type-narrowing", "types"),
        ])
        .unwrap(),
    )
}

/// Channel that records sent texts and answers with sequential message ids
///
/// A script of per-send verdicts can make individual sends fail.
pub struct ScriptedChannel {
    next_id: AtomicI64,
    pub sent: Mutex<Vec<String>>,
    script: Mutex<Vec<bool>>,
}

impl ScriptedChannel {
    /// Channel where every send succeeds
    pub fn ok() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            sent: Mutex::new(Vec::new()),
            script: Mutex::new(Vec::new()),
        }
    }

    /// Channel that consumes `verdicts` in order, then keeps succeeding
    pub fn with_script(verdicts: Vec<bool>) -> Self {
        Self {
            next_id: AtomicI64::new(1),
            sent: Mutex::new(Vec::new()),
            script: Mutex::new(verdicts),
        }
    }
}

#[async_trait]
impl ChannelClient for ScriptedChannel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, text: &str) -> Result<SentMessage, ChannelError> {
        let verdict = {
            let mut script = self.script.lock().await;
            if script.is_empty() {
                true
            } else {
                script.remove(0)
            }
        };

        if !verdict {
            return Err(ChannelError::Rejected {
                status: 429,
                description: "scripted failure".to_string(),
            });
        }

        self.sent.lock().await.push(text.to_string());
        Ok(SentMessage {
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }
}
