//! Read-only accessor for the learning-topic catalog
//!
//! The catalog is the pre-authored list of articles the site publishes.
//! It is loaded once from a JSON file and never mutated by the bot; the
//! rotation selector derives all of its bookkeeping from topic ids.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ============================================================================
// Topic
// ============================================================================

/// One publishable catalog item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Unique identifier (stable across catalog edits)
    pub id: String,

    /// Category tag this topic belongs to
    pub category_id: String,

    /// Article title
    pub title: String,

    /// Short summary used as the channel message body
    pub summary: String,

    /// Canonical article URL on the site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Topic {
    /// Create a topic with the required fields
    pub fn new(
        id: impl Into<String>,
        category_id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category_id: category_id.into(),
            title: title.into(),
            summary: summary.into(),
            url: None,
        }
    }

    /// Attach the canonical URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// In-memory catalog with id and category lookups
///
/// Construction validates that topic ids are unique; lookups after that are
/// infallible reads. The selector calls the accessors at least once per
/// selection, so they avoid re-walking the topic list where an index exists.
#[derive(Debug, Clone)]
pub struct Catalog {
    topics: Vec<Topic>,
}

impl Catalog {
    /// Build a catalog from a list of topics
    ///
    /// Fails if two topics share an id.
    pub fn from_topics(topics: Vec<Topic>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for topic in &topics {
            if !seen.insert(topic.id.as_str()) {
                anyhow::bail!("Duplicate topic id in catalog: {}", topic.id);
            }
        }
        Ok(Self { topics })
    }

    /// Load the catalog from a JSON file
    ///
    /// The file holds a plain array of topics.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;

        let topics: Vec<Topic> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?;

        Self::from_topics(topics)
    }

    /// All topics in catalog order
    pub fn all(&self) -> &[Topic] {
        &self.topics
    }

    /// Topics grouped by category, categories in sorted order
    pub fn by_category(&self) -> BTreeMap<&str, Vec<&Topic>> {
        let mut groups: BTreeMap<&str, Vec<&Topic>> = BTreeMap::new();
        for topic in &self.topics {
            groups.entry(topic.category_id.as_str()).or_default().push(topic);
        }
        groups
    }

    /// Look up a topic by id
    pub fn get(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// Distinct category ids in sorted order
    pub fn category_ids(&self) -> Vec<&str> {
        self.by_category().keys().copied().collect()
    }

    /// Number of topics
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether the catalog has no topics at all
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
