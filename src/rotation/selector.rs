//! Rotation selection algorithm
//!
//! Chooses which topics to post next. Three guarantees drive the design:
//!
//! - No topic repeats until the whole catalog has been posted once (a cycle).
//! - A batch spreads across categories round-robin instead of clustering.
//! - Exhaustion resets the cycle *before* selecting, so a call never comes
//!   up short just because the previous cycle ended mid-batch.
//!
//! Randomness comes from a ChaCha8 RNG that can be seeded for reproducible
//! selection order in tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::sync::Arc;

use crate::catalog::{Catalog, Topic};

use super::error::{RotationError, RotationResult};
use super::state::RotationState;

// ============================================================================
// Rotation Selector
// ============================================================================

/// Selects the next topics to post, enforcing the cycle invariants
///
/// The selector holds no durable state of its own; everything it needs is
/// derived from the catalog and the `RotationState` passed into each call.
/// Cycle resets mutate the passed-in state, which becomes durable when the
/// orchestrator commits the first post after the reset.
pub struct RotationSelector {
    catalog: Arc<Catalog>,
    rng: ChaCha8Rng,
}

impl RotationSelector {
    /// Create a selector with OS-seeded randomness
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Create a selector with a fixed seed for reproducible selection order
    pub fn with_seed(catalog: Arc<Catalog>, seed: u64) -> Self {
        Self {
            catalog,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Pick the next batch of topics, spread across categories
    ///
    /// Returns exactly `min(count, catalog_len)` topics. Within one call no
    /// topic is emitted twice, even when exhaustion triggers a cycle reset
    /// between slots. When `count` does not exceed the number of categories
    /// that still hold unposted topics, every returned topic comes from a
    /// distinct category.
    pub fn next_topics(
        &mut self,
        state: &mut RotationState,
        count: usize,
    ) -> RotationResult<Vec<Topic>> {
        if self.catalog.is_empty() {
            return Err(RotationError::CatalogEmpty);
        }

        let count = count.min(self.catalog.len());
        let categories: Vec<String> = self
            .catalog
            .category_ids()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut picked = Vec::with_capacity(count);
        // Ids handed out by this call; never re-emitted, even across a reset.
        let mut provisional: HashSet<String> = HashSet::new();
        // Categories already served in this batch, for round-robin spread.
        let mut used_categories: HashSet<String> = HashSet::new();
        let mut cursor = self.rng.gen_range(0..categories.len());

        for _ in 0..count {
            if self.unposted_count(state, &provisional) == 0 {
                // Cycle exhausted: reset first, then select from the full pool.
                tracing::info!(
                    cycle_len = state.posted_count(),
                    "Catalog cycle complete, resetting rotation state"
                );
                state.reset();
                used_categories.clear();
            }

            let has_unposted = |cat: &str| {
                self.catalog.all().iter().any(|t| {
                    t.category_id == cat
                        && !state.is_posted(&t.id)
                        && !provisional.contains(&t.id)
                })
            };

            // All spread-eligible categories consumed but slots remain:
            // wrap the round-robin and allow categories to repeat.
            if !categories
                .iter()
                .any(|c| !used_categories.contains(c) && has_unposted(c))
            {
                used_categories.clear();
            }

            let category = loop {
                let candidate = &categories[cursor % categories.len()];
                cursor += 1;
                if !used_categories.contains(candidate) && has_unposted(candidate) {
                    break candidate.clone();
                }
            };
            used_categories.insert(category.clone());

            let pool: Vec<&Topic> = self
                .catalog
                .all()
                .iter()
                .filter(|t| {
                    t.category_id == category
                        && !state.is_posted(&t.id)
                        && !provisional.contains(&t.id)
                })
                .collect();

            let topic = pool[self.rng.gen_range(0..pool.len())];
            provisional.insert(topic.id.clone());
            picked.push(topic.clone());
        }

        Ok(picked)
    }

    /// Pick one topic uniformly at random among unposted topics
    ///
    /// Resets the cycle first if every topic has been posted, so this only
    /// errors when the catalog itself is empty.
    pub fn pick_random(&mut self, state: &mut RotationState) -> RotationResult<Topic> {
        if self.catalog.is_empty() {
            return Err(RotationError::CatalogEmpty);
        }

        if self.unposted_count(state, &HashSet::new()) == 0 {
            tracing::info!(
                cycle_len = state.posted_count(),
                "Catalog cycle complete, resetting rotation state"
            );
            state.reset();
        }

        let pool: Vec<&Topic> = self
            .catalog
            .all()
            .iter()
            .filter(|t| !state.is_posted(&t.id))
            .collect();

        Ok(pool[self.rng.gen_range(0..pool.len())].clone())
    }

    /// Look up a specific topic for a manual post
    ///
    /// The returned flag is `true` when the topic was already posted this
    /// cycle; the caller may warn but the post is not blocked.
    pub fn pick_by_id(&self, state: &RotationState, id: &str) -> RotationResult<(Topic, bool)> {
        let topic = self
            .catalog
            .get(id)
            .ok_or_else(|| RotationError::topic_not_found(id))?;

        Ok((topic.clone(), state.is_posted(id)))
    }

    /// Count catalog topics not yet posted and not already handed out
    fn unposted_count(&self, state: &RotationState, provisional: &HashSet<String>) -> usize {
        self.catalog
            .all()
            .iter()
            .filter(|t| !state.is_posted(&t.id) && !provisional.contains(&t.id))
            .count()
    }
}

// ============================================================================
// Tests
// ============================================================================
