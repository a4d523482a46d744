//! Integration tests for the rotation selector and state persistence
//!
//! These cover the cycle guarantees end to end: no repeats until the catalog
//! is exhausted, reset-before-select on exhaustion, category spread within a
//! batch, and the durability of the persisted state.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use baeum::catalog::{Catalog, Topic};
use baeum::rotation::{
    FileStateStore, RotationError, RotationSelector, RotationState, StateStore,
};
use common::five_topic_catalog;
use proptest::prelude::*;

// ============================================================================
// Cycle Properties
// ============================================================================

#[test]
fn test_pick_random_is_pairwise_distinct_until_exhaustion() {
    for seed in 0..10 {
        let mut selector = RotationSelector::with_seed(five_topic_catalog(), seed);
        let mut state = RotationState::new();
        let mut seen = HashSet::new();

        for i in 0..5 {
            let topic = selector.pick_random(&mut state).unwrap();
            assert!(
                seen.insert(topic.id.clone()),
                "seed {seed}: repeat at pick {i} before exhaustion"
            );
            state.mark_posted(topic.id);
        }
    }
}

#[test]
fn test_full_cycle_then_reset_makes_ids_selectable_again() {
    let mut selector = RotationSelector::with_seed(five_topic_catalog(), 21);
    let mut state = RotationState::new();

    for _ in 0..5 {
        let topic = selector.pick_random(&mut state).unwrap();
        state.mark_posted(topic.id);
    }
    assert_eq!(state.posted_count(), 5);

    // Exhausted: reset happens before the choice, so this succeeds and the
    // fresh cycle starts empty.
    let topic = selector.pick_random(&mut state).unwrap();
    assert_eq!(state.posted_count(), 0);
    assert!(five_topic_catalog().get(&topic.id).is_some());
}

#[test]
fn test_batch_spans_distinct_categories() {
    // k = 2 batches over a catalog with 2 categories: every batch with both
    // categories still unposted must span both.
    let mut selector = RotationSelector::with_seed(five_topic_catalog(), 8);
    let mut state = RotationState::new();

    let batch = selector.next_topics(&mut state, 2).unwrap();
    let categories: HashSet<&str> = batch.iter().map(|t| t.category_id.as_str()).collect();
    assert_eq!(categories.len(), 2);
}

#[test]
fn test_concrete_five_topic_walkthrough() {
    // 5 topics across 2 categories (3 + 2), batches of 2, committing after
    // each batch like the orchestrator does.
    let mut selector = RotationSelector::with_seed(five_topic_catalog(), 4);
    let mut state = RotationState::new();
    let mut first_cycle: HashSet<String> = HashSet::new();

    // Batch 1: one topic per category.
    let batch = selector.next_topics(&mut state, 2).unwrap();
    let cats: HashSet<&str> = batch.iter().map(|t| t.category_id.as_str()).collect();
    assert_eq!(cats.len(), 2);
    for t in &batch {
        state.mark_posted(t.id.clone());
        first_cycle.insert(t.id.clone());
    }
    assert_eq!(state.posted_count(), 2);

    // Batch 2.
    let batch = selector.next_topics(&mut state, 2).unwrap();
    for t in &batch {
        assert!(!first_cycle.contains(&t.id), "repeat within the cycle");
        state.mark_posted(t.id.clone());
        first_cycle.insert(t.id.clone());
    }
    assert_eq!(state.posted_count(), 4);

    // Batch 3: 5 is odd, so the second slot triggers the reset. The call
    // still returns two distinct topics and the old cycle is gone.
    let batch = selector.next_topics(&mut state, 2).unwrap();
    assert_eq!(batch.len(), 2);
    assert_ne!(batch[0].id, batch[1].id);
    assert!(!first_cycle.contains(&batch[0].id));
    assert!(first_cycle.contains(&batch[1].id));
    assert_eq!(state.posted_count(), 0);
}

#[test]
fn test_unknown_topic_id_is_an_error_value() {
    let selector = RotationSelector::with_seed(five_topic_catalog(), 1);
    let state = RotationState::new();

    let result = selector.pick_by_id(&state, "does-not-exist");
    assert!(matches!(result, Err(RotationError::TopicNotFound { .. })));
}

#[test]
fn test_empty_catalog_is_an_error_value() {
    let empty = Arc::new(Catalog::from_topics(vec![]).unwrap());
    let mut selector = RotationSelector::with_seed(empty, 1);
    let mut state = RotationState::new();

    assert!(matches!(
        selector.next_topics(&mut state, 1),
        Err(RotationError::CatalogEmpty)
    ));
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_state_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rotation_state.json");

    let mut state = RotationState::new();
    state.mark_posted("closures");
    state.mark_posted("generics");
    state.last_post_date = chrono::NaiveDate::from_ymd_opt(2024, 5, 2);

    FileStateStore::new(&path).save(&state).await.unwrap();

    // A fresh store over the same path sees the same record.
    let reloaded = FileStateStore::new(&path).load().await;
    assert_eq!(reloaded, state);
}

#[tokio::test]
async fn test_corrupt_state_restarts_cycle_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rotation_state.json");
    tokio::fs::write(&path, b"\x00\xffgarbage").await.unwrap();

    let state = FileStateStore::new(&path).load().await;
    assert_eq!(state, RotationState::new());

    // The restarted cycle selects normally.
    let mut selector = RotationSelector::with_seed(five_topic_catalog(), 2);
    let mut state = state;
    assert!(selector.next_topics(&mut state, 1).is_ok());
}

// ============================================================================
// Property: coverage before repetition
// ============================================================================

proptest! {
    /// Drawing batches until the catalog size is reached never repeats a
    /// topic, for arbitrary category shapes, batch sizes, and seeds.
    #[test]
    fn prop_no_repeats_within_one_cycle(
        sizes in prop::collection::vec(1usize..4, 1..5),
        batch in 1usize..4,
        seed in 0u64..500,
    ) {
        let mut topics = Vec::new();
        for (c, size) in sizes.iter().enumerate() {
            for i in 0..*size {
                topics.push(Topic::new(
                    format!("t{c}_{i}"),
                    format!("cat{c}"),
                    "T",
                    "s",
                ));
            }
        }
        let total = topics.len();
        let catalog = Arc::new(Catalog::from_topics(topics).unwrap());

        let mut selector = RotationSelector::with_seed(catalog, seed);
        let mut state = RotationState::new();
        let mut seen = HashSet::new();
        let mut drawn = 0;

        while drawn + batch <= total {
            let picked = selector.next_topics(&mut state, batch).unwrap();
            prop_assert_eq!(picked.len(), batch.min(total));
            for t in picked {
                prop_assert!(seen.insert(t.id.clone()), "repeat before exhaustion");
                state.mark_posted(t.id);
                drawn += 1;
            }
        }
    }
}
