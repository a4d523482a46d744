//! Catalog rotation: durable cycle state plus the selection algorithm
//!
//! A *cycle* is one full pass through the catalog: starting from an empty
//! `posted_ids` set, every topic is posted exactly once, then the set resets
//! and a new cycle begins. The pieces:
//!
//! - [`state`] - `RotationState` and the `StateStore` persistence trait
//! - [`selector`] - batch, random, and by-id selection with category spread
//! - [`error`] - rotation error types
//!
//! The selector never persists anything itself; the posting orchestrator
//! commits state after each confirmed delivery.

pub mod error;
pub mod selector;
pub mod state;

pub use error::{RotationError, RotationResult};
pub use selector::RotationSelector;
pub use state::{FileStateStore, MemoryStateStore, RotationState, StateStore};
