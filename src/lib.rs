//! baeum - Learning-topic posting bot
//!
//! The backend for a learning-topic knowledge base: rotates through the
//! article catalog and posts one topic per scheduled run to a Telegram
//! channel, guaranteeing full-catalog coverage before any repeat, and keeps
//! an auditable log of every attempt. Also proxies chat-completion requests
//! from the site to an upstream LLM API.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`catalog`] - Read-only access to the pre-authored topic catalog
//! - [`rotation`] - Cycle state, persistence, and the selection algorithm
//! - [`posting`] - Formatting, channel delivery, commit semantics, audit log
//! - [`scheduler`] - Time-of-day trigger for scheduled runs
//! - [`server`] - HTTP trigger, log retrieval, and chat proxy endpoints
//! - [`chat`] - Chat-completion passthrough to the upstream API
//! - [`config`] - Configuration management and settings
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use baeum::catalog::Catalog;
//! use baeum::posting::{FilePostLog, Poster, TelegramChannel, TelegramConfig};
//! use baeum::rotation::FileStateStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = Arc::new(Catalog::from_file("data/catalog.json")?);
//!     let channel = TelegramChannel::new(TelegramConfig::new("token", "@channel"))?;
//!     let poster = Poster::new(
//!         catalog,
//!         Arc::new(FileStateStore::new("data/rotation_state.json")),
//!         Arc::new(FilePostLog::new("data/posting_log.jsonl")),
//!         Arc::new(channel),
//!     );
//!     let report = poster.run(1).await;
//!     println!("posted: {:?}", report.posted);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod posting;
pub mod rotation;
pub mod scheduler;
pub mod server;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{Catalog, Topic};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::posting::{Poster, RunReport};
    pub use crate::rotation::{RotationSelector, RotationState};
}

// Direct re-exports for convenience
pub use catalog::{Catalog, Topic};
pub use posting::{Poster, RunReport};
pub use rotation::RotationState;
