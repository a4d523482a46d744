//! Posting pipeline: format, deliver, commit, audit
//!
//! # Overview
//!
//! One *run* (scheduled or manually triggered) flows through here:
//!
//! ```text
//! ┌────────────┐   candidates   ┌────────────┐   text    ┌───────────┐
//! │  Rotation  │ ─────────────▶ │   Poster   │ ────────▶ │  Channel  │
//! │  Selector  │                │            │ ◀──────── │  (send)   │
//! └────────────┘                └─────┬──────┘  msg id   └───────────┘
//!                                     │ per-item commit
//!                         ┌───────────┴───────────┐
//!                         ▼                       ▼
//!                   ┌───────────┐           ┌───────────┐
//!                   │ StateStore│           │  PostLog  │
//!                   └───────────┘           └───────────┘
//! ```
//!
//! # Modules
//!
//! - [`orchestrator`] - the per-run state machine and commit semantics
//! - [`channel`] - `ChannelClient` trait and the Telegram implementation
//! - [`formatter`] - HTML rendering and the message-length bound
//! - [`log`] - append-only audit trail of every attempt

pub mod channel;
pub mod formatter;
pub mod log;
pub mod orchestrator;

pub use channel::{ChannelClient, ChannelError, SentMessage, TelegramChannel, TelegramConfig};
pub use log::{FilePostLog, MemoryPostLog, PostLog, PostLogEntry, PostStatus};
pub use orchestrator::{CategoryProgress, Poster, RotationStatus, RunReport};
