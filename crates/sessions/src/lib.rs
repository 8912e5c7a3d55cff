//! Conversation session state: bounded message histories, the limit policy
//! that keeps them bounded, and the collaborators that persist them.
//!
//! Sessions are stored as JSONL files (a header line plus one message per
//! line) with file locking, next to a JSON index that enforces per-owner
//! session caps and inactivity expiry.

pub mod compaction;
pub mod error;
pub mod limits;
pub mod message;
pub mod registry;
pub mod session;
pub mod store;
pub mod summary;

pub use {
    error::{Error, Result},
    limits::{LimitsUpdate, SessionLimits, StorageStats, storage_stats},
    message::{ChatMessage, MessageId, Role},
    registry::{SessionEntry, SessionRegistry},
    session::ChatSession,
    store::SessionStore,
};
