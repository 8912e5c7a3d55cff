//! The conversation engine behind the dashboard's assistant widget.
//!
//! A [`ChatEngine`] owns one conversation: it appends the user's message and
//! a pending placeholder, asks the configured [`Responder`] for a reply,
//! finalizes the placeholder, and keeps the history inside its limits by
//! pruning stale messages and compacting once the ceiling is reached. Each
//! collaborator (responder, notifier, store) is a trait or handle injected
//! at construction, so the engine runs the same against a live backend or
//! the scripted stand-ins used in tests.

pub mod engine;
pub mod error;
pub mod notify;
pub mod responder;

pub use {
    engine::{ChatEngine, FALLBACK_REPLY, SendOutcome, SendReport},
    error::{Error, Result},
    notify::{Notice, Notifier, NoopNotifier},
    responder::{
        AssistantAction, AssistantContext, AssistantReply, AssistantRequest, HistoryEntry,
        Responder,
    },
};
