//! Errors surfaced by the engine.
//!
//! Only caller-usage errors (`Busy`, `EmptyMessage`) come back from
//! `send_message`; responder and store failures are absorbed into the
//! report instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("a send is already in flight for this session")]
    Busy,

    #[error("message content is empty")]
    EmptyMessage,

    #[error("session store: {0}")]
    Store(#[from] confab_sessions::Error),

    #[error("{0}")]
    Message(String),
}

impl confab_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

confab_common::impl_context!();
