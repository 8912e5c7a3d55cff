//! Error type for session storage and policy code.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("session io: {0}")]
    Io(#[from] std::io::Error),

    #[error("session record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("blocking task: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("session file lock: {0}")]
    Lock(String),

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn lock_failed(reason: impl Into<String>) -> Self {
        Self::Lock(reason.into())
    }
}

impl confab_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

confab_common::impl_context!();
