//! Fire-and-forget user notifications.
//!
//! Notices are advisory UI events (limit warnings, compaction). Dispatch is
//! detached: the engine never awaits a sink to finish a send, and a failing
//! sink is logged and dropped.

use std::sync::Arc;

use {async_trait::async_trait, tracing::warn};

/// An advisory notification for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl Notice {
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Sink for advisory notifications: a toast bar, a push relay, a log.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice) -> anyhow::Result<()>;
}

/// Notifier that drops everything. The default when no sink is attached.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _notice: Notice) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Dispatch `notice` on a detached task. Failures are logged, never
/// propagated.
pub(crate) fn dispatch(notifier: &Arc<dyn Notifier>, notice: Notice) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        let title = notice.title.clone();
        if let Err(e) = notifier.notify(notice).await {
            warn!(title = %title, "notification sink failed: {e}");
        }
    });
}
