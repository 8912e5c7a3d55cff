//! Drives a `ChatEngine` against a canned responder, with the limits
//! lowered far enough to watch the near-limit notice and compaction fire.
//!
//! Run with `cargo run -p confab-chat --example scripted_session`.

use std::{sync::Arc, time::Duration};

use {anyhow::Result, tracing::info, tracing_subscriber::EnvFilter};

use {
    confab_chat::{
        AssistantContext, AssistantReply, AssistantRequest, ChatEngine, Notice, Notifier,
        Responder,
    },
    confab_sessions::SessionLimits,
};

struct EchoResponder;

#[async_trait::async_trait]
impl Responder for EchoResponder {
    async fn respond(
        &self,
        request: AssistantRequest,
        context: &AssistantContext,
    ) -> Result<AssistantReply> {
        let page = context.current_page.as_deref().unwrap_or("/");
        Ok(AssistantReply::text(format!(
            "You said \"{}\" on {page} ({} prior turns).",
            request.message,
            request.history.len()
        )))
    }
}

struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: Notice) -> Result<()> {
        info!(title = %notice.title, body = %notice.body, "notice");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let engine = ChatEngine::new(Arc::new(EchoResponder))
        .with_limits(SessionLimits {
            max_messages_per_session: 12,
            ..SessionLimits::default()
        })
        .with_notifier(Arc::new(LogNotifier));
    engine
        .set_current_page(Some("/courses/rust-101".to_string()))
        .await;

    for i in 1..=8 {
        let report = engine.send_message(&format!("question number {i}")).await?;
        let messages = report.session.as_ref().map_or(0, |s| s.messages.len());
        info!(
            outcome = ?report.outcome,
            messages,
            compacted = report.compacted,
            "send finished"
        );
    }

    let stats = engine.storage_stats().await;
    info!(
        messages = stats.message_count,
        headroom = stats.messages_until_limit,
        "final usage"
    );

    // give detached notice tasks a beat to print before exiting
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
