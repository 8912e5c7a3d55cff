//! Send orchestration for a single conversation.
//!
//! `ChatEngine` owns the live session snapshot and is the only writer. Every
//! mutation builds a new snapshot and publishes it over a watch channel; the
//! embedding UI renders whatever it last observed. One send may be in flight
//! at a time, and a send whose session was cleared or replaced underneath it
//! discards its result instead of resurrecting old state.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use {
    tokio::sync::{RwLock, watch},
    tracing::{debug, info, warn},
};

use confab_sessions::{
    ChatMessage, ChatSession, LimitsUpdate, SessionLimits, SessionStore, StorageStats,
    compaction::{compact_session, prune_old_messages},
    storage_stats,
    summary::conversation_summary,
};

use crate::{
    error::{Context, Error, Result},
    notify::{self, Notice, Notifier, NoopNotifier},
    responder::{AssistantContext, AssistantReply, AssistantRequest, HistoryEntry, Responder},
};

/// Reply appended in place of the placeholder when the responder fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, I ran into a problem while answering. Please try again in a moment.";

/// How a send concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The responder answered and the reply was appended.
    Replied,
    /// The responder failed; the fallback reply was appended instead.
    Fallback,
    /// The session was cleared or replaced mid-flight; the result was
    /// dropped without touching newer state.
    Discarded,
}

/// Everything a caller can learn from one send.
#[derive(Debug, Clone)]
pub struct SendReport {
    pub outcome: SendOutcome,
    /// Final snapshot after the send; `None` when the result was discarded.
    pub session: Option<ChatSession>,
    /// The responder's reply, including any follow-up actions.
    pub reply: Option<AssistantReply>,
    /// Responder error string when the fallback was used.
    pub error: Option<String>,
    /// True when this send pushed the history over its ceiling and it was
    /// compacted.
    pub compacted: bool,
    /// Headroom reported by the near-limit warning, when it fired.
    pub messages_until_limit: Option<u32>,
}

/// Clears the in-flight flag on every exit path.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Busy);
        }
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Orchestrates sends for one conversation.
///
/// Collaborators are injected at construction; the engine carries no global
/// state and an application may run one engine per open conversation.
pub struct ChatEngine {
    responder: Arc<dyn Responder>,
    notifier: Arc<dyn Notifier>,
    limits: RwLock<SessionLimits>,
    context: RwLock<AssistantContext>,
    store: Option<Arc<SessionStore>>,
    fallback_reply: String,
    session_tx: watch::Sender<Option<ChatSession>>,
    in_flight: AtomicBool,
    /// Bumped whenever the session is cleared or replaced wholesale, so a
    /// responder result from before the bump can be recognized as stale.
    generation: AtomicU64,
}

impl ChatEngine {
    /// Create an engine with default limits, a no-op notifier, and no store.
    #[must_use]
    pub fn new(responder: Arc<dyn Responder>) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            responder,
            notifier: Arc::new(NoopNotifier),
            limits: RwLock::new(SessionLimits::default()),
            context: RwLock::new(AssistantContext::default()),
            store: None,
            fallback_reply: FALLBACK_REPLY.to_string(),
            session_tx,
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Attach a notification sink.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Start from non-default limits.
    #[must_use]
    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = RwLock::new(limits);
        self
    }

    /// Persist final snapshots to `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the reply used when the responder fails.
    #[must_use]
    pub fn with_fallback_reply(mut self, reply: impl Into<String>) -> Self {
        self.fallback_reply = reply.into();
        self
    }

    // ── Snapshot access ──────────────────────────────────────────────────

    /// Current session snapshot, if one exists.
    #[must_use]
    pub fn session(&self) -> Option<ChatSession> {
        self.session_tx.borrow().clone()
    }

    /// Subscribe to snapshot updates. A receiver observes every published
    /// state it keeps up with, including the intermediate pending one
    /// during a send.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<ChatSession>> {
        self.session_tx.subscribe()
    }

    /// True while a send (or resume) is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Usage stats for the current snapshot.
    pub async fn storage_stats(&self) -> StorageStats {
        let limits = *self.limits.read().await;
        storage_stats(self.session().as_ref(), &limits)
    }

    // ── Configuration handles ────────────────────────────────────────────

    pub async fn limits(&self) -> SessionLimits {
        *self.limits.read().await
    }

    /// Apply a partial limit update and return the result.
    pub async fn update_limits(&self, update: LimitsUpdate) -> SessionLimits {
        let mut limits = self.limits.write().await;
        limits.merge(update);
        info!(
            max_messages = limits.max_messages_per_session,
            max_sessions = limits.max_sessions_per_user,
            expiry_days = limits.session_expiry_days,
            "session limits updated"
        );
        *limits
    }

    /// Record the page the user is currently viewing.
    pub async fn set_current_page(&self, page: Option<String>) {
        self.context.write().await.current_page = page;
    }

    pub async fn current_page(&self) -> Option<String> {
        self.context.read().await.current_page.clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Drop the current session. An in-flight responder result, if any, is
    /// discarded when it lands.
    pub async fn clear_session(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let Some(previous) = self.session_tx.send_replace(None) else {
            return;
        };
        info!(session = %previous.id, "session cleared");
        if let Some(store) = &self.store {
            if let Err(e) = store.delete(&previous.id).await {
                warn!(session = %previous.id, "failed to delete stored session: {e}");
            }
        }
    }

    /// Replace the current session with a stored one.
    ///
    /// Takes the same exclusive slot as a send, so it is rejected with
    /// [`Error::Busy`] while one is in flight.
    pub async fn resume_session(&self, id: &str) -> Result<ChatSession> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let store = self.store.as_ref().context("no session store attached")?;

        let session = store
            .load(id)
            .await?
            .with_context(|| format!("no stored session {id}"))?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        info!(session = %session.id, count = session.messages.len(), "session resumed");
        self.session_tx.send_replace(Some(session.clone()));
        Ok(session)
    }

    // ── Send orchestration ───────────────────────────────────────────────

    /// Send a user message and drive it to a final state.
    ///
    /// Returns usage errors (`Busy`, `EmptyMessage`) as `Err`; a responder
    /// failure is not an error but a [`SendOutcome::Fallback`] report.
    pub async fn send_message(&self, content: &str) -> Result<SendReport> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::EmptyMessage);
        }
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let generation = self.generation.load(Ordering::Acquire);
        let limits = *self.limits.read().await;

        // Work on a private copy; nothing is visible until published.
        let mut session = self.session().unwrap_or_else(|| {
            debug!("starting a new session");
            ChatSession::new()
        });

        let mut near_limit_headroom = None;
        let count = session.messages.len();
        if limits.is_near_limit(count) {
            let left = limits.messages_until_limit(count);
            near_limit_headroom = Some(left);
            warn!(session = %session.id, left, "conversation approaching its message limit");
            notify::dispatch(
                &self.notifier,
                Notice::new(
                    "Approaching conversation limit",
                    format!("{left} messages left before older history is summarized."),
                ),
            );
        }

        if let Some(pruned) = prune_old_messages(&session) {
            debug!(
                session = %session.id,
                dropped = session.messages.len() - pruned.messages.len(),
                "pruned stale messages"
            );
            session = pruned;
        }

        // Prior history and digest reflect the conversation before this
        // message.
        let history: Vec<HistoryEntry> = session
            .messages
            .iter()
            .filter(|m| !m.pending)
            .map(HistoryEntry::from_message)
            .collect();
        let digest = conversation_summary(&session.messages);
        let history_digest = (!digest.is_empty()).then_some(digest);

        let placeholder = ChatMessage::pending_assistant();
        session.push(ChatMessage::user(content));
        session.push(placeholder.clone());
        if !self.publish_if_current(generation, &session) {
            return Ok(Self::discarded(near_limit_headroom));
        }

        let request = AssistantRequest {
            message: content.to_string(),
            history,
            history_digest,
        };
        let context = self.context.read().await.clone();

        info!(
            session = %session.id,
            count = session.messages.len(),
            "dispatching message to responder"
        );
        let responded = self.responder.respond(request, &context).await;

        if self.generation.load(Ordering::Acquire) != generation {
            info!(session = %session.id, "session changed mid-flight; discarding responder result");
            return Ok(Self::discarded(near_limit_headroom));
        }

        let (outcome, reply, error) = match responded {
            Ok(reply) => {
                let finalized = placeholder.into_final(reply.content.clone());
                let id = finalized.id.clone();
                session.replace(&id, finalized);
                (SendOutcome::Replied, Some(reply), None)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(session = %session.id, "responder failed: {message}");
                let fallback = placeholder.into_final(self.fallback_reply.clone());
                let id = fallback.id.clone();
                session.replace(&id, fallback);
                (SendOutcome::Fallback, None, Some(message))
            }
        };

        let mut compacted = false;
        let limits = *self.limits.read().await;
        if let Some(squeezed) = compact_session(&session, &limits) {
            info!(
                session = %session.id,
                before = session.messages.len(),
                after = squeezed.messages.len(),
                "compacted conversation history"
            );
            session = squeezed;
            compacted = true;
            notify::dispatch(
                &self.notifier,
                Notice::new(
                    "Conversation summarized",
                    "Older messages were condensed to keep this chat responsive.",
                ),
            );
        }

        if !self.publish_if_current(generation, &session) {
            return Ok(Self::discarded(near_limit_headroom));
        }
        self.persist(generation, &session).await;

        Ok(SendReport {
            outcome,
            session: Some(session),
            reply,
            error,
            compacted,
            messages_until_limit: near_limit_headroom,
        })
    }

    /// Publish `session` unless the generation moved on. The check runs
    /// under the watch channel's internal lock, so it cannot interleave
    /// with a concurrent clear or resume.
    fn publish_if_current(&self, generation: u64, session: &ChatSession) -> bool {
        let mut published = false;
        self.session_tx.send_if_modified(|slot| {
            if self.generation.load(Ordering::Acquire) != generation {
                return false;
            }
            *slot = Some(session.clone());
            published = true;
            true
        });
        published
    }

    /// Best-effort save; a failing store never fails the send.
    async fn persist(&self, generation: u64, session: &ChatSession) {
        let Some(store) = &self.store else { return };
        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        if let Err(e) = store.save(session).await {
            warn!(session = %session.id, "failed to persist session: {e}");
        }
    }

    fn discarded(messages_until_limit: Option<u32>) -> SendReport {
        SendReport {
            outcome: SendOutcome::Discarded,
            session: None,
            reply: None,
            error: None,
            compacted: false,
            messages_until_limit,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct UnreachableResponder;

    #[async_trait::async_trait]
    impl Responder for UnreachableResponder {
        async fn respond(
            &self,
            _request: AssistantRequest,
            _context: &AssistantContext,
        ) -> anyhow::Result<AssistantReply> {
            unreachable!("the responder must not be called")
        }
    }

    #[tokio::test]
    async fn blank_messages_are_rejected_before_anything_runs() {
        let engine = ChatEngine::new(Arc::new(UnreachableResponder));
        let err = engine.send_message("   ").await.unwrap_err();
        assert!(matches!(err, Error::EmptyMessage));
        assert!(engine.session().is_none());
        assert!(!engine.is_busy());
    }

    #[tokio::test]
    async fn resume_without_a_store_is_a_usage_error() {
        let engine = ChatEngine::new(Arc::new(UnreachableResponder));
        let err = engine.resume_session("any").await.unwrap_err();
        assert!(err.to_string().contains("no session store attached"));
    }

    #[test]
    fn in_flight_guard_is_exclusive_until_dropped() {
        let flag = AtomicBool::new(false);
        let guard = InFlightGuard::acquire(&flag).unwrap();
        assert!(matches!(InFlightGuard::acquire(&flag), Err(Error::Busy)));
        drop(guard);
        assert!(InFlightGuard::acquire(&flag).is_ok());
    }
}
