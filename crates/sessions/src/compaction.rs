//! Lossy history compaction and age-based pruning.
//!
//! Both operations are pure over a snapshot and return `None` when the
//! session is already within bounds, so callers can tell "unchanged" from
//! "new snapshot" without diffing message lists.

use crate::{
    limits::SessionLimits,
    message::{ChatMessage, MessageId, Role},
    session::ChatSession,
};

/// Messages preserved verbatim from the start of an over-limit history.
pub const HEAD_KEEP: usize = 5;
/// Messages preserved verbatim from the end of an over-limit history.
pub const TAIL_KEEP: usize = 35;
/// Notice text carried by the synthesized summary marker.
pub const SUMMARY_NOTICE: &str =
    "[Earlier messages in this conversation were summarized to keep it responsive.]";
/// Id prefix marking synthesized summary messages.
pub const SUMMARY_TAG: &str = "summary";

/// Maximum age of a message before [`prune_old_messages`] may drop it.
pub const PRUNE_MAX_AGE_MS: u64 = 24 * 60 * 60 * 1000;
/// Most recent messages always exempt from age pruning.
pub const PRUNE_KEEP_RECENT: usize = 10;

/// Collapse an over-limit history to the first [`HEAD_KEEP`] messages, one
/// summary marker, and the last [`TAIL_KEEP`].
///
/// Returns `None` while the session is under its ceiling. The tail is
/// clamped twice: it never reaches into the head, and the compacted result
/// never exceeds the ceiling itself, so a history that briefly overshoots
/// (a send appends two messages before compacting) lands back at the
/// ceiling. With a ceiling of six or fewer there is no room for head,
/// marker, and a non-empty tail, and the session is left as is.
#[must_use]
pub fn compact_session(session: &ChatSession, limits: &SessionLimits) -> Option<ChatSession> {
    let len = session.messages.len();
    if !limits.is_at_limit(len) {
        return None;
    }
    let cap = limits.max_messages_per_session as usize;
    let tail_keep = TAIL_KEEP
        .min(cap.saturating_sub(HEAD_KEEP + 1))
        .min(len.saturating_sub(HEAD_KEEP + 1));
    if tail_keep == 0 {
        return None;
    }

    let mut messages = Vec::with_capacity(HEAD_KEEP + 1 + tail_keep);
    messages.extend_from_slice(&session.messages[..HEAD_KEEP]);
    messages.push(summary_marker());
    messages.extend_from_slice(&session.messages[len - tail_keep..]);

    Some(ChatSession {
        id: session.id.clone(),
        messages,
        created_at: session.created_at,
        updated_at: now_ms(),
    })
}

/// True for messages synthesized by [`compact_session`]. Ordinary ids are
/// all digits, so the tag prefix is unambiguous.
#[must_use]
pub fn is_summary_marker(message: &ChatMessage) -> bool {
    message.id.as_str().starts_with(SUMMARY_TAG)
}

fn summary_marker() -> ChatMessage {
    ChatMessage {
        id: MessageId::tagged(SUMMARY_TAG),
        role: Role::Assistant,
        content: SUMMARY_NOTICE.to_string(),
        created_at: now_ms(),
        pending: false,
    }
}

/// Drop messages older than [`PRUNE_MAX_AGE_MS`], always keeping the last
/// [`PRUNE_KEEP_RECENT`] regardless of age.
///
/// Returns `None` when nothing was dropped.
#[must_use]
pub fn prune_old_messages(session: &ChatSession) -> Option<ChatSession> {
    let len = session.messages.len();
    let cutoff = now_ms().saturating_sub(PRUNE_MAX_AGE_MS);
    let recent_from = len.saturating_sub(PRUNE_KEEP_RECENT);

    let kept: Vec<ChatMessage> = session
        .messages
        .iter()
        .enumerate()
        .filter(|(index, message)| *index >= recent_from || message.created_at > cutoff)
        .map(|(_, message)| message.clone())
        .collect();

    if kept.len() == len {
        return None;
    }
    Some(ChatSession {
        id: session.id.clone(),
        messages: kept,
        created_at: session.created_at,
        updated_at: now_ms(),
    })
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
