//! Typed message structures for conversation sessions.
//!
//! A message is a flat record the UI can render directly. Only `role` and
//! `content` ever cross the responder boundary; ids, timestamps, and the
//! pending flag stay inside the engine.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ── Role ────────────────────────────────────────────────────────────────────

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

// ── MessageId ───────────────────────────────────────────────────────────────

/// Unique message identifier that sorts in allocation order.
///
/// Ids derive from the allocation time in unix milliseconds, bumped by one
/// whenever the clock has not advanced past the previous allocation, so a
/// later id always compares greater. The string form is zero-padded to keep
/// lexicographic and numeric order identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

static LAST_ALLOCATED_MS: AtomicU64 = AtomicU64::new(0);

impl MessageId {
    /// Allocate the next id.
    #[must_use]
    pub fn next() -> Self {
        loop {
            let last = LAST_ALLOCATED_MS.load(Ordering::Acquire);
            let candidate = now_ms().max(last + 1);
            if LAST_ALLOCATED_MS
                .compare_exchange(last, candidate, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Self(format!("{candidate:016}"));
            }
        }
    }

    /// Allocate an id for a synthesized message, prefixed with `tag` so it
    /// can never collide with an ordinary id.
    #[must_use]
    pub fn tagged(tag: &str) -> Self {
        let Self(inner) = Self::next();
        Self(format!("{tag}-{inner}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── ChatMessage ─────────────────────────────────────────────────────────────

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    /// Unix milliseconds. Finalizing a pending message refreshes this to the
    /// arrival time of the reply.
    pub created_at: u64,
    /// True only for an assistant placeholder still waiting on a reply.
    #[serde(default)]
    pub pending: bool,
}

impl ChatMessage {
    /// Create a finalized user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::next(),
            role: Role::User,
            content: content.into(),
            created_at: now_ms(),
            pending: false,
        }
    }

    /// Create a finalized assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::next(),
            role: Role::Assistant,
            content: content.into(),
            created_at: now_ms(),
            pending: false,
        }
    }

    /// Create the transient assistant placeholder appended while a reply is
    /// being produced. Empty content until finalized.
    #[must_use]
    pub fn pending_assistant() -> Self {
        Self {
            id: MessageId::next(),
            role: Role::Assistant,
            content: String::new(),
            created_at: now_ms(),
            pending: true,
        }
    }

    /// Finalize with `content`, keeping the id (list identity) but taking a
    /// fresh timestamp.
    #[must_use]
    pub fn into_final(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self.pending = false;
        self.created_at = now_ms();
        self
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_allocate_in_increasing_order() {
        let ids: Vec<MessageId> = (0..100).map(|_| MessageId::next()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn ids_stay_unique_across_threads() {
        let mut all: Vec<MessageId> = Vec::new();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| (0..50).map(|_| MessageId::next()).collect::<Vec<_>>()))
                .collect();
            for handle in handles {
                all.extend(handle.join().unwrap());
            }
        });
        let unique: std::collections::HashSet<&str> = all.iter().map(MessageId::as_str).collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn tagged_ids_carry_their_prefix() {
        let id = MessageId::tagged("summary");
        assert!(id.as_str().starts_with("summary-"));
        let digits = id.as_str().trim_start_matches("summary-");
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn user_message_serializes_with_lowercase_role() {
        let msg = ChatMessage::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
        assert_eq!(json["pending"], false);
        assert!(json["created_at"].as_u64().unwrap() > 0);
    }

    #[test]
    fn line_without_pending_field_parses_as_final() {
        // Snapshots written before the pending flag existed omit it.
        let json = serde_json::json!({
            "id": "0001699999999999",
            "role": "assistant",
            "content": "done",
            "created_at": 12345
        });
        let msg: ChatMessage = serde_json::from_value(json).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert!(!msg.pending);
    }

    #[test]
    fn pending_assistant_is_empty_until_finalized() {
        let placeholder = ChatMessage::pending_assistant();
        assert!(placeholder.pending);
        assert!(placeholder.content.is_empty());
        assert_eq!(placeholder.role, Role::Assistant);
    }

    #[test]
    fn into_final_keeps_id_and_clears_pending() {
        let placeholder = ChatMessage::pending_assistant();
        let id = placeholder.id.clone();
        let done = placeholder.into_final("the answer");
        assert_eq!(done.id, id);
        assert_eq!(done.content, "the answer");
        assert!(!done.pending);
    }

    #[test]
    fn roundtrip_preserves_all_fields() {
        let original = ChatMessage::assistant("take the stairs");
        let line = serde_json::to_string(&original).unwrap();
        let parsed: ChatMessage = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, original);
    }
}
