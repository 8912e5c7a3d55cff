//! Conversation session snapshots.

use serde::{Deserialize, Serialize};

use crate::message::{ChatMessage, MessageId};

/// An ordered conversation history.
///
/// The engine treats sessions as immutable snapshots: every mutation builds a
/// new value that replaces the published one, so a concurrent reader never
/// observes a half-applied update. The `&mut self` methods below operate on
/// the engine's private working copy before it is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl ChatSession {
    /// Create an empty session with a fresh uuid.
    #[must_use]
    pub fn new() -> Self {
        let now = now_ms();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Append a message and refresh `updated_at`.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.touch();
    }

    /// Replace the message carrying `id` in place, preserving its position.
    ///
    /// Returns false and leaves the session untouched when no message
    /// carries `id`. Placeholders sit at the tail of the list, so the scan
    /// runs from the back.
    pub fn replace(&mut self, id: &MessageId, replacement: ChatMessage) -> bool {
        let Some(index) = self.messages.iter().rposition(|m| &m.id == id) else {
            return false;
        };
        self.messages[index] = replacement;
        self.touch();
        true
    }

    pub fn touch(&mut self) {
        self.updated_at = now_ms();
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
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
    use {
        super::*,
        crate::message::{MessageId, Role},
    };

    #[test]
    fn new_sessions_start_empty_with_matching_timestamps() {
        let session = ChatSession::new();
        assert!(session.messages.is_empty());
        assert_eq!(session.created_at, session.updated_at);
        assert!(!session.id.is_empty());
    }

    #[test]
    fn push_appends_in_order() {
        let mut session = ChatSession::new();
        session.push(ChatMessage::user("first"));
        session.push(ChatMessage::assistant("second"));
        session.push(ChatMessage::user("third"));

        let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert!(session.updated_at >= session.created_at);
    }

    #[test]
    fn replace_swaps_by_id_and_keeps_position() {
        let mut session = ChatSession::new();
        session.push(ChatMessage::user("question"));
        let placeholder = ChatMessage::pending_assistant();
        let id = placeholder.id.clone();
        session.push(placeholder);
        session.push(ChatMessage::user("follow-up"));

        let replaced = session.replace(&id, ChatMessage::assistant("answer"));
        assert!(replaced);
        assert_eq!(session.messages.len(), 3);
        assert_eq!(session.messages[1].content, "answer");
        assert_eq!(session.messages[1].role, Role::Assistant);
        assert!(!session.messages[1].pending);
    }

    #[test]
    fn replace_with_unknown_id_is_a_no_op() {
        let mut session = ChatSession::new();
        session.push(ChatMessage::user("only"));
        let before = session.clone();

        let replaced = session.replace(&MessageId::tagged("ghost"), ChatMessage::assistant("x"));
        assert!(!replaced);
        assert_eq!(session, before);
    }

    #[test]
    fn snapshot_roundtrips_through_json() {
        let mut session = ChatSession::new();
        session.push(ChatMessage::user("keep me"));
        session.push(ChatMessage::assistant("kept"));

        let raw = serde_json::to_string(&session).unwrap();
        let parsed: ChatSession = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, session);
    }
}
