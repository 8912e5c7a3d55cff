//! Condensed conversation digests for responder context.

use crate::message::{ChatMessage, Role};

/// Messages sampled per role.
pub const DIGEST_PER_ROLE: usize = 10;
/// Characters kept from each sampled message.
pub const DIGEST_SNIPPET_CHARS: usize = 50;

/// Build a short two-part digest of a conversation: what the user asked
/// about and what the assistant helped with.
///
/// Samples the first [`DIGEST_PER_ROLE`] messages of each role, truncating
/// each to [`DIGEST_SNIPPET_CHARS`] characters. Pending placeholders carry
/// no content and are skipped. Empty for an empty history.
#[must_use]
pub fn conversation_summary(messages: &[ChatMessage]) -> String {
    let asked = sample(messages, Role::User);
    let helped = sample(messages, Role::Assistant);

    let mut parts = Vec::with_capacity(2);
    if !asked.is_empty() {
        parts.push(format!("User asked about: {}", asked.join("; ")));
    }
    if !helped.is_empty() {
        parts.push(format!("Assistant helped with: {}", helped.join("; ")));
    }
    parts.join("\n")
}

fn sample(messages: &[ChatMessage], role: Role) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.role == role && !m.pending)
        .take(DIGEST_PER_ROLE)
        .map(|m| snippet(&m.content))
        .collect()
}

/// First [`DIGEST_SNIPPET_CHARS`] characters; counts Unicode scalar values,
/// so a snippet boundary can never split a code point.
fn snippet(content: &str) -> String {
    content.chars().take(DIGEST_SNIPPET_CHARS).collect()
}
