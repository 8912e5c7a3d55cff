//! Contract between the chat engine and whatever produces replies.
//!
//! The engine hands a responder only what a reply needs: the new message,
//! prior turns reduced to bare role/content pairs, a condensed digest, and
//! the ambient UI context. Ids, timestamps, and the pending flag never cross
//! this boundary, so they can never leak into a provider request.

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

use confab_sessions::{ChatMessage, Role};

/// One prior turn, reduced to the fields a responder needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    /// Strip a stored message down to its responder-visible fields.
    #[must_use]
    pub fn from_message(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request handed to [`Responder::respond`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantRequest {
    /// The message being answered.
    pub message: String,
    /// Prior turns, oldest first, pending placeholders excluded.
    pub history: Vec<HistoryEntry>,
    /// Condensed digest of the conversation so far, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_digest: Option<String>,
}

/// Ambient UI state a responder may tailor replies to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssistantContext {
    /// Route of the page the user is currently viewing.
    pub current_page: Option<String>,
}

/// Follow-up action a reply can offer the embedding UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantAction {
    /// Machine-readable action name understood by the embedding UI.
    pub name: String,
    /// Label for rendering a button or chip.
    pub label: String,
    /// Action-specific parameters.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

/// A produced reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<AssistantAction>,
}

impl AssistantReply {
    /// Plain text reply with no follow-up actions.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            actions: Vec::new(),
        }
    }
}

/// Produces assistant replies.
///
/// Implementations wrap whatever actually answers: a hosted LLM, a local
/// model, or a rules engine. The engine never retries; a returned error
/// becomes the fallback reply.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(
        &self,
        request: AssistantRequest,
        context: &AssistantContext,
    ) -> anyhow::Result<AssistantReply>;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_entries_expose_only_role_and_content() {
        let entry = HistoryEntry::from_message(&ChatMessage::user("where are my courses?"));
        let json = serde_json::to_value(&entry).unwrap();

        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["content", "role"]);
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "where are my courses?");
    }

    #[test]
    fn request_omits_an_absent_digest() {
        let request = AssistantRequest {
            message: "hi".to_string(),
            history: Vec::new(),
            history_digest: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("history_digest").is_none());
    }

    #[test]
    fn actions_roundtrip_with_camel_case_keys() {
        let reply = AssistantReply {
            content: "Opening the course catalog.".to_string(),
            actions: vec![AssistantAction {
                name: "navigate".to_string(),
                label: "Open catalog".to_string(),
                params: serde_json::json!({"page": "/courses"}),
            }],
        };

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["actions"][0]["name"], "navigate");
        assert_eq!(json["actions"][0]["params"]["page"], "/courses");

        let parsed: AssistantReply = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, reply);
    }

    #[test]
    fn plain_text_replies_serialize_without_actions() {
        let json = serde_json::to_value(AssistantReply::text("done")).unwrap();
        assert!(json.get("actions").is_none());
    }

    #[test]
    fn context_defaults_to_no_page() {
        let context: AssistantContext = serde_json::from_str("{}").unwrap();
        assert!(context.current_page.is_none());

        let json = serde_json::to_value(AssistantContext {
            current_page: Some("/training/overdue".to_string()),
        })
        .unwrap();
        assert_eq!(json["currentPage"], "/training/overdue");
    }
}
