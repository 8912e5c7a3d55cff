//! Session growth limits and the pure predicates the engine consults.

use serde::{Deserialize, Serialize};

use crate::session::ChatSession;

/// Messages remaining before the ceiling at which the near-limit warning
/// starts firing.
pub const NEAR_LIMIT_WINDOW: u32 = 5;

/// Tunable ceilings for conversation growth.
///
/// `max_messages_per_session` drives the warn and compact predicates below.
/// The per-user cap and the expiry window are enforced by
/// [`crate::registry::SessionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLimits {
    /// Ceiling on messages kept in one session (default 50).
    pub max_messages_per_session: u32,
    /// Sessions retained per owner before the oldest are evicted (default 10).
    pub max_sessions_per_user: u32,
    /// Days of inactivity after which a session expires (default 30).
    pub session_expiry_days: u32,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_messages_per_session: 50,
            max_sessions_per_user: 10,
            session_expiry_days: 30,
        }
    }
}

impl SessionLimits {
    /// True once `count` is within [`NEAR_LIMIT_WINDOW`] of the ceiling.
    #[must_use]
    pub fn is_near_limit(&self, count: usize) -> bool {
        count >= self.max_messages_per_session.saturating_sub(NEAR_LIMIT_WINDOW) as usize
    }

    /// True once `count` has reached the ceiling.
    #[must_use]
    pub fn is_at_limit(&self, count: usize) -> bool {
        count >= self.max_messages_per_session as usize
    }

    /// Messages that can still be added before the ceiling. Saturates at
    /// zero, so an overfull or misconfigured session can never go negative.
    #[must_use]
    pub fn messages_until_limit(&self, count: usize) -> u32 {
        (self.max_messages_per_session as usize).saturating_sub(count) as u32
    }

    /// Apply a partial update; unset fields keep their current values.
    pub fn merge(&mut self, update: LimitsUpdate) {
        if let Some(max) = update.max_messages_per_session {
            self.max_messages_per_session = max;
        }
        if let Some(cap) = update.max_sessions_per_user {
            self.max_sessions_per_user = cap;
        }
        if let Some(days) = update.session_expiry_days {
            self.session_expiry_days = days;
        }
    }

    /// Expiry window in milliseconds.
    #[must_use]
    pub fn expiry_ms(&self) -> u64 {
        u64::from(self.session_expiry_days) * 24 * 60 * 60 * 1000
    }
}

/// Partial limit override for runtime reconfiguration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsUpdate {
    pub max_messages_per_session: Option<u32>,
    pub max_sessions_per_user: Option<u32>,
    pub session_expiry_days: Option<u32>,
}

/// Usage snapshot for UI display, serialized with the camelCase keys the
/// embedding frontend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub message_count: u32,
    pub is_near_limit: bool,
    pub is_at_limit: bool,
    pub messages_until_limit: u32,
}

/// Compute usage stats for a session that may not exist yet.
///
/// A missing session reports zero messages, no warnings, and the full
/// configured headroom.
#[must_use]
pub fn storage_stats(session: Option<&ChatSession>, limits: &SessionLimits) -> StorageStats {
    let count = session.map_or(0, ChatSession::message_count);
    StorageStats {
        message_count: count as u32,
        is_near_limit: session.is_some() && limits.is_near_limit(count),
        is_at_limit: session.is_some() && limits.is_at_limit(count),
        messages_until_limit: limits.messages_until_limit(count),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::message::ChatMessage,
        rstest::rstest,
    };

    #[rstest]
    #[case(0, false, false)]
    #[case(44, false, false)]
    #[case(45, true, false)]
    #[case(49, true, false)]
    #[case(50, true, true)]
    #[case(61, true, true)]
    fn default_boundaries(#[case] count: usize, #[case] near: bool, #[case] at: bool) {
        let limits = SessionLimits::default();
        assert_eq!(limits.is_near_limit(count), near, "near at {count}");
        assert_eq!(limits.is_at_limit(count), at, "at ceiling at {count}");
    }

    #[rstest]
    #[case(0, 50)]
    #[case(45, 5)]
    #[case(50, 0)]
    #[case(70, 0)]
    fn headroom_saturates_at_zero(#[case] count: usize, #[case] left: u32) {
        let limits = SessionLimits::default();
        assert_eq!(limits.messages_until_limit(count), left);
    }

    #[test]
    fn zero_ceiling_never_goes_negative() {
        let limits = SessionLimits {
            max_messages_per_session: 0,
            ..SessionLimits::default()
        };
        assert_eq!(limits.messages_until_limit(3), 0);
        assert!(limits.is_at_limit(0));
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let mut limits = SessionLimits::default();
        limits.merge(LimitsUpdate {
            max_messages_per_session: Some(80),
            ..LimitsUpdate::default()
        });
        assert_eq!(limits.max_messages_per_session, 80);
        assert_eq!(limits.max_sessions_per_user, 10);
        assert_eq!(limits.session_expiry_days, 30);
    }

    #[test]
    fn stats_for_missing_session_are_zeroed() {
        let stats = storage_stats(None, &SessionLimits::default());
        assert_eq!(stats.message_count, 0);
        assert!(!stats.is_near_limit);
        assert!(!stats.is_at_limit);
        assert_eq!(stats.messages_until_limit, 50);
    }

    #[test]
    fn stats_reflect_a_live_session() {
        let mut session = ChatSession::new();
        for i in 0..46 {
            session.push(ChatMessage::user(format!("message {i}")));
        }
        let stats = storage_stats(Some(&session), &SessionLimits::default());
        assert_eq!(stats.message_count, 46);
        assert!(stats.is_near_limit);
        assert!(!stats.is_at_limit);
        assert_eq!(stats.messages_until_limit, 4);
    }

    #[test]
    fn stats_serialize_with_camel_case_keys() {
        let stats = storage_stats(None, &SessionLimits::default());
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["messageCount"], 0);
        assert_eq!(json["isNearLimit"], false);
        assert_eq!(json["isAtLimit"], false);
        assert_eq!(json["messagesUntilLimit"], 50);
    }

    #[test]
    fn limits_deserialize_with_defaults_for_missing_fields() {
        let limits: SessionLimits = serde_json::from_str(r#"{"max_messages_per_session": 20}"#).unwrap();
        assert_eq!(limits.max_messages_per_session, 20);
        assert_eq!(limits.max_sessions_per_user, 10);
        assert_eq!(limits.session_expiry_days, 30);
    }
}
