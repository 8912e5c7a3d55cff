//! Config schema types for the assistant widget.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use confab_sessions::SessionLimits;

/// Root configuration.
///
/// Every section and field has a default, so a missing or partial config
/// file always yields a runnable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfabConfig {
    pub session: SessionLimits,
    pub chat: ChatConfig,
    pub storage: StorageConfig,
}

/// Assistant behavior overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Reply shown when the responder fails. `None` uses the built-in text.
    pub fallback_reply: Option<String>,
    /// Page route assumed when the widget has not reported one.
    pub default_page: Option<String>,
}

/// Where session files live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Session directory. `None` resolves to the platform data dir.
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: ConfabConfig = toml::from_str("").unwrap();
        assert_eq!(config.session.max_messages_per_session, 50);
        assert!(config.chat.fallback_reply.is_none());
        assert!(config.storage.dir.is_none());
    }

    #[test]
    fn partial_sections_keep_defaults_elsewhere() {
        let config: ConfabConfig = toml::from_str(
            r#"
            [session]
            max_messages_per_session = 80

            [chat]
            fallback_reply = "Be right back."
            "#,
        )
        .unwrap();
        assert_eq!(config.session.max_messages_per_session, 80);
        assert_eq!(config.session.max_sessions_per_user, 10);
        assert_eq!(config.chat.fallback_reply.as_deref(), Some("Be right back."));
    }

    #[test]
    fn roundtrips_through_toml() {
        let mut config = ConfabConfig::default();
        config.storage.dir = Some(PathBuf::from("/tmp/confab-sessions"));
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfabConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.storage.dir, config.storage.dir);
        assert_eq!(
            parsed.session.session_expiry_days,
            config.session.session_expiry_days
        );
    }
}
