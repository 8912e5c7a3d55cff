//! Config validation: diagnostics for syntax errors, misspelled fields,
//! type mismatches, and limit values that would behave surprisingly at
//! runtime.

use std::path::{Path, PathBuf};

use confab_sessions::limits::NEAR_LIMIT_WINDOW;

use crate::schema::ConfabConfig;

/// How serious a [`Diagnostic`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// One finding about a config file.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// One of "syntax", "unknown-field", "type-error", "limits", "chat".
    pub category: &'static str,
    /// Dotted field path, e.g. "session.max_messages_per_session".
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Everything validation found, plus the file it looked at.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }
}

// ── Known keys for typo detection ───────────────────────────────────────────

/// Section and field names mirroring every field in `schema.rs`.
const KNOWN_SECTIONS: &[(&str, &[&str])] = &[
    (
        "session",
        &[
            "max_messages_per_session",
            "max_sessions_per_user",
            "session_expiry_days",
        ],
    ),
    ("chat", &["fallback_reply", "default_page"]),
    ("storage", &["dir"]),
];

/// Flag top-level sections and section fields the schema does not know.
fn check_unknown_fields(value: &toml::Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(table) = value.as_table() else { return };
    for (section, section_value) in table {
        let Some((_, fields)) = KNOWN_SECTIONS.iter().find(|(name, _)| name == section) else {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "unknown-field",
                section.clone(),
                format!("unknown section [{section}]"),
            ));
            continue;
        };
        let Some(section_table) = section_value.as_table() else {
            continue;
        };
        for key in section_table.keys() {
            if !fields.contains(&key.as_str()) {
                diagnostics.push(Diagnostic::new(
                    Severity::Warning,
                    "unknown-field",
                    format!("{section}.{key}"),
                    format!("unknown field \"{key}\" in [{section}]"),
                ));
            }
        }
    }
}

// ── Validation passes ───────────────────────────────────────────────────────

/// Validate the config file at `path`, or whatever discovery finds when
/// `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "syntax",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let mut result = validate_toml_str(&content);
            result.config_path = Some(actual_path.clone());
            result
        }
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string without touching the file system.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Syntax: parse raw TOML
    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("TOML syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        }
    };

    // 2. Unknown fields: walk the TOML tree against the schema
    check_unknown_fields(&toml_value, &mut diagnostics);

    // 3. Type check: attempt full deserialization
    match toml::from_str::<ConfabConfig>(toml_str) {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "type-error",
                "",
                format!("type error: {e}"),
            ));
        }
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_semantic_warnings(config: &ConfabConfig, diagnostics: &mut Vec<Diagnostic>) {
    let max = config.session.max_messages_per_session;

    if max == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "limits",
            "session.max_messages_per_session",
            "a ceiling of 0 means sessions cannot hold any messages",
        ));
    } else if max <= NEAR_LIMIT_WINDOW + 1 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "limits",
            "session.max_messages_per_session",
            format!(
                "a ceiling of {max} leaves no room for compaction; the limit will not be enforced"
            ),
        ));
    }

    if max > 0 && max <= NEAR_LIMIT_WINDOW {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "limits",
            "session.max_messages_per_session",
            format!(
                "a ceiling of {max} is within the warning window of {NEAR_LIMIT_WINDOW}; \
                 near-limit notices will fire from the first message"
            ),
        ));
    }

    if config.session.max_sessions_per_user == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "limits",
            "session.max_sessions_per_user",
            "a cap of 0 evicts every session as soon as it is indexed",
        ));
    }

    if config.session.session_expiry_days == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "limits",
            "session.session_expiry_days",
            "an expiry of 0 days makes every idle session expire immediately",
        ));
    }

    if let Some(reply) = &config.chat.fallback_reply {
        if reply.trim().is_empty() {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "chat",
                "chat.fallback_reply",
                "fallback reply is blank; users will see an empty bubble on errors",
            ));
        }
    }
}
