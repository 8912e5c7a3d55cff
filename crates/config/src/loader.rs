//! Config file discovery, parsing, and persistence.

use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    tracing::{debug, warn},
};

use crate::schema::ConfabConfig;

/// File names probed during discovery, in preference order.
const CONFIG_FILENAMES: &[&str] = &["confab.toml", "confab.json"];

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "confab")
}

/// Parse the config file at `path`. The format follows the extension
/// (TOML or JSON); a missing extension is treated as TOML.
pub fn load_config(path: &Path) -> anyhow::Result<ConfabConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&raw, path)
}

/// Locate and load the active config, falling back to defaults.
///
/// Probes `./confab.{toml,json}` first, then the user config directory.
/// A file that exists but fails to parse is logged and ignored, so a typo
/// never takes the assistant down.
#[must_use]
pub fn discover_and_load() -> ConfabConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return ConfabConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        ConfabConfig::default()
    })
}

/// First config file that exists, probing the working directory before the
/// user config directory.
#[must_use]
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES
        .iter()
        .copied()
        .map(PathBuf::from)
        .find(|p| p.exists());
    if local.is_some() {
        return local;
    }

    let dirs = project_dirs()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dirs.config_dir().join(name))
        .find(|p| p.exists())
}

/// Per-user config directory (`~/.config/confab` on Linux).
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().to_path_buf())
}

/// Per-user data directory (`~/.local/share/confab` on Linux).
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.data_dir().to_path_buf())
}

/// Directory session files live in: the configured override when set,
/// otherwise `sessions/` under the platform data dir.
#[must_use]
pub fn session_dir(config: &ConfabConfig) -> PathBuf {
    if let Some(dir) = &config.storage.dir {
        return dir.clone();
    }
    data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sessions")
}

/// Path of the existing config file, or the default TOML location when
/// none exists yet.
#[must_use]
pub fn find_or_default_config_path() -> PathBuf {
    find_config_file().unwrap_or_else(|| {
        config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("confab.toml")
    })
}

/// Write `config` as pretty TOML to the default location, creating parent
/// directories as needed. Returns the path written.
pub fn save_config(config: &ConfabConfig) -> anyhow::Result<PathBuf> {
    let path = find_or_default_config_path();
    save_config_to(config, &path)?;
    Ok(path)
}

/// Write `config` as pretty TOML to an explicit path.
pub fn save_config_to(config: &ConfabConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = toml::to_string_pretty(config).context("serialize config")?;
    std::fs::write(path, rendered)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ConfabConfig> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(raw)?),
        Some("toml") | None => Ok(toml::from_str(raw)?),
        Some(other) => anyhow::bail!("unsupported config format: .{other}"),
    }
}
