//! Configuration loading, validation, and persistence for the assistant.
//!
//! Config files: `confab.toml` or `confab.json`,
//! searched in `./` then `~/.config/confab/`.

pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        config_dir, data_dir, discover_and_load, find_or_default_config_path, load_config,
        save_config, save_config_to, session_dir,
    },
    schema::{ChatConfig, ConfabConfig, StorageConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_toml_str},
};
