//! Global configuration and data directory resolution.
//!
//! `config.toml` in the data directory tunes runtime behavior (simulator
//! latency, HTTP timeout, context size). A missing or malformed file falls
//! back to defaults; it never stops the CLI from starting.

use std::path::{Path, PathBuf};

use taskpilot_types::config::GlobalConfig;

pub const DATA_DIR_ENV: &str = "TASKPILOT_DATA_DIR";

/// Overrides the stored API key for the process; never persisted.
pub const API_KEY_ENV: &str = "TASKPILOT_API_KEY";

/// The API key from `TASKPILOT_API_KEY`, if set and non-blank.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `TASKPILOT_DATA_DIR` environment variable
/// 2. `~/.taskpilot`
/// 3. `./.taskpilot`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".taskpilot");
    }

    PathBuf::from(".taskpilot")
}

/// Load `{data_dir}/config.toml`, falling back to [`GlobalConfig::default()`].
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}
