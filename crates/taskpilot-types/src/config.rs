//! Global configuration types for TaskPilot.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls
//! process-level behaviour. User-facing assistant options live in
//! [`crate::settings::AssistantSettings`] instead.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration loaded from `~/.taskpilot/config.toml`.
/// All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Artificial latency of the local simulator, in milliseconds.
    #[serde(default = "default_simulator_delay_ms")]
    pub simulator_delay_ms: u64,

    /// HTTP timeout for remote model calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of tasks serialized into the prompt context.
    #[serde(default = "default_max_context_tasks")]
    pub max_context_tasks: usize,

    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,
}

fn default_simulator_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_context_tasks() -> usize {
    50
}

impl GlobalConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            simulator_delay_ms: default_simulator_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_context_tasks: default_max_context_tasks(),
            log_json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.simulator_delay_ms, 1000);
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.max_context_tasks, 50);
        assert!(!config.log_json);
    }

    #[test]
    fn test_global_config_deserialize_with_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn test_global_config_deserialize_with_values() {
        let toml_str = r#"
simulator_delay_ms = 0
max_context_tasks = 10
log_json = true
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.simulator_delay_ms, 0);
        assert_eq!(config.max_context_tasks, 10);
        assert_eq!(config.request_timeout_secs, 120);
        assert!(config.log_json);
    }
}
