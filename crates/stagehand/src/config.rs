//! Minimal configuration for the bridge.
//!
//! One knob today: the per-batch command ceiling. Loaded from an optional
//! TOML file with an environment-variable override, defaults otherwise.
//!
//! ```toml
//! [batch]
//! max_commands = 50
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default per-batch command ceiling when unconfigured.
pub const DEFAULT_MAX_COMMANDS: usize = 25;

/// Absolute ceiling; configured values are clamped to 1..=this.
pub const ABSOLUTE_MAX_COMMANDS: usize = 100;

/// Environment override for the batch ceiling.
pub const MAX_COMMANDS_ENV: &str = "STAGEHAND_MAX_COMMANDS";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid {var} value {value:?}: expected a positive integer")]
    EnvValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BatchSection {
    max_commands: Option<usize>,
}

/// Bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    batch: BatchSection,
}

impl BridgeConfig {
    /// Load from a TOML file if it exists, then apply the environment
    /// override. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
                path: path.display().to_string(),
                source,
            })?;
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = std::env::var(MAX_COMMANDS_ENV) {
            let parsed = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::EnvValue {
                    var: MAX_COMMANDS_ENV,
                    value: raw,
                })?;
            self.batch.max_commands = Some(parsed);
        }
        Ok(())
    }

    /// Construct with an explicit batch ceiling (clamped on read).
    pub fn with_max_commands(max: usize) -> Self {
        Self {
            batch: BatchSection {
                max_commands: Some(max),
            },
        }
    }

    /// Effective per-batch command ceiling: configured value clamped to
    /// 1..=ABSOLUTE_MAX_COMMANDS, or the default when unset.
    pub fn max_commands_per_batch(&self) -> usize {
        self.batch
            .max_commands
            .unwrap_or(DEFAULT_MAX_COMMANDS)
            .clamp(1, ABSOLUTE_MAX_COMMANDS)
    }
}
