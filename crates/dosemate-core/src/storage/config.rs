//! TOML-based engine configuration.
//!
//! Stores the periods and windows of the two background tasks:
//! - Materializer period and lookahead window
//! - Dispatcher period
//! - Missed-dose grace window
//! - Default snooze duration
//!
//! Configuration is stored at `~/.config/dosemate/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::data_dir;

/// Background-task timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Period of the schedule materializer / missed-dose sweep, seconds.
    #[serde(default = "default_materializer_period")]
    pub materializer_period_secs: u64,
    /// Period of the due-reminder dispatcher, seconds.
    #[serde(default = "default_dispatch_period")]
    pub dispatch_period_secs: u64,
    /// How far ahead the materializer creates reminders, minutes.
    #[serde(default = "default_lookahead")]
    pub lookahead_min: u32,
    /// How long a PENDING reminder may stay unresolved before it is
    /// considered missed, minutes.
    #[serde(default = "default_grace")]
    pub grace_min: u32,
    /// Snooze duration when the caller does not specify one, minutes.
    #[serde(default = "default_snooze")]
    pub default_snooze_min: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dosemate/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_materializer_period() -> u64 {
    60
}
fn default_dispatch_period() -> u64 {
    30
}
fn default_lookahead() -> u32 {
    5
}
fn default_grace() -> u32 {
    30
}
fn default_snooze() -> u32 {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            materializer_period_secs: default_materializer_period(),
            dispatch_period_secs: default_dispatch_period(),
            lookahead_min: default_lookahead(),
            grace_min: default_grace(),
            default_snooze_min: default_snooze(),
        }
    }
}

impl EngineConfig {
    pub fn materializer_period(&self) -> Duration {
        Duration::from_secs(self.materializer_period_secs)
    }

    pub fn dispatch_period(&self) -> Duration {
        Duration::from_secs(self.dispatch_period_secs)
    }
}

impl Config {
    fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
