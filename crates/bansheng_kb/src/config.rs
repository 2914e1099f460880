//! Knowledge base configuration
//!
//! Configuration lives in `$XDG_CONFIG_HOME/bansheng/config.toml`.
//! Every field has a default, so a missing file is equivalent to an empty one.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;

/// Application directory name under the XDG config/data roots
pub const APP_DIR: &str = "bansheng";
const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "knowledge.db";

/// Store settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Database path; defaults to `$XDG_DATA_HOME/bansheng/knowledge.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreSettings {
    pub fn effective_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_db_path)
    }
}

/// Per-kind result limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_food_limit")]
    pub food_limit: usize,

    #[serde(default = "default_symptom_limit")]
    pub symptom_limit: usize,

    #[serde(default = "default_emotional_limit")]
    pub emotional_limit: usize,

    #[serde(default = "default_emergency_limit")]
    pub emergency_limit: usize,
}

fn default_food_limit() -> usize {
    5
}

fn default_symptom_limit() -> usize {
    3
}

fn default_emotional_limit() -> usize {
    3
}

fn default_emergency_limit() -> usize {
    1
}

const MIN_LIMIT: usize = 1;
const MAX_LIMIT: usize = 20;

impl SearchSettings {
    pub fn effective_food_limit(&self) -> usize {
        self.food_limit.clamp(MIN_LIMIT, MAX_LIMIT)
    }

    pub fn effective_symptom_limit(&self) -> usize {
        self.symptom_limit.clamp(MIN_LIMIT, MAX_LIMIT)
    }

    pub fn effective_emotional_limit(&self) -> usize {
        self.emotional_limit.clamp(MIN_LIMIT, MAX_LIMIT)
    }

    pub fn effective_emergency_limit(&self) -> usize {
        self.emergency_limit.clamp(MIN_LIMIT, MAX_LIMIT)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            food_limit: default_food_limit(),
            symptom_limit: default_symptom_limit(),
            emotional_limit: default_emotional_limit(),
            emergency_limit: default_emergency_limit(),
        }
    }
}

/// Seed source settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedSettings {
    /// Directory with foods.json, symptoms.json, emotional.json and
    /// emergencies.json replacing the bundled release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KbConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub seed: SeedSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl KbConfig {
    /// Load from the default location, falling back to defaults on any problem
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring unreadable config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load from an explicit path; errors are reported to the caller
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// Get the default knowledge database path
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join(APP_DIR)
        .join(DB_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = KbConfig::parse("").unwrap();
        assert_eq!(config, KbConfig::default());
        assert_eq!(config.search.effective_food_limit(), 5);
        assert_eq!(config.search.effective_emergency_limit(), 1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config() {
        let config = KbConfig::parse(
            r#"
            [search]
            food_limit = 8

            [store]
            path = "/tmp/kb.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.search.food_limit, 8);
        assert_eq!(config.search.symptom_limit, 3);
        assert_eq!(config.store.effective_path(), PathBuf::from("/tmp/kb.db"));
    }

    #[test]
    fn test_limits_are_clamped() {
        let config = KbConfig::parse("[search]\nfood_limit = 0\nsymptom_limit = 500\n").unwrap();
        assert_eq!(config.search.effective_food_limit(), 1);
        assert_eq!(config.search.effective_symptom_limit(), 20);
    }

    #[test]
    fn test_malformed_config_is_error() {
        assert!(KbConfig::parse("[search\nfood_limit = ").is_err());
    }

    #[test]
    fn test_config_serializes_sections() {
        let toml_str = KbConfig::default().to_toml();
        assert!(toml_str.contains("[search]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_default_db_path_is_under_app_dir() {
        let path = default_db_path();
        assert!(path.ends_with("bansheng/knowledge.db"));
    }
}
