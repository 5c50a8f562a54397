//! # Application Configuration
//!
//! Settings are read once at startup from a YAML file (default
//! `health_tracker.yaml`, overridable through `HEALTH_TRACKER_CONFIG`). A
//! missing file means defaults. The device tier can additionally be forced
//! with `HEALTH_TRACKER_TIER`.
//!
//! ```yaml
//! bind_address: "127.0.0.1:3000"
//! allowed_origin: "http://localhost:8080"
//! device_tier: constrained
//! store:
//!   kind: sqlite
//!   database_url: "sqlite:health_tracker.db"
//!   capacity_bytes: 5242880
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::storage::DEFAULT_DATABASE_URL;

pub const CONFIG_PATH_ENV: &str = "HEALTH_TRACKER_CONFIG";
pub const TIER_ENV: &str = "HEALTH_TRACKER_TIER";
pub const DEFAULT_CONFIG_PATH: &str = "health_tracker.yaml";

const MIB: usize = 1024 * 1024;

/// Device capability class. Selects quota and retention constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    /// Memory-constrained devices: smaller quota, earlier warnings, shorter history
    Constrained,
    #[default]
    Standard,
}

impl DeviceTier {
    pub fn quota_config(self) -> QuotaConfig {
        match self {
            DeviceTier::Constrained => QuotaConfig {
                quota_bytes: 2 * MIB,
                near_quota_threshold: 0.7,
                max_history_days: 30,
                max_import_bytes: MIB,
            },
            DeviceTier::Standard => QuotaConfig {
                quota_bytes: 5 * MIB,
                near_quota_threshold: 0.9,
                max_history_days: 90,
                max_import_bytes: 5 * MIB,
            },
        }
    }
}

impl fmt::Display for DeviceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTier::Constrained => f.write_str("constrained"),
            DeviceTier::Standard => f.write_str("standard"),
        }
    }
}

impl FromStr for DeviceTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "constrained" => Ok(DeviceTier::Constrained),
            "standard" => Ok(DeviceTier::Standard),
            other => Err(anyhow::anyhow!("Invalid device tier: {}", other)),
        }
    }
}

/// Capacity policy of the storage manager for one tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaConfig {
    /// Assumed namespace capacity in characters
    pub quota_bytes: usize,
    /// Fraction of the quota above which storage counts as nearly full
    pub near_quota_threshold: f64,
    /// Calendar dates of history kept by cleanup
    pub max_history_days: usize,
    /// Largest import file accepted
    pub max_import_bytes: usize,
}

/// Which namespace backend to open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Sqlite {
        #[serde(default = "default_database_url")]
        database_url: String,
        #[serde(default)]
        capacity_bytes: Option<usize>,
    },
    Memory {
        #[serde(default)]
        capacity_bytes: Option<usize>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            database_url: default_database_url(),
            capacity_bytes: None,
        }
    }
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_allowed_origin() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Origin allowed by CORS (the UI)
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
    #[serde(default)]
    pub device_tier: DeviceTier,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            allowed_origin: default_allowed_origin(),
            device_tier: DeviceTier::default(),
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("⚙️ No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let yaml_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: AppConfig = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        info!("⚙️ Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from the environment-selected path and apply environment overrides
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load_from(Path::new(&path))?;

        if let Ok(tier) = std::env::var(TIER_ENV) {
            config.device_tier = tier.parse()?;
            info!("⚙️ Device tier overridden by {}: {}", TIER_ENV, config.device_tier);
        }

        Ok(config)
    }

    pub fn quota(&self) -> QuotaConfig {
        self.device_tier.quota_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tier_constants() {
        let constrained = DeviceTier::Constrained.quota_config();
        assert_eq!(constrained.quota_bytes, 2 * 1024 * 1024);
        assert_eq!(constrained.near_quota_threshold, 0.7);
        assert_eq!(constrained.max_history_days, 30);

        let standard = DeviceTier::Standard.quota_config();
        assert_eq!(standard.quota_bytes, 5 * 1024 * 1024);
        assert_eq!(standard.near_quota_threshold, 0.9);
        assert_eq!(standard.max_history_days, 90);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&temp_dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("health_tracker.yaml");
        fs::write(
            &path,
            "device_tier: constrained\nstore:\n  kind: memory\n  capacity_bytes: 1024\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.device_tier, DeviceTier::Constrained);
        assert_eq!(config.store, StoreConfig::Memory { capacity_bytes: Some(1024) });
        assert_eq!(config.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.yaml");
        fs::write(&path, "device_tier: enormous\n").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("Constrained".parse::<DeviceTier>().unwrap(), DeviceTier::Constrained);
        assert_eq!(" standard ".parse::<DeviceTier>().unwrap(), DeviceTier::Standard);
        assert!("huge".parse::<DeviceTier>().is_err());
    }
}
