//! Configuration file support.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/wearable-metrics/config.toml`.

use crate::adapters::{GarminExportAdapter, MockAdapter, WearableAdapter};
use crate::error::{Result, WearableError};
use crate::overview::{DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub wearable: WearableConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which adapter to install and how much history to load
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WearableConfig {
    #[serde(default)]
    pub source: AdapterKind,

    /// Garmin Connect export, required for `garmin_export`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_path: Option<PathBuf>,

    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

impl Default for WearableConfig {
    fn default() -> Self {
        Self {
            source: AdapterKind::default(),
            export_path: None,
            window_days: default_window_days(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    #[default]
    Mock,
    GarminExport,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| {
            WearableError::Config("could not determine config directory".to_string())
        })?;
        Ok(base.join("wearable-metrics").join("config.toml"))
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| WearableError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.wearable.window_days) {
            return Err(WearableError::Config(format!(
                "wearable.window_days must be between 1 and {}",
                MAX_WINDOW_DAYS
            )));
        }
        if self.wearable.source == AdapterKind::GarminExport && self.wearable.export_path.is_none()
        {
            return Err(WearableError::Config(
                "wearable.export_path is required for garmin_export".to_string(),
            ));
        }
        Ok(())
    }

    /// Construct the configured adapter
    pub fn build_adapter(&self) -> Result<Arc<dyn WearableAdapter>> {
        self.validate()?;
        match self.wearable.source {
            AdapterKind::Mock => Ok(Arc::new(MockAdapter::new())),
            AdapterKind::GarminExport => {
                let path = self.wearable.export_path.as_deref().ok_or_else(|| {
                    WearableError::Config("wearable.export_path is not set".to_string())
                })?;
                Ok(Arc::new(GarminExportAdapter::from_path(path)?))
            }
        }
    }
}
