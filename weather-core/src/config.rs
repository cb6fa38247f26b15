use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::provider::open_meteo::{DEFAULT_FORECAST_BASE_URL, DEFAULT_GEOCODING_BASE_URL};

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// geocoding_base_url = "https://geocoding-api.open-meteo.com"
/// forecast_base_url = "https://api.open-meteo.com"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the geocoding service; `/v1/search` is appended.
    pub geocoding_base_url: String,

    /// Base URL of the forecast service; `/v1/forecast` is appended.
    pub forecast_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoding_base_url: DEFAULT_GEOCODING_BASE_URL.to_string(),
            forecast_base_url: DEFAULT_FORECAST_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, use Open-Meteo.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "classy-weather", "classy-weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Replace base URLs with any command-line overrides.
    pub fn with_overrides(
        mut self,
        geocoding_base_url: Option<String>,
        forecast_base_url: Option<String>,
    ) -> Self {
        if let Some(url) = geocoding_base_url {
            self.geocoding_base_url = url;
        }
        if let Some(url) = forecast_base_url {
            self.forecast_base_url = url;
        }
        self
    }
}
