//! Daemon and vertex configuration loaded from TOML

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub window: WindowConfig,
    pub watermark: WatermarkConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WindowConfig {
    /// Length of each fixed window in milliseconds
    pub length_ms: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { length_ms: 60_000 }
    }
}

impl WindowConfig {
    pub fn length(&self) -> Duration {
        Duration::from_millis(self.length_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Deadline for building the vertex fetcher map
    pub build_timeout_ms: u64,
    /// A processor whose last heartbeat is older than this is no longer live
    pub heartbeat_timeout_secs: u64,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            build_timeout_ms: 30_000,
            heartbeat_timeout_secs: 10,
        }
    }
}

impl WatermarkConfig {
    pub fn build_timeout(&self) -> Duration {
        Duration::from_millis(self.build_timeout_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.window.length_ms == 0 {
            return Err(Error::Config("window.length_ms must be greater than zero".into()));
        }
        if self.watermark.build_timeout_ms == 0 {
            return Err(Error::Config(
                "watermark.build_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
