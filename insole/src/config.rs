//! Runtime configuration
//!
//! Loaded from (lowest to highest priority):
//! - built-in defaults
//! - `./insole.toml`, or the file given with `--config`
//! - `INSOLE_SENSOR_HOST` / `INSOLE_SENSOR_PORT` environment variables
//!
//! Command-line flags are applied on top by `main`.

use anyhow::{bail, Context, Result};
use insole_common::{ArchThresholds, PaperSize};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::heatmap::MAX_SCALE;

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "insole.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub sensor: SensorConfig,
    pub classifier: ArchThresholds,
    pub heatmap: HeatmapConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorConfig {
    pub host: String,
    pub port: u16,
    /// Connect and read deadline in milliseconds
    pub timeout_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            host: "192.168.4.1".to_string(),
            port: 5000,
            timeout_ms: 3000,
        }
    }
}

impl SensorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Output pixels per sensor cell along each axis
    pub scale: u32,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self { scale: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub enabled: bool,
    pub output_dir: PathBuf,
    pub paper: PaperSize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: PathBuf::from("reports"),
            paper: PaperSize::A4,
        }
    }
}

impl AppConfig {
    /// Load config from the given file, or `./insole.toml` if present, then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Environment variables override the file
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup("INSOLE_SENSOR_HOST") {
            self.sensor.host = host;
        }
        if let Some(port) = lookup("INSOLE_SENSOR_PORT") {
            self.sensor.port = port
                .parse()
                .with_context(|| format!("INSOLE_SENSOR_PORT is not a valid port: {:?}", port))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let thresholds = &self.classifier;
        if !(thresholds.high_below.is_finite() && thresholds.flat_above.is_finite()) {
            bail!("classifier thresholds must be finite numbers");
        }
        if thresholds.high_below > thresholds.flat_above {
            bail!(
                "classifier.high_below ({}) must not exceed classifier.flat_above ({})",
                thresholds.high_below,
                thresholds.flat_above
            );
        }
        if self.sensor.timeout_ms == 0 {
            bail!("sensor.timeout_ms must be greater than zero");
        }
        if !(1..=MAX_SCALE).contains(&self.heatmap.scale) {
            bail!("heatmap.scale must be between 1 and {}", MAX_SCALE);
        }
        Ok(())
    }
}
