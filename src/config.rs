use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::tracker::DopplerReference;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub radio: RadioConfig,
    #[serde(default)]
    pub gimbal: GimbalConfig,
    pub tle_file: Option<PathBuf>,
    #[serde(default)]
    pub simulate: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_latitude")]
    pub latitude_deg: f64,
    #[serde(default = "default_longitude")]
    pub longitude_deg: f64,
    #[serde(default = "default_altitude")]
    pub altitude_m: f64,
    pub start_time: Option<DateTime<Utc>>,
}

fn default_latitude() -> f64 {
    30.0
}

fn default_longitude() -> f64 {
    -110.0
}

fn default_altitude() -> f64 {
    700.0
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            latitude_deg: default_latitude(),
            longitude_deg: default_longitude(),
            altitude_m: default_altitude(),
            start_time: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_tick", deserialize_with = "deserialize_duration")]
    pub tick: Duration,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_tick() -> Duration {
    Duration::from_millis(50)
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            tick: default_tick(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RadioConfig {
    #[serde(default = "default_vhf")]
    pub vhf_hz: f64,
    #[serde(default = "default_uhf")]
    pub uhf_hz: f64,
}

fn default_vhf() -> f64 {
    DopplerReference::default().vhf_hz
}

fn default_uhf() -> f64 {
    DopplerReference::default().uhf_hz
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            vhf_hz: default_vhf(),
            uhf_hz: default_uhf(),
        }
    }
}

impl RadioConfig {
    pub fn doppler(&self) -> DopplerReference {
        DopplerReference {
            vhf_hz: self.vhf_hz,
            uhf_hz: self.uhf_hz,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GimbalConfig {
    #[serde(default = "default_limits_file")]
    pub limits_file: PathBuf,
    #[serde(default = "default_channels")]
    pub channels: [u8; 2],
}

fn default_limits_file() -> PathBuf {
    PathBuf::from("servo-limits.yaml")
}

fn default_channels() -> [u8; 2] {
    [0, 1]
}

impl Default for GimbalConfig {
    fn default() -> Self {
        Self {
            limits_file: default_limits_file(),
            channels: default_channels(),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}
