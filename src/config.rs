//! Configuration file support.
//!
//! Settings are read from an optional TOML file and overridden by
//! `FEEDWATCH_*` environment variables (nested keys use `__`, e.g.
//! `FEEDWATCH_PRESETS__GARDEN__API_KEY`). Command line flags take
//! precedence over both.
//!
//! ```toml
//! host = "https://api.thingspeak.com"
//! timeout = "10s"
//! results = 50
//! interval_hours = 3
//!
//! [presets.garden]
//! channel_id = "123456"
//! api_key = "XXXXXXXXXXXXXXXX"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

/// A named channel id / read key pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelPreset {
    pub channel_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Values loaded from the configuration file and environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub host: Option<String>,
    /// Request timeout as a duration string, e.g. "10s".
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub results: Option<u32>,
    #[serde(default)]
    pub interval_hours: Option<f64>,
    #[serde(default)]
    pub presets: BTreeMap<String, ChannelPreset>,
}

impl Settings {
    /// Load settings from `path` (optional unless `required`) and the
    /// environment.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        Self::builder(path, required)
            .add_source(
                Environment::with_prefix("FEEDWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(|config| config.try_deserialize())
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    /// Parse settings from TOML text, without environment overrides.
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    fn builder(path: &Path, required: bool) -> config::ConfigBuilder<config::builder::DefaultState> {
        Config::builder().add_source(File::from(path).format(FileFormat::Toml).required(required))
    }

    /// Look up a preset by name.
    pub fn preset(&self, name: &str) -> Option<&ChannelPreset> {
        self.presets.get(name)
    }

    /// Preset names, sorted.
    pub fn preset_names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }
}
