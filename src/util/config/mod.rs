//! tickflow configuration
//!
//! Configuration is written in RON. Every field has a default, so a partial
//! file only overrides what it names.
//!
//! # Example
//!
//! ```text
//! (
//!     frames: 240,
//!     dt: 0.016,
//!     jitter: 0.004,
//!     host: (max_delta: Some(0.1)),
//! )
//! ```
//!
//! # Usage
//!
//! ```rust
//! use tickflow::util::config::parse_config;
//!
//! let config = parse_config("(frames: 10)").unwrap();
//! assert_eq!(config.frames, 10);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Host tick source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HostConfig {
    /// Upper bound applied to each frame's elapsed time, if any
    #[serde(default)]
    pub max_delta: Option<f32>,
}

/// Settings for the demo frame loop driven by the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Number of frames to simulate
    #[serde(default = "default_frames")]
    pub frames: u64,
    /// Nominal elapsed time per frame, in seconds
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Maximum random deviation added to each frame's dt
    #[serde(default)]
    pub jitter: f32,
    /// Seed for the jitter generator
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Isolate subscriber failures instead of aborting the frame
    #[serde(default)]
    pub isolate: bool,
    /// Host settings
    #[serde(default)]
    pub host: HostConfig,
}

fn default_frames() -> u64 {
    300
}

fn default_dt() -> f32 {
    1.0 / 60.0
}

fn default_seed() -> u64 {
    0x5eed
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            dt: default_dt(),
            jitter: 0.0,
            seed: default_seed(),
            isolate: false,
            host: HostConfig::default(),
        }
    }
}

impl DemoConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt.is_finite() && self.dt >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "dt must be finite and >= 0, got {}",
                self.dt
            )));
        }
        if !(self.jitter.is_finite() && self.jitter >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "jitter must be finite and >= 0, got {}",
                self.jitter
            )));
        }
        if let Some(max) = self.host.max_delta {
            if !(max.is_finite() && max > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "host.max_delta must be finite and > 0, got {}",
                    max
                )));
            }
        }
        Ok(())
    }

    /// Render as pretty RON.
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Parse and validate a RON document.
pub fn parse_config(source: &str) -> Result<DemoConfig, ConfigError> {
    let config: DemoConfig = ron::from_str(source)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a RON config file.
pub fn load_config(path: &Path) -> Result<DemoConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("config serialize error: {0}")]
    Serialize(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}
