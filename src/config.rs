//! Configuration for maps-scout
//!
//! Everything can come from an optional TOML file; missing sections and keys
//! fall back to the defaults below, so running without a file is fine.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "./maps-scout.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub browser: BrowserConfig,
    pub timing: TimingConfig,
    pub session: SessionConfig,
    pub output: OutputConfig,
}

/// Chrome launch options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub sandbox: bool,
    pub chrome_path: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            sandbox: true,
            chrome_path: None,
            window_width: 1400,
            window_height: 900,
        }
    }
}

/// Waits and upper bounds, all in milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub action_timeout_ms: u64,
    pub navigation_settle_ms: u64,
    pub scroll_into_view_settle_ms: u64,
    pub activation_settle_ms: u64,
    pub panel_settle_ms: u64,
    pub scroll_settle_ms: u64,
    pub pass_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            action_timeout_ms: 10_000,
            navigation_settle_ms: 3_000,
            scroll_into_view_settle_ms: 1_000,
            activation_settle_ms: 2_000,
            panel_settle_ms: 2_000,
            scroll_settle_ms: 3_000,
            pass_delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Consecutive listing failures tolerated before a recovery scroll
    pub max_consecutive_failures: u32,
    /// Consecutive pagination attempts without growth before the run ends
    pub max_no_growth: u32,
    /// Stop once this many records were collected
    pub max_results: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            max_no_growth: 3,
            max_results: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_prefix: "google_maps".to_string(),
        }
    }
}

/// Concrete waits handed to the extraction components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub action_timeout: Duration,
    pub navigation_settle: Duration,
    pub scroll_into_view_settle: Duration,
    pub activation_settle: Duration,
    pub panel_settle: Duration,
    pub scroll_settle: Duration,
    pub pass_delay: Duration,
}

impl Timing {
    /// No settle delays at all. For offline snapshots and tests.
    pub fn immediate() -> Self {
        Self {
            action_timeout: Duration::from_secs(5),
            navigation_settle: Duration::ZERO,
            scroll_into_view_settle: Duration::ZERO,
            activation_settle: Duration::ZERO,
            panel_settle: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            pass_delay: Duration::ZERO,
        }
    }
}

impl From<&TimingConfig> for Timing {
    fn from(cfg: &TimingConfig) -> Self {
        Self {
            action_timeout: Duration::from_millis(cfg.action_timeout_ms),
            navigation_settle: Duration::from_millis(cfg.navigation_settle_ms),
            scroll_into_view_settle: Duration::from_millis(cfg.scroll_into_view_settle_ms),
            activation_settle: Duration::from_millis(cfg.activation_settle_ms),
            panel_settle: Duration::from_millis(cfg.panel_settle_ms),
            scroll_settle: Duration::from_millis(cfg.scroll_settle_ms),
            pass_delay: Duration::from_millis(cfg.pass_delay_ms),
        }
    }
}

impl ScoutConfig {
    /// Load from `path`. A missing default file yields the defaults; an
    /// explicitly requested file that is missing is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScoutConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.max_consecutive_failures == 0 {
            return Err(ConfigError::Invalid {
                field: "session.max_consecutive_failures",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.session.max_no_growth == 0 {
            return Err(ConfigError::Invalid {
                field: "session.max_no_growth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.session.max_results == Some(0) {
            return Err(ConfigError::Invalid {
                field: "session.max_results",
                reason: "must be at least 1 when set".to_string(),
            });
        }
        if self.timing.action_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timing.action_timeout_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.output.file_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "output.file_prefix",
                reason: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn timing(&self) -> Timing {
        Timing::from(&self.timing)
    }
}
