use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::state::data_series::MAX_SIGNAL_SAMPLES;

/// Runtime settings, read from an optional TOML file and then overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: SocketAddr,
    pub max_signal_samples: usize,
    pub request_timeout_ms: u64,
    /// Rate assigned to series created without one (Hz).
    pub default_fsample: f64,
    /// Snapshot file for the file store. `None` keeps everything in memory.
    pub store_path: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            max_signal_samples: MAX_SIGNAL_SAMPLES,
            request_timeout_ms: 5000,
            default_fsample: 1000.0,
            store_path: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        let config: Config = toml::from_str(text).map_err(|e| format!("Invalid config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read config {}: {e}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_signal_samples == 0 {
            return Err("max_signal_samples must be positive".to_string());
        }
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms must be positive".to_string());
        }
        if !self.default_fsample.is_finite() || self.default_fsample <= 0.0 {
            return Err(format!(
                "default_fsample must be a positive rate, got {}",
                self.default_fsample
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
