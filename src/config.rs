//! Orchestrator configuration.
//!
//! Options are usually set programmatically through
//! [`AppBuilder`](crate::app::AppBuilder); deployments that keep timeouts in
//! a config file can load an [`AppOptions`] from TOML instead.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default start/stop phase deadline, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Deadlines applied to the start and stop phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppOptions {
    /// Deadline for the start phase, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub start_timeout_secs: u64,

    /// Deadline for the stop phase, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub stop_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            start_timeout_secs: DEFAULT_TIMEOUT_SECS,
            stop_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AppOptions {
    /// Load options from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse options file {}", path.display()))
    }

    /// Start-phase deadline as a [`Duration`].
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    /// Stop-phase deadline as a [`Duration`].
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}
