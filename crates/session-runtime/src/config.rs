//! # Runtime Configuration
//!
//! Session settings come from, in increasing precedence:
//!
//! 1. `SessionConfig` defaults
//! 2. `PROCTOR_*` environment variables, or a JSON config file when given
//! 3. command-line overrides

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use proctor_session::SessionConfig;

/// Command-line overrides applied on top of the loaded config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub violation_threshold: Option<u32>,
    pub monitor_interval_secs: Option<u64>,
}

/// Load the session config and apply overrides.
///
/// A config file replaces the environment layer entirely; fields missing
/// from the file take their defaults.
pub fn load_session_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<SessionConfig> {
    let mut config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: SessionConfig = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            info!(path = %path.display(), "Loaded session config from file");
            config
        }
        None => SessionConfig::from_env(),
    };

    if let Some(threshold) = overrides.violation_threshold {
        config.violation_threshold = threshold;
    }
    if let Some(interval) = overrides.monitor_interval_secs {
        config.monitor_interval_secs = interval;
    }

    config.validate().context("Invalid session config")?;
    Ok(config)
}
