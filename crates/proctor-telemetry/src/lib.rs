//! # Proctor Telemetry
//!
//! Logging and metrics setup for hosts running proctored sessions.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with pretty or JSON output
//! - **Metrics**: Prometheus text exposition of the default registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use proctor_telemetry::{TelemetryConfig, init_telemetry};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _telemetry = init_telemetry(TelemetryConfig::from_env())?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | unset | Log filter, wins over `PROCTOR_LOG_LEVEL` |
//! | `PROCTOR_LOG_LEVEL` | `info` | Log filter |
//! | `PROCTOR_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `PROCTOR_CONSOLE_OUTPUT` | `true` | Write logs to stderr |
//! | `PROCTOR_SERVICE_NAME` | `proctor-session` | Service label |

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{encode_metrics, register_metrics, MetricsHandle, BUILD_INFO};
pub use tracing_setup::build_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Failed to encode Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and host metrics.
///
/// Keep the returned guard for the lifetime of the process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics(&config.service_name);
    tracing_setup::init_tracing(&config)?;
    Ok(TelemetryGuard { metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.metrics.service(), "Shutting down telemetry...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::Config("bad filter".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: bad filter");
    }
}
