//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log filter directive (trace, debug, info, warn, error, or a full EnvFilter)
    pub log_level: String,

    /// Whether to write logs to stderr at all
    pub console_output: bool,

    /// Whether to format logs as JSON
    pub json_logs: bool,

    /// Include source file and line in log lines
    pub source_locations: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "proctor-session".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            source_locations: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PROCTOR_SERVICE_NAME`: Service name (default: proctor-session)
    /// - `RUST_LOG` or `PROCTOR_LOG_LEVEL`: Log filter (default: info)
    /// - `PROCTOR_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `PROCTOR_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("PROCTOR_SERVICE_NAME")
                .unwrap_or_else(|_| "proctor-session".to_string()),

            log_level: env::var("RUST_LOG")
                .or_else(|_| env::var("PROCTOR_LOG_LEVEL"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("PROCTOR_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("PROCTOR_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            source_locations: is_container,
        }
    }

    /// Override the log filter, e.g. from a `--log-level` flag.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "proctor-session");
        assert_eq!(config.log_level, "info");
        assert!(config.console_output);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_with_log_level() {
        let config = TelemetryConfig::default().with_log_level("proctor_session=debug");
        assert_eq!(config.log_level, "proctor_session=debug");
    }
}
