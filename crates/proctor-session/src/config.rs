//! # Session Configuration
//!
//! Tunables for one proctored attempt. The violation threshold and monitor
//! interval are inputs rather than constants so that deployments can pick
//! their own tolerance.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{SessionError, SessionResult};

/// Confirmed violations tolerated before escalation.
pub const DEFAULT_VIOLATION_THRESHOLD: u32 = 3;

/// Seconds between integrity monitor cycles.
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 30;

/// Session controller configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Confirmed violations that trigger escalation.
    pub violation_threshold: u32,

    /// Seconds between monitor cycles.
    pub monitor_interval_secs: u64,

    /// Upper bound for one frame capture.
    pub capture_timeout_ms: u64,

    /// Upper bound for one classification round trip.
    pub classify_timeout_ms: u64,

    /// Wall-clock length of one countdown tick (one second of exam time).
    pub tick_interval_ms: u64,

    /// Delay before the single automatic grading retry.
    pub grading_retry_delay_ms: u64,

    /// Capacity of the session event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            violation_threshold: DEFAULT_VIOLATION_THRESHOLD,
            monitor_interval_secs: DEFAULT_MONITOR_INTERVAL_SECS,
            capture_timeout_ms: 5_000,
            classify_timeout_ms: 10_000,
            tick_interval_ms: 1_000,
            grading_retry_delay_ms: 2_000,
            event_channel_capacity: 256,
        }
    }
}

impl SessionConfig {
    /// Create a config for testing (short timeouts, 1s monitor interval).
    pub fn for_testing() -> Self {
        Self {
            violation_threshold: DEFAULT_VIOLATION_THRESHOLD,
            monitor_interval_secs: 1,
            capture_timeout_ms: 100,
            classify_timeout_ms: 200,
            tick_interval_ms: 1_000,
            grading_retry_delay_ms: 10,
            event_channel_capacity: 64,
        }
    }

    /// Load defaults, overridden by `PROCTOR_*` environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PROCTOR_VIOLATION_THRESHOLD`
    /// - `PROCTOR_MONITOR_INTERVAL_SECS`
    /// - `PROCTOR_CAPTURE_TIMEOUT_MS`
    /// - `PROCTOR_CLASSIFY_TIMEOUT_MS`
    /// - `PROCTOR_GRADING_RETRY_DELAY_MS`
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            violation_threshold: env_parse("PROCTOR_VIOLATION_THRESHOLD")
                .unwrap_or(defaults.violation_threshold),
            monitor_interval_secs: env_parse("PROCTOR_MONITOR_INTERVAL_SECS")
                .unwrap_or(defaults.monitor_interval_secs),
            capture_timeout_ms: env_parse("PROCTOR_CAPTURE_TIMEOUT_MS")
                .unwrap_or(defaults.capture_timeout_ms),
            classify_timeout_ms: env_parse("PROCTOR_CLASSIFY_TIMEOUT_MS")
                .unwrap_or(defaults.classify_timeout_ms),
            grading_retry_delay_ms: env_parse("PROCTOR_GRADING_RETRY_DELAY_MS")
                .unwrap_or(defaults.grading_retry_delay_ms),
            ..defaults
        }
    }

    /// Reject values that would make the session ungovernable.
    pub fn validate(&self) -> SessionResult<()> {
        if self.violation_threshold == 0 {
            return Err(invalid("violation_threshold must be at least 1"));
        }
        if self.monitor_interval_secs == 0 {
            return Err(invalid("monitor_interval_secs must be at least 1"));
        }
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms must be at least 1"));
        }
        if self.capture_timeout_ms == 0 || self.classify_timeout_ms == 0 {
            return Err(invalid("capture and classify timeouts must be non-zero"));
        }
        if self.event_channel_capacity == 0 {
            return Err(invalid("event_channel_capacity must be at least 1"));
        }
        Ok(())
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn grading_retry_delay(&self) -> Duration {
        Duration::from_millis(self.grading_retry_delay_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn invalid(reason: &str) -> SessionError {
    SessionError::InvalidConfig {
        reason: reason.to_string(),
    }
}
