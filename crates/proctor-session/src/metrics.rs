//! # Session Metrics
//!
//! Prometheus metrics for proctored sessions.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! proctor-session = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `proctor_sessions_started_total` - Counter of sessions that became active
//! - `proctor_terminations_total` - Counter of terminations (by trigger)
//! - `proctor_violations_total` - Counter of confirmed violations
//! - `proctor_inconclusive_cycles_total` - Counter of skipped monitor cycles
//! - `proctor_grading_attempts_total` - Counter of grading calls (by outcome)
//! - `proctor_session_status` - Gauge of the latest status change (0=Active, 1=Terminating, 2=Submitted)

use crate::domain::SessionStatus;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_gauge, register_int_counter, CounterVec, Gauge, IntCounter,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Sessions that became active
    pub static ref SESSIONS_STARTED: IntCounter = register_int_counter!(
        "proctor_sessions_started_total",
        "Total number of proctored sessions started"
    )
    .expect("Failed to create SESSIONS_STARTED metric");

    /// Terminations, labeled by winning trigger
    pub static ref TERMINATIONS: CounterVec = register_counter_vec!(
        "proctor_terminations_total",
        "Total number of session terminations",
        &["trigger"]
    )
    .expect("Failed to create TERMINATIONS metric");

    /// Confirmed violations
    pub static ref VIOLATIONS: IntCounter = register_int_counter!(
        "proctor_violations_total",
        "Total number of confirmed integrity violations"
    )
    .expect("Failed to create VIOLATIONS metric");

    /// Monitor cycles skipped as inconclusive
    pub static ref INCONCLUSIVE_CYCLES: IntCounter = register_int_counter!(
        "proctor_inconclusive_cycles_total",
        "Total number of inconclusive integrity monitor cycles"
    )
    .expect("Failed to create INCONCLUSIVE_CYCLES metric");

    /// Grading calls, labeled by outcome
    pub static ref GRADING_ATTEMPTS: CounterVec = register_counter_vec!(
        "proctor_grading_attempts_total",
        "Total number of grading service calls",
        &["outcome"]
    )
    .expect("Failed to create GRADING_ATTEMPTS metric");

    /// Latest status change
    pub static ref SESSION_STATUS: Gauge = register_gauge!(
        "proctor_session_status",
        "Latest session status change (0=Active, 1=Terminating, 2=Submitted)"
    )
    .expect("Failed to create SESSION_STATUS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_session_started() {
    SESSIONS_STARTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_termination(trigger: &str) {
    TERMINATIONS.with_label_values(&[trigger]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_violation() {
    VIOLATIONS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_inconclusive_cycle() {
    INCONCLUSIVE_CYCLES.inc();
}

#[cfg(feature = "metrics")]
pub fn record_grading_attempt(outcome: &str) {
    GRADING_ATTEMPTS.with_label_values(&[outcome]).inc();
}

#[cfg(feature = "metrics")]
pub fn set_session_status(status: SessionStatus) {
    SESSION_STATUS.set(status_code(status));
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_session_started() {}

#[cfg(not(feature = "metrics"))]
pub fn record_termination(_trigger: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_violation() {}

#[cfg(not(feature = "metrics"))]
pub fn record_inconclusive_cycle() {}

#[cfg(not(feature = "metrics"))]
pub fn record_grading_attempt(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn set_session_status(_status: SessionStatus) {}

/// Gauge encoding of a status.
pub fn status_code(status: SessionStatus) -> f64 {
    match status {
        SessionStatus::Active => 0.0,
        SessionStatus::Terminating => 1.0,
        SessionStatus::Submitted => 2.0,
    }
}
