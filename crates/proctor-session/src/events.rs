//! Session events broadcast to the host
//!
//! The host UI subscribes via `SessionController::subscribe`. Per-violation
//! notifications (banners, confirmation dialogs) are the host's business;
//! the controller only reports.

use serde::Serialize;

use crate::domain::{GradedResult, TerminationTrigger, ViolationRecord};
use crate::error::SessionError;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// One second of exam time elapsed
    Tick { remaining_seconds: u64 },

    /// A confirmed violation was recorded
    Violation { record: ViolationRecord, total: usize },

    /// The session left `Active`; answers and violations are frozen
    TerminationStarted { trigger: TerminationTrigger },

    /// Grading succeeded; the session is `Submitted`
    Submitted { result: GradedResult },

    /// Grading failed terminally; the frozen snapshot is kept for `resubmit`
    SubmissionFailed {
        #[serde(serialize_with = "error_as_string")]
        error: SessionError,
    },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Tick { .. } => "tick",
            SessionEvent::Violation { .. } => "violation",
            SessionEvent::TerminationStarted { .. } => "termination_started",
            SessionEvent::Submitted { .. } => "submitted",
            SessionEvent::SubmissionFailed { .. } => "submission_failed",
        }
    }
}

fn error_as_string<S: serde::Serializer>(error: &SessionError, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json() {
        let json = serde_json::to_value(SessionEvent::Tick {
            remaining_seconds: 7,
        })
        .unwrap();
        assert_eq!(json["event"], "tick");
        assert_eq!(json["remaining_seconds"], 7);
    }

    #[test]
    fn test_failure_event_serializes_message() {
        let event = SessionEvent::SubmissionFailed {
            error: SessionError::SubmissionExhausted {
                attempts: 2,
                reason: "down".to_string(),
            },
        };
        assert_eq!(event.name(), "submission_failed");
        let json = serde_json::to_value(event).unwrap();
        assert!(json["error"].as_str().unwrap().contains("2 attempts"));
    }
}
