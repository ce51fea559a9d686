//! # Proctor Session
//!
//! Controller for one timed, proctored multiple-choice attempt.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A candidate answers a fixed question set against a countdown while an
//! integrity monitor periodically samples and classifies frames. The attempt
//! ends on exactly one of:
//! - clock expiry
//! - integrity escalation (violation count reaches the threshold)
//! - manual submit
//!
//! Whichever trigger wins, the answers are frozen and handed to grading
//! exactly once, with a single automatic retry on a transient outage.
//!
//! ## Status Machine
//!
//! ```text
//! Active ──(first trigger, CAS)──▶ Terminating ──(graded)──▶ Submitted
//!                                      │  ▲
//!                                      └──┘ resubmit after exhausted retry
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! proctor-session/
//! ├── domain/          # Questions, answer ledger, violations, status gate
//! ├── ports/           # API trait (inbound) + collaborator traits (outbound)
//! ├── application/     # Clock, monitor, gateway, SessionController
//! ├── adapters/        # JSON question bank, answer-key grader
//! ├── events.rs        # SessionEvent broadcast to the UI
//! ├── metrics.rs       # Prometheus metrics (feature `metrics`)
//! └── config.rs        # SessionConfig
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod ports;

// Re-exports
pub use adapters::{AnswerKeyGrader, BankQuestion, QuestionBank};
pub use application::{
    CountdownClock, IntegrityMonitor, MonitorSettings, SessionController, SessionPorts,
    SubmissionGateway,
};
pub use config::SessionConfig;
pub use domain::{
    AnswerEntry, AnswerLedger, GradedResult, LedgerSnapshot, Question, QuestionId,
    QuestionResult, QuestionSet, Sample, SessionId, SessionSnapshot, SessionStatus,
    SessionSummary, SubmissionSnapshot, TerminationTrigger, Verdict, ViolationRecord,
};
pub use error::{SessionError, SessionResult};
pub use events::SessionEvent;
pub use ports::{
    CaptureSource, ClassificationService, GradingService, ProctoredSessionApi, QuestionSource,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
