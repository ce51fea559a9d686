//! Domain module for the proctored session
//!
//! ## Core Modules
//! - question: Question set and validation
//! - ledger: Per-question answer bookkeeping
//! - violation: Samples, verdicts and violation records
//! - status: Status machine and termination gate
//! - submission: Frozen snapshots and grading results

pub mod ledger;
pub mod question;
pub mod status;
pub mod submission;
pub mod violation;

pub use ledger::{AnswerEntry, AnswerLedger, LedgerSnapshot};
pub use question::{Question, QuestionId, QuestionSet};
pub use status::{SessionStatus, StatusGate, TerminationTrigger};
pub use submission::{
    GradedResult, QuestionResult, SessionId, SessionSnapshot, SessionSummary, SubmissionSnapshot,
};
pub use violation::{now_millis, Sample, Verdict, ViolationRecord};
