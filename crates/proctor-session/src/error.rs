//! Error types for the proctored session controller
//!
//! Only startup failures and an exhausted grading retry ever reach the host
//! as visible failures. Capture and classification errors are absorbed by the
//! integrity monitor as inconclusive cycles.

use thiserror::Error;

/// Session controller errors
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Question source returned no questions for the category
    #[error("Question source returned no questions for category '{category}'")]
    EmptyQuestionSet { category: String },

    /// Question source could not be reached
    #[error("Question source unavailable: {reason}")]
    QuestionSourceUnavailable { reason: String },

    /// Question set is structurally unusable
    #[error("Invalid question set: {reason}")]
    InvalidQuestionSet { reason: String },

    /// Configuration or start parameters rejected
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// No tokio runtime available to drive the clock and monitor
    #[error("Session must be started from within a tokio runtime")]
    RuntimeUnavailable,

    /// Capture source failed to produce a frame
    #[error("Capture failed: {reason}")]
    CaptureFailed { reason: String },

    /// Monitor cycle produced no usable verdict
    #[error("Classification inconclusive: {reason}")]
    ClassificationInconclusive { reason: String },

    /// Grading collaborator could not be reached
    #[error("Grading service unavailable: {reason}")]
    GradingUnavailable { reason: String },

    /// Grading collaborator already holds a closed result for this session
    #[error("Session {session_id} was already submitted")]
    DuplicateSubmission { session_id: String },

    /// Grading collaborator rejected the submission outright
    #[error("Submission rejected: {reason}")]
    SubmissionRejected { reason: String },

    /// Automatic retry exhausted; the frozen snapshot is retained
    #[error("Submission failed after {attempts} attempts: {reason}")]
    SubmissionExhausted { attempts: u32, reason: String },

    /// Operation requires a terminated session
    #[error("Session is still active")]
    SessionStillActive,

    /// A submission for this session is already in flight
    #[error("Submission already in progress")]
    SubmissionInProgress,
}

impl SessionError {
    /// True for errors that prevent the session from ever becoming active.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            SessionError::EmptyQuestionSet { .. }
                | SessionError::QuestionSourceUnavailable { .. }
                | SessionError::InvalidQuestionSet { .. }
                | SessionError::InvalidConfig { .. }
                | SessionError::RuntimeUnavailable
        )
    }

    /// True for grading failures that warrant the automatic retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::GradingUnavailable { .. })
    }

    pub fn is_duplicate_submission(&self) -> bool {
        matches!(self, SessionError::DuplicateSubmission { .. })
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
