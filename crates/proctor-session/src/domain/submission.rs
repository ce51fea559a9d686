//! Frozen submission payloads, grading results and host-facing snapshots

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ledger::LedgerSnapshot;
use super::question::QuestionId;
use super::status::{SessionStatus, TerminationTrigger};
use super::violation::ViolationRecord;

/// Identity of one attempt, shared with the grading collaborator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the grading collaborator receives. Built once, at termination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionSnapshot {
    pub session_id: SessionId,
    pub trigger: TerminationTrigger,
    pub answers: LedgerSnapshot,
    pub violations: Vec<ViolationRecord>,
    pub frozen_at: u64,
}

/// Per-question grading outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub correct: bool,
}

/// Grading collaborator response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradedResult {
    pub score: f64,
    pub per_question: Vec<QuestionResult>,
}

impl GradedResult {
    pub fn correct_count(&self) -> usize {
        self.per_question.iter().filter(|r| r.correct).count()
    }
}

/// Read-only view of the whole session for the host
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub current_question_index: usize,
    pub remaining_seconds: u64,
    pub violations: Vec<ViolationRecord>,
    pub answers: LedgerSnapshot,
    pub trigger: Option<TerminationTrigger>,
}

/// Counts for a review or question-palette screen
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub total: usize,
    pub answered: usize,
    pub marked: usize,
    pub unanswered: usize,
    pub remaining_seconds: u64,
    pub violations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_count() {
        let result = GradedResult {
            score: 50.0,
            per_question: vec![
                QuestionResult {
                    question_id: "q1".into(),
                    correct: true,
                },
                QuestionResult {
                    question_id: "q2".into(),
                    correct: false,
                },
            ],
        };
        assert_eq!(result.correct_count(), 1);
    }

    #[test]
    fn test_session_ids_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
