//! Local answer-key grading adapter
//!
//! Implements `GradingService` in-process for hosts without a remote grader.
//! Like a remote grader it closes a session on first grade and answers any
//! later `grade` for the same session with `DuplicateSubmission`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::info;

use crate::domain::{GradedResult, QuestionId, QuestionResult, SessionId, SubmissionSnapshot};
use crate::error::{SessionError, SessionResult};
use crate::ports::GradingService;

pub struct AnswerKeyGrader {
    key: HashMap<QuestionId, String>,
    /// Points lost per recorded violation
    violation_penalty: f64,
    closed: Mutex<HashMap<SessionId, GradedResult>>,
}

impl AnswerKeyGrader {
    pub fn new(key: HashMap<QuestionId, String>) -> Self {
        Self {
            key,
            violation_penalty: 0.0,
            closed: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_violation_penalty(mut self, penalty: f64) -> Self {
        self.violation_penalty = penalty;
        self
    }

    fn grade_snapshot(&self, submission: &SubmissionSnapshot) -> GradedResult {
        let per_question: Vec<QuestionResult> = submission
            .answers
            .entries()
            .iter()
            .map(|(id, entry)| QuestionResult {
                question_id: id.clone(),
                correct: match (self.key.get(id), entry.selected_option.as_ref()) {
                    (Some(expected), Some(selected)) => expected == selected,
                    _ => false,
                },
            })
            .collect();

        let correct = per_question.iter().filter(|r| r.correct).count() as f64;
        let penalty = self.violation_penalty * submission.violations.len() as f64;
        GradedResult {
            score: (correct - penalty).max(0.0),
            per_question,
        }
    }
}

#[async_trait]
impl GradingService for AnswerKeyGrader {
    async fn grade(&self, submission: &SubmissionSnapshot) -> SessionResult<GradedResult> {
        let mut closed = self.closed.lock();
        if closed.contains_key(&submission.session_id) {
            return Err(SessionError::DuplicateSubmission {
                session_id: submission.session_id.to_string(),
            });
        }
        let result = self.grade_snapshot(submission);
        info!(
            session_id = %submission.session_id,
            score = result.score,
            violations = submission.violations.len(),
            "Graded against answer key"
        );
        closed.insert(submission.session_id, result.clone());
        Ok(result)
    }

    async fn fetch_result(&self, session_id: SessionId) -> SessionResult<GradedResult> {
        self.closed
            .lock()
            .get(&session_id)
            .cloned()
            .ok_or_else(|| SessionError::SubmissionRejected {
                reason: format!("no closed session {session_id}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnswerLedger, TerminationTrigger, ViolationRecord};

    fn submission(violations: usize) -> SubmissionSnapshot {
        let ids = vec![QuestionId::from("q1"), QuestionId::from("q2"), QuestionId::from("q3")];
        let mut ledger = AnswerLedger::new(&ids);
        ledger.select(&ids[0], "a");
        ledger.select(&ids[1], "wrong");
        SubmissionSnapshot {
            session_id: SessionId::generate(),
            trigger: TerminationTrigger::ClockExpired,
            answers: ledger.snapshot(),
            violations: (0..violations)
                .map(|i| ViolationRecord {
                    reason: "tab switch".to_string(),
                    captured_at: i as u64,
                    evidence_ref: None,
                })
                .collect(),
            frozen_at: 0,
        }
    }

    fn key() -> HashMap<QuestionId, String> {
        [("q1", "a"), ("q2", "b"), ("q3", "c")]
            .into_iter()
            .map(|(q, a)| (QuestionId::from(q), a.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_grades_against_key() {
        let grader = AnswerKeyGrader::new(key());
        let result = grader.grade(&submission(0)).await.unwrap();
        assert_eq!(result.score, 1.0);
        assert_eq!(result.per_question.len(), 3);
        assert!(result.per_question[0].correct);
    }

    #[tokio::test]
    async fn test_second_grade_is_duplicate() {
        let grader = AnswerKeyGrader::new(key());
        let snapshot = submission(0);
        grader.grade(&snapshot).await.unwrap();

        let err = grader.grade(&snapshot).await.unwrap_err();
        assert!(err.is_duplicate_submission());
        assert_eq!(grader.fetch_result(snapshot.session_id).await.unwrap().score, 1.0);
    }

    #[tokio::test]
    async fn test_violation_penalty_floors_at_zero() {
        let grader = AnswerKeyGrader::new(key()).with_violation_penalty(0.5);
        let result = grader.grade(&submission(3)).await.unwrap();
        assert_eq!(result.score, 0.0);
    }
}
