//! Submission Gateway
//!
//! Delivers a frozen snapshot to the grading collaborator. A
//! `DuplicateSubmission` reply means an earlier delivery already closed the
//! session, so the stored result is fetched and returned as a success.

use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{GradedResult, SubmissionSnapshot};
use crate::error::SessionResult;
use crate::metrics;
use crate::ports::GradingService;

pub struct SubmissionGateway {
    grading: Arc<dyn GradingService>,
}

impl SubmissionGateway {
    pub fn new(grading: Arc<dyn GradingService>) -> Self {
        Self { grading }
    }

    /// Grade the snapshot. Fails with `GradingUnavailable` on transport error.
    pub async fn submit(&self, submission: &SubmissionSnapshot) -> SessionResult<GradedResult> {
        debug!(
            session_id = %submission.session_id,
            answers = submission.answers.len(),
            violations = submission.violations.len(),
            "Delivering submission to grading service"
        );

        match self.grading.grade(submission).await {
            Ok(result) => {
                metrics::record_grading_attempt("graded");
                Ok(result)
            }
            Err(e) if e.is_duplicate_submission() => {
                metrics::record_grading_attempt("duplicate");
                info!(
                    session_id = %submission.session_id,
                    "Session already closed by grading service; fetching stored result"
                );
                self.grading.fetch_result(submission.session_id).await
            }
            Err(e) => {
                metrics::record_grading_attempt(if e.is_transient() { "unavailable" } else { "rejected" });
                Err(e)
            }
        }
    }
}
