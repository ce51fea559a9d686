//! # Inbound Ports
//!
//! What the hosting UI or process can do with a running session.

use async_trait::async_trait;

use crate::domain::{GradedResult, Question, QuestionId, SessionSnapshot, SessionSummary};
use crate::error::SessionResult;

/// Proctored session API - inbound port.
///
/// Answer and navigation calls return whether they took effect. Once the
/// session has left `Active` they are silent no-ops, never errors.
#[async_trait]
pub trait ProctoredSessionApi: Send + Sync {
    /// Record `option` as the answer to `question_id`.
    fn select_answer(&self, question_id: &QuestionId, option: &str) -> bool;

    fn clear_answer(&self, question_id: &QuestionId) -> bool;

    fn toggle_mark(&self, question_id: &QuestionId) -> bool;

    /// Move to question `index`. Out-of-range indices are ignored.
    fn go_to(&self, index: usize) -> bool;

    fn next(&self) -> bool;

    fn previous(&self) -> bool;

    /// Question under the cursor.
    fn current_question(&self) -> Option<Question>;

    /// Manual submit. Joins a termination already in progress and waits for
    /// the final outcome either way.
    async fn submit(&self) -> SessionResult<GradedResult>;

    /// Re-send the frozen snapshot after a terminal submission failure.
    async fn resubmit(&self) -> SessionResult<GradedResult>;

    fn snapshot(&self) -> SessionSnapshot;

    fn summary(&self) -> SessionSummary;
}
