//! Scripted candidate
//!
//! Answers questions in order at a fixed pace, picking options at random.
//! Used for unattended runs and demos.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{debug, info};

use proctor_session::{
    GradedResult, ProctoredSessionApi, SessionController, SessionResult, SessionStatus,
};

#[derive(Debug, Clone)]
pub struct ScriptedCandidate {
    /// Thinking time before each answer
    pub answer_delay: Duration,
    /// Submit after the last answer instead of waiting for the clock
    pub submit_when_done: bool,
    pub seed: u64,
}

impl ScriptedCandidate {
    pub fn new(answer_delay: Duration, submit_when_done: bool, seed: u64) -> Self {
        Self {
            answer_delay,
            submit_when_done,
            seed,
        }
    }

    /// Work through the session and return its outcome.
    ///
    /// Stops answering as soon as the session leaves `Active`.
    pub async fn run(&self, session: &SessionController) -> SessionResult<GradedResult> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut answered = 0usize;

        loop {
            tokio::time::sleep(self.answer_delay).await;
            if session.status() != SessionStatus::Active {
                break;
            }
            let Some(question) = session.current_question() else {
                break;
            };
            let option = &question.options[rng.gen_range(0..question.options.len())];
            if session.select_answer(&question.id, option) {
                answered += 1;
                debug!(question = %question.id, option = %option, "Scripted answer");
            }
            if !session.next() {
                break;
            }
        }

        info!(answered, session_id = %session.id(), "Scripted candidate finished answering");
        if self.submit_when_done {
            session.submit().await
        } else {
            session.wait_for_outcome().await
        }
    }
}
