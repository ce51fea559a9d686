//! # Outbound Ports
//!
//! Traits for the external collaborators of a session: question bank,
//! frame capture, the anti-cheat classifier and the grading service.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::{GradedResult, Question, QuestionResult, Sample, SessionId, SubmissionSnapshot, Verdict};
use crate::error::{SessionError, SessionResult};

/// Question bank - outbound port.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch the question list for a category.
    async fn fetch_questions(&self, category: &str) -> SessionResult<Vec<Question>>;
}

/// Frame capture (camera, screen) - outbound port.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Capture one frame. `Ok(None)` means nothing usable was captured.
    async fn capture_frame(&self) -> SessionResult<Option<Sample>>;
}

/// Anti-cheat classifier - outbound port. Opaque external service.
#[async_trait]
pub trait ClassificationService: Send + Sync {
    async fn classify(&self, sample: &Sample) -> SessionResult<Verdict>;
}

/// Grading collaborator - outbound port. Owns persistence of results.
#[async_trait]
pub trait GradingService: Send + Sync {
    /// Grade a frozen submission.
    ///
    /// Returns `DuplicateSubmission` if the session was already closed.
    async fn grade(&self, submission: &SubmissionSnapshot) -> SessionResult<GradedResult>;

    /// Fetch the stored result of a closed session.
    async fn fetch_result(&self, session_id: SessionId) -> SessionResult<GradedResult>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock question source for testing.
#[derive(Clone, Debug, Default)]
pub struct MockQuestionSource {
    pub questions: Vec<Question>,
    pub should_fail: bool,
}

impl MockQuestionSource {
    /// `count` questions with ids `q0..`, each with options `a`..`d`.
    pub fn with_generated(count: usize) -> Self {
        let questions = (0..count)
            .map(|i| {
                Question::new(
                    format!("q{i}"),
                    format!("Question {i}"),
                    ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        Self {
            questions,
            should_fail: false,
        }
    }
}

#[async_trait]
impl QuestionSource for MockQuestionSource {
    async fn fetch_questions(&self, category: &str) -> SessionResult<Vec<Question>> {
        if self.should_fail {
            return Err(SessionError::QuestionSourceUnavailable {
                reason: format!("mock failure for '{category}'"),
            });
        }
        Ok(self.questions.clone())
    }
}

/// Step in a scripted capture sequence.
#[derive(Clone, Debug)]
pub enum CaptureStep {
    Frame,
    Null,
    Fail,
}

/// Capture source replaying a script, then producing frames forever.
#[derive(Debug, Default)]
pub struct ScriptedCapture {
    script: Mutex<VecDeque<CaptureStep>>,
    calls: AtomicUsize,
}

impl ScriptedCapture {
    pub fn new(script: Vec<CaptureStep>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureSource for ScriptedCapture {
    async fn capture_frame(&self) -> SessionResult<Option<Sample>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().pop_front().unwrap_or(CaptureStep::Frame);
        match step {
            CaptureStep::Frame => Ok(Some(Sample::new(vec![n as u8; 4]))),
            CaptureStep::Null => Ok(None),
            CaptureStep::Fail => Err(SessionError::CaptureFailed {
                reason: "mock camera unavailable".to_string(),
            }),
        }
    }
}

/// Step in a scripted classification sequence.
#[derive(Clone, Debug)]
pub enum ClassifyStep {
    Clean,
    Suspicious(String),
    Fail,
    /// Never answers within any sane timeout
    Hang,
    /// Answer clean after a delay
    Slow(Duration),
}

/// Classifier replaying a script, then answering clean forever.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<ClassifyStep>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(script: Vec<ClassifyStep>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent `classify` calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationService for ScriptedClassifier {
    async fn classify(&self, _sample: &Sample) -> SessionResult<Verdict> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(concurrent, Ordering::SeqCst);
        // Timed-out calls are dropped mid-await; release the slot either way
        let _slot = InFlightSlot(&self.in_flight);

        let step = self.script.lock().pop_front().unwrap_or(ClassifyStep::Clean);
        match step {
            ClassifyStep::Clean => Ok(Verdict::clean()),
            ClassifyStep::Suspicious(reason) => {
                Ok(Verdict::suspicious(reason, Some(format!("evidence-{n}"))))
            }
            ClassifyStep::Fail => Err(SessionError::ClassificationInconclusive {
                reason: "mock transport error".to_string(),
            }),
            ClassifyStep::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Verdict::clean())
            }
            ClassifyStep::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Verdict::clean())
            }
        }
    }
}

struct InFlightSlot<'a>(&'a AtomicUsize);

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scripted response of the mock grading service.
#[derive(Clone, Debug)]
pub enum GradeStep {
    Ok,
    Unavailable,
    Duplicate,
    Reject,
}

/// Grading service replaying a script, then succeeding forever.
///
/// Scores one point per answered question.
#[derive(Debug, Default)]
pub struct MockGradingService {
    script: Mutex<VecDeque<GradeStep>>,
    grade_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    received: Mutex<Vec<SubmissionSnapshot>>,
    delay: Option<Duration>,
}

impl MockGradingService {
    pub fn new(script: Vec<GradeStep>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Delay every `grade` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn grade_calls(&self) -> usize {
        self.grade_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Every submission passed to `grade`, in call order.
    pub fn received(&self) -> Vec<SubmissionSnapshot> {
        self.received.lock().clone()
    }

    fn result_for(submission: &SubmissionSnapshot) -> GradedResult {
        let per_question: Vec<QuestionResult> = submission
            .answers
            .entries()
            .iter()
            .map(|(id, entry)| QuestionResult {
                question_id: id.clone(),
                correct: entry.is_answered(),
            })
            .collect();
        let correct = per_question.iter().filter(|r| r.correct).count();
        GradedResult {
            score: correct as f64,
            per_question,
        }
    }
}

#[async_trait]
impl GradingService for MockGradingService {
    async fn grade(&self, submission: &SubmissionSnapshot) -> SessionResult<GradedResult> {
        self.grade_calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(submission.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let step = self.script.lock().pop_front().unwrap_or(GradeStep::Ok);
        match step {
            GradeStep::Ok => Ok(Self::result_for(submission)),
            GradeStep::Unavailable => Err(SessionError::GradingUnavailable {
                reason: "mock grading outage".to_string(),
            }),
            GradeStep::Duplicate => Err(SessionError::DuplicateSubmission {
                session_id: submission.session_id.to_string(),
            }),
            GradeStep::Reject => Err(SessionError::SubmissionRejected {
                reason: "mock rejection".to_string(),
            }),
        }
    }

    async fn fetch_result(&self, session_id: SessionId) -> SessionResult<GradedResult> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let received = self.received.lock();
        received
            .iter()
            .find(|s| s.session_id == session_id)
            .map(Self::result_for)
            .ok_or_else(|| SessionError::GradingUnavailable {
                reason: format!("no stored result for {session_id}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_question_source() {
        let source = MockQuestionSource::with_generated(3);
        assert_eq!(source.fetch_questions("any").await.unwrap().len(), 3);

        let failing = MockQuestionSource {
            should_fail: true,
            ..Default::default()
        };
        let err = failing.fetch_questions("any").await.unwrap_err();
        assert!(err.is_startup_error());
    }

    #[tokio::test]
    async fn test_scripted_capture() {
        let capture = ScriptedCapture::new(vec![CaptureStep::Null, CaptureStep::Fail]);
        assert!(capture.capture_frame().await.unwrap().is_none());
        assert!(capture.capture_frame().await.is_err());
        assert!(capture.capture_frame().await.unwrap().is_some());
        assert_eq!(capture.calls(), 3);
    }

    #[tokio::test]
    async fn test_scripted_classifier() {
        let classifier = ScriptedClassifier::new(vec![
            ClassifyStep::Suspicious("phone".to_string()),
            ClassifyStep::Fail,
        ]);
        let sample = Sample::new(vec![1]);
        assert!(classifier.classify(&sample).await.unwrap().is_suspicious);
        assert!(classifier.classify(&sample).await.is_err());
        assert!(!classifier.classify(&sample).await.unwrap().is_suspicious);
        assert_eq!(classifier.calls(), 3);
        assert_eq!(classifier.max_in_flight(), 1);
    }
}
