//! Session Controller - orchestrates one proctored attempt
//!
//! Owns the answer ledger, the countdown clock, the integrity monitor and the
//! termination gate. Clock expiry, monitor escalation and manual submit all
//! funnel into `begin_termination`, where a single compare-and-swap decides
//! the winner. The winner, synchronously and in this order:
//!
//! 1. stops the clock and the monitor
//! 2. freezes the ledger and violation log into a `SubmissionSnapshot`
//! 3. hands the snapshot to a delivery task
//!
//! Delivery retries exactly once on a transient grading failure. If that
//! retry fails too, the session stays `Terminating` with the snapshot
//! retained for `resubmit`.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use super::clock::{ClockHandlers, CountdownClock};
use super::gateway::SubmissionGateway;
use super::monitor::{IntegrityMonitor, MonitorHandlers, MonitorSettings};
use crate::config::SessionConfig;
use crate::domain::{
    now_millis, AnswerLedger, GradedResult, Question, QuestionId, QuestionSet, SessionId,
    SessionSnapshot, SessionStatus, SessionSummary, StatusGate, SubmissionSnapshot,
    TerminationTrigger, ViolationRecord,
};
use crate::error::{SessionError, SessionResult};
use crate::events::SessionEvent;
use crate::metrics;
use crate::ports::{
    CaptureSource, ClassificationService, GradingService, ProctoredSessionApi, QuestionSource,
};

/// Attempts made by the automatic delivery: the first call plus one retry.
const AUTOMATIC_ATTEMPTS: u32 = 2;

type Outcome = Option<SessionResult<GradedResult>>;

/// External collaborators a session talks to
#[derive(Clone)]
pub struct SessionPorts {
    pub capture: Arc<dyn CaptureSource>,
    pub classifier: Arc<dyn ClassificationService>,
    pub grading: Arc<dyn GradingService>,
}

/// Ledger and cursor share one lock so the frozen snapshot can never miss
/// or race a write.
struct AttemptState {
    ledger: AnswerLedger,
    cursor: usize,
}

/// Frozen snapshot and the in-flight flag are published and claimed together.
#[derive(Default)]
struct DeliveryState {
    frozen: Option<SubmissionSnapshot>,
    in_flight: bool,
}

struct SessionInner {
    id: SessionId,
    config: SessionConfig,
    questions: QuestionSet,
    gate: StatusGate,
    attempt: RwLock<AttemptState>,
    clock: CountdownClock,
    monitor: IntegrityMonitor,
    gateway: SubmissionGateway,
    trigger: Mutex<Option<TerminationTrigger>>,
    delivery: Mutex<DeliveryState>,
    outcome: watch::Sender<Outcome>,
    events: broadcast::Sender<SessionEvent>,
    runtime: Handle,
}

/// Handle to one running attempt. Cheap to clone.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<SessionInner>,
}

impl SessionController {
    /// Start a session over an already-fetched question list.
    ///
    /// Must be called from within a tokio runtime. On error the session never
    /// becomes active and nothing is left running.
    pub fn start(
        config: SessionConfig,
        ports: SessionPorts,
        questions: Vec<Question>,
        duration_secs: u64,
    ) -> SessionResult<Self> {
        config.validate()?;
        if duration_secs == 0 {
            return Err(SessionError::InvalidConfig {
                reason: "duration must be at least one second".to_string(),
            });
        }
        let questions = QuestionSet::new(questions)?;
        let runtime = Handle::try_current().map_err(|_| SessionError::RuntimeUnavailable)?;

        let id = SessionId::generate();
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        let (outcome, _) = watch::channel(None);
        let ledger = AnswerLedger::new(questions.ids());

        let inner = Arc::new(SessionInner {
            id,
            clock: CountdownClock::new(config.tick_interval()),
            monitor: IntegrityMonitor::new(
                MonitorSettings::from_config(&config),
                ports.capture,
                ports.classifier,
            ),
            gateway: SubmissionGateway::new(ports.grading),
            config,
            questions,
            gate: StatusGate::new(),
            attempt: RwLock::new(AttemptState { ledger, cursor: 0 }),
            trigger: Mutex::new(None),
            delivery: Mutex::new(DeliveryState::default()),
            outcome,
            events,
            runtime,
        });

        let weak = Arc::downgrade(&inner);
        inner.clock.start(duration_secs, clock_handlers(&weak))?;
        if let Err(e) = inner.monitor.start(monitor_handlers(&weak)) {
            inner.clock.stop();
            return Err(e);
        }

        metrics::record_session_started();
        metrics::set_session_status(SessionStatus::Active);
        info!(
            session_id = %id,
            questions = inner.questions.len(),
            duration_secs,
            threshold = inner.config.violation_threshold,
            "Proctored session started"
        );

        Ok(Self { inner })
    }

    /// Fetch questions for `category` and start a session over them.
    ///
    /// An unreachable source or an empty category is a startup error.
    pub async fn start_from_source(
        config: SessionConfig,
        ports: SessionPorts,
        source: &dyn QuestionSource,
        category: &str,
        duration_secs: u64,
    ) -> SessionResult<Self> {
        let questions = source.fetch_questions(category).await.map_err(|e| {
            if e.is_startup_error() {
                e
            } else {
                SessionError::QuestionSourceUnavailable {
                    reason: e.to_string(),
                }
            }
        })?;
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet {
                category: category.to_string(),
            });
        }
        Self::start(config, ports, questions, duration_secs)
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.gate.status()
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.inner.questions
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.inner.clock.remaining()
    }

    /// Winning termination trigger, once there is one.
    pub fn trigger(&self) -> Option<TerminationTrigger> {
        *self.inner.trigger.lock()
    }

    /// Snapshot handed to grading, retained after termination.
    pub fn frozen_submission(&self) -> Option<SubmissionSnapshot> {
        self.inner.delivery.lock().frozen.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Wait for the latest delivery outcome without triggering termination.
    pub async fn wait_for_outcome(&self) -> SessionResult<GradedResult> {
        let mut rx = self.inner.outcome.subscribe();
        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map(|outcome| outcome.clone());
        match outcome {
            Ok(Some(result)) => result,
            _ => Err(SessionError::GradingUnavailable {
                reason: "session closed before an outcome was produced".to_string(),
            }),
        }
    }

    fn move_cursor(&self, target: impl FnOnce(usize) -> Option<usize>) -> bool {
        let mut attempt = self.inner.attempt.write();
        if !self.inner.gate.is_active() {
            debug!(session_id = %self.inner.id, "Navigation ignored; session not active");
            return false;
        }
        match target(attempt.cursor) {
            Some(index) if index < self.inner.questions.len() => {
                attempt.cursor = index;
                true
            }
            _ => false,
        }
    }

    fn mutate_ledger(
        &self,
        question_id: &QuestionId,
        op: &'static str,
        apply: impl FnOnce(&mut AnswerLedger),
    ) -> bool {
        if self.inner.questions.find(question_id).is_none() {
            warn!(session_id = %self.inner.id, question = %question_id, op, "Unknown question; ignored");
            return false;
        }
        let mut attempt = self.inner.attempt.write();
        if !self.inner.gate.is_active() {
            debug!(session_id = %self.inner.id, op, "Answer change ignored; session not active");
            return false;
        }
        apply(&mut attempt.ledger);
        true
    }
}

#[async_trait]
impl ProctoredSessionApi for SessionController {
    fn select_answer(&self, question_id: &QuestionId, option: &str) -> bool {
        let valid = self
            .inner
            .questions
            .find(question_id)
            .is_some_and(|q| q.has_option(option));
        if !valid {
            warn!(
                session_id = %self.inner.id,
                question = %question_id,
                option,
                "Option does not belong to question; ignored"
            );
            return false;
        }
        self.mutate_ledger(question_id, "select", |ledger| ledger.select(question_id, option))
    }

    fn clear_answer(&self, question_id: &QuestionId) -> bool {
        self.mutate_ledger(question_id, "clear", |ledger| ledger.clear(question_id))
    }

    fn toggle_mark(&self, question_id: &QuestionId) -> bool {
        self.mutate_ledger(question_id, "toggle_mark", |ledger| {
            ledger.toggle_mark(question_id);
        })
    }

    fn go_to(&self, index: usize) -> bool {
        self.move_cursor(|_| Some(index))
    }

    fn next(&self) -> bool {
        self.move_cursor(|cursor| cursor.checked_add(1))
    }

    fn previous(&self) -> bool {
        self.move_cursor(|cursor| cursor.checked_sub(1))
    }

    fn current_question(&self) -> Option<Question> {
        let cursor = self.inner.attempt.read().cursor;
        self.inner.questions.get(cursor).cloned()
    }

    async fn submit(&self) -> SessionResult<GradedResult> {
        if !self.inner.begin_termination(TerminationTrigger::ManualSubmit) {
            debug!(session_id = %self.inner.id, "Manual submit joined existing termination");
        }
        self.wait_for_outcome().await
    }

    async fn resubmit(&self) -> SessionResult<GradedResult> {
        match self.status() {
            SessionStatus::Active => return Err(SessionError::SessionStillActive),
            SessionStatus::Submitted => return self.wait_for_outcome().await,
            SessionStatus::Terminating => {}
        }

        let submission = {
            let mut delivery = self.inner.delivery.lock();
            if self.status() == SessionStatus::Submitted {
                None
            } else {
                // Terminating without a snapshot means the winner is still freezing
                let claimable = if delivery.in_flight {
                    None
                } else {
                    delivery.frozen.clone()
                };
                let Some(frozen) = claimable else {
                    return Err(SessionError::SubmissionInProgress);
                };
                delivery.in_flight = true;
                Some(frozen)
            }
        };
        let Some(submission) = submission else {
            return self.wait_for_outcome().await;
        };

        info!(session_id = %self.inner.id, "Manual resubmission of frozen snapshot");
        let outcome = self.inner.gateway.submit(&submission).await;
        self.inner.finish(outcome.clone());
        outcome
    }

    fn snapshot(&self) -> SessionSnapshot {
        let (answers, cursor) = {
            let attempt = self.inner.attempt.read();
            (attempt.ledger.snapshot(), attempt.cursor)
        };
        SessionSnapshot {
            session_id: self.inner.id,
            status: self.status(),
            current_question_index: cursor,
            remaining_seconds: self.inner.clock.remaining(),
            violations: self.inner.monitor.violations(),
            answers,
            trigger: self.trigger(),
        }
    }

    fn summary(&self) -> SessionSummary {
        let (answered, marked) = {
            let attempt = self.inner.attempt.read();
            (attempt.ledger.answered_count(), attempt.ledger.marked_count())
        };
        let total = self.inner.questions.len();
        SessionSummary {
            total,
            answered,
            marked,
            unanswered: total.saturating_sub(answered),
            remaining_seconds: self.inner.clock.remaining(),
            violations: self.inner.monitor.violation_count(),
        }
    }
}

impl SessionInner {
    /// The termination gate. Returns true only for the trigger that won.
    fn begin_termination(self: &Arc<Self>, trigger: TerminationTrigger) -> bool {
        if !self.gate.try_begin_termination() {
            debug!(session_id = %self.id, %trigger, "Termination already in progress; trigger ignored");
            return false;
        }
        *self.trigger.lock() = Some(trigger);
        metrics::record_termination(trigger.as_str());
        metrics::set_session_status(SessionStatus::Terminating);
        info!(session_id = %self.id, %trigger, "Session terminating");

        self.clock.stop();
        self.monitor.stop();

        // No ledger write can land after the gate flipped; see mutate_ledger.
        let answers = self.attempt.read().ledger.snapshot();
        let submission = SubmissionSnapshot {
            session_id: self.id,
            trigger,
            answers,
            violations: self.monitor.violations(),
            frozen_at: now_millis(),
        };
        {
            let mut delivery = self.delivery.lock();
            delivery.frozen = Some(submission.clone());
            delivery.in_flight = true;
        }
        self.emit(SessionEvent::TerminationStarted { trigger });

        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            let outcome = inner.deliver(&submission).await;
            inner.finish(outcome);
        });
        true
    }

    /// First attempt plus exactly one retry on a transient failure.
    async fn deliver(&self, submission: &SubmissionSnapshot) -> SessionResult<GradedResult> {
        match self.gateway.submit(submission).await {
            Err(e) if e.is_transient() => {
                warn!(session_id = %self.id, error = %e, attempt = 1, "Grading unavailable; retrying once");
                tokio::time::sleep(self.config.grading_retry_delay()).await;
                self.gateway.submit(submission).await.map_err(|e| {
                    if e.is_transient() {
                        SessionError::SubmissionExhausted {
                            attempts: AUTOMATIC_ATTEMPTS,
                            reason: e.to_string(),
                        }
                    } else {
                        e
                    }
                })
            }
            other => other,
        }
    }

    fn finish(&self, outcome: SessionResult<GradedResult>) {
        match &outcome {
            Ok(result) => {
                if self.gate.try_mark_submitted() {
                    metrics::set_session_status(SessionStatus::Submitted);
                }
                info!(
                    session_id = %self.id,
                    score = result.score,
                    correct = result.correct_count(),
                    "Session submitted"
                );
                self.emit(SessionEvent::Submitted {
                    result: result.clone(),
                });
            }
            Err(e) => {
                error!(
                    session_id = %self.id,
                    error = %e,
                    "Submission failed; frozen snapshot retained for resubmission"
                );
                self.emit(SessionEvent::SubmissionFailed { error: e.clone() });
            }
        }
        self.delivery.lock().in_flight = false;
        self.outcome.send_replace(Some(outcome));
    }

    fn on_tick(&self, remaining_seconds: u64) {
        debug!(session_id = %self.id, remaining_seconds, "Tick");
        self.emit(SessionEvent::Tick { remaining_seconds });
    }

    fn on_violation(&self, record: &ViolationRecord) {
        let total = self.monitor.violation_count();
        self.emit(SessionEvent::Violation {
            record: record.clone(),
            total,
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn clock_handlers(weak: &Weak<SessionInner>) -> ClockHandlers {
    let on_tick = weak.clone();
    let on_expire = weak.clone();
    ClockHandlers {
        on_tick: Arc::new(move |remaining| {
            if let Some(inner) = on_tick.upgrade() {
                inner.on_tick(remaining);
            }
        }),
        on_expire: Arc::new(move || {
            if let Some(inner) = on_expire.upgrade() {
                inner.begin_termination(TerminationTrigger::ClockExpired);
            }
        }),
    }
}

fn monitor_handlers(weak: &Weak<SessionInner>) -> MonitorHandlers {
    let on_violation = weak.clone();
    let on_escalate = weak.clone();
    MonitorHandlers {
        on_violation: Arc::new(move |record| {
            if let Some(inner) = on_violation.upgrade() {
                inner.on_violation(record);
            }
        }),
        on_escalate: Arc::new(move || {
            if let Some(inner) = on_escalate.upgrade() {
                inner.begin_termination(TerminationTrigger::IntegrityEscalation);
            }
        }),
    }
}
