//! Integrity Monitor
//!
//! Periodic capture → classify loop for one session.
//!
//! ```text
//! ┌──────── interval ────────┐
//! │                          ↓
//! │   capture ──timeout/err/null──→ inconclusive (skip, keep monitoring)
//! │      │
//! │   classify ──timeout/err──────→ inconclusive (skip, keep monitoring)
//! │      │
//! │   verdict ──clean─────────────→ next cycle
//! │      │
//! │   suspicious → record violation
//! │      │
//! └── count < threshold      count == threshold → escalate once, stop forever
//! ```
//!
//! Cycles run sequentially on one task, so at most one classification is in
//! flight. A cycle that outlasts the interval delays the next one instead of
//! overlapping it.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::guard::{invoke_handler, CallbackGuard};
use crate::config::SessionConfig;
use crate::domain::ViolationRecord;
use crate::error::{SessionError, SessionResult};
use crate::metrics;
use crate::ports::{CaptureSource, ClassificationService};

/// Receives each confirmed violation as it is recorded.
pub type ViolationHandler = Arc<dyn Fn(&ViolationRecord) + Send + Sync>;

/// Fires once when the violation count reaches the threshold.
pub type EscalationHandler = Arc<dyn Fn() + Send + Sync>;

/// Callbacks driven by the monitor
#[derive(Clone)]
pub struct MonitorHandlers {
    pub on_violation: ViolationHandler,
    pub on_escalate: EscalationHandler,
}

/// Timing and tolerance for the monitor loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub threshold: u32,
    pub capture_timeout: Duration,
    pub classify_timeout: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            interval: config.monitor_interval(),
            threshold: config.violation_threshold,
            capture_timeout: config.capture_timeout(),
            classify_timeout: config.classify_timeout(),
        }
    }
}

#[derive(Debug, Default)]
struct MonitorStats {
    cycles: AtomicU64,
    inconclusive: AtomicU64,
    escalated: AtomicBool,
}

/// Background integrity monitor owned by one session
pub struct IntegrityMonitor {
    settings: MonitorSettings,
    capture: Arc<dyn CaptureSource>,
    classifier: Arc<dyn ClassificationService>,
    violations: Arc<RwLock<Vec<ViolationRecord>>>,
    stats: Arc<MonitorStats>,
    guard: Arc<CallbackGuard>,
    stop_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IntegrityMonitor {
    pub fn new(
        settings: MonitorSettings,
        capture: Arc<dyn CaptureSource>,
        classifier: Arc<dyn ClassificationService>,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            settings,
            capture,
            classifier,
            violations: Arc::new(RwLock::new(Vec::new())),
            stats: Arc::new(MonitorStats::default()),
            guard: Arc::new(CallbackGuard::new()),
            stop_tx,
            task: Mutex::new(None),
        }
    }

    /// Start the monitoring loop. The first cycle runs one interval after start.
    pub fn start(&self, handlers: MonitorHandlers) -> SessionResult<()> {
        if self.settings.threshold == 0 || self.settings.interval.is_zero() {
            return Err(SessionError::InvalidConfig {
                reason: "monitor needs a non-zero threshold and interval".to_string(),
            });
        }
        let runtime = Handle::try_current().map_err(|_| SessionError::RuntimeUnavailable)?;

        let mut task = self.task.lock();
        if task.is_some() || self.guard.is_stopped() {
            return Err(SessionError::InvalidConfig {
                reason: "monitor already started".to_string(),
            });
        }

        let worker = MonitorWorker {
            settings: self.settings,
            capture: Arc::clone(&self.capture),
            classifier: Arc::clone(&self.classifier),
            violations: Arc::clone(&self.violations),
            stats: Arc::clone(&self.stats),
            guard: Arc::clone(&self.guard),
            handlers,
        };
        *task = Some(runtime.spawn(worker.run(self.stop_tx.subscribe())));
        Ok(())
    }

    /// Stop monitoring. Idempotent, safe with no cycle pending, and safe to
    /// call from inside a handler. An in-flight cycle is abandoned.
    pub fn stop(&self) {
        if self.guard.stop() {
            debug!(
                violations = self.violation_count(),
                cycles = self.cycles_run(),
                "Integrity monitor stopped"
            );
        }
        self.stop_tx.send_replace(true);
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Copy of the violation log.
    pub fn violations(&self) -> Vec<ViolationRecord> {
        self.violations.read().clone()
    }

    pub fn violation_count(&self) -> usize {
        self.violations.read().len()
    }

    pub fn cycles_run(&self) -> u64 {
        self.stats.cycles.load(Ordering::Acquire)
    }

    pub fn inconclusive_cycles(&self) -> u64 {
        self.stats.inconclusive.load(Ordering::Acquire)
    }

    pub fn is_escalated(&self) -> bool {
        self.stats.escalated.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.guard.is_stopped()
    }
}

impl Drop for IntegrityMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

struct MonitorWorker {
    settings: MonitorSettings,
    capture: Arc<dyn CaptureSource>,
    classifier: Arc<dyn ClassificationService>,
    violations: Arc<RwLock<Vec<ViolationRecord>>>,
    stats: Arc<MonitorStats>,
    guard: Arc<CallbackGuard>,
    handlers: MonitorHandlers,
}

impl MonitorWorker {
    async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let period = self.settings.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            let verdict = tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                verdict = self.cycle() => verdict,
            };
            let cycle = self.stats.cycles.fetch_add(1, Ordering::AcqRel) + 1;

            match verdict {
                Err(e) => {
                    self.stats.inconclusive.fetch_add(1, Ordering::AcqRel);
                    metrics::record_inconclusive_cycle();
                    warn!(cycle, error = %e, "Monitor cycle inconclusive; skipping");
                }
                Ok(None) => {
                    debug!(cycle, "Monitor cycle clean");
                }
                Ok(Some(record)) => {
                    if !self.record_violation(cycle, record) {
                        break;
                    }
                }
            }
        }
    }

    /// One capture + classify round trip.
    ///
    /// `Ok(None)` is a clean verdict, `Ok(Some)` a confirmed violation and
    /// `Err` an inconclusive cycle.
    async fn cycle(&self) -> SessionResult<Option<ViolationRecord>> {
        let sample = match timeout(self.settings.capture_timeout, self.capture.capture_frame()).await {
            Err(_) => return Err(inconclusive("capture timed out")),
            Ok(Err(e)) => return Err(inconclusive(&e.to_string())),
            Ok(Ok(None)) => return Err(inconclusive("no frame captured")),
            Ok(Ok(Some(sample))) if sample.is_empty() => {
                return Err(inconclusive("empty frame captured"))
            }
            Ok(Ok(Some(sample))) => sample,
        };

        match timeout(self.settings.classify_timeout, self.classifier.classify(&sample)).await {
            Err(_) => Err(inconclusive("classification timed out")),
            Ok(Err(e)) => Err(inconclusive(&e.to_string())),
            Ok(Ok(verdict)) if verdict.is_suspicious => {
                Ok(Some(ViolationRecord::from_verdict(verdict, &sample)))
            }
            Ok(Ok(_)) => Ok(None),
        }
    }

    /// Append a violation and escalate at the threshold.
    ///
    /// Returns false when the loop must end: escalated, or stopped while the
    /// verdict was in flight.
    fn record_violation(&self, cycle: u64, record: ViolationRecord) -> bool {
        let mut escalated = false;
        let accepted = self.guard.run(|| {
            let total = {
                let mut log = self.violations.write();
                log.push(record.clone());
                log.len()
            };
            metrics::record_violation();
            warn!(cycle, total, reason = %record.reason, "Integrity violation recorded");
            invoke_handler("on_violation", || (self.handlers.on_violation)(&record));

            if total >= self.settings.threshold as usize {
                escalated = true;
                self.stats.escalated.store(true, Ordering::Release);
                self.guard.stop();
                warn!(total, threshold = self.settings.threshold, "Violation threshold reached; escalating");
                invoke_handler("on_escalate", || (self.handlers.on_escalate)());
            }
        });
        accepted && !escalated
    }
}

fn inconclusive(reason: &str) -> SessionError {
    SessionError::ClassificationInconclusive {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{CaptureStep, ClassifyStep, ScriptedCapture, ScriptedClassifier};
    use std::sync::atomic::AtomicUsize;

    fn settings(threshold: u32) -> MonitorSettings {
        MonitorSettings {
            interval: Duration::from_secs(30),
            threshold,
            capture_timeout: Duration::from_secs(5),
            classify_timeout: Duration::from_secs(10),
        }
    }

    fn counting_handlers() -> (Arc<AtomicUsize>, Arc<AtomicUsize>, MonitorHandlers) {
        let seen = Arc::new(AtomicUsize::new(0));
        let escalations = Arc::new(AtomicUsize::new(0));
        let handlers = MonitorHandlers {
            on_violation: {
                let seen = Arc::clone(&seen);
                Arc::new(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                })
            },
            on_escalate: {
                let escalations = Arc::clone(&escalations);
                Arc::new(move || {
                    escalations.fetch_add(1, Ordering::SeqCst);
                })
            },
        };
        (seen, escalations, handlers)
    }

    fn suspicious() -> ClassifyStep {
        ClassifyStep::Suspicious("looking away".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalates_on_third_confirmed_violation_not_third_cycle() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![
            suspicious(),
            ClassifyStep::Fail,
            suspicious(),
            suspicious(),
        ]));
        let monitor = IntegrityMonitor::new(
            settings(3),
            Arc::new(ScriptedCapture::default()),
            classifier.clone(),
        );
        let (seen, escalations, handlers) = counting_handlers();
        monitor.start(handlers).unwrap();

        // After three cycles: two violations, no escalation yet
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(monitor.cycles_run(), 3);
        assert_eq!(escalations.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(escalations.load(Ordering::SeqCst), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(monitor.violation_count(), 3);
        assert_eq!(monitor.inconclusive_cycles(), 1);
        assert!(monitor.is_escalated());

        // Scheduling stops permanently
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(classifier.calls(), 4);
        assert_eq!(escalations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_null_and_failed_captures_are_inconclusive() {
        let capture = Arc::new(ScriptedCapture::new(vec![
            CaptureStep::Null,
            CaptureStep::Fail,
        ]));
        let classifier = Arc::new(ScriptedClassifier::new(vec![suspicious()]));
        let monitor = IntegrityMonitor::new(settings(3), capture.clone(), classifier.clone());
        let (_seen, _escalations, handlers) = counting_handlers();
        monitor.start(handlers).unwrap();

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(capture.calls(), 3);
        // Classifier only reached on the third cycle
        assert_eq!(classifier.calls(), 1);
        assert_eq!(monitor.inconclusive_cycles(), 2);
        assert_eq!(monitor.violation_count(), 1);
        assert!(!monitor.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_classification_timeout_is_inconclusive() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![ClassifyStep::Hang, suspicious()]));
        let monitor = IntegrityMonitor::new(
            settings(1),
            Arc::new(ScriptedCapture::default()),
            classifier.clone(),
        );
        let (_seen, escalations, handlers) = counting_handlers();
        monitor.start(handlers).unwrap();

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(monitor.inconclusive_cycles(), 1);
        assert_eq!(escalations.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(escalations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_cycle_defers_next_instead_of_overlapping() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![
            ClassifyStep::Slow(Duration::from_secs(8)),
            ClassifyStep::Slow(Duration::from_secs(8)),
            ClassifyStep::Slow(Duration::from_secs(8)),
        ]));
        let mut short = settings(3);
        short.interval = Duration::from_secs(5);
        let monitor = IntegrityMonitor::new(short, Arc::new(ScriptedCapture::default()), classifier.clone());
        let (_seen, _escalations, handlers) = counting_handlers();
        monitor.start(handlers).unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(classifier.calls() >= 3);
        assert_eq!(classifier.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_abandons_in_flight_cycle() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![ClassifyStep::Slow(
            Duration::from_secs(5),
        )]));
        let mut s = settings(1);
        s.classify_timeout = Duration::from_secs(60);
        let monitor = IntegrityMonitor::new(s, Arc::new(ScriptedCapture::default()), classifier.clone());
        let (seen, escalations, handlers) = counting_handlers();
        monitor.start(handlers).unwrap();

        tokio::time::sleep(Duration::from_secs(32)).await;
        assert_eq!(classifier.calls(), 1);
        monitor.stop();
        monitor.stop();

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(classifier.calls(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(escalations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let monitor = IntegrityMonitor::new(
            settings(3),
            Arc::new(ScriptedCapture::default()),
            Arc::new(ScriptedClassifier::default()),
        );
        monitor.stop();
        let (_seen, _escalations, handlers) = counting_handlers();
        assert!(monitor.start(handlers).is_err());
    }
}
