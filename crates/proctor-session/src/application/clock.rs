//! Countdown Clock
//!
//! Ticks once per `tick_interval`, decrementing the remaining seconds and
//! reporting each value through `on_tick`. When the count reaches zero it
//! fires `on_expire` once and never ticks again.
//!
//! `stop()` is idempotent and synchronously effective: after it returns,
//! neither handler fires, even if a tick was already due.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::guard::{invoke_handler, CallbackGuard};
use crate::error::{SessionError, SessionResult};

/// Receives the remaining seconds after each tick.
pub type TickHandler = Arc<dyn Fn(u64) + Send + Sync>;

/// Fires once when the countdown reaches zero.
pub type ExpireHandler = Arc<dyn Fn() + Send + Sync>;

/// Callbacks driven by the clock
#[derive(Clone)]
pub struct ClockHandlers {
    pub on_tick: TickHandler,
    pub on_expire: ExpireHandler,
}

/// Independent countdown timer owned by one session
pub struct CountdownClock {
    tick_interval: Duration,
    remaining: Arc<AtomicU64>,
    guard: Arc<CallbackGuard>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CountdownClock {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            remaining: Arc::new(AtomicU64::new(0)),
            guard: Arc::new(CallbackGuard::new()),
            task: Mutex::new(None),
        }
    }

    /// Start counting down from `duration_secs`.
    ///
    /// A clock runs at most once; starting it again, or after `stop()`, is
    /// rejected.
    pub fn start(&self, duration_secs: u64, handlers: ClockHandlers) -> SessionResult<()> {
        if duration_secs == 0 {
            return Err(SessionError::InvalidConfig {
                reason: "duration must be at least one second".to_string(),
            });
        }
        let runtime = Handle::try_current().map_err(|_| SessionError::RuntimeUnavailable)?;

        let mut task = self.task.lock();
        if task.is_some() || self.guard.is_stopped() {
            return Err(SessionError::InvalidConfig {
                reason: "clock already started".to_string(),
            });
        }

        self.remaining.store(duration_secs, Ordering::Release);
        let remaining = Arc::clone(&self.remaining);
        let guard = Arc::clone(&self.guard);
        let period = self.tick_interval;

        *task = Some(runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let mut expired = false;
                let ran = guard.run(|| {
                    let left = remaining.load(Ordering::Acquire).saturating_sub(1);
                    remaining.store(left, Ordering::Release);
                    invoke_handler("on_tick", || (handlers.on_tick)(left));

                    if left == 0 {
                        expired = true;
                        guard.stop();
                        invoke_handler("on_expire", || (handlers.on_expire)());
                    }
                });

                if !ran || expired {
                    debug!(expired, "Countdown loop finished");
                    break;
                }
            }
        }));

        Ok(())
    }

    /// Stop the clock. Safe to call repeatedly, before start, or from a handler.
    pub fn stop(&self) {
        if self.guard.stop() {
            debug!(remaining = self.remaining(), "Countdown stopped");
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Seconds left on the clock.
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.guard.is_stopped()
    }
}

impl Drop for CountdownClock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Recorder {
        ticks: Arc<Mutex<Vec<u64>>>,
        expiries: Arc<AtomicUsize>,
    }

    fn recorder() -> (Recorder, ClockHandlers) {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let expiries = Arc::new(AtomicUsize::new(0));
        let handlers = ClockHandlers {
            on_tick: {
                let ticks = Arc::clone(&ticks);
                Arc::new(move |left| ticks.lock().push(left))
            },
            on_expire: {
                let expiries = Arc::clone(&expiries);
                Arc::new(move || {
                    expiries.fetch_add(1, Ordering::SeqCst);
                })
            },
        };
        (Recorder { ticks, expiries }, handlers)
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_and_expires_once() {
        let clock = CountdownClock::new(Duration::from_secs(1));
        let (recorder, handlers) = recorder();
        clock.start(5, handlers).unwrap();

        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(*recorder.ticks.lock(), vec![4, 3, 2, 1, 0]);
        assert_eq!(recorder.expiries.load(Ordering::SeqCst), 1);
        assert_eq!(clock.remaining(), 0);
        assert!(clock.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_suppresses_pending_tick() {
        let clock = CountdownClock::new(Duration::from_secs(1));
        let (recorder, handlers) = recorder();
        clock.start(10, handlers).unwrap();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        clock.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(*recorder.ticks.lock(), vec![9, 8]);
        assert_eq!(recorder.expiries.load(Ordering::SeqCst), 0);
        assert_eq!(clock.remaining(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let clock = CountdownClock::new(Duration::from_secs(1));
        clock.stop();
        clock.stop();
        let (_recorder, handlers) = recorder();
        assert!(clock.start(3, handlers).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_tick_handler_keeps_ticking() {
        let clock = CountdownClock::new(Duration::from_secs(1));
        let expiries = Arc::new(AtomicUsize::new(0));
        let handlers = ClockHandlers {
            on_tick: Arc::new(|_| panic!("ui bug")),
            on_expire: {
                let expiries = Arc::clone(&expiries);
                Arc::new(move || {
                    expiries.fetch_add(1, Ordering::SeqCst);
                })
            },
        };
        clock.start(3, handlers).unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(expiries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_duration_rejected() {
        let clock = CountdownClock::new(Duration::from_secs(1));
        let (_recorder, handlers) = recorder();
        let err = clock.start(0, handlers).unwrap_err();
        assert!(err.is_startup_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_rejected() {
        let clock = CountdownClock::new(Duration::from_secs(1));
        let (_p1, first) = recorder();
        let (_p2, second) = recorder();
        clock.start(3, first).unwrap();
        assert!(clock.start(3, second).is_err());
    }
}
