//! Session status and the termination gate
//!
//! State Machine:
//! ```text
//! [ACTIVE] ──clock expiry──────────┐
//! [ACTIVE] ──monitor escalation────┼──→ [TERMINATING] ──gateway resolves──→ [SUBMITTED]
//! [ACTIVE] ──manual submit─────────┘
//! ```
//!
//! All three triggers race for a single compare-and-swap. The first to
//! observe `Active` flips the status; every later trigger sees a
//! non-`Active` status and does nothing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle status of one attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Terminating,
    Submitted,
}

impl SessionStatus {
    fn as_u8(self) -> u8 {
        match self {
            SessionStatus::Active => 0,
            SessionStatus::Terminating => 1,
            SessionStatus::Submitted => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionStatus::Active,
            1 => SessionStatus::Terminating,
            _ => SessionStatus::Submitted,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Active => "active",
            SessionStatus::Terminating => "terminating",
            SessionStatus::Submitted => "submitted",
        };
        f.write_str(name)
    }
}

/// What caused the session to leave `Active`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationTrigger {
    ClockExpired,
    IntegrityEscalation,
    ManualSubmit,
}

impl TerminationTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationTrigger::ClockExpired => "clock_expired",
            TerminationTrigger::IntegrityEscalation => "integrity_escalation",
            TerminationTrigger::ManualSubmit => "manual_submit",
        }
    }
}

impl fmt::Display for TerminationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-acquisition guard over the session status.
///
/// INVARIANT: status only moves forward, Active → Terminating → Submitted.
#[derive(Debug)]
pub struct StatusGate {
    status: AtomicU8,
}

impl StatusGate {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(SessionStatus::Active.as_u8()),
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn is_active(&self) -> bool {
        self.status() == SessionStatus::Active
    }

    /// Attempt Active → Terminating. Returns true for exactly one caller.
    pub fn try_begin_termination(&self) -> bool {
        self.transition(SessionStatus::Active, SessionStatus::Terminating)
    }

    /// Attempt Terminating → Submitted.
    pub fn try_mark_submitted(&self) -> bool {
        self.transition(SessionStatus::Terminating, SessionStatus::Submitted)
    }

    fn transition(&self, from: SessionStatus, to: SessionStatus) -> bool {
        self.status
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for StatusGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_forward_only() {
        let gate = StatusGate::new();
        assert!(gate.is_active());

        // Cannot skip Terminating
        assert!(!gate.try_mark_submitted());
        assert_eq!(gate.status(), SessionStatus::Active);

        assert!(gate.try_begin_termination());
        assert_eq!(gate.status(), SessionStatus::Terminating);
        assert!(!gate.try_begin_termination());

        assert!(gate.try_mark_submitted());
        assert_eq!(gate.status(), SessionStatus::Submitted);
        assert!(!gate.try_begin_termination());
        assert!(!gate.try_mark_submitted());
    }

    #[test]
    fn test_single_winner_under_contention() {
        let gate = Arc::new(StatusGate::new());
        let winners = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let winners = Arc::clone(&winners);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    if gate.try_begin_termination() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_trigger_names() {
        assert_eq!(TerminationTrigger::ClockExpired.to_string(), "clock_expired");
        assert_eq!(SessionStatus::Terminating.to_string(), "terminating");
    }
}
