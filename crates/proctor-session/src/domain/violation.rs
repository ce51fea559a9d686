//! Integrity monitoring values: captured samples, verdicts and violations

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One captured frame handed to the classifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub data: Vec<u8>,
    pub captured_at: u64,
}

impl Sample {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            captured_at: now_millis(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Classification verdict for one sample
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_suspicious: bool,
    pub reason: String,
    pub evidence_ref: Option<String>,
}

impl Verdict {
    pub fn clean() -> Self {
        Self {
            is_suspicious: false,
            reason: String::new(),
            evidence_ref: None,
        }
    }

    pub fn suspicious(reason: impl Into<String>, evidence_ref: Option<String>) -> Self {
        Self {
            is_suspicious: true,
            reason: reason.into(),
            evidence_ref,
        }
    }
}

/// A confirmed violation. Append-only; produced solely by the integrity monitor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub reason: String,
    pub captured_at: u64,
    pub evidence_ref: Option<String>,
}

impl ViolationRecord {
    pub fn from_verdict(verdict: Verdict, sample: &Sample) -> Self {
        Self {
            reason: verdict.reason,
            captured_at: sample.captured_at,
            evidence_ref: verdict.evidence_ref,
        }
    }
}
