//! Simulated proctoring collaborators
//!
//! Stand-ins for a real camera and anti-cheat classifier so the host can run
//! a full session on any machine. The classifier is seeded, so a given seed
//! always produces the same verdict sequence.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use proctor_session::{
    CaptureSource, ClassificationService, Sample, SessionResult, Verdict,
};

const SUSPICION_REASONS: &[&str] = &[
    "multiple faces detected",
    "candidate left the frame",
    "gaze away from screen",
    "phone detected",
];

/// Capture source with no device attached. Every cycle is inconclusive.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCapture;

#[async_trait]
impl CaptureSource for NullCapture {
    async fn capture_frame(&self) -> SessionResult<Option<Sample>> {
        Ok(None)
    }
}

/// Capture source producing random frames of a fixed size.
pub struct SimulatedCamera {
    frame_size: usize,
    rng: Mutex<StdRng>,
}

impl SimulatedCamera {
    pub fn new(frame_size: usize, seed: u64) -> Self {
        Self {
            frame_size,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl CaptureSource for SimulatedCamera {
    async fn capture_frame(&self) -> SessionResult<Option<Sample>> {
        let mut data = vec![0u8; self.frame_size];
        self.rng.lock().fill(&mut data[..]);
        Ok(Some(Sample::new(data)))
    }
}

/// Classifier flagging each sample as suspicious with a fixed probability.
pub struct SimulatedClassifier {
    suspicion_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedClassifier {
    /// `suspicion_rate` is clamped to `[0, 1]`; NaN and infinities count as 0.
    pub fn new(suspicion_rate: f64, seed: u64) -> Self {
        let suspicion_rate = if suspicion_rate.is_finite() {
            suspicion_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            suspicion_rate,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl ClassificationService for SimulatedClassifier {
    async fn classify(&self, sample: &Sample) -> SessionResult<Verdict> {
        let mut rng = self.rng.lock();
        if !rng.gen_bool(self.suspicion_rate) {
            return Ok(Verdict::clean());
        }
        let reason = SUSPICION_REASONS[rng.gen_range(0..SUSPICION_REASONS.len())];
        let evidence = format!("sim-{}-{:08x}", sample.captured_at, rng.gen::<u32>());
        debug!(reason, evidence = %evidence, "Simulated suspicious verdict");
        Ok(Verdict::suspicious(reason, Some(evidence)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_capture_yields_nothing() {
        assert!(NullCapture.capture_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_camera_frame_size() {
        let camera = SimulatedCamera::new(64, 7);
        let sample = camera.capture_frame().await.unwrap().unwrap();
        assert_eq!(sample.data.len(), 64);
    }

    #[tokio::test]
    async fn test_non_finite_rate_never_suspicious() {
        let sample = Sample::new(vec![4, 5, 6]);
        for rate in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let classifier = SimulatedClassifier::new(rate, 3);
            for _ in 0..10 {
                assert!(!classifier.classify(&sample).await.unwrap().is_suspicious);
            }
        }
    }

    #[tokio::test]
    async fn test_classifier_extremes() {
        let sample = Sample::new(vec![1, 2, 3]);

        let never = SimulatedClassifier::new(0.0, 1);
        let always = SimulatedClassifier::new(1.0, 1);
        for _ in 0..20 {
            assert!(!never.classify(&sample).await.unwrap().is_suspicious);
            let verdict = always.classify(&sample).await.unwrap();
            assert!(verdict.is_suspicious);
            assert!(verdict.evidence_ref.is_some());
        }
    }

    #[tokio::test]
    async fn test_same_seed_same_verdicts() {
        let sample = Sample::new(vec![9; 8]);
        let a = SimulatedClassifier::new(0.5, 42);
        let b = SimulatedClassifier::new(0.5, 42);
        for _ in 0..10 {
            assert_eq!(
                a.classify(&sample).await.unwrap().is_suspicious,
                b.classify(&sample).await.unwrap().is_suspicious
            );
        }
    }
}
