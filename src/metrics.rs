//! Pipeline counters
//!
//! An explicitly owned counter object shared by the pipeline and its
//! operators. No global state: callers construct a `GuidanceMetrics`,
//! hand clones of the `Arc` to whoever needs it, and read snapshots.

use crate::types::GuideState;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Counters {
    frames_analyzed: u64,
    frames_dropped: u64,
    detection_attempts: u64,
    detection_hits: u64,
    validations_by_state: HashMap<GuideState, u64>,
    preprocessing_runs: u64,
}

/// Counters for one pipeline instance.
#[derive(Debug, Default)]
pub struct GuidanceMetrics {
    counters: Mutex<Counters>,
}

/// Point-in-time copy of the counters, serializable for diagnostics
/// screens and logs.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub frames_analyzed: u64,
    pub frames_dropped: u64,
    pub detection_attempts: u64,
    pub detection_hits: u64,
    pub validations_by_state: HashMap<GuideState, u64>,
    pub preprocessing_runs: u64,
}

impl MetricsSnapshot {
    /// Fraction of analyzed frames where a mole was found.
    pub fn detection_rate(&self) -> f64 {
        if self.detection_attempts == 0 {
            return 0.0;
        }
        self.detection_hits as f64 / self.detection_attempts as f64
    }
}

impl GuidanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame_analyzed(&self) {
        self.lock().frames_analyzed += 1;
    }

    pub fn record_frame_dropped(&self) {
        self.lock().frames_dropped += 1;
    }

    pub fn record_detection(&self, hit: bool) {
        let mut c = self.lock();
        c.detection_attempts += 1;
        if hit {
            c.detection_hits += 1;
        }
    }

    pub fn record_validation(&self, state: GuideState) {
        *self.lock().validations_by_state.entry(state).or_insert(0) += 1;
    }

    pub fn record_preprocessing_run(&self) {
        self.lock().preprocessing_runs += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = self.lock();
        MetricsSnapshot {
            frames_analyzed: c.frames_analyzed,
            frames_dropped: c.frames_dropped,
            detection_attempts: c.detection_attempts,
            detection_hits: c.detection_hits,
            validations_by_state: c.validations_by_state.clone(),
            preprocessing_runs: c.preprocessing_runs,
        }
    }

    pub fn reset(&self) {
        *self.lock() = Counters::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|p| p.into_inner())
    }
}
