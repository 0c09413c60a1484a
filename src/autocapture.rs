//! Auto-capture countdown state machine
//!
//! Watches the stream of validation results. After enough consecutive
//! capture-ready results, a cancellable countdown starts; each tick fires an
//! observer callback, and at zero the capture callback fires exactly once.
//! Any non-ready result during the countdown cancels it.
//!
//! Cancellation is synchronous with respect to subsequent calls: a
//! generation counter is bumped under the state lock, and the countdown task
//! checks it and delivers each callback while still holding that lock.
//! Cancellation and callback delivery are therefore mutually exclusive, and
//! once a cancelling call returns, no stale tick or trigger can fire. The
//! flip side: tick and capture observers must not call back into the
//! manager.

use crate::errors::GuidanceError;
use crate::types::ValidationResult;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCaptureConfig {
    /// Countdown start value in seconds.
    pub countdown_start: u32,
    /// Real time per countdown tick. One second in production; tests shrink
    /// it.
    pub tick_interval_ms: u64,
    /// Consecutive capture-ready results required before the countdown
    /// starts. One green frame in a noisy stream should not arm a capture.
    pub required_stable_frames: u32,
}

impl Default for AutoCaptureConfig {
    fn default() -> Self {
        Self {
            countdown_start: 3,
            tick_interval_ms: 1000,
            required_stable_frames: 3,
        }
    }
}

impl AutoCaptureConfig {
    pub fn validate(&self) -> Result<(), GuidanceError> {
        if self.countdown_start == 0 {
            return Err(GuidanceError::InvalidConfig(
                "countdown_start must be at least 1".to_string(),
            ));
        }
        if self.required_stable_frames == 0 {
            return Err(GuidanceError::InvalidConfig(
                "required_stable_frames must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Observable auto-capture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    /// Countdown in progress; holds the seconds remaining.
    Countdown(u32),
    /// Capture callback in flight; returns to `Idle` when it completes.
    Triggered,
}

type TickCallback = Arc<dyn Fn(u32) + Send + Sync>;
type EventCallback = Arc<dyn Fn() + Send + Sync>;

struct Inner {
    state: CaptureState,
    generation: u64,
    ready_streak: u32,
    task: Option<JoinHandle<()>>,
    on_tick: Option<TickCallback>,
    on_capture: Option<EventCallback>,
    on_cancelled: Option<EventCallback>,
}

/// Drives the IDLE → COUNTDOWN → TRIGGERED → IDLE cycle.
///
/// `on_validation_result` must be called from within a tokio runtime; the
/// countdown runs on a spawned task.
pub struct AutoCaptureManager {
    config: AutoCaptureConfig,
    inner: Arc<Mutex<Inner>>,
}

impl AutoCaptureManager {
    pub fn new(config: AutoCaptureConfig) -> Result<Self, GuidanceError> {
        config.validate()?;
        Ok(Self {
            config,
            inner: Arc::new(Mutex::new(Inner {
                state: CaptureState::Idle,
                generation: 0,
                ready_streak: 0,
                task: None,
                on_tick: None,
                on_capture: None,
                on_cancelled: None,
            })),
        })
    }

    pub fn config(&self) -> &AutoCaptureConfig {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        self.lock().state
    }

    /// Register the per-tick observer; invoked once per countdown second,
    /// with the manager's state lock held. It must not call back into the
    /// manager.
    pub fn set_on_tick(&self, callback: impl Fn(u32) + Send + Sync + 'static) {
        self.lock().on_tick = Some(Arc::new(callback));
    }

    /// Register the capture trigger; invoked exactly once per completed
    /// countdown, with the manager's state lock held. It must not call back
    /// into the manager.
    pub fn set_on_capture(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.lock().on_capture = Some(Arc::new(callback));
    }

    /// Register the cancellation observer.
    pub fn set_on_cancelled(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.lock().on_cancelled = Some(Arc::new(callback));
    }

    pub fn clear_callbacks(&self) {
        let mut inner = self.lock();
        inner.on_tick = None;
        inner.on_capture = None;
        inner.on_cancelled = None;
    }

    /// Feed one validation result into the state machine.
    pub fn on_validation_result(&self, result: &ValidationResult) {
        let cancelled_cb = {
            let mut inner = self.lock();

            if result.can_capture {
                if inner.state == CaptureState::Idle {
                    inner.ready_streak += 1;
                    if inner.ready_streak >= self.config.required_stable_frames {
                        self.start_countdown(&mut inner);
                    }
                }
                None
            } else {
                inner.ready_streak = 0;
                if matches!(inner.state, CaptureState::Countdown(_)) {
                    inner.generation += 1;
                    if let Some(task) = inner.task.take() {
                        task.abort();
                    }
                    inner.state = CaptureState::Idle;
                    log::debug!(
                        "auto-capture countdown cancelled: {:?}",
                        result.failure_reason
                    );
                    inner.on_cancelled.clone()
                } else {
                    None
                }
            }
        };

        if let Some(cb) = cancelled_cb {
            cb();
        }
    }

    /// Force back to IDLE, cancelling any countdown without firing the
    /// cancellation observer. For teardown.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.state = CaptureState::Idle;
        inner.ready_streak = 0;
    }

    fn start_countdown(&self, inner: &mut MutexGuard<'_, Inner>) {
        inner.generation += 1;
        let generation = inner.generation;
        inner.state = CaptureState::Countdown(self.config.countdown_start);

        let shared = Arc::clone(&self.inner);
        let start = self.config.countdown_start;
        let interval = Duration::from_millis(self.config.tick_interval_ms);
        log::info!("auto-capture countdown started from {}", start);

        inner.task = Some(tokio::spawn(async move {
            // Callbacks run while the state lock is held: a cancelling call
            // cannot return between the generation check and the callback,
            // so a cancelled countdown never fires a stale tick or trigger.
            // The registered observers must not call back into the manager.
            for remaining in (1..=start).rev() {
                {
                    let mut g = shared.lock().unwrap_or_else(|p| p.into_inner());
                    if g.generation != generation {
                        return;
                    }
                    g.state = CaptureState::Countdown(remaining);
                    if let Some(cb) = g.on_tick.clone() {
                        cb(remaining);
                    }
                }
                tokio::time::sleep(interval).await;
            }

            let mut g = shared.lock().unwrap_or_else(|p| p.into_inner());
            if g.generation != generation {
                return;
            }
            g.state = CaptureState::Triggered;
            log::info!("auto-capture triggered");
            if let Some(cb) = g.on_capture.clone() {
                cb();
            }
            g.state = CaptureState::Idle;
            g.ready_streak = 0;
            g.task = None;
        }));
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Drop for AutoCaptureManager {
    fn drop(&mut self) {
        if let Some(task) = self.lock().task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GuideState, ValidationFailureReason, ValidationResult};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ready_result() -> ValidationResult {
        ValidationResult {
            can_capture: true,
            guide_state: GuideState::Ready,
            message: GuideState::Ready.default_message().to_string(),
            confidence: 0.9,
            failure_reason: None,
            distance_from_center: 5.0,
            mole_area_ratio: 0.4,
        }
    }

    fn not_ready_result() -> ValidationResult {
        ValidationResult {
            can_capture: false,
            guide_state: GuideState::Centering,
            message: GuideState::Centering.default_message().to_string(),
            confidence: 0.9,
            failure_reason: Some(ValidationFailureReason::NotCentered),
            distance_from_center: 120.0,
            mole_area_ratio: 0.4,
        }
    }

    fn fast_config() -> AutoCaptureConfig {
        AutoCaptureConfig {
            countdown_start: 2,
            tick_interval_ms: 20,
            required_stable_frames: 1,
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AutoCaptureConfig {
            countdown_start: 0,
            ..Default::default()
        };
        assert!(AutoCaptureManager::new(config).is_err());
    }

    #[tokio::test]
    async fn test_countdown_triggers_capture() {
        let manager = AutoCaptureManager::new(fast_config()).unwrap();
        let ticks = Arc::new(AtomicU32::new(0));
        let captures = Arc::new(AtomicU32::new(0));

        let t = Arc::clone(&ticks);
        manager.set_on_tick(move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        });
        let c = Arc::clone(&captures);
        manager.set_on_capture(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        manager.on_validation_result(&ready_result());
        assert!(matches!(manager.state(), CaptureState::Countdown(_)));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert_eq!(captures.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_not_ready_cancels_countdown() {
        let manager = AutoCaptureManager::new(AutoCaptureConfig {
            countdown_start: 5,
            tick_interval_ms: 30,
            required_stable_frames: 1,
        })
        .unwrap();
        let captures = Arc::new(AtomicU32::new(0));
        let cancels = Arc::new(AtomicU32::new(0));

        let c = Arc::clone(&captures);
        manager.set_on_capture(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let x = Arc::clone(&cancels);
        manager.set_on_cancelled(move || {
            x.fetch_add(1, Ordering::SeqCst);
        });

        manager.on_validation_result(&ready_result());
        tokio::time::sleep(Duration::from_millis(40)).await;
        manager.on_validation_result(&not_ready_result());
        assert_eq!(manager.state(), CaptureState::Idle);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);

        // A cancelled countdown never completes.
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(captures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_requires_stable_frames() {
        let manager = AutoCaptureManager::new(AutoCaptureConfig {
            countdown_start: 2,
            tick_interval_ms: 20,
            required_stable_frames: 3,
        })
        .unwrap();

        manager.on_validation_result(&ready_result());
        manager.on_validation_result(&ready_result());
        assert_eq!(manager.state(), CaptureState::Idle);

        // A non-ready frame resets the streak.
        manager.on_validation_result(&not_ready_result());
        manager.on_validation_result(&ready_result());
        manager.on_validation_result(&ready_result());
        assert_eq!(manager.state(), CaptureState::Idle);

        manager.on_validation_result(&ready_result());
        assert!(matches!(manager.state(), CaptureState::Countdown(_)));
    }

    #[tokio::test]
    async fn test_reset_is_silent() {
        let manager = AutoCaptureManager::new(fast_config()).unwrap();
        let cancels = Arc::new(AtomicU32::new(0));
        let x = Arc::clone(&cancels);
        manager.set_on_cancelled(move || {
            x.fetch_add(1, Ordering::SeqCst);
        });

        manager.on_validation_result(&ready_result());
        manager.reset();
        assert_eq!(manager.state(), CaptureState::Idle);
        assert_eq!(cancels.load(Ordering::SeqCst), 0);
    }
}
