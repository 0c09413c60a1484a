//! Guidance feedback helpers
//!
//! Turns the per-frame validation stream into user-facing side effects:
//! state transition events for overlay updates and a haptic pulse policy.
//! The validator itself stays pure; everything stateful about feedback
//! lives here.

use crate::types::GuideState;
use serde::{Deserialize, Serialize};

/// Deduplicates the per-frame guide state stream into transition events.
///
/// Overlay colors and messages only need to change when the state does,
/// and haptics must fire once per transition, not thirty times a second.
#[derive(Debug, Default)]
pub struct StateTransitionNotifier {
    last_state: Option<GuideState>,
}

impl StateTransitionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame's state. Returns `Some(state)` only when it differs
    /// from the previous frame's state; the first observed state always
    /// counts as a transition.
    pub fn observe(&mut self, state: GuideState) -> Option<GuideState> {
        if self.last_state == Some(state) {
            return None;
        }
        log::debug!("guide state transition: {:?} -> {:?}", self.last_state, state);
        self.last_state = Some(state);
        Some(state)
    }

    pub fn current(&self) -> Option<GuideState> {
        self.last_state
    }

    /// Forget the last state, e.g. when the camera session restarts.
    pub fn reset(&mut self) {
        self.last_state = None;
    }
}

/// When to pulse the vibrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapticPolicy {
    pub enabled: bool,
    /// Whether the device reports a vibrator at all.
    pub has_vibrator: bool,
}

impl Default for HapticPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            has_vibrator: true,
        }
    }
}

impl HapticPolicy {
    /// A short confirmation pulse fires exactly when the guide transitions
    /// into `Ready`.
    pub fn should_pulse(&self, transition: Option<GuideState>) -> bool {
        self.enabled && self.has_vibrator && transition == Some(GuideState::Ready)
    }
}
