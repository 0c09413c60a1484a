//! Thermal state mapping
//!
//! Maps the device-reported thermal level to processing adjustments.
//! Invariant: adjustments never become more permissive as severity rises.
//! The frequency floor is non-decreasing, and advanced processing stays
//! disabled at every level above the one that first disabled it.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Device thermal level, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThermalState {
    None,
    Light,
    Moderate,
    Severe,
    Critical,
    Emergency,
}

impl ThermalState {
    pub const ALL: [ThermalState; 6] = [
        ThermalState::None,
        ThermalState::Light,
        ThermalState::Moderate,
        ThermalState::Severe,
        ThermalState::Critical,
        ThermalState::Emergency,
    ];

    /// Processing adjustments for this level.
    pub fn adjustments(&self) -> ThermalAdjustments {
        match self {
            ThermalState::None => ThermalAdjustments {
                allow_advanced_processing: true,
                min_processing_interval_ms: 100,
            },
            ThermalState::Light => ThermalAdjustments {
                allow_advanced_processing: true,
                min_processing_interval_ms: 150,
            },
            ThermalState::Moderate => ThermalAdjustments {
                allow_advanced_processing: false,
                min_processing_interval_ms: 250,
            },
            ThermalState::Severe => ThermalAdjustments {
                allow_advanced_processing: false,
                min_processing_interval_ms: 400,
            },
            ThermalState::Critical => ThermalAdjustments {
                allow_advanced_processing: false,
                min_processing_interval_ms: 700,
            },
            ThermalState::Emergency => ThermalAdjustments {
                allow_advanced_processing: false,
                min_processing_interval_ms: 1500,
            },
        }
    }
}

/// What the pipeline is allowed to do at a given thermal level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermalAdjustments {
    pub allow_advanced_processing: bool,
    /// Floor on the inter-analysis interval, consumed by the performance
    /// manager.
    pub min_processing_interval_ms: u64,
}

/// Holds the latest reported thermal state. The host app feeds state changes
/// in; the pipeline reads adjustments out.
#[derive(Debug, Default)]
pub struct ThermalStateDetector {
    state: Mutex<Option<ThermalState>>,
}

impl ThermalStateDetector {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Some(ThermalState::None)),
        }
    }

    pub fn set_state(&self, state: ThermalState) {
        let mut current = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *current != Some(state) {
            log::info!("thermal state changed: {:?} -> {:?}", *current, state);
        }
        *current = Some(state);
    }

    pub fn current_state(&self) -> ThermalState {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .unwrap_or(ThermalState::None)
    }

    pub fn current_adjustments(&self) -> ThermalAdjustments {
        self.current_state().adjustments()
    }
}
