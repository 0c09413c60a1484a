//! Capture validation state machine
//!
//! Combines a detection, a quality snapshot and the target guide area into a
//! single `GuideState` plus capture decision. The decision cascade runs in a
//! fixed priority order; the first failing check wins, so exactly one state
//! holds per call.
//!
//! Low-confidence detections collapse to `Searching`: a detection the system
//! does not trust must not drive centering UI. The distinct
//! `LowConfidence` failure reason keeps the case auditable.

use crate::errors::GuidanceError;
use crate::quality::QualityMetrics;
use crate::types::{
    GuideState, MoleDetection, Rect, ValidationFailureReason, ValidationResult,
};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Tunable validation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Max pixel distance between mole centroid and guide center.
    pub centering_tolerance: f32,
    /// Acceptable band for detection area / guide area.
    pub min_mole_area_ratio: f32,
    pub max_mole_area_ratio: f32,
    pub min_sharpness: f32,
    /// Acceptable mean-luminance band.
    pub min_brightness: f32,
    pub max_brightness: f32,
    /// Detections below this confidence are treated as not usable.
    pub min_confidence: f32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            centering_tolerance: 50.0,
            min_mole_area_ratio: 0.15,
            max_mole_area_ratio: 0.80,
            min_sharpness: 0.3,
            min_brightness: 80.0,
            max_brightness: 180.0,
            min_confidence: 0.6,
        }
    }
}

impl ValidationConfig {
    /// Eager validation; inconsistent values are a caller error at this
    /// boundary, never silently clamped.
    pub fn validate(&self) -> Result<(), GuidanceError> {
        if self.max_mole_area_ratio <= self.min_mole_area_ratio {
            return Err(GuidanceError::InvalidConfig(
                "max_mole_area_ratio must exceed min_mole_area_ratio".to_string(),
            ));
        }
        if self.max_brightness <= self.min_brightness {
            return Err(GuidanceError::InvalidConfig(
                "max_brightness must exceed min_brightness".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(GuidanceError::InvalidConfig(
                "min_confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.centering_tolerance < 0.0 {
            return Err(GuidanceError::InvalidConfig(
                "centering_tolerance must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// The validation state machine. `validate` is a pure function of its inputs
/// and the current config; config replacement takes effect on the next call.
#[derive(Debug, Default)]
pub struct CaptureValidator {
    config: RwLock<ValidationConfig>,
}

impl CaptureValidator {
    pub fn new(config: ValidationConfig) -> Result<Self, GuidanceError> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(config),
        })
    }

    pub fn config(&self) -> ValidationConfig {
        self.config
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Replace the config. Takes effect on the next `validate` call; a call
    /// already in flight keeps its snapshot.
    pub fn update_config(&self, config: ValidationConfig) -> Result<(), GuidanceError> {
        config.validate()?;
        *self.config.write().unwrap_or_else(|p| p.into_inner()) = config;
        log::debug!("validation config updated");
        Ok(())
    }

    /// Run the decision cascade for one frame.
    pub fn validate(
        &self,
        detection: Option<&MoleDetection>,
        quality: &QualityMetrics,
        guide_area: &Rect,
    ) -> ValidationResult {
        // One consistent snapshot for the whole call; concurrent
        // update_config never tears a half-applied config into a decision.
        let config = self.config();

        let detection = match detection {
            None => {
                return failure(
                    GuideState::Searching,
                    ValidationFailureReason::NoMoleDetected,
                    GuideState::Searching.default_message().to_string(),
                    0.0,
                    0.0,
                    0.0,
                );
            }
            Some(d) => d,
        };

        if detection.confidence < config.min_confidence {
            return failure(
                GuideState::Searching,
                ValidationFailureReason::LowConfidence,
                "Buscando lunar... mantén la cámara estable".to_string(),
                detection.confidence,
                0.0,
                0.0,
            );
        }

        let distance_from_center = detection.centroid.distance_to(&guide_area.center());
        if distance_from_center > config.centering_tolerance {
            return failure(
                GuideState::Centering,
                ValidationFailureReason::NotCentered,
                GuideState::Centering.default_message().to_string(),
                detection.confidence,
                distance_from_center,
                0.0,
            );
        }

        let mole_area_ratio = if guide_area.area() > 0.0 {
            detection.area_px / guide_area.area()
        } else {
            0.0
        };
        if mole_area_ratio < config.min_mole_area_ratio {
            return failure(
                GuideState::TooFar,
                ValidationFailureReason::TooFar,
                GuideState::TooFar.default_message().to_string(),
                detection.confidence,
                distance_from_center,
                mole_area_ratio,
            );
        }
        if mole_area_ratio > config.max_mole_area_ratio {
            return failure(
                GuideState::TooClose,
                ValidationFailureReason::TooClose,
                GuideState::TooClose.default_message().to_string(),
                detection.confidence,
                distance_from_center,
                mole_area_ratio,
            );
        }

        if quality.is_blurry || quality.sharpness < config.min_sharpness {
            return failure(
                GuideState::Blurry,
                ValidationFailureReason::Blurry,
                GuideState::Blurry.default_message().to_string(),
                detection.confidence,
                distance_from_center,
                mole_area_ratio,
            );
        }

        if quality.is_overexposed
            || quality.is_underexposed
            || quality.brightness < config.min_brightness
            || quality.brightness > config.max_brightness
        {
            // Same state and reason either way; the message dispatches on
            // which direction the exposure failed.
            let message = if quality.is_overexposed
                || quality.brightness > config.max_brightness
            {
                "Demasiada luz, busca sombra"
            } else {
                "Necesitas más luz"
            };
            return failure(
                GuideState::PoorLighting,
                ValidationFailureReason::PoorLighting,
                message.to_string(),
                detection.confidence,
                distance_from_center,
                mole_area_ratio,
            );
        }

        ValidationResult {
            can_capture: true,
            guide_state: GuideState::Ready,
            message: GuideState::Ready.default_message().to_string(),
            confidence: detection.confidence,
            failure_reason: None,
            distance_from_center,
            mole_area_ratio,
        }
    }
}

fn failure(
    guide_state: GuideState,
    reason: ValidationFailureReason,
    message: String,
    confidence: f32,
    distance_from_center: f32,
    mole_area_ratio: f32,
) -> ValidationResult {
    ValidationResult {
        can_capture: false,
        guide_state,
        message,
        confidence,
        failure_reason: Some(reason),
        distance_from_center,
        mole_area_ratio,
    }
}
