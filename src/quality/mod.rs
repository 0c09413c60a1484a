//! Frame quality analysis
//!
//! Scores sharpness, brightness and contrast of a frame and derives the
//! blur/exposure flags the capture validator consumes. The analyzer is
//! resolution-agnostic: it scores whatever buffer it is given, so callers
//! may hand it an ROI crop or a downscaled copy under performance pressure.

pub mod exposure;
pub mod sharpness;

pub use exposure::{ExposureStats, HISTOGRAM_BINS};
pub use sharpness::laplacian_variance;

use crate::types::Frame;
use serde::{Deserialize, Serialize};

/// Fixed thresholds for the derived quality flags and the
/// `is_good_quality()` predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Sharpness below this sets `is_blurry`.
    pub blurry_sharpness: f32,
    /// Mean luminance above this sets `is_overexposed`.
    pub overexposed_brightness: f32,
    /// Mean luminance below this sets `is_underexposed`.
    pub underexposed_brightness: f32,
    /// Minimum sharpness for `is_good_quality()`.
    pub min_sharpness: f32,
    /// Brightness band for `is_good_quality()`.
    pub min_brightness: f32,
    pub max_brightness: f32,
    /// Minimum contrast for `is_good_quality()`.
    pub min_contrast: f32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            blurry_sharpness: 0.25,
            overexposed_brightness: 200.0,
            underexposed_brightness: 50.0,
            min_sharpness: 0.3,
            min_brightness: 80.0,
            max_brightness: 180.0,
            min_contrast: 0.12,
        }
    }
}

impl QualityThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_brightness >= self.max_brightness {
            return Err("min_brightness must be below max_brightness".to_string());
        }
        if self.underexposed_brightness >= self.overexposed_brightness {
            return Err("underexposed threshold must be below overexposed threshold".to_string());
        }
        if !(0.0..=1.0).contains(&self.blurry_sharpness) || !(0.0..=1.0).contains(&self.min_sharpness) {
            return Err("sharpness thresholds must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }
}

/// Immutable quality snapshot for one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Normalized Laplacian-variance focus measure in [0, 1].
    pub sharpness: f32,
    /// Mean luminance in 0..=255.
    pub brightness: f32,
    /// Normalized luminance spread in [0, 1].
    pub contrast: f32,
    pub is_blurry: bool,
    pub is_overexposed: bool,
    pub is_underexposed: bool,
    /// Whether histogram mass is concentrated inside a usable dynamic-range
    /// band. Finer diagnostic than the exposure flags alone.
    pub histogram_well_distributed: bool,
}

impl QualityMetrics {
    /// Zeroed result for empty/invalid frames. Nothing was measured, so the
    /// flags stay false; the predicate still fails on the zero scores.
    pub fn degenerate() -> Self {
        Self {
            sharpness: 0.0,
            brightness: 0.0,
            contrast: 0.0,
            is_blurry: false,
            is_overexposed: false,
            is_underexposed: false,
            histogram_well_distributed: false,
        }
    }

    /// True iff no flag is set and sharpness/brightness/contrast each clear
    /// the configured minimums.
    pub fn is_good_quality(&self) -> bool {
        self.is_good_quality_with(&QualityThresholds::default())
    }

    pub fn is_good_quality_with(&self, t: &QualityThresholds) -> bool {
        !self.is_blurry
            && !self.is_overexposed
            && !self.is_underexposed
            && self.sharpness >= t.min_sharpness
            && self.brightness >= t.min_brightness
            && self.brightness <= t.max_brightness
            && self.contrast >= t.min_contrast
    }

    /// User feedback selected by priority: blur > exposure > good.
    pub fn feedback_message(&self) -> &'static str {
        if self.is_blurry {
            "Imagen borrosa, mantén la cámara quieta"
        } else if self.is_overexposed {
            "Demasiada luz"
        } else if self.is_underexposed {
            "Necesitas más luz"
        } else {
            "Buena calidad de imagen"
        }
    }
}

/// Scores frame quality. Stateless; safe to share across frames and threads.
#[derive(Debug, Clone, Default)]
pub struct QualityAnalyzer {
    thresholds: QualityThresholds,
}

impl QualityAnalyzer {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Analyze a frame. Never panics: empty or zero-dimension frames yield a
    /// degenerate zeroed result.
    pub fn analyze(&self, frame: &Frame) -> QualityMetrics {
        if !frame.is_valid() {
            log::debug!("quality analysis skipped: invalid frame {}", frame.id);
            return QualityMetrics::degenerate();
        }

        let stats = ExposureStats::from_frame(frame);
        let sharpness = sharpness::sharpness_score(frame);
        let t = &self.thresholds;

        // Exposure flags require both the mean crossing the threshold and the
        // histogram mass agreeing, so one bright speck does not flip a flag.
        let is_overexposed =
            stats.mean > t.overexposed_brightness && stats.bright_fraction > 0.5;
        let is_underexposed =
            stats.mean < t.underexposed_brightness && stats.dark_fraction > 0.5;
        let is_blurry = sharpness < t.blurry_sharpness;

        let metrics = QualityMetrics {
            sharpness,
            brightness: stats.mean,
            contrast: stats.normalized_std(),
            is_blurry,
            is_overexposed,
            is_underexposed,
            histogram_well_distributed: stats.well_distributed(),
        };

        log::debug!(
            "quality: sharpness={:.3} brightness={:.1} contrast={:.3} blurry={} over={} under={}",
            metrics.sharpness,
            metrics.brightness,
            metrics.contrast,
            metrics.is_blurry,
            metrics.is_overexposed,
            metrics.is_underexposed
        );

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{checkerboard_frame, gray_frame};

    #[test]
    fn test_invalid_frame_degenerates() {
        let analyzer = QualityAnalyzer::default();
        let empty = Frame::new(vec![], 0, 0, 1);
        let metrics = analyzer.analyze(&empty);

        assert_eq!(metrics.sharpness, 0.0);
        assert_eq!(metrics.brightness, 0.0);
        assert!(!metrics.is_blurry);
        assert!(!metrics.is_good_quality());
    }

    #[test]
    fn test_checkerboard_is_sharp() {
        let analyzer = QualityAnalyzer::default();
        let metrics = analyzer.analyze(&checkerboard_frame(100, 100, 8));

        assert!(metrics.sharpness > 0.5);
        assert!(!metrics.is_blurry);
        assert!(metrics.contrast > 0.3);
    }

    #[test]
    fn test_flat_gray_is_blurry() {
        let analyzer = QualityAnalyzer::default();
        let metrics = analyzer.analyze(&gray_frame(100, 100, 128));

        assert!(metrics.sharpness < 0.05);
        assert!(metrics.is_blurry);
        assert!(!metrics.is_overexposed);
        assert!(!metrics.is_underexposed);
        assert!(!metrics.is_good_quality());
    }

    #[test]
    fn test_exposure_flags() {
        let analyzer = QualityAnalyzer::default();

        let bright = analyzer.analyze(&gray_frame(64, 64, 240));
        assert!(bright.is_overexposed);
        assert!(!bright.is_underexposed);

        let dark = analyzer.analyze(&gray_frame(64, 64, 20));
        assert!(dark.is_underexposed);
        assert!(!dark.is_overexposed);
        assert!(!dark.histogram_well_distributed);
    }

    #[test]
    fn test_feedback_priority_blur_over_exposure() {
        let metrics = QualityMetrics {
            sharpness: 0.1,
            brightness: 230.0,
            contrast: 0.2,
            is_blurry: true,
            is_overexposed: true,
            is_underexposed: false,
            histogram_well_distributed: false,
        };
        assert!(metrics.feedback_message().contains("borrosa"));
    }

    #[test]
    fn test_good_quality_predicate() {
        let metrics = QualityMetrics {
            sharpness: 0.5,
            brightness: 120.0,
            contrast: 0.4,
            is_blurry: false,
            is_overexposed: false,
            is_underexposed: false,
            histogram_well_distributed: true,
        };
        assert!(metrics.is_good_quality());
        assert_eq!(metrics.feedback_message(), "Buena calidad de imagen");
    }

    #[test]
    fn test_threshold_validation() {
        let mut t = QualityThresholds::default();
        assert!(t.validate().is_ok());

        t.min_brightness = 200.0;
        t.max_brightness = 100.0;
        assert!(t.validate().is_err());
    }
}
