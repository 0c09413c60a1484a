//! Mole detection
//!
//! Locates a candidate mole region in a frame. The primary method segments
//! dark, compact, sufficiently large connected regions by intensity
//! threshold; a region-growing fallback recovers detections the threshold
//! misses. Candidates are filtered by area and scored into a confidence in
//! [0, 1]; the best survivor wins.
//!
//! The detector holds no mutable state: it can run concurrently on
//! independent frames and never retains a frame past the call.

pub mod segmentation;
pub mod scoring;

use crate::errors::GuidanceError;
use crate::types::{Frame, MoleDetection, Point, Rect};
use segmentation::Component;
use serde::{Deserialize, Serialize};

/// Frames below this dimension floor are rejected outright; there is not
/// enough signal to segment reliably.
pub const MIN_FRAME_DIM: u32 = 100;

/// Ceiling on region growth as a fraction of the frame area.
const MAX_GROWN_FRAME_FRACTION: f32 = 0.25;

/// Minimum darkness contrast for any candidate. Compactness and size alone
/// can clear the confidence bar on a featureless frame; a candidate must
/// actually be darker than its surroundings.
const MIN_DARKNESS_CONTRAST: f32 = 0.1;

/// Tunable detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minimum candidate region area (pixels).
    pub min_mole_size_px: f32,
    /// Maximum candidate region area (pixels).
    pub max_mole_size_px: f32,
    /// Candidates below this confidence are discarded.
    pub confidence_threshold: f32,
    /// Luminance threshold: pixels darker than this are segmented.
    pub color_threshold: u8,
    /// Also run the region-growing method even when thresholding succeeds.
    pub use_multi_method: bool,
    /// Reject strongly colored (non-brown/dark) pixels on RGB frames.
    pub use_color_filter: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_mole_size_px: 120.0,
            max_mole_size_px: 50_000.0,
            confidence_threshold: 0.35,
            color_threshold: 90,
            use_multi_method: false,
            use_color_filter: true,
        }
    }
}

impl DetectionConfig {
    /// Eager validation; an inconsistent config is a caller error.
    pub fn validate(&self) -> Result<(), GuidanceError> {
        if self.max_mole_size_px <= self.min_mole_size_px {
            return Err(GuidanceError::InvalidConfig(
                "max_mole_size_px must exceed min_mole_size_px".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(GuidanceError::InvalidConfig(
                "confidence_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.min_mole_size_px < 1.0 {
            return Err(GuidanceError::InvalidConfig(
                "min_mole_size_px must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A scored candidate before final selection.
struct Candidate {
    component: Component,
    confidence: f32,
    method: &'static str,
}

/// Detects a mole region in a frame.
#[derive(Debug, Clone)]
pub struct MoleDetector {
    config: DetectionConfig,
}

impl MoleDetector {
    /// Fails fast on an inconsistent config.
    pub fn new(config: DetectionConfig) -> Result<Self, GuidanceError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: DetectionConfig::default(),
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Attempt detection. Returns `None` (not an error) for invalid or
    /// undersized frames, and when no candidate survives filtering.
    pub fn detect(&self, frame: &Frame) -> Option<MoleDetection> {
        if !frame.is_valid() {
            log::debug!("detection skipped: invalid frame {}", frame.id);
            return None;
        }
        if frame.width < MIN_FRAME_DIM || frame.height < MIN_FRAME_DIM {
            log::debug!(
                "detection skipped: frame {}x{} below {}px floor",
                frame.width,
                frame.height,
                MIN_FRAME_DIM
            );
            return None;
        }

        let mut candidates = self.threshold_candidates(frame);

        if candidates.is_empty() || self.config.use_multi_method {
            if let Some(candidate) = self.region_growing_candidate(frame) {
                candidates.push(candidate);
            }
        }

        let best = candidates
            .into_iter()
            .filter(|c| {
                let area = c.component.pixel_count as f32;
                area >= self.config.min_mole_size_px
                    && area <= self.config.max_mole_size_px
                    && c.confidence >= self.config.confidence_threshold
                    && scoring::darkness_contrast(frame, &c.component) >= MIN_DARKNESS_CONTRAST
            })
            .max_by(|a, b| {
                // Highest confidence wins; near-ties break toward larger area.
                if (a.confidence - b.confidence).abs() < 0.01 {
                    a.component
                        .pixel_count
                        .cmp(&b.component.pixel_count)
                } else {
                    a.confidence
                        .partial_cmp(&b.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                }
            })?;

        let detection = to_detection(best);
        log::debug!(
            "mole detected via {}: centroid=({:.1},{:.1}) area={:.0}px confidence={:.3}",
            detection.method,
            detection.centroid.x,
            detection.centroid.y,
            detection.area_px,
            detection.confidence
        );
        Some(detection)
    }

    fn threshold_candidates(&self, frame: &Frame) -> Vec<Candidate> {
        let mask = segmentation::dark_mask(
            frame,
            self.config.color_threshold,
            self.config.use_color_filter,
        );
        segmentation::connected_components(&mask, frame)
            .into_iter()
            .map(|component| {
                let confidence = scoring::score_component(frame, &component, &self.config);
                Candidate {
                    component,
                    confidence,
                    method: "threshold",
                }
            })
            .collect()
    }

    fn region_growing_candidate(&self, frame: &Frame) -> Option<Candidate> {
        // On small frames the configured size ceiling can exceed the frame
        // itself; growth that swallows a quarter of the frame is background,
        // not a mole.
        let frame_cap = (frame.width * frame.height) as f32 * MAX_GROWN_FRAME_FRACTION;
        let max_pixels = self.config.max_mole_size_px.min(frame_cap) as u32;
        let component = segmentation::region_growing(frame, max_pixels)?;
        let confidence = scoring::score_component(frame, &component, &self.config);
        Some(Candidate {
            component,
            confidence,
            method: "region_growing",
        })
    }
}

fn to_detection(candidate: Candidate) -> MoleDetection {
    let c = &candidate.component;
    let centroid = Point::new(
        c.sum_x as f32 / c.pixel_count as f32,
        c.sum_y as f32 / c.pixel_count as f32,
    );
    MoleDetection {
        bounding_box: Rect::new(
            c.min_x as f32,
            c.min_y as f32,
            (c.max_x - c.min_x + 1) as f32,
            (c.max_y - c.min_y + 1) as f32,
        ),
        centroid,
        confidence: candidate.confidence,
        area_px: c.pixel_count as f32,
        contour: c
            .contour
            .iter()
            .map(|&(x, y)| Point::new(x as f32, y as f32))
            .collect(),
        method: candidate.method,
    }
}
