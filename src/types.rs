//! Core data types shared across the guidance pipeline
//!
//! Frames are transient: every analysis component borrows a frame for the
//! duration of one call and never retains it. Results (`MoleDetection`,
//! `ValidationResult`) are immutable snapshots created fresh per frame.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single camera frame: grayscale (1 channel) or RGB (3 channels, interleaved).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub timestamp: DateTime<Utc>,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            width,
            height,
            channels,
            timestamp: Utc::now(),
        }
    }

    /// Frame has non-zero dimensions and a buffer of the expected size.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && (self.channels == 1 || self.channels == 3)
            && self.data.len() == (self.width * self.height * self.channels as u32) as usize
    }

    /// Luminance of the pixel at (x, y), in 0..=255.
    ///
    /// Callers must stay in bounds; analysis loops iterate over frame
    /// dimensions so this is not range-checked per pixel.
    #[inline]
    pub fn luminance(&self, x: u32, y: u32) -> f32 {
        let idx = ((y * self.width + x) * self.channels as u32) as usize;
        if self.channels == 1 {
            self.data[idx] as f32
        } else {
            0.299 * self.data[idx] as f32
                + 0.587 * self.data[idx + 1] as f32
                + 0.114 * self.data[idx + 2] as f32
        }
    }

    /// Mean luminance over the whole frame (0.0 for invalid frames).
    pub fn mean_luminance(&self) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }
        let mut sum = 0.0f64;
        for y in 0..self.height {
            for x in 0..self.width {
                sum += self.luminance(x, y) as f64;
            }
        }
        (sum / (self.width as f64 * self.height as f64)) as f32
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// A point in frame coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// An axis-aligned rectangle in frame coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

/// Result of one mole detection attempt. Immutable; discarded after validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoleDetection {
    pub bounding_box: Rect,
    pub centroid: Point,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
    /// Detected region area in pixels.
    pub area_px: f32,
    /// Boundary pixels of the detected region.
    pub contour: Vec<Point>,
    /// Which detection method produced this result ("threshold" or "region_growing").
    pub method: &'static str,
}

impl MoleDetection {
    /// Translate the detection by (dx, dy), e.g. from ROI to full-image coordinates.
    pub fn offset_by(mut self, dx: f32, dy: f32) -> Self {
        self.bounding_box.x += dx;
        self.bounding_box.y += dy;
        self.centroid.x += dx;
        self.centroid.y += dy;
        for p in &mut self.contour {
            p.x += dx;
            p.y += dy;
        }
        self
    }

    /// Scale all geometry by `factor`, e.g. from a downscaled analysis
    /// frame back to full resolution. Area scales quadratically.
    pub fn scale_by(mut self, factor: f32) -> Self {
        self.bounding_box.x *= factor;
        self.bounding_box.y *= factor;
        self.bounding_box.width *= factor;
        self.bounding_box.height *= factor;
        self.centroid.x *= factor;
        self.centroid.y *= factor;
        self.area_px *= factor * factor;
        for p in &mut self.contour {
            p.x *= factor;
            p.y *= factor;
        }
        self
    }
}

/// User-guidance state derived from one validation call.
///
/// Exactly one state holds per frame; the variants are ordered by the
/// priority the validator evaluates them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuideState {
    Searching,
    Centering,
    TooFar,
    TooClose,
    PoorLighting,
    Blurry,
    Ready,
}

impl GuideState {
    pub const ALL: [GuideState; 7] = [
        GuideState::Searching,
        GuideState::Centering,
        GuideState::TooFar,
        GuideState::TooClose,
        GuideState::PoorLighting,
        GuideState::Blurry,
        GuideState::Ready,
    ];

    /// Default user-facing message for the state.
    ///
    /// The validator refines some of these (poor lighting splits into
    /// over/underexposure messages); exhaustive so adding a state without a
    /// message is a compile error.
    pub fn default_message(&self) -> &'static str {
        match self {
            GuideState::Searching => "Buscando lunar...",
            GuideState::Centering => "Centra el lunar en el círculo",
            GuideState::TooFar => "Acerca la cámara al lunar",
            GuideState::TooClose => "Aleja un poco la cámara",
            GuideState::PoorLighting => "Busca mejor iluminación",
            GuideState::Blurry => "Imagen borrosa, mantén la cámara quieta",
            GuideState::Ready => "Listo para capturar",
        }
    }

    /// Overlay ring color for the state, as a hex RGB string.
    pub fn overlay_color(&self) -> &'static str {
        match self {
            GuideState::Searching => "#9E9E9E",
            GuideState::Centering => "#FFC107",
            GuideState::TooFar => "#2196F3",
            GuideState::TooClose => "#03A9F4",
            GuideState::PoorLighting => "#FF9800",
            GuideState::Blurry => "#9C27B0",
            GuideState::Ready => "#4CAF50",
        }
    }
}

/// Why a frame cannot be captured. `None` exactly when capture is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationFailureReason {
    NotCentered,
    TooFar,
    TooClose,
    Blurry,
    PoorLighting,
    NoMoleDetected,
    LowConfidence,
}

/// Outcome of one capture-validation call. Immutable, produced fresh per frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub can_capture: bool,
    pub guide_state: GuideState,
    /// Spanish-language user-facing guidance message.
    pub message: String,
    pub confidence: f32,
    pub failure_reason: Option<ValidationFailureReason>,
    /// Pixels between detection centroid and guide-area center; 0 when no detection.
    pub distance_from_center: f32,
    /// Detection area / guide area; 0 when no detection.
    pub mole_area_ratio: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_validity() {
        let frame = Frame::new(vec![0u8; 30], 10, 1, 3);
        assert!(frame.is_valid());

        let bad = Frame::new(vec![0u8; 29], 10, 1, 3);
        assert!(!bad.is_valid());

        let zero = Frame::new(vec![], 0, 0, 1);
        assert!(!zero.is_valid());
    }

    #[test]
    fn test_luminance_weights() {
        let frame = Frame::new(vec![100, 150, 200], 1, 1, 3);
        let expected = 0.299 * 100.0 + 0.587 * 150.0 + 0.114 * 200.0;
        assert!((frame.luminance(0, 0) - expected).abs() < 0.1);

        let gray = Frame::new(vec![77], 1, 1, 1);
        assert_eq!(gray.luminance(0, 0), 77.0);
    }

    #[test]
    fn test_rect_geometry() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.center(), Point::new(60.0, 45.0));
        assert_eq!(rect.area(), 5000.0);
        assert!(rect.contains(&Point::new(10.0, 20.0)));
        assert!(!rect.contains(&Point::new(110.0, 20.0)));
    }

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn test_detection_offset() {
        let detection = MoleDetection {
            bounding_box: Rect::new(5.0, 5.0, 10.0, 10.0),
            centroid: Point::new(10.0, 10.0),
            confidence: 0.9,
            area_px: 80.0,
            contour: vec![Point::new(5.0, 5.0)],
            method: "threshold",
        };
        let moved = detection.offset_by(100.0, 50.0);
        assert_eq!(moved.centroid, Point::new(110.0, 60.0));
        assert_eq!(moved.bounding_box.x, 105.0);
        assert_eq!(moved.contour[0], Point::new(105.0, 55.0));
    }

    #[test]
    fn test_every_state_has_message_and_color() {
        for state in GuideState::ALL {
            assert!(!state.default_message().is_empty());
            assert!(state.overlay_color().starts_with('#'));
        }
    }
}
