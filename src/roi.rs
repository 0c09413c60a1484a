//! Region-of-interest selection
//!
//! Analyzing a sub-region instead of the full frame is the main latency
//! lever on low-end devices. The optimizer keeps that sub-region relevant:
//! basic mode centers it on the frame, adaptive mode recenters it toward the
//! average of recently detected mole centroids so the crop follows the
//! subject.

use crate::errors::GuidanceError;
use crate::types::{Frame, Point};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Recent-centroid history bound; oldest entries evicted first.
pub const DETECTION_HISTORY_CAPACITY: usize = 10;

/// An integer crop rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct RoiOptimizer {
    adaptive: bool,
    history: VecDeque<Point>,
}

impl RoiOptimizer {
    pub fn new(adaptive: bool) -> Self {
        Self {
            adaptive,
            history: VecDeque::with_capacity(DETECTION_HISTORY_CAPACITY),
        }
    }

    /// Record a detection centroid to bias future ROI placement.
    pub fn update_detection_history(&mut self, centroid: Point) {
        if self.history.len() == DETECTION_HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(centroid);
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Last recorded detection centroid, if any.
    pub fn last_known_position(&self) -> Option<Point> {
        self.history.back().copied()
    }

    /// Compute the ROI for an image of `(width, height)`, covering
    /// `coverage` of each dimension. Deterministic given the same history.
    pub fn calculate_roi(&self, image_size: (u32, u32), coverage: f32) -> Roi {
        let (width, height) = image_size;
        let coverage = coverage.clamp(0.1, 1.0);
        let roi_w = ((width as f32 * coverage) as u32).max(1).min(width);
        let roi_h = ((height as f32 * coverage) as u32).max(1).min(height);

        let target = if self.adaptive && !self.history.is_empty() {
            let n = self.history.len() as f32;
            let sum = self
                .history
                .iter()
                .fold((0.0f32, 0.0f32), |acc, p| (acc.0 + p.x, acc.1 + p.y));
            Point::new(sum.0 / n, sum.1 / n)
        } else {
            Point::new(width as f32 / 2.0, height as f32 / 2.0)
        };

        let x = (target.x - roi_w as f32 / 2.0)
            .clamp(0.0, (width - roi_w) as f32) as u32;
        let y = (target.y - roi_h as f32 / 2.0)
            .clamp(0.0, (height - roi_h) as f32) as u32;

        Roi {
            x,
            y,
            width: roi_w,
            height: roi_h,
        }
    }
}

/// Crop the ROI out of the frame into a fresh frame. Pure; the source frame
/// is untouched.
pub fn extract_roi(frame: &Frame, roi: &Roi) -> Result<Frame, GuidanceError> {
    if !frame.is_valid() {
        return Err(GuidanceError::InvalidFrame("cannot crop invalid frame".to_string()));
    }
    if roi.x + roi.width > frame.width || roi.y + roi.height > frame.height {
        return Err(GuidanceError::InvalidFrame(format!(
            "ROI {}x{}+{}+{} exceeds frame {}x{}",
            roi.width, roi.height, roi.x, roi.y, frame.width, frame.height
        )));
    }

    let channels = frame.channels as u32;
    let mut data = Vec::with_capacity((roi.width * roi.height * channels) as usize);
    for y in roi.y..roi.y + roi.height {
        let row_start = ((y * frame.width + roi.x) * channels) as usize;
        let row_end = row_start + (roi.width * channels) as usize;
        data.extend_from_slice(&frame.data[row_start..row_end]);
    }

    Ok(Frame::new(data, roi.width, roi.height, frame.channels))
}

/// Map a point in ROI-local coordinates to image coordinates.
#[inline]
pub fn roi_to_image_coordinates(p: Point, roi: &Roi) -> Point {
    Point::new(p.x + roi.x as f32, p.y + roi.y as f32)
}

/// Map a point in image coordinates to ROI-local coordinates. Exact inverse
/// of [`roi_to_image_coordinates`].
#[inline]
pub fn image_to_roi_coordinates(p: Point, roi: &Roi) -> Point {
    Point::new(p.x - roi.x as f32, p.y - roi.y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::gradient_frame;

    #[test]
    fn test_basic_roi_is_centered() {
        let optimizer = RoiOptimizer::new(false);
        let roi = optimizer.calculate_roi((400, 300), 0.5);
        assert_eq!(roi, Roi { x: 100, y: 75, width: 200, height: 150 });
    }

    #[test]
    fn test_adaptive_roi_follows_history() {
        let mut optimizer = RoiOptimizer::new(true);
        optimizer.update_detection_history(Point::new(300.0, 100.0));
        optimizer.update_detection_history(Point::new(320.0, 120.0));

        let roi = optimizer.calculate_roi((400, 300), 0.5);
        // Recentered toward (310, 110), clamped to fit.
        assert_eq!(roi.x, 200);
        assert_eq!(roi.y, 35);
    }

    #[test]
    fn test_adaptive_without_history_matches_basic() {
        let adaptive = RoiOptimizer::new(true);
        let basic = RoiOptimizer::new(false);
        assert_eq!(
            adaptive.calculate_roi((640, 480), 0.6),
            basic.calculate_roi((640, 480), 0.6)
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let mut optimizer = RoiOptimizer::new(true);
        for i in 0..(DETECTION_HISTORY_CAPACITY + 5) {
            optimizer.update_detection_history(Point::new(i as f32, 0.0));
        }
        assert_eq!(optimizer.history.len(), DETECTION_HISTORY_CAPACITY);
        // Oldest entries evicted: front should be entry 5.
        assert_eq!(optimizer.history.front().unwrap().x, 5.0);
        assert_eq!(optimizer.last_known_position().unwrap().x, 14.0);
    }

    #[test]
    fn test_roi_clamped_inside_image() {
        let mut optimizer = RoiOptimizer::new(true);
        optimizer.update_detection_history(Point::new(0.0, 0.0));
        let roi = optimizer.calculate_roi((200, 200), 0.5);
        assert_eq!((roi.x, roi.y), (0, 0));

        optimizer.clear_history();
        optimizer.update_detection_history(Point::new(1000.0, 1000.0));
        let roi = optimizer.calculate_roi((200, 200), 0.5);
        assert_eq!((roi.x, roi.y), (100, 100));
    }

    #[test]
    fn test_extract_roi_contents() {
        let frame = gradient_frame(100, 10);
        let roi = Roi { x: 20, y: 2, width: 30, height: 5 };
        let crop = extract_roi(&frame, &roi).unwrap();

        assert_eq!(crop.width, 30);
        assert_eq!(crop.height, 5);
        assert_eq!(crop.channels, frame.channels);
        // Gradient value at image x=20 lands at crop x=0.
        assert_eq!(crop.luminance(0, 0), frame.luminance(20, 2));
    }

    #[test]
    fn test_extract_roi_out_of_bounds() {
        let frame = gradient_frame(50, 10);
        let roi = Roi { x: 40, y: 0, width: 20, height: 5 };
        assert!(extract_roi(&frame, &roi).is_err());
    }

    #[test]
    fn test_coordinate_round_trip() {
        let roi = Roi { x: 37, y: 12, width: 100, height: 80 };
        let p = Point::new(14.25, 61.5);
        let back = image_to_roi_coordinates(roi_to_image_coordinates(p, &roi), &roi);
        assert!((back.x - p.x).abs() < 1e-4);
        assert!((back.y - p.y).abs() < 1e-4);
    }
}
