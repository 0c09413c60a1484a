//! Candidate confidence scoring
//!
//! A candidate is plausible when it is darker than its surroundings, compact
//! (round-ish rather than ragged), and sized like a mole at typical framing
//! distance. The three terms are weighted into a confidence in [0, 1].

use super::segmentation::Component;
use super::DetectionConfig;
use crate::types::Frame;

const DARKNESS_WEIGHT: f32 = 0.45;
const COMPACTNESS_WEIGHT: f32 = 0.35;
const SIZE_WEIGHT: f32 = 0.20;

pub fn score_component(frame: &Frame, component: &Component, config: &DetectionConfig) -> f32 {
    let darkness = darkness_contrast(frame, component);
    let compactness = compactness(component);
    let size = size_plausibility(
        component.pixel_count as f32,
        config.min_mole_size_px,
        config.max_mole_size_px,
    );

    (DARKNESS_WEIGHT * darkness + COMPACTNESS_WEIGHT * compactness + SIZE_WEIGHT * size)
        .clamp(0.0, 1.0)
}

/// Contrast between the region interior and a ring just outside its bounding
/// box. Moles are darker than surrounding skin; a region as bright as its
/// surroundings is probably texture, not pigment.
pub(super) fn darkness_contrast(frame: &Frame, component: &Component) -> f32 {
    let margin = ((component.max_x - component.min_x + 1) / 4).max(3);
    let x0 = component.min_x.saturating_sub(margin);
    let y0 = component.min_y.saturating_sub(margin);
    let x1 = (component.max_x + margin).min(frame.width - 1);
    let y1 = (component.max_y + margin).min(frame.height - 1);

    let mut sum = 0.0f64;
    let mut count = 0u32;
    for x in x0..=x1 {
        sum += frame.luminance(x, y0) as f64 + frame.luminance(x, y1) as f64;
        count += 2;
    }
    for y in y0..=y1 {
        sum += frame.luminance(x0, y) as f64 + frame.luminance(x1, y) as f64;
        count += 2;
    }
    if count == 0 {
        return 0.0;
    }

    let surround_mean = (sum / count as f64) as f32;
    (((surround_mean - component.mean_luminance) / 255.0) * 2.0).clamp(0.0, 1.0)
}

/// Isoperimetric compactness 4πA/P², approximating the perimeter by the
/// contour pixel count. Close to 1 for a disc, near 0 for ragged shapes.
fn compactness(component: &Component) -> f32 {
    let perimeter = component.contour.len() as f32;
    if perimeter <= 0.0 {
        return 0.0;
    }
    let area = component.pixel_count as f32;
    (4.0 * std::f32::consts::PI * area / (perimeter * perimeter)).clamp(0.0, 1.0)
}

/// 1.0 through the comfortable middle of the configured size band, ramping
/// to 0 at the band edges.
fn size_plausibility(area: f32, min_size: f32, max_size: f32) -> f32 {
    if area < min_size || area > max_size {
        return 0.0;
    }
    let lower_knee = 2.0 * min_size;
    let upper_knee = 0.5 * max_size;
    if area < lower_knee {
        (area - min_size) / (lower_knee - min_size)
    } else if area > upper_knee {
        (max_size - area) / (max_size - upper_knee)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::segmentation::{connected_components, dark_mask};
    use crate::testing::mole_frame;
    use crate::types::Point;

    fn mole_component(frame: &Frame) -> Component {
        let mask = dark_mask(frame, 90, true);
        connected_components(&mask, frame)
            .into_iter()
            .next()
            .expect("mole component")
    }

    #[test]
    fn test_synthetic_mole_scores_high() {
        let frame = mole_frame(200, 200, Point::new(100.0, 100.0), 20.0);
        let component = mole_component(&frame);
        let score = score_component(&frame, &component, &DetectionConfig::default());
        assert!(score > 0.6, "expected confident score, got {score}");
    }

    #[test]
    fn test_size_plausibility_band() {
        assert_eq!(size_plausibility(50.0, 100.0, 1000.0), 0.0);
        assert_eq!(size_plausibility(2000.0, 100.0, 1000.0), 0.0);
        assert_eq!(size_plausibility(400.0, 100.0, 1000.0), 1.0);
        assert!(size_plausibility(150.0, 100.0, 1000.0) < 1.0);
        assert!(size_plausibility(950.0, 100.0, 1000.0) < 1.0);
    }

    #[test]
    fn test_compactness_of_disc() {
        let frame = mole_frame(200, 200, Point::new(100.0, 100.0), 25.0);
        let component = mole_component(&frame);
        assert!(compactness(&component) > 0.6);
    }

    #[test]
    fn test_score_bounded() {
        let frame = mole_frame(150, 150, Point::new(75.0, 75.0), 10.0);
        let component = mole_component(&frame);
        let score = score_component(&frame, &component, &DetectionConfig::default());
        assert!((0.0..=1.0).contains(&score));
    }
}
