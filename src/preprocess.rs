//! Capture preprocessing pipeline
//!
//! Applies a configurable filter chain to the finally captured frame before
//! downstream analysis, strictly in this order: illumination normalization,
//! contrast enhancement, noise reduction, sharpening. The pipeline never
//! aborts: a failing filter is recorded with an `error:` marker and the best
//! image so far carries on, so the capture flow always has something to hand
//! off.

use crate::types::Frame;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// Gain clamp for illumination normalization.
const MIN_GAIN: f32 = 0.5;
const MAX_GAIN: f32 = 2.0;

/// Unsharp-mask strength.
const SHARPEN_AMOUNT: f32 = 0.8;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("cannot filter an empty or invalid frame")]
    InvalidFrame,

    #[error("frame has no luminance signal to normalize")]
    NoSignal,
}

/// Which filters run. Disabled filters are skipped, not recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub normalize_illumination: bool,
    pub enhance_contrast: bool,
    pub reduce_noise: bool,
    pub sharpen: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            normalize_illumination: true,
            enhance_contrast: true,
            reduce_noise: true,
            sharpen: true,
        }
    }
}

impl PreprocessConfig {
    /// All filters on; for well-lit dermatology captures.
    pub fn dermatology_analysis() -> Self {
        Self::default()
    }

    /// Sharpening off: it amplifies noise in dark images.
    pub fn low_light() -> Self {
        Self {
            sharpen: false,
            ..Self::default()
        }
    }

    /// Contrast enhancement off: it would worsen blown highlights.
    pub fn overexposure() -> Self {
        Self {
            enhance_contrast: false,
            ..Self::default()
        }
    }
}

/// Result of one preprocessing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingResult {
    pub original: Frame,
    pub processed: Frame,
    /// Filter names in application order; recovered failures appear as
    /// `error:<name>`.
    pub applied_filters: Vec<String>,
    pub duration_ms: u64,
}

impl PreprocessingResult {
    /// True iff at least one filter applied cleanly.
    pub fn is_successful(&self) -> bool {
        self.applied_filters
            .iter()
            .any(|name| !name.starts_with("error:"))
    }

    /// Human-readable processing summary for the capture handoff.
    pub fn summary(&self) -> String {
        if self.applied_filters.is_empty() {
            return "Sin procesamiento aplicado".to_string();
        }
        format!(
            "Procesado en {} ms: {}",
            self.duration_ms,
            self.applied_filters.join(", ")
        )
    }

    /// Processed frame as an RGB image for downstream screens.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        let frame = &self.processed;
        if !frame.is_valid() {
            return None;
        }
        match frame.channels {
            3 => image::RgbImage::from_vec(frame.width, frame.height, frame.data.clone()),
            1 => {
                let mut rgb = Vec::with_capacity(frame.data.len() * 3);
                for &v in &frame.data {
                    rgb.extend_from_slice(&[v, v, v]);
                }
                image::RgbImage::from_vec(frame.width, frame.height, rgb)
            }
            _ => None,
        }
    }
}

/// Runs the filter pipeline. Stateless.
#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Apply the filters enabled in `config`, in fixed order, recovering
    /// from individual filter failures. Output dimensions always equal
    /// input dimensions.
    pub fn preprocess(&self, frame: &Frame, config: &PreprocessConfig) -> PreprocessingResult {
        let started = Instant::now();
        let mut current = frame.clone();
        let mut applied_filters = Vec::new();

        let stages: [(&str, bool, FilterFn); 4] = [
            ("illumination_normalization", config.normalize_illumination, normalize_illumination),
            ("contrast_enhancement", config.enhance_contrast, enhance_contrast),
            ("noise_reduction", config.reduce_noise, reduce_noise),
            ("sharpening", config.sharpen, sharpen),
        ];

        for (name, enabled, filter) in stages {
            if !enabled {
                continue;
            }
            match filter(&current) {
                Ok(next) => {
                    debug_assert_eq!((next.width, next.height), (current.width, current.height));
                    current = next;
                    applied_filters.push(name.to_string());
                }
                Err(e) => {
                    // Keep the best image so far and move on.
                    log::warn!("filter {} failed, keeping previous image: {}", name, e);
                    applied_filters.push(format!("error:{}", name));
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        log::debug!(
            "preprocessing done in {} ms: [{}]",
            duration_ms,
            applied_filters.join(", ")
        );

        PreprocessingResult {
            original: frame.clone(),
            processed: current,
            applied_filters,
            duration_ms,
        }
    }

    /// All filters on.
    pub fn preprocess_for_dermatology_analysis(&self, frame: &Frame) -> PreprocessingResult {
        self.preprocess(frame, &PreprocessConfig::dermatology_analysis())
    }

    /// Low-light preset: no sharpening.
    pub fn preprocess_for_low_light(&self, frame: &Frame) -> PreprocessingResult {
        self.preprocess(frame, &PreprocessConfig::low_light())
    }

    /// Overexposure preset: no contrast enhancement.
    pub fn preprocess_for_overexposure(&self, frame: &Frame) -> PreprocessingResult {
        self.preprocess(frame, &PreprocessConfig::overexposure())
    }
}

type FilterFn = fn(&Frame) -> Result<Frame, PreprocessError>;

/// Scale luminance toward a mid-gray mean, clamping the gain so extreme
/// frames are not destroyed.
fn normalize_illumination(frame: &Frame) -> Result<Frame, PreprocessError> {
    if !frame.is_valid() {
        return Err(PreprocessError::InvalidFrame);
    }
    let mean = frame.mean_luminance();
    if mean <= 0.0 {
        return Err(PreprocessError::NoSignal);
    }

    let gain = (128.0 / mean).clamp(MIN_GAIN, MAX_GAIN);
    let data = frame
        .data
        .iter()
        .map(|&v| (v as f32 * gain).round().clamp(0.0, 255.0) as u8)
        .collect();
    Ok(copy_with_data(frame, data))
}

/// Linear stretch between the 2nd and 98th luminance percentiles.
fn enhance_contrast(frame: &Frame) -> Result<Frame, PreprocessError> {
    if !frame.is_valid() {
        return Err(PreprocessError::InvalidFrame);
    }

    let mut histogram = [0u32; 256];
    for &v in &frame.data {
        histogram[v as usize] += 1;
    }
    let total: u64 = frame.data.len() as u64;
    let low = percentile(&histogram, total, 0.02);
    let high = percentile(&histogram, total, 0.98);
    if high <= low {
        return Err(PreprocessError::NoSignal);
    }

    let range = (high - low) as f32;
    let data = frame
        .data
        .iter()
        .map(|&v| {
            let stretched = (v.saturating_sub(low) as f32 / range) * 255.0;
            stretched.round().clamp(0.0, 255.0) as u8
        })
        .collect();
    Ok(copy_with_data(frame, data))
}

/// 3x3 box blur per channel.
fn reduce_noise(frame: &Frame) -> Result<Frame, PreprocessError> {
    if !frame.is_valid() {
        return Err(PreprocessError::InvalidFrame);
    }
    Ok(copy_with_data(frame, box_blur_3x3(frame)))
}

/// Unsharp mask: original plus a fraction of the difference from a blurred
/// copy.
fn sharpen(frame: &Frame) -> Result<Frame, PreprocessError> {
    if !frame.is_valid() {
        return Err(PreprocessError::InvalidFrame);
    }
    let blurred = box_blur_3x3(frame);
    let data = frame
        .data
        .iter()
        .zip(blurred.iter())
        .map(|(&orig, &blur)| {
            let sharpened = orig as f32 + SHARPEN_AMOUNT * (orig as f32 - blur as f32);
            sharpened.round().clamp(0.0, 255.0) as u8
        })
        .collect();
    Ok(copy_with_data(frame, data))
}

fn box_blur_3x3(frame: &Frame) -> Vec<u8> {
    let width = frame.width as i64;
    let height = frame.height as i64;
    let channels = frame.channels as i64;
    let mut out = vec![0u8; frame.data.len()];

    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0u32;
                let mut count = 0u32;
                for dy in -1..=1i64 {
                    for dx in -1..=1i64 {
                        let nx = x + dx;
                        let ny = y + dy;
                        if nx >= 0 && nx < width && ny >= 0 && ny < height {
                            sum += frame.data[((ny * width + nx) * channels + c) as usize] as u32;
                            count += 1;
                        }
                    }
                }
                out[((y * width + x) * channels + c) as usize] = (sum / count) as u8;
            }
        }
    }
    out
}

fn percentile(histogram: &[u32; 256], total: u64, fraction: f64) -> u8 {
    let target = (total as f64 * fraction) as u64;
    let mut cumulative = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        cumulative += count as u64;
        if cumulative >= target {
            return value as u8;
        }
    }
    255
}

/// New frame with the same geometry and fresh data.
fn copy_with_data(frame: &Frame, data: Vec<u8>) -> Frame {
    Frame::new(data, frame.width, frame.height, frame.channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{gradient_frame, gray_frame, mole_frame};
    use crate::types::Point;

    #[test]
    fn test_all_filters_applied_in_order() {
        let preprocessor = ImagePreprocessor::new();
        let frame = mole_frame(120, 120, Point::new(60.0, 60.0), 12.0);
        let result = preprocessor.preprocess_for_dermatology_analysis(&frame);

        assert!(result.is_successful());
        assert_eq!(
            result.applied_filters,
            vec![
                "illumination_normalization",
                "contrast_enhancement",
                "noise_reduction",
                "sharpening"
            ]
        );
        assert_eq!(result.processed.width, frame.width);
        assert_eq!(result.processed.height, frame.height);
    }

    #[test]
    fn test_disabled_filters_skipped() {
        let preprocessor = ImagePreprocessor::new();
        let frame = gradient_frame(100, 100);

        let low_light = preprocessor.preprocess_for_low_light(&frame);
        assert!(!low_light
            .applied_filters
            .iter()
            .any(|f| f.contains("sharpening")));

        let overexposed = preprocessor.preprocess_for_overexposure(&frame);
        assert!(!overexposed
            .applied_filters
            .iter()
            .any(|f| f.contains("contrast_enhancement")));
    }

    #[test]
    fn test_filter_failure_recovers() {
        let preprocessor = ImagePreprocessor::new();
        // All-black frame: illumination normalization has no signal.
        let frame = gray_frame(50, 50, 0);
        let result = preprocessor.preprocess(&frame, &PreprocessConfig::default());

        assert!(result
            .applied_filters
            .contains(&"error:illumination_normalization".to_string()));
        // The pipeline carried on and still produced an image.
        assert_eq!(result.processed.width, 50);
        assert!(result.summary().contains("error:illumination_normalization"));
    }

    #[test]
    fn test_empty_config_is_unsuccessful() {
        let preprocessor = ImagePreprocessor::new();
        let frame = gradient_frame(50, 50);
        let config = PreprocessConfig {
            normalize_illumination: false,
            enhance_contrast: false,
            reduce_noise: false,
            sharpen: false,
        };
        let result = preprocessor.preprocess(&frame, &config);

        assert!(result.applied_filters.is_empty());
        assert!(!result.is_successful());
        assert_eq!(result.processed.data, frame.data);
    }

    #[test]
    fn test_normalization_brightens_dark_frame() {
        let frame = gray_frame(40, 40, 70);
        let normalized = normalize_illumination(&frame).unwrap();
        assert!(normalized.mean_luminance() > frame.mean_luminance());
    }

    #[test]
    fn test_contrast_stretch_expands_range() {
        let frame = gradient_frame(100, 4);
        let enhanced = enhance_contrast(&frame).unwrap();
        let min = *enhanced.data.iter().min().unwrap();
        let max = *enhanced.data.iter().max().unwrap();
        assert_eq!(min, 0);
        assert!(max >= 250);
    }

    #[test]
    fn test_noise_reduction_smooths() {
        let frame = mole_frame(100, 100, Point::new(50.0, 50.0), 10.0);
        let smoothed = reduce_noise(&frame).unwrap();
        assert_eq!(smoothed.data.len(), frame.data.len());
    }

    #[test]
    fn test_to_rgb_image_dimensions() {
        let preprocessor = ImagePreprocessor::new();
        let frame = mole_frame(80, 60, Point::new(40.0, 30.0), 8.0);
        let result = preprocessor.preprocess_for_dermatology_analysis(&frame);
        let img = result.to_rgb_image().expect("rgb conversion");
        assert_eq!(img.dimensions(), (80, 60));
    }

    #[test]
    fn test_gray_frame_to_rgb_image() {
        let result = PreprocessingResult {
            original: gray_frame(10, 10, 128),
            processed: gray_frame(10, 10, 128),
            applied_filters: vec!["noise_reduction".to_string()],
            duration_ms: 1,
        };
        let img = result.to_rgb_image().expect("gray expands to rgb");
        assert_eq!(img.dimensions(), (10, 10));
    }
}
