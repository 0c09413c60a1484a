//! Preprocessing Pipeline Testing
//!
//! Integration tests for the capture preprocessing chain:
//! - Filter ordering and preset selection
//! - Recovery from individual filter failures
//! - Dimension preservation across the whole chain
//! - Measurable effect of each filter on synthetic frames

use moleguide::preprocess::{ImagePreprocessor, PreprocessConfig};
use moleguide::quality::QualityAnalyzer;
use moleguide::testing::{gray_frame, mole_frame};
use moleguide::types::Point;

#[test]
fn test_full_chain_preserves_dimensions() {
    let preprocessor = ImagePreprocessor::new();
    let frame = mole_frame(320, 240, Point::new(160.0, 120.0), 20.0);
    let result = preprocessor.preprocess_for_dermatology_analysis(&frame);

    assert!(result.is_successful());
    assert_eq!(result.processed.width, 320);
    assert_eq!(result.processed.height, 240);
    assert_eq!(result.processed.channels, 3);
    assert_eq!(result.original.data, frame.data);
}

#[test]
fn test_filters_run_in_fixed_order() {
    let preprocessor = ImagePreprocessor::new();
    let frame = mole_frame(150, 150, Point::new(75.0, 75.0), 15.0);
    let result = preprocessor.preprocess(&frame, &PreprocessConfig::default());

    assert_eq!(
        result.applied_filters,
        vec![
            "illumination_normalization",
            "contrast_enhancement",
            "noise_reduction",
            "sharpening"
        ]
    );
}

#[test]
fn test_presets_skip_the_right_filters() {
    let preprocessor = ImagePreprocessor::new();
    let frame = mole_frame(150, 150, Point::new(75.0, 75.0), 15.0);

    let low_light = preprocessor.preprocess_for_low_light(&frame);
    assert!(low_light.is_successful());
    assert!(!low_light.applied_filters.iter().any(|f| f.contains("sharpening")));
    assert!(low_light
        .applied_filters
        .iter()
        .any(|f| f == "noise_reduction"));

    let overexposed = preprocessor.preprocess_for_overexposure(&frame);
    assert!(overexposed.is_successful());
    assert!(!overexposed
        .applied_filters
        .iter()
        .any(|f| f.contains("contrast_enhancement")));
}

#[test]
fn test_black_frame_recovers_and_reports_error_marker() {
    let preprocessor = ImagePreprocessor::new();
    let result = preprocessor.preprocess(&gray_frame(60, 60, 0), &PreprocessConfig::default());

    // Normalization and contrast have no signal to work with; the rest of
    // the chain still runs.
    assert!(result
        .applied_filters
        .contains(&"error:illumination_normalization".to_string()));
    assert!(result.applied_filters.contains(&"noise_reduction".to_string()));
    assert!(result.is_successful());
    assert_eq!(result.processed.width, 60);
}

#[test]
fn test_normalization_improves_dark_capture() {
    let preprocessor = ImagePreprocessor::new();
    let analyzer = QualityAnalyzer::default();
    let dark = gray_frame(100, 100, 60);

    let config = PreprocessConfig {
        normalize_illumination: true,
        enhance_contrast: false,
        reduce_noise: false,
        sharpen: false,
    };
    let result = preprocessor.preprocess(&dark, &config);

    let before = analyzer.analyze(&dark).brightness;
    let after = analyzer.analyze(&result.processed).brightness;
    assert!(after > before);
}

#[test]
fn test_summary_mentions_duration_and_filters() {
    let preprocessor = ImagePreprocessor::new();
    let frame = mole_frame(120, 120, Point::new(60.0, 60.0), 12.0);
    let result = preprocessor.preprocess_for_dermatology_analysis(&frame);

    let summary = result.summary();
    assert!(summary.contains("ms"));
    assert!(summary.contains("noise_reduction"));
}

#[test]
fn test_rgb_export_matches_frame() {
    let preprocessor = ImagePreprocessor::new();
    let frame = mole_frame(90, 70, Point::new(45.0, 35.0), 10.0);
    let result = preprocessor.preprocess_for_dermatology_analysis(&frame);

    let img = result.to_rgb_image().expect("rgb export");
    assert_eq!(img.dimensions(), (90, 70));
}
