//! Performance Management Testing
//!
//! Integration tests for the performance layer:
//! - Bounded processing-time and memory histories
//! - Frame buffer pool acquire/release discipline
//! - Thermal state ordering and profile derivation
//! - Profile validation

use moleguide::performance::{
    FramePool, PerformanceConfig, PerformanceManager, ThermalState, ThermalStateDetector,
};

#[test]
fn test_processing_history_is_bounded() {
    let manager = PerformanceManager::default();
    for i in 0..60 {
        manager.record_frame_processing_time(i as f64);
    }

    let history = manager.processing_history();
    assert_eq!(history.len(), 50);
    // Oldest surviving sample is the 11th recorded.
    assert_eq!(history[0], 10.0);
    assert_eq!(history[49], 59.0);
}

#[test]
fn test_stats_reflect_recordings() {
    let manager = PerformanceManager::default();
    manager.record_frame_processing_time(10.0);
    manager.record_frame_processing_time(30.0);
    manager.record_memory_usage(1_000);
    manager.record_memory_usage(3_000);

    let stats = manager.stats();
    assert!((stats.avg_processing_ms - 20.0).abs() < 1e-9);
    assert_eq!(stats.peak_memory_bytes, 3_000);
}

#[test]
fn test_cleanup_is_idempotent() {
    let manager = PerformanceManager::default();
    manager.record_frame_processing_time(5.0);
    manager.cleanup();
    manager.cleanup();
    assert!(manager.processing_history().is_empty());
}

#[test]
fn test_pool_recycles_buffers() {
    let pool = FramePool::new(2, 1024);
    let a = pool.acquire();
    let b = pool.acquire();
    assert_eq!(pool.available(), 0);

    pool.release(a);
    pool.release(b);
    assert_eq!(pool.available(), 2);

    // Releases beyond capacity are dropped.
    pool.release(vec![0u8; 1024]);
    assert_eq!(pool.available(), 2);

    // A recycled buffer comes back empty.
    let recycled = pool.acquire();
    assert!(recycled.is_empty());
    assert!(recycled.capacity() >= 1024);
}

#[test]
fn test_thermal_states_order_by_severity() {
    let mut previous_interval = 0u64;
    for state in ThermalState::ALL {
        let adjustments = state.adjustments();
        assert!(
            adjustments.min_processing_interval_ms >= previous_interval,
            "{:?} must not process faster than milder states",
            state
        );
        previous_interval = adjustments.min_processing_interval_ms;
    }

    assert!(ThermalState::None.adjustments().allow_advanced_processing);
    assert!(!ThermalState::Emergency.adjustments().allow_advanced_processing);
}

#[test]
fn test_thermal_detector_tracks_latest_state() {
    let detector = ThermalStateDetector::new();
    assert_eq!(detector.current_state(), ThermalState::None);

    detector.set_state(ThermalState::Severe);
    assert_eq!(detector.current_state(), ThermalState::Severe);
    assert!(!detector.current_adjustments().allow_advanced_processing);
}

#[test]
fn test_profiles_derive_from_thermal_state() {
    let cool = PerformanceConfig::for_thermal_state(ThermalState::None);
    assert!(cool.enable_advanced_filters);
    assert_eq!(cool.processing_interval_ms, 100);

    let hot = PerformanceConfig::for_thermal_state(ThermalState::Critical);
    assert!(!hot.enable_advanced_filters);
    assert!(hot.use_roi);
    assert!(hot.processing_interval_ms >= 700);

    assert!(cool.validate().is_ok());
    assert!(hot.validate().is_ok());
}

#[test]
fn test_profile_validation_bounds() {
    let mut config = PerformanceConfig::default();
    config.resolution_scale = 0.0;
    assert!(config.validate().is_err());

    config = PerformanceConfig::default();
    config.roi_coverage = 0.05;
    assert!(config.validate().is_err());

    config = PerformanceConfig::default();
    config.processing_interval_ms = 0;
    assert!(config.validate().is_err());
}
