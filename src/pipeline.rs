//! Frame processing pipeline
//!
//! Wires detection, quality analysis and capture validation into one
//! per-frame flow: throttle, optionally crop to an adaptive ROI, run the
//! heavy analysis on a blocking worker, validate against the guide area,
//! then fan the result out to registered listeners.
//!
//! The pipeline owns no camera. Callers feed it frames from whatever
//! source they have; all it asks is that `process_frame` is awaited from
//! a tokio runtime so the analysis can run on the blocking pool.

use crate::detector::MoleDetector;
use crate::errors::GuidanceError;
use crate::metrics::GuidanceMetrics;
use crate::performance::{PerformanceConfig, PerformanceManager};
use crate::performance::thermal::ThermalState;
use crate::preprocess::{ImagePreprocessor, PreprocessConfig, PreprocessingResult};
use crate::quality::{QualityAnalyzer, QualityMetrics};
use crate::roi::{extract_roi, RoiOptimizer};
use crate::types::{Frame, MoleDetection, Rect, ValidationResult};
use crate::validation::CaptureValidator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

/// Receives every validation result the pipeline produces.
///
/// Implementations must be cheap; they run on the pipeline's async task
/// right after analysis. Push heavy work onto your own channel.
pub trait GuidanceListener: Send + Sync {
    fn on_validation(&self, result: &ValidationResult);
}

/// What happened to one submitted frame.
#[derive(Debug, Clone)]
pub enum FrameOutcome {
    /// The pipeline is shut down or not yet started.
    Inactive,
    /// Dropped by frame throttling; no analysis ran.
    Throttled,
    /// Fully analyzed and validated.
    Analyzed(ValidationResult),
}

impl FrameOutcome {
    pub fn result(&self) -> Option<&ValidationResult> {
        match self {
            FrameOutcome::Analyzed(r) => Some(r),
            _ => None,
        }
    }
}

/// The per-session analysis pipeline.
pub struct GuidancePipeline {
    detector: Arc<MoleDetector>,
    analyzer: Arc<QualityAnalyzer>,
    validator: Arc<CaptureValidator>,
    roi: Mutex<RoiOptimizer>,
    performance: Arc<PerformanceManager>,
    metrics: Arc<GuidanceMetrics>,
    listeners: Mutex<Vec<Arc<dyn GuidanceListener>>>,
    performance_config: RwLock<PerformanceConfig>,
    last_analysis: Mutex<Option<Instant>>,
    active: AtomicBool,
}

impl GuidancePipeline {
    pub fn new(
        detector: MoleDetector,
        analyzer: QualityAnalyzer,
        validator: CaptureValidator,
        performance_config: PerformanceConfig,
    ) -> Result<Self, GuidanceError> {
        performance_config
            .validate()
            .map_err(GuidanceError::InvalidConfig)?;
        Ok(Self {
            detector: Arc::new(detector),
            analyzer: Arc::new(analyzer),
            validator: Arc::new(validator),
            // Always adaptive: the profile is hot-swappable, and with an
            // empty history the adaptive ROI equals the centered one.
            roi: Mutex::new(RoiOptimizer::new(true)),
            performance: Arc::new(PerformanceManager::default()),
            metrics: Arc::new(GuidanceMetrics::new()),
            listeners: Mutex::new(Vec::new()),
            performance_config: RwLock::new(performance_config),
            last_analysis: Mutex::new(None),
            active: AtomicBool::new(true),
        })
    }

    /// Pipeline with default components and the high-performance profile.
    pub fn with_defaults() -> Self {
        Self {
            detector: Arc::new(MoleDetector::with_defaults()),
            analyzer: Arc::new(QualityAnalyzer::default()),
            validator: Arc::new(CaptureValidator::default()),
            roi: Mutex::new(RoiOptimizer::new(true)),
            performance: Arc::new(PerformanceManager::default()),
            metrics: Arc::new(GuidanceMetrics::new()),
            listeners: Mutex::new(Vec::new()),
            performance_config: RwLock::new(PerformanceConfig::default()),
            last_analysis: Mutex::new(None),
            active: AtomicBool::new(true),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn add_listener(&self, listener: Arc<dyn GuidanceListener>) {
        self.lock_listeners().push(listener);
    }

    pub fn metrics(&self) -> Arc<GuidanceMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn performance(&self) -> Arc<PerformanceManager> {
        Arc::clone(&self.performance)
    }

    pub fn validator(&self) -> Arc<CaptureValidator> {
        Arc::clone(&self.validator)
    }

    pub fn performance_config(&self) -> PerformanceConfig {
        self.read_performance_config()
    }

    /// Run the still-capture preprocessing chain on a frame the caller is
    /// about to hand off, recording the run in the metrics service.
    pub fn preprocess_capture(
        &self,
        frame: &Frame,
        config: &PreprocessConfig,
    ) -> PreprocessingResult {
        self.metrics.record_preprocessing_run();
        ImagePreprocessor::new().preprocess(frame, config)
    }

    /// Swap the processing profile. Takes effect on the next frame.
    pub fn set_performance_config(&self, config: PerformanceConfig) -> Result<(), GuidanceError> {
        config.validate().map_err(GuidanceError::InvalidConfig)?;
        log::info!(
            "performance profile updated: interval={}ms roi={} scale={}",
            config.processing_interval_ms,
            config.use_roi,
            config.resolution_scale
        );
        *self
            .performance_config
            .write()
            .unwrap_or_else(|p| p.into_inner()) = config;
        Ok(())
    }

    /// Adopt the profile matching a reported thermal state.
    pub fn apply_thermal_state(&self, state: ThermalState) {
        let config = PerformanceConfig::for_thermal_state(state);
        log::info!("thermal state {:?}: interval={}ms", state, config.processing_interval_ms);
        *self
            .performance_config
            .write()
            .unwrap_or_else(|p| p.into_inner()) = config;
    }

    /// Run one frame through the pipeline.
    ///
    /// `guide_area` is the on-screen capture circle in image coordinates;
    /// centering and area ratio are judged against it.
    pub async fn process_frame(
        &self,
        frame: Frame,
        guide_area: Rect,
    ) -> Result<FrameOutcome, GuidanceError> {
        if !self.is_active() {
            return Ok(FrameOutcome::Inactive);
        }

        let config = self.read_performance_config();
        if config.throttle_frames && !self.throttle_allows(config.processing_interval_ms) {
            self.metrics.record_frame_dropped();
            return Ok(FrameOutcome::Throttled);
        }

        let started = Instant::now();
        let frame_size = frame.size_bytes() as u64;
        let frame_dims = (frame.width, frame.height);

        // Crop to the adaptive ROI when the profile asks for it. The
        // detection result is translated back to image coordinates after.
        let (analysis_frame, roi_offset) = if config.use_roi {
            let roi = {
                let optimizer = self.lock_roi();
                optimizer.calculate_roi(frame_dims, config.roi_coverage)
            };
            let cropped = extract_roi(&frame, &roi)?;
            (cropped, Some((roi.x as f32, roi.y as f32)))
        } else {
            (frame, None)
        };

        // Low-power profiles analyze a downscaled frame; detection geometry
        // is inflated back afterwards.
        let scale = config.resolution_scale;
        let analysis_frame = if scale < 1.0 {
            downscale(&analysis_frame, scale)
        } else {
            analysis_frame
        };

        let (detection, quality) = self.analyze_blocking(analysis_frame).await?;
        let detection = detection.map(|d| {
            let d = if scale < 1.0 { d.scale_by(1.0 / scale) } else { d };
            match roi_offset {
                Some((dx, dy)) => d.offset_by(dx, dy),
                None => d,
            }
        });

        self.metrics.record_detection(detection.is_some());
        if let Some(d) = &detection {
            self.lock_roi().update_detection_history(d.centroid);
        }

        let result = self
            .validator
            .validate(detection.as_ref(), &quality, &guide_area);

        self.metrics.record_frame_analyzed();
        self.metrics.record_validation(result.guide_state);
        self.performance
            .record_frame_processing_time(started.elapsed().as_secs_f64() * 1000.0);
        self.performance.record_memory_usage(frame_size);
        *self.lock_last_analysis() = Some(started);

        // Listeners must not hear from a pipeline that shut down while the
        // frame was in flight.
        if self.is_active() {
            let listeners = self.lock_listeners().clone();
            for listener in listeners {
                listener.on_validation(&result);
            }
        }

        Ok(FrameOutcome::Analyzed(result))
    }

    /// Stop analyzing and notifying. Idempotent; in-flight frames finish
    /// but are not delivered to listeners.
    pub fn shutdown(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            log::info!("guidance pipeline shut down");
        }
        self.lock_listeners().clear();
        self.lock_roi().clear_history();
        self.performance.cleanup();
    }

    async fn analyze_blocking(
        &self,
        frame: Frame,
    ) -> Result<(Option<MoleDetection>, QualityMetrics), GuidanceError> {
        let detector = Arc::clone(&self.detector);
        let analyzer = Arc::clone(&self.analyzer);
        tokio::task::spawn_blocking(move || {
            let detection = detector.detect(&frame);
            let quality = analyzer.analyze(&frame);
            (detection, quality)
        })
        .await
        .map_err(|e| GuidanceError::AnalysisTask(e.to_string()))
    }

    /// True when enough time has passed since the last analyzed frame.
    /// The first frame always passes.
    fn throttle_allows(&self, interval_ms: u64) -> bool {
        let last = self.lock_last_analysis();
        match *last {
            Some(instant) => instant.elapsed().as_millis() as u64 >= interval_ms,
            None => true,
        }
    }

    fn read_performance_config(&self) -> PerformanceConfig {
        self.performance_config
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn lock_roi(&self) -> std::sync::MutexGuard<'_, RoiOptimizer> {
        self.roi.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn GuidanceListener>>> {
        self.listeners.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_last_analysis(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.last_analysis.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Nearest-neighbor downscale. Quality loss is acceptable: the scaled
/// frame only feeds detection and coarse quality metrics.
fn downscale(frame: &Frame, scale: f32) -> Frame {
    let new_width = ((frame.width as f32 * scale).round() as u32).max(1);
    let new_height = ((frame.height as f32 * scale).round() as u32).max(1);
    let channels = frame.channels as u32;
    let mut data = Vec::with_capacity((new_width * new_height * channels) as usize);

    for y in 0..new_height {
        let src_y = ((y as f32 / scale) as u32).min(frame.height - 1);
        for x in 0..new_width {
            let src_x = ((x as f32 / scale) as u32).min(frame.width - 1);
            let idx = ((src_y * frame.width + src_x) * channels) as usize;
            data.extend_from_slice(&frame.data[idx..idx + channels as usize]);
        }
    }
    Frame::new(data, new_width, new_height, frame.channels)
}

impl std::fmt::Debug for GuidancePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuidancePipeline")
            .field("active", &self.is_active())
            .finish()
    }
}
