/// Performance management module
///
/// Owns the process-wide resources the pipeline shares across frames: a
/// reusable frame-buffer pool and bounded histories of processing time and
/// memory usage, plus the `PerformanceConfig` presets that scale work down
/// under thermal or memory pressure.
pub mod thermal;

pub use thermal::{ThermalAdjustments, ThermalState, ThermalStateDetector};

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Bounds for the two measurement histories. Pinned by tests; any change
/// here must keep eviction FIFO.
pub const PROCESSING_HISTORY_CAPACITY: usize = 50;
pub const MEMORY_HISTORY_CAPACITY: usize = 20;

/// Reusable frame-buffer pool with borrow/return semantics.
///
/// Returned buffers are cleared and retained up to the cap; when the pool is
/// empty a fresh buffer is allocated transparently.
#[derive(Debug)]
pub struct FramePool {
    buffers: Mutex<Vec<Vec<u8>>>,
    max_buffers: usize,
    buffer_capacity: usize,
}

impl FramePool {
    pub fn new(max_buffers: usize, buffer_capacity: usize) -> Self {
        let mut buffers = Vec::with_capacity(max_buffers);
        for _ in 0..max_buffers {
            buffers.push(Vec::with_capacity(buffer_capacity));
        }
        Self {
            buffers: Mutex::new(buffers),
            max_buffers,
            buffer_capacity,
        }
    }

    pub fn acquire(&self) -> Vec<u8> {
        let mut pool = self.buffers.lock().unwrap_or_else(|p| p.into_inner());
        pool.pop()
            .unwrap_or_else(|| Vec::with_capacity(self.buffer_capacity))
    }

    pub fn release(&self, mut buffer: Vec<u8>) {
        buffer.clear();
        let mut pool = self.buffers.lock().unwrap_or_else(|p| p.into_inner());
        if pool.len() < self.max_buffers {
            pool.push(buffer);
        }
        // Past the cap the buffer is simply dropped.
    }

    pub fn available(&self) -> usize {
        self.buffers.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Release pooled memory. Safe to call repeatedly.
    pub fn clear(&self) {
        self.buffers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }
}

/// Read-only snapshot of recent performance measurements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub frames_recorded: usize,
    pub avg_processing_ms: f64,
    pub max_processing_ms: f64,
    pub avg_memory_bytes: u64,
    pub peak_memory_bytes: u64,
    pub pooled_buffers: usize,
}

/// Processing profile derived from device state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Minimum interval between analyzed frames (ms).
    pub processing_interval_ms: u64,
    /// Scale applied to frame resolution before analysis (0..=1].
    pub resolution_scale: f32,
    /// Analyze an ROI crop instead of the full frame.
    pub use_roi: bool,
    /// ROI coverage of each frame dimension when `use_roi` is set.
    pub roi_coverage: f32,
    pub enable_pooling: bool,
    pub enable_advanced_filters: bool,
    pub throttle_frames: bool,
}

impl PerformanceConfig {
    /// Full-quality profile for capable, cool devices.
    pub fn high_performance() -> Self {
        Self {
            processing_interval_ms: 100,
            resolution_scale: 1.0,
            use_roi: false,
            roi_coverage: 1.0,
            enable_pooling: true,
            enable_advanced_filters: true,
            throttle_frames: false,
        }
    }

    /// Reduced profile for low-end or hot devices.
    pub fn low_performance() -> Self {
        Self {
            processing_interval_ms: 250,
            resolution_scale: 0.5,
            use_roi: true,
            roi_coverage: 0.6,
            enable_pooling: true,
            enable_advanced_filters: false,
            throttle_frames: true,
        }
    }

    /// Profile for a thermal state: start from the matching preset and apply
    /// the thermal frequency floor.
    pub fn for_thermal_state(state: ThermalState) -> Self {
        let adjustments = state.adjustments();
        let mut config = if adjustments.allow_advanced_processing {
            Self::high_performance()
        } else {
            Self::low_performance()
        };
        config.processing_interval_ms = config
            .processing_interval_ms
            .max(adjustments.min_processing_interval_ms);
        config.enable_advanced_filters = adjustments.allow_advanced_processing;
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.resolution_scale) || self.resolution_scale == 0.0 {
            return Err("resolution_scale must be in (0.0, 1.0]".to_string());
        }
        if !(0.1..=1.0).contains(&self.roi_coverage) {
            return Err("roi_coverage must be between 0.1 and 1.0".to_string());
        }
        if self.processing_interval_ms == 0 {
            return Err("processing_interval_ms must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self::high_performance()
    }
}

/// Tracks processing-time and memory histories and owns the buffer pool.
/// The `record_*` mutators are the only writers and are cheap enough to call
/// on every frame.
#[derive(Debug)]
pub struct PerformanceManager {
    pool: FramePool,
    processing_times_ms: Mutex<VecDeque<f64>>,
    memory_usage_bytes: Mutex<VecDeque<u64>>,
}

impl PerformanceManager {
    pub fn new(pool_buffers: usize, buffer_capacity: usize) -> Self {
        Self {
            pool: FramePool::new(pool_buffers, buffer_capacity),
            processing_times_ms: Mutex::new(VecDeque::with_capacity(PROCESSING_HISTORY_CAPACITY)),
            memory_usage_bytes: Mutex::new(VecDeque::with_capacity(MEMORY_HISTORY_CAPACITY)),
        }
    }

    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    pub fn record_frame_processing_time(&self, elapsed_ms: f64) {
        let mut history = self
            .processing_times_ms
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        if history.len() == PROCESSING_HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(elapsed_ms);
    }

    pub fn record_memory_usage(&self, bytes: u64) {
        let mut history = self
            .memory_usage_bytes
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        if history.len() == MEMORY_HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(bytes);
    }

    /// Snapshot over the bounded histories; O(history size).
    pub fn stats(&self) -> PerformanceStats {
        let times = self
            .processing_times_ms
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        let memory = self
            .memory_usage_bytes
            .lock()
            .unwrap_or_else(|p| p.into_inner());

        let frames_recorded = times.len();
        let (avg_processing_ms, max_processing_ms) = if times.is_empty() {
            (0.0, 0.0)
        } else {
            (
                times.iter().sum::<f64>() / times.len() as f64,
                times.iter().cloned().fold(0.0, f64::max),
            )
        };
        let (avg_memory_bytes, peak_memory_bytes) = if memory.is_empty() {
            (0, 0)
        } else {
            (
                memory.iter().sum::<u64>() / memory.len() as u64,
                *memory.iter().max().unwrap_or(&0),
            )
        };

        PerformanceStats {
            frames_recorded,
            avg_processing_ms,
            max_processing_ms,
            avg_memory_bytes,
            peak_memory_bytes,
            pooled_buffers: self.pool.available(),
        }
    }

    /// Retained processing-time entries, oldest first. Exposed for tests and
    /// diagnostics.
    pub fn processing_history(&self) -> Vec<f64> {
        self.processing_times_ms
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Release pooled resources and drop history; idempotent.
    pub fn cleanup(&self) {
        self.pool.clear();
        self.processing_times_ms
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
        self.memory_usage_bytes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
        log::debug!("performance manager cleaned up");
    }
}

impl Default for PerformanceManager {
    fn default() -> Self {
        // 6 pooled buffers sized for a 1080p RGB frame.
        Self::new(6, 1920 * 1080 * 3)
    }
}
