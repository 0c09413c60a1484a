//! Luminance histogram and exposure statistics

use crate::types::Frame;

pub const HISTOGRAM_BINS: usize = 256;

/// Bins at or below this count as "dark" mass, at or above the bright bound
/// as "bright" mass. The inner band is the usable dynamic range.
const DARK_BIN_BOUND: usize = 50;
const BRIGHT_BIN_BOUND: usize = 205;

/// Fraction of mass required inside the usable band for the histogram to be
/// considered well distributed.
const WELL_DISTRIBUTED_FRACTION: f64 = 0.7;

/// Luminance distribution of one frame.
#[derive(Debug, Clone)]
pub struct ExposureStats {
    pub histogram: [u32; HISTOGRAM_BINS],
    pub mean: f32,
    pub std_dev: f32,
    /// Fraction of pixels in the dark bins.
    pub dark_fraction: f64,
    /// Fraction of pixels in the bright bins.
    pub bright_fraction: f64,
    total_pixels: u64,
}

impl ExposureStats {
    /// Compute histogram, mean and spread in one pass over the frame.
    ///
    /// Caller guarantees a valid frame; the analyzer front door checks.
    pub fn from_frame(frame: &Frame) -> Self {
        let mut histogram = [0u32; HISTOGRAM_BINS];
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;

        for y in 0..frame.height {
            for x in 0..frame.width {
                let lum = frame.luminance(x, y);
                histogram[(lum as usize).min(HISTOGRAM_BINS - 1)] += 1;
                sum += lum as f64;
                sum_sq += (lum as f64) * (lum as f64);
            }
        }

        let total_pixels = frame.width as u64 * frame.height as u64;
        let n = total_pixels as f64;
        let mean = sum / n;
        let variance = (sum_sq / n - mean * mean).max(0.0);

        let dark: u64 = histogram[..=DARK_BIN_BOUND].iter().map(|&c| c as u64).sum();
        let bright: u64 = histogram[BRIGHT_BIN_BOUND..].iter().map(|&c| c as u64).sum();

        Self {
            histogram,
            mean: mean as f32,
            std_dev: variance.sqrt() as f32,
            dark_fraction: dark as f64 / n,
            bright_fraction: bright as f64 / n,
            total_pixels,
        }
    }

    /// Luminance spread normalized to [0, 1]. A full black/white split peaks
    /// at std-dev 127.5.
    pub fn normalized_std(&self) -> f32 {
        (self.std_dev / 127.5).min(1.0)
    }

    /// True when most histogram mass sits inside the usable band. Mass piled
    /// at the extremes means clipped shadows or blown highlights even if the
    /// mean looks reasonable.
    pub fn well_distributed(&self) -> bool {
        if self.total_pixels == 0 {
            return false;
        }
        1.0 - self.dark_fraction - self.bright_fraction >= WELL_DISTRIBUTED_FRACTION
    }
}
