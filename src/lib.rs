//! Moleguide: real-time camera guidance for dermatology self-examination
//!
//! This crate analyzes camera preview frames and tells the user how to
//! position the phone so a mole photo comes out usable: centered in the
//! guide circle, at the right distance, sharp, and well lit.
//!
//! # Features
//! - Dark-region mole detection with a region-growing fallback
//! - Sharpness, brightness and contrast quality scoring
//! - Capture validation state machine with Spanish user guidance
//! - Auto-capture countdown once the frame holds steady
//! - Adaptive ROI cropping and thermal-aware processing profiles
//! - Capture preprocessing (illumination, contrast, denoise, sharpen)
//!
//! # Usage
//! ```rust,ignore
//! use moleguide::pipeline::GuidancePipeline;
//! use moleguide::types::Rect;
//!
//! # async fn example(frame: moleguide::types::Frame) {
//! let pipeline = GuidancePipeline::with_defaults();
//! let guide_area = Rect::new(240.0, 420.0, 600.0, 600.0);
//! let outcome = pipeline.process_frame(frame, guide_area).await;
//! # }
//! ```

pub mod autocapture;
pub mod config;
pub mod detector;
pub mod errors;
pub mod feedback;
pub mod metrics;
pub mod performance;
pub mod pipeline;
pub mod preprocess;
pub mod quality;
pub mod roi;
pub mod types;
pub mod validation;

// Testing utilities - synthetic frames for offline testing
pub mod testing;

// Re-exports for convenience
pub use errors::GuidanceError;
pub use pipeline::{FrameOutcome, GuidanceListener, GuidancePipeline};
pub use types::{Frame, GuideState, MoleDetection, Point, Rect, ValidationResult};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Crate description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Initialize logging for the guidance core.
///
/// Host apps that configure their own logger can skip this; `try_init`
/// makes double initialization harmless.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("moleguide=info");
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        log::info!("{} v{} logging initialized", NAME, VERSION);
    }
}

/// Library metadata for host-app diagnostics screens.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CrateInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

/// Get library information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME,
        version: VERSION,
        description: DESCRIPTION,
    }
}
