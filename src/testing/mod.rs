//! Testing utilities for moleguide
//!
//! Provides synthetic frames with known properties so detection and
//! quality analysis can be tested offline without a camera.

pub mod synthetic_frames;

pub use synthetic_frames::{checkerboard_frame, gradient_frame, gray_frame, mole_frame};
