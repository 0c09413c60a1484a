//! Synthetic frames with known statistics
//!
//! Each generator produces deterministic pixel data with properties pinned
//! by its name: uniform frames have zero variance, checkerboards have
//! maximal local contrast, gradients span the full luminance range, and
//! mole frames place a dark disc on a skin-toned background.

use crate::types::{Frame, Point};

/// Skin-toned RGB background used by [`mole_frame`], luminance around 177.
pub const SKIN_RGB: [u8; 3] = [200, 170, 150];

/// Mole RGB used by [`mole_frame`], luminance around 51.
pub const MOLE_RGB: [u8; 3] = [70, 45, 35];

/// Uniform single-channel frame. Zero variance, mean equals `value`.
pub fn gray_frame(width: u32, height: u32, value: u8) -> Frame {
    Frame::new(vec![value; (width * height) as usize], width, height, 1)
}

/// Single-channel black/white checkerboard. Maximal local contrast at
/// every block boundary, overall mean near 127.
pub fn checkerboard_frame(width: u32, height: u32, check_size: u32) -> Frame {
    let check = check_size.max(1);
    let mut data = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let on = ((x / check) + (y / check)) % 2 == 0;
            data.push(if on { 255 } else { 0 });
        }
    }
    Frame::new(data, width, height, 1)
}

/// Single-channel horizontal luminance ramp from 0 at the left edge to
/// 255 at the right. Mean is 127.5 regardless of size.
pub fn gradient_frame(width: u32, height: u32) -> Frame {
    let mut data = Vec::with_capacity((width * height) as usize);
    let denom = (width.saturating_sub(1)).max(1) as f32;
    for _y in 0..height {
        for x in 0..width {
            let value = (x as f32 * 255.0 / denom).round().clamp(0.0, 255.0) as u8;
            data.push(value);
        }
    }
    Frame::new(data, width, height, 1)
}

/// RGB frame with a dark mole disc on a skin-toned background.
///
/// The disc edge is blended over roughly two pixels and a faint
/// deterministic texture is added so the frame is not perfectly flat.
/// Mole pixels stay well below luminance 90 and skin pixels well above,
/// so threshold detection separates them cleanly.
pub fn mole_frame(width: u32, height: u32, center: Point, radius: f32) -> Frame {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - center.x;
            let dy = y as f32 - center.y;
            let dist = (dx * dx + dy * dy).sqrt();

            // 0.0 inside the mole, 1.0 on skin, linear over the edge band.
            let t = ((dist - radius) / 2.0 + 0.5).clamp(0.0, 1.0);
            let texture = ((x * 7 + y * 13) % 5) as f32 - 2.0;

            for c in 0..3 {
                let blended =
                    MOLE_RGB[c] as f32 + t * (SKIN_RGB[c] as f32 - MOLE_RGB[c] as f32) + texture;
                data.push(blended.round().clamp(0.0, 255.0) as u8);
            }
        }
    }
    Frame::new(data, width, height, 3)
}
