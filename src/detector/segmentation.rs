//! Region segmentation primitives
//!
//! Two complementary candidate generators: intensity thresholding followed
//! by connected-component labeling, and seeded region growing from the
//! darkest interior pixel. Both produce `Component`s with enough geometry
//! for scoring without retaining the frame.

use crate::types::Frame;

/// Connected components smaller than this are noise; skip them before
/// scoring.
const MIN_COMPONENT_PIXELS: u32 = 20;

/// Luminance tolerance for region growing around the seed.
const GROW_TOLERANCE: f32 = 25.0;

/// A connected pixel region with accumulated geometry.
#[derive(Debug, Clone)]
pub struct Component {
    pub pixel_count: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub sum_x: u64,
    pub sum_y: u64,
    /// Member pixels with at least one non-member 4-neighbor.
    pub contour: Vec<(u32, u32)>,
    /// Mean luminance inside the region.
    pub mean_luminance: f32,
}

/// Mark pixels darker than `threshold`. On RGB frames with the color filter
/// enabled, strongly colored pixels (blue/green casts, shadows from
/// clothing) are excluded: mole pigment keeps red at or above blue.
pub fn dark_mask(frame: &Frame, threshold: u8, use_color_filter: bool) -> Vec<bool> {
    let mut mask = vec![false; (frame.width * frame.height) as usize];
    for y in 0..frame.height {
        for x in 0..frame.width {
            let lum = frame.luminance(x, y);
            if lum >= threshold as f32 {
                continue;
            }
            if use_color_filter && frame.channels == 3 {
                let idx = ((y * frame.width + x) * 3) as usize;
                let r = frame.data[idx] as i16;
                let b = frame.data[idx + 2] as i16;
                if b > r + 20 {
                    continue;
                }
            }
            mask[(y * frame.width + x) as usize] = true;
        }
    }
    mask
}

/// Label 4-connected components in the mask via iterative flood fill.
pub fn connected_components(mask: &[bool], frame: &Frame) -> Vec<Component> {
    let width = frame.width;
    let height = frame.height;
    let mut visited = vec![false; mask.len()];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }

        let mut pixels = Vec::new();
        visited[start] = true;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            let x = (idx as u32) % width;
            let y = (idx as u32) / width;
            pixels.push((x, y));

            for (nx, ny) in neighbors4(x, y, width, height) {
                let nidx = (ny * width + nx) as usize;
                if mask[nidx] && !visited[nidx] {
                    visited[nidx] = true;
                    stack.push(nidx);
                }
            }
        }

        if pixels.len() >= MIN_COMPONENT_PIXELS as usize {
            components.push(build_component(frame, mask, &pixels));
        }
    }

    components
}

/// Grow a region from the darkest pixel in the central half of the frame,
/// accepting neighbors within a luminance tolerance of the seed. Recovers
/// low-contrast moles the fixed threshold misses.
pub fn region_growing(frame: &Frame, max_pixels: u32) -> Option<Component> {
    let (seed_x, seed_y) = darkest_central_pixel(frame)?;
    let seed_lum = frame.luminance(seed_x, seed_y);

    let width = frame.width;
    let height = frame.height;
    let mut member = vec![false; (width * height) as usize];
    let mut pixels = Vec::new();
    let mut stack = vec![(seed_x, seed_y)];
    member[(seed_y * width + seed_x) as usize] = true;

    while let Some((x, y)) = stack.pop() {
        pixels.push((x, y));
        if pixels.len() as u32 > max_pixels {
            // Runaway growth means the seed sits in a large dark area,
            // not a mole.
            return None;
        }

        for (nx, ny) in neighbors4(x, y, width, height) {
            let nidx = (ny * width + nx) as usize;
            if !member[nidx] && (frame.luminance(nx, ny) - seed_lum).abs() <= GROW_TOLERANCE {
                member[nidx] = true;
                stack.push((nx, ny));
            }
        }
    }

    if (pixels.len() as u32) < MIN_COMPONENT_PIXELS {
        return None;
    }
    Some(build_component(frame, &member, &pixels))
}

fn darkest_central_pixel(frame: &Frame) -> Option<(u32, u32)> {
    let x0 = frame.width / 4;
    let x1 = frame.width - frame.width / 4;
    let y0 = frame.height / 4;
    let y1 = frame.height - frame.height / 4;
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let mut best = None;
    let mut best_lum = f32::MAX;
    for y in y0..y1 {
        for x in x0..x1 {
            let lum = frame.luminance(x, y);
            if lum < best_lum {
                best_lum = lum;
                best = Some((x, y));
            }
        }
    }
    best
}

fn build_component(frame: &Frame, mask: &[bool], pixels: &[(u32, u32)]) -> Component {
    let width = frame.width;
    let height = frame.height;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0u32, 0u32);
    let (mut sum_x, mut sum_y) = (0u64, 0u64);
    let mut lum_sum = 0.0f64;
    let mut contour = Vec::new();

    for &(x, y) in pixels {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
        sum_x += x as u64;
        sum_y += y as u64;
        lum_sum += frame.luminance(x, y) as f64;

        let on_boundary = x == 0
            || y == 0
            || x == width - 1
            || y == height - 1
            || neighbors4(x, y, width, height)
                .iter()
                .any(|&(nx, ny)| !mask[(ny * width + nx) as usize]);
        if on_boundary {
            contour.push((x, y));
        }
    }

    Component {
        pixel_count: pixels.len() as u32,
        min_x,
        min_y,
        max_x,
        max_y,
        sum_x,
        sum_y,
        contour,
        mean_luminance: (lum_sum / pixels.len() as f64) as f32,
    }
}

fn neighbors4(x: u32, y: u32, width: u32, height: u32) -> Vec<(u32, u32)> {
    let mut out = Vec::with_capacity(4);
    if x > 0 {
        out.push((x - 1, y));
    }
    if x + 1 < width {
        out.push((x + 1, y));
    }
    if y > 0 {
        out.push((x, y - 1));
    }
    if y + 1 < height {
        out.push((x, y + 1));
    }
    out
}
