//! Border and background classification
//!
//! Samples the outer ring of a detected rectangle against its remaining
//! interior to estimate border thickness and two representative colors, then
//! shrinks the reported geometry to the interior of the bordered shape.

use std::collections::HashMap;

use canvas_common::{rgb_to_hex, TRANSPARENT};
use image::RgbaImage;

use crate::simplify::RectCandidate;

/// Alpha value (of 255) below which a sample counts as transparent.
const ALPHA_CUTOFF: u8 = 100;

/// Result of classifying one rectangle candidate.
#[derive(Debug, Clone)]
pub struct BorderClass {
    /// Probed border thickness, clamped to the rectangle size. Zero means
    /// the rectangle is too small to carry a detectable border.
    pub border_width: u32,
    pub border_color: Option<String>,
    pub background_color: Option<String>,
    /// Candidate bounds shrunk inward by `border_width` where possible,
    /// otherwise the original bounds.
    pub interior: RectCandidate,
}

/// Classify a rectangle's border band and interior background.
///
/// `probe` is the candidate border thickness; it is clamped to half the
/// rectangle's smaller side. Representative colors are the statistical mode
/// of the exact pixel values in each sample set, which holds up against
/// anti-aliasing noise better than averaging. When the source buffer carries
/// an alpha channel and more than `transparency_threshold` of the interior
/// samples fall below the alpha cutoff, the background is reported as the
/// transparent sentinel.
#[must_use]
pub fn classify_border(
    rgba: &RgbaImage,
    rect: &RectCandidate,
    probe: u32,
    has_alpha: bool,
    transparency_threshold: f64,
) -> BorderClass {
    let border = probe.min(rect.width / 2).min(rect.height / 2);
    if border == 0 {
        return BorderClass {
            border_width: 0,
            border_color: None,
            background_color: None,
            interior: *rect,
        };
    }

    let mut border_samples: Vec<[u8; 4]> = Vec::new();
    let mut interior_samples: Vec<[u8; 4]> = Vec::new();

    for dy in 0..rect.height {
        for dx in 0..rect.width {
            let px = rgba.get_pixel(rect.x + dx, rect.y + dy).0;
            let in_band = dx < border
                || dy < border
                || dx >= rect.width - border
                || dy >= rect.height - border;
            if in_band {
                border_samples.push(px);
            } else {
                interior_samples.push(px);
            }
        }
    }

    let border_color = Some(rgb_to_hex(mode_color(&border_samples)));

    if interior_samples.is_empty() {
        // The band consumed the whole rectangle; nothing to shrink into.
        return BorderClass {
            border_width: border,
            border_color,
            background_color: None,
            interior: *rect,
        };
    }

    let background_color = if has_alpha && transparent_fraction(&interior_samples) > transparency_threshold {
        Some(TRANSPARENT.to_string())
    } else {
        Some(rgb_to_hex(mode_color(&interior_samples)))
    };

    let interior = RectCandidate {
        x: rect.x + border,
        y: rect.y + border,
        width: rect.width - 2 * border,
        height: rect.height - 2 * border,
    };

    BorderClass {
        border_width: border,
        border_color,
        background_color,
        interior,
    }
}

/// Most frequent exact RGB value in a sample set. Ties resolve toward the
/// smallest triple so repeated runs stay deterministic.
fn mode_color(pixels: &[[u8; 4]]) -> [u8; 3] {
    let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
    for px in pixels {
        *counts.entry([px[0], px[1], px[2]]).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(color, _)| color)
        .unwrap_or([0, 0, 0])
}

/// Fraction of samples whose alpha falls below the cutoff.
fn transparent_fraction(pixels: &[[u8; 4]]) -> f64 {
    if pixels.is_empty() {
        return 0.0;
    }
    let transparent = pixels.iter().filter(|px| px[3] < ALPHA_CUTOFF).count();
    transparent as f64 / pixels.len() as f64
}
