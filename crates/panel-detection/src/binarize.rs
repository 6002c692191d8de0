//! Layer binarization
//!
//! Turns a pixel buffer into a two-level edge mask: luminance grayscale,
//! inverted mean-adaptive threshold, then a 3x3 morphological close that
//! seals small gaps in shape outlines before contour tracing.
//!
//! The adaptive threshold is a pure Rust port of
//! `cv2.adaptiveThreshold(..., THRESH_BINARY_INV)` with a box window;
//! `imageproc`'s `adaptive_threshold` has no subtraction constant, so the
//! windowed mean is computed here over an integral image.

use image::{GrayImage, Luma, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;

/// Window radius for the adaptive threshold (11x11 neighborhood).
pub const BLOCK_RADIUS: u32 = 5;

/// Constant subtracted from the windowed mean before comparison.
pub const MEAN_BIAS: f64 = 2.0;

/// Build the binary edge mask for a layer.
///
/// Foreground marks pixels darker than their local neighborhood, i.e. the
/// drawn outlines of shapes. The alpha channel does not participate.
#[must_use]
pub fn edge_mask(rgba: &RgbaImage) -> GrayImage {
    let gray = image::imageops::grayscale(rgba);
    let mask = adaptive_threshold_inv(&gray, BLOCK_RADIUS, MEAN_BIAS);
    close(&mask, Norm::LInf, 1)
}

/// Inverted mean-adaptive threshold.
///
/// A pixel becomes foreground (255) when its intensity falls more than
/// `bias` below the mean of its `(2 * block_radius + 1)^2` neighborhood,
/// clamped at the image edges.
#[must_use]
pub fn adaptive_threshold_inv(gray: &GrayImage, block_radius: u32, bias: f64) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }

    let integral = integral_image(gray);
    let w = width as usize;
    let r = block_radius as i64;

    for y in 0..height {
        for x in 0..width {
            let x0 = (i64::from(x) - r).max(0) as usize;
            let y0 = (i64::from(y) - r).max(0) as usize;
            let x1 = (i64::from(x) + r).min(i64::from(width) - 1) as usize;
            let y1 = (i64::from(y) + r).min(i64::from(height) - 1) as usize;

            // Window sum from the integral image, corners exclusive on the
            // low side.
            let sum = integral[(y1 + 1) * (w + 1) + (x1 + 1)]
                + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + (x1 + 1)]
                - integral[(y1 + 1) * (w + 1) + x0];
            let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
            let mean = sum as f64 / count;

            let value = f64::from(gray.get_pixel(x, y).0[0]);
            let fg = value < mean - bias;
            mask.put_pixel(x, y, Luma([if fg { 255 } else { 0 }]));
        }
    }

    mask
}

/// Summed-area table with one extra row and column of zeros.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (width, height) = gray.dimensions();
    let w = width as usize;
    let h = height as usize;
    let mut integral = vec![0u64; (w + 1) * (h + 1)];

    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += u64::from(gray.get_pixel(x as u32, y as u32).0[0]);
            integral[(y + 1) * (w + 1) + (x + 1)] = integral[y * (w + 1) + (x + 1)] + row_sum;
        }
    }

    integral
}
