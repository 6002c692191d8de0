//! Contour tracing over the binary mask
//!
//! Wraps `imageproc`'s border-following tracer and filters the result down
//! to the boundaries a detection pass cares about.

use image::GrayImage;
use imageproc::contours::{find_contours, Contour};
use imageproc::point::Point;
use tracing::debug;

/// Which boundaries to keep when tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    /// Only top-level outer boundaries. Nested shapes are found later by
    /// re-detecting inside each panel's interior.
    Outer,
    /// Every boundary, nested ones included, for the flat containment pass.
    Tree,
}

/// Extract boundary curves of connected foreground components.
///
/// Components enclosing less than `min_area` pixels are discarded so that
/// noise specks never reach polygon simplification. The threshold is given
/// in absolute pixels; callers derive it from an image-area fraction to stay
/// resolution independent.
#[must_use]
pub fn trace_boundaries(mask: &GrayImage, mode: TraceMode, min_area: f64) -> Vec<Vec<Point<u32>>> {
    let contours: Vec<Contour<u32>> = find_contours(mask);
    let total = contours.len();

    let curves: Vec<Vec<Point<u32>>> = contours
        .into_iter()
        .filter(|contour| match mode {
            TraceMode::Outer => contour.parent.is_none(),
            TraceMode::Tree => true,
        })
        .filter(|contour| contour_area(&contour.points) >= min_area)
        .map(|contour| contour.points)
        .collect();

    debug!(
        "Traced {} boundaries ({} raw, min area {:.1}px)",
        curves.len(),
        total,
        min_area
    );

    curves
}

/// Enclosed area of a closed pixel boundary via the shoelace formula,
/// following the convention of OpenCV's `contourArea`.
#[must_use]
pub fn contour_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut acc = 0.0f64;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        acc += f64::from(p.x) * f64::from(q.y) - f64::from(q.x) * f64::from(p.y);
    }
    acc.abs() / 2.0
}
