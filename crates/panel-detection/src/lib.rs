//! Panel detection for rasterized canvas layers
//!
//! Locates rectangular regions (panels, cards, boxes) in a decoded pixel
//! buffer, estimates each region's border thickness and representative
//! border/background colors, and nests the results into a containment tree
//! with globally unique identifiers.
//!
//! # Pipeline
//! binarize → trace boundaries → simplify to rectangles → suppress
//! duplicates → classify borders → build hierarchy → assign identifiers
//!
//! Nesting is discovered by re-running the whole pipeline on the interior
//! of every sufficiently large panel (the default), or by a flat geometric
//! containment pass over all nested boundaries.
//!
//! # Example
//! ```no_run
//! use canvas_panel_detection::{PanelDetectionConfig, PanelDetector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = PanelDetector::new(PanelDetectionConfig::default())?;
//!
//! let layer = image::open("layer.png")?;
//! let panels = detector.detect(&layer, "Box");
//!
//! for panel in &panels {
//!     println!(
//!         "{}x{} at ({}, {}), {} children",
//!         panel.width,
//!         panel.height,
//!         panel.x,
//!         panel.y,
//!         panel.children.len()
//!     );
//! }
//! # Ok(())
//! # }
//! ```

pub mod binarize;
pub mod classify;
pub mod contours;
pub mod hierarchy;
pub mod simplify;

use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use canvas_common::ProcessingError;
pub use canvas_common::{Panel, TRANSPARENT};
use contours::TraceMode;
pub use simplify::RectCandidate;

/// How nesting among detected panels is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyStrategy {
    /// Detect only top-level panels, then re-run the pipeline on each
    /// panel's interior. Coordinates come out correctly offset and sibling
    /// shapes that merely overlap never nest by accident.
    Recursive,
    /// Trace every nested boundary once and nest the flat result by
    /// geometric containment.
    Containment,
}

/// Configuration for panel detection
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PanelDetectionConfig {
    /// Minimum component area as a fraction of the image area (0.0-1.0).
    /// Scales with resolution so specks are dropped uniformly.
    pub min_area_fraction: f64,
    /// Polygon simplification epsilon as a fraction of boundary arc length.
    /// 5% collapses anti-aliased or photographed edges into clean corners.
    pub simplify_tolerance: f64,
    /// Lowest accepted width/height ratio; anything flatter is a sliver.
    pub min_aspect: f64,
    /// Highest accepted width/height ratio.
    pub max_aspect: f64,
    /// `IoU` at or above which two detections count as the same shape.
    pub iou_threshold: f64,
    /// Candidate border thickness in pixels, clamped per rectangle.
    pub border_probe: u32,
    /// Fraction of low-alpha interior samples above which a background is
    /// reported as transparent.
    pub transparency_threshold: f64,
    /// Minimum interior size (both sides) for recursive re-detection.
    pub min_recurse_size: u32,
    /// Recursion depth bound; a safeguard against pathological inputs.
    pub max_depth: u32,
    /// Nesting strategy.
    pub hierarchy: HierarchyStrategy,
}

impl Default for PanelDetectionConfig {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.001,
            simplify_tolerance: 0.05,
            min_aspect: 0.2,
            max_aspect: 5.0,
            iou_threshold: 0.9,
            border_probe: 5,
            transparency_threshold: 0.5,
            min_recurse_size: 50,
            max_depth: 12,
            hierarchy: HierarchyStrategy::Recursive,
        }
    }
}

impl PanelDetectionConfig {
    /// Check every tuning parameter against its documented range.
    ///
    /// # Errors
    /// Returns `PanelDetectionError::InvalidConfig` naming the first
    /// parameter that is out of range.
    pub fn validate(&self) -> Result<(), PanelDetectionError> {
        if self.min_area_fraction <= 0.0 || self.min_area_fraction >= 1.0 {
            return Err(PanelDetectionError::InvalidConfig(format!(
                "min_area_fraction must be in (0, 1), got {}",
                self.min_area_fraction
            )));
        }
        if self.simplify_tolerance <= 0.0 || self.simplify_tolerance >= 1.0 {
            return Err(PanelDetectionError::InvalidConfig(format!(
                "simplify_tolerance must be in (0, 1), got {}",
                self.simplify_tolerance
            )));
        }
        if self.min_aspect <= 0.0 || self.max_aspect < self.min_aspect {
            return Err(PanelDetectionError::InvalidConfig(format!(
                "aspect range must satisfy 0 < min <= max, got [{}, {}]",
                self.min_aspect, self.max_aspect
            )));
        }
        if self.iou_threshold <= 0.0 || self.iou_threshold > 1.0 {
            return Err(PanelDetectionError::InvalidConfig(format!(
                "iou_threshold must be in (0, 1], got {}",
                self.iou_threshold
            )));
        }
        if self.transparency_threshold <= 0.0 || self.transparency_threshold >= 1.0 {
            return Err(PanelDetectionError::InvalidConfig(format!(
                "transparency_threshold must be in (0, 1), got {}",
                self.transparency_threshold
            )));
        }
        if self.min_recurse_size == 0 {
            return Err(PanelDetectionError::InvalidConfig(
                "min_recurse_size must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(PanelDetectionError::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur during panel detection
#[derive(Error, Debug)]
pub enum PanelDetectionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),
}

/// Panel detector over decoded pixel buffers
pub struct PanelDetector {
    config: PanelDetectionConfig,
}

impl PanelDetector {
    /// Create a detector with the given configuration.
    ///
    /// # Errors
    /// Returns `PanelDetectionError::InvalidConfig` when a tuning parameter
    /// is out of its documented range.
    pub fn new(config: PanelDetectionConfig) -> Result<Self, PanelDetectionError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Detect panels in a decoded image.
    ///
    /// `title` is attached to every panel of this run. An empty or
    /// zero-sized buffer yields an empty list; "no shapes" and "no image"
    /// report identically so callers handle one case.
    #[must_use]
    pub fn detect(&self, image: &DynamicImage, title: &str) -> Vec<Panel> {
        let has_alpha = image.color().has_alpha();
        let rgba = image.to_rgba8();

        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        info!(
            "Detecting panels in {}x{} layer '{}' ({})",
            width,
            height,
            title,
            if has_alpha { "rgba" } else { "rgb" }
        );

        let mut panels = match self.config.hierarchy {
            HierarchyStrategy::Recursive => self.detect_tree(&rgba, has_alpha, title, (0, 0), 0),
            HierarchyStrategy::Containment => {
                let flat = self.detect_flat(&rgba, has_alpha, title);
                hierarchy::build_containment_tree(flat)
            }
        };

        hierarchy::assign_ids(&mut panels);

        info!(
            "Found {} top-level panels ({} total)",
            panels.len(),
            panels.iter().map(Panel::count).sum::<usize>()
        );

        panels
    }

    /// One recursive pass: top-level rectangles in this buffer, each
    /// classified and then re-searched through its interior crop.
    /// `offset` translates local coordinates back into the original image.
    fn detect_tree(
        &self,
        rgba: &RgbaImage,
        has_alpha: bool,
        title: &str,
        offset: (u32, u32),
        depth: u32,
    ) -> Vec<Panel> {
        let rects = self.stage_candidates(rgba, TraceMode::Outer);
        let mut panels = Vec::with_capacity(rects.len());

        for rect in rects {
            let class = classify::classify_border(
                rgba,
                &rect,
                self.config.border_probe,
                has_alpha,
                self.config.transparency_threshold,
            );
            let inner = class.interior;

            let mut children = Vec::new();
            if depth + 1 < self.config.max_depth
                && inner.width >= self.config.min_recurse_size
                && inner.height >= self.config.min_recurse_size
            {
                let crop =
                    image::imageops::crop_imm(rgba, inner.x, inner.y, inner.width, inner.height)
                        .to_image();
                children = self.detect_tree(
                    &crop,
                    has_alpha,
                    title,
                    (offset.0 + inner.x, offset.1 + inner.y),
                    depth + 1,
                );
            }

            panels.push(Panel {
                id: String::new(),
                title: title.to_string(),
                x: offset.0 + inner.x,
                y: offset.1 + inner.y,
                width: inner.width,
                height: inner.height,
                border_width: class.border_width,
                border_color: class.border_color,
                background_color: class.background_color,
                children,
            });
        }

        panels
    }

    /// One flat pass over every nested boundary, for the containment
    /// strategy. No recursion; nesting happens afterwards.
    fn detect_flat(&self, rgba: &RgbaImage, has_alpha: bool, title: &str) -> Vec<Panel> {
        self.stage_candidates(rgba, TraceMode::Tree)
            .into_iter()
            .map(|rect| {
                let class = classify::classify_border(
                    rgba,
                    &rect,
                    self.config.border_probe,
                    has_alpha,
                    self.config.transparency_threshold,
                );
                let inner = class.interior;
                Panel {
                    id: String::new(),
                    title: title.to_string(),
                    x: inner.x,
                    y: inner.y,
                    width: inner.width,
                    height: inner.height,
                    border_width: class.border_width,
                    border_color: class.border_color,
                    background_color: class.background_color,
                    children: Vec::new(),
                }
            })
            .collect()
    }

    /// Shared front half of the pipeline: mask, boundaries, rectangle
    /// candidates, duplicate suppression.
    fn stage_candidates(&self, rgba: &RgbaImage, mode: TraceMode) -> Vec<RectCandidate> {
        let (width, height) = rgba.dimensions();

        let mask = binarize::edge_mask(rgba);
        let min_area = self.config.min_area_fraction * f64::from(width) * f64::from(height);
        let curves = contours::trace_boundaries(&mask, mode, min_area);

        let candidates: Vec<RectCandidate> = curves
            .iter()
            .filter_map(|curve| {
                simplify::rect_from_boundary(
                    curve,
                    self.config.simplify_tolerance,
                    (width, height),
                    self.config.min_aspect,
                    self.config.max_aspect,
                )
            })
            .collect();

        debug!(
            "{} rectangle candidates from {} boundaries",
            candidates.len(),
            curves.len()
        );

        suppress_duplicates(candidates, self.config.iou_threshold)
    }
}

/// Remove near-duplicate detections of the same physical shape.
///
/// Greedy non-maximum suppression keyed on area: repeatedly keep the
/// largest remaining candidate, then drop every remaining candidate whose
/// `IoU` with it reaches `iou_threshold`. Deterministic, and idempotent on
/// its own output.
#[must_use]
pub fn suppress_duplicates(
    mut candidates: Vec<RectCandidate>,
    iou_threshold: f64,
) -> Vec<RectCandidate> {
    if candidates.is_empty() {
        return candidates;
    }

    candidates.sort_by(|a, b| b.area().cmp(&a.area()));

    let mut keep = Vec::with_capacity(candidates.len());
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }

        keep.push(candidates[i]);

        for j in (i + 1)..candidates.len() {
            if !suppressed[j] && candidates[i].iou(&candidates[j]) >= iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    debug!(
        "Suppression kept {} of {} candidates",
        keep.len(),
        suppressed.len()
    );
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: u32, y: u32, width: u32, height: u32) -> RectCandidate {
        RectCandidate {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = PanelDetectionConfig::default();
        assert_eq!(config.min_area_fraction, 0.001);
        assert_eq!(config.simplify_tolerance, 0.05);
        assert_eq!(config.iou_threshold, 0.9);
        assert_eq!(config.border_probe, 5);
        assert_eq!(config.transparency_threshold, 0.5);
        assert_eq!(config.min_recurse_size, 50);
        assert_eq!(config.hierarchy, HierarchyStrategy::Recursive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_config_is_rejected() {
        let bad_iou = PanelDetectionConfig {
            iou_threshold: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            PanelDetector::new(bad_iou),
            Err(PanelDetectionError::InvalidConfig(_))
        ));

        let bad_tolerance = PanelDetectionConfig {
            simplify_tolerance: 1.5,
            ..Default::default()
        };
        assert!(bad_tolerance.validate().is_err());

        let bad_aspect = PanelDetectionConfig {
            min_aspect: 2.0,
            max_aspect: 1.0,
            ..Default::default()
        };
        assert!(bad_aspect.validate().is_err());
    }

    #[test]
    fn test_suppression_keeps_largest_of_a_cluster() {
        let kept = suppress_duplicates(
            vec![
                rect(10, 10, 100, 100),
                rect(11, 11, 99, 99),
                rect(300, 300, 20, 20),
            ],
            0.9,
        );

        assert_eq!(kept.len(), 2);
        // Largest first after the area sort.
        assert_eq!(kept[0], rect(10, 10, 100, 100));
        assert_eq!(kept[1], rect(300, 300, 20, 20));
    }

    #[test]
    fn test_suppression_is_idempotent() {
        let input = vec![
            rect(0, 0, 50, 50),
            rect(1, 1, 50, 50),
            rect(2, 2, 50, 50),
            rect(100, 0, 30, 30),
            rect(100, 100, 40, 10),
        ];

        let once = suppress_duplicates(input, 0.9);
        let twice = suppress_duplicates(once.clone(), 0.9);
        assert_eq!(once, twice);

        // No kept pair may still reach the threshold.
        for (i, a) in once.iter().enumerate() {
            for b in once.iter().skip(i + 1) {
                assert!(a.iou(b) < 0.9);
            }
        }
    }

    #[test]
    fn test_suppression_ignores_disjoint_rects() {
        let input = vec![rect(0, 0, 10, 10), rect(50, 50, 10, 10)];
        assert_eq!(suppress_duplicates(input, 0.9).len(), 2);
    }

    #[test]
    fn test_detect_on_empty_buffer_returns_nothing() {
        let detector = PanelDetector::new(PanelDetectionConfig::default()).unwrap();
        let empty = DynamicImage::new_rgb8(0, 0);
        assert!(detector.detect(&empty, "Box").is_empty());
    }

    #[test]
    fn test_detect_on_blank_buffer_returns_nothing() {
        let detector = PanelDetector::new(PanelDetectionConfig::default()).unwrap();
        let blank = DynamicImage::new_rgb8(120, 90);
        assert!(detector.detect(&blank, "Box").is_empty());
    }
}
