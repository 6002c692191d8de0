/// Common types and utilities for canvas layer extraction
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        ProcessingError::ImageError(err.to_string())
    }
}

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Sentinel reported in place of a hex color when a sampled region is
/// predominantly transparent.
pub const TRANSPARENT: &str = "transparent";

/// Format an RGB triple as `#rrggbb`.
#[must_use]
pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// One detected panel in a canvas layer.
///
/// Geometry describes the panel's interior after any border shrink, in
/// coordinates of the original image. `children` holds the panels nested
/// inside this one; leaves carry an empty list. The `id` is stamped once the
/// whole tree is final and is never reused across panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub id: String,
    pub title: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Detected border thickness in pixels, 0 when no border was found.
    pub border_width: u32,
    /// `#rrggbb`, `"transparent"`, or `None` when no border was sampled.
    pub border_color: Option<String>,
    /// `#rrggbb`, `"transparent"`, or `None` when the interior was empty.
    pub background_color: Option<String>,
    #[serde(default)]
    pub children: Vec<Panel>,
}

impl Panel {
    /// Right edge (exclusive)
    #[must_use]
    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive)
    #[must_use]
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether `other`'s bounds lie entirely within this panel's bounds.
    #[must_use]
    pub fn contains(&self, other: &Panel) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Total number of panels in this subtree, the node itself included.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Panel::count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(x: u32, y: u32, width: u32, height: u32) -> Panel {
        Panel {
            id: String::new(),
            title: "Box".to_string(),
            x,
            y,
            width,
            height,
            border_width: 0,
            border_color: None,
            background_color: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(rgb_to_hex([0, 0, 0]), "#000000");
        assert_eq!(rgb_to_hex([255, 171, 16]), "#ffab10");
    }

    #[test]
    fn test_contains_is_non_strict() {
        let outer = panel(10, 10, 100, 80);
        let inner = panel(10, 10, 100, 80);
        assert!(outer.contains(&inner));

        let shifted = panel(11, 10, 100, 80);
        assert!(!outer.contains(&shifted));
    }

    #[test]
    fn test_subtree_count() {
        let mut root = panel(0, 0, 100, 100);
        let mut child = panel(10, 10, 40, 40);
        child.children.push(panel(15, 15, 10, 10));
        root.children.push(child);
        root.children.push(panel(60, 60, 20, 20));
        assert_eq!(root.count(), 4);
    }

    #[test]
    fn test_panel_serialization_shape() {
        let mut root = panel(5, 5, 50, 40);
        root.id = "abc".to_string();
        root.border_width = 5;
        root.border_color = Some("#000000".to_string());
        root.background_color = Some(TRANSPARENT.to_string());

        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["title"], "Box");
        assert_eq!(json["border_width"], 5);
        assert_eq!(json["background_color"], "transparent");
        // Leaves still serialize an explicit (empty) children list.
        assert!(json["children"].as_array().unwrap().is_empty());
    }
}
