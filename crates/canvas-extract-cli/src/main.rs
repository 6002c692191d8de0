//! Canvas Extract CLI - panel detection for rasterized design layers
//!
//! Thin shim around the detection pipeline: decodes one or more layer
//! images, fans the detection out across them, and writes the resulting
//! panel trees as JSON.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use canvas_common::Panel;
use canvas_panel_detection::{HierarchyStrategy, PanelDetectionConfig, PanelDetector};

#[derive(Parser)]
#[command(
    name = "canvas-extract",
    version,
    about = "Detect rectangular panels in canvas layer images",
    long_about = "Locate rectangular regions (panels, cards, boxes) in raster images,\n\
                  classify their border and background colors, and emit the nested\n\
                  panel trees as JSON.",
    after_help = "EXAMPLES:\n  \
                  # Detect panels in a single layer\n  \
                  canvas-extract mockup.png\n\n  \
                  # Several layers at once, each with its own label\n  \
                  canvas-extract 'header.png=Header' 'body.png=Body'\n\n  \
                  # Flat containment nesting and pretty JSON\n  \
                  canvas-extract --hierarchy containment --pretty mockup.png\n\n  \
                  # Loosen duplicate suppression and write to a file\n  \
                  canvas-extract --iou-threshold 0.8 --output panels.json mockup.png"
)]
struct Cli {
    /// Input layer images, each optionally suffixed with =TITLE
    #[arg(value_name = "FILE[=TITLE]", required = true)]
    layers: Vec<String>,

    /// Label attached to panels of layers without an explicit =TITLE
    #[arg(short, long, default_value = "Box")]
    title: String,

    /// Minimum component area as a fraction of the image area
    #[arg(long, default_value_t = 0.001)]
    min_area_fraction: f64,

    /// Polygon simplification tolerance as a fraction of boundary length
    #[arg(long, default_value_t = 0.05)]
    simplify_tolerance: f64,

    /// IoU at or above which overlapping detections are merged
    #[arg(long, default_value_t = 0.9)]
    iou_threshold: f64,

    /// Border sample thickness in pixels
    #[arg(long, default_value_t = 5)]
    border_probe: u32,

    /// Fraction of low-alpha samples above which a background is transparent
    #[arg(long, default_value_t = 0.5)]
    transparency_threshold: f64,

    /// Minimum interior size (both sides) for recursive re-detection
    #[arg(long, default_value_t = 50)]
    min_recurse_size: u32,

    /// Recursion depth bound
    #[arg(long, default_value_t = 12)]
    max_depth: u32,

    /// How nesting among panels is discovered
    #[arg(long, value_enum, default_value = "recursive")]
    hierarchy: HierarchyArg,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Write JSON to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HierarchyArg {
    /// Re-run detection inside each panel's interior
    Recursive,
    /// Nest a single flat pass by geometric containment
    Containment,
}

impl From<HierarchyArg> for HierarchyStrategy {
    fn from(arg: HierarchyArg) -> Self {
        match arg {
            HierarchyArg::Recursive => HierarchyStrategy::Recursive,
            HierarchyArg::Containment => HierarchyStrategy::Containment,
        }
    }
}

/// One layer's detection result, in input order.
#[derive(Serialize)]
struct LayerOutput {
    title: String,
    panels: Vec<Panel>,
}

/// Split a `FILE[=TITLE]` argument. A missing or empty title falls back to
/// the run-wide default.
fn parse_layer(arg: &str, default_title: &str) -> (PathBuf, String) {
    match arg.rsplit_once('=') {
        Some((path, title)) if !path.is_empty() && !title.is_empty() => {
            (PathBuf::from(path), title.to_string())
        }
        Some((path, _)) if !path.is_empty() => (PathBuf::from(path), default_title.to_string()),
        _ => (PathBuf::from(arg), default_title.to_string()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // Logs go to stderr; stdout carries nothing but the JSON result.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = PanelDetectionConfig {
        min_area_fraction: cli.min_area_fraction,
        simplify_tolerance: cli.simplify_tolerance,
        iou_threshold: cli.iou_threshold,
        border_probe: cli.border_probe,
        transparency_threshold: cli.transparency_threshold,
        min_recurse_size: cli.min_recurse_size,
        max_depth: cli.max_depth,
        hierarchy: cli.hierarchy.into(),
        ..Default::default()
    };
    let detector = PanelDetector::new(config).context("Invalid detection parameters")?;

    let layers: Vec<(PathBuf, String)> = cli
        .layers
        .iter()
        .map(|arg| parse_layer(arg, &cli.title))
        .collect();

    // One worker per layer; the detector itself is read-only.
    let results: Vec<LayerOutput> = layers
        .par_iter()
        .map(|(path, title)| {
            let panels = match image::open(path) {
                Ok(img) => detector.detect(&img, title),
                Err(err) => {
                    // An unreadable layer reports as empty, like a layer
                    // with no shapes.
                    warn!("Skipping {}: {}", path.display(), err);
                    Vec::new()
                }
            };
            LayerOutput {
                title: title.clone(),
                panels,
            }
        })
        .collect();

    let json = if cli.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };

    match &cli.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layer_with_title() {
        let (path, title) = parse_layer("header.png=Header", "Box");
        assert_eq!(path, PathBuf::from("header.png"));
        assert_eq!(title, "Header");
    }

    #[test]
    fn test_parse_layer_without_title_uses_default() {
        let (path, title) = parse_layer("mockup.png", "Box");
        assert_eq!(path, PathBuf::from("mockup.png"));
        assert_eq!(title, "Box");
    }

    #[test]
    fn test_parse_layer_with_empty_title_uses_default() {
        let (path, title) = parse_layer("mockup.png=", "Box");
        assert_eq!(path, PathBuf::from("mockup.png"));
        assert_eq!(title, "Box");
    }

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::parse_from(["canvas-extract", "a.png"]);
        assert_eq!(cli.layers, vec!["a.png".to_string()]);
        assert_eq!(cli.title, "Box");
        assert_eq!(cli.iou_threshold, 0.9);
        assert_eq!(cli.border_probe, 5);
        assert!(!cli.pretty);
    }
}
