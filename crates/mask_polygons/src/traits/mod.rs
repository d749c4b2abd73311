use std::path::Path;

use crate::{
    error::Result,
    io::Feature,
    transform::AffineTransform,
    types::{BinaryMask, ContourForest, PixelPolygon},
};

/// Trait for contour tracing algorithms
pub trait ContourTracer: Send + Sync {
    /// Trace every foreground/background boundary of the mask, with its nesting
    fn trace(&self, mask: &BinaryMask) -> Result<ContourForest>;
}

/// Trait for ring simplification algorithms
pub trait PolygonSimplifier: Send + Sync {
    /// Simplify one polygon. `None` means the exterior collapsed and the polygon is gone.
    fn simplify(&self, polygon: &PixelPolygon, tolerance: f64) -> Option<PixelPolygon>;
}

/// Per-vertex pixel to world mapping
pub trait PixelToWorld: Send + Sync {
    fn apply(&self, col: f64, row: f64) -> (f64, f64);
}

/// Reads the georeferencing of a raster dataset
pub trait GeoTransformReader: Send + Sync {
    fn read_transform(&self, dataset: &Path) -> Result<AffineTransform>;
}

/// Turns features into a text document
pub trait FeatureSerializer: Send + Sync {
    fn serialize(&self, features: &[Feature]) -> Result<String>;
}
