use geo_types::Coord;
use imageproc::contours::{find_contours, BorderType};
use tracing::{debug, warn};

use crate::{
    error::Result,
    traits::ContourTracer,
    types::{BinaryMask, Contour, ContourForest},
};

/// Imageproc-based contour tracer.
///
/// Suzuki-Abe border following over 8-connected foreground, keeping every boundary
/// pixel and the full nesting tree.
#[derive(Debug, Clone, Default)]
pub struct ImageprocContourTracer;

impl ContourTracer for ImageprocContourTracer {
    fn trace(&self, mask: &BinaryMask) -> Result<ContourForest> {
        let contours = find_contours::<i32>(mask.as_image());

        let mut forest = ContourForest::new();
        for traced in contours {
            let points = traced
                .points
                .iter()
                .map(|p| Coord { x: p.x as i64, y: p.y as i64 })
                .collect();
            let index = forest.push(Contour::new(points), traced.parent)?;

            let is_outer = traced.border_type == BorderType::Outer;
            if let Some(node) = forest.get(index) {
                if node.is_solid() != is_outer {
                    warn!(index, depth = node.depth, "border type disagrees with nesting depth");
                }
            }
        }

        debug!(contours = forest.len(), "traced contours");
        Ok(forest)
    }
}
