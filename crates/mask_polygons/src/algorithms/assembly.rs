use std::str::FromStr;

use geo_types::Polygon;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};
use tracing::debug;

use crate::{
    error::{MaskError, Result},
    types::{is_degenerate_ring, ContourForest, PixelPolygon},
};

/// Which polygon extraction to run over the traced contours.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExtractionMode {
    /// Plain hierarchy assembly: exteriors with their direct holes
    #[default]
    Polygons,
    /// Building footprint regularization (not available yet)
    Buildings,
}

impl ExtractionMode {
    /// Parse a mode name, rejecting anything that is not a known mode.
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name).map_err(|_| MaskError::UnsupportedMode(name.to_string()))
    }

    pub fn mode_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }
}

/// Group contours into polygons according to the extraction mode.
pub fn assemble(forest: &ContourForest, mode: ExtractionMode) -> Result<Vec<PixelPolygon>> {
    match mode {
        ExtractionMode::Polygons => Ok(polygons_from_forest(forest)),
        ExtractionMode::Buildings => Err(MaskError::ModeNotImplemented(mode)),
    }
}

/// Every even-depth contour becomes an exterior; its direct odd-depth children are its
/// holes. Contours nested inside a hole start their own polygon. Output follows arena
/// order of the exteriors.
pub fn polygons_from_forest(forest: &ContourForest) -> Vec<PixelPolygon> {
    let children = forest.child_table();
    let mut polygons = Vec::new();
    let mut dropped = 0usize;

    for (index, node) in forest.nodes().iter().enumerate() {
        if !node.is_solid() {
            continue;
        }

        let exterior = node.contour.to_ring();
        if is_degenerate_ring(&exterior) {
            dropped += 1;
            continue;
        }

        let holes = children[index]
            .iter()
            .filter_map(|&child| forest.get(child))
            .map(|child| child.contour.to_ring())
            .filter(|ring| {
                let degenerate = is_degenerate_ring(ring);
                dropped += degenerate as usize;
                !degenerate
            })
            .collect();

        polygons.push(Polygon::new(exterior, holes));
    }

    debug!(polygons = polygons.len(), dropped, "assembled polygons from contour hierarchy");
    polygons
}
