pub mod builder;

use image::Primitive;
use tracing::{debug, info, instrument};

use crate::{
    algorithms::{assemble, binarize, ExtractionMode, MorphologicalFilter},
    config::ExtractionConfig,
    error::Result,
    io::{features_from_polygons, Feature},
    traits::{ContourTracer, FeatureSerializer, GeoTransformReader, PolygonSimplifier},
    transform::{transform_polygon, TransformSource},
    types::{BinaryMask, ScoreMask, WorldPolygon},
};

/// Mask to polygon extraction: binarize, filter, trace, offset, assemble, simplify,
/// transform. Holds no state between runs.
pub struct Pipeline {
    threshold: f64,
    filter: MorphologicalFilter,
    contour_tracer: Box<dyn ContourTracer>,
    mode: ExtractionMode,
    x_offset: i64,
    y_offset: i64,
    pixel_tolerance: f64,
    simplifier: Box<dyn PolygonSimplifier>,
    transform: TransformSource,
    transform_reader: Box<dyn GeoTransformReader>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Build a pipeline with the default collaborators from a configuration
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        builder::PipelineBuilder::from_config(config)?.build()
    }

    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    /// Run the whole pipeline over a score mask, returning world-space polygons
    #[instrument(skip_all, fields(width = mask.width(), height = mask.height()))]
    pub fn process<T>(&self, mask: &ScoreMask<T>) -> Result<Vec<WorldPolygon>>
    where
        T: Primitive + Into<f64>,
    {
        let binary = binarize(mask, self.threshold);
        debug!(
            foreground = binary.foreground_count(),
            threshold = self.threshold,
            "binarized mask"
        );
        self.process_binary(&binary)
    }

    /// Run every stage after binarization
    pub fn process_binary(&self, binary: &BinaryMask) -> Result<Vec<WorldPolygon>> {
        // Resolved once, before any geometry work, so a bad source fails fast.
        let mapping = self.transform.resolve(self.transform_reader.as_ref())?;

        let filtered = self.filter.apply(binary);
        let forest = self
            .contour_tracer
            .trace(&filtered)?
            .offset(self.x_offset, self.y_offset);

        let polygons = assemble(&forest, self.mode)?;
        let assembled = polygons.len();

        let world: Vec<WorldPolygon> = polygons
            .iter()
            .filter_map(|polygon| self.simplifier.simplify(polygon, self.pixel_tolerance))
            .map(|polygon| transform_polygon(&polygon, mapping.as_ref()))
            .collect();

        info!(
            contours = forest.len(),
            polygons = world.len(),
            dropped = assembled - world.len(),
            "extracted polygons"
        );
        Ok(world)
    }

    /// Same as [`Pipeline::process`], wrapped as features with empty properties
    pub fn features<T>(&self, mask: &ScoreMask<T>) -> Result<Vec<Feature>>
    where
        T: Primitive + Into<f64>,
    {
        Ok(features_from_polygons(self.process(mask)?))
    }

    /// Extract features and hand them to a serializer
    pub fn serialize<T>(
        &self,
        mask: &ScoreMask<T>,
        serializer: &dyn FeatureSerializer,
    ) -> Result<String>
    where
        T: Primitive + Into<f64>,
    {
        serializer.serialize(&self.features(mask)?)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: threshold {}, opening {}, closing {}, mode {}, offset ({}, {}), \
             tolerance {}",
            self.threshold,
            kernel_label(self.filter.open.as_ref()),
            kernel_label(self.filter.close.as_ref()),
            self.mode,
            self.x_offset,
            self.y_offset,
            self.pixel_tolerance,
        )
    }
}

fn kernel_label(element: Option<&crate::algorithms::StructuringElement>) -> String {
    match element {
        Some(element) => format!("{}x{}", element.width(), element.height()),
        None => "off".to_string(),
    }
}
