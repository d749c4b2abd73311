use crate::{
    algorithms::{
        ExtractionMode, ImageprocContourTracer, KernelSpec, MorphologicalFilter,
        TopologyPreservingSimplifier,
    },
    config::{ExtractionConfig, DEFAULT_KERNEL_SIZE},
    error::Result,
    io::WorldFileReader,
    pipeline::Pipeline,
    traits::{ContourTracer, GeoTransformReader, PolygonSimplifier},
    transform::TransformSource,
};

/// Builder for extraction pipelines with a fluent API
pub struct PipelineBuilder {
    threshold: f64,
    open_kernel: Option<KernelSpec>,
    close_kernel: Option<KernelSpec>,
    contour_tracer: Option<Box<dyn ContourTracer>>,
    mode: ExtractionMode,
    x_offset: i64,
    y_offset: i64,
    pixel_tolerance: f64,
    simplifier: Option<Box<dyn PolygonSimplifier>>,
    transform: TransformSource,
    transform_reader: Option<Box<dyn GeoTransformReader>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder with 3x3 opening and closing
    pub fn new() -> Self {
        Self {
            threshold: 0.5,
            open_kernel: Some(KernelSpec::Size(DEFAULT_KERNEL_SIZE)),
            close_kernel: Some(KernelSpec::Size(DEFAULT_KERNEL_SIZE)),
            contour_tracer: None,
            mode: ExtractionMode::Polygons,
            x_offset: 0,
            y_offset: 0,
            pixel_tolerance: 0.0,
            simplifier: None,
            transform: TransformSource::default(),
            transform_reader: None,
        }
    }

    /// Start from a configuration; fails on an unknown mode
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            threshold: config.threshold,
            open_kernel: config.open_kernel.clone(),
            close_kernel: config.close_kernel.clone(),
            mode: config.extraction_mode()?,
            x_offset: config.x_offset,
            y_offset: config.y_offset,
            pixel_tolerance: config.pixel_tolerance,
            transform: config.transform.to_source(),
            ..Self::new()
        })
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Opening kernel; `None` skips the opening step
    pub fn open_kernel(mut self, kernel: Option<KernelSpec>) -> Self {
        self.open_kernel = kernel;
        self
    }

    /// Closing kernel; `None` skips the closing step
    pub fn close_kernel(mut self, kernel: Option<KernelSpec>) -> Self {
        self.close_kernel = kernel;
        self
    }

    /// Skip both morphological steps
    pub fn without_morphology(self) -> Self {
        self.open_kernel(None).close_kernel(None)
    }

    pub fn mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Origin of this tile inside a larger raster, in pixels
    pub fn offset(mut self, x_offset: i64, y_offset: i64) -> Self {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self
    }

    /// Simplification tolerance in pixels; 0 disables simplification
    pub fn with_simplification(mut self, tolerance: f64) -> Self {
        self.pixel_tolerance = tolerance;
        self
    }

    pub fn transform(mut self, transform: impl Into<TransformSource>) -> Self {
        self.transform = transform.into();
        self
    }

    /// Set the contour tracer (replaces any existing one)
    pub fn set_contour_tracer<C>(mut self, tracer: C) -> Self
    where
        C: ContourTracer + 'static,
    {
        self.contour_tracer = Some(Box::new(tracer));
        self
    }

    /// Set the simplifier (replaces any existing one)
    pub fn set_simplifier<S>(mut self, simplifier: S) -> Self
    where
        S: PolygonSimplifier + 'static,
    {
        self.simplifier = Some(Box::new(simplifier));
        self
    }

    /// Set the reader used for dataset transform sources
    pub fn set_transform_reader<R>(mut self, reader: R) -> Self
    where
        R: GeoTransformReader + 'static,
    {
        self.transform_reader = Some(Box::new(reader));
        self
    }

    /// Resolve kernels and fill in default collaborators
    pub fn build(self) -> Result<Pipeline> {
        let filter =
            MorphologicalFilter::from_specs(self.open_kernel.as_ref(), self.close_kernel.as_ref())?;

        Ok(Pipeline {
            threshold: self.threshold,
            filter,
            contour_tracer: self
                .contour_tracer
                .unwrap_or_else(|| Box::new(ImageprocContourTracer)),
            mode: self.mode,
            x_offset: self.x_offset,
            y_offset: self.y_offset,
            pixel_tolerance: self.pixel_tolerance,
            simplifier: self
                .simplifier
                .unwrap_or_else(|| Box::new(TopologyPreservingSimplifier)),
            transform: self.transform,
            transform_reader: self
                .transform_reader
                .unwrap_or_else(|| Box::new(WorldFileReader)),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
