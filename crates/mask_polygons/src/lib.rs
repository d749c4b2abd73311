//! # Mask to Polygon Extraction Library
//!
//! Turns a raster classification mask (per-pixel scores) into georeferenced vector
//! polygons: the inverse of rasterization.
//!
//! ## Stages
//!
//! - **Binarize**: scores strictly above the threshold become foreground
//! - **Morphology**: optional opening then closing to remove specks and fill gaps
//! - **Contours**: boundary tracing with the full nesting tree
//! - **Assembly**: even-depth contours become exteriors, their direct children holes;
//!   islands inside holes become polygons of their own
//! - **Simplification**: topology-preserving Douglas-Peucker
//! - **Transform**: tile offset in pixel space, then pixel to world mapping
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mask_polygons::{AffineTransform, GeoJsonSerializer, Pipeline};
//!
//! let mask = mask_polygons::load_score_mask("mask.png")?;
//!
//! let pipeline = Pipeline::builder()
//!     .threshold(0.5)
//!     .with_simplification(1.0)
//!     .transform(AffineTransform::new(0.3, 0.0, 500000.0, 0.0, -0.3, 4200000.0))
//!     .build()?;
//!
//! let geojson = pipeline.serialize(&mask, &GeoJsonSerializer::pretty())?;
//! std::fs::write("polygons.geojson", geojson)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod transform;
pub mod config;
pub mod pipeline;
pub mod io;

// Re-exports for convenience
pub use error::{MaskError, Result};
pub use types::*;
pub use traits::*;
pub use algorithms::*;
pub use transform::{AffineTransform, CoordinateFn, TransformSource, transform_polygon};
pub use config::{ExtractionConfig, TransformConfig};
pub use pipeline::{Pipeline, builder::PipelineBuilder};
pub use io::{
    Feature, GeoJsonSerializer, WorldFileReader, features_from_polygons, load_score_mask,
    parse_world_file,
};

use image::Primitive;

/// World-space polygons for a mask, using a configuration and the default collaborators.
pub fn geometries_from_mask<T>(
    mask: &ScoreMask<T>,
    config: &ExtractionConfig,
) -> Result<Vec<WorldPolygon>>
where
    T: Primitive + Into<f64>,
{
    Pipeline::from_config(config)?.process(mask)
}

/// Features (polygon plus empty properties) for a mask.
pub fn features_from_mask<T>(mask: &ScoreMask<T>, config: &ExtractionConfig) -> Result<Vec<Feature>>
where
    T: Primitive + Into<f64>,
{
    Pipeline::from_config(config)?.features(mask)
}

/// A GeoJSON FeatureCollection document for a mask.
pub fn geojson_from_mask<T>(mask: &ScoreMask<T>, config: &ExtractionConfig) -> Result<String>
where
    T: Primitive + Into<f64>,
{
    Pipeline::from_config(config)?.serialize(mask, &GeoJsonSerializer::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma};

    fn create_test_image() -> GrayImage {
        let mut img = GrayImage::new(100, 100);
        for y in 20..80 {
            for x in 20..80 {
                img.put_pixel(x, y, Luma([255u8]));
            }
        }
        img
    }

    #[test]
    fn test_pipeline_basic() {
        let pipeline = Pipeline::builder().threshold(128.0).build().unwrap();
        let polygons = pipeline.process(&create_test_image()).expect("Should process successfully");
        assert_eq!(polygons.len(), 1);
        assert!(polygons[0].interiors().is_empty());
    }

    #[test]
    fn test_pipeline_with_simplification() {
        let pipeline = Pipeline::builder()
            .threshold(128.0)
            .with_simplification(2.0)
            .build()
            .unwrap();
        let polygons = pipeline.process(&create_test_image()).unwrap();
        // Corners only, plus the closing vertex.
        assert_eq!(polygons[0].exterior().0.len(), 5);
    }

    #[test]
    fn test_opening_removes_noise_before_tracing() {
        let mut image = create_test_image();
        image.put_pixel(5, 5, Luma([255]));
        image.put_pixel(90, 12, Luma([255]));

        let noisy = Pipeline::builder().threshold(128.0).without_morphology().build().unwrap();
        let cleaned = Pipeline::builder().threshold(128.0).build().unwrap();

        assert_eq!(noisy.process(&image).unwrap().len(), 1, "single pixels are degenerate rings");
        assert_eq!(cleaned.process(&image).unwrap().len(), 1);

        let mut speck = image.clone();
        for (x, y) in [(5, 5), (6, 5), (5, 6), (6, 6)] {
            speck.put_pixel(x, y, Luma([255]));
        }
        assert_eq!(noisy.process(&speck).unwrap().len(), 2);
        assert_eq!(cleaned.process(&speck).unwrap().len(), 1);
    }

    #[test]
    fn test_geojson_export() {
        let mask: ScoreMask<f32> = ImageBuffer::from_fn(30, 30, |x, y| {
            Luma([if (5..25).contains(&x) && (5..25).contains(&y) { 0.9 } else { 0.1 }])
        });
        let geojson =
            geojson_from_mask(&mask, &ExtractionConfig::default()).expect("Should create GeoJSON");
        let json: serde_json::Value = serde_json::from_str(&geojson).unwrap();
        assert_eq!(json["features"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_features_have_empty_properties() {
        let mask: ScoreMask<f32> =
            ImageBuffer::from_fn(30, 30, |x, y| Luma([((x / 10 + y / 10) % 2) as f32]));
        let config = ExtractionConfig {
            open_kernel: None,
            close_kernel: None,
            ..ExtractionConfig::default()
        };
        let features = features_from_mask(&mask, &config).unwrap();
        let geometries = geometries_from_mask(&mask, &config).unwrap();

        assert_eq!(features.len(), geometries.len());
        for (feature, geometry) in features.iter().zip(&geometries) {
            assert_eq!(&feature.geometry, geometry);
            assert!(feature.properties.is_empty());
        }
    }
}
