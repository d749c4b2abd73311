use std::{
    fs,
    path::{Path, PathBuf},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::{ExtractionMode, KernelSpec},
    error::{MaskError, Result},
    transform::{AffineTransform, TransformSource},
};

/// Default side of the opening and closing kernels.
pub const DEFAULT_KERNEL_SIZE: i64 = 3;

/// Everything one extraction run needs besides the mask itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Mask to polygon extraction settings")]
pub struct ExtractionConfig {
    #[schemars(description = "Scores strictly above this value are foreground")]
    pub threshold: f64,
    #[schemars(description = "Extraction mode: \"polygons\" or \"buildings\"")]
    pub mode: String,
    #[schemars(description = "Opening kernel: size, 0/1 grid, or 0/false to skip")]
    pub open_kernel: Option<KernelSpec>,
    #[schemars(description = "Closing kernel: size, 0/1 grid, or 0/false to skip")]
    pub close_kernel: Option<KernelSpec>,
    #[schemars(description = "Column of this tile's origin in the full raster")]
    pub x_offset: i64,
    #[schemars(description = "Row of this tile's origin in the full raster")]
    pub y_offset: i64,
    #[schemars(description = "Simplification tolerance in pixels, 0 disables")]
    pub pixel_tolerance: f64,
    #[schemars(description = "Pixel to world transform")]
    pub transform: TransformConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            mode: ExtractionMode::Polygons.to_string(),
            open_kernel: Some(KernelSpec::Size(DEFAULT_KERNEL_SIZE)),
            close_kernel: Some(KernelSpec::Size(DEFAULT_KERNEL_SIZE)),
            x_offset: 0,
            y_offset: 0,
            pixel_tolerance: 0.0,
            transform: TransformConfig::Identity,
        }
    }
}

impl ExtractionConfig {
    pub fn extraction_mode(&self) -> Result<ExtractionMode> {
        ExtractionMode::parse(&self.mode)
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ExtractionConfig)
    }

    /// Load from a `.toml` or `.json` file, chosen by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path)?),
            Some("json") => Self::from_json(&fs::read_to_string(path)?),
            _ => Err(MaskError::config(format!(
                "unsupported config format {}, use .toml or .json",
                path.display()
            ))),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MaskError::config(e.to_string()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| MaskError::config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write to a `.toml` or `.json` file, chosen by extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            _ => {
                return Err(MaskError::config(format!(
                    "unsupported config format {}, use .toml or .json",
                    path.display()
                )));
            }
        };
        fs::write(path, content)?;
        Ok(())
    }
}

/// Serializable transform sources. Function sources only exist in code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformConfig {
    #[default]
    Identity,
    /// Six coefficients `a, b, xoff, d, e, yoff`
    Affine(AffineTransform),
    /// GDAL order `[xoff, a, b, yoff, d, e]`
    Gdal { coefficients: [f64; 6] },
    /// Raster whose georeferencing should be used
    Dataset { path: PathBuf },
}

impl TransformConfig {
    pub fn to_source(&self) -> TransformSource {
        match self {
            Self::Identity => TransformSource::Affine(AffineTransform::IDENTITY),
            Self::Affine(affine) => TransformSource::Affine(*affine),
            Self::Gdal { coefficients } => {
                TransformSource::Affine(AffineTransform::from_gdal(*coefficients))
            }
            Self::Dataset { path } => TransformSource::Dataset(path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.open_kernel, Some(KernelSpec::Size(3)));
        assert_eq!(config.close_kernel, Some(KernelSpec::Size(3)));
        assert_eq!(config.extraction_mode().unwrap(), ExtractionMode::Polygons);
        assert_eq!(config.pixel_tolerance, 0.0);
        assert_eq!(config.transform, TransformConfig::Identity);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = ExtractionConfig::from_toml(
            r#"
            threshold = 0.7
            open_kernel = 0
            close_kernel = [[0, 1, 0], [1, 1, 1], [0, 1, 0]]

            [transform]
            kind = "affine"
            a = 0.5
            b = 0.0
            xoff = 300000.0
            d = 0.0
            e = -0.5
            yoff = 5000000.0
            "#,
        )
        .unwrap();

        assert_eq!(config.threshold, 0.7);
        assert_eq!(config.open_kernel, Some(KernelSpec::Size(0)));
        assert!(matches!(config.close_kernel, Some(KernelSpec::Grid(ref rows)) if rows.len() == 3));
        assert_eq!(config.x_offset, 0);
        assert_eq!(
            config.transform,
            TransformConfig::Affine(AffineTransform::new(0.5, 0.0, 300000.0, 0.0, -0.5, 5000000.0))
        );
    }

    #[test]
    fn test_json_transform_variants() {
        let gdal = ExtractionConfig::from_json(
            r#"{ "transform": { "kind": "gdal", "coefficients": [10.0, 1.0, 0.0, 20.0, 0.0, -1.0] } }"#,
        )
        .unwrap();
        match gdal.transform.to_source() {
            TransformSource::Affine(affine) => assert_eq!(affine.apply(1.0, 1.0), (11.0, 19.0)),
            other => panic!("unexpected source {other:?}"),
        }

        let json = r#"{ "transform": { "kind": "dataset", "path": "tile.tif" } }"#;
        let dataset = ExtractionConfig::from_json(json).unwrap();
        assert!(matches!(
            dataset.transform.to_source(),
            TransformSource::Dataset(p) if p == PathBuf::from("tile.tif")
        ));
    }

    #[test]
    fn test_invalid_shapes_are_configuration_errors() {
        let bad_transform =
            ExtractionConfig::from_json(r#"{ "transform": { "kind": "projection" } }"#);
        assert!(matches!(bad_transform, Err(MaskError::Configuration(_))));

        let bad_kernel = ExtractionConfig::from_json(r#"{ "open_kernel": "large" }"#);
        assert!(matches!(bad_kernel, Err(MaskError::Configuration(_))));
    }

    #[test]
    fn test_unknown_mode_is_reported_as_unsupported() {
        let config = ExtractionConfig::from_json(r#"{ "mode": "roads" }"#).unwrap();
        assert!(matches!(config.extraction_mode(), Err(MaskError::UnsupportedMode(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ExtractionConfig::default();
        config.pixel_tolerance = 1.5;
        config.x_offset = 512;
        config.transform = TransformConfig::Gdal { coefficients: [1.0, 2.0, 0.0, 3.0, 0.0, -2.0] };

        for name in ["config.toml", "config.json"] {
            let path = dir.path().join(name);
            config.to_file(&path).unwrap();
            assert_eq!(ExtractionConfig::from_file(&path).unwrap(), config);
        }

        assert!(ExtractionConfig::from_file(dir.path().join("config.yaml")).is_err());
    }

    #[test]
    fn test_schema_lists_fields() {
        let schema = serde_json::to_value(ExtractionConfig::schema()).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        for field in [
            "threshold",
            "mode",
            "open_kernel",
            "close_kernel",
            "pixel_tolerance",
            "transform",
        ] {
            assert!(properties.contains_key(field), "{field}");
        }
    }
}
