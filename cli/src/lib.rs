use std::fs;
use std::path::{Path, PathBuf};

use mask_polygons::{ExtractionConfig, Feature, MaskError, Pipeline, load_score_mask};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    MaskError(#[from] MaskError),
    #[error("Tile task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
    #[error("Batch configuration has no tiles")]
    NoTiles,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// One tile of a mosaic and its origin in the full raster
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TileSpec {
    pub path: PathBuf,
    #[serde(default)]
    pub x_offset: i64,
    #[serde(default)]
    pub y_offset: i64,
}

/// Mosaic run: shared extraction settings plus the tiles to process
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    pub tiles: Vec<TileSpec>,
}

impl BatchConfig {
    /// Load BatchConfig from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load BatchConfig from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path_ref)?),
            Some("json") => Self::from_json(&fs::read_to_string(path_ref)?),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// Extraction settings for one tile: the tile origin is added to the shared offset
    pub fn tile_config(&self, tile: &TileSpec) -> ExtractionConfig {
        ExtractionConfig {
            x_offset: self.extraction.x_offset + tile.x_offset,
            y_offset: self.extraction.y_offset + tile.y_offset,
            ..self.extraction.clone()
        }
    }
}

/// Load one mask image and extract its features
pub fn extract_file(path: &Path, config: &ExtractionConfig) -> Result<Vec<Feature>, CliError> {
    let pipeline = Pipeline::from_config(config)?;
    debug!("{}", pipeline.info());
    let mask = load_score_mask(path)?;
    Ok(pipeline.features(&mask)?)
}

/// Process every tile on the blocking pool; features come back in tile order, each
/// tagged with the tile it came from.
pub async fn run_batch(batch: &BatchConfig) -> Result<Vec<Feature>, CliError> {
    if batch.tiles.is_empty() {
        return Err(CliError::NoTiles);
    }

    // Configuration problems surface before any tile is read.
    Pipeline::from_config(&batch.extraction)?;

    let handles: Vec<_> = batch
        .tiles
        .iter()
        .map(|tile| {
            let path = tile.path.clone();
            let config = batch.tile_config(tile);
            tokio::task::spawn_blocking(move || extract_file(&path, &config))
        })
        .collect();

    let mut features = Vec::new();
    for (tile, handle) in batch.tiles.iter().zip(handles) {
        let tile_features = handle.await??;
        info!("Tile {:?}: {} polygons", tile.path, tile_features.len());
        let name = tile.path.display().to_string();
        features.extend(
            tile_features
                .into_iter()
                .map(|feature| feature.with_property("tile", name.clone())),
        );
    }

    Ok(features)
}
