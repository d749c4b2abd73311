use std::path::PathBuf;

use thiserror::Error;

use crate::algorithms::ExtractionMode;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Unsupported extraction mode: {0:?}")]
    UnsupportedMode(String),

    #[error("Extraction mode '{0}' is not implemented yet")]
    ModeNotImplemented(ExtractionMode),

    #[error("Invalid contour hierarchy: {0}")]
    InvalidHierarchy(String),

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Invalid world file {path:?}: {reason}")]
    WorldFile { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MaskError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, MaskError>;
