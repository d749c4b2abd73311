use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    error::{MaskError, Result},
    traits::GeoTransformReader,
    transform::AffineTransform,
};

/// Reads the georeferencing of a raster from its ESRI world file sidecar.
///
/// Given `scene.tif`, looks for `scene.tfw`, `scene.tifw` and `scene.wld` in that order.
/// A path that already names a world file is read directly.
#[derive(Debug, Clone, Default)]
pub struct WorldFileReader;

impl WorldFileReader {
    /// Candidate sidecar paths for a raster, most specific first.
    pub fn candidates(dataset: &Path) -> Vec<PathBuf> {
        let Some(ext) = dataset.extension().and_then(|e| e.to_str()) else {
            return vec![dataset.with_extension("wld")];
        };
        let ext = ext.to_ascii_lowercase();
        if is_world_file_extension(&ext) {
            return vec![dataset.to_path_buf()];
        }

        let mut candidates = Vec::new();
        let mut chars = ext.chars();
        if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
            candidates.push(dataset.with_extension(format!("{first}{last}w")));
        }
        candidates.push(dataset.with_extension(format!("{ext}w")));
        candidates.push(dataset.with_extension("wld"));
        candidates
    }
}

fn is_world_file_extension(ext: &str) -> bool {
    matches!(ext, "wld" | "tfw" | "pgw" | "jgw" | "gfw" | "bpw" | "tifw" | "pngw" | "jpgw")
}

impl GeoTransformReader for WorldFileReader {
    fn read_transform(&self, dataset: &Path) -> Result<AffineTransform> {
        let candidates = Self::candidates(dataset);
        let path = candidates.iter().find(|p| p.is_file()).ok_or_else(|| {
            MaskError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no world file found for {}", dataset.display()),
            ))
        })?;

        let content = fs::read_to_string(path)?;
        let affine = parse_world_file(path, &content)?;
        debug!(path = %path.display(), ?affine, "parsed world file");
        Ok(affine)
    }
}

/// Parse the six lines `A D B E C F` of a world file.
///
/// World files locate the centre of the upper-left pixel; the returned transform maps
/// pixel corners, so `(0, 0)` is the outer corner of that pixel. `path` is only used
/// to label errors.
pub fn parse_world_file(path: &Path, content: &str) -> Result<AffineTransform> {
    let malformed = |reason: String| MaskError::WorldFile {
        path: path.to_path_buf(),
        reason,
    };
    let values = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<f64>()
                .map_err(|_| malformed(format!("not a number: {line:?}")))
        })
        .collect::<Result<Vec<f64>>>()?;

    let &[a, d, b, e, c, f] = values.as_slice() else {
        return Err(malformed(format!("expected 6 values, found {}", values.len())));
    };

    Ok(AffineTransform::new(
        a,
        b,
        c - 0.5 * a - 0.5 * b,
        d,
        e,
        f - 0.5 * d - 0.5 * e,
    ))
}
