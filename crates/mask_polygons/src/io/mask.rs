use std::path::Path;

use tracing::debug;

use crate::{error::Result, types::ScoreMask};

/// Load an image file as a single-band score mask with values in `[0, 1]`.
///
/// Colour images are converted to luma first; integer images are normalized by their
/// type's maximum, so an 8-bit `255` becomes `1.0`.
pub fn load_score_mask<P: AsRef<Path>>(path: P) -> Result<ScoreMask<f32>> {
    let image = image::open(path.as_ref())?;
    let mask = image.to_luma32f();
    debug!(
        path = %path.as_ref().display(),
        width = mask.width(),
        height = mask.height(),
        "loaded mask"
    );
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MaskError;
    use image::{GrayImage, Luma};

    #[test]
    fn test_png_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(1, 0, Luma([255]));
        img.save(&path).unwrap();

        let mask = load_score_mask(&path).unwrap();
        assert_eq!(mask.dimensions(), (2, 1));
        assert_eq!(mask.get_pixel(0, 0)[0], 0.0);
        assert_eq!(mask.get_pixel(1, 0)[0], 1.0);
    }

    #[test]
    fn test_missing_file() {
        let err = load_score_mask("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, MaskError::ImageLoad(_)));
    }
}
