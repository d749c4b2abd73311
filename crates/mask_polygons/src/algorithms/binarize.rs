use image::Primitive;

use crate::types::{BinaryMask, ScoreMask};

/// Threshold a score grid into a two-level mask.
///
/// A cell is foreground iff its score is strictly greater than `threshold`; a score
/// equal to the threshold is background. NaN scores are background. A threshold
/// outside the score range simply yields an all-background or all-foreground mask.
pub fn binarize<T>(mask: &ScoreMask<T>, threshold: f64) -> BinaryMask
where
    T: Primitive + Into<f64>,
{
    BinaryMask::from_fn(mask.width(), mask.height(), |x, y| {
        let score: f64 = mask.get_pixel(x, y)[0].into();
        score > threshold
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma};

    fn gradient() -> ScoreMask<f32> {
        ImageBuffer::from_fn(4, 4, |x, y| Luma([(x + 4 * y) as f32 / 15.0]))
    }

    #[test]
    fn test_strictly_greater_is_foreground() {
        let mask = gradient();
        let threshold = 7.0 / 15.0;
        let binary = binarize(&mask, threshold);

        for (x, y, p) in mask.enumerate_pixels() {
            assert_eq!(binary.get(x, y), p[0] as f64 > threshold, "cell ({x}, {y})");
        }
    }

    #[test]
    fn test_equal_to_threshold_is_background() {
        let mask: ScoreMask<f32> = ImageBuffer::from_pixel(2, 2, Luma([0.5]));
        assert!(binarize(&mask, 0.5).is_empty());
        assert_eq!(binarize(&mask, 0.49).foreground_count(), 4);
    }

    #[test]
    fn test_threshold_at_extremes() {
        let mask = gradient();
        // Strict comparison: just below the minimum is all foreground, the maximum all background.
        assert_eq!(binarize(&mask, -f64::EPSILON).foreground_count(), 16);
        assert!(binarize(&mask, 1.0).is_empty());
    }

    #[test]
    fn test_integer_masks() {
        let mut img = GrayImage::new(3, 1);
        img.put_pixel(0, 0, Luma([10]));
        img.put_pixel(1, 0, Luma([128]));
        img.put_pixel(2, 0, Luma([255]));

        let binary = binarize(&img, 128.0);
        assert!(!binary.get(0, 0));
        assert!(!binary.get(1, 0));
        assert!(binary.get(2, 0));
    }

    #[test]
    fn test_nan_is_background() {
        let mask: ScoreMask<f32> = ImageBuffer::from_pixel(1, 1, Luma([f32::NAN]));
        assert!(binarize(&mask, f64::NEG_INFINITY).is_empty());
    }
}
