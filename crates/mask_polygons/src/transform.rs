//! Pixel to world coordinate mapping.
//!
//! Every transform source resolves, once per pipeline run, to a single
//! [`PixelToWorld`] mapping that is applied to each vertex the same way.

use std::{fmt, path::PathBuf, sync::Arc};

use geo::MapCoords;
use geo_types::Coord;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{MaskError, Result},
    traits::{GeoTransformReader, PixelToWorld},
    types::{PixelPolygon, WorldPolygon},
};

/// `x = a * col + b * row + xoff`, `y = d * col + e * row + yoff`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub xoff: f64,
    pub d: f64,
    pub e: f64,
    pub yoff: f64,
}

impl AffineTransform {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);

    pub const fn new(a: f64, b: f64, xoff: f64, d: f64, e: f64, yoff: f64) -> Self {
        Self { a, b, xoff, d, e, yoff }
    }

    pub const fn identity() -> Self {
        Self::IDENTITY
    }

    pub const fn translation(dx: f64, dy: f64) -> Self {
        Self::new(1.0, 0.0, dx, 0.0, 1.0, dy)
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, 0.0, sy, 0.0)
    }

    /// From GDAL geotransform order `[xoff, a, b, yoff, d, e]`.
    pub const fn from_gdal(gt: [f64; 6]) -> Self {
        Self::new(gt[1], gt[2], gt[0], gt[4], gt[5], gt[3])
    }

    pub const fn to_gdal(&self) -> [f64; 6] {
        [self.xoff, self.a, self.b, self.yoff, self.d, self.e]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// The transform that applies `self` first and `next` second.
    pub fn then(&self, next: &AffineTransform) -> AffineTransform {
        AffineTransform {
            a: next.a * self.a + next.b * self.d,
            b: next.a * self.b + next.b * self.e,
            xoff: next.a * self.xoff + next.b * self.yoff + next.xoff,
            d: next.d * self.a + next.e * self.d,
            e: next.d * self.b + next.e * self.e,
            yoff: next.d * self.xoff + next.e * self.yoff + next.yoff,
        }
    }

    /// Every coefficient must be finite.
    pub fn validate(&self) -> Result<()> {
        let coefficients = [self.a, self.b, self.xoff, self.d, self.e, self.yoff];
        if coefficients.iter().all(|c| c.is_finite()) {
            Ok(())
        } else {
            Err(MaskError::config(format!(
                "affine transform has non-finite coefficients: {self:?}"
            )))
        }
    }

    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.xoff,
            self.d * col + self.e * row + self.yoff,
        )
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PixelToWorld for AffineTransform {
    fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        AffineTransform::apply(self, col, row)
    }
}

/// Arbitrary `(col, row) -> (x, y)` mapping supplied by the caller.
#[derive(Clone)]
pub struct CoordinateFn(Arc<dyn Fn(f64, f64) -> (f64, f64) + Send + Sync>);

impl CoordinateFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(f64, f64) -> (f64, f64) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for CoordinateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CoordinateFn(..)")
    }
}

impl PixelToWorld for CoordinateFn {
    fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (self.0)(col, row)
    }
}

/// Where the pixel to world mapping comes from.
#[derive(Debug, Clone)]
pub enum TransformSource {
    /// Six explicit coefficients
    Affine(AffineTransform),
    /// Raster dataset whose own georeferencing is read
    Dataset(PathBuf),
    /// Caller supplied function, applied to every vertex as is
    Function(CoordinateFn),
}

impl TransformSource {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(f64, f64) -> (f64, f64) + Send + Sync + 'static,
    {
        Self::Function(CoordinateFn::new(f))
    }

    /// Produce the per-vertex mapping. Dataset sources are read exactly once here.
    pub fn resolve(&self, reader: &dyn GeoTransformReader) -> Result<Arc<dyn PixelToWorld>> {
        match self {
            Self::Affine(affine) => {
                affine.validate()?;
                Ok(Arc::new(*affine))
            }
            Self::Dataset(path) => {
                let affine = reader.read_transform(path)?;
                affine.validate()?;
                debug!(?path, ?affine, "read transform from dataset");
                Ok(Arc::new(affine))
            }
            Self::Function(f) => Ok(Arc::new(f.clone())),
        }
    }
}

impl Default for TransformSource {
    fn default() -> Self {
        Self::Affine(AffineTransform::IDENTITY)
    }
}

impl From<AffineTransform> for TransformSource {
    fn from(affine: AffineTransform) -> Self {
        Self::Affine(affine)
    }
}

impl From<PathBuf> for TransformSource {
    fn from(path: PathBuf) -> Self {
        Self::Dataset(path)
    }
}

/// Map every vertex of every ring, keeping ring order and hole association.
pub fn transform_polygon(polygon: &PixelPolygon, mapping: &dyn PixelToWorld) -> WorldPolygon {
    polygon.map_coords(|c| {
        let (x, y) = mapping.apply(c.x, c.y);
        Coord { x, y }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, LineString, Polygon};
    use std::path::Path;

    struct FixedReader(AffineTransform);

    impl GeoTransformReader for FixedReader {
        fn read_transform(&self, _dataset: &Path) -> Result<AffineTransform> {
            Ok(self.0)
        }
    }

    fn holed() -> Polygon<f64> {
        let hole: LineString<f64> = vec![(2.0, 2.0), (3.0, 2.0), (3.0, 3.0), (2.0, 2.0)].into();
        Polygon::new(
            vec![(0.0, 0.0), (5.0, 0.0), (5.0, 5.0), (0.0, 5.0), (0.0, 0.0)].into(),
            vec![hole],
        )
    }

    #[test]
    fn test_identity_leaves_polygon_unchanged() {
        let polygon = holed();
        assert_eq!(transform_polygon(&polygon, &AffineTransform::IDENTITY), polygon);
        assert!(AffineTransform::default().is_identity());
    }

    #[test]
    fn test_affine_coefficients() {
        let affine = AffineTransform::new(2.0, 0.5, 100.0, -0.25, -3.0, 50.0);
        let pixel = polygon![(x: 4.0, y: 2.0), (x: 5.0, y: 2.0), (x: 5.0, y: 3.0)];
        let world = transform_polygon(&pixel, &affine);
        assert_eq!(
            world.exterior().0[0],
            Coord {
                x: 2.0 * 4.0 + 0.5 * 2.0 + 100.0,
                y: -0.25 * 4.0 - 3.0 * 2.0 + 50.0,
            }
        );
    }

    #[test]
    fn test_holes_keep_their_association() {
        let affine = AffineTransform::translation(10.0, 20.0);
        let world = transform_polygon(&holed(), &affine);
        assert_eq!(world.interiors().len(), 1);
        assert_eq!(world.interiors()[0].0[0], Coord { x: 12.0, y: 22.0 });
        assert_eq!(world.exterior().0[2], Coord { x: 15.0, y: 25.0 });
    }

    #[test]
    fn test_composition_matches_sequential_application() {
        let first = AffineTransform::new(0.5, 0.1, 3.0, -0.2, -0.5, 7.0);
        let second = AffineTransform::new(2.0, 0.0, -1.0, 0.3, 1.5, 4.0);
        let composed = first.then(&second);

        let polygon = holed();
        let sequential = transform_polygon(&transform_polygon(&polygon, &first), &second);
        let direct = transform_polygon(&polygon, &composed);

        for (a, b) in sequential.exterior().coords().zip(direct.exterior().coords()) {
            assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_gdal_order_round_trip() {
        let gt = [440720.0, 60.0, 0.0, 3751320.0, 0.0, -60.0];
        let affine = AffineTransform::from_gdal(gt);
        assert_eq!(affine.a, 60.0);
        assert_eq!(affine.e, -60.0);
        assert_eq!(affine.xoff, 440720.0);
        assert_eq!(affine.to_gdal(), gt);
    }

    #[test]
    fn test_non_finite_affine_is_rejected() {
        let broken = AffineTransform::new(f64::NAN, 0.0, 0.0, 0.0, 1.0, 0.0);
        let source = TransformSource::Affine(broken);
        let err = source.resolve(&FixedReader(AffineTransform::IDENTITY)).err().unwrap();
        assert!(matches!(err, MaskError::Configuration(_)));
    }

    #[test]
    fn test_dataset_source_uses_reader() {
        let affine = AffineTransform::new(0.5, 0.0, 1000.0, 0.0, -0.5, 2000.0);
        let mapping = TransformSource::Dataset(PathBuf::from("tile.tif"))
            .resolve(&FixedReader(affine))
            .unwrap();
        assert_eq!(mapping.apply(2.0, 4.0), (1001.0, 1998.0));
    }

    #[test]
    fn test_function_source_is_applied_per_vertex() {
        let source = TransformSource::function(|col, row| (col * col, row + 0.5));
        let mapping = source.resolve(&FixedReader(AffineTransform::IDENTITY)).unwrap();
        let world = transform_polygon(&holed(), mapping.as_ref());
        assert_eq!(world.exterior().0[1], Coord { x: 25.0, y: 0.5 });
        assert_eq!(world.interiors()[0].0[1], Coord { x: 9.0, y: 2.5 });
    }
}
