use std::collections::HashSet;

use geo::Area;
use geo_types::{Coord, LineString, Polygon};
use image::{GrayImage, ImageBuffer, Luma};

use crate::error::{MaskError, Result};

/// Input grid of per-pixel scores.
pub type ScoreMask<T> = ImageBuffer<Luma<T>, Vec<T>>;

/// Polygon whose coordinates are (col, row) pixel positions.
pub type PixelPolygon = Polygon<f64>;

/// Polygon whose coordinates have been mapped into world space.
pub type WorldPolygon = Polygon<f64>;

/// Two-level mask where every cell is either foreground (1) or background (0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    image: GrayImage,
}

impl BinaryMask {
    /// All-background mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let image = GrayImage::from_fn(width, height, |x, y| Luma([f(x, y) as u8]));
        Self { image }
    }

    /// Any non-zero pixel of `image` becomes foreground.
    pub fn from_image(image: &GrayImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| image.get_pixel(x, y)[0] != 0)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] != 0
    }

    /// Like [`BinaryMask::get`], but cells outside the grid read as background.
    pub fn get_or_background(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return false;
        }
        self.get(x as u32, y as u32)
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        self.image.put_pixel(x, y, Luma([foreground as u8]));
    }

    pub fn foreground_count(&self) -> usize {
        self.image.pixels().filter(|p| p[0] != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.foreground_count() == 0
    }

    /// Backing image, cells are 0 or 1.
    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }
}

/// Closed boundary between foreground and background, one entry per boundary pixel.
///
/// The ring is implicitly closed: the last point connects back to the first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Contour {
    pub points: Vec<Coord<i64>>,
}

impl Contour {
    pub fn new(points: Vec<Coord<i64>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Translate every point by a tile origin.
    pub fn offset(&self, dx: i64, dy: i64) -> Self {
        let points = self
            .points
            .iter()
            .map(|p| Coord { x: p.x + dx, y: p.y + dy })
            .collect();
        Self { points }
    }

    pub fn distinct_vertex_count(&self) -> usize {
        self.points.iter().collect::<HashSet<_>>().len()
    }

    /// Closed floating point ring in pixel space.
    pub fn to_ring(&self) -> LineString<f64> {
        let mut ring: LineString<f64> = self
            .points
            .iter()
            .map(|p| Coord { x: p.x as f64, y: p.y as f64 })
            .collect();
        ring.close();
        ring
    }
}

/// A ring that cannot bound an area: fewer than three distinct vertices or zero area.
pub fn is_degenerate_ring(ring: &LineString<f64>) -> bool {
    let distinct: HashSet<(u64, u64)> = ring
        .coords()
        .map(|c| (c.x.to_bits(), c.y.to_bits()))
        .collect();
    if distinct.len() < 3 {
        return true;
    }
    Polygon::new(ring.clone(), vec![]).unsigned_area() == 0.0
}

/// One traced contour and its place in the nesting tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContourNode {
    pub contour: Contour,
    /// Nearest enclosing contour, `None` for top-level boundaries.
    pub parent: Option<usize>,
    pub depth: usize,
}

impl ContourNode {
    /// Even depth bounds a filled region, odd depth bounds a hole.
    pub fn is_solid(&self) -> bool {
        self.depth % 2 == 0
    }

    pub fn is_hole(&self) -> bool {
        !self.is_solid()
    }
}

/// Arena of contours linked to their parents by index.
///
/// A parent is always stored before its children, so depth is known on insertion
/// and a forward scan visits every node after its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContourForest {
    nodes: Vec<ContourNode>,
}

impl ContourForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a contour, returning its index.
    pub fn push(&mut self, contour: Contour, parent: Option<usize>) -> Result<usize> {
        let depth = match parent {
            Some(index) => {
                let parent_node = self.nodes.get(index).ok_or_else(|| {
                    MaskError::InvalidHierarchy(format!(
                        "parent {index} is not stored before child {}",
                        self.nodes.len()
                    ))
                })?;
                parent_node.depth + 1
            }
            None => 0,
        };

        self.nodes.push(ContourNode { contour, parent, depth });
        Ok(self.nodes.len() - 1)
    }

    pub fn nodes(&self) -> &[ContourNode] {
        &self.nodes
    }

    pub fn get(&self, index: usize) -> Option<&ContourNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Direct children of `index`, in arena order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .skip(index + 1)
            .filter(move |(_, node)| node.parent == Some(index))
            .map(|(i, _)| i)
    }

    /// Child lists for every node, built in a single pass.
    pub fn child_table(&self) -> Vec<Vec<usize>> {
        let mut table = vec![Vec::new(); self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                table[parent].push(i);
            }
        }
        table
    }

    /// Translate every contour by a tile origin; the hierarchy is untouched.
    pub fn offset(&self, dx: i64, dy: i64) -> Self {
        if dx == 0 && dy == 0 {
            return self.clone();
        }
        let nodes = self
            .nodes
            .iter()
            .map(|node| ContourNode {
                contour: node.contour.offset(dx, dy),
                parent: node.parent,
                depth: node.depth,
            })
            .collect();
        Self { nodes }
    }
}
