use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{BoundingRect, EuclideanDistance, Intersects};
use geo_types::{Coord, Line, LineString, Point, Polygon};
use rstar::primitives::{GeomWithData, Line as Segment};
use rstar::{RTree, AABB};
use tracing::debug;

use crate::{
    traits::PolygonSimplifier,
    types::{is_degenerate_ring, PixelPolygon},
};

/// Douglas-Peucker simplifier that refuses any shortcut which would change topology.
///
/// A run of vertices is replaced by a straight segment only when every skipped vertex
/// lies within the tolerance, the segment meets no other edge except at its own two
/// endpoints, and nothing else lies in the region between the run and the segment.
/// Every check runs against the rings as simplified so far, so the exterior and each
/// hole always see each other's current shape.
#[derive(Debug, Clone, Default)]
pub struct TopologyPreservingSimplifier;

impl PolygonSimplifier for TopologyPreservingSimplifier {
    fn simplify(&self, polygon: &PixelPolygon, tolerance: f64) -> Option<PixelPolygon> {
        simplify_polygon(polygon, tolerance)
    }
}

/// Simplify the exterior and every hole with the same tolerance.
///
/// Returns the polygon unchanged for `tolerance <= 0`. Holes that collapse are dropped;
/// `None` when the exterior collapses.
pub fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Option<Polygon<f64>> {
    if !(tolerance > 0.0) {
        return Some(polygon.clone());
    }

    let rings: Vec<Vec<Coord<f64>>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(closed_points)
        .collect();
    let mut edges = EdgeIndex::new(&rings);

    let exterior = simplify_ring(&rings[0], 0, tolerance, &mut edges)
        .filter(|ring| !is_degenerate_ring(ring));
    let Some(exterior) = exterior else {
        debug!("exterior collapsed during simplification");
        return None;
    };

    let holes: Vec<LineString<f64>> = rings
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(ring_id, ring)| simplify_ring(ring, ring_id, tolerance, &mut edges))
        .filter(|ring| !is_degenerate_ring(ring))
        .collect();

    if holes.len() < polygon.interiors().len() {
        debug!(
            dropped = polygon.interiors().len() - holes.len(),
            "holes collapsed during simplification"
        );
    }

    Some(Polygon::new(exterior, holes))
}

fn closed_points(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut points = ring.0.clone();
    if points.first() != points.last() {
        if let Some(&first) = points.first() {
            points.push(first);
        }
    }
    points
}

/// Which ring an indexed edge belongs to, and the vertex indices it joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EdgeKey {
    ring: usize,
    from: usize,
    to: usize,
}

type IndexedEdge = GeomWithData<Segment<[f64; 2]>, EdgeKey>;

fn indexed_edge(ring: usize, from: usize, to: usize, points: &[Coord<f64>]) -> IndexedEdge {
    let (a, b) = (points[from], points[to]);
    GeomWithData::new(Segment::new([a.x, a.y], [b.x, b.y]), EdgeKey { ring, from, to })
}

/// Current edges of every ring of the polygon, updated as shortcuts are accepted.
struct EdgeIndex {
    tree: RTree<IndexedEdge>,
}

impl EdgeIndex {
    fn new(rings: &[Vec<Coord<f64>>]) -> Self {
        let edges = rings
            .iter()
            .enumerate()
            .flat_map(|(ring, points)| {
                (0..points.len().saturating_sub(1))
                    .map(move |from| indexed_edge(ring, from, from + 1, points))
            })
            .collect();
        Self {
            tree: RTree::bulk_load(edges),
        }
    }

    /// Can vertices `start + 1 .. end` of ring `ring` be replaced by one segment?
    fn allows(&self, ring: usize, points: &[Coord<f64>], start: usize, end: usize) -> bool {
        let shortcut = Line::new(points[start], points[end]);
        let region = Polygon::new(LineString::from(points[start..=end].to_vec()), vec![]);
        let Some(bounds) = region.bounding_rect() else {
            return false;
        };
        let envelope = AABB::from_corners(
            [bounds.min().x, bounds.min().y],
            [bounds.max().x, bounds.max().y],
        );

        self.tree.locate_in_envelope_intersecting(&envelope).all(|indexed| {
            let key = indexed.data;
            // The run being replaced.
            if key.ring == ring && key.from >= start && key.to <= end {
                return true;
            }
            let segment = indexed.geom();
            let edge = Line::new(
                Coord { x: segment.from[0], y: segment.from[1] },
                Coord { x: segment.to[0], y: segment.to[1] },
            );
            !meets_away_from_endpoints(shortcut, edge)
                && [edge.start, edge.end, edge.start + (edge.end - edge.start) / 2.0]
                    .into_iter()
                    .filter(|&c| c != shortcut.start && c != shortcut.end)
                    .all(|c| !region.intersects(&Point::from(c)))
        })
    }

    fn accept(&mut self, ring: usize, points: &[Coord<f64>], start: usize, end: usize) {
        for from in start..end {
            self.tree.remove(&indexed_edge(ring, from, from + 1, points));
        }
        self.tree.insert(indexed_edge(ring, start, end, points));
    }
}

/// True when `edge` touches `shortcut` anywhere but at the shortcut's endpoints.
fn meets_away_from_endpoints(shortcut: Line<f64>, edge: Line<f64>) -> bool {
    let at_endpoint = |c: Coord<f64>| c == shortcut.start || c == shortcut.end;
    match line_intersection(shortcut, edge) {
        None => false,
        Some(LineIntersection::SinglePoint { intersection, .. }) => !at_endpoint(intersection),
        Some(LineIntersection::Collinear { intersection }) => {
            intersection.start != intersection.end || !at_endpoint(intersection.start)
        }
    }
}

/// `None` when the whole ring lies within the tolerance of a single segment.
fn simplify_ring(
    points: &[Coord<f64>],
    ring: usize,
    tolerance: f64,
    edges: &mut EdgeIndex,
) -> Option<LineString<f64>> {
    // Closed ring with at most three distinct vertices: nothing to remove.
    if points.len() < 5 {
        return Some(LineString::from(points.to_vec()));
    }

    let last = points.len() - 1;
    let anchor = Point::from(points[0]);
    let split = (1..last)
        .max_by(|&a, &b| {
            let da = anchor.euclidean_distance(&Point::from(points[a]));
            let db = anchor.euclidean_distance(&Point::from(points[b]));
            da.total_cmp(&db)
        })
        .unwrap_or(last / 2);

    let spine = Line::new(points[0], points[split]);
    if points.iter().all(|&p| Point::from(p).euclidean_distance(&spine) <= tolerance) {
        return None;
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[split] = true;
    keep[last] = true;

    let mut stack = vec![(0, split), (split, last)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let segment = Line::new(points[start], points[end]);
        let (farthest, distance) = (start + 1..end)
            .map(|i| (i, Point::from(points[i]).euclidean_distance(&segment)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((start + 1, 0.0));

        if distance <= tolerance && edges.allows(ring, points, start, end) {
            edges.accept(ring, points, start, end);
            continue;
        }

        keep[farthest] = true;
        stack.push((start, farthest));
        stack.push((farthest, end));
    }

    Some(
        points
            .iter()
            .zip(keep)
            .filter_map(|(&point, kept)| kept.then_some(point))
            .collect(),
    )
}
