//! Point-in-polygon geometry.
//!
//! Rings are stored as (lat, lon) loops whose first and last points are
//! identical. Membership uses the crossing-number test with the even-odd
//! rule across every ring of a polygon, so holes need no orientation.
//! Points lying on an edge or vertex are inside.

use crate::context::Coordinates;

const EDGE_EPSILON: f64 = 1e-12;

/// A closed loop of coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    points: Vec<Coordinates>,
}

impl Ring {
    /// Wrap already-validated points. The loop must be closed.
    pub fn new(points: Vec<Coordinates>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Coordinates] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => first == last,
            _ => false,
        }
    }

    fn edges(&self) -> impl Iterator<Item = (Coordinates, Coordinates)> + '_ {
        self.points.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// Number of edges a ray cast east from `point` crosses.
    fn crossings(&self, point: Coordinates) -> usize {
        let (x, y) = (point.longitude, point.latitude);
        self.edges()
            .filter(|(a, b)| {
                let (ax, ay, bx, by) = (a.longitude, a.latitude, b.longitude, b.latitude);
                if (ay > y) == (by > y) {
                    return false;
                }
                let x_at_y = ax + (y - ay) * (bx - ax) / (by - ay);
                x < x_at_y
            })
            .count()
    }

    fn touches(&self, point: Coordinates) -> bool {
        self.edges().any(|(a, b)| on_segment(point, a, b))
    }
}

fn on_segment(p: Coordinates, a: Coordinates, b: Coordinates) -> bool {
    let (px, py) = (p.longitude, p.latitude);
    let (ax, ay, bx, by) = (a.longitude, a.latitude, b.longitude, b.latitude);

    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    let scale = (bx - ax).abs().max((by - ay).abs()).max(1.0);
    if cross.abs() > EDGE_EPSILON * scale {
        return false;
    }

    px >= ax.min(bx) - EDGE_EPSILON
        && px <= ax.max(bx) + EDGE_EPSILON
        && py >= ay.min(by) - EDGE_EPSILON
        && py <= ay.max(by) + EDGE_EPSILON
}

/// Axis-aligned bounding box used to skip polygons cheaply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    fn around<'a>(points: impl Iterator<Item = &'a Coordinates>) -> Self {
        points.fold(
            BoundingBox {
                min_lat: f64::INFINITY,
                max_lat: f64::NEG_INFINITY,
                min_lon: f64::INFINITY,
                max_lon: f64::NEG_INFINITY,
            },
            |bbox, p| BoundingBox {
                min_lat: bbox.min_lat.min(p.latitude),
                max_lat: bbox.max_lat.max(p.latitude),
                min_lon: bbox.min_lon.min(p.longitude),
                max_lon: bbox.max_lon.max(p.longitude),
            },
        )
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lon
            && point.longitude <= self.max_lon
    }
}

/// One polygon: an outer ring plus any number of holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    rings: Vec<Ring>,
    bbox: BoundingBox,
}

impl Polygon {
    pub fn new(rings: Vec<Ring>) -> Self {
        let bbox = BoundingBox::around(rings.iter().flat_map(|r| r.points().iter()));
        Self { rings, bbox }
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        if !self.bbox.contains(point) {
            return false;
        }
        if self.rings.iter().any(|ring| ring.touches(point)) {
            return true;
        }
        let crossings: usize = self.rings.iter().map(|ring| ring.crossings(point)).sum();
        crossings % 2 == 1
    }
}

/// A named region made of one or more polygons.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPolygon {
    pub name: String,
    pub parts: Vec<Polygon>,
}

impl NamedPolygon {
    /// Inside if any part contains the point on its own.
    pub fn contains(&self, point: Coordinates) -> bool {
        self.parts.iter().any(|part| part.contains(point))
    }
}
