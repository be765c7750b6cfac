//! Area-weighted random positions inside a room's walkable polygon.
//!
//! A room outline is decomposed into a triangle fan anchored at its first
//! vertex: triangle `i` is `(v0, v[i], v[i+1])`. A triangle is picked with
//! probability proportional to its area, then a point is drawn uniformly
//! inside it with the square-root barycentric transform. Picking by area is
//! what keeps the density uniform when the fan's triangles differ in size.
//!
//! The outline must be expressible as a fan from vertex 0 (convex outlines
//! always are). Degenerate outlines do not panic; every point collapses onto
//! the first vertex.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use tundra_types::Position;

use crate::error::WorldError;

/// A vertex of a room outline in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Position> for Point {
    fn from(p: Position) -> Self {
        Self::new(f64::from(p.x), f64::from(p.y))
    }
}

/// A simple polygon describing where bots may walk in a room.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    /// Build a polygon from its ordered vertices.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::TooFewVertices`] for fewer than three vertices.
    pub fn new(vertices: Vec<Point>) -> Result<Self, WorldError> {
        if vertices.len() < 3 {
            return Err(WorldError::TooFewVertices {
                count: vertices.len(),
            });
        }
        Ok(Self { vertices })
    }

    /// Build a polygon from `(x, y)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::TooFewVertices`] for fewer than three pairs.
    pub fn from_coords(coords: &[(f64, f64)]) -> Result<Self, WorldError> {
        Self::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    /// An axis-aligned rectangle spanning two corners.
    pub fn rectangle(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            vertices: vec![
                Point::new(left, top),
                Point::new(right, top),
                Point::new(right, bottom),
                Point::new(left, bottom),
            ],
        }
    }

    /// The outline's vertices in order.
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// The triangle fan anchored at vertex 0.
    pub fn fan_triangles(&self) -> Vec<[Point; 3]> {
        let Some(&anchor) = self.vertices.first() else {
            return Vec::new();
        };
        self.vertices
            .iter()
            .skip(1)
            .zip(self.vertices.iter().skip(2))
            .map(|(&b, &c)| [anchor, b, c])
            .collect()
    }

    /// Total area covered by the fan.
    pub fn area(&self) -> f64 {
        self.fan_triangles().iter().map(triangle_area).sum()
    }

    /// Draw a uniformly distributed point inside the polygon.
    pub fn sample(&self, rng: &mut impl Rng) -> Position {
        let triangles = self.fan_triangles();
        let areas: Vec<f64> = triangles.iter().map(triangle_area).collect();

        let chosen = WeightedIndex::new(&areas)
            .ok()
            .map(|weights| weights.sample(rng))
            .and_then(|index| triangles.get(index));

        match chosen {
            Some(triangle) => sample_in_triangle(triangle, rng),
            // Zero total area: no triangle can be weighted.
            None => self
                .vertices
                .first()
                .map_or_else(Position::default, |v| to_position(v.x, v.y)),
        }
    }
}

/// Area of a triangle via the shoelace formula.
pub fn triangle_area(triangle: &[Point; 3]) -> f64 {
    let [a, b, c] = triangle;
    0.5 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y)).abs()
}

/// Draw a uniformly distributed point inside a triangle.
///
/// With `s = sqrt(r1)` the point `a(1-s) + b(1-r2)s + c r2 s` covers the
/// triangle uniformly; using `r1` directly would cluster points near `a`.
pub fn sample_in_triangle(triangle: &[Point; 3], rng: &mut impl Rng) -> Position {
    let [a, b, c] = triangle;
    let r1: f64 = rng.random();
    let r2: f64 = rng.random();
    let s = r1.sqrt();

    let x = a.x * (1.0 - s) + b.x * (1.0 - r2) * s + c.x * r2 * s;
    let y = a.y * (1.0 - s) + b.y * (1.0 - r2) * s + c.y * r2 * s;
    to_position(x, y)
}

/// Truncate pixel coordinates toward zero.
// Room coordinates stay within a few thousand pixels.
#[allow(clippy::cast_possible_truncation)]
fn to_position(x: f64, y: f64) -> Position {
    Position::new(x.trunc() as i32, y.trunc() as i32)
}
