//! Rectangle clipping for polygon rings
//!
//! Clips rings against axis-aligned rectangles with Sutherland-Hodgman and
//! measures the result, which is how cell overlap is decided.

use geo::{Coord, LineString};

/// A clipping rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ClipRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }
}

/// Edge of the clipping rectangle
#[derive(Debug, Clone, Copy)]
enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    fn is_inside(&self, p: &Coord<f64>, rect: &ClipRect) -> bool {
        match self {
            Edge::Left => p.x >= rect.min_x,
            Edge::Right => p.x <= rect.max_x,
            Edge::Bottom => p.y >= rect.min_y,
            Edge::Top => p.y <= rect.max_y,
        }
    }

    // Only called for segments that cross the edge, so the divisor is non-zero
    fn intersect(&self, p: &Coord<f64>, q: &Coord<f64>, rect: &ClipRect) -> Coord<f64> {
        let dx = q.x - p.x;
        let dy = q.y - p.y;

        match self {
            Edge::Left => {
                let t = (rect.min_x - p.x) / dx;
                Coord { x: rect.min_x, y: p.y + t * dy }
            }
            Edge::Right => {
                let t = (rect.max_x - p.x) / dx;
                Coord { x: rect.max_x, y: p.y + t * dy }
            }
            Edge::Bottom => {
                let t = (rect.min_y - p.y) / dy;
                Coord { x: p.x + t * dx, y: rect.min_y }
            }
            Edge::Top => {
                let t = (rect.max_y - p.y) / dy;
                Coord { x: p.x + t * dx, y: rect.max_y }
            }
        }
    }
}

/// Clip a ring against one edge (Sutherland-Hodgman step)
fn clip_ring_edge(vertices: &[Coord<f64>], edge: Edge, rect: &ClipRect) -> Vec<Coord<f64>> {
    let n = vertices.len();
    let mut output = Vec::with_capacity(n + 2);

    for i in 0..n {
        let current = &vertices[i];
        let next = &vertices[(i + 1) % n];

        match (edge.is_inside(current, rect), edge.is_inside(next, rect)) {
            (true, true) => output.push(*next),
            (true, false) => output.push(edge.intersect(current, next, rect)),
            (false, true) => {
                output.push(edge.intersect(current, next, rect));
                output.push(*next);
            }
            (false, false) => {}
        }
    }

    output
}

/// Ring vertices without the repeated closing vertex
pub fn open_ring(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut vertices = ring.0.clone();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices
}

/// Clip an open ring by `rect`.
///
/// Concave rings may come back with degenerate edges running along the
/// rectangle boundary. They enclose no area, so [`ring_area`] of the
/// result is still the area of the intersection.
pub fn clip_ring(vertices: &[Coord<f64>], rect: &ClipRect) -> Vec<Coord<f64>> {
    let mut clipped = vertices.to_vec();
    for edge in [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top] {
        if clipped.len() < 3 {
            return Vec::new();
        }
        clipped = clip_ring_edge(&clipped, edge, rect);
    }
    clipped
}

/// Unsigned shoelace area of an open ring.
///
/// Coordinates are taken relative to the first vertex so large projected
/// coordinates do not swamp small areas.
pub fn ring_area(vertices: &[Coord<f64>]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }

    let anchor = vertices[0];
    let twice: f64 = (0..n)
        .map(|i| {
            let a = vertices[i] - anchor;
            let b = vertices[(i + 1) % n] - anchor;
            a.x * b.y - b.x * a.y
        })
        .sum();

    twice.abs() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Coord<f64>> {
        vec![
            Coord { x, y },
            Coord { x: x + size, y },
            Coord { x: x + size, y: y + size },
            Coord { x, y: y + size },
        ]
    }

    #[test]
    fn test_clip_fully_inside() {
        let rect = ClipRect::new(0.0, 0.0, 10.0, 10.0);
        let clipped = clip_ring(&square(2.0, 2.0, 3.0), &rect);
        assert_eq!(clipped.len(), 4);
        assert!((ring_area(&clipped) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_clip_partial() {
        let rect = ClipRect::new(0.0, 0.0, 10.0, 10.0);
        let clipped = clip_ring(&square(-5.0, 5.0, 10.0), &rect);
        assert!((ring_area(&clipped) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_clip_fully_outside() {
        let rect = ClipRect::new(0.0, 0.0, 10.0, 10.0);
        assert!(clip_ring(&square(20.0, 20.0, 5.0), &rect).is_empty());
    }

    #[test]
    fn test_shared_edge_has_no_area() {
        let rect = ClipRect::new(1.0, 0.0, 2.0, 1.0);
        let clipped = clip_ring(&square(0.0, 0.0, 1.0), &rect);
        assert_eq!(ring_area(&clipped), 0.0);
    }

    #[test]
    fn test_small_area_at_large_coordinates() {
        let ring = square(-4_975_000.0, -1_715_000.0, 0.01);
        assert!((ring_area(&ring) - 1e-4).abs() < 1e-12);
    }

    #[test]
    fn test_concave_ring_area() {
        // U shape: 3x3 square with a 1x2 notch cut from the top middle
        let ring = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 3.0, y: 0.0 },
            Coord { x: 3.0, y: 3.0 },
            Coord { x: 2.0, y: 3.0 },
            Coord { x: 2.0, y: 1.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 1.0, y: 3.0 },
            Coord { x: 0.0, y: 3.0 },
        ];
        let strip = ClipRect::new(0.0, 2.0, 3.0, 3.0);
        let clipped = clip_ring(&ring, &strip);
        assert!((ring_area(&clipped) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_open_ring_drops_closing_vertex() {
        let mut coords = square(0.0, 0.0, 1.0);
        coords.push(coords[0]);
        assert_eq!(open_ring(&LineString::new(coords)).len(), 4);
    }
}
