//! Shared geometry helpers: real intervals, polygon containment, segment
//! containment and the ring builders used to outline legacy shapes.

use std::f64::consts::PI;

use geo::{BoundingRect, Contains};
use geo_types::{LineString, Point, Polygon};

use crate::error::{BridgeError, Result};

/// Relative tolerance for "point lies on a segment" tests.
const ON_SEGMENT_EPSILON: f64 = 1e-12;

/// Axis-aligned real bounds, possibly infinite.
#[derive(Debug, Clone, PartialEq)]
pub struct RealInterval {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl RealInterval {
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Result<Self> {
        if min.len() != max.len() {
            return Err(BridgeError::illegal(format!(
                "min has {} dimensions but max has {}",
                min.len(),
                max.len()
            )));
        }
        if min.is_empty() {
            return Err(BridgeError::illegal("intervals need at least one dimension"));
        }
        for (d, (lo, hi)) in min.iter().zip(&max).enumerate() {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(BridgeError::illegal(format!(
                    "invalid bounds [{lo}, {hi}] in dimension {d}"
                )));
            }
        }
        Ok(Self { min, max })
    }

    pub fn unbounded(dims: usize) -> Self {
        Self {
            min: vec![f64::NEG_INFINITY; dims],
            max: vec![f64::INFINITY; dims],
        }
    }

    /// A zero-extent interval at `point`.
    pub fn at(point: &[f64]) -> Self {
        Self {
            min: point.to_vec(),
            max: point.to_vec(),
        }
    }

    /// Smallest interval holding every point, in any dimension; `None` when
/// there are none.
    pub fn enclosing<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let mut iter = points.into_iter();
        let mut bounds = Self::at(iter.next()?);
        for point in iter {
            for (d, &x) in point.iter().enumerate().take(bounds.min.len()) {
                bounds.min[d] = bounds.min[d].min(x);
                bounds.max[d] = bounds.max[d].max(x);
            }
        }
        Some(bounds)
    }

    pub fn num_dimensions(&self) -> usize {
        self.min.len()
    }

    pub fn min(&self) -> &[f64] {
        &self.min
    }

    pub fn max(&self) -> &[f64] {
        &self.max
    }

    pub fn real_min(&self, d: usize) -> Result<f64> {
        check_dimension(d, self.num_dimensions())?;
        Ok(self.min[d])
    }

    pub fn real_max(&self, d: usize) -> Result<f64> {
        check_dimension(d, self.num_dimensions())?;
        Ok(self.max[d])
    }

    pub fn is_bounded(&self) -> bool {
        self.min.iter().chain(&self.max).all(|v| v.is_finite())
    }

    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.min.len()
            && point
                .iter()
                .zip(self.min.iter().zip(&self.max))
                .all(|(x, (lo, hi))| lo <= x && x <= hi)
    }

    /// Intersection; an empty overlap collapses to a degenerate interval so
    /// that `min <= max` keeps holding.
    pub fn intersect(&self, other: &RealInterval) -> RealInterval {
        let mut min = Vec::with_capacity(self.min.len());
        let mut max = Vec::with_capacity(self.min.len());
        for d in 0..self.min.len().min(other.min.len()) {
            let lo = self.min[d].max(other.min[d]);
            let hi = self.max[d].min(other.max[d]);
            min.push(lo);
            max.push(hi.max(lo));
        }
        RealInterval { min, max }
    }

    pub fn union(&self, other: &RealInterval) -> RealInterval {
        let min = self.min.iter().zip(&other.min).map(|(a, b)| a.min(*b)).collect();
        let max = self.max.iter().zip(&other.max).map(|(a, b)| a.max(*b)).collect();
        RealInterval { min, max }
    }

    pub(crate) fn set(&mut self, d: usize, min: f64, max: f64) {
        self.min[d] = min;
        self.max[d] = max;
    }

    pub(crate) fn translate(&mut self, offset: &[f64]) {
        for (d, delta) in offset.iter().enumerate().take(self.min.len()) {
            self.min[d] += delta;
            self.max[d] += delta;
        }
    }
}

pub fn check_dimension(dimension: usize, dims: usize) -> Result<()> {
    if dimension < dims {
        Ok(())
    } else {
        Err(BridgeError::InvalidDimension { dimension, dims })
    }
}

pub fn check_point(point: &[f64], dims: usize) -> Result<()> {
    if point.len() == dims {
        Ok(())
    } else {
        Err(BridgeError::illegal(format!(
            "expected a {dims}-dimensional point, got {}",
            point.len()
        )))
    }
}

/// Whether `(x, y)` lies strictly inside the ring. Rings with fewer than
/// three vertices contain nothing.
pub fn polygon_contains(vertices: &[[f64; 2]], x: f64, y: f64) -> bool {
    vertices.len() >= 3 && ring_polygon(vertices).contains(&Point::new(x, y))
}

/// Corners of the box around `vertices`, `None` when there are none.
pub fn vertex_bounds(vertices: &[[f64; 2]]) -> Option<([f64; 2], [f64; 2])> {
    let rect = LineString::from(vertices.to_vec()).bounding_rect()?;
    let (min, max) = (rect.min(), rect.max());
    Some(([min.x, min.y], [max.x, max.y]))
}

/// Whether `point` lies on the closed segment `start`..`end`, in any dimension.
pub fn line_contains(start: &[f64], end: &[f64], point: &[f64]) -> bool {
    if start.len() != point.len() || end.len() != point.len() {
        return false;
    }
    let direction: Vec<f64> = end.iter().zip(start).map(|(e, s)| e - s).collect();
    let length_sq: f64 = direction.iter().map(|v| v * v).sum();
    if length_sq == 0.0 {
        return start == point;
    }
    let t = point
        .iter()
        .zip(start)
        .zip(&direction)
        .map(|((p, s), v)| (p - s) * v)
        .sum::<f64>()
        / length_sq;
    if !(0.0..=1.0).contains(&t) {
        return false;
    }
    let distance_sq: f64 = point
        .iter()
        .zip(start)
        .zip(&direction)
        .map(|((p, s), v)| {
            let off = p - (s + t * v);
            off * off
        })
        .sum();
    distance_sq <= ON_SEGMENT_EPSILON * length_sq.max(1.0)
}

/// Whether `point` lies within `width / 2` of the segment `a`..`b`.
pub fn within_stroke(a: [f64; 2], b: [f64; 2], point: [f64; 2], width: f64) -> bool {
    let half = width / 2.0;
    let [dx, dy] = [b[0] - a[0], b[1] - a[1]];
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq == 0.0 {
        0.0
    } else {
        (((point[0] - a[0]) * dx + (point[1] - a[1]) * dy) / length_sq).clamp(0.0, 1.0)
    };
    let ex = point[0] - (a[0] + t * dx);
    let ey = point[1] - (a[1] + t * dy);
    if half == 0.0 {
        return line_contains(&a, &b, &point);
    }
    ex * ex + ey * ey <= half * half
}

/// Vertices approximating the ellipse inscribed in the given rectangle.
pub fn ellipse_ring(x: f64, y: f64, width: f64, height: f64) -> Vec<[f64; 2]> {
    let (rx, ry) = (width / 2.0, height / 2.0);
    let (cx, cy) = (x + rx, y + ry);
    let segments = ((rx + ry) * PI).ceil().clamp(32.0, 1024.0) as usize;
    (0..segments)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / segments as f64;
            [cx + rx * theta.cos(), cy + ry * theta.sin()]
        })
        .collect()
}

/// Rectangle ring, with quarter-circle corners when `corner_diameter > 0`.
pub fn rectangle_ring(x: f64, y: f64, width: f64, height: f64, corner_diameter: f64) -> Vec<[f64; 2]> {
    let r = (corner_diameter / 2.0).min(width / 2.0).min(height / 2.0);
    if r <= 0.0 {
        return vec![[x, y], [x + width, y], [x + width, y + height], [x, y + height]];
    }
    const CORNER_STEPS: usize = 8;
    let corners = [
        (x + width - r, y + r, -PI / 2.0),
        (x + width - r, y + height - r, 0.0),
        (x + r, y + height - r, PI / 2.0),
        (x + r, y + r, PI),
    ];
    corners
        .iter()
        .flat_map(|&(cx, cy, start)| {
            (0..=CORNER_STEPS).map(move |i| {
                let theta = start + (PI / 2.0) * i as f64 / CORNER_STEPS as f64;
                [cx + r * theta.cos(), cy + r * theta.sin()]
            })
        })
        .collect()
}

pub fn ring_polygon(ring: &[[f64; 2]]) -> Polygon<f64> {
    Polygon::new(LineString::from(ring.to_vec()), vec![])
}

/// One quad per non-degenerate segment of a stroked path.
pub fn stroke_quads(vertices: &[[f64; 2]], width: f64) -> Vec<Polygon<f64>> {
    let half = width / 2.0;
    vertices
        .windows(2)
        .filter_map(|pair| {
            let ([ax, ay], [bx, by]) = (pair[0], pair[1]);
            let length = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
            if length == 0.0 {
                return None;
            }
            let (nx, ny) = (-(by - ay) / length * half, (bx - ax) / length * half);
            Some(ring_polygon(&[
                [ax + nx, ay + ny],
                [bx + nx, by + ny],
                [bx - nx, by - ny],
                [ax - nx, ay - ny],
            ]))
        })
        .collect()
}

pub(crate) fn widen(points: &[[f32; 2]]) -> Vec<[f64; 2]> {
    points.iter().map(|&[x, y]| [x as f64, y as f64]).collect()
}

pub(crate) fn narrow(points: &[[f64; 2]]) -> Vec<[f32; 2]> {
    points.iter().map(|&[x, y]| [x as f32, y as f32]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_contains_triangle() {
        let triangle = [[0.0, 0.0], [10.0, 0.0], [5.0, 10.0]];
        assert!(polygon_contains(&triangle, 5.0, 5.0));
        assert!(!polygon_contains(&triangle, 0.0, 10.0));
        assert!(!polygon_contains(&triangle[..2], 5.0, 0.0));
    }

    #[test]
    fn vertex_bounds_span_every_vertex() {
        let (min, max) = vertex_bounds(&[[3.0, -1.0], [0.0, 4.0], [7.0, 2.0]]).unwrap();
        assert_eq!(min, [0.0, -1.0]);
        assert_eq!(max, [7.0, 4.0]);
        assert!(vertex_bounds(&[]).is_none());
    }

    #[test]
    fn line_contains_endpoints_and_interior() {
        assert!(line_contains(&[0.0, 0.0], &[4.0, 2.0], &[2.0, 1.0]));
        assert!(line_contains(&[0.0, 0.0], &[4.0, 2.0], &[4.0, 2.0]));
        assert!(!line_contains(&[0.0, 0.0], &[4.0, 2.0], &[2.0, 1.1]));
        assert!(!line_contains(&[0.0, 0.0], &[4.0, 2.0], &[6.0, 3.0]));
        assert!(line_contains(&[1.0, 1.0, 1.0], &[3.0, 3.0, 3.0], &[2.0, 2.0, 2.0]));
    }

    #[test]
    fn stroke_distance() {
        assert!(within_stroke([0.0, 0.0], [10.0, 0.0], [5.0, 1.9], 4.0));
        assert!(!within_stroke([0.0, 0.0], [10.0, 0.0], [5.0, 2.1], 4.0));
        assert!(within_stroke([3.0, 3.0], [3.0, 3.0], [3.5, 3.0], 2.0));
    }

    #[test]
    fn intersection_collapses_when_disjoint() {
        let a = RealInterval::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let b = RealInterval::new(vec![5.0, 0.5], vec![6.0, 2.0]).unwrap();
        let both = a.intersect(&b);
        assert_eq!(both.min(), &[5.0, 0.5]);
        assert_eq!(both.max(), &[5.0, 1.0]);
        assert_eq!(a.union(&b).max(), &[6.0, 2.0]);
    }

    #[test]
    fn invalid_interval_rejected() {
        let err = RealInterval::new(vec![2.0], vec![1.0]).unwrap_err();
        assert!(err.is_illegal_argument());
        assert!(RealInterval::unbounded(2).real_min(2).unwrap_err().is_illegal_argument());
    }
}
