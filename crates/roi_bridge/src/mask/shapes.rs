use crate::{
    error::{BridgeError, Result},
    geometry::{RealInterval, check_dimension, check_point, line_contains, polygon_contains, vertex_bounds},
    types::BoundaryType,
};

/// An axis-aligned box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxMask {
    interval: RealInterval,
    boundary: BoundaryType,
}

impl BoxMask {
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Result<Self> {
        Ok(Self {
            interval: RealInterval::new(min, max)?,
            boundary: BoundaryType::Closed,
        })
    }

    pub fn with_boundary(mut self, boundary: BoundaryType) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn num_dimensions(&self) -> usize {
        self.interval.num_dimensions()
    }

    pub fn boundary_type(&self) -> BoundaryType {
        self.boundary
    }

    pub fn interval(&self) -> &RealInterval {
        &self.interval
    }

    pub fn test(&self, point: &[f64]) -> bool {
        if point.len() != self.num_dimensions() {
            return false;
        }
        let (min, max) = (self.interval.min(), self.interval.max());
        match self.boundary {
            BoundaryType::Open => (0..point.len()).all(|d| min[d] < point[d] && point[d] < max[d]),
            _ => self.interval.contains(point),
        }
    }

    pub fn center(&self) -> Vec<f64> {
        let (min, max) = (self.interval.min(), self.interval.max());
        min.iter().zip(max).map(|(lo, hi)| (lo + hi) / 2.0).collect()
    }

    pub fn side_length(&self, d: usize) -> Result<f64> {
        Ok(self.interval.real_max(d)? - self.interval.real_min(d)?)
    }

    /// Resize along `d`, keeping the centre.
    pub fn set_side_length(&mut self, d: usize, length: f64) -> Result<()> {
        check_dimension(d, self.num_dimensions())?;
        if !(length >= 0.0) {
            return Err(BridgeError::illegal(format!("side length {length} must be non-negative")));
        }
        let center = self.center()[d];
        self.interval.set(d, center - length / 2.0, center + length / 2.0);
        Ok(())
    }

    pub fn set_center(&mut self, center: &[f64]) -> Result<()> {
        check_point(center, self.num_dimensions())?;
        let offset: Vec<f64> = center.iter().zip(self.center()).map(|(c, old)| c - old).collect();
        self.interval.translate(&offset);
        Ok(())
    }
}

/// An axis-aligned ellipsoid.
#[derive(Debug, Clone, PartialEq)]
pub struct EllipsoidMask {
    center: Vec<f64>,
    semi_axes: Vec<f64>,
    boundary: BoundaryType,
}

impl EllipsoidMask {
    pub fn new(center: Vec<f64>, semi_axes: Vec<f64>) -> Result<Self> {
        if center.len() != semi_axes.len() || center.is_empty() {
            return Err(BridgeError::illegal(format!(
                "centre has {} dimensions but semi-axes have {}",
                center.len(),
                semi_axes.len()
            )));
        }
        if semi_axes.iter().any(|r| !(*r >= 0.0)) {
            return Err(BridgeError::illegal("semi-axis lengths must be non-negative"));
        }
        Ok(Self {
            center,
            semi_axes,
            boundary: BoundaryType::Closed,
        })
    }

    pub fn sphere(center: Vec<f64>, radius: f64) -> Result<Self> {
        let dims = center.len();
        Self::new(center, vec![radius; dims])
    }

    pub fn with_boundary(mut self, boundary: BoundaryType) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn num_dimensions(&self) -> usize {
        self.center.len()
    }

    pub fn center(&self) -> &[f64] {
        &self.center
    }

    pub fn semi_axis_length(&self, d: usize) -> Result<f64> {
        check_dimension(d, self.num_dimensions())?;
        Ok(self.semi_axes[d])
    }

    pub fn semi_axes(&self) -> &[f64] {
        &self.semi_axes
    }

    pub fn set_center(&mut self, center: &[f64]) -> Result<()> {
        check_point(center, self.num_dimensions())?;
        self.center = center.to_vec();
        Ok(())
    }

    pub fn set_semi_axis_length(&mut self, d: usize, length: f64) -> Result<()> {
        check_dimension(d, self.num_dimensions())?;
        if !(length >= 0.0) {
            return Err(BridgeError::illegal(format!("semi-axis {length} must be non-negative")));
        }
        self.semi_axes[d] = length;
        Ok(())
    }

    pub fn test(&self, point: &[f64]) -> bool {
        if point.len() != self.num_dimensions() {
            return false;
        }
        let mut distance = 0.0;
        for ((x, c), r) in point.iter().zip(&self.center).zip(&self.semi_axes) {
            if *r == 0.0 {
                if x != c {
                    return false;
                }
                continue;
            }
            distance += ((x - c) / r).powi(2);
        }
        match self.boundary {
            BoundaryType::Open => distance < 1.0,
            _ => distance <= 1.0,
        }
    }

    pub fn bounds(&self) -> RealInterval {
        let min = self.center.iter().zip(&self.semi_axes).map(|(c, r)| c - r).collect();
        let max = self.center.iter().zip(&self.semi_axes).map(|(c, r)| c + r).collect();
        RealInterval::new(min, max).unwrap_or_else(|_| RealInterval::at(&self.center))
    }
}

/// A closed line segment.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMask {
    one: Vec<f64>,
    two: Vec<f64>,
}

impl LineMask {
    pub fn new(one: Vec<f64>, two: Vec<f64>) -> Result<Self> {
        check_point(&two, one.len())?;
        if one.is_empty() {
            return Err(BridgeError::illegal("line endpoints need at least one dimension"));
        }
        Ok(Self { one, two })
    }

    pub fn num_dimensions(&self) -> usize {
        self.one.len()
    }

    pub fn endpoint_one(&self) -> &[f64] {
        &self.one
    }

    pub fn endpoint_two(&self) -> &[f64] {
        &self.two
    }

    pub fn set_endpoint_one(&mut self, position: &[f64]) -> Result<()> {
        check_point(position, self.num_dimensions())?;
        self.one = position.to_vec();
        Ok(())
    }

    pub fn set_endpoint_two(&mut self, position: &[f64]) -> Result<()> {
        check_point(position, self.num_dimensions())?;
        self.two = position.to_vec();
        Ok(())
    }

    pub fn test(&self, point: &[f64]) -> bool {
        line_contains(&self.one, &self.two, point)
    }

    pub fn bounds(&self) -> RealInterval {
        RealInterval::enclosing([self.one.as_slice(), self.two.as_slice()])
            .unwrap_or_else(|| RealInterval::at(&self.one))
    }
}

/// A single point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointMask {
    position: Vec<f64>,
}

impl PointMask {
    pub fn new(position: Vec<f64>) -> Result<Self> {
        if position.is_empty() {
            return Err(BridgeError::illegal("a point needs at least one dimension"));
        }
        Ok(Self { position })
    }

    pub fn num_dimensions(&self) -> usize {
        self.position.len()
    }

    pub fn position(&self) -> &[f64] {
        &self.position
    }

    pub fn set_position(&mut self, position: &[f64]) -> Result<()> {
        check_point(position, self.num_dimensions())?;
        self.position = position.to_vec();
        Ok(())
    }

    pub fn test(&self, point: &[f64]) -> bool {
        point == self.position.as_slice()
    }

    pub fn bounds(&self) -> RealInterval {
        RealInterval::at(&self.position)
    }
}

/// A closed 2-D polygon; membership uses the even-odd rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonMask {
    vertices: Vec<[f64; 2]>,
}

/// An open 2-D polyline; only points on a segment are inside.
#[derive(Debug, Clone, PartialEq)]
pub struct PolylineMask {
    vertices: Vec<[f64; 2]>,
}

macro_rules! impl_vertex_list {
    ($mask:ident) => {
        impl $mask {
            pub fn new(vertices: Vec<[f64; 2]>) -> Self {
                Self { vertices }
            }

            pub fn num_dimensions(&self) -> usize {
                2
            }

            pub fn num_vertices(&self) -> usize {
                self.vertices.len()
            }

            pub fn vertices(&self) -> &[[f64; 2]] {
                &self.vertices
            }

            pub fn vertex(&self, index: usize) -> Option<[f64; 2]> {
                self.vertices.get(index).copied()
            }

            pub fn set_vertex(&mut self, index: usize, position: [f64; 2]) -> Result<()> {
                let count = self.vertices.len();
                let vertex = self.vertices.get_mut(index).ok_or_else(|| {
                    BridgeError::illegal(format!("vertex {index} out of range for {count} vertices"))
                })?;
                *vertex = position;
                Ok(())
            }

            pub fn add_vertex(&mut self, index: usize, position: [f64; 2]) -> Result<()> {
                if index > self.vertices.len() {
                    return Err(BridgeError::illegal(format!(
                        "cannot insert vertex at {index} into {} vertices",
                        self.vertices.len()
                    )));
                }
                self.vertices.insert(index, position);
                Ok(())
            }

            pub fn remove_vertex(&mut self, index: usize) -> Result<[f64; 2]> {
                if index >= self.vertices.len() {
                    return Err(BridgeError::illegal(format!(
                        "vertex {index} out of range for {} vertices",
                        self.vertices.len()
                    )));
                }
                Ok(self.vertices.remove(index))
            }

            pub fn bounds(&self) -> RealInterval {
                vertex_bounds(&self.vertices)
                    .and_then(|(min, max)| RealInterval::new(min.to_vec(), max.to_vec()).ok())
                    .unwrap_or_else(|| RealInterval::at(&[0.0, 0.0]))
            }

            pub(crate) fn vertices_mut(&mut self) -> &mut Vec<[f64; 2]> {
                &mut self.vertices
            }
        }
    };
}

impl_vertex_list!(PolygonMask);
impl_vertex_list!(PolylineMask);

impl PolygonMask {
    pub fn test(&self, point: &[f64]) -> bool {
        point.len() == 2 && polygon_contains(&self.vertices, point[0], point[1])
    }
}

impl PolylineMask {
    pub fn test(&self, point: &[f64]) -> bool {
        point.len() == 2
            && self
                .vertices
                .windows(2)
                .any(|pair| line_contains(&pair[0], &pair[1], point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_side_length_keeps_center() {
        let mut b = BoxMask::new(vec![0.0, 0.0], vec![4.0, 2.0]).unwrap();
        b.set_side_length(0, 8.0).unwrap();
        assert_eq!(b.interval().min(), &[-2.0, 0.0]);
        assert_eq!(b.interval().max(), &[6.0, 2.0]);
        b.set_center(&[10.0, 10.0]).unwrap();
        assert_eq!(b.interval().min(), &[6.0, 9.0]);
        assert!(b.set_side_length(2, 1.0).unwrap_err().is_illegal_argument());
        assert!(b.set_side_length(0, -1.0).is_err());
    }

    #[test]
    fn open_and_closed_boxes() {
        let closed = BoxMask::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let open = closed.clone().with_boundary(BoundaryType::Open);
        assert!(closed.test(&[1.0, 1.0]));
        assert!(!open.test(&[1.0, 1.0]));
        assert!(open.test(&[0.5, 0.5]));
        assert!(!closed.test(&[0.5]));
    }

    #[test]
    fn ellipsoid_membership_and_bounds() {
        let e = EllipsoidMask::new(vec![5.0, 5.0], vec![4.0, 2.0]).unwrap();
        assert!(e.test(&[9.0, 5.0]));
        assert!(!e.test(&[5.0, 7.5]));
        assert_eq!(e.bounds().min(), &[1.0, 3.0]);
        assert!(EllipsoidMask::new(vec![0.0], vec![-1.0]).is_err());
    }

    #[test]
    fn polyline_tests_segments_only() {
        let line = PolylineMask::new(vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]);
        assert!(line.test(&[5.0, 0.0]));
        assert!(line.test(&[10.0, 3.0]));
        assert!(!line.test(&[5.0, 5.0]));
        assert_eq!(line.bounds().max(), &[10.0, 10.0]);
    }

    #[test]
    fn polygon_vertex_editing() {
        let mut polygon = PolygonMask::new(vec![[0.0, 0.0], [10.0, 0.0], [5.0, 10.0]]);
        polygon.add_vertex(3, [0.0, 10.0]).unwrap();
        assert_eq!(polygon.num_vertices(), 4);
        assert_eq!(polygon.remove_vertex(1).unwrap(), [10.0, 0.0]);
        assert!(polygon.set_vertex(7, [1.0, 1.0]).is_err());
    }
}
