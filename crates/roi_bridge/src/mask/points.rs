use std::{fmt, rc::Rc};

use crate::{
    error::{BridgeError, Result},
    geometry::{RealInterval, check_point},
    traits::CollectionPoint,
};

/// Builds a collection's native point type from a prototype position.
pub type PointFactory = Rc<dyn Fn(&[f64]) -> Box<dyn CollectionPoint>>;

/// The plain point type.
#[derive(Debug, Clone, PartialEq)]
pub struct RealPoint {
    position: Vec<f64>,
}

impl RealPoint {
    pub fn new(position: Vec<f64>) -> Self {
        Self { position }
    }
}

impl CollectionPoint for RealPoint {
    fn position(&self) -> &[f64] {
        &self.position
    }

    fn set_position(&mut self, position: &[f64]) {
        self.position.clear();
        self.position.extend_from_slice(position);
    }
}

pub fn real_point_factory() -> PointFactory {
    Rc::new(|position: &[f64]| Box::new(RealPoint::new(position.to_vec())) as Box<dyn CollectionPoint>)
}

/// An ordered collection of points; a position is inside when it equals one
/// of them exactly.
pub struct PointCollection {
    dims: usize,
    points: Vec<Box<dyn CollectionPoint>>,
    factory: Option<PointFactory>,
}

impl PointCollection {
    pub fn new(dims: usize, positions: Vec<Vec<f64>>) -> Result<Self> {
        let points = positions
            .into_iter()
            .map(|p| Box::new(RealPoint::new(p)) as Box<dyn CollectionPoint>)
            .collect();
        Self::from_points(dims, points)
    }

    pub fn from_points(dims: usize, points: Vec<Box<dyn CollectionPoint>>) -> Result<Self> {
        if dims == 0 {
            return Err(BridgeError::illegal("a point collection needs at least one dimension"));
        }
        for point in &points {
            check_point(point.position(), dims)?;
        }
        Ok(Self {
            dims,
            points,
            factory: None,
        })
    }

    /// Use `factory` when new points of this collection's type are needed.
    pub fn with_factory(mut self, factory: PointFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn point_factory(&self) -> PointFactory {
        self.factory.clone().unwrap_or_else(real_point_factory)
    }

    pub fn num_dimensions(&self) -> usize {
        self.dims
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &(dyn CollectionPoint + 'static)> {
        self.points.iter().map(|p| p.as_ref())
    }

    pub fn positions(&self) -> Vec<Vec<f64>> {
        self.points.iter().map(|p| p.position().to_vec()).collect()
    }

    pub fn add_point(&mut self, point: Box<dyn CollectionPoint>) -> Result<()> {
        check_point(point.position(), self.dims)?;
        self.points.push(point);
        Ok(())
    }

    pub fn remove_first(&mut self) -> Option<Box<dyn CollectionPoint>> {
        if self.points.is_empty() {
            None
        } else {
            Some(self.points.remove(0))
        }
    }

    pub fn point_mut(&mut self, index: usize) -> Option<&mut (dyn CollectionPoint + 'static)> {
        self.points.get_mut(index).map(|p| p.as_mut())
    }

    pub fn test(&self, point: &[f64]) -> bool {
        self.points.iter().any(|p| p.position() == point)
    }

    pub fn bounds(&self) -> RealInterval {
        RealInterval::enclosing(self.points.iter().map(|p| p.position()))
            .unwrap_or_else(|| RealInterval::at(&vec![0.0; self.dims]))
    }
}

impl fmt::Debug for PointCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointCollection")
            .field("dims", &self.dims)
            .field("points", &self.points)
            .field("custom_factory", &self.factory.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct LabeledPoint {
        label: &'static str,
        position: Vec<f64>,
    }

    impl CollectionPoint for LabeledPoint {
        fn position(&self) -> &[f64] {
            &self.position
        }

        fn set_position(&mut self, position: &[f64]) {
            self.position = position.to_vec();
        }
    }

    #[test]
    fn exact_membership() {
        let points = PointCollection::new(2, vec![vec![1.0, 2.0], vec![3.5, 4.0]]).unwrap();
        assert!(points.test(&[3.5, 4.0]));
        assert!(!points.test(&[3.5, 4.000001]));
        assert_eq!(points.bounds().max(), &[3.5, 4.0]);
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        assert!(PointCollection::new(2, vec![vec![1.0]]).is_err());
        let mut points = PointCollection::new(3, vec![]).unwrap();
        assert!(points.add_point(Box::new(RealPoint::new(vec![1.0, 2.0]))).is_err());
    }

    #[test]
    fn custom_factory_is_used() {
        let factory: PointFactory = Rc::new(|position: &[f64]| {
            Box::new(LabeledPoint {
                label: "synthetic",
                position: position.to_vec(),
            }) as Box<dyn CollectionPoint>
        });
        let mut points = PointCollection::new(2, vec![]).unwrap().with_factory(factory);
        let make = points.point_factory();
        points.add_point(make([1.0, 1.0].as_slice())).unwrap();
        assert!(format!("{points:?}").contains("synthetic"));
        assert_eq!(points.remove_first().map(|p| p.position().to_vec()), Some(vec![1.0, 1.0]));
        assert!(points.is_empty());
    }
}
