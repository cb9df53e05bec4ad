use std::fmt;

use crate::{
    error::{BridgeError, Result},
    geometry::RealInterval,
};

type Predicate = Box<dyn Fn(&[f64]) -> bool>;

/// A mask defined by an arbitrary membership function and declared bounds.
///
/// Nothing relates the two: the bounds are trusted as given.
pub struct PredicateMask {
    bounds: RealInterval,
    predicate: Predicate,
}

impl PredicateMask {
    pub fn new<F>(bounds: RealInterval, predicate: F) -> Self
    where
        F: Fn(&[f64]) -> bool + 'static,
    {
        Self {
            bounds,
            predicate: Box::new(predicate),
        }
    }

    pub fn unbounded<F>(dims: usize, predicate: F) -> Result<Self>
    where
        F: Fn(&[f64]) -> bool + 'static,
    {
        if dims == 0 {
            return Err(BridgeError::illegal("a mask needs at least one dimension"));
        }
        Ok(Self::new(RealInterval::unbounded(dims), predicate))
    }

    pub fn num_dimensions(&self) -> usize {
        self.bounds.num_dimensions()
    }

    pub fn test(&self, point: &[f64]) -> bool {
        point.len() == self.num_dimensions() && (self.predicate)(point)
    }

    pub fn bounds(&self) -> &RealInterval {
        &self.bounds
    }
}

impl fmt::Debug for PredicateMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateMask")
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}
