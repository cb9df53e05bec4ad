//! Reconciling a mask-side element list with the roi-side list it mirrors.

use tracing::{debug, warn};

use crate::{
    mask::{PointCollection, PointFactory},
    traits::SyncTarget,
};

/// Bring `target` in line with `current` after edits made on the roi side.
///
/// `last_synced` is the element count recorded at the previous run. Excess
/// elements are appended in order; missing ones are removed from the front of
/// `target`, since a removal cannot be matched to the position it came from.
/// Every remaining element is then overwritten by index. Returns the count to
/// record for the next run.
pub fn reconcile<T: SyncTarget + ?Sized>(
    current: &[[f64; 2]],
    last_synced: usize,
    target: &mut T,
) -> usize {
    let wanted = current.len();
    if wanted > last_synced {
        for &prototype in &current[last_synced..] {
            target.append(prototype);
        }
    }
    let mut removed = 0;
    while target.len() > wanted {
        target.remove_first();
        removed += 1;
    }
    if removed > 0 {
        debug!(removed, "dropped leading elements to match the roi");
    }
    let shared = target.len().min(wanted);
    for (index, &position) in current.iter().enumerate().take(shared) {
        target.set_position(index, position);
    }
    wanted
}

/// A point collection seen as a [`SyncTarget`]; new members come from
/// `factory`, normally the collection's own.
pub struct PointsTarget<'a> {
    pub collection: &'a mut PointCollection,
    pub factory: PointFactory,
}

impl SyncTarget for PointsTarget<'_> {
    fn len(&self) -> usize {
        self.collection.size()
    }

    fn append(&mut self, prototype: [f64; 2]) {
        let point = (self.factory)(&prototype);
        let dims = point.position().len();
        if let Err(err) = self.collection.add_point(point) {
            warn!(dims, %err, "point factory produced an unusable point; skipped");
        }
    }

    fn remove_first(&mut self) {
        self.collection.remove_first();
    }

    fn set_position(&mut self, index: usize, position: [f64; 2]) {
        if let Some(point) = self.collection.point_mut(index) {
            point.set_position(&position);
        }
    }
}

/// A polygon or polyline vertex list seen as a [`SyncTarget`].
pub struct VertexTarget<'a> {
    pub vertices: &'a mut Vec<[f64; 2]>,
}

impl SyncTarget for VertexTarget<'_> {
    fn len(&self) -> usize {
        self.vertices.len()
    }

    fn append(&mut self, prototype: [f64; 2]) {
        self.vertices.push(prototype);
    }

    fn remove_first(&mut self) {
        if !self.vertices.is_empty() {
            self.vertices.remove(0);
        }
    }

    fn set_position(&mut self, index: usize, position: [f64; 2]) {
        if let Some(vertex) = self.vertices.get_mut(index) {
            *vertex = position;
        }
    }
}
