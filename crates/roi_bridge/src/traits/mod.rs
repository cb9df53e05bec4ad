use std::fmt;

use image::GrayImage;

use crate::{convert::raster::RasterRegion, error::Result, mask::MaskRef, wrap::SyncState};

/// A live view of an object from the other model.
pub trait Wrapper {
    /// The wrapped object's handle type.
    type Source;

    /// The wrapped object, by identity. Pending edits are not pushed first.
    fn source(&self) -> Self::Source;

    /// Push edits made through the wrapper into the source. Idempotent.
    fn synchronize(&self) -> Result<()>;

    fn state(&self) -> SyncState;

    fn updated_source(&self) -> Result<Self::Source> {
        self.synchronize()?;
        Ok(self.source())
    }
}

/// Turns a bounded 2-D mask into a binary raster.
pub trait Rasterizer: Send + Sync {
    /// Sample `mask` over `region`; non-zero pixels are inside.
    fn rasterize(&self, mask: &MaskRef, region: &RasterRegion) -> Result<GrayImage>;
}

/// A member of a point collection. Collections may hold richer point types
/// than [`crate::mask::RealPoint`].
pub trait CollectionPoint: fmt::Debug {
    fn position(&self) -> &[f64];

    fn set_position(&mut self, position: &[f64]);
}

/// The mask-side element list reconciled by [`crate::wrap::sync::reconcile`].
pub trait SyncTarget {
    fn len(&self) -> usize;

    /// Append a new element built from `prototype`.
    fn append(&mut self, prototype: [f64; 2]);

    fn remove_first(&mut self);

    fn set_position(&mut self, index: usize, position: [f64; 2]);
}
