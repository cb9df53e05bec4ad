//! Choosing and running converters.
//!
//! [`ConvertService`] holds a frozen [`ConverterCatalog`] and an optional
//! [`Rasterizer`]. For a value and a target type it walks the catalog in
//! priority order and runs the first descriptor that accepts the value.

pub mod builtin;
pub mod catalog;
pub mod composite;
pub mod raster;

use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    config::ConvertOptions,
    error::{BridgeError, Result},
    legacy::RoiRef,
    mask::MaskRef,
    traits::Rasterizer,
    types::TypeTag,
    wrap::{MaskRoi, RoiMask},
};

pub use catalog::{CatalogBuilder, ConverterCatalog, ConverterDescriptor};
pub use composite::CompositeFlattener;
pub use raster::{MAX_RASTER_PIXELS, PredicateRasterizer, RasterFallbackConverter, RasterRegion};

/// Anything the catalog can convert.
#[derive(Debug, Clone)]
pub enum Value {
    Roi(RoiRef),
    Mask(MaskRef),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Roi(roi) => roi.type_tag(),
            Self::Mask(mask) => mask.type_tag(),
        }
    }

    /// Runtime instance check, including the two wrapper markers.
    pub fn is_instance(&self, tag: TypeTag) -> bool {
        match (tag, self) {
            (TypeTag::RoiWrapper, Self::Mask(mask)) => mask.as_roi_wrapper().is_some(),
            (TypeTag::MaskWrapper, Self::Roi(roi)) => roi.borrow().is_mask_wrapper(),
            (tag, _) if tag.is_marker() => false,
            (tag, value) => value.type_tag().is_assignable_to(tag),
        }
    }

    pub fn as_roi(&self) -> Option<&RoiRef> {
        match self {
            Self::Roi(roi) => Some(roi),
            Self::Mask(_) => None,
        }
    }

    pub fn as_mask(&self) -> Option<&MaskRef> {
        match self {
            Self::Mask(mask) => Some(mask),
            Self::Roi(_) => None,
        }
    }

    pub fn into_roi(self) -> Option<RoiRef> {
        match self {
            Self::Roi(roi) => Some(roi),
            Self::Mask(_) => None,
        }
    }

    pub fn into_mask(self) -> Option<MaskRef> {
        match self {
            Self::Mask(mask) => Some(mask),
            Self::Roi(_) => None,
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Roi(a), Self::Roi(b)) => a.ptr_eq(b),
            (Self::Mask(a), Self::Mask(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<RoiRef> for Value {
    fn from(roi: RoiRef) -> Self {
        Self::Roi(roi)
    }
}

impl From<MaskRef> for Value {
    fn from(mask: MaskRef) -> Self {
        Self::Mask(mask)
    }
}

impl From<MaskRoi> for Value {
    fn from(wrapper: MaskRoi) -> Self {
        Self::Roi(wrapper.into_roi())
    }
}

impl From<RoiMask> for Value {
    fn from(wrapper: RoiMask) -> Self {
        Self::Mask(MaskRef::Roi(wrapper))
    }
}

/// The conversion entry point.
#[derive(Clone)]
pub struct ConvertService {
    catalog: Arc<ConverterCatalog>,
    rasterizer: Option<Arc<dyn Rasterizer>>,
}

impl ConvertService {
    /// The built-in catalog with the sampling rasterizer.
    pub fn new() -> Self {
        Self::with_catalog(ConverterCatalog::global()).with_rasterizer(Arc::new(PredicateRasterizer))
    }

    /// A service over `catalog` with no rasterizer.
    pub fn with_catalog(catalog: Arc<ConverterCatalog>) -> Self {
        Self {
            catalog,
            rasterizer: None,
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn without_rasterizer(mut self) -> Self {
        self.rasterizer = None;
        self
    }

    pub fn from_options(options: &ConvertOptions) -> Self {
        let service = Self::new();
        if options.raster_fallback {
            service
        } else {
            service.without_rasterizer()
        }
    }

    pub fn rasterizer(&self) -> Option<&dyn Rasterizer> {
        self.rasterizer.as_deref()
    }

    pub fn catalog(&self) -> &ConverterCatalog {
        &self.catalog
    }

    /// The descriptor that would convert `value` to `target`, if any.
    pub fn handler(&self, value: &Value, target: TypeTag) -> Option<&ConverterDescriptor> {
        self.catalog
            .descriptors()
            .iter()
            .find(|d| d.accepts(self, value, target))
    }

    pub fn supports(&self, value: &Value, target: TypeTag) -> bool {
        value.is_instance(target) || self.handler(value, target).is_some()
    }

    /// Convert `value` to `target`. A value that already is a `target`
    /// comes back unchanged.
    pub fn convert(&self, value: &Value, target: TypeTag) -> Result<Value> {
        if value.is_instance(target) {
            trace!(%target, "value already has the requested type");
            return Ok(value.clone());
        }
        let Some(descriptor) = self.handler(value, target) else {
            return Err(BridgeError::NoConverter {
                value: value.type_tag().to_string(),
                target,
            });
        };
        debug!(
            converter = descriptor.name(),
            source = %value.type_tag(),
            %target,
            lossy = descriptor.is_lossy(),
            "converting"
        );
        let converted = descriptor.convert(self, value)?;
        if !converted.is_instance(target) {
            return Err(BridgeError::illegal(format!(
                "converter {} produced {} where {target} was requested",
                descriptor.name(),
                converted.type_tag()
            )));
        }
        Ok(converted)
    }

    /// Like [`ConvertService::convert`], but `None` when nothing matches.
    pub fn try_convert(&self, value: &Value, target: TypeTag) -> Result<Option<Value>> {
        if !self.supports(value, target) {
            return Ok(None);
        }
        self.convert(value, target).map(Some)
    }

    pub fn convert_to_roi(&self, value: impl Into<Value>, target: TypeTag) -> Result<RoiRef> {
        let converted = self.convert(&value.into(), target)?;
        converted
            .into_roi()
            .ok_or_else(|| BridgeError::illegal(format!("{target} is not a legacy roi type")))
    }

    pub fn convert_to_mask(&self, value: impl Into<Value>, target: TypeTag) -> Result<MaskRef> {
        let converted = self.convert(&value.into(), target)?;
        converted
            .into_mask()
            .ok_or_else(|| BridgeError::illegal(format!("{target} is not a mask type")))
    }
}

impl Default for ConvertService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConvertService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertService")
            .field("converters", &self.catalog.len())
            .field("rasterizer", &self.rasterizer.is_some())
            .finish()
    }
}
