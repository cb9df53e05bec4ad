//! Converter descriptors and the frozen catalog that holds them.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use tracing::debug;

use super::{ConvertService, Value, builtin, composite, raster};
use crate::{error::Result, types::TypeTag, types::priority};

type Capability = Box<dyn Fn(&ConvertService, &Value) -> bool + Send + Sync>;
type ConvertFn = Box<dyn Fn(&ConvertService, &Value) -> Result<Value> + Send + Sync>;

/// One registered conversion path.
pub struct ConverterDescriptor {
    name: String,
    source: TypeTag,
    target: TypeTag,
    priority: f64,
    lossy: bool,
    capability: Capability,
    convert: ConvertFn,
}

impl ConverterDescriptor {
    pub fn new<F>(name: impl Into<String>, source: TypeTag, target: TypeTag, convert: F) -> Self
    where
        F: Fn(&ConvertService, &Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            source,
            target,
            priority: priority::NORMAL,
            lossy: false,
            capability: Box::new(|_, _| true),
            convert: Box::new(convert),
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn lossy(mut self) -> Self {
        self.lossy = true;
        self
    }

    /// Add a capability check. Checks accumulate; all must pass.
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ConvertService, &Value) -> bool + Send + Sync + 'static,
    {
        let previous = self.capability;
        self.capability = Box::new(move |service, value| {
            previous(service, value) && predicate(service, value)
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> TypeTag {
        self.source
    }

    pub fn target(&self) -> TypeTag {
        self.target
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    /// Whether this descriptor accepts `value` on its way to `target`.
    pub fn accepts(&self, service: &ConvertService, value: &Value, target: TypeTag) -> bool {
        value.is_instance(self.source)
            && self.target.is_assignable_to(target)
            && self.can_convert(service, value)
    }

    pub fn can_convert(&self, service: &ConvertService, value: &Value) -> bool {
        (self.capability)(service, value)
    }

    pub fn convert(&self, service: &ConvertService, value: &Value) -> Result<Value> {
        (self.convert)(service, value)
    }
}

impl fmt::Debug for ConverterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterDescriptor")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("priority", &self.priority)
            .field("lossy", &self.lossy)
            .finish_non_exhaustive()
    }
}

/// Collects descriptors; [`CatalogBuilder::build`] freezes them.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    descriptors: Vec<ConverterDescriptor>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, descriptor: ConverterDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn register_all(mut self, descriptors: impl IntoIterator<Item = ConverterDescriptor>) -> Self {
        self.descriptors.extend(descriptors);
        self
    }

    /// Register every converter this crate ships.
    pub fn with_builtin(self) -> Self {
        self.register_all(builtin::unwrappers())
            .register_all(builtin::roi_to_mask())
            .register_all(builtin::mask_to_roi())
            .register(composite::descriptor())
            .register(raster::descriptor())
    }

    /// Order by descending priority. The sort is stable, so equal priorities
    /// keep registration order.
    pub fn build(mut self) -> ConverterCatalog {
        self.descriptors
            .sort_by(|a, b| b.priority.total_cmp(&a.priority));
        debug!(converters = self.descriptors.len(), "converter catalog built");
        ConverterCatalog {
            descriptors: self.descriptors,
        }
    }
}

/// Immutable set of converters in match order.
#[derive(Debug)]
pub struct ConverterCatalog {
    descriptors: Vec<ConverterDescriptor>,
}

impl ConverterCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn builtin() -> Self {
        CatalogBuilder::new().with_builtin().build()
    }

    /// The process-wide built-in catalog, built on first use.
    pub fn global() -> Arc<ConverterCatalog> {
        static GLOBAL: OnceLock<Arc<ConverterCatalog>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::builtin())))
    }

    pub fn descriptors(&self) -> &[ConverterDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&ConverterDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(name: &'static str, priority: f64) -> ConverterDescriptor {
        ConverterDescriptor::new(name, TypeTag::Mask, TypeTag::Roi, |_, value| Ok(value.clone()))
            .with_priority(priority)
    }

    #[test]
    fn build_orders_by_priority_then_registration() {
        let catalog = ConverterCatalog::builder()
            .register(tagged("low", 5.0))
            .register(tagged("first_high", 10.0))
            .register(tagged("second_high", 10.0))
            .build();
        let names: Vec<_> = catalog.descriptors().iter().map(|d| d.name()).collect();
        assert_eq!(names, ["first_high", "second_high", "low"]);
    }

    #[test]
    fn capabilities_accumulate() {
        let service = ConvertService::with_catalog(Arc::new(ConverterCatalog::builder().build()));
        let value = Value::from(crate::legacy::Roi::rectangle(0.0, 0.0, 1.0, 1.0).into_ref());
        let descriptor = tagged("gated", 0.0).when(|_, _| true).when(|_, _| false);
        assert!(!descriptor.can_convert(&service, &value));
    }

    #[test]
    fn builtin_catalog_is_shared() {
        let a = ConverterCatalog::global();
        let b = ConverterCatalog::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.find("composite_to_shape_roi").is_some());
        assert!(a.find("mask_to_image_roi").unwrap().is_lossy());
        let priorities: Vec<_> = a.descriptors().iter().map(|d| d.priority()).collect();
        assert!(priorities.windows(2).all(|w| w[0] >= w[1]));
    }
}
