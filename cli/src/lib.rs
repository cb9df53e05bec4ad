use std::path::Path;

use roi_bridge::{
    BridgeError, ConvertService, ConverterCatalog, RoiRef, Scene, SceneItem, TypeTag, Value,
    io::{feature_collection, save_geojson},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Scene has no items")]
    EmptyScene,
    #[error("No item of the scene converted to a legacy roi")]
    NothingToExport,
}

/// Outcome of converting one scene item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ItemReport {
    pub name: String,
    pub source: TypeTag,
    pub target: TypeTag,
    /// Name of the converter that ran; `None` when the value passed through.
    pub converter: Option<String>,
    pub lossy: bool,
    pub output: Option<TypeTag>,
    pub error: Option<String>,
}

/// Summary of a whole scene run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct SceneReport {
    pub items: Vec<ItemReport>,
}

impl SceneReport {
    pub fn failures(&self) -> usize {
        self.items.iter().filter(|item| item.error.is_some()).count()
    }

    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One row of the catalog listing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub source: TypeTag,
    pub target: TypeTag,
    pub priority: f64,
    pub lossy: bool,
}

pub fn catalog_entries(catalog: &ConverterCatalog) -> Vec<CatalogEntry> {
    catalog
        .descriptors()
        .iter()
        .map(|d| CatalogEntry {
            name: d.name().to_string(),
            source: d.source(),
            target: d.target(),
            priority: d.priority(),
            lossy: d.is_lossy(),
        })
        .collect()
}

/// Converts every item of a scene, keeping going past failed items.
pub struct SceneRunner {
    scene: Scene,
    service: ConvertService,
}

impl SceneRunner {
    pub fn new(scene: Scene) -> Self {
        let service = ConvertService::from_options(&scene.options);
        Self { scene, service }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        Ok(Self::new(Scene::from_file(path)?))
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Run every item. Converted rois are returned alongside the report,
    /// keyed by item name.
    pub fn run(&self) -> Result<(SceneReport, Vec<(String, RoiRef)>), CliError> {
        if self.scene.items.is_empty() {
            return Err(CliError::EmptyScene);
        }
        let mut report = SceneReport::default();
        let mut rois = Vec::new();
        for item in &self.scene.items {
            let (entry, output) = self.run_item(item);
            match &entry.error {
                Some(error) => warn!("Item '{}' failed: {}", item.name, error),
                None => info!(
                    "Item '{}': {} -> {} via {}",
                    item.name,
                    entry.source,
                    entry.target,
                    entry.converter.as_deref().unwrap_or("pass-through")
                ),
            }
            if let Some(roi) = output.and_then(Value::into_roi) {
                rois.push((item.name.clone(), roi));
            }
            report.items.push(entry);
        }
        Ok((report, rois))
    }

    fn run_item(&self, item: &SceneItem) -> (ItemReport, Option<Value>) {
        let mut entry = ItemReport {
            name: item.name.clone(),
            source: TypeTag::Mask,
            target: item.target,
            converter: None,
            lossy: false,
            output: None,
            error: None,
        };
        let value = match item.build() {
            Ok(value) => value,
            Err(err) => {
                entry.error = Some(err.to_string());
                return (entry, None);
            }
        };
        entry.source = value.type_tag();
        if !value.is_instance(item.target) {
            if let Some(descriptor) = self.service.handler(&value, item.target) {
                entry.converter = Some(descriptor.name().to_string());
                entry.lossy = descriptor.is_lossy();
            }
        }
        match self.service.convert(&value, item.target) {
            Ok(converted) => {
                entry.output = Some(converted.type_tag());
                (entry, Some(converted))
            }
            Err(err) => {
                entry.error = Some(err.to_string());
                (entry, None)
            }
        }
    }
}

/// Write the converted rois as a GeoJSON feature collection.
pub fn export_rois<P: AsRef<Path>>(rois: &[(String, RoiRef)], path: P) -> Result<(), CliError> {
    if rois.is_empty() {
        return Err(CliError::NothingToExport);
    }
    let collection = feature_collection(rois.iter().map(|(name, roi)| (name.as_str(), roi)))?;
    save_geojson(&collection, path)?;
    Ok(())
}
