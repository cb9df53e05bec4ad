use std::path::Path;

use geo::Area;
use geo_types::MultiPolygon;
use geojson::{Feature, FeatureCollection, Geometry, feature::Id};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    legacy::{Roi, RoiKind, RoiRef},
    types::TypeTag,
};

/// Properties attached to every exported roi feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoiFeatureProperties {
    pub name: String,
    pub kind: RoiKind,
    pub type_tag: TypeTag,
    pub stroke_width: f32,
    /// Enclosed area; zero for line and point kinds.
    pub area: f64,
}

impl RoiFeatureProperties {
    pub fn of(name: impl Into<String>, roi: &Roi) -> Self {
        let kind = roi.kind();
        Self {
            name: name.into(),
            kind,
            type_tag: roi.type_tag(),
            stroke_width: roi.stroke_width(),
            area: if kind.is_line() || kind == RoiKind::Point {
                0.0
            } else {
                region(roi).unsigned_area()
            },
        }
    }
}

fn closed(mut ring: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    if let Some(first) = ring.first().filter(|first| ring.last() != Some(*first)).cloned() {
        ring.push(first);
    }
    ring
}

fn position([x, y]: [f64; 2]) -> Vec<f64> {
    vec![x, y]
}

fn region(roi: &Roi) -> MultiPolygon<f64> {
    if let Some(shape) = roi.as_shape() {
        return shape.to_absolute();
    }
    if let Some(image) = roi.as_image() {
        return image.to_shape().to_absolute();
    }
    let ring: Vec<(f64, f64)> = roi
        .float_polygon()
        .iter()
        .map(|&[x, y]| (x as f64, y as f64))
        .collect();
    MultiPolygon::new(vec![geo_types::Polygon::new(ring.into(), vec![])])
}

fn multi_polygon(shape: &MultiPolygon<f64>) -> geojson::Value {
    geojson::Value::MultiPolygon(
        shape
            .0
            .iter()
            .map(|polygon| {
                std::iter::once(polygon.exterior())
                    .chain(polygon.interiors())
                    .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect())
                    .collect()
            })
            .collect(),
    )
}

/// GeoJSON geometry of a roi in absolute coordinates.
///
/// Returns `None` for rois without any coordinates.
pub fn roi_geometry(roi: &Roi) -> Option<Geometry> {
    let kind = roi.kind();
    let value = match kind {
        RoiKind::Point => geojson::Value::MultiPoint(
            roi.vertices().into_iter().map(position).collect(),
        ),
        _ if kind.is_line() => geojson::Value::LineString(
            roi.vertices().into_iter().map(position).collect(),
        ),
        RoiKind::Composite | RoiKind::Image => multi_polygon(&region(roi)),
        _ => geojson::Value::Polygon(vec![closed(
            roi.float_polygon()
                .iter()
                .map(|&[x, y]| vec![x as f64, y as f64])
                .collect(),
        )]),
    };
    let empty = match &value {
        geojson::Value::MultiPoint(points) | geojson::Value::LineString(points) => points.is_empty(),
        geojson::Value::Polygon(rings) => rings.iter().all(|ring| ring.is_empty()),
        geojson::Value::MultiPolygon(polygons) => polygons.is_empty(),
        _ => false,
    };
    (!empty).then(|| Geometry::new(value))
}

/// One feature per roi, numbered by `id`.
pub fn roi_feature(id: usize, name: &str, roi: &RoiRef) -> Result<Feature> {
    let roi = roi.borrow();
    let properties = serde_json::to_value(RoiFeatureProperties::of(name, &roi))?;
    Ok(Feature {
        bbox: None,
        geometry: roi_geometry(&roi),
        id: Some(Id::Number(id.into())),
        properties: properties.as_object().cloned(),
        foreign_members: None,
    })
}

pub fn feature_collection<'a, I>(rois: I) -> Result<FeatureCollection>
where
    I: IntoIterator<Item = (&'a str, &'a RoiRef)>,
{
    let features = rois
        .into_iter()
        .enumerate()
        .map(|(id, (name, roi))| roi_feature(id, name, roi))
        .collect::<Result<Vec<_>>>()?;
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

pub fn to_geojson_string(collection: &FeatureCollection) -> Result<String> {
    Ok(serde_json::to_string_pretty(collection)?)
}

pub fn save_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    std::fs::write(path, to_geojson_string(collection)?)?;
    Ok(())
}
