//! Conversion options and declarative scenes.
//!
//! A scene lists masks and rois together with the type each should be
//! converted to. Scenes load from TOML or JSON:
//!
//! ```toml
//! [options]
//! raster_fallback = true
//!
//! [[items]]
//! name = "overlap"
//! target = "roi"
//! [items.mask]
//! type = "and"
//! operands = [
//!     { type = "box", min = [0.0, 0.0], max = [10.0, 10.0] },
//!     { type = "sphere", center = [10.0, 10.0], radius = 4.0 },
//! ]
//! ```

use std::{fs, path::Path};

use schemars::{JsonSchema, schema::RootSchema, schema_for};
use serde::{Deserialize, Serialize};

use crate::{
    convert::Value,
    error::{BridgeError, Result},
    geometry::RealInterval,
    legacy::{Roi, RoiKind, RoiRef},
    mask::{
        AffineTransform2D, BoxMask, EllipsoidMask, LineMask, MaskOperator, MaskRef,
        PointCollection, PointMask, PolygonMask, PolylineMask, PredicateMask,
    },
    types::TypeTag,
};

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConvertOptions {
    /// Allow the lossy raster fallback when nothing structural applies.
    #[serde(default = "enabled")]
    pub raster_fallback: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            raster_fallback: true,
        }
    }
}

/// A mask, described by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaskSpec {
    Box {
        min: Vec<f64>,
        max: Vec<f64>,
    },
    Ellipsoid {
        center: Vec<f64>,
        semi_axes: Vec<f64>,
    },
    Sphere {
        center: Vec<f64>,
        radius: f64,
    },
    Line {
        one: Vec<f64>,
        two: Vec<f64>,
    },
    Point {
        position: Vec<f64>,
    },
    Points {
        #[serde(default = "planar")]
        dims: usize,
        positions: Vec<Vec<f64>>,
    },
    Polygon {
        vertices: Vec<[f64; 2]>,
    },
    Polyline {
        vertices: Vec<[f64; 2]>,
    },
    /// Integer grid points whose coordinates sum to an even number.
    Checkerboard {
        min: [f64; 2],
        max: [f64; 2],
    },
    And {
        operands: Vec<MaskSpec>,
    },
    Or {
        operands: Vec<MaskSpec>,
    },
    Xor {
        operands: Vec<MaskSpec>,
    },
    Minus {
        operands: Vec<MaskSpec>,
    },
    Negate {
        operand: Box<MaskSpec>,
    },
    /// Rotation by `degrees` about `center`.
    Rotate {
        operand: Box<MaskSpec>,
        degrees: f64,
        #[serde(default)]
        center: [f64; 2],
    },
}

fn planar() -> usize {
    2
}

fn combine(operator: MaskOperator, operands: &[MaskSpec]) -> Result<MaskRef> {
    let operands = operands
        .iter()
        .map(MaskSpec::build)
        .collect::<Result<Vec<_>>>()?;
    MaskRef::combine(operator, operands)
}

impl MaskSpec {
    pub fn build(&self) -> Result<MaskRef> {
        Ok(match self {
            Self::Box { min, max } => BoxMask::new(min.clone(), max.clone())?.into(),
            Self::Ellipsoid { center, semi_axes } => {
                EllipsoidMask::new(center.clone(), semi_axes.clone())?.into()
            }
            Self::Sphere { center, radius } => EllipsoidMask::sphere(center.clone(), *radius)?.into(),
            Self::Line { one, two } => LineMask::new(one.clone(), two.clone())?.into(),
            Self::Point { position } => PointMask::new(position.clone())?.into(),
            Self::Points { dims, positions } => PointCollection::new(*dims, positions.clone())?.into(),
            Self::Polygon { vertices } => PolygonMask::new(vertices.clone()).into(),
            Self::Polyline { vertices } => PolylineMask::new(vertices.clone()).into(),
            Self::Checkerboard { min, max } => {
                let bounds = RealInterval::new(min.to_vec(), max.to_vec())?;
                PredicateMask::new(bounds, |p| {
                    p.iter().all(|c| c.fract() == 0.0) && (p[0] + p[1]).rem_euclid(2.0) == 0.0
                })
                .into()
            }
            Self::And { operands } => combine(MaskOperator::And, operands)?,
            Self::Or { operands } => combine(MaskOperator::Or, operands)?,
            Self::Xor { operands } => combine(MaskOperator::Xor, operands)?,
            Self::Minus { operands } => combine(MaskOperator::Minus, operands)?,
            Self::Negate { operand } => operand.build()?.negate()?,
            Self::Rotate {
                operand,
                degrees,
                center,
            } => operand.build()?.transform(AffineTransform2D::rotation(
                degrees.to_radians(),
                center[0],
                center[1],
            ))?,
        })
    }
}

fn polygon_kind() -> RoiKind {
    RoiKind::Polygon
}

/// A legacy roi, described by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RoiSpec {
    Rectangle {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        #[serde(default)]
        corner_diameter: f64,
    },
    Oval {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        #[serde(default)]
        stroke_width: f32,
    },
    Polygon {
        #[serde(default = "polygon_kind")]
        kind: RoiKind,
        vertices: Vec<[f32; 2]>,
        #[serde(default)]
        stroke_width: f32,
        #[serde(default)]
        spline_fit: bool,
    },
    Points {
        points: Vec<[f32; 2]>,
    },
}

impl RoiSpec {
    pub fn build(&self) -> Result<RoiRef> {
        let roi = match self {
            Self::Rectangle {
                x,
                y,
                width,
                height,
                corner_diameter,
            } => Roi::rounded_rectangle(*x, *y, *width, *height, *corner_diameter),
            Self::Oval { x, y, width, height } => Roi::oval(*x, *y, *width, *height),
            Self::Line {
                x1,
                y1,
                x2,
                y2,
                stroke_width,
            } => Roi::line(*x1, *y1, *x2, *y2).with_stroke_width(*stroke_width),
            Self::Polygon {
                kind,
                vertices,
                stroke_width,
                spline_fit,
            } => {
                let roi = Roi::polygon(*kind, vertices.clone())?.with_stroke_width(*stroke_width);
                if *spline_fit { roi.spline_fitted() } else { roi }
            }
            Self::Points { points } => Roi::points(points.clone()),
        };
        Ok(roi.into_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SceneSource {
    Mask(MaskSpec),
    Roi(RoiSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneItem {
    pub name: String,
    pub description: Option<String>,
    /// Type to convert the source to.
    pub target: TypeTag,
    /// Hand the mask over behind a read-only handle.
    #[serde(default)]
    pub read_only: bool,
    #[serde(flatten)]
    pub source: SceneSource,
}

impl SceneItem {
    pub fn build(&self) -> Result<Value> {
        Ok(match &self.source {
            SceneSource::Mask(spec) => {
                let mask = spec.build()?;
                Value::Mask(if self.read_only { mask.read_only() } else { mask })
            }
            SceneSource::Roi(spec) => Value::Roi(spec.build()?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    #[serde(default)]
    pub options: ConvertOptions,
    #[serde(default)]
    pub items: Vec<SceneItem>,
}

impl Scene {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a scene, picking the format from the file extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path)?),
            Some("json") => Self::from_json(&fs::read_to_string(path)?),
            _ => Err(BridgeError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn json_schema() -> RootSchema {
        schema_for!(Scene)
    }
}
