use geo::{Area, BooleanOps, BoundingRect, Contains, Translate};
use geo_types::{MultiPolygon, Point, Polygon};

use super::{Roi, RoiKind};
use crate::{
    error::Result,
    geometry::{ring_polygon, stroke_quads},
};

/// A boolean-composite legacy shape.
///
/// The outline is stored relative to the base corner `(x, y)`; callers
/// testing absolute coordinates go through [`ShapeRoi::contains_point`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRoi {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    shape: MultiPolygon<f64>,
}

impl ShapeRoi {
    /// Build from an outline in absolute coordinates.
    pub fn new(absolute: MultiPolygon<f64>) -> Self {
        match absolute.bounding_rect() {
            Some(rect) => {
                let min = rect.min();
                Self {
                    x: min.x,
                    y: min.y,
                    width: rect.width(),
                    height: rect.height(),
                    shape: absolute.translate(-min.x, -min.y),
                }
            }
            None => Self::empty(),
        }
    }

    pub fn empty() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            shape: MultiPolygon::new(vec![]),
        }
    }

    /// Outline any legacy roi.
    ///
    /// Zero-width lines and point sets have no area and give an empty shape;
    /// stroked lines become the union of one quad per segment.
    pub fn from_roi(roi: &Roi) -> Result<Self> {
        if let Some(shape) = roi.as_shape() {
            return Ok(shape.clone());
        }
        if let Some(image) = roi.as_image() {
            return Ok(image.to_shape());
        }
        let kind = roi.kind();
        let outline = match kind {
            RoiKind::Rectangle | RoiKind::Oval => vec![ring_polygon(&vector_ring(roi))],
            kind if kind.is_closed_polygon() => vec![ring_polygon(&vector_ring(roi))],
            kind if kind.is_line() => {
                let width = roi.stroke_width() as f64;
                if width > 1.0 {
                    stroke_quads(&roi.vertices(), width)
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        };
        Ok(Self::new(union_all(outline)))
    }

    pub fn x_base(&self) -> f64 {
        self.x
    }

    pub fn y_base(&self) -> f64 {
        self.y
    }

    pub fn float_width(&self) -> f64 {
        self.width
    }

    pub fn float_height(&self) -> f64 {
        self.height
    }

    /// The outline relative to the base corner.
    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    pub fn to_absolute(&self) -> MultiPolygon<f64> {
        self.shape.translate(self.x, self.y)
    }

    pub fn is_empty(&self) -> bool {
        self.shape.0.is_empty()
    }

    pub fn area(&self) -> f64 {
        self.shape.unsigned_area()
    }

    pub fn contains_relative(&self, x: f64, y: f64) -> bool {
        self.shape.contains(&Point::new(x, y))
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.contains_relative(x - self.x, y - self.y)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    pub fn and(&self, other: &ShapeRoi) -> ShapeRoi {
        Self::new(self.to_absolute().intersection(&other.to_absolute()))
    }

    pub fn or(&self, other: &ShapeRoi) -> ShapeRoi {
        Self::new(self.to_absolute().union(&other.to_absolute()))
    }

    pub fn xor(&self, other: &ShapeRoi) -> ShapeRoi {
        Self::new(self.to_absolute().xor(&other.to_absolute()))
    }

    /// Difference: the parts of `self` outside `other`.
    pub fn not(&self, other: &ShapeRoi) -> ShapeRoi {
        Self::new(self.to_absolute().difference(&other.to_absolute()))
    }
}

fn vector_ring(roi: &Roi) -> Vec<[f64; 2]> {
    roi.float_polygon()
        .iter()
        .map(|&[x, y]| [x as f64, y as f64])
        .collect()
}

fn union_all(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    let mut iter = polygons.into_iter();
    let Some(first) = iter.next() else {
        return MultiPolygon::new(vec![]);
    };
    iter.fold(MultiPolygon::new(vec![first]), |acc, polygon| {
        acc.union(&MultiPolygon::new(vec![polygon]))
    })
}
