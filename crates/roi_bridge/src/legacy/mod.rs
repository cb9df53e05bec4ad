//! The legacy 2-D shape model.
//!
//! A [`Roi`] is a kind tag plus geometry consistent with that kind, shared
//! through [`RoiRef`]. Vertex coordinates are `f32`, as in the model this
//! mirrors, so edits made through a roi may lose precision.

pub mod raster;
pub mod shape;

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString};

use crate::{
    error::{BridgeError, Result},
    geometry::{
        ellipse_ring, narrow, polygon_contains, rectangle_ring, vertex_bounds, widen, within_stroke,
    },
    types::TypeTag,
    wrap::{SyncState, mask_roi::MaskBinding},
};

pub use raster::ImageRoi;
pub use shape::ShapeRoi;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoiKind {
    Rectangle,
    Oval,
    Polygon,
    FreehandPolygon,
    TracedPolygon,
    Line,
    Polyline,
    Freeline,
    Angle,
    Point,
    Composite,
    Image,
}

impl RoiKind {
    /// Kinds stored as an editable vertex list.
    pub fn is_polygon_family(self) -> bool {
        matches!(
            self,
            Self::Polygon
                | Self::FreehandPolygon
                | Self::TracedPolygon
                | Self::Polyline
                | Self::Freeline
                | Self::Angle
        )
    }

    pub fn is_line(self) -> bool {
        matches!(self, Self::Line | Self::Polyline | Self::Freeline | Self::Angle)
    }

    pub fn is_closed_polygon(self) -> bool {
        matches!(self, Self::Polygon | Self::FreehandPolygon | Self::TracedPolygon)
    }

    pub fn type_tag(self) -> TypeTag {
        match self {
            Self::Rectangle => TypeTag::Roi,
            Self::Oval => TypeTag::OvalRoi,
            Self::Line => TypeTag::LineRoi,
            Self::Point => TypeTag::PointRoi,
            Self::Composite => TypeTag::ShapeRoi,
            Self::Image => TypeTag::ImageRoi,
            Self::Polygon
            | Self::FreehandPolygon
            | Self::TracedPolygon
            | Self::Polyline
            | Self::Freeline
            | Self::Angle => TypeTag::PolygonRoi,
        }
    }
}

/// An image window a roi can be shown in. Handle removal needs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Display {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Rc<Self> {
        Rc::new(Self {
            title: title.into(),
            width,
            height,
        })
    }
}

/// Integer pixel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone)]
enum Geometry {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
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
    },
    Vertices {
        points: Vec<[f32; 2]>,
        // refreshed by adds and moves only
        cached: CachedBounds,
    },
    Shape(ShapeRoi),
    Image(ImageRoi),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct CachedBounds {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl CachedBounds {
    fn of(points: &[[f32; 2]]) -> Self {
        let Some((min, max)) = vertex_bounds(&widen(points)) else {
            return Self::default();
        };
        Self {
            x: min[0],
            y: min[1],
            width: max[0] - min[0],
            height: max[1] - min[1],
        }
    }
}

/// A legacy region of interest.
#[derive(Debug)]
pub struct Roi {
    kind: RoiKind,
    geometry: Geometry,
    stroke_width: f32,
    spline_fit: bool,
    display: Option<Rc<Display>>,
    pub(crate) binding: Option<MaskBinding>,
}

impl Roi {
    fn with_geometry(kind: RoiKind, geometry: Geometry) -> Self {
        Self {
            kind,
            geometry,
            stroke_width: 0.0,
            spline_fit: false,
            display: None,
            binding: None,
        }
    }

    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::rounded_rectangle(x, y, width, height, 0.0)
    }

    pub fn rounded_rectangle(x: f64, y: f64, width: f64, height: f64, corner_diameter: f64) -> Self {
        let (x, width) = normalize_span(x, width);
        let (y, height) = normalize_span(y, height);
        Self::with_geometry(
            RoiKind::Rectangle,
            Geometry::Rect {
                x,
                y,
                width,
                height,
                corner_diameter: corner_diameter.max(0.0),
            },
        )
    }

    pub fn oval(x: f64, y: f64, width: f64, height: f64) -> Self {
        let (x, width) = normalize_span(x, width);
        let (y, height) = normalize_span(y, height);
        Self::with_geometry(RoiKind::Oval, Geometry::Oval { x, y, width, height })
    }

    pub fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::with_geometry(RoiKind::Line, Geometry::Line { x1, y1, x2, y2 })
    }

    /// A vertex-list roi of a polygon-family kind.
    pub fn polygon(kind: RoiKind, points: Vec<[f32; 2]>) -> Result<Self> {
        if !kind.is_polygon_family() {
            return Err(BridgeError::illegal(format!("{kind} is not a polygon kind")));
        }
        if kind == RoiKind::Angle && points.len() != 3 {
            return Err(BridgeError::illegal(format!(
                "an angle has exactly 3 vertices, got {}",
                points.len()
            )));
        }
        let cached = CachedBounds::of(&points);
        Ok(Self::with_geometry(kind, Geometry::Vertices { points, cached }))
    }

    pub fn points(points: Vec<[f32; 2]>) -> Self {
        let cached = CachedBounds::of(&points);
        Self::with_geometry(RoiKind::Point, Geometry::Vertices { points, cached })
    }

    pub fn shape(shape: ShapeRoi) -> Self {
        Self::with_geometry(RoiKind::Composite, Geometry::Shape(shape))
    }

    pub fn image(image: ImageRoi) -> Self {
        Self::with_geometry(RoiKind::Image, Geometry::Image(image))
    }

    pub fn with_stroke_width(mut self, width: f32) -> Self {
        self.stroke_width = width.max(0.0);
        self
    }

    /// Mark a polygon-family roi as spline fitted. Other kinds ignore it.
    pub fn spline_fitted(mut self) -> Self {
        self.spline_fit = self.kind.is_polygon_family();
        self
    }

    pub fn into_ref(self) -> RoiRef {
        RoiRef::new(self)
    }

    pub fn kind(&self) -> RoiKind {
        self.kind
    }

    pub fn type_tag(&self) -> TypeTag {
        self.kind.type_tag()
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    pub fn is_spline_fit(&self) -> bool {
        self.spline_fit
    }

    pub fn corner_diameter(&self) -> f64 {
        match self.geometry {
            Geometry::Rect { corner_diameter, .. } => corner_diameter,
            _ => 0.0,
        }
    }

    pub fn display(&self) -> Option<&Rc<Display>> {
        self.display.as_ref()
    }

    pub fn attach(&mut self, display: Rc<Display>) {
        self.display = Some(display);
    }

    /// Whether this roi is a live view of a mask.
    pub fn is_mask_wrapper(&self) -> bool {
        self.binding.is_some()
    }

    fn frame(&self) -> (f64, f64, f64, f64) {
        match &self.geometry {
            Geometry::Rect {
                x, y, width, height, ..
            }
            | Geometry::Oval { x, y, width, height } => (*x, *y, *width, *height),
            Geometry::Line { x1, y1, x2, y2 } => {
                (x1.min(*x2), y1.min(*y2), (x2 - x1).abs(), (y2 - y1).abs())
            }
            Geometry::Vertices { cached, .. } => (cached.x, cached.y, cached.width, cached.height),
            Geometry::Shape(shape) => (
                shape.x_base(),
                shape.y_base(),
                shape.float_width(),
                shape.float_height(),
            ),
            Geometry::Image(image) => (
                image.x_base() as f64,
                image.y_base() as f64,
                image.width() as f64,
                image.height() as f64,
            ),
        }
    }

    pub fn x_base(&self) -> f64 {
        self.frame().0
    }

    pub fn y_base(&self) -> f64 {
        self.frame().1
    }

    pub fn float_width(&self) -> f64 {
        self.frame().2
    }

    pub fn float_height(&self) -> f64 {
        self.frame().3
    }

    pub fn bounds(&self) -> IntRect {
        let (x, y, width, height) = self.frame();
        let (x0, y0) = (x.floor(), y.floor());
        IntRect {
            x: x0 as i32,
            y: y0 as i32,
            width: ((x + width).ceil() - x0) as i32,
            height: ((y + height).ceil() - y0) as i32,
        }
    }

    /// Outline vertices in absolute coordinates.
    pub fn float_polygon(&self) -> Vec<[f32; 2]> {
        match &self.geometry {
            Geometry::Rect {
                x,
                y,
                width,
                height,
                corner_diameter,
            } => narrow(&rectangle_ring(*x, *y, *width, *height, *corner_diameter)),
            Geometry::Oval { x, y, width, height } => {
                narrow(&ellipse_ring(*x, *y, *width, *height))
            }
            Geometry::Line { x1, y1, x2, y2 } => {
                vec![[*x1 as f32, *y1 as f32], [*x2 as f32, *y2 as f32]]
            }
            Geometry::Vertices { points, .. } => points.clone(),
            Geometry::Shape(shape) => shape
                .to_absolute()
                .0
                .iter()
                .flat_map(|polygon| {
                    polygon
                        .exterior()
                        .coords()
                        .map(|c| [c.x as f32, c.y as f32])
                        .collect::<Vec<_>>()
                })
                .collect(),
            Geometry::Image(image) => {
                let (x, y) = (image.x_base() as f32, image.y_base() as f32);
                let (w, h) = (image.width() as f32, image.height() as f32);
                vec![[x, y], [x + w, y], [x + w, y + h], [x, y + h]]
            }
        }
    }

    /// Vertex list of line and polygon-family kinds, in `f64`.
    pub fn vertices(&self) -> Vec<[f64; 2]> {
        match &self.geometry {
            Geometry::Vertices { points, .. } => widen(points),
            Geometry::Line { x1, y1, x2, y2 } => vec![[*x1, *y1], [*x2, *y2]],
            _ => Vec::new(),
        }
    }

    pub fn n_coordinates(&self) -> usize {
        match &self.geometry {
            Geometry::Vertices { points, .. } => points.len(),
            Geometry::Line { .. } => 2,
            _ => self.float_polygon().len(),
        }
    }

    pub fn line_endpoints(&self) -> Option<([f64; 2], [f64; 2])> {
        match self.geometry {
            Geometry::Line { x1, y1, x2, y2 } => Some(([x1, y1], [x2, y2])),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&ShapeRoi> {
        match &self.geometry {
            Geometry::Shape(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageRoi> {
        match &self.geometry {
            Geometry::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Pixel test: vector kinds sample the pixel centre, raster kinds look
    /// the pixel up directly.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        match &self.geometry {
            Geometry::Image(image) => image.contains(x, y),
            Geometry::Vertices { points, .. } if self.kind == RoiKind::Point => points
                .iter()
                .any(|&[px, py]| px.floor() as i32 == x && py.floor() as i32 == y),
            _ => self.contains_point(x as f64 + 0.5, y as f64 + 0.5),
        }
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let stroke = self.stroke_width as f64;
        match &self.geometry {
            Geometry::Rect {
                x: rx,
                y: ry,
                width,
                height,
                corner_diameter,
            } => {
                if *corner_diameter > 0.0 {
                    polygon_contains(&rectangle_ring(*rx, *ry, *width, *height, *corner_diameter), x, y)
                } else {
                    x >= *rx && x < rx + width && y >= *ry && y < ry + height
                }
            }
            Geometry::Oval {
                x: ox,
                y: oy,
                width,
                height,
            } => {
                let (rx, ry) = (width / 2.0, height / 2.0);
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (x - (ox + rx)) / rx;
                let dy = (y - (oy + ry)) / ry;
                dx * dx + dy * dy <= 1.0
            }
            Geometry::Line { x1, y1, x2, y2 } => {
                stroke > 1.0 && within_stroke([*x1, *y1], [*x2, *y2], [x, y], stroke)
            }
            Geometry::Vertices { points, .. } => match self.kind {
                RoiKind::Point => points
                    .iter()
                    .any(|&[px, py]| px == x as f32 && py == y as f32),
                kind if kind.is_line() => {
                    stroke > 1.0
                        && widen(points)
                            .windows(2)
                            .any(|pair| within_stroke(pair[0], pair[1], [x, y], stroke))
                }
                _ => polygon_contains(&widen(points), x, y),
            },
            Geometry::Shape(shape) => shape.contains_point(x, y),
            Geometry::Image(image) => image.contains(x.floor() as i32, y.floor() as i32),
        }
    }

    pub fn set_location(&mut self, x: f64, y: f64) {
        let (x0, y0, _, _) = self.frame();
        self.translate(x - x0, y - y0);
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        match &mut self.geometry {
            Geometry::Rect { x, y, .. } | Geometry::Oval { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            Geometry::Line { x1, y1, x2, y2 } => {
                *x1 += dx;
                *y1 += dy;
                *x2 += dx;
                *y2 += dy;
            }
            Geometry::Vertices { points, cached } => {
                for point in points.iter_mut() {
                    point[0] += dx as f32;
                    point[1] += dy as f32;
                }
                cached.x += dx;
                cached.y += dy;
            }
            Geometry::Shape(shape) => shape.translate(dx, dy),
            Geometry::Image(image) => {
                let (x, y) = (image.x_base(), image.y_base());
                image.set_location(x + dx.round() as i32, y + dy.round() as i32);
            }
        }
        self.mark_edited();
    }

    /// Resize a rectangle or oval, keeping its base corner.
    pub fn set_size(&mut self, new_width: f64, new_height: f64) -> Result<()> {
        match &mut self.geometry {
            Geometry::Rect { width, height, .. } | Geometry::Oval { width, height, .. } => {
                *width = new_width.max(0.0);
                *height = new_height.max(0.0);
            }
            _ => {
                return Err(BridgeError::unsupported(format!(
                    "set_size on {} roi",
                    self.kind
                )));
            }
        }
        self.mark_edited();
        Ok(())
    }

    pub fn add_point(&mut self, x: f64, y: f64) -> Result<()> {
        match &mut self.geometry {
            Geometry::Vertices { points, cached } if self.kind != RoiKind::Angle => {
                points.push([x as f32, y as f32]);
                *cached = CachedBounds::of(points);
            }
            _ => {
                return Err(BridgeError::unsupported(format!(
                    "add_point on {} roi",
                    self.kind
                )));
            }
        }
        self.mark_edited();
        Ok(())
    }

    pub fn move_vertex(&mut self, index: usize, x: f64, y: f64) -> Result<()> {
        match &mut self.geometry {
            Geometry::Vertices { points, cached } => {
                let count = points.len();
                let point = points.get_mut(index).ok_or_else(|| {
                    BridgeError::illegal(format!("vertex {index} out of range for {count} vertices"))
                })?;
                *point = [x as f32, y as f32];
                *cached = CachedBounds::of(points);
            }
            Geometry::Line { x1, y1, x2, y2 } => match index {
                0 => (*x1, *y1) = (x, y),
                1 => (*x2, *y2) = (x, y),
                _ => {
                    return Err(BridgeError::illegal(format!(
                        "a line has 2 endpoints, got index {index}"
                    )));
                }
            },
            _ => {
                return Err(BridgeError::unsupported(format!(
                    "move_vertex on {} roi",
                    self.kind
                )));
            }
        }
        self.mark_edited();
        Ok(())
    }

    /// Remove the vertex nearest to `(x, y)`. Needs an attached display.
    pub fn delete_handle(&mut self, x: f64, y: f64) -> Result<()> {
        let kind = self.kind;
        if self.display.is_none() {
            return Err(BridgeError::unsupported(format!(
                "delete_handle on a {kind} roi that is not shown in a display"
            )));
        }
        let Geometry::Vertices { points, cached } = &mut self.geometry else {
            return Err(BridgeError::unsupported(format!("delete_handle on {kind} roi")));
        };
        let distance = |p: &[f32; 2]| (p[0] as f64 - x).powi(2) + (p[1] as f64 - y).powi(2);
        let nearest = points
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| distance(*a).total_cmp(&distance(*b)))
            .map(|(index, _)| index);
        if let Some(index) = nearest {
            points.remove(index);
            *cached = CachedBounds::of(points);
        }
        self.mark_edited();
        Ok(())
    }

    fn mark_edited(&mut self) {
        if let Some(binding) = self.binding.as_mut() {
            binding.state = SyncState::Unsynchronized;
        }
    }
}

fn normalize_span(origin: f64, extent: f64) -> (f64, f64) {
    if extent < 0.0 {
        (origin + extent, -extent)
    } else {
        (origin, extent)
    }
}

/// Shared handle to a [`Roi`]. Clones alias the same roi.
#[derive(Clone)]
pub struct RoiRef(Rc<RefCell<Roi>>);

impl RoiRef {
    pub fn new(roi: Roi) -> Self {
        Self(Rc::new(RefCell::new(roi)))
    }

    pub fn borrow(&self) -> Ref<'_, Roi> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Roi> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &RoiRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn kind(&self) -> RoiKind {
        self.0.borrow().kind()
    }

    pub fn type_tag(&self) -> TypeTag {
        self.0.borrow().type_tag()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.0.borrow().contains(x, y)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.0.borrow().contains_point(x, y)
    }
}

impl From<Roi> for RoiRef {
    fn from(roi: Roi) -> Self {
        Self::new(roi)
    }
}

impl fmt::Debug for RoiRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(roi) => f.debug_tuple("RoiRef").field(&*roi).finish(),
            Err(_) => f.write_str("RoiRef(<borrowed>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_is_half_open() {
        let roi = Roi::rectangle(10.0, 20.0, 5.0, 5.0);
        assert!(roi.contains_point(10.0, 20.0));
        assert!(!roi.contains_point(15.0, 22.0));
        assert!(roi.contains(14, 24));
        assert!(!roi.contains(15, 24));
    }

    #[test]
    fn negative_extent_is_normalized() {
        let roi = Roi::oval(10.0, 10.0, -4.0, 6.0);
        assert_eq!(roi.x_base(), 6.0);
        assert_eq!(roi.float_width(), 4.0);
    }

    #[test]
    fn angle_needs_three_vertices() {
        let err = Roi::polygon(RoiKind::Angle, vec![[0.0, 0.0], [1.0, 1.0]]).unwrap_err();
        assert!(err.is_illegal_argument());
        assert!(Roi::polygon(RoiKind::Point, vec![]).is_err());
    }

    #[test]
    fn delete_handle_needs_display_and_refreshes_bounds() {
        let mut roi = Roi::polygon(
            RoiKind::Polygon,
            vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [30.0, 5.0]],
        )
        .unwrap();
        assert!(roi.delete_handle(30.0, 5.0).unwrap_err().is_unsupported());

        roi.attach(Display::new("image", 64, 64));
        roi.delete_handle(29.0, 5.0).unwrap();
        assert_eq!(roi.n_coordinates(), 4);
        assert_eq!(roi.float_width(), 10.0);
        assert!(!roi.contains_point(20.0, 5.0));
    }

    #[test]
    fn stroked_line_contains_nearby_points() {
        let thin = Roi::line(0.0, 0.0, 10.0, 0.0);
        assert!(!thin.contains_point(5.0, 0.0));
        let thick = Roi::line(0.0, 0.0, 10.0, 0.0).with_stroke_width(4.0);
        assert!(thick.contains_point(5.0, 1.5));
        assert!(!thick.contains_point(5.0, 2.5));
    }

    #[test]
    fn ref_clones_share_identity() {
        let roi = Roi::points(vec![[1.0, 2.0]]).into_ref();
        let alias = roi.clone();
        alias.borrow_mut().add_point(3.0, 4.0).unwrap();
        assert!(roi.ptr_eq(&alias));
        assert_eq!(roi.borrow().n_coordinates(), 2);
        assert!(roi.contains_point(3.0, 4.0));
        assert!(!roi.ptr_eq(&Roi::points(vec![]).into_ref()));
    }
}
