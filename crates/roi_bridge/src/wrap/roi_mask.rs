use tracing::warn;

use crate::{
    error::{BridgeError, Result},
    geometry::{
        RealInterval, check_dimension, check_point, line_contains, polygon_contains, vertex_bounds,
        within_stroke,
    },
    legacy::{Roi, RoiKind, RoiRef},
    traits::Wrapper,
    types::TypeTag,
    wrap::SyncState,
};

/// How a [`RoiMask`] reads its roi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RoiFace {
    /// Rectangle as a half-open box.
    Box,
    /// Oval as a closed ellipse.
    Ellipsoid,
    Line,
    Polygon,
    /// Freehand or traced polygon; no vertex edits.
    UnmodifiablePolygon,
    Polyline,
    /// Freeline or angle; no vertex edits.
    UnmodifiablePolyline,
    /// Polyline with a stroke: inside within half the width of a segment.
    IrregularPolyline,
    Points,
    /// Composite shape, tested relative to its base corner.
    Shape,
    /// Any roi, through its integer pixel test.
    Pixel,
}

impl RoiFace {
    pub fn is_writable(self) -> bool {
        matches!(
            self,
            Self::Box | Self::Ellipsoid | Self::Polygon | Self::Polyline | Self::Points
        )
    }

    pub fn type_tag(self) -> TypeTag {
        match self {
            Self::Box => TypeTag::WritableBox,
            Self::Ellipsoid => TypeTag::WritableEllipsoid,
            Self::Line => TypeTag::LineMask,
            Self::Polygon => TypeTag::WritablePolygon2D,
            Self::UnmodifiablePolygon => TypeTag::Polygon2D,
            Self::Polyline => TypeTag::WritablePolyline,
            Self::UnmodifiablePolyline => TypeTag::Polyline,
            Self::Points => TypeTag::WritablePointCollection,
            Self::IrregularPolyline | Self::Shape | Self::Pixel => TypeTag::Mask,
        }
    }

    /// Whether `roi` can be read through this face.
    pub fn accepts(self, roi: &Roi) -> bool {
        let kind = roi.kind();
        let plain = !roi.is_spline_fit();
        let thin = roi.stroke_width() == 0.0;
        match self {
            Self::Box => kind == RoiKind::Rectangle && roi.corner_diameter() == 0.0,
            Self::Ellipsoid => kind == RoiKind::Oval,
            Self::Line => kind == RoiKind::Line,
            Self::Polygon => kind == RoiKind::Polygon && plain,
            Self::UnmodifiablePolygon => {
                matches!(kind, RoiKind::FreehandPolygon | RoiKind::TracedPolygon) && plain
            }
            Self::Polyline => kind == RoiKind::Polyline && thin && plain,
            Self::UnmodifiablePolyline => {
                matches!(kind, RoiKind::Freeline | RoiKind::Angle) && thin && plain
            }
            Self::IrregularPolyline => kind.is_line() && kind.is_polygon_family(),
            Self::Points => kind == RoiKind::Point,
            Self::Shape => kind == RoiKind::Composite,
            Self::Pixel => true,
        }
    }

    fn requirement(self) -> &'static str {
        match self {
            Self::Box => "a rectangle without rounded corners",
            Self::Ellipsoid => "an oval",
            Self::Line => "a straight line",
            Self::Polygon => "a polygon without spline fit",
            Self::UnmodifiablePolygon => "a freehand or traced polygon without spline fit",
            Self::Polyline => "a zero-width polyline without spline fit",
            Self::UnmodifiablePolyline => "a zero-width freeline or angle without spline fit",
            Self::IrregularPolyline => "a polyline",
            Self::Points => "a point roi",
            Self::Shape => "a composite shape",
            Self::Pixel => "any roi",
        }
    }

    fn has_vertex_list(self) -> bool {
        matches!(
            self,
            Self::Polygon
                | Self::UnmodifiablePolygon
                | Self::Polyline
                | Self::UnmodifiablePolyline
                | Self::IrregularPolyline
        )
    }
}

/// A legacy roi exposed through the mask contract. The roi is shared, not
/// copied, and stays the source of truth.
#[derive(Debug, Clone)]
pub struct RoiMask {
    roi: RoiRef,
    face: RoiFace,
}

impl RoiMask {
    /// View `roi` through `face`, failing when the roi's kind does not fit.
    pub fn new(roi: RoiRef, face: RoiFace) -> Result<Self> {
        let (kind, accepted, width) = {
            let r = roi.borrow();
            (r.kind(), face.accepts(&r), r.stroke_width())
        };
        if !accepted {
            return Err(BridgeError::illegal(format!(
                "cannot view a {kind} roi as {face}: expected {}",
                face.requirement()
            )));
        }
        if face == RoiFace::Line && width > 1.0 {
            warn!(stroke_width = width, "line width is ignored by the mask view");
        }
        Ok(Self { roi, face })
    }

    pub fn boxed(roi: RoiRef) -> Result<Self> {
        Self::new(roi, RoiFace::Box)
    }

    pub fn ellipsoid(roi: RoiRef) -> Result<Self> {
        Self::new(roi, RoiFace::Ellipsoid)
    }

    pub fn line(roi: RoiRef) -> Result<Self> {
        Self::new(roi, RoiFace::Line)
    }

    pub fn polygon(roi: RoiRef) -> Result<Self> {
        Self::new(roi, RoiFace::Polygon)
    }

    pub fn unmodifiable_polygon(roi: RoiRef) -> Result<Self> {
        Self::new(roi, RoiFace::UnmodifiablePolygon)
    }

    pub fn polyline(roi: RoiRef) -> Result<Self> {
        Self::new(roi, RoiFace::Polyline)
    }

    pub fn unmodifiable_polyline(roi: RoiRef) -> Result<Self> {
        Self::new(roi, RoiFace::UnmodifiablePolyline)
    }

    pub fn irregular_polyline(roi: RoiRef) -> Result<Self> {
        Self::new(roi, RoiFace::IrregularPolyline)
    }

    pub fn points(roi: RoiRef) -> Result<Self> {
        Self::new(roi, RoiFace::Points)
    }

    pub fn shape(roi: RoiRef) -> Result<Self> {
        Self::new(roi, RoiFace::Shape)
    }

    /// Any roi, tested pixel by pixel.
    pub fn pixel(roi: RoiRef) -> Self {
        Self {
            roi,
            face: RoiFace::Pixel,
        }
    }

    pub fn roi(&self) -> &RoiRef {
        &self.roi
    }

    pub fn face(&self) -> RoiFace {
        self.face
    }

    pub fn num_dimensions(&self) -> usize {
        2
    }

    pub fn type_tag(&self) -> TypeTag {
        self.face.type_tag()
    }

    pub fn test(&self, point: &[f64]) -> bool {
        let &[x, y] = point else {
            return false;
        };
        let roi = self.roi.borrow();
        match self.face {
            RoiFace::Box => {
                let (x0, y0) = (roi.x_base(), roi.y_base());
                x >= x0 && x < x0 + roi.float_width() && y >= y0 && y < y0 + roi.float_height()
            }
            RoiFace::Ellipsoid => {
                let (rx, ry) = (roi.float_width() / 2.0, roi.float_height() / 2.0);
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (x - (roi.x_base() + rx)) / rx;
                let dy = (y - (roi.y_base() + ry)) / ry;
                dx * dx + dy * dy <= 1.0
            }
            RoiFace::Line => roi
                .line_endpoints()
                .is_some_and(|(one, two)| line_contains(&one, &two, point)),
            RoiFace::Polygon | RoiFace::UnmodifiablePolygon => polygon_contains(&roi.vertices(), x, y),
            RoiFace::Polyline | RoiFace::UnmodifiablePolyline => roi
                .vertices()
                .windows(2)
                .any(|pair| line_contains(&pair[0], &pair[1], point)),
            RoiFace::IrregularPolyline => {
                let width = roi.stroke_width() as f64;
                roi.vertices()
                    .windows(2)
                    .any(|pair| within_stroke(pair[0], pair[1], [x, y], width))
            }
            RoiFace::Points => roi
                .vertices()
                .iter()
                .any(|p| p[0] as f32 == x as f32 && p[1] as f32 == y as f32),
            RoiFace::Shape => roi
                .as_shape()
                .is_some_and(|s| s.contains_relative(x - s.x_base(), y - s.y_base())),
            RoiFace::Pixel => roi.contains(x.floor() as i32, y.floor() as i32),
        }
    }

    /// Bounds of the current geometry. Vertex faces scan their vertices.
    pub fn bounds(&self) -> RealInterval {
        let roi = self.roi.borrow();
        let (x0, y0) = (roi.x_base(), roi.y_base());
        let (min, max) = match self.face {
            RoiFace::IrregularPolyline => {
                let half = roi.stroke_width() as f64 / 2.0;
                let scanned = vertex_bounds(&roi.vertices()).unwrap_or(([x0, y0], [x0, y0]));
                (
                    [scanned.0[0] - half, scanned.0[1] - half],
                    [scanned.1[0] + half, scanned.1[1] + half],
                )
            }
            face if face.has_vertex_list() || matches!(face, RoiFace::Line | RoiFace::Points) => {
                vertex_bounds(&roi.vertices()).unwrap_or(([x0, y0], [x0, y0]))
            }
            RoiFace::Pixel => {
                let b = roi.bounds();
                (
                    [b.x as f64, b.y as f64],
                    [(b.x + b.width) as f64, (b.y + b.height) as f64],
                )
            }
            _ => ([x0, y0], [x0 + roi.float_width(), y0 + roi.float_height()]),
        };
        RealInterval::new(min.to_vec(), max.to_vec()).unwrap_or_else(|_| RealInterval::at(&min))
    }

    fn require(&self, faces: &[RoiFace], operation: &str) -> Result<()> {
        if faces.contains(&self.face) {
            Ok(())
        } else {
            Err(BridgeError::unsupported(format!("{operation} on a {} view", self.face)))
        }
    }

    pub fn center(&self) -> Result<[f64; 2]> {
        self.require(&[RoiFace::Box, RoiFace::Ellipsoid], "center")?;
        let roi = self.roi.borrow();
        Ok([
            roi.x_base() + roi.float_width() / 2.0,
            roi.y_base() + roi.float_height() / 2.0,
        ])
    }

    /// Move the roi so its centre lands on `center`.
    pub fn set_center(&self, center: &[f64]) -> Result<()> {
        self.require(&[RoiFace::Box, RoiFace::Ellipsoid], "set_center")?;
        check_point(center, 2)?;
        let mut roi = self.roi.borrow_mut();
        let (w, h) = (roi.float_width(), roi.float_height());
        roi.set_location(center[0] - w / 2.0, center[1] - h / 2.0);
        Ok(())
    }

    pub fn side_length(&self, d: usize) -> Result<f64> {
        self.require(&[RoiFace::Box], "side_length")?;
        check_dimension(d, 2)?;
        let roi = self.roi.borrow();
        Ok(if d == 0 { roi.float_width() } else { roi.float_height() })
    }

    pub fn set_side_length(&self, d: usize, _length: f64) -> Result<()> {
        check_dimension(d, 2)?;
        Err(BridgeError::unsupported(format!("set_side_length on a {} view", self.face)))
    }

    pub fn semi_axis_length(&self, d: usize) -> Result<f64> {
        self.require(&[RoiFace::Ellipsoid], "semi_axis_length")?;
        check_dimension(d, 2)?;
        let roi = self.roi.borrow();
        Ok(if d == 0 { roi.float_width() } else { roi.float_height() } / 2.0)
    }

    pub fn set_semi_axis_length(&self, d: usize, _length: f64) -> Result<()> {
        check_dimension(d, 2)?;
        Err(BridgeError::unsupported(format!("set_semi_axis_length on a {} view", self.face)))
    }

    pub fn ellipsoid_params(&self) -> Option<([f64; 2], [f64; 2])> {
        let center = self.center().ok().filter(|_| self.face == RoiFace::Ellipsoid)?;
        let roi = self.roi.borrow();
        Some((center, [roi.float_width() / 2.0, roi.float_height() / 2.0]))
    }

    pub fn line_endpoints(&self) -> Option<([f64; 2], [f64; 2])> {
        if self.face != RoiFace::Line {
            return None;
        }
        self.roi.borrow().line_endpoints()
    }

    /// Current vertices of polygon and polyline views.
    pub fn vertices(&self) -> Option<Vec<[f64; 2]>> {
        self.face.has_vertex_list().then(|| self.roi.borrow().vertices())
    }

    pub fn point_positions(&self) -> Option<Vec<[f64; 2]>> {
        (self.face == RoiFace::Points).then(|| self.roi.borrow().vertices())
    }

    pub fn num_vertices(&self) -> Result<usize> {
        self.vertices()
            .map(|v| v.len())
            .ok_or_else(|| BridgeError::unsupported(format!("num_vertices on a {} view", self.face)))
    }

    pub fn vertex(&self, index: usize) -> Result<[f64; 2]> {
        let vertices = self
            .vertices()
            .ok_or_else(|| BridgeError::unsupported(format!("vertex on a {} view", self.face)))?;
        vertices.get(index).copied().ok_or_else(|| {
            BridgeError::illegal(format!("vertex {index} out of range for {} vertices", vertices.len()))
        })
    }

    /// Legacy polygons cannot insert at an index, so this always fails.
    pub fn add_vertex(&self, _index: usize, _position: [f64; 2]) -> Result<()> {
        Err(BridgeError::unsupported(format!("add_vertex on a {} view", self.face)))
    }

    /// Remove a vertex through the roi's handle removal, which needs the roi
    /// to be shown in a display.
    pub fn remove_vertex(&self, index: usize) -> Result<()> {
        self.require(&[RoiFace::Polygon, RoiFace::Polyline], "remove_vertex")?;
        let mut roi = self.roi.borrow_mut();
        if roi.display().is_none() {
            return Err(BridgeError::unsupported(
                "remove_vertex on a roi that is not shown in a display",
            ));
        }
        let vertices = roi.vertices();
        let [x, y] = vertices.get(index).copied().ok_or_else(|| {
            BridgeError::illegal(format!("vertex {index} out of range for {} vertices", vertices.len()))
        })?;
        roi.delete_handle(x, y)
    }

    pub fn size(&self) -> Result<usize> {
        self.point_positions()
            .map(|p| p.len())
            .ok_or_else(|| BridgeError::unsupported(format!("size on a {} view", self.face)))
    }

    pub fn add_point(&self, position: &[f64]) -> Result<()> {
        self.require(&[RoiFace::Points], "add_point")?;
        check_point(position, 2)?;
        self.roi.borrow_mut().add_point(position[0], position[1])
    }

    /// Remove the point at `position`, if there is one. Needs a display.
    pub fn remove_point(&self, position: &[f64]) -> Result<()> {
        self.require(&[RoiFace::Points], "remove_point")?;
        check_point(position, 2)?;
        if self.roi.borrow().display().is_none() {
            return Err(BridgeError::unsupported(
                "remove_point on a roi that is not shown in a display",
            ));
        }
        if self.test(position) {
            self.roi.borrow_mut().delete_handle(position[0], position[1])?;
        }
        Ok(())
    }
}

impl Wrapper for RoiMask {
    type Source = RoiRef;

    fn source(&self) -> RoiRef {
        self.roi.clone()
    }

    /// Edits land on the roi directly; there is nothing to push.
    fn synchronize(&self) -> Result<()> {
        Ok(())
    }

    fn state(&self) -> SyncState {
        SyncState::Synchronized
    }
}
