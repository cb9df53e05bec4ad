//! The N-dimensional mask model.
//!
//! Every mask answers `test(point)`, reports real per-axis bounds and a
//! constant dimension count. [`MaskRef`] is the closed set of mask kinds
//! the converters understand; cloning it clones a handle, never geometry.

pub mod composite;
pub mod points;
pub mod predicate;
pub mod shapes;

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
};

use crate::{
    error::{BridgeError, Result},
    geometry::RealInterval,
    types::TypeTag,
    wrap::RoiMask,
};

pub use composite::{AffineTransform2D, CompositeMask, MaskOperator};
pub use points::{PointCollection, PointFactory, RealPoint, real_point_factory};
pub use predicate::PredicateMask;
pub use shapes::{BoxMask, EllipsoidMask, LineMask, PointMask, PolygonMask, PolylineMask};

/// Shared, optionally read-only handle to mask data.
pub struct Shared<T> {
    inner: Rc<RefCell<T>>,
    writable: bool,
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
            writable: true,
        }
    }

    /// A handle to the same data that refuses mutation.
    pub fn read_only(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            writable: false,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    pub fn write(&self) -> Result<RefMut<'_, T>> {
        if !self.writable {
            return Err(BridgeError::unsupported("write through a read-only mask handle"));
        }
        Ok(self.inner.borrow_mut())
    }

    /// Identity comparison; ignores writability.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            writable: self.writable,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Shared");
        s.field("writable", &self.writable);
        match self.inner.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &"<borrowed>"),
        };
        s.finish()
    }
}

#[derive(Debug, Clone)]
pub enum MaskRef {
    Box(Shared<BoxMask>),
    Ellipsoid(Shared<EllipsoidMask>),
    Line(Shared<LineMask>),
    Point(Shared<PointMask>),
    Points(Shared<PointCollection>),
    Polygon(Shared<PolygonMask>),
    Polyline(Shared<PolylineMask>),
    Composite(Rc<CompositeMask>),
    Predicate(Rc<PredicateMask>),
    /// A legacy roi seen as a mask.
    Roi(RoiMask),
}

macro_rules! writable_tag {
    ($shared:expr, $writable:ident, $read_only:ident) => {
        if $shared.is_writable() {
            TypeTag::$writable
        } else {
            TypeTag::$read_only
        }
    };
}

impl MaskRef {
    pub fn num_dimensions(&self) -> usize {
        match self {
            Self::Box(m) => m.borrow().num_dimensions(),
            Self::Ellipsoid(m) => m.borrow().num_dimensions(),
            Self::Line(m) => m.borrow().num_dimensions(),
            Self::Point(m) => m.borrow().num_dimensions(),
            Self::Points(m) => m.borrow().num_dimensions(),
            Self::Polygon(_) | Self::Polyline(_) | Self::Roi(_) => 2,
            Self::Composite(c) => c.num_dimensions(),
            Self::Predicate(p) => p.num_dimensions(),
        }
    }

    pub fn test(&self, point: &[f64]) -> bool {
        match self {
            Self::Box(m) => m.borrow().test(point),
            Self::Ellipsoid(m) => m.borrow().test(point),
            Self::Line(m) => m.borrow().test(point),
            Self::Point(m) => m.borrow().test(point),
            Self::Points(m) => m.borrow().test(point),
            Self::Polygon(m) => m.borrow().test(point),
            Self::Polyline(m) => m.borrow().test(point),
            Self::Composite(c) => c.test(point),
            Self::Predicate(p) => p.test(point),
            Self::Roi(w) => w.test(point),
        }
    }

    pub fn bounds(&self) -> RealInterval {
        match self {
            Self::Box(m) => m.borrow().interval().clone(),
            Self::Ellipsoid(m) => m.borrow().bounds(),
            Self::Line(m) => m.borrow().bounds(),
            Self::Point(m) => m.borrow().bounds(),
            Self::Points(m) => m.borrow().bounds(),
            Self::Polygon(m) => m.borrow().bounds(),
            Self::Polyline(m) => m.borrow().bounds(),
            Self::Composite(c) => c.bounds(),
            Self::Predicate(p) => p.bounds().clone(),
            Self::Roi(w) => w.bounds(),
        }
    }

    pub fn real_min(&self, d: usize) -> Result<f64> {
        self.bounds().real_min(d)
    }

    pub fn real_max(&self, d: usize) -> Result<f64> {
        self.bounds().real_max(d)
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Box(m) => writable_tag!(m, WritableBox, BoxMask),
            Self::Ellipsoid(m) => writable_tag!(m, WritableEllipsoid, Ellipsoid),
            Self::Line(m) => writable_tag!(m, WritableLine, LineMask),
            Self::Point(m) => writable_tag!(m, WritablePointMask, PointMask),
            Self::Points(m) => writable_tag!(m, WritablePointCollection, PointCollection),
            Self::Polygon(m) => writable_tag!(m, WritablePolygon2D, Polygon2D),
            Self::Polyline(m) => writable_tag!(m, WritablePolyline, Polyline),
            Self::Composite(_) => TypeTag::CompositeMask,
            Self::Predicate(_) => TypeTag::Mask,
            Self::Roi(w) => w.type_tag(),
        }
    }

    pub fn is_writable(&self) -> bool {
        match self {
            Self::Box(m) => m.is_writable(),
            Self::Ellipsoid(m) => m.is_writable(),
            Self::Line(m) => m.is_writable(),
            Self::Point(m) => m.is_writable(),
            Self::Points(m) => m.is_writable(),
            Self::Polygon(m) => m.is_writable(),
            Self::Polyline(m) => m.is_writable(),
            Self::Composite(_) | Self::Predicate(_) => false,
            Self::Roi(w) => w.face().is_writable(),
        }
    }

    /// The same mask behind a handle that refuses mutation.
    pub fn read_only(&self) -> MaskRef {
        match self {
            Self::Box(m) => Self::Box(m.read_only()),
            Self::Ellipsoid(m) => Self::Ellipsoid(m.read_only()),
            Self::Line(m) => Self::Line(m.read_only()),
            Self::Point(m) => Self::Point(m.read_only()),
            Self::Points(m) => Self::Points(m.read_only()),
            Self::Polygon(m) => Self::Polygon(m.read_only()),
            Self::Polyline(m) => Self::Polyline(m.read_only()),
            other => other.clone(),
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &MaskRef) -> bool {
        match (self, other) {
            (Self::Box(a), Self::Box(b)) => a.ptr_eq(b),
            (Self::Ellipsoid(a), Self::Ellipsoid(b)) => a.ptr_eq(b),
            (Self::Line(a), Self::Line(b)) => a.ptr_eq(b),
            (Self::Point(a), Self::Point(b)) => a.ptr_eq(b),
            (Self::Points(a), Self::Points(b)) => a.ptr_eq(b),
            (Self::Polygon(a), Self::Polygon(b)) => a.ptr_eq(b),
            (Self::Polyline(a), Self::Polyline(b)) => a.ptr_eq(b),
            (Self::Composite(a), Self::Composite(b)) => Rc::ptr_eq(a, b),
            (Self::Predicate(a), Self::Predicate(b)) => Rc::ptr_eq(a, b),
            (Self::Roi(a), Self::Roi(b)) => a.roi().ptr_eq(b.roi()) && a.face() == b.face(),
            _ => false,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeMask> {
        match self {
            Self::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_roi_wrapper(&self) -> Option<&RoiMask> {
        match self {
            Self::Roi(w) => Some(w),
            _ => None,
        }
    }

    pub fn combine(operator: MaskOperator, operands: Vec<MaskRef>) -> Result<MaskRef> {
        Ok(Self::Composite(Rc::new(CompositeMask::new(operator, operands)?)))
    }

    pub fn and(&self, other: &MaskRef) -> Result<MaskRef> {
        Self::combine(MaskOperator::And, vec![self.clone(), other.clone()])
    }

    pub fn or(&self, other: &MaskRef) -> Result<MaskRef> {
        Self::combine(MaskOperator::Or, vec![self.clone(), other.clone()])
    }

    pub fn xor(&self, other: &MaskRef) -> Result<MaskRef> {
        Self::combine(MaskOperator::Xor, vec![self.clone(), other.clone()])
    }

    pub fn minus(&self, other: &MaskRef) -> Result<MaskRef> {
        Self::combine(MaskOperator::Minus, vec![self.clone(), other.clone()])
    }

    pub fn negate(&self) -> Result<MaskRef> {
        Self::combine(MaskOperator::Negate, vec![self.clone()])
    }

    pub fn transform(&self, transform: AffineTransform2D) -> Result<MaskRef> {
        Self::combine(MaskOperator::Transform(transform), vec![self.clone()])
    }

    /// Centre and semi-axes of ellipsoidal masks.
    pub fn ellipsoid_params(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        match self {
            Self::Ellipsoid(m) => {
                let m = m.borrow();
                Some((m.center().to_vec(), m.semi_axes().to_vec()))
            }
            Self::Roi(w) => w
                .ellipsoid_params()
                .map(|(center, semi_axes)| (center.to_vec(), semi_axes.to_vec())),
            _ => None,
        }
    }

    pub fn line_endpoints(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        match self {
            Self::Line(m) => {
                let m = m.borrow();
                Some((m.endpoint_one().to_vec(), m.endpoint_two().to_vec()))
            }
            Self::Roi(w) => w.line_endpoints().map(|(a, b)| (a.to_vec(), b.to_vec())),
            _ => None,
        }
    }

    /// Members of point and point-collection masks.
    pub fn point_positions(&self) -> Option<Vec<Vec<f64>>> {
        match self {
            Self::Point(m) => Some(vec![m.borrow().position().to_vec()]),
            Self::Points(m) => Some(m.borrow().positions()),
            Self::Roi(w) => w
                .point_positions()
                .map(|points| points.iter().map(|p| p.to_vec()).collect()),
            _ => None,
        }
    }

    /// Vertices of polygon and polyline masks.
    pub fn polygon_vertices(&self) -> Option<Vec<[f64; 2]>> {
        match self {
            Self::Polygon(m) => Some(m.borrow().vertices().to_vec()),
            Self::Polyline(m) => Some(m.borrow().vertices().to_vec()),
            Self::Roi(w) => w.vertices(),
            _ => None,
        }
    }
}

macro_rules! impl_from_mask {
    ($($mask:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$mask> for MaskRef {
                fn from(mask: $mask) -> Self {
                    Self::$variant(Shared::new(mask))
                }
            }

            impl From<Shared<$mask>> for MaskRef {
                fn from(mask: Shared<$mask>) -> Self {
                    Self::$variant(mask)
                }
            }
        )*
    };
}

impl_from_mask! {
    BoxMask => Box,
    EllipsoidMask => Ellipsoid,
    LineMask => Line,
    PointMask => Point,
    PointCollection => Points,
    PolygonMask => Polygon,
    PolylineMask => Polyline,
}

impl From<CompositeMask> for MaskRef {
    fn from(mask: CompositeMask) -> Self {
        Self::Composite(Rc::new(mask))
    }
}

impl From<PredicateMask> for MaskRef {
    fn from(mask: PredicateMask) -> Self {
        Self::Predicate(Rc::new(mask))
    }
}

impl From<RoiMask> for MaskRef {
    fn from(wrapper: RoiMask) -> Self {
        Self::Roi(wrapper)
    }
}
