use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Runtime type of a value flowing through the converter catalog.
///
/// Tags form a small lattice: every legacy shape type descends from
/// [`TypeTag::Roi`], every mask type from [`TypeTag::Mask`], and each
/// writable mask type from its read-only counterpart. The two wrapper
/// markers stand apart and are matched by inspecting the value itself.
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
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TypeTag {
    Roi,
    OvalRoi,
    LineRoi,
    PolygonRoi,
    PointRoi,
    ShapeRoi,
    ImageRoi,

    Mask,
    BoxMask,
    WritableBox,
    Ellipsoid,
    WritableEllipsoid,
    LineMask,
    WritableLine,
    PointMask,
    WritablePointMask,
    PointCollection,
    WritablePointCollection,
    #[serde(rename = "polygon2d")]
    #[strum(serialize = "polygon2d")]
    Polygon2D,
    #[serde(rename = "writable_polygon2d")]
    #[strum(serialize = "writable_polygon2d")]
    WritablePolygon2D,
    Polyline,
    WritablePolyline,
    CompositeMask,

    /// A mask that is a live view of a legacy roi.
    RoiWrapper,
    /// A legacy roi that is a live view of a mask.
    MaskWrapper,
}

impl TypeTag {
    pub fn parent(self) -> Option<TypeTag> {
        use TypeTag::*;
        match self {
            Roi | Mask | RoiWrapper | MaskWrapper => None,
            OvalRoi | LineRoi | PolygonRoi | PointRoi | ShapeRoi | ImageRoi => Some(Roi),
            BoxMask | Ellipsoid | LineMask | PointMask | PointCollection | Polygon2D | Polyline
            | CompositeMask => Some(Mask),
            WritableBox => Some(BoxMask),
            WritableEllipsoid => Some(Ellipsoid),
            WritableLine => Some(LineMask),
            WritablePointMask => Some(PointMask),
            WritablePointCollection => Some(PointCollection),
            WritablePolygon2D => Some(Polygon2D),
            WritablePolyline => Some(Polyline),
        }
    }

    /// Whether a value of this type may stand where `target` is expected.
    pub fn is_assignable_to(self, target: TypeTag) -> bool {
        let mut current = Some(self);
        while let Some(tag) = current {
            if tag == target {
                return true;
            }
            current = tag.parent();
        }
        false
    }

    pub fn is_legacy(self) -> bool {
        self.is_assignable_to(TypeTag::Roi)
    }

    pub fn is_marker(self) -> bool {
        matches!(self, TypeTag::RoiWrapper | TypeTag::MaskWrapper)
    }
}

/// Whether a mask's boundary belongs to it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BoundaryType {
    #[default]
    Closed,
    Open,
    Unspecified,
}

/// Converter priorities. Higher wins; ties go to registration order.
pub mod priority {
    pub const HIGH: f64 = 100.0;
    pub const NORMAL: f64 = 0.0;
    pub const LOW: f64 = -100.0;
    pub const VERY_LOW: f64 = -10_000.0;
}
