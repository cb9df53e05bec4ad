//! The converters registered by [`super::CatalogBuilder::with_builtin`].

use strum::IntoEnumIterator;

use super::{ConvertService, ConverterDescriptor, Value};
use crate::{
    error::{BridgeError, Result},
    geometry::narrow,
    legacy::{Roi, RoiKind, RoiRef},
    mask::MaskRef,
    traits::Wrapper,
    types::{TypeTag, priority},
    wrap::{MaskRoi, RoiFace, RoiMask},
};

fn expect_roi(value: &Value) -> Result<&RoiRef> {
    value
        .as_roi()
        .ok_or_else(|| BridgeError::illegal(format!("expected a roi, got {}", value.type_tag())))
}

fn expect_mask(value: &Value) -> Result<&MaskRef> {
    value
        .as_mask()
        .ok_or_else(|| BridgeError::illegal(format!("expected a mask, got {}", value.type_tag())))
}

fn wrapped_roi(value: &Value) -> Option<RoiRef> {
    value
        .as_mask()
        .and_then(MaskRef::as_roi_wrapper)
        .map(|wrapper| wrapper.source())
}

fn wrapped_mask(value: &Value) -> Option<MaskRef> {
    value
        .as_roi()
        .and_then(RoiRef::as_mask_wrapper)
        .map(|wrapper| wrapper.source())
}

fn unwrap_roi(_: &ConvertService, value: &Value) -> Result<Value> {
    let wrapper = value
        .as_mask()
        .and_then(MaskRef::as_roi_wrapper)
        .ok_or_else(|| BridgeError::illegal("value is not a roi wrapper"))?;
    Ok(Value::Roi(wrapper.updated_source()?))
}

// Pending edits made through the wrapper reach the source before it is
// handed back.
fn unwrap_mask(_: &ConvertService, value: &Value) -> Result<Value> {
    let wrapper = value
        .as_roi()
        .and_then(RoiRef::as_mask_wrapper)
        .ok_or_else(|| BridgeError::illegal("value is not a mask wrapper"))?;
    Ok(Value::Mask(wrapper.updated_source()?))
}

/// Converters that hand back the object a wrapper was built around.
///
/// They outrank every structural converter, so converting a wrapper to its
/// source's type returns the source itself.
pub fn unwrappers() -> Vec<ConverterDescriptor> {
    let mut descriptors = Vec::new();
    for target in TypeTag::iter().filter(|t| t.is_legacy() && *t != TypeTag::Roi) {
        descriptors.push(
            ConverterDescriptor::new(
                format!("wrapper_to_{target}"),
                TypeTag::RoiWrapper,
                target,
                unwrap_roi,
            )
            .with_priority(priority::HIGH)
            .when(move |_, value| {
                wrapped_roi(value).is_some_and(|roi| roi.type_tag().is_assignable_to(target))
            }),
        );
    }
    descriptors.push(
        ConverterDescriptor::new("wrapper_to_roi", TypeTag::RoiWrapper, TypeTag::Roi, unwrap_roi)
            .with_priority(priority::HIGH - 1.0),
    );

    let writable = [
        TypeTag::WritableBox,
        TypeTag::WritableEllipsoid,
        TypeTag::WritableLine,
        TypeTag::WritablePointMask,
        TypeTag::WritablePointCollection,
        TypeTag::WritablePolygon2D,
        TypeTag::WritablePolyline,
    ];
    for target in writable {
        descriptors.push(
            ConverterDescriptor::new(
                format!("wrapper_to_{target}"),
                TypeTag::MaskWrapper,
                target,
                unwrap_mask,
            )
            .with_priority(priority::HIGH)
            .when(move |_, value| {
                wrapped_mask(value).is_some_and(|mask| mask.type_tag().is_assignable_to(target))
            }),
        );
    }
    descriptors.push(
        ConverterDescriptor::new("wrapper_to_mask", TypeTag::MaskWrapper, TypeTag::Mask, unwrap_mask)
            .with_priority(priority::HIGH - 1.0),
    );
    descriptors
}

fn roi_face(name: &str, source: TypeTag, face: RoiFace) -> ConverterDescriptor {
    ConverterDescriptor::new(name, source, face.type_tag(), move |_, value| {
        let roi = expect_roi(value)?;
        Ok(RoiMask::new(roi.clone(), face)?.into())
    })
    .when(move |_, value| value.as_roi().is_some_and(|roi| face.accepts(&roi.borrow())))
}

/// Legacy rois seen as masks.
pub fn roi_to_mask() -> Vec<ConverterDescriptor> {
    vec![
        roi_face("roi_to_box", TypeTag::Roi, RoiFace::Box),
        roi_face("oval_roi_to_ellipsoid", TypeTag::OvalRoi, RoiFace::Ellipsoid),
        roi_face("line_roi_to_line", TypeTag::LineRoi, RoiFace::Line),
        roi_face("polygon_roi_to_polygon", TypeTag::PolygonRoi, RoiFace::Polygon),
        roi_face(
            "freehand_roi_to_polygon",
            TypeTag::PolygonRoi,
            RoiFace::UnmodifiablePolygon,
        ),
        roi_face("polyline_roi_to_polyline", TypeTag::PolygonRoi, RoiFace::Polyline),
        roi_face(
            "freeline_roi_to_polyline",
            TypeTag::PolygonRoi,
            RoiFace::UnmodifiablePolyline,
        ),
        roi_face(
            "polyline_roi_to_mask",
            TypeTag::PolygonRoi,
            RoiFace::IrregularPolyline,
        )
        .with_priority(priority::LOW),
        roi_face("point_roi_to_point_collection", TypeTag::PointRoi, RoiFace::Points),
        roi_face("shape_roi_to_mask", TypeTag::ShapeRoi, RoiFace::Shape),
        ConverterDescriptor::new("roi_to_mask", TypeTag::Roi, TypeTag::Mask, |_, value| {
            Ok(RoiMask::pixel(expect_roi(value)?.clone()).into())
        })
        .with_priority(priority::VERY_LOW)
        .lossy(),
    ]
}

fn is_planar(value: &Value) -> bool {
    value.as_mask().is_some_and(|mask| mask.num_dimensions() == 2)
}

/// Native writable masks shown as live rois.
fn live_roi(name: &str, source: TypeTag, target: TypeTag) -> ConverterDescriptor {
    ConverterDescriptor::new(name, source, target, |_, value| {
        Ok(MaskRoi::new(expect_mask(value)?.clone())?.into())
    })
    .when(|_, value| {
        value
            .as_mask()
            .is_some_and(|mask| mask.as_roi_wrapper().is_none() && mask.is_writable())
    })
    .when(|_, value| is_planar(value))
}

/// Masks copied into a new, unbound roi. Later edits on either side stay
/// on that side.
fn snapshot_roi<F>(name: &str, source: TypeTag, target: TypeTag, build: F) -> ConverterDescriptor
where
    F: Fn(&MaskRef) -> Result<Roi> + Send + Sync + 'static,
{
    ConverterDescriptor::new(name, source, target, move |_, value| {
        Ok(build(expect_mask(value)?)?.into_ref().into())
    })
    .with_priority(priority::LOW)
    .when(|_, value| is_planar(value))
}

fn missing(what: &str, mask: &MaskRef) -> BridgeError {
    BridgeError::illegal(format!("{} has no {what}", mask.type_tag()))
}

fn snapshot_box(mask: &MaskRef) -> Result<Roi> {
    let bounds = mask.bounds();
    let (min, max) = (bounds.min(), bounds.max());
    Ok(Roi::rectangle(min[0], min[1], max[0] - min[0], max[1] - min[1]))
}

fn snapshot_oval(mask: &MaskRef) -> Result<Roi> {
    let (c, r) = mask
        .ellipsoid_params()
        .ok_or_else(|| missing("ellipsoid parameters", mask))?;
    Ok(Roi::oval(c[0] - r[0], c[1] - r[1], 2.0 * r[0], 2.0 * r[1]))
}

fn snapshot_line(mask: &MaskRef) -> Result<Roi> {
    let (one, two) = mask.line_endpoints().ok_or_else(|| missing("endpoints", mask))?;
    Ok(Roi::line(one[0], one[1], two[0], two[1]))
}

fn snapshot_points(mask: &MaskRef) -> Result<Roi> {
    let points = mask.point_positions().ok_or_else(|| missing("points", mask))?;
    Ok(Roi::points(
        points.iter().map(|p| [p[0] as f32, p[1] as f32]).collect(),
    ))
}

fn snapshot_vertices(kind: RoiKind) -> impl Fn(&MaskRef) -> Result<Roi> + Send + Sync + 'static {
    move |mask: &MaskRef| {
        let vertices = mask.polygon_vertices().ok_or_else(|| missing("vertices", mask))?;
        Roi::polygon(kind, narrow(&vertices))
    }
}

/// Masks shown as legacy rois: live for native writable masks, copied
/// otherwise.
pub fn mask_to_roi() -> Vec<ConverterDescriptor> {
    vec![
        live_roi("writable_box_to_roi", TypeTag::WritableBox, TypeTag::Roi),
        snapshot_roi("box_to_roi", TypeTag::BoxMask, TypeTag::Roi, snapshot_box).lossy(),
        live_roi(
            "writable_ellipsoid_to_oval_roi",
            TypeTag::WritableEllipsoid,
            TypeTag::OvalRoi,
        ),
        snapshot_roi(
            "ellipsoid_to_oval_roi",
            TypeTag::Ellipsoid,
            TypeTag::OvalRoi,
            snapshot_oval,
        )
        .lossy(),
        live_roi("writable_line_to_line_roi", TypeTag::WritableLine, TypeTag::LineRoi),
        // endpoints copy exactly
        snapshot_roi(
            "line_to_line_roi",
            TypeTag::LineMask,
            TypeTag::LineRoi,
            snapshot_line,
        ),
        live_roi(
            "writable_point_mask_to_point_roi",
            TypeTag::WritablePointMask,
            TypeTag::PointRoi,
        ),
        snapshot_roi(
            "point_mask_to_point_roi",
            TypeTag::PointMask,
            TypeTag::PointRoi,
            snapshot_points,
        )
        .with_priority(priority::LOW - 1.0)
        .lossy(),
        live_roi(
            "writable_point_collection_to_point_roi",
            TypeTag::WritablePointCollection,
            TypeTag::PointRoi,
        )
        .lossy(),
        snapshot_roi(
            "point_collection_to_point_roi",
            TypeTag::PointCollection,
            TypeTag::PointRoi,
            snapshot_points,
        )
        .lossy(),
        live_roi(
            "writable_polygon_to_polygon_roi",
            TypeTag::WritablePolygon2D,
            TypeTag::PolygonRoi,
        ),
        snapshot_roi(
            "polygon_to_polygon_roi",
            TypeTag::Polygon2D,
            TypeTag::PolygonRoi,
            snapshot_vertices(RoiKind::Polygon),
        )
        .lossy(),
        live_roi(
            "writable_polyline_to_polyline_roi",
            TypeTag::WritablePolyline,
            TypeTag::PolygonRoi,
        ),
        snapshot_roi(
            "polyline_to_polyline_roi",
            TypeTag::Polyline,
            TypeTag::PolygonRoi,
            snapshot_vertices(RoiKind::Polyline),
        )
        .lossy(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        convert::ConverterCatalog,
        legacy::Display,
        mask::{BoxMask, LineMask, PointCollection, PointMask, PolylineMask, Shared},
    };

    fn service() -> ConvertService {
        ConvertService::with_catalog(ConverterCatalog::global())
    }

    #[test]
    fn every_legacy_type_has_an_unwrapper() {
        let names: Vec<_> = unwrappers().iter().map(|d| d.name().to_owned()).collect();
        for name in [
            "wrapper_to_oval_roi",
            "wrapper_to_image_roi",
            "wrapper_to_roi",
            "wrapper_to_writable_polygon2d",
            "wrapper_to_mask",
        ] {
            assert!(names.iter().any(|n| n == name), "missing {name}");
        }
    }

    #[test]
    fn read_only_box_is_copied() {
        let shared = Shared::new(BoxMask::new(vec![1.0, 2.0], vec![5.0, 4.0]).unwrap());
        let value = Value::from(MaskRef::from(shared.read_only()));
        let service = service();
        assert_eq!(service.handler(&value, TypeTag::Roi).unwrap().name(), "box_to_roi");

        let roi = service.convert_to_roi(value, TypeTag::Roi).unwrap();
        assert!(!roi.borrow().is_mask_wrapper());
        assert_eq!(roi.borrow().float_width(), 4.0);

        shared.write().unwrap().set_center(&[10.0, 10.0]).unwrap();
        assert_eq!(roi.borrow().x_base(), 1.0);
    }

    #[test]
    fn writable_masks_become_live_rois() {
        let service = service();
        let line: MaskRef = LineMask::new(vec![0.0, 0.0], vec![2.0, 2.0]).unwrap().into();
        let roi = service.convert_to_roi(line.clone(), TypeTag::Roi).unwrap();
        assert_eq!(roi.kind(), RoiKind::Line);
        assert!(roi.borrow().is_mask_wrapper());

        let polyline: MaskRef = PolylineMask::new(vec![[0.0, 0.0], [3.0, 1.0]]).into();
        let roi = service.convert_to_roi(polyline, TypeTag::PolygonRoi).unwrap();
        assert_eq!(roi.kind(), RoiKind::Polyline);

        let point: MaskRef = PointMask::new(vec![3.0, 3.0]).unwrap().into();
        let handler = service.handler(&Value::from(point), TypeTag::PointRoi).unwrap();
        assert_eq!(handler.name(), "writable_point_mask_to_point_roi");
    }

    #[test]
    fn read_only_collection_is_copied() {
        let points = Shared::new(PointCollection::new(2, vec![vec![1.0, 1.0]]).unwrap());
        let value = Value::from(MaskRef::from(points.read_only()));
        let service = service();
        let handler = service.handler(&value, TypeTag::Roi).unwrap();
        assert_eq!(handler.name(), "point_collection_to_point_roi");
    }

    #[test]
    fn roi_faces_follow_kind_checks() {
        let service = service();
        let freehand = Roi::polygon(
            RoiKind::FreehandPolygon,
            vec![[0.0, 0.0], [5.0, 0.0], [5.0, 5.0]],
        )
        .unwrap()
        .into_ref();
        let mask = service.convert_to_mask(freehand, TypeTag::Mask).unwrap();
        assert_eq!(mask.type_tag(), TypeTag::Polygon2D);

        let thick = Roi::polygon(RoiKind::Polyline, vec![[0.0, 0.0], [8.0, 0.0]])
            .unwrap()
            .with_stroke_width(2.0)
            .into_ref();
        let value = Value::from(thick);
        assert_eq!(service.handler(&value, TypeTag::Mask).unwrap().name(), "polyline_roi_to_mask");

        let rounded = Value::from(Roi::rounded_rectangle(0.0, 0.0, 6.0, 6.0, 2.0).into_ref());
        let handler = service.handler(&rounded, TypeTag::Mask).unwrap();
        assert_eq!(handler.name(), "roi_to_mask");
        assert!(handler.is_lossy());
    }

    #[test]
    fn point_roi_wrapper_removes_through_display() {
        let service = service();
        let roi = Roi::points(vec![[1.0, 1.0], [2.0, 2.0]]).into_ref();
        roi.borrow_mut().attach(Display::new("image", 8, 8));
        let mask = service.convert_to_mask(roi.clone(), TypeTag::PointCollection).unwrap();
        let wrapper = mask.as_roi_wrapper().unwrap();
        wrapper.remove_point(&[1.0, 1.0]).unwrap();
        assert_eq!(roi.borrow().n_coordinates(), 1);
    }
}
