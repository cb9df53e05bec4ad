//! # ROI Bridge
//!
//! Converts between two region models: the 2-D legacy [`Roi`] shapes and
//! the N-dimensional [`MaskRef`] membership predicates.
//!
//! ## Core Features
//!
//! - **Live wrappers**: [`RoiMask`] and [`MaskRoi`] view an object of one
//!   model through the other model's contract without copying it
//! - **Synchronization**: edits made through a wrapper reach the source on
//!   [`Wrapper::synchronize`]
//! - **Converter catalog**: prioritized, capability-gated converters picked
//!   deterministically by [`ConvertService`]
//! - **Identity-preserving unwrap**: converting a wrapper back to its
//!   source type returns the source itself
//! - **Composite flattening** and a **raster fallback** for masks with no
//!   structural counterpart
//!
//! ## Quick Start
//!
//! ```rust
//! use roi_bridge::{ConvertService, Roi, TypeTag};
//!
//! let service = ConvertService::new();
//! let roi = Roi::oval(0.0, 0.0, 8.0, 4.0).into_ref();
//!
//! let mask = service.convert_to_mask(roi.clone(), TypeTag::Mask)?;
//! assert!(mask.test(&[4.0, 2.0]));
//!
//! // the wrapper unwraps to the very same roi
//! let back = service.convert_to_roi(mask, TypeTag::OvalRoi)?;
//! assert!(back.ptr_eq(&roi));
//! # Ok::<(), roi_bridge::BridgeError>(())
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod geometry;
pub mod io;
pub mod legacy;
pub mod mask;
pub mod traits;
pub mod types;
pub mod wrap;

pub use config::{ConvertOptions, MaskSpec, RoiSpec, Scene, SceneItem};
pub use convert::{
    CatalogBuilder, CompositeFlattener, ConvertService, ConverterCatalog, ConverterDescriptor,
    RasterFallbackConverter, Value,
};
pub use error::{BridgeError, Result};
pub use geometry::RealInterval;
pub use legacy::{Roi, RoiKind, RoiRef};
pub use mask::MaskRef;
pub use traits::{Rasterizer, Wrapper};
pub use types::{TypeTag, priority};
pub use wrap::{MaskRoi, RoiMask, SyncState};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::{GrayImage, Luma};

    use super::*;
    use crate::mask::{
        BoxMask, EllipsoidMask, LineMask, MaskOperator, PointCollection, PointMask, PolygonMask,
        PolylineMask, PredicateMask,
    };

    fn diagonal(min: [f64; 2], max: [f64; 2]) -> MaskRef {
        let bounds = RealInterval::new(min.to_vec(), max.to_vec()).unwrap();
        PredicateMask::new(bounds, |p| p[0] >= p[1]).into()
    }

    #[test]
    fn wrapped_triangle_tests_like_a_polygon() {
        let roi = Roi::polygon(RoiKind::Polygon, vec![[0.0, 0.0], [10.0, 0.0], [5.0, 10.0]])
            .unwrap()
            .into_ref();
        let mask = ConvertService::new()
            .convert_to_mask(roi, TypeTag::Mask)
            .unwrap();
        assert_eq!(mask.type_tag(), TypeTag::WritablePolygon2D);
        assert!(mask.test(&[5.0, 5.0]));
        assert!(!mask.test(&[0.0, 10.0]));
    }

    #[test]
    fn points_added_through_the_roi_reach_the_collection() {
        let source: MaskRef = PointCollection::new(2, vec![vec![1.0, 1.0], vec![2.0, 2.0]])
            .unwrap()
            .into();
        let shown = ConvertService::new()
            .convert_to_roi(source.clone(), TypeTag::PointRoi)
            .unwrap();
        shown.borrow_mut().add_point(3.0, 3.0).unwrap();

        let wrapper = shown.as_mask_wrapper().unwrap();
        wrapper.synchronize().unwrap();
        let positions = source.point_positions().unwrap();
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[2], vec![3.0, 3.0]);

        // a second pass with no edits changes nothing
        wrapper.synchronize().unwrap();
        assert_eq!(source.point_positions().unwrap(), positions);
        assert_eq!(wrapper.state(), SyncState::Synchronized);
    }

    #[test]
    fn higher_priority_wins_regardless_of_registration_order() {
        let low = || {
            ConverterDescriptor::new("low", TypeTag::Mask, TypeTag::ShapeRoi, |_, _| {
                Ok(Roi::shape(legacy::ShapeRoi::empty()).into_ref().into())
            })
            .with_priority(5.0)
        };
        let high = || {
            ConverterDescriptor::new("high", TypeTag::Mask, TypeTag::ShapeRoi, |_, _| {
                Ok(Roi::shape(legacy::ShapeRoi::empty()).into_ref().into())
            })
            .with_priority(10.0)
        };
        let value = Value::from(diagonal([0.0, 0.0], [4.0, 4.0]));
        for catalog in [
            ConverterCatalog::builder().register(low()).register(high()).build(),
            ConverterCatalog::builder().register(high()).register(low()).build(),
        ] {
            let service = ConvertService::with_catalog(Arc::new(catalog));
            for _ in 0..3 {
                let chosen = service.handler(&value, TypeTag::ShapeRoi).unwrap();
                assert_eq!(chosen.name(), "high");
            }
        }
    }

    #[test]
    fn box_and_circle_flatten_to_their_overlap() {
        let square: MaskRef = BoxMask::new(vec![0.0, 0.0], vec![10.0, 10.0]).unwrap().into();
        let circle: MaskRef = EllipsoidMask::sphere(vec![8.0, 8.0], 3.0).unwrap().into();
        let overlap = square.and(&circle).unwrap();
        let roi = ConvertService::new()
            .convert_to_roi(overlap, TypeTag::Roi)
            .unwrap();
        assert_eq!(roi.kind(), RoiKind::Composite);
        assert!(roi.contains_point(8.0, 8.0));
        assert!(!roi.contains_point(0.5, 0.5));
    }

    #[test]
    fn flattened_union_agrees_with_the_mask_off_the_edges() {
        let service = ConvertService::new();
        for operator in [
            MaskOperator::And,
            MaskOperator::Or,
            MaskOperator::Xor,
            MaskOperator::Minus,
        ] {
            let a: MaskRef = BoxMask::new(vec![0.0, 0.0], vec![6.0, 6.0]).unwrap().into();
            let b: MaskRef = BoxMask::new(vec![3.0, 2.0], vec![9.0, 8.0]).unwrap().into();
            let composite = MaskRef::combine(operator, vec![a, b]).unwrap();
            let roi = service.convert_to_roi(composite.clone(), TypeTag::Roi).unwrap();
            for i in 0..10 {
                for j in 0..10 {
                    let (x, y) = (i as f64 + 0.5, j as f64 + 0.5);
                    assert_eq!(
                        roi.contains_point(x, y),
                        composite.test(&[x, y]),
                        "{operator} at ({x}, {y})"
                    );
                }
            }
        }
    }

    #[test]
    fn diagonal_predicate_rasterizes_pixel_for_pixel() {
        let mask = diagonal([0.0, 0.0], [12.0, 24.0]);
        let roi = ConvertService::new()
            .convert_to_roi(mask.clone(), TypeTag::Roi)
            .unwrap();
        assert_eq!(roi.kind(), RoiKind::Image);
        for x in 0..=12 {
            for y in 0..=24 {
                assert_eq!(roi.contains(x, y), mask.test(&[x as f64, y as f64]));
            }
        }
    }

    #[test]
    fn plain_rectangle_wrapper_refuses_vertex_removal() {
        let roi = Roi::rectangle(0.0, 0.0, 5.0, 5.0).into_ref();
        let wrapper = RoiMask::boxed(roi).unwrap();
        assert!(wrapper.remove_vertex(0).unwrap_err().is_unsupported());
    }

    #[test]
    fn every_wrapper_unwraps_to_its_source() {
        let service = ConvertService::new();
        let outline: Vec<[f32; 2]> = vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]];
        let path: Vec<[f32; 2]> = vec![[0.0, 0.0], [3.0, 1.0], [5.0, 4.0]];
        let mut pixels = GrayImage::new(3, 3);
        pixels.put_pixel(1, 1, Luma([255]));
        let rois = [
            Roi::rectangle(1.0, 1.0, 4.0, 3.0),
            Roi::rounded_rectangle(1.0, 1.0, 8.0, 6.0, 2.0),
            Roi::oval(0.0, 0.0, 6.0, 2.0),
            Roi::polygon(RoiKind::Polygon, outline.clone()).unwrap(),
            Roi::polygon(RoiKind::Polygon, outline.clone()).unwrap().spline_fitted(),
            Roi::polygon(RoiKind::FreehandPolygon, outline.clone()).unwrap(),
            Roi::polygon(RoiKind::TracedPolygon, outline.clone()).unwrap(),
            Roi::line(0.0, 0.0, 4.0, 4.0),
            Roi::polygon(RoiKind::Polyline, path.clone()).unwrap(),
            Roi::polygon(RoiKind::Polyline, path.clone()).unwrap().with_stroke_width(3.0),
            Roi::polygon(RoiKind::Freeline, path.clone()).unwrap(),
            Roi::polygon(RoiKind::Angle, path).unwrap(),
            Roi::points(vec![[1.0, 2.0], [3.0, 4.0]]),
            Roi::shape(legacy::ShapeRoi::from_roi(&Roi::rectangle(0.0, 0.0, 3.0, 3.0)).unwrap()),
            Roi::image(legacy::ImageRoi::new(2, 2, pixels)),
        ];
        let mut kinds = Vec::new();
        for roi in rois {
            let roi = roi.into_ref();
            let tag = roi.type_tag();
            kinds.push(roi.kind());
            let mask = service.convert_to_mask(roi.clone(), TypeTag::Mask).unwrap();
            assert!(mask.as_roi_wrapper().is_some(), "{tag}");
            assert!(
                service.convert_to_roi(mask.clone(), tag).unwrap().ptr_eq(&roi),
                "{tag}"
            );
            assert!(service.convert_to_roi(mask, TypeTag::Roi).unwrap().ptr_eq(&roi), "{tag}");
        }
        for kind in <RoiKind as strum::IntoEnumIterator>::iter() {
            assert!(kinds.contains(&kind), "{kind}");
        }

        let square = vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]];
        let masks: [MaskRef; 7] = [
            BoxMask::new(vec![0.0, 0.0], vec![2.0, 2.0]).unwrap().into(),
            EllipsoidMask::sphere(vec![3.0, 3.0], 1.0).unwrap().into(),
            LineMask::new(vec![0.0, 0.0], vec![3.0, 4.0]).unwrap().into(),
            PointMask::new(vec![1.0, 2.0]).unwrap().into(),
            PointCollection::new(2, vec![vec![0.0, 1.0]]).unwrap().into(),
            PolygonMask::new(square.clone()).into(),
            PolylineMask::new(square).into(),
        ];
        for mask in masks {
            let tag = mask.type_tag();
            let roi = service.convert_to_roi(mask.clone(), TypeTag::Roi).unwrap();
            assert!(roi.as_mask_wrapper().is_some(), "{tag}");
            assert!(service.convert_to_mask(roi.clone(), tag).unwrap().ptr_eq(&mask), "{tag}");
            assert!(service.convert_to_mask(roi, TypeTag::Mask).unwrap().ptr_eq(&mask), "{tag}");
        }
    }

    #[test]
    fn edits_reach_the_source_through_unwrap() {
        let service = ConvertService::new();
        let unwrap = |roi: &RoiRef, source: &MaskRef| {
            let mask = service.convert_to_mask(roi.clone(), source.type_tag()).unwrap();
            assert!(mask.ptr_eq(source));
            mask
        };

        let square: MaskRef = BoxMask::new(vec![0.0, 0.0], vec![2.0, 2.0]).unwrap().into();
        let roi = service.convert_to_roi(square.clone(), TypeTag::Roi).unwrap();
        roi.borrow_mut().translate(10.0, 10.0);
        assert!(unwrap(&roi, &square).test(&[11.0, 11.0]));
        assert!(!square.test(&[1.0, 1.0]));

        let circle: MaskRef = EllipsoidMask::sphere(vec![3.0, 3.0], 1.0).unwrap().into();
        let roi = service.convert_to_roi(circle.clone(), TypeTag::OvalRoi).unwrap();
        roi.borrow_mut().set_size(6.0, 2.0).unwrap();
        let (center, semi) = unwrap(&roi, &circle).ellipsoid_params().unwrap();
        assert_eq!(center, vec![5.0, 3.0]);
        assert_eq!(semi, vec![3.0, 1.0]);

        let segment: MaskRef = LineMask::new(vec![0.0, 0.0], vec![3.0, 4.0]).unwrap().into();
        let roi = service.convert_to_roi(segment.clone(), TypeTag::LineRoi).unwrap();
        roi.borrow_mut().move_vertex(1, 6.0, 8.0).unwrap();
        assert_eq!(unwrap(&roi, &segment).line_endpoints().unwrap().1, vec![6.0, 8.0]);

        let point: MaskRef = PointMask::new(vec![1.0, 2.0]).unwrap().into();
        let roi = service.convert_to_roi(point.clone(), TypeTag::PointRoi).unwrap();
        roi.borrow_mut().move_vertex(0, 3.0, 4.0).unwrap();
        assert!(unwrap(&roi, &point).test(&[3.0, 4.0]));

        let points: MaskRef = PointCollection::new(2, vec![vec![0.0, 1.0]]).unwrap().into();
        let roi = service.convert_to_roi(points.clone(), TypeTag::PointRoi).unwrap();
        roi.borrow_mut().add_point(5.0, 5.0).unwrap();
        assert_eq!(unwrap(&roi, &points).point_positions().unwrap().len(), 2);

        let triangle = vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0]];
        for source in [
            MaskRef::from(PolygonMask::new(triangle.clone())),
            MaskRef::from(PolylineMask::new(triangle.clone())),
        ] {
            let roi = service.convert_to_roi(source.clone(), TypeTag::PolygonRoi).unwrap();
            roi.borrow_mut().add_point(0.0, 4.0).unwrap();
            let vertices = unwrap(&roi, &source).polygon_vertices().unwrap();
            assert_eq!(vertices.last(), Some(&[0.0, 4.0]));
            assert_eq!(roi.as_mask_wrapper().unwrap().state(), SyncState::Synchronized);
        }
    }
}
