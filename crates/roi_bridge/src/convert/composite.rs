use tracing::debug;

use super::{ConvertService, ConverterDescriptor, Value};
use crate::{
    error::{BridgeError, Result},
    legacy::{Roi, ShapeRoi},
    mask::{CompositeMask, MaskOperator},
    types::TypeTag,
};

/// Folds an AND/OR/XOR/MINUS mask tree into one composite roi.
///
/// Each operand goes through the service on its own, so nested composites,
/// wrappers and raster fallbacks all work as operands.
pub struct CompositeFlattener<'a> {
    service: &'a ConvertService,
}

impl<'a> CompositeFlattener<'a> {
    pub fn new(service: &'a ConvertService) -> Self {
        Self { service }
    }

    /// Whether [`CompositeFlattener::flatten`] can handle `composite`.
    pub fn supports(&self, composite: &CompositeMask) -> bool {
        composite.num_dimensions() == 2
            && composite.operator().is_binary()
            && composite
                .operands()
                .iter()
                .all(|operand| self.service.supports(&Value::Mask(operand.clone()), TypeTag::Roi))
    }

    pub fn flatten(&self, composite: &CompositeMask) -> Result<ShapeRoi> {
        let operator = composite.operator();
        if !operator.is_binary() {
            return Err(BridgeError::unsupported(format!(
                "flattening a {operator} composite"
            )));
        }
        let mut shapes = composite.operands().iter().map(|operand| {
            let roi = self
                .service
                .convert_to_roi(operand.clone(), TypeTag::Roi)
                .map_err(|err| {
                    BridgeError::illegal(format!("operand of {operator} composite: {err}"))
                })?;
            ShapeRoi::from_roi(&roi.borrow())
        });
        let Some(first) = shapes.next() else {
            return Err(BridgeError::illegal(format!("{operator} composite has no operands")));
        };
        let mut result = first?;
        for shape in shapes {
            result = Self::combine(operator, &result, &shape?)?;
        }
        debug!(
            %operator,
            operands = composite.operands().len(),
            area = result.area(),
            "flattened composite"
        );
        Ok(result)
    }

    /// One fold step. MINUS subtracts from everything accumulated so far.
    pub fn combine(operator: &MaskOperator, acc: &ShapeRoi, next: &ShapeRoi) -> Result<ShapeRoi> {
        match operator {
            MaskOperator::And => Ok(acc.and(next)),
            MaskOperator::Or => Ok(acc.or(next)),
            MaskOperator::Xor => Ok(acc.xor(next)),
            MaskOperator::Minus => Ok(acc.not(next)),
            other => Err(BridgeError::unsupported(format!("combining shapes with {other}"))),
        }
    }
}

pub fn descriptor() -> ConverterDescriptor {
    ConverterDescriptor::new(
        "composite_to_shape_roi",
        TypeTag::CompositeMask,
        TypeTag::ShapeRoi,
        |service, value| {
            let composite = value
                .as_mask()
                .and_then(|mask| mask.as_composite())
                .ok_or_else(|| BridgeError::illegal("expected a composite mask"))?;
            let shape = CompositeFlattener::new(service).flatten(composite)?;
            Ok(Roi::shape(shape).into_ref().into())
        },
    )
    .lossy()
    .when(|service, value| {
        value
            .as_mask()
            .and_then(|mask| mask.as_composite())
            .is_some_and(|composite| CompositeFlattener::new(service).supports(composite))
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        geometry::RealInterval,
        legacy::RoiKind,
        mask::{AffineTransform2D, BoxMask, EllipsoidMask, MaskRef, PredicateMask},
    };

    fn square(min: f64, max: f64) -> MaskRef {
        BoxMask::new(vec![min, min], vec![max, max]).unwrap().into()
    }

    #[test]
    fn minus_subtracts_every_later_operand_from_the_first() {
        let service = ConvertService::new();
        let composite = MaskRef::combine(
            MaskOperator::Minus,
            vec![square(0.0, 10.0), square(0.0, 5.0), square(5.0, 10.0)],
        )
        .unwrap();
        let roi = service.convert_to_roi(composite, TypeTag::Roi).unwrap();
        assert_eq!(roi.kind(), RoiKind::Composite);
        let area = roi.borrow().as_shape().unwrap().area();
        assert_relative_eq!(area, 50.0, epsilon = 1e-9);
        assert!(roi.contains_point(7.5, 2.5));
        assert!(!roi.contains_point(2.5, 2.5));
    }

    #[test]
    fn nested_composites_flatten_recursively() {
        let service = ConvertService::new();
        let inner = square(0.0, 4.0).or(&square(2.0, 6.0)).unwrap();
        let outer = inner.xor(&square(3.0, 5.0)).unwrap();
        let roi = service.convert_to_roi(outer, TypeTag::ShapeRoi).unwrap();
        assert!(roi.contains_point(1.0, 1.0));
        assert!(!roi.contains_point(4.0, 4.0));
        assert!(roi.contains_point(5.5, 5.5));
    }

    #[test]
    fn negate_and_transform_are_rejected_up_front() {
        let service = ConvertService::new().without_rasterizer();
        let circle: MaskRef = EllipsoidMask::sphere(vec![0.0, 0.0], 2.0).unwrap().into();
        for composite in [
            circle.negate().unwrap(),
            circle.transform(AffineTransform2D::rotation(1.0, 0.0, 0.0)).unwrap(),
        ] {
            let value = Value::from(composite.clone());
            assert!(service.handler(&value, TypeTag::ShapeRoi).is_none());
            let flattener = CompositeFlattener::new(&service);
            let err = flattener.flatten(composite.as_composite().unwrap()).unwrap_err();
            assert!(err.is_unsupported());
        }
    }

    #[test]
    fn unconvertible_operand_blocks_flattening() {
        let service = ConvertService::new().without_rasterizer();
        let wild: MaskRef = PredicateMask::new(
            RealInterval::new(vec![0.0, 0.0], vec![4.0, 4.0]).unwrap(),
            |p| p[0] > p[1],
        )
        .into();
        let composite = square(0.0, 4.0).and(&wild).unwrap();
        let flattener = CompositeFlattener::new(&service);
        let inner = composite.as_composite().unwrap();
        assert!(!flattener.supports(inner));
        assert!(flattener.flatten(inner).unwrap_err().is_illegal_argument());

        // with the rasterizer the predicate operand becomes an image roi
        let service = ConvertService::new();
        assert!(CompositeFlattener::new(&service).supports(inner));
    }
}
