use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::MaskRef;
use crate::{
    error::{BridgeError, Result},
    geometry::RealInterval,
};

/// A 2-D affine map `p -> A p + t`, stored row-major as `[[a, b, tx], [c, d, ty]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AffineTransform2D {
    matrix: [[f64; 3]; 2],
}

impl AffineTransform2D {
    pub fn new(matrix: [[f64; 3]; 2]) -> Self {
        Self { matrix }
    }

    pub fn identity() -> Self {
        Self::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
    }

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::new([[1.0, 0.0, dx], [0.0, 1.0, dy]])
    }

    /// Rotation by `angle` radians about `(cx, cy)`.
    pub fn rotation(angle: f64, cx: f64, cy: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new([
            [cos, -sin, cx - cos * cx + sin * cy],
            [sin, cos, cy - sin * cx - cos * cy],
        ])
    }

    pub fn apply(&self, point: [f64; 2]) -> [f64; 2] {
        let [[a, b, tx], [c, d, ty]] = self.matrix;
        [a * point[0] + b * point[1] + tx, c * point[0] + d * point[1] + ty]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MaskOperator {
    And,
    Or,
    Xor,
    /// First operand minus every other operand.
    Minus,
    Negate,
    /// Tests the operand at the transformed position.
    Transform(AffineTransform2D),
}

impl MaskOperator {
    /// Operators the composite flattener can fold.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Xor | Self::Minus)
    }
}

/// A boolean tree node over other masks.
#[derive(Debug)]
pub struct CompositeMask {
    operator: MaskOperator,
    operands: Vec<MaskRef>,
    dims: usize,
}

impl CompositeMask {
    pub fn new(operator: MaskOperator, operands: Vec<MaskRef>) -> Result<Self> {
        let Some(first) = operands.first() else {
            return Err(BridgeError::illegal(format!("{operator} needs at least one operand")));
        };
        let dims = first.num_dimensions();
        if let Some(other) = operands.iter().find(|o| o.num_dimensions() != dims) {
            return Err(BridgeError::illegal(format!(
                "cannot combine {dims}-dimensional and {}-dimensional masks",
                other.num_dimensions()
            )));
        }
        match operator {
            MaskOperator::Negate | MaskOperator::Transform(_) if operands.len() != 1 => {
                return Err(BridgeError::illegal(format!(
                    "{operator} takes exactly one operand, got {}",
                    operands.len()
                )));
            }
            MaskOperator::Transform(_) if dims != 2 => {
                return Err(BridgeError::illegal("affine transforms apply to 2-D masks only"));
            }
            _ => {}
        }
        Ok(Self {
            operator,
            operands,
            dims,
        })
    }

    pub fn operator(&self) -> &MaskOperator {
        &self.operator
    }

    pub fn operands(&self) -> &[MaskRef] {
        &self.operands
    }

    pub fn num_dimensions(&self) -> usize {
        self.dims
    }

    pub fn test(&self, point: &[f64]) -> bool {
        let mut operands = self.operands.iter();
        match &self.operator {
            MaskOperator::And => operands.all(|o| o.test(point)),
            MaskOperator::Or => operands.any(|o| o.test(point)),
            MaskOperator::Xor => operands.filter(|o| o.test(point)).count() % 2 == 1,
            MaskOperator::Minus => {
                operands.next().is_some_and(|first| first.test(point))
                    && !operands.any(|o| o.test(point))
            }
            MaskOperator::Negate => !self.operands[0].test(point),
            MaskOperator::Transform(transform) => match point {
                [x, y] => self.operands[0].test(&transform.apply([*x, *y])),
                _ => false,
            },
        }
    }

    pub fn bounds(&self) -> RealInterval {
        let mut bounds = self.operands.iter().map(MaskRef::bounds);
        let Some(first) = bounds.next() else {
            return RealInterval::unbounded(self.dims);
        };
        match self.operator {
            MaskOperator::And => bounds.fold(first, |acc, b| acc.intersect(&b)),
            MaskOperator::Or | MaskOperator::Xor => bounds.fold(first, |acc, b| acc.union(&b)),
            MaskOperator::Minus => first,
            MaskOperator::Negate | MaskOperator::Transform(_) => RealInterval::unbounded(self.dims),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{BoxMask, EllipsoidMask};
    use approx::assert_relative_eq;

    fn square(min: f64, max: f64) -> MaskRef {
        BoxMask::new(vec![min, min], vec![max, max]).unwrap().into()
    }

    #[test]
    fn xor_is_parity() {
        let xor = CompositeMask::new(
            MaskOperator::Xor,
            vec![square(0.0, 10.0), square(5.0, 15.0), square(8.0, 20.0)],
        )
        .unwrap();
        assert!(xor.test(&[1.0, 1.0]));
        assert!(!xor.test(&[6.0, 6.0]));
        assert!(xor.test(&[9.0, 9.0]));
        assert_eq!(xor.bounds().max(), &[20.0, 20.0]);
    }

    #[test]
    fn minus_removes_every_later_operand() {
        let minus = CompositeMask::new(
            MaskOperator::Minus,
            vec![square(0.0, 10.0), square(0.0, 2.0), square(8.0, 10.0)],
        )
        .unwrap();
        assert!(minus.test(&[5.0, 5.0]));
        assert!(!minus.test(&[1.0, 1.0]));
        assert!(!minus.test(&[9.0, 9.0]));
        assert_eq!(minus.bounds().min(), &[0.0, 0.0]);
    }

    #[test]
    fn transform_tests_through_map() {
        let circle: MaskRef = EllipsoidMask::sphere(vec![10.0, 0.0], 1.0).unwrap().into();
        let moved = CompositeMask::new(
            MaskOperator::Transform(AffineTransform2D::translation(10.0, 0.0)),
            vec![circle],
        )
        .unwrap();
        assert!(moved.test(&[0.0, 0.0]));
        assert!(!moved.test(&[10.0, 0.0]));
        assert!(!moved.bounds().is_bounded());
    }

    #[test]
    fn rotation_turns_about_its_center() {
        let rotation = AffineTransform2D::rotation(std::f64::consts::FRAC_PI_2, 3.0, -2.0);
        let [x, y] = rotation.apply([4.0, -2.0]);
        assert_relative_eq!(x, 3.0, epsilon = 1e-9);
        assert_relative_eq!(y, -1.0, epsilon = 1e-9);
        let [cx, cy] = rotation.apply([3.0, -2.0]);
        assert_relative_eq!(cx, 3.0, epsilon = 1e-9);
        assert_relative_eq!(cy, -2.0, epsilon = 1e-9);
    }

    #[test]
    fn mismatched_operands_rejected() {
        let flat: MaskRef = BoxMask::new(vec![0.0], vec![1.0]).unwrap().into();
        assert!(CompositeMask::new(MaskOperator::Or, vec![square(0.0, 1.0), flat]).is_err());
        assert!(CompositeMask::new(MaskOperator::And, vec![]).is_err());
        assert!(
            CompositeMask::new(MaskOperator::Negate, vec![square(0.0, 1.0), square(1.0, 2.0)])
                .is_err()
        );
    }
}
