//! Scalar trait for generic operator arithmetic
//!
//! Operators in this workspace are generic over the working floating-point
//! type. The [`Scalar`] trait pins down exactly what the stencil loops and
//! combinators need: float arithmetic, lossless conversion through `f64`
//! (kernel coefficients are derived in double precision), and `Pod` so
//! buffers can be handed to compute devices without copying.

use bytemuck::Pod;
use num_traits::{Float, FromPrimitive, NumAssign, ToPrimitive};
use std::fmt::Debug;
use std::iter::Sum;

use crate::precision::Precision;

/// Floating-point scalar usable as an operator's working precision
pub trait Scalar:
    Float
    + NumAssign
    + FromPrimitive
    + ToPrimitive
    + Sum
    + Pod
    + Debug
    + Send
    + Sync
    + 'static
{
    /// Precision class of this scalar type
    const PRECISION: Precision;

    /// Lossy conversion from `f64` (kernel coefficients are solved in f64)
    fn of_f64(v: f64) -> Self;

    /// Widening conversion to `f64`
    fn as_f64(self) -> f64;
}

impl Scalar for f32 {
    const PRECISION: Precision = Precision::Single;

    #[inline]
    fn of_f64(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Scalar for f64 {
    const PRECISION: Precision = Precision::Double;

    #[inline]
    fn of_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        assert_eq!(f64::of_f64(1.5), 1.5);
        assert_eq!(f32::of_f64(1.5), 1.5f32);
        assert_eq!(1.5f32.as_f64(), 1.5);
    }

    #[test]
    fn test_precision_tags() {
        assert_eq!(<f32 as Scalar>::PRECISION, Precision::Single);
        assert_eq!(<f64 as Scalar>::PRECISION, Precision::Double);
    }
}
