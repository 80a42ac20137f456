//! Explicit precision bookkeeping
//!
//! The working precision of an operator is the dtype of its kernel, fixed at
//! construction. Callers holding data in a different width go through the
//! coercion helpers here, which cast and emit a categorized warning under
//! the [`WARN_TARGET`] log target so the category can be filtered or
//! silenced wholesale. There is no process-wide precision state: precision
//! is a value, resolved from the scalar type parameter.

use crate::numeric::Scalar;

/// Log target for precision-mismatch warnings
pub const WARN_TARGET: &str = "matfree::precision";

/// Floating-point precision class
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    /// 32-bit floats
    Single,
    /// 64-bit floats
    Double,
}

impl Precision {
    /// Precision of a scalar type
    pub fn of<T: Scalar>() -> Self {
        T::PRECISION
    }

    /// Width in bits
    pub fn bits(self) -> u32 {
        match self {
            Precision::Single => 32,
            Precision::Double => 64,
        }
    }

    /// Short dtype name, matching the Rust primitive
    pub fn name(self) -> &'static str {
        match self {
            Precision::Single => "f32",
            Precision::Double => "f64",
        }
    }
}

/// Coerce an `f64` buffer to the working precision `T`.
///
/// Emits a precision-mismatch warning (once per call site invocation) when
/// the cast narrows and `warn` is set. The computation proceeds with the
/// cast values either way.
pub fn coerce_from_f64<T: Scalar>(arr: &[f64], warn: bool) -> Vec<T> {
    if warn && T::PRECISION != Precision::Double {
        log::warn!(
            target: WARN_TARGET,
            "input precision f64 differs from operator precision {}; casting",
            T::PRECISION.name()
        );
    }
    arr.iter().map(|&v| T::of_f64(v)).collect()
}

/// Widen a buffer of working precision `T` to `f64`
pub fn promote_to_f64<T: Scalar>(arr: &[T]) -> Vec<f64> {
    arr.iter().map(|&v| v.as_f64()).collect()
}
