//! Composite operator with component-shape helpers
//!
//! [`DiffOp`] wraps a composite linear operator together with the signal
//! shape and the number of stacked output components, and attaches the
//! `unravel`/`ravel` pair that reinterprets flat composite output as
//! `[n_components, *arg_shape]`. These helpers are pure view transforms:
//! they never change `apply`/`adjoint` semantics.

use matfree_core::error::{Error, Result};
use matfree_core::linop::{DynOp, LinOp, Map};
use matfree_core::numeric::Scalar;
use matfree_core::shape::size;

/// A composite differential operator with component bookkeeping
pub struct DiffOp<T: Scalar> {
    op: DynOp<T>,
    arg_shape: Vec<usize>,
    components: usize,
}

impl<T: Scalar> DiffOp<T> {
    pub(crate) fn new(op: DynOp<T>, arg_shape: &[usize], components: usize) -> Self {
        debug_assert_eq!(op.codim() % (components * size(arg_shape)), 0);
        Self {
            op,
            arg_shape: arg_shape.to_vec(),
            components,
        }
    }

    /// Shape of one unbatched signal
    pub fn arg_shape(&self) -> &[usize] {
        &self.arg_shape
    }

    /// Number of stacked output components per signal
    pub fn components(&self) -> usize {
        self.components
    }

    /// Logical output shape of one signal: `[n_components, *arg_shape]`
    pub fn output_shape(&self) -> Vec<usize> {
        let mut shape = vec![self.components];
        shape.extend_from_slice(&self.arg_shape);
        shape
    }

    /// The underlying composite operator
    pub fn as_dyn(&self) -> DynOp<T> {
        self.op.clone()
    }

    /// Split flat composite output into per-component slices.
    ///
    /// For batched output the slices come back in `(batch, component)`
    /// row-major order, each of length `prod(arg_shape)`.
    pub fn unravel<'a>(&self, arr: &'a [T]) -> Result<Vec<&'a [T]>> {
        let n = size(&self.arg_shape);
        let block = self.components * n;
        if arr.is_empty() || arr.len() % block != 0 {
            return Err(Error::size_mismatch("unravel input", block, arr.len()));
        }
        Ok(arr.chunks(n).collect())
    }

    /// Concatenate per-component slices back into a flat buffer
    pub fn ravel(&self, parts: &[&[T]]) -> Result<Vec<T>> {
        let n = size(&self.arg_shape);
        if parts.len() % self.components != 0 || parts.iter().any(|p| p.len() != n) {
            return Err(Error::InvalidInput(format!(
                "ravel expects groups of {} slices of length {n}",
                self.components
            )));
        }
        Ok(parts.concat())
    }
}

impl<T: Scalar> Map<T> for DiffOp<T> {
    fn dim(&self) -> usize {
        self.op.dim()
    }

    fn codim(&self) -> usize {
        self.op.codim()
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        self.op.apply(arr)
    }
}

impl<T: Scalar> LinOp<T> for DiffOp<T> {
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>> {
        self.op.adjoint(arr)
    }

    fn lipschitz(&self) -> f64 {
        self.op.lipschitz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matfree_core::linop::Homothety;

    #[test]
    fn test_unravel_ravel_roundtrip() {
        let inner = Homothety::<f64>::identity(6).into_dyn();
        let op = DiffOp::new(inner, &[3], 2);
        assert_eq!(op.output_shape(), vec![2, 3]);

        let flat = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let parts = op.unravel(&flat).unwrap();
        assert_eq!(parts, vec![&flat[..3], &flat[3..]]);
        assert_eq!(op.ravel(&parts).unwrap(), flat);

        assert!(op.unravel(&flat[..4]).is_err());
    }
}
