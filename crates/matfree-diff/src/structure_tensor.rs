//! Structure tensor operator
//!
//! Smoothed outer products of the gradient: for each axis pair `(i, j)`
//! with `i <= j`, the component `g_sigma * (df/dx_i * df/dx_j)`. Only the
//! upper triangle is computed, in row order. The operator is quadratic in
//! its input, so it exposes `apply` only.

use matfree_core::error::{Error, Result};
use matfree_core::linop::{DynOp, Map};
use matfree_core::numeric::Scalar;
use matfree_core::shape::size;
use matfree_stencil::Scheme;

use crate::filters::gaussian;
use crate::ops::gradient;
use crate::params::{DiffConfig, DiffMethod};
use crate::unravel::DiffOp;

/// Smoothed gradient-outer-product operator
pub struct StructureTensor<T: Scalar> {
    grad: DiffOp<T>,
    smooth: Option<DynOp<T>>,
    arg_shape: Vec<usize>,
    pairs: Vec<(usize, usize)>,
    dim: usize,
}

impl<T: Scalar> StructureTensor<T> {
    /// Build a structure tensor.
    ///
    /// `method = None` defaults to central finite differences.
    /// `smooth_sigma = 0` (every axis) skips the smoothing stage.
    pub fn new(
        arg_shape: &[usize],
        method: Option<&DiffMethod>,
        smooth_sigma: &[f64],
        smooth_truncate: &[f64],
        cfg: &DiffConfig,
    ) -> Result<Self> {
        let ndim = arg_shape.len();
        let default = DiffMethod::fd_scheme(Scheme::Central);
        let grad = gradient::<T>(arg_shape, None, method.unwrap_or(&default), cfg)?;

        let smooth = if smooth_sigma.iter().all(|&s| s == 0.0) {
            None
        } else {
            let order = vec![0usize];
            Some(gaussian::<T>(
                arg_shape,
                smooth_sigma,
                smooth_truncate,
                &order,
                cfg,
            )?)
        };

        let mut pairs = Vec::with_capacity(ndim * (ndim + 1) / 2);
        for i in 0..ndim {
            for j in i..ndim {
                pairs.push((i, j));
            }
        }

        Ok(Self {
            grad,
            smooth,
            arg_shape: arg_shape.to_vec(),
            pairs,
            dim: size(arg_shape),
        })
    }

    /// Number of upper-triangular tensor components
    pub fn components(&self) -> usize {
        self.pairs.len()
    }

    pub fn arg_shape(&self) -> &[usize] {
        &self.arg_shape
    }

    /// Split flat output into per-component slices (view transform)
    pub fn unravel<'a>(&self, arr: &'a [T]) -> Result<Vec<&'a [T]>> {
        let block = self.pairs.len() * self.dim;
        if arr.is_empty() || arr.len() % block != 0 {
            return Err(Error::size_mismatch(
                "structure-tensor unravel input",
                block,
                arr.len(),
            ));
        }
        Ok(arr.chunks(self.dim).collect())
    }
}

impl<T: Scalar> Map<T> for StructureTensor<T> {
    fn dim(&self) -> usize {
        self.dim
    }

    fn codim(&self) -> usize {
        self.pairs.len() * self.dim
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        let batches = self.batch_count(arr.len(), "structure-tensor input")?;
        let n = self.dim;
        let mut out = Vec::with_capacity(batches * self.codim());
        for x in arr.chunks(n).take(batches) {
            let grad = self.grad.apply(x)?;
            let fields = self.grad.unravel(&grad)?;
            for &(i, j) in &self.pairs {
                let mut prod: Vec<T> = fields[i]
                    .iter()
                    .zip(fields[j])
                    .map(|(&a, &b)| a * b)
                    .collect();
                if let Some(smooth) = &self.smooth {
                    prod = smooth.apply(&prod)?;
                }
                out.extend_from_slice(&prod);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_component_count() {
        let cfg = DiffConfig::default();
        let st = StructureTensor::<f64>::new(&[6, 6], None, &[0.0], &[3.0], &cfg).unwrap();
        assert_eq!(st.components(), 3);
        assert_eq!(st.codim(), 3 * 36);
    }

    #[test]
    fn test_unsmoothed_tensor_of_ramp() {
        // f(r, c) = 2r + c has constant gradient (2, 1), so the tensor is
        // [[4, 2], [2, 1]] away from the boundary
        let cfg = DiffConfig::default();
        let st = StructureTensor::<f64>::new(&[8, 8], None, &[0.0], &[3.0], &cfg).unwrap();
        let x: Vec<f64> = (0..64).map(|i| (2 * (i / 8) + i % 8) as f64).collect();
        let y = st.apply(&x).unwrap();
        let parts = st.unravel(&y).unwrap();
        for r in 2..6 {
            for c in 2..6 {
                let p = r * 8 + c;
                assert_relative_eq!(parts[0][p], 4.0, max_relative = 1e-10);
                assert_relative_eq!(parts[1][p], 2.0, max_relative = 1e-10);
                assert_relative_eq!(parts[2][p], 1.0, max_relative = 1e-10);
            }
        }
    }

    #[test]
    fn test_smoothing_keeps_constant_tensor() {
        let cfg = DiffConfig {
            mode: vec![matfree_core::boundary::BoundaryMode::Edge],
            ..Default::default()
        };
        let st = StructureTensor::<f64>::new(&[24], None, &[1.5], &[2.0], &cfg).unwrap();
        // f(t) = 3t: tensor component (0,0) = 9 in the interior
        let x: Vec<f64> = (0..24).map(|i| 3.0 * i as f64).collect();
        let y = st.apply(&x).unwrap();
        for v in &y[8..16] {
            assert_relative_eq!(*v, 9.0, max_relative = 1e-8);
        }
    }
}
