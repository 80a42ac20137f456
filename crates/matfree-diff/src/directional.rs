//! Directional derivative, gradient, Laplacian, and Hessian builders
//!
//! Directions may be constant vectors or spatially-varying unit fields;
//! both are normalized to unit norm before use. Second-order forms realize
//! the symmetric bilinear form `v1^T H v2` through the upper-triangular
//! Hessian components with doubled off-diagonal coefficients:
//! `sum_{i<=j} c_ij H_ij` with `c_ij = 2 v1_i v2_j` for `i != j`.

use matfree_core::error::{Error, Result};
use matfree_core::linop::{block_diag, compose, sum_axes, vstack, DynOp, Homothety};
use matfree_core::numeric::Scalar;
use matfree_core::shape::size;

use crate::ops::{gradient, hessian, HessianDirections};
use crate::params::{DiffConfig, DiffMethod};
use crate::unravel::DiffOp;

/// A derivative direction: one constant vector or one vector per position
#[derive(Clone, Debug)]
pub enum Directions<T: Scalar> {
    /// A single direction shared by every position (length `D`)
    Constant(Vec<T>),
    /// Per-axis fields of length `prod(arg_shape)` (outer length `D`)
    Varying(Vec<Vec<T>>),
}

impl<T: Scalar> Directions<T> {
    /// Unit-normalized per-axis fields of length `n`.
    ///
    /// Spatially-varying positions with zero norm stay zero.
    fn normalized(&self, ndim: usize, n: usize) -> Result<Vec<Vec<T>>> {
        match self {
            Directions::Constant(v) => {
                if v.len() != ndim {
                    return Err(Error::size_mismatch("directions", ndim, v.len()));
                }
                let norm = v.iter().map(|&c| c.as_f64().powi(2)).sum::<f64>().sqrt();
                if norm == 0.0 {
                    return Err(Error::invalid_parameter(
                        "directions",
                        "must have non-zero norm",
                    ));
                }
                Ok(v.iter()
                    .map(|&c| vec![T::of_f64(c.as_f64() / norm); n])
                    .collect())
            }
            Directions::Varying(fields) => {
                if fields.len() != ndim {
                    return Err(Error::size_mismatch("directions", ndim, fields.len()));
                }
                if fields.iter().any(|f| f.len() != n) {
                    return Err(Error::InvalidInput(format!(
                        "spatially-varying directions must have {n} entries per axis"
                    )));
                }
                let mut out = vec![vec![T::zero(); n]; ndim];
                for p in 0..n {
                    let norm = fields
                        .iter()
                        .map(|f| f[p].as_f64().powi(2))
                        .sum::<f64>()
                        .sqrt();
                    if norm > 0.0 {
                        for (d, f) in fields.iter().enumerate() {
                            out[d][p] = T::of_f64(f[p].as_f64() / norm);
                        }
                    }
                }
                Ok(out)
            }
        }
    }
}

/// Upper-triangular bilinear coefficients `c_ij` for `v1^T H v2`, flattened
/// in pair row order; off-diagonal entries are doubled.
fn bilinear_coeffs<T: Scalar>(v1: &[Vec<T>], v2: &[Vec<T>], n: usize) -> Vec<T> {
    let ndim = v1.len();
    let mut diag = Vec::with_capacity(ndim * (ndim + 1) / 2 * n);
    for i in 0..ndim {
        for j in i..ndim {
            let two = if i == j { T::one() } else { T::of_f64(2.0) };
            for p in 0..n {
                diag.push(two * v1[i][p] * v2[j][p]);
            }
        }
    }
    diag
}

fn diag_op<T: Scalar>(diag: Vec<T>) -> Result<DynOp<T>> {
    Ok(Homothety::diagonal(diag)?.into_dyn())
}

/// First- or second-order derivative along one direction (or a direction
/// pair for the second order).
pub fn directional_derivative<T: Scalar>(
    arg_shape: &[usize],
    directions: &[Directions<T>],
    order: usize,
    method: Option<&DiffMethod>,
    cfg: &DiffConfig,
) -> Result<DiffOp<T>> {
    let ndim = arg_shape.len();
    let n = size(arg_shape);
    match order {
        1 => {
            let [dir] = directions else {
                return Err(Error::invalid_parameter(
                    "directions",
                    "first-order directional derivatives take exactly one direction",
                ));
            };
            let fields = dir.normalized(ndim, n)?;
            let default = DiffMethod::fd();
            let grad = gradient::<T>(arg_shape, None, method.unwrap_or(&default), cfg)?;
            let diag = diag_op(fields.concat())?;
            let op = compose(sum_axes::<T>(ndim, n), compose(diag, grad.as_dyn())?)?;
            Ok(DiffOp::new(op, arg_shape, 1))
        }
        2 => {
            let (v1, v2) = match directions {
                [v] => (v, v),
                [v1, v2] => (v1, v2),
                _ => {
                    return Err(Error::invalid_parameter(
                        "directions",
                        "second-order directional derivatives take one or two directions",
                    ))
                }
            };
            let f1 = v1.normalized(ndim, n)?;
            let f2 = v2.normalized(ndim, n)?;
            let hess = hessian::<T>(arg_shape, HessianDirections::All, method, cfg)?;
            let npairs = hess.components();
            let diag = diag_op(bilinear_coeffs(&f1, &f2, n))?;
            let op = compose(sum_axes::<T>(npairs, n), compose(diag, hess.as_dyn())?)?;
            Ok(DiffOp::new(op, arg_shape, 1))
        }
        _ => Err(Error::invalid_parameter(
            "order",
            format!("must be 1 or 2, got {order}"),
        )),
    }
}

/// Stack of first-order directional derivatives, one per direction
pub fn directional_gradient<T: Scalar>(
    arg_shape: &[usize],
    directions: &[Directions<T>],
    method: Option<&DiffMethod>,
    cfg: &DiffConfig,
) -> Result<DiffOp<T>> {
    if directions.is_empty() {
        return Err(Error::invalid_parameter(
            "directions",
            "must contain at least one direction",
        ));
    }
    let ndim = arg_shape.len();
    let n = size(arg_shape);
    let default = DiffMethod::fd();
    let grad = gradient::<T>(arg_shape, None, method.unwrap_or(&default), cfg)?;

    let mut diags: Vec<DynOp<T>> = Vec::with_capacity(directions.len());
    for dir in directions {
        let fields = dir.normalized(ndim, n)?;
        diags.push(diag_op(fields.concat())?);
    }
    let m = directions.len();
    let stacked = vstack(diags)?;
    let reduce = block_diag(vec![sum_axes::<T>(ndim, n); m])?;
    let op = compose(reduce, compose(stacked, grad.as_dyn())?)?;
    Ok(DiffOp::new(op, arg_shape, m))
}

/// Sum of second-order directional derivatives along multiple directions,
/// with optional per-direction weights.
pub fn directional_laplacian<T: Scalar>(
    arg_shape: &[usize],
    directions: &[Directions<T>],
    weights: Option<&[T]>,
    method: Option<&DiffMethod>,
    cfg: &DiffConfig,
) -> Result<DiffOp<T>> {
    if directions.is_empty() {
        return Err(Error::invalid_parameter(
            "directions",
            "must contain at least one direction",
        ));
    }
    if let Some(w) = weights {
        if w.len() != directions.len() {
            return Err(Error::size_mismatch(
                "weights vs directions",
                directions.len(),
                w.len(),
            ));
        }
    }
    let ndim = arg_shape.len();
    let n = size(arg_shape);
    let hess = hessian::<T>(arg_shape, HessianDirections::All, method, cfg)?;
    let npairs = hess.components();

    let mut diags: Vec<DynOp<T>> = Vec::with_capacity(directions.len());
    for (k, dir) in directions.iter().enumerate() {
        let fields = dir.normalized(ndim, n)?;
        let mut coeffs = bilinear_coeffs(&fields, &fields, n);
        if let Some(w) = weights {
            for c in &mut coeffs {
                *c = *c * w[k];
            }
        }
        diags.push(diag_op(coeffs)?);
    }
    let m = directions.len();
    let stacked = vstack(diags)?;
    let op = compose(sum_axes::<T>(m * npairs, n), compose(stacked, hess.as_dyn())?)?;
    Ok(DiffOp::new(op, arg_shape, 1))
}

/// Stack of second-order directional derivatives over the upper-triangular
/// direction pairs `(v_i, v_j)`, `i <= j`.
pub fn directional_hessian<T: Scalar>(
    arg_shape: &[usize],
    directions: &[Directions<T>],
    method: Option<&DiffMethod>,
    cfg: &DiffConfig,
) -> Result<DiffOp<T>> {
    if directions.is_empty() {
        return Err(Error::invalid_parameter(
            "directions",
            "must contain at least one direction",
        ));
    }
    let ndim = arg_shape.len();
    let n = size(arg_shape);
    let hess = hessian::<T>(arg_shape, HessianDirections::All, method, cfg)?;
    let npairs = hess.components();

    let fields: Vec<Vec<Vec<T>>> = directions
        .iter()
        .map(|d| d.normalized(ndim, n))
        .collect::<Result<_>>()?;

    let mut diags: Vec<DynOp<T>> = Vec::new();
    for i1 in 0..fields.len() {
        for i2 in i1..fields.len() {
            diags.push(diag_op(bilinear_coeffs(&fields[i1], &fields[i2], n))?);
        }
    }
    let m_pairs = diags.len();
    let stacked = vstack(diags)?;
    let reduce = block_diag(vec![sum_axes::<T>(npairs, n); m_pairs])?;
    let op = compose(reduce, compose(stacked, hess.as_dyn())?)?;
    Ok(DiffOp::new(op, arg_shape, m_pairs))
}
