//! Gradient, Jacobian, Divergence, Hessian, and Laplacian builders

use std::sync::Arc;

use matfree_core::error::{Error, Result};
use matfree_core::linop::{block_diag, compose, sum_axes, vstack, DynOp};
use matfree_core::numeric::Scalar;
use matfree_core::shape::size;
use matfree_stencil::Scheme;

use crate::params::{DiffConfig, DiffMethod};
use crate::partial::PartialDerivative;
use crate::unravel::DiffOp;

fn validate_directions(arg_shape: &[usize], directions: Option<&[usize]>) -> Result<Vec<usize>> {
    let ndim = arg_shape.len();
    let dirs = match directions {
        Some(d) => d.to_vec(),
        None => (0..ndim).collect(),
    };
    if dirs.is_empty() {
        return Err(Error::invalid_parameter(
            "directions",
            "must select at least one axis",
        ));
    }
    for &d in &dirs {
        if d >= ndim {
            return Err(Error::invalid_parameter(
                "directions",
                format!("axis {d} out of range for a {ndim}-dimensional signal"),
            ));
        }
    }
    Ok(dirs)
}

/// First-order partial derivatives stacked along each selected direction.
///
/// Output components follow the order of `directions` (all axes when
/// `None`); `unravel` reshapes to `[n_dirs, *arg_shape]`.
pub fn gradient<T: Scalar>(
    arg_shape: &[usize],
    directions: Option<&[usize]>,
    method: &DiffMethod,
    cfg: &DiffConfig,
) -> Result<DiffOp<T>> {
    let dirs = validate_directions(arg_shape, directions)?;
    let mut parts: Vec<DynOp<T>> = Vec::with_capacity(dirs.len());
    for &d in &dirs {
        let mut order = vec![0usize; arg_shape.len()];
        order[d] = 1;
        let stencil = PartialDerivative::build::<T>(arg_shape, &order, method, cfg)?;
        parts.push(Arc::new(stencil));
    }
    let op = vstack(parts)?;
    Ok(DiffOp::new(op, arg_shape, dirs.len()))
}

/// Per-channel gradient of a vector-valued signal, block-diagonal over
/// channels. `unravel` reshapes to `[n_channels * n_dirs, *arg_shape]`.
pub fn jacobian<T: Scalar>(
    arg_shape: &[usize],
    n_channels: usize,
    directions: Option<&[usize]>,
    method: &DiffMethod,
    cfg: &DiffConfig,
) -> Result<DiffOp<T>> {
    if n_channels == 0 {
        return Err(Error::invalid_parameter(
            "n_channels",
            "must be at least 1",
        ));
    }
    let grad = gradient::<T>(arg_shape, directions, method, cfg)?;
    let components = n_channels * grad.components();
    let op = if n_channels > 1 {
        block_diag(vec![grad.as_dyn(); n_channels])?
    } else {
        grad.as_dyn()
    };
    Ok(DiffOp::new(op, arg_shape, components))
}

/// Swap forward and backward schemes; central is unchanged.
fn swap_schemes(method: &DiffMethod) -> DiffMethod {
    match method {
        DiffMethod::FiniteDifference { scheme, accuracy } => DiffMethod::FiniteDifference {
            scheme: scheme
                .iter()
                .map(|s| match s {
                    Scheme::Forward => Scheme::Backward,
                    Scheme::Backward => Scheme::Forward,
                    Scheme::Central => Scheme::Central,
                })
                .collect(),
            accuracy: accuracy.clone(),
        },
        gd => gd.clone(),
    }
}

/// Divergence of a stacked vector field: the adjoint of the gradient, with
/// the finite-difference scheme swapped (forward divergence applies the
/// backward-scheme gradient and vice versa) so that `div = -grad*` holds
/// under the forward/backward discretization asymmetry.
pub fn divergence<T: Scalar>(
    arg_shape: &[usize],
    directions: Option<&[usize]>,
    method: &DiffMethod,
    cfg: &DiffConfig,
) -> Result<DiffOp<T>> {
    let dirs = validate_directions(arg_shape, directions)?;
    let method = swap_schemes(method);
    let n = size(arg_shape);

    let mut per_dir: Vec<DynOp<T>> = Vec::with_capacity(dirs.len());
    for &d in &dirs {
        let grad = gradient::<T>(arg_shape, Some(&[d]), &method, cfg)?;
        per_dir.push(grad.as_dyn());
    }
    let stacked = block_diag(per_dir)?;
    let op = compose(sum_axes::<T>(dirs.len(), n), stacked)?;
    Ok(DiffOp::new(op, arg_shape, 1))
}

/// Which second-order derivatives a Hessian computes
#[derive(Clone, Debug)]
pub enum HessianDirections {
    /// The full upper triangle `(0,0), (0,1), ..., (D-1,D-1)` in row order
    All,
    /// A single pure second derivative `d^2/dx_i^2`
    Axis(usize),
    /// One mixed derivative `d^2/dx_i dx_j`
    Pair(usize, usize),
    /// An explicit list of `(i, j)` pairs
    List(Vec<(usize, usize)>),
}

impl HessianDirections {
    fn canonical(&self, ndim: usize) -> Result<Vec<(usize, usize)>> {
        let check = |i: usize, j: usize| -> Result<(usize, usize)> {
            if i >= ndim || j >= ndim {
                return Err(Error::invalid_parameter(
                    "directions",
                    format!("pair ({i}, {j}) out of range for a {ndim}-dimensional signal"),
                ));
            }
            Ok((i.min(j), i.max(j)))
        };
        match self {
            HessianDirections::All => {
                let mut pairs = Vec::new();
                for i in 0..ndim {
                    for j in i..ndim {
                        pairs.push((i, j));
                    }
                }
                Ok(pairs)
            }
            HessianDirections::Axis(i) => Ok(vec![check(*i, *i)?]),
            HessianDirections::Pair(i, j) => Ok(vec![check(*i, *j)?]),
            HessianDirections::List(pairs) => {
                if pairs.is_empty() {
                    return Err(Error::invalid_parameter(
                        "directions",
                        "must contain at least one pair",
                    ));
                }
                pairs.iter().map(|&(i, j)| check(i, j)).collect()
            }
        }
    }
}

/// Second-order partial derivatives stacked per direction pair.
///
/// With `method = None`, finite differences are used with the central
/// scheme for pure second-order (diagonal) terms and the forward scheme
/// for mixed terms; an explicit method applies to every pair unchanged.
pub fn hessian<T: Scalar>(
    arg_shape: &[usize],
    directions: HessianDirections,
    method: Option<&DiffMethod>,
    cfg: &DiffConfig,
) -> Result<DiffOp<T>> {
    let ndim = arg_shape.len();
    let pairs = directions.canonical(ndim)?;

    let mut parts: Vec<DynOp<T>> = Vec::with_capacity(pairs.len());
    for &(i, j) in &pairs {
        let mut order = vec![0usize; ndim];
        let pair_method = match method {
            Some(m) => m.clone(),
            None => {
                // unspecified scheme: central for the diagonal, forward for
                // mixed terms
                let scheme = if i == j { Scheme::Central } else { Scheme::Forward };
                DiffMethod::fd_scheme(scheme)
            }
        };
        if i == j {
            order[i] = 2;
        } else {
            order[i] = 1;
            order[j] = 1;
        }
        let stencil = PartialDerivative::build::<T>(arg_shape, &order, &pair_method, cfg)?;
        parts.push(Arc::new(stencil));
    }
    let op = vstack(parts)?;
    Ok(DiffOp::new(op, arg_shape, pairs.len()))
}

/// Sum of pure second-order partial derivatives across the selected
/// directions. With `method = None`, finite differences default to the
/// central scheme at accuracy 2.
pub fn laplacian<T: Scalar>(
    arg_shape: &[usize],
    directions: Option<&[usize]>,
    method: Option<&DiffMethod>,
    cfg: &DiffConfig,
) -> Result<DiffOp<T>> {
    let dirs = validate_directions(arg_shape, directions)?;
    let pairs: Vec<(usize, usize)> = dirs.iter().map(|&d| (d, d)).collect();
    let default_method = DiffMethod::FiniteDifference {
        scheme: vec![Scheme::Central],
        accuracy: vec![2],
    };
    let method = method.cloned().unwrap_or(default_method);

    let hess = hessian::<T>(
        arg_shape,
        HessianDirections::List(pairs),
        Some(&method),
        cfg,
    )?;
    let n = size(arg_shape);
    let op = compose(sum_axes::<T>(dirs.len(), n), hess.as_dyn())?;
    Ok(DiffOp::new(op, arg_shape, 1))
}
