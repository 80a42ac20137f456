//! Canonicalization of user-facing builder parameters
//!
//! Scalars broadcast to all selected axes; per-axis lists must have length
//! `len(axes)` or 1. `axes` defaults to all dimensions when `order` has
//! full length, and is otherwise required with matching length. Violations
//! raise construction-time errors describing the expected shape
//! relationship.

use matfree_core::boundary::BoundaryMode;
use matfree_core::error::{Error, Result};
use matfree_stencil::{Backend, Scheme};

/// Broadcast a per-axis parameter list to `n` entries (length 1 or `n`).
pub(crate) fn broadcast<P: Clone>(values: &[P], n: usize, name: &'static str) -> Result<Vec<P>> {
    match values.len() {
        1 => Ok(vec![values[0].clone(); n]),
        len if len == n => Ok(values.to_vec()),
        len => Err(Error::invalid_parameter(
            name,
            format!("must have 1 element or one per selected axis ({n}), got {len}"),
        )),
    }
}

/// Validate `axes` against `order`, defaulting to all dimensions.
pub(crate) fn resolve_axes(
    ndim: usize,
    order_len: usize,
    axes: Option<&[usize]>,
) -> Result<Vec<usize>> {
    let axes = match axes {
        Some(axes) => axes.to_vec(),
        None => {
            if order_len != ndim {
                return Err(Error::invalid_parameter(
                    "axes",
                    format!(
                        "required when `order` has {order_len} entries for a \
                         {ndim}-dimensional signal"
                    ),
                ));
            }
            (0..ndim).collect()
        }
    };
    if axes.len() != order_len {
        return Err(Error::invalid_parameter(
            "axes",
            format!(
                "must have the same number of elements as `order` \
                 ({order_len}), got {}",
                axes.len()
            ),
        ));
    }
    for &ax in &axes {
        if ax >= ndim {
            return Err(Error::invalid_parameter(
                "axes",
                format!("axis {ax} out of range for a {ndim}-dimensional signal"),
            ));
        }
    }
    Ok(axes)
}

pub(crate) fn check_positive(name: &'static str, values: &[f64]) -> Result<()> {
    for &v in values {
        if v <= 0.0 {
            return Err(Error::non_positive(name, v));
        }
    }
    Ok(())
}

/// Derivative approximation method with its per-axis parameters
#[derive(Clone, Debug)]
pub enum DiffMethod {
    /// Finite differences (scheme + accuracy per axis, length 1 broadcasts)
    FiniteDifference {
        scheme: Vec<Scheme>,
        accuracy: Vec<usize>,
    },
    /// Gaussian derivatives (sigma + truncate per axis, length 1 broadcasts)
    GaussianDerivative { sigma: Vec<f64>, truncate: Vec<f64> },
}

impl DiffMethod {
    /// Forward finite differences at accuracy 1 (the builder default)
    pub fn fd() -> Self {
        DiffMethod::FiniteDifference {
            scheme: vec![Scheme::Forward],
            accuracy: vec![1],
        }
    }

    /// Finite differences with an explicit shared scheme
    pub fn fd_scheme(scheme: Scheme) -> Self {
        DiffMethod::FiniteDifference {
            scheme: vec![scheme],
            accuracy: vec![1],
        }
    }

    /// Gaussian derivatives with a shared sigma (truncate 3.0)
    pub fn gd(sigma: f64) -> Self {
        DiffMethod::GaussianDerivative {
            sigma: vec![sigma],
            truncate: vec![3.0],
        }
    }
}

impl Default for DiffMethod {
    fn default() -> Self {
        DiffMethod::fd()
    }
}

/// Shared builder configuration: boundary handling, sampling steps,
/// execution backend, warning gate.
#[derive(Clone, Debug)]
pub struct DiffConfig {
    /// Boundary mode(s): one shared or one per axis
    pub mode: Vec<BoundaryMode>,
    /// Sampling step(s): distance between consecutive samples per axis
    pub sampling: Vec<f64>,
    /// Execution backend for every constructed stencil
    pub backend: Backend,
    /// Emit precision-mismatch warnings
    pub enable_warnings: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            mode: vec![BoundaryMode::Constant],
            sampling: vec![1.0],
            backend: Backend::Cpu,
            enable_warnings: true,
        }
    }
}

impl DiffConfig {
    pub(crate) fn modes_for(&self, ndim: usize) -> Result<Vec<BoundaryMode>> {
        broadcast(&self.mode, ndim, "mode")
    }

    pub(crate) fn sampling_for(&self, ndim: usize) -> Result<Vec<f64>> {
        let sampling = broadcast(&self.sampling, ndim, "sampling")?;
        check_positive("sampling", &sampling)?;
        Ok(sampling)
    }
}
