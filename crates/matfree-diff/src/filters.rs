//! Separable filter builders: smoothing, band-pass, and edge filters
//!
//! All filters are correlation stencils; derivative taps are already
//! correlation-oriented (`[-1, 0, 1]` differentiates without re-flipping).
//! Multi-axis edge filters return the gradient-magnitude map, which is not
//! linear; the single-axis forms stay linear operators.

use std::sync::Arc;

use matfree_core::error::{Error, Result};
use matfree_core::linop::{add, scale, sub, DynOp, Map};
use matfree_core::numeric::Scalar;
use matfree_core::shape::size;
use matfree_stencil::{gaussian_derivative, Kernel1d, KernelSpec, Stencil};

use crate::params::{broadcast, check_positive, DiffConfig};

/// Multidimensional moving-average (uniform) filter.
///
/// Odd sizes infer the central tap; even sizes require an explicit
/// `center`. The kernel is separable with a `1 / prod(size)` scaling.
pub fn moving_average<T: Scalar>(
    arg_shape: &[usize],
    sizes: &[usize],
    center: Option<&[usize]>,
    cfg: &DiffConfig,
) -> Result<DynOp<T>> {
    let ndim = arg_shape.len();
    let sizes = broadcast(sizes, ndim, "size")?;
    if sizes.contains(&0) {
        return Err(Error::invalid_parameter("size", "must be at least 1"));
    }
    let centers: Vec<usize> = match center {
        Some(c) => {
            if c.len() != ndim {
                return Err(Error::size_mismatch("center", ndim, c.len()));
            }
            c.to_vec()
        }
        None => {
            if sizes.iter().any(|s| s % 2 == 0) {
                return Err(Error::invalid_parameter(
                    "center",
                    "required for even kernel sizes; only odd sizes infer a center",
                ));
            }
            sizes.iter().map(|s| s / 2).collect()
        }
    };
    let modes = cfg.modes_for(ndim)?;

    let kernels: Vec<Kernel1d<T>> = sizes
        .iter()
        .zip(&centers)
        .map(|(&s, &c)| Kernel1d::new(vec![T::one(); s], c))
        .collect::<Result<_>>()?;
    let stencil = Stencil::with_backend(
        arg_shape,
        KernelSpec::separable(kernels)?,
        &modes,
        cfg.backend,
    )?
    .enable_warnings(cfg.enable_warnings);

    let total: usize = sizes.iter().product();
    Ok(scale(T::of_f64(1.0 / total as f64), Arc::new(stencil)))
}

/// Multidimensional Gaussian (derivative) filter.
///
/// `sigma` is in physical units; an entry of `0` disables filtering along
/// that axis. `order = 0` yields the normalized smoothing kernel.
pub fn gaussian<T: Scalar>(
    arg_shape: &[usize],
    sigma: &[f64],
    truncate: &[f64],
    order: &[usize],
    cfg: &DiffConfig,
) -> Result<DynOp<T>> {
    let ndim = arg_shape.len();
    let sigma = broadcast(sigma, ndim, "sigma")?;
    let truncate = broadcast(truncate, ndim, "truncate")?;
    let order = broadcast(order, ndim, "order")?;
    let sampling = cfg.sampling_for(ndim)?;
    let modes = cfg.modes_for(ndim)?;
    if sigma.iter().any(|&s| s < 0.0) {
        return Err(Error::invalid_parameter("sigma", "must be non-negative"));
    }

    let kernels: Vec<Kernel1d<T>> = (0..ndim)
        .map(|ax| {
            if sigma[ax] == 0.0 {
                Ok(Kernel1d::identity())
            } else {
                gaussian_derivative(order[ax], sigma[ax], truncate[ax], sampling[ax])
            }
        })
        .collect::<Result<_>>()?;

    let stencil = Stencil::with_backend(
        arg_shape,
        KernelSpec::separable(kernels)?,
        &modes,
        cfg.backend,
    )?
    .enable_warnings(cfg.enable_warnings);
    Ok(Arc::new(stencil))
}

/// Difference-of-Gaussians band-pass filter.
///
/// `high_sigma` defaults to `1.6 * low_sigma` per axis.
pub fn difference_of_gaussians<T: Scalar>(
    arg_shape: &[usize],
    low_sigma: &[f64],
    high_sigma: Option<&[f64]>,
    low_truncate: &[f64],
    high_truncate: &[f64],
    cfg: &DiffConfig,
) -> Result<DynOp<T>> {
    let ndim = arg_shape.len();
    let low_sigma = broadcast(low_sigma, ndim, "low_sigma")?;
    let high_sigma = match high_sigma {
        Some(h) => broadcast(h, ndim, "high_sigma")?,
        None => low_sigma.iter().map(|&s| s * 1.6).collect(),
    };
    check_positive("low_sigma", &low_sigma)?;
    check_positive("high_sigma", &high_sigma)?;
    let order = vec![0usize];

    let op_low = gaussian::<T>(arg_shape, &low_sigma, low_truncate, &order, cfg)?;
    let op_high = gaussian::<T>(arg_shape, &high_sigma, high_truncate, &order, cfg)?;
    sub(op_low, op_high)
}

/// Discrete Laplace filter: the sum of per-axis `[1, -2, 1] / h` stencils.
pub fn laplace<T: Scalar>(arg_shape: &[usize], cfg: &DiffConfig) -> Result<DynOp<T>> {
    let ndim = arg_shape.len();
    let sampling = cfg.sampling_for(ndim)?;
    let modes = cfg.modes_for(ndim)?;

    let mut total: Option<DynOp<T>> = None;
    for ax in 0..ndim {
        let mut kernels: Vec<Kernel1d<T>> = vec![Kernel1d::identity(); ndim];
        kernels[ax] = Kernel1d::new(
            [1.0, -2.0, 1.0]
                .iter()
                .map(|&t| T::of_f64(t / sampling[ax]))
                .collect(),
            1,
        )?;
        let stencil: DynOp<T> = Arc::new(
            Stencil::with_backend(
                arg_shape,
                KernelSpec::separable(kernels)?,
                &modes,
                cfg.backend,
            )?
            .enable_warnings(cfg.enable_warnings),
        );
        total = Some(match total {
            Some(acc) => add(acc, stencil)?,
            None => stencil,
        });
    }
    total.ok_or_else(|| Error::invalid_parameter("arg_shape", "must be non-empty"))
}

/// Gradient-magnitude map built from per-axis edge stencils:
/// `sqrt(sum_i (S_i x)^2) / sqrt(D)`.
pub struct EdgeMagnitude<T: Scalar> {
    stencils: Vec<Stencil<T>>,
    norm: T,
    dim: usize,
}

impl<T: Scalar> Map<T> for EdgeMagnitude<T> {
    fn dim(&self) -> usize {
        self.dim
    }

    fn codim(&self) -> usize {
        self.dim
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        let mut acc = vec![T::zero(); arr.len()];
        for stencil in &self.stencils {
            let part = stencil.apply(arr)?;
            for (a, p) in acc.iter_mut().zip(part) {
                *a = *a + p * p;
            }
        }
        for a in &mut acc {
            *a = a.sqrt() * self.norm;
        }
        Ok(acc)
    }
}

/// An edge filter: linear for a single axis, a magnitude map otherwise
pub enum EdgeFilter<T: Scalar> {
    /// Single-axis filter, still a linear operator
    Linear(DynOp<T>),
    /// Multi-axis gradient magnitude (nonlinear)
    Magnitude(EdgeMagnitude<T>),
}

impl<T: Scalar> EdgeFilter<T> {
    /// The linear operator, when the filter targeted a single axis
    pub fn as_linear(&self) -> Option<DynOp<T>> {
        match self {
            EdgeFilter::Linear(op) => Some(op.clone()),
            EdgeFilter::Magnitude(_) => None,
        }
    }
}

impl<T: Scalar> Map<T> for EdgeFilter<T> {
    fn dim(&self) -> usize {
        match self {
            EdgeFilter::Linear(op) => op.dim(),
            EdgeFilter::Magnitude(m) => m.dim(),
        }
    }

    fn codim(&self) -> usize {
        self.dim()
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        match self {
            EdgeFilter::Linear(op) => op.apply(arr),
            EdgeFilter::Magnitude(m) => m.apply(arr),
        }
    }
}

fn edge_filter<T: Scalar>(
    arg_shape: &[usize],
    smooth_taps: &[f64],
    axes: Option<&[usize]>,
    cfg: &DiffConfig,
) -> Result<EdgeFilter<T>> {
    let ndim = arg_shape.len();
    let axes: Vec<usize> = match axes {
        Some(a) => a.to_vec(),
        None => (0..ndim).collect(),
    };
    if axes.is_empty() || axes.iter().any(|&a| a >= ndim) {
        return Err(Error::invalid_parameter(
            "axes",
            format!("must select axes below {ndim}"),
        ));
    }
    let sampling = cfg.sampling_for(ndim)?;
    let modes = cfg.modes_for(ndim)?;

    let mut stencils = Vec::with_capacity(axes.len());
    for &edge_axis in &axes {
        let kernels: Vec<Kernel1d<T>> = (0..ndim)
            .map(|ax| {
                let taps: Vec<f64> = if ax == edge_axis {
                    vec![-1.0, 0.0, 1.0]
                } else {
                    smooth_taps.to_vec()
                };
                Kernel1d::new(
                    taps.iter().map(|&t| T::of_f64(t / sampling[ax])).collect(),
                    1,
                )
            })
            .collect::<Result<_>>()?;
        stencils.push(
            Stencil::with_backend(
                arg_shape,
                KernelSpec::separable(kernels)?,
                &modes,
                cfg.backend,
            )?
            .enable_warnings(cfg.enable_warnings),
        );
    }

    match <[Stencil<T>; 1]>::try_from(stencils) {
        Ok([stencil]) => Ok(EdgeFilter::Linear(Arc::new(stencil))),
        Err(stencils) => Ok(EdgeFilter::Magnitude(EdgeMagnitude {
            norm: T::of_f64(1.0 / (ndim as f64).sqrt()),
            dim: size(arg_shape),
            stencils,
        })),
    }
}

/// Sobel edge filter (smoothing taps `[1, 2, 1] / 4`)
pub fn sobel<T: Scalar>(
    arg_shape: &[usize],
    axes: Option<&[usize]>,
    cfg: &DiffConfig,
) -> Result<EdgeFilter<T>> {
    edge_filter(arg_shape, &[0.25, 0.5, 0.25], axes, cfg)
}

/// Prewitt edge filter (smoothing taps `[1, 1, 1] / 3`)
pub fn prewitt<T: Scalar>(
    arg_shape: &[usize],
    axes: Option<&[usize]>,
    cfg: &DiffConfig,
) -> Result<EdgeFilter<T>> {
    edge_filter(
        arg_shape,
        &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
        axes,
        cfg,
    )
}

/// Scharr edge filter (smoothing taps `[3, 10, 3] / 16`)
pub fn scharr<T: Scalar>(
    arg_shape: &[usize],
    axes: Option<&[usize]>,
    cfg: &DiffConfig,
) -> Result<EdgeFilter<T>> {
    edge_filter(arg_shape, &[3.0 / 16.0, 10.0 / 16.0, 3.0 / 16.0], axes, cfg)
}
