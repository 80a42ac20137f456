//! Partial-derivative stencil constructors
//!
//! Builds the per-axis kernel sequence for a mixed partial derivative
//! `d^n / dx_0^{n_0} ... dx_{D-1}^{n_{D-1}}` and wraps it in a single
//! separable stencil. Finite-difference axes with order 0 keep the identity
//! kernel; the Gaussian form smooths order-0 axes with the order-0 kernel,
//! so every axis of a Gaussian partial derivative is filtered.

use matfree_core::error::{Error, Result};
use matfree_core::numeric::Scalar;
use matfree_stencil::{finite_difference, gaussian_derivative, Kernel1d, KernelSpec, Stencil};

use crate::params::{broadcast, check_positive, DiffConfig, DiffMethod};

/// Namespace for the partial-derivative constructors
pub struct PartialDerivative;

impl PartialDerivative {
    /// Finite-difference partial derivative.
    ///
    /// `order` has one entry per dimension; zeros mark axes that are not
    /// differentiated.
    pub fn finite_difference<T: Scalar>(
        arg_shape: &[usize],
        order: &[usize],
        scheme: &[matfree_stencil::Scheme],
        accuracy: &[usize],
        cfg: &DiffConfig,
    ) -> Result<Stencil<T>> {
        let method = DiffMethod::FiniteDifference {
            scheme: scheme.to_vec(),
            accuracy: accuracy.to_vec(),
        };
        Self::build(arg_shape, order, &method, cfg)
    }

    /// Gaussian-derivative partial derivative.
    pub fn gaussian_derivative<T: Scalar>(
        arg_shape: &[usize],
        order: &[usize],
        sigma: &[f64],
        truncate: &[f64],
        cfg: &DiffConfig,
    ) -> Result<Stencil<T>> {
        let method = DiffMethod::GaussianDerivative {
            sigma: sigma.to_vec(),
            truncate: truncate.to_vec(),
        };
        Self::build(arg_shape, order, &method, cfg)
    }

    /// Shared kernel-assembly path used by the named builders.
    pub(crate) fn build<T: Scalar>(
        arg_shape: &[usize],
        order: &[usize],
        method: &DiffMethod,
        cfg: &DiffConfig,
    ) -> Result<Stencil<T>> {
        let ndim = arg_shape.len();
        if order.len() != ndim {
            return Err(Error::size_mismatch("order", ndim, order.len()));
        }
        let sampling = cfg.sampling_for(ndim)?;
        let modes = cfg.modes_for(ndim)?;

        let kernels: Vec<Kernel1d<T>> = match method {
            DiffMethod::FiniteDifference { scheme, accuracy } => {
                let scheme = broadcast(scheme, ndim, "scheme")?;
                let accuracy = broadcast(accuracy, ndim, "accuracy")?;
                (0..ndim)
                    .map(|ax| {
                        if order[ax] == 0 {
                            Ok(Kernel1d::identity())
                        } else {
                            finite_difference(order[ax], scheme[ax], accuracy[ax], sampling[ax])
                        }
                    })
                    .collect::<Result<_>>()?
            }
            DiffMethod::GaussianDerivative { sigma, truncate } => {
                let sigma = broadcast(sigma, ndim, "sigma")?;
                let truncate = broadcast(truncate, ndim, "truncate")?;
                check_positive("sigma", &sigma)?;
                check_positive("truncate", &truncate)?;
                // order-0 axes still get the order-0 smoothing kernel
                (0..ndim)
                    .map(|ax| gaussian_derivative(order[ax], sigma[ax], truncate[ax], sampling[ax]))
                    .collect::<Result<_>>()?
            }
        };

        let stencil = Stencil::with_backend(
            arg_shape,
            KernelSpec::separable(kernels)?,
            &modes,
            cfg.backend,
        )?;
        Ok(stencil.enable_warnings(cfg.enable_warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use matfree_core::linop::Map;
    use matfree_stencil::Scheme;

    #[test]
    fn test_fd_partial_on_one_axis() {
        let cfg = DiffConfig::default();
        let op: Stencil<f64> = PartialDerivative::finite_difference(
            &[4, 4],
            &[1, 0],
            &[Scheme::Forward],
            &[1],
            &cfg,
        )
        .unwrap();
        // forward difference along axis 0 of a linear ramp
        let x: Vec<f64> = (0..16).map(|i| (i / 4) as f64).collect();
        let y = op.apply(&x).unwrap();
        for row in 0..3 {
            for col in 0..4 {
                assert_relative_eq!(y[row * 4 + col], 1.0, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_gaussian_partial_smooths_all_axes() {
        let cfg = DiffConfig::default();
        let op: Stencil<f64> = PartialDerivative::gaussian_derivative(
            &[32, 32],
            &[1, 0],
            &[2.0],
            &[3.0],
            &cfg,
        )
        .unwrap();
        // both axes carry non-identity kernels
        match op.kernel() {
            KernelSpec::Separable(axes) => {
                assert!(axes.iter().all(|k| !k.is_identity()));
            }
            _ => panic!("expected a separable kernel"),
        }
    }

    #[test]
    fn test_order_length_checked() {
        let cfg = DiffConfig::default();
        let res: Result<Stencil<f64>> = PartialDerivative::finite_difference(
            &[4, 4],
            &[1],
            &[Scheme::Forward],
            &[1],
            &cfg,
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_mixed_partial_derivative() {
        // d^2/dxdy of f(x, y) = x*y is 1 everywhere
        let cfg = DiffConfig::default();
        let op: Stencil<f64> = PartialDerivative::finite_difference(
            &[5, 5],
            &[1, 1],
            &[Scheme::Forward],
            &[1],
            &cfg,
        )
        .unwrap();
        let x: Vec<f64> = (0..25).map(|i| ((i / 5) * (i % 5)) as f64).collect();
        let y = op.apply(&x).unwrap();
        for row in 0..4 {
            for col in 0..4 {
                assert_relative_eq!(y[row * 5 + col], 1.0, max_relative = 1e-12);
            }
        }
    }
}
