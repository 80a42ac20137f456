//! Stencil coefficient generation
//!
//! Two coefficient families:
//!
//! * **Finite differences** - for a derivative order `n`, scheme, and
//!   accuracy `a`, pick support offsets and solve the generalized
//!   Vandermonde system `V c = e_n * n!` where `V[i][j] = s_j^i`. The
//!   support size stays small (~10), so a dense LU solve is exact enough.
//! * **Gaussian derivatives** - sample the analytic `n`-th derivative of a
//!   normalized Gaussian at integer offsets `[-r, r]`, reversed to convert
//!   the convolution-oriented kernel into a correlation-oriented one.
//!
//! Both divide by `sampling^order` to express derivatives in physical units.

use std::str::FromStr;

use nalgebra::{DMatrix, DVector};

use matfree_core::error::{Error, Result};
use matfree_core::numeric::Scalar;

use crate::kernel::Kernel1d;

/// Finite-difference scheme
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Forward,
    Backward,
    Central,
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(Scheme::Forward),
            "backward" => Ok(Scheme::Backward),
            "central" => Ok(Scheme::Central),
            other => Err(Error::invalid_parameter(
                "scheme",
                format!("must be one of forward|backward|central, got `{other}`"),
            )),
        }
    }
}

/// Support offsets for a finite-difference stencil.
///
/// Central supports are symmetric; an odd requested size is widened by the
/// inclusive range, which silently rounds the accuracy up to the minimum
/// achievable for centered stencils.
fn support_offsets(order: usize, scheme: Scheme, accuracy: usize) -> Vec<i64> {
    match scheme {
        Scheme::Central => {
            let m = (2 * ((order + 1) / 2) - 1 + accuracy) as i64;
            (-(m / 2)..=(m / 2)).collect()
        }
        Scheme::Forward => (0..(order + accuracy) as i64).collect(),
        Scheme::Backward => (-((order + accuracy) as i64) + 1..=0).collect(),
    }
}

/// Finite-difference taps for derivative `order` at the given `accuracy`.
///
/// `order == 0` yields the identity kernel. The Vandermonde system is
/// solved in f64 and cast to the kernel scalar once.
pub fn finite_difference<T: Scalar>(
    order: usize,
    scheme: Scheme,
    accuracy: usize,
    sampling: f64,
) -> Result<Kernel1d<T>> {
    if sampling <= 0.0 {
        return Err(Error::non_positive("sampling", sampling));
    }
    if accuracy == 0 {
        return Err(Error::invalid_parameter(
            "accuracy",
            "must be at least 1",
        ));
    }
    if order == 0 {
        return Ok(Kernel1d::identity());
    }

    let offsets = support_offsets(order, scheme, accuracy);
    let n = offsets.len();
    debug_assert!(n > order);

    let vander = DMatrix::from_fn(n, n, |i, j| (offsets[j] as f64).powi(i as i32));
    let mut rhs = DVector::zeros(n);
    rhs[order] = (1..=order).product::<usize>() as f64;

    let coefs = vander
        .lu()
        .solve(&rhs)
        .ok_or_else(|| Error::Computation("finite-difference system is singular".to_string()))?;

    let scale = sampling.powi(order as i32);
    let taps: Vec<T> = coefs.iter().map(|&c| T::of_f64(c / scale)).collect();
    let center = offsets
        .iter()
        .position(|&s| s == 0)
        .expect("support always contains the origin");
    Kernel1d::new(taps, center)
}

/// Sampled `order`-th derivative of a normalized Gaussian.
///
/// `sigma` and `sampling` are in physical units; the radius is
/// `floor(truncate * sigma / sampling + 0.5)` pixels. The taps are reversed
/// relative to the analytic samples so the kernel is correlation-oriented,
/// and divided by `sampling^order`.
pub fn gaussian_derivative<T: Scalar>(
    order: usize,
    sigma: f64,
    truncate: f64,
    sampling: f64,
) -> Result<Kernel1d<T>> {
    if sigma <= 0.0 {
        return Err(Error::non_positive("sigma", sigma));
    }
    if truncate <= 0.0 {
        return Err(Error::non_positive("truncate", truncate));
    }
    if sampling <= 0.0 {
        return Err(Error::non_positive("sampling", sampling));
    }

    let sigma_pix = sigma / sampling;
    let radius = (truncate * sigma_pix + 0.5).floor() as usize;
    let mut taps = gaussian_kernel1d(sigma_pix, order, radius);
    taps.reverse();

    let scale = sampling.powi(order as i32);
    let taps: Vec<T> = taps.into_iter().map(|c| T::of_f64(c / scale)).collect();
    Kernel1d::new(taps, radius)
}

/// Samples of `d^order/dx^order` of a unit-sum Gaussian at `[-radius, radius]`.
///
/// The derivative polynomial `q` satisfies the recurrence
/// `q <- q' + q * (-x / sigma^2)`, starting from `q = 1`; the result is
/// `q(x) * phi(x)` with `phi` the normalized Gaussian.
fn gaussian_kernel1d(sigma: f64, order: usize, radius: usize) -> Vec<f64> {
    let sigma2 = sigma * sigma;
    let r = radius as i64;
    let xs: Vec<f64> = (-r..=r).map(|x| x as f64).collect();

    let mut phi: Vec<f64> = xs.iter().map(|&x| (-0.5 / sigma2 * x * x).exp()).collect();
    let norm: f64 = phi.iter().sum();
    for p in &mut phi {
        *p /= norm;
    }
    if order == 0 {
        return phi;
    }

    let mut q = vec![1.0f64];
    for _ in 0..order {
        let mut next = vec![0.0f64; q.len() + 1];
        for (k, item) in next.iter_mut().enumerate() {
            // derivative term: (k+1) * q[k+1]
            if let Some(&c) = q.get(k + 1) {
                *item += (k as f64 + 1.0) * c;
            }
            // multiply-by(-x/sigma^2) term shifts coefficients up one degree
            if k >= 1 {
                *item -= q[k - 1] / sigma2;
            }
        }
        q = next;
    }

    xs.iter()
        .zip(&phi)
        .map(|(&x, &p)| {
            let mut poly = 0.0;
            let mut xp = 1.0;
            for &c in &q {
                poly += c * xp;
                xp *= x;
            }
            poly * p
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scheme_parse() {
        assert_eq!("forward".parse::<Scheme>().unwrap(), Scheme::Forward);
        assert_eq!("Central".parse::<Scheme>().unwrap(), Scheme::Central);
        assert!("upwind".parse::<Scheme>().is_err());
    }

    #[test]
    fn test_first_order_kernels() {
        let fwd: Kernel1d<f64> = finite_difference(1, Scheme::Forward, 1, 1.0).unwrap();
        assert_eq!(fwd.center(), 0);
        assert_relative_eq!(fwd.taps()[0], -1.0, max_relative = 1e-12);
        assert_relative_eq!(fwd.taps()[1], 1.0, max_relative = 1e-12);

        let bwd: Kernel1d<f64> = finite_difference(1, Scheme::Backward, 1, 1.0).unwrap();
        assert_eq!(bwd.center(), 1);
        assert_relative_eq!(bwd.taps()[0], -1.0, max_relative = 1e-12);
        assert_relative_eq!(bwd.taps()[1], 1.0, max_relative = 1e-12);

        // accuracy 1 with a central scheme silently yields accuracy 2
        let cen: Kernel1d<f64> = finite_difference(1, Scheme::Central, 1, 1.0).unwrap();
        assert_eq!(cen.len(), 3);
        assert_eq!(cen.center(), 1);
        assert_relative_eq!(cen.taps()[0], -0.5, max_relative = 1e-12);
        assert_relative_eq!(cen.taps()[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(cen.taps()[2], 0.5, max_relative = 1e-12);
    }

    #[test]
    fn test_second_order_central() {
        let k: Kernel1d<f64> = finite_difference(2, Scheme::Central, 1, 1.0).unwrap();
        assert_eq!(k.len(), 3);
        assert_relative_eq!(k.taps()[0], 1.0, max_relative = 1e-12);
        assert_relative_eq!(k.taps()[1], -2.0, max_relative = 1e-12);
        assert_relative_eq!(k.taps()[2], 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_sampling_scaling() {
        let k: Kernel1d<f64> = finite_difference(1, Scheme::Forward, 1, 0.5).unwrap();
        assert_relative_eq!(k.taps()[0], -2.0, max_relative = 1e-12);
        assert_relative_eq!(k.taps()[1], 2.0, max_relative = 1e-12);

        // h^2 scaling for second derivatives
        let k: Kernel1d<f64> = finite_difference(2, Scheme::Central, 1, 0.5).unwrap();
        assert_relative_eq!(k.taps()[1], -8.0, max_relative = 1e-12);
    }

    #[test]
    fn test_exactness_on_polynomial() {
        // order 1, accuracy 2, forward: exact on degree <= 2 polynomials
        let k: Kernel1d<f64> = finite_difference(1, Scheme::Forward, 2, 1.0).unwrap();
        // p(x) = x^2, p'(0) = 0; support {0, 1, 2}
        let value: f64 = k
            .taps()
            .iter()
            .zip(0..)
            .map(|(&c, s)| c * (s as f64).powi(2))
            .sum();
        assert_relative_eq!(value, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_order_zero_is_identity() {
        let k: Kernel1d<f64> = finite_difference(0, Scheme::Central, 1, 1.0).unwrap();
        assert!(k.is_identity());
    }

    #[test]
    fn test_fd_validation() {
        assert!(finite_difference::<f64>(1, Scheme::Forward, 1, 0.0).is_err());
        assert!(finite_difference::<f64>(1, Scheme::Forward, 0, 1.0).is_err());
    }

    #[test]
    fn test_gaussian_order0_normalized() {
        let k: Kernel1d<f64> = gaussian_derivative(0, 2.0, 3.0, 1.0).unwrap();
        assert_eq!(k.len(), 2 * 6 + 1);
        assert_eq!(k.center(), 6);
        let total: f64 = k.taps().iter().sum();
        assert_relative_eq!(total, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_gaussian_order1_antisymmetric() {
        let k: Kernel1d<f64> = gaussian_derivative(1, 1.5, 3.0, 1.0).unwrap();
        let n = k.len();
        // first derivative of an even function is odd; reversal preserves that
        for i in 0..n / 2 {
            assert_relative_eq!(k.taps()[i], -k.taps()[n - 1 - i], max_relative = 1e-10);
        }
        let total: f64 = k.taps().iter().sum();
        assert_relative_eq!(total, 0.0, epsilon = 1e-12);
        // correlation-oriented: positive taps on the positive-offset side
        assert!(k.taps()[n - 1] > 0.0);
    }

    #[test]
    fn test_gaussian_sampling_rescales_radius() {
        let fine: Kernel1d<f64> = gaussian_derivative(0, 2.0, 3.0, 0.5).unwrap();
        // sigma_pix = 4 -> radius 12
        assert_eq!(fine.center(), 12);
    }

    #[test]
    fn test_gaussian_validation() {
        assert!(gaussian_derivative::<f64>(0, 0.0, 3.0, 1.0).is_err());
        assert!(gaussian_derivative::<f64>(0, 1.0, 0.0, 1.0).is_err());
        assert!(gaussian_derivative::<f64>(0, 1.0, 3.0, -1.0).is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_derivative_taps_sum_to_zero(order in 1usize..4, accuracy in 1usize..4) {
            // a derivative stencil annihilates constants
            for scheme in [Scheme::Forward, Scheme::Backward, Scheme::Central] {
                let k: Kernel1d<f64> = finite_difference(order, scheme, accuracy, 1.0).unwrap();
                let total: f64 = k.taps().iter().sum();
                proptest::prop_assert!(total.abs() < 1e-8);
            }
        }
    }
}
