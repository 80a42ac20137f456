//! Property tests for the stencil operator: adjoint identity, separable
//! vs. joint equivalence, finite-difference exactness, and backend
//! equivalence.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use matfree_core::linop::{LinOp, Map};
use matfree_core::pad::Pad;
use matfree_stencil::prelude::*;

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn random_signal(rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

#[test]
fn adjoint_identity_on_interior() {
    // <Ax, y> == <x, A^T y> restricted to positions at distance >= kernel
    // radius from every boundary, constant mode
    let mut rng = StdRng::seed_from_u64(42);
    let shape = [12, 11];
    let n = 12 * 11;

    let k0: Kernel1d<f64> = finite_difference(1, Scheme::Central, 2, 1.0).unwrap();
    let k1: Kernel1d<f64> = finite_difference(2, Scheme::Central, 2, 1.0).unwrap();
    let widths = [k0.width(), k1.width()];
    let spec = KernelSpec::Separable(vec![k0, k1]);
    let op = Stencil::new(&shape, spec, &[BoundaryMode::Constant]).unwrap();

    let x = random_signal(&mut rng, n);
    // y supported strictly inside: zero within kernel radius of every edge
    let mut y = vec![0.0; n];
    for i in 0..shape[0] {
        for j in 0..shape[1] {
            let interior = i >= widths[0].0 + widths[0].1
                && i + widths[0].0 + widths[0].1 < shape[0]
                && j >= widths[1].0 + widths[1].1
                && j + widths[1].0 + widths[1].1 < shape[1];
            if interior {
                y[i * shape[1] + j] = rng.gen_range(-1.0..1.0);
            }
        }
    }

    let ax = op.apply(&x).unwrap();
    let aty = op.adjoint(&y).unwrap();
    assert_relative_eq!(dot(&ax, &y), dot(&x, &aty), max_relative = 1e-10);
}

#[test]
fn adjoint_exact_with_matching_pad() {
    // composing with a complementary Pad restores global exactness:
    // B = S * Pad has <Bx, y> == <x, B^T y> everywhere
    let mut rng = StdRng::seed_from_u64(43);
    let k: Kernel1d<f64> = finite_difference(2, Scheme::Central, 2, 1.0).unwrap();
    let (l, r) = k.width();
    let spec = KernelSpec::Separable(vec![k]);

    for mode in BoundaryMode::ALL {
        let pad = Pad::new(&[20], &[(l, r)], &[mode]).unwrap();
        let padded_len = Map::<f64>::codim(&pad);
        let op = Stencil::new(&[padded_len], spec.clone(), &[BoundaryMode::Constant]).unwrap();

        let x = random_signal(&mut rng, 20);
        let y = random_signal(&mut rng, padded_len);

        let bx = op.apply(&pad.apply(&x).unwrap()).unwrap();
        let bty = pad.adjoint(&op.adjoint(&y).unwrap()).unwrap();
        assert_relative_eq!(dot(&bx, &y), dot(&x, &bty), max_relative = 1e-10);
    }
}

#[test]
fn separable_equals_joint() {
    let mut rng = StdRng::seed_from_u64(44);
    let shape = [9, 8];
    let x = random_signal(&mut rng, 72);

    let k0 = Kernel1d::new(vec![0.25, 0.5, 0.25], 1).unwrap();
    let k1 = Kernel1d::new(vec![-1.0, 0.0, 1.0], 1).unwrap();

    for mode in BoundaryMode::ALL {
        let sep = Stencil::new(
            &shape,
            KernelSpec::Separable(vec![k0.clone(), k1.clone()]),
            &[mode],
        )
        .unwrap();
        let joint = Stencil::new(
            &shape,
            KernelSpec::Full(NdKernel::outer(&[k0.clone(), k1.clone()]).unwrap()),
            &[mode],
        )
        .unwrap();

        let a = sep.apply(&x).unwrap();
        let b = joint.apply(&x).unwrap();
        for (u, v) in a.iter().zip(&b) {
            assert_relative_eq!(u, v, max_relative = 1e-10, epsilon = 1e-12);
        }
    }
}

#[test]
fn finite_difference_exact_on_squares() {
    // order=1, accuracy=1, central, h=1 on samples of x^2 gives 2x at
    // interior points
    let k: Kernel1d<f64> = finite_difference(1, Scheme::Central, 1, 1.0).unwrap();
    let op = Stencil::new(
        &[6],
        KernelSpec::Separable(vec![k]),
        &[BoundaryMode::Constant],
    )
    .unwrap();
    let x = vec![0.0, 1.0, 4.0, 9.0, 16.0, 25.0];
    let y = op.apply(&x).unwrap();
    for (i, expect) in (1..5).zip([2.0, 4.0, 6.0, 8.0]) {
        assert_relative_eq!(y[i], expect, max_relative = 1e-12);
    }
}

#[test]
fn forward_difference_exact_on_cubic() {
    // order 1, accuracy 3 forward stencil differentiates degree-3
    // polynomials exactly
    let k: Kernel1d<f64> = finite_difference(1, Scheme::Forward, 3, 1.0).unwrap();
    let n = 10;
    let p = |t: f64| 2.0 * t * t * t - t * t + 3.0 * t - 5.0;
    let dp = |t: f64| 6.0 * t * t - 2.0 * t + 3.0;
    let x: Vec<f64> = (0..n).map(|i| p(i as f64)).collect();
    let op = Stencil::new(
        &[n],
        KernelSpec::Separable(vec![k.clone()]),
        &[BoundaryMode::Constant],
    )
    .unwrap();
    let y = op.apply(&x).unwrap();
    let (_, right) = k.width();
    for i in 0..n - right {
        assert_relative_eq!(y[i], dp(i as f64), max_relative = 1e-9, epsilon = 1e-9);
    }
}

#[test]
fn gaussian_smoothing_preserves_mean_mass() {
    let k: Kernel1d<f64> = gaussian_derivative(0, 1.0, 3.0, 1.0).unwrap();
    let op = Stencil::new(
        &[64],
        KernelSpec::Separable(vec![k]),
        &[BoundaryMode::Wrap],
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(45);
    let x = random_signal(&mut rng, 64);
    let y = op.apply(&x).unwrap();
    // unit-sum kernel + circular boundary preserve the total mass
    assert_relative_eq!(
        x.iter().sum::<f64>(),
        y.iter().sum::<f64>(),
        max_relative = 1e-10,
        epsilon = 1e-12
    );
}

#[test]
fn chunked_backend_matches_cpu() {
    let mut rng = StdRng::seed_from_u64(46);
    let shape = [37, 5];
    let x = random_signal(&mut rng, 37 * 5);

    let k0: Kernel1d<f64> = finite_difference(1, Scheme::Central, 2, 1.0).unwrap();
    let k1: Kernel1d<f64> = gaussian_derivative(0, 1.0, 2.0, 1.0).unwrap();
    let spec = KernelSpec::Separable(vec![k0, k1]);

    for mode in BoundaryMode::ALL {
        let cpu = Stencil::new(&shape, spec.clone(), &[mode]).unwrap();
        let blocked = Stencil::with_backend(
            &shape,
            spec.clone(),
            &[mode],
            Backend::Chunked(ChunkOptions { chunk_len: 8 }),
        )
        .unwrap();

        let a = cpu.apply(&x).unwrap();
        let b = blocked.apply(&x).unwrap();
        for (u, v) in a.iter().zip(&b) {
            assert_relative_eq!(u, v, max_relative = 1e-8, epsilon = 1e-12);
        }

        let at = cpu.adjoint(&x).unwrap();
        let bt = blocked.adjoint(&x).unwrap();
        for (u, v) in at.iter().zip(&bt) {
            assert_relative_eq!(u, v, max_relative = 1e-8, epsilon = 1e-12);
        }
    }
}

#[cfg(feature = "gpu")]
#[test]
fn gpu_backend_matches_cpu_f32() {
    let mut rng = StdRng::seed_from_u64(47);
    let shape = [16, 12];
    let x: Vec<f32> = (0..16 * 12).map(|_| rng.gen_range(-1.0f32..1.0)).collect();

    let k0: Kernel1d<f32> = finite_difference(1, Scheme::Central, 2, 1.0).unwrap();
    let k1: Kernel1d<f32> = gaussian_derivative(0, 1.0, 2.0, 1.0).unwrap();
    let spec = KernelSpec::Separable(vec![k0, k1]);

    for mode in BoundaryMode::ALL {
        let cpu = Stencil::new(&shape, spec.clone(), &[mode]).unwrap();
        let gpu = Stencil::with_backend(&shape, spec.clone(), &[mode], Backend::Gpu).unwrap();
        let a = cpu.apply(&x).unwrap();
        let b = gpu.apply(&x).unwrap();
        for (u, v) in a.iter().zip(&b) {
            assert_relative_eq!(u, v, max_relative = 1e-5, epsilon = 1e-6);
        }
    }
}

#[cfg(feature = "gpu")]
#[test]
fn gpu_rejects_f64() {
    let k: Kernel1d<f64> = finite_difference(1, Scheme::Central, 2, 1.0).unwrap();
    let spec = KernelSpec::Separable(vec![k]);
    assert!(Stencil::with_backend(&[16], spec, &[BoundaryMode::Constant], Backend::Gpu).is_err());
}
