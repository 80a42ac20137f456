//! End-to-end checks across the whole stack: kernels, stencils, pads, and
//! the named differential operators working together.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use matfree::prelude::*;

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn denoising_style_pipeline_shapes() {
    // smooth, differentiate, and measure: the shapes all line up
    let shape = [16, 16];
    let cfg = DiffConfig::default();

    let smooth = gaussian::<f64>(&shape, &[1.0], &[3.0], &[0], &cfg).unwrap();
    let grad = gradient::<f64>(&shape, None, &DiffMethod::fd(), &cfg).unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let noise = Normal::new(0.0, 0.1).unwrap();
    let x: Vec<f64> = (0..256)
        .map(|i| ((i / 16) as f64 * 0.2).sin() + noise.sample(&mut rng))
        .collect();

    let smoothed = smooth.apply(&x).unwrap();
    let g = grad.apply(&smoothed).unwrap();
    assert_eq!(g.len(), 2 * 256);
    let parts = grad.unravel(&g).unwrap();
    assert_eq!(parts.len(), 2);
}

#[test]
fn pad_stencil_trim_composition_reproduces_boundary_modes() {
    // Stencil(mode=m) on an unpadded signal equals
    // Trim(Stencil(mode=constant)(Pad(mode=m)))
    let mut rng = StdRng::seed_from_u64(2);
    let x: Vec<f64> = (0..30).map(|_| rng.gen_range(-1.0..1.0)).collect();

    let k: Kernel1d<f64> = finite_difference(2, Scheme::Central, 2, 1.0).unwrap();
    let (l, r) = k.width();

    for mode in BoundaryMode::ALL {
        let direct = Stencil::new(
            &[30],
            KernelSpec::Separable(vec![k.clone()]),
            &[mode],
        )
        .unwrap();
        let want = direct.apply(&x).unwrap();

        let pad = Pad::new(&[30], &[(l, r)], &[mode]).unwrap();
        let trim = pad.trim();
        let inner = Stencil::new(
            &[30 + l + r],
            KernelSpec::Separable(vec![k.clone()]),
            &[BoundaryMode::Constant],
        )
        .unwrap();
        let got = trim
            .apply(&inner.apply(&pad.apply(&x).unwrap()).unwrap())
            .unwrap();

        for (w, g) in want.iter().zip(&got) {
            assert_relative_eq!(w, g, max_relative = 1e-10, epsilon = 1e-12);
        }
    }
}

#[test]
fn composite_operator_adjoint_identity() {
    // scaled difference of two stencil pipelines keeps an exact adjoint
    let mut rng = StdRng::seed_from_u64(3);
    let shape = [12];
    let cfg = DiffConfig::default();

    let dog = difference_of_gaussians::<f64>(&shape, &[1.0], None, &[2.0], &[2.0], &cfg).unwrap();
    let x: Vec<f64> = (0..12).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let y: Vec<f64> = (0..12).map(|_| rng.gen_range(-1.0..1.0)).collect();

    let ax = dog.apply(&x).unwrap();
    let aty = dog.adjoint(&y).unwrap();
    assert_relative_eq!(dot(&ax, &y), dot(&x, &aty), max_relative = 1e-10);
}

#[test]
fn lipschitz_bounds_are_sound() {
    // ||Ax|| <= L ||x|| on random signals
    let mut rng = StdRng::seed_from_u64(4);
    let shape = [20];
    let cfg = DiffConfig::default();
    let lap = laplacian::<f64>(&shape, None, None, &cfg).unwrap();
    let bound = lap.lipschitz();
    assert!(bound > 0.0);

    for _ in 0..10 {
        let x: Vec<f64> = (0..20).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let y = lap.apply(&x).unwrap();
        let norm_x = dot(&x, &x).sqrt();
        let norm_y = dot(&y, &y).sqrt();
        assert!(norm_y <= bound * norm_x + 1e-9);
    }
}
