//! Single-threaded CPU correlation loops
//!
//! Separable kernels run one axis pass at a time over contiguous lanes;
//! full kernels run a joint loop with precomputed flat tap offsets. In both
//! cases interior positions take a branch-free fast path and only positions
//! within the kernel radius of an edge resolve boundary indices.

use matfree_core::boundary::BoundaryMode;
use matfree_core::numeric::Scalar;
use matfree_core::shape::{strides, IndexIter};

use crate::kernel::{Kernel1d, KernelSpec, NdKernel};

/// Correlate one unbatched signal with a kernel description.
pub(crate) fn correlate_spec<T: Scalar>(
    input: &[T],
    out: &mut [T],
    shape: &[usize],
    spec: &KernelSpec<T>,
    modes: &[BoundaryMode],
) {
    match spec {
        KernelSpec::Separable(axes) => {
            let mut cur = input.to_vec();
            let mut next = vec![T::zero(); input.len()];
            for (axis, k) in axes.iter().enumerate() {
                if k.is_identity() {
                    continue;
                }
                correlate_axis(&cur, &mut next, shape, axis, k, modes[axis]);
                std::mem::swap(&mut cur, &mut next);
            }
            out.copy_from_slice(&cur);
        }
        KernelSpec::Full(k) => correlate_nd(input, out, shape, k, modes),
    }
}

/// Correlate along a single axis of an N-d signal.
pub(crate) fn correlate_axis<T: Scalar>(
    input: &[T],
    out: &mut [T],
    shape: &[usize],
    axis: usize,
    kernel: &Kernel1d<T>,
    mode: BoundaryMode,
) {
    let pre: usize = shape[..axis].iter().product();
    let n = shape[axis];
    let post: usize = shape[axis + 1..].iter().product();
    let (left, right) = kernel.width();
    let center = kernel.center() as isize;
    let taps = kernel.taps();

    let interior_lo = left.min(n);
    let interior_hi = n.saturating_sub(right).max(interior_lo);

    for p in 0..pre {
        let base = p * n * post;

        let mut edge_row = |i: usize| {
            let lo = i as isize - center;
            let row = base + i * post;
            for j in 0..post {
                let mut acc = T::zero();
                for (q, &k) in taps.iter().enumerate() {
                    if let Some(src) = mode.resolve(lo + q as isize, n) {
                        acc = acc + input[base + src * post + j] * k;
                    }
                }
                out[row + j] = acc;
            }
        };

        for i in 0..interior_lo {
            edge_row(i);
        }
        for i in interior_hi..n {
            edge_row(i);
        }

        // branch-free interior
        for i in interior_lo..interior_hi {
            let start = base + (i - left) * post;
            let row = base + i * post;
            for j in 0..post {
                let mut acc = T::zero();
                for (q, &k) in taps.iter().enumerate() {
                    acc = acc + input[start + q * post + j] * k;
                }
                out[row + j] = acc;
            }
        }
    }
}

/// Correlate with a joint rank-D kernel.
pub(crate) fn correlate_nd<T: Scalar>(
    input: &[T],
    out: &mut [T],
    shape: &[usize],
    kernel: &NdKernel<T>,
    modes: &[BoundaryMode],
) {
    let ndim = shape.len();
    let sig_strides = strides(shape);
    let center = kernel.center();

    // tap table: relative per-axis offsets plus the flat interior offset
    let mut taps: Vec<(isize, Vec<isize>, T)> = Vec::with_capacity(kernel.data().len());
    for (flat, idx) in IndexIter::new(kernel.shape()).enumerate() {
        let rel: Vec<isize> = idx
            .iter()
            .zip(center)
            .map(|(&q, &c)| q as isize - c as isize)
            .collect();
        let flat_off: isize = rel
            .iter()
            .zip(&sig_strides)
            .map(|(&r, &s)| r * s as isize)
            .sum();
        taps.push((flat_off, rel, kernel.data()[flat]));
    }

    let widths: Vec<(usize, usize)> = (0..ndim).map(|d| kernel.width(d)).collect();

    for (flat, idx) in IndexIter::new(shape).enumerate() {
        let interior = idx
            .iter()
            .zip(shape)
            .zip(&widths)
            .all(|((&i, &n), &(l, r))| i >= l && i + r < n);

        let mut acc = T::zero();
        if interior {
            for &(off, _, k) in &taps {
                acc = acc + input[(flat as isize + off) as usize] * k;
            }
        } else {
            'taps: for (_, rel, k) in &taps {
                let mut src = 0usize;
                for d in 0..ndim {
                    match modes[d].resolve(idx[d] as isize + rel[d], shape[d]) {
                        Some(i) => src += i * sig_strides[d],
                        None => continue 'taps,
                    }
                }
                acc = acc + input[src] * *k;
            }
        }
        out[flat] = acc;
    }
}
