//! Blocked stencil evaluation with halo exchange
//!
//! The outermost axis is split into fixed-size chunks. Before the CPU
//! kernel runs on a chunk, a halo of `width` rows per side is gathered from
//! the neighboring chunks; rows falling outside the global array resolve
//! through the axis boundary mode. Interior chunk edges therefore need no
//! boundary handling at all, and no cross-chunk adjoint correction is
//! required.
//!
//! With the `parallel` feature the chunks are evaluated on the rayon thread
//! pool; otherwise they run sequentially with identical results.

use matfree_core::boundary::BoundaryMode;
use matfree_core::numeric::Scalar;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::cpu;
use super::ChunkOptions;
use crate::kernel::KernelSpec;

/// Correlate one unbatched signal chunk by chunk along axis 0.
pub(crate) fn correlate_chunked<T: Scalar>(
    input: &[T],
    out: &mut [T],
    shape: &[usize],
    spec: &KernelSpec<T>,
    modes: &[BoundaryMode],
    opts: ChunkOptions,
) {
    let n0 = shape[0];
    let rest: usize = shape[1..].iter().product();
    let chunk_len = opts.chunk_len.max(1);

    if n0 <= chunk_len {
        cpu::correlate_spec(input, out, shape, spec, modes);
        return;
    }

    let job = |(ci, dst): (usize, &mut [T])| {
        let start = ci * chunk_len;
        let len = dst.len() / rest;
        process_chunk(input, dst, shape, spec, modes, start, len);
    };

    #[cfg(feature = "parallel")]
    out.par_chunks_mut(chunk_len * rest).enumerate().for_each(job);

    #[cfg(not(feature = "parallel"))]
    out.chunks_mut(chunk_len * rest).enumerate().for_each(job);
}

/// Evaluate rows `[start, start + len)` of the output.
///
/// The extended input holds `left` halo rows before and `right` after the
/// chunk; all kernel taps for the kept rows land inside it by construction.
fn process_chunk<T: Scalar>(
    input: &[T],
    dst: &mut [T],
    shape: &[usize],
    spec: &KernelSpec<T>,
    modes: &[BoundaryMode],
    start: usize,
    len: usize,
) {
    let n0 = shape[0];
    let rest: usize = shape[1..].iter().product();
    let (left, right) = spec.width(0);

    let ext_rows = len + left + right;
    let mut ext = vec![T::zero(); ext_rows * rest];
    for e in 0..ext_rows {
        let global = start as isize + e as isize - left as isize;
        if let Some(g) = modes[0].resolve(global, n0) {
            ext[e * rest..(e + 1) * rest].copy_from_slice(&input[g * rest..(g + 1) * rest]);
        }
    }

    let mut ext_shape = shape.to_vec();
    ext_shape[0] = ext_rows;
    // halo rows already carry resolved data; the local axis-0 mode is inert
    // for the kept rows, so constant keeps out-of-halo taps at zero.
    let mut ext_modes = modes.to_vec();
    ext_modes[0] = BoundaryMode::Constant;

    let mut ext_out = vec![T::zero(); ext_rows * rest];
    cpu::correlate_spec(&ext, &mut ext_out, &ext_shape, spec, &ext_modes);

    dst.copy_from_slice(&ext_out[left * rest..(left + len) * rest]);
}
