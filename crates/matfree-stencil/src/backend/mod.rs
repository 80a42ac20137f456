//! Execution backends for stencil evaluation
//!
//! Three mutually-exclusive strategies produce numerically equivalent
//! output for the same kernel/center/mode/input:
//!
//! * [`Backend::Cpu`] - a plain single-threaded loop per unbatched signal.
//! * [`Backend::Chunked`] - the signal's outermost axis is split into
//!   chunks; each chunk fetches a halo of neighboring rows before the CPU
//!   kernel runs locally, so no cross-chunk adjoint correction is needed.
//! * [`Backend::Gpu`] - a wgpu compute kernel over a sized workgroup grid
//!   (feature `gpu`).
//!
//! The backend is an explicit tag resolved once at stencil construction and
//! dispatched with a plain `match`; a failing backend propagates its error,
//! there is no automatic fallback.

pub(crate) mod cpu;

pub(crate) mod chunked;

#[cfg(feature = "gpu")]
pub(crate) mod gpu;

/// Chunked-evaluation tuning knobs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkOptions {
    /// Rows of the outermost axis per chunk
    pub chunk_len: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self { chunk_len: 128 }
    }
}

/// Execution strategy tag, fixed at stencil construction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Single-threaded CPU loop
    #[default]
    Cpu,
    /// Blocked evaluation with halo exchange along the outermost axis
    Chunked(ChunkOptions),
    /// wgpu compute kernel (f32 working precision)
    #[cfg(feature = "gpu")]
    Gpu,
}

/// Workgroup-size heuristic for grid-parallel kernels.
///
/// `kernel_extents` lists the kernel footprint per grid axis, innermost
/// (fastest-varying, row-major-contiguous) first. Each axis gets the
/// smallest power of two >= its kernel extent, subject to the
/// `max_threads` product budget; whatever budget remains goes to the
/// innermost axis for memory locality.
pub fn plan_workgroup(kernel_extents: &[usize], max_threads: u32) -> [u32; 3] {
    debug_assert!(kernel_extents.len() <= 3);
    debug_assert!(max_threads.is_power_of_two());

    let mut threads = [1u32; 3];
    let mut budget = max_threads;
    for (i, &extent) in kernel_extents.iter().take(3).enumerate() {
        let want = (extent.max(1) as u32).next_power_of_two();
        let cap = prev_power_of_two(budget);
        threads[i] = want.min(cap);
        budget /= threads[i];
    }
    // remaining budget maximizes the fastest-varying axis
    threads[0] *= prev_power_of_two(budget);
    threads
}

/// Dispatch counts: `ceil(extent / threads)` per grid axis
pub fn plan_dispatch(grid_extents: &[usize], threads: [u32; 3]) -> [u32; 3] {
    let mut counts = [1u32; 3];
    for (i, &extent) in grid_extents.iter().take(3).enumerate() {
        counts[i] = (extent as u32).div_ceil(threads[i]);
    }
    counts
}

fn prev_power_of_two(v: u32) -> u32 {
    debug_assert!(v >= 1);
    1 << (31 - v.leading_zeros())
}
