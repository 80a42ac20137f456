//! Stencil-based correlation operators
//!
//! This crate turns declarative derivative/filter specifications into
//! correlation operators with exact adjoints, boundary handling, and
//! multi-backend execution:
//!
//! 1. **Coefficient generation** ([`coeffs`]) - finite-difference stencils
//!    from a generalized Vandermonde solve, Gaussian-derivative stencils
//!    from sampled-and-truncated Gaussian derivatives.
//! 2. **Kernel assembly** ([`kernel`]) - 1-d taps placed into separable or
//!    joint N-d kernel descriptions with per-axis centers and halo widths.
//! 3. **The stencil operator** ([`stencil`]) - forward correlation and the
//!    exact flipped-kernel adjoint over stacked batches of N-d signals.
//! 4. **Backend dispatch** ([`backend`]) - the same logical correlation on
//!    a plain CPU loop, a chunked halo-exchange evaluator, or a wgpu
//!    compute kernel, with numerically equivalent results.

pub mod backend;
pub mod coeffs;
pub mod kernel;
pub mod stencil;

pub use backend::{Backend, ChunkOptions};
pub use coeffs::{finite_difference, gaussian_derivative, Scheme};
pub use kernel::{Kernel1d, KernelSpec, NdKernel};
pub use stencil::Stencil;

// Re-export the boundary modes shared with the Pad collaborator.
pub use matfree_core::boundary::BoundaryMode;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{Backend, ChunkOptions};
    pub use crate::coeffs::{finite_difference, gaussian_derivative, Scheme};
    pub use crate::kernel::{Kernel1d, KernelSpec, NdKernel};
    pub use crate::stencil::Stencil;
    pub use matfree_core::boundary::BoundaryMode;
}
