//! Matrix-free stencil operators for large-scale inverse problems
//!
//! `matfree` turns declarative derivative and filter specifications -
//! finite differences, Gaussian derivatives, separable convolution kernels
//! - into correlation operators with exact adjoints, boundary handling, and
//! multi-backend execution, without ever materializing a dense matrix.
//!
//! The workspace splits into three layers, re-exported here:
//!
//! 1. [`matfree_core`] - scalar/precision traits, the [`Map`]/[`LinOp`]
//!    operator seam with its combinators, and the [`Pad`]/[`Trim`]
//!    boundary-extension pair.
//! 2. [`matfree_stencil`] - coefficient generation, kernel assembly, and
//!    the [`Stencil`] operator with CPU, chunked, and GPU backends.
//! 3. [`matfree_diff`] - named builders: gradient, Jacobian, divergence,
//!    Hessian, Laplacian, directional variants, and the classic filters
//!    (moving average, Gaussian, DoG, Laplace, Sobel/Prewitt/Scharr,
//!    structure tensor).
//!
//! # Example
//!
//! ```rust
//! use matfree::prelude::*;
//!
//! // d/dx of x^2, sampled on a grid
//! let x = vec![0.0, 1.0, 4.0, 9.0, 16.0, 25.0];
//! let k: Kernel1d<f64> = finite_difference(1, Scheme::Central, 1, 1.0).unwrap();
//! let op = Stencil::new(&[6], KernelSpec::Separable(vec![k]), &[BoundaryMode::Constant])
//!     .unwrap();
//! let dx = op.apply(&x).unwrap();
//! assert_eq!(&dx[1..5], &[2.0, 4.0, 6.0, 8.0]);
//! ```

pub use matfree_core;
pub use matfree_diff;
pub use matfree_stencil;

pub use matfree_core::{
    BoundaryMode, DynOp, Error, Homothety, LinOp, Map, Pad, Precision, Result, Scalar, Trim,
};
pub use matfree_diff::{DiffConfig, DiffMethod, DiffOp, StructureTensor};
pub use matfree_stencil::{
    Backend, ChunkOptions, Kernel1d, KernelSpec, NdKernel, Scheme, Stencil,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use matfree_core::prelude::*;
    pub use matfree_diff::prelude::*;
    pub use matfree_stencil::prelude::*;
}
