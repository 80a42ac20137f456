//! Differential-operator and filter builders
//!
//! Each builder derives per-axis kernels from a declarative specification,
//! instantiates one or more stencil operators, and combines them through
//! the operator-algebra combinators into a single composite with documented
//! adjoint conventions. Composite outputs carry [`DiffOp`]'s
//! `unravel`/`ravel` helpers, which reshape flat output into
//! `[n_components, *arg_shape]` - a view transform with no effect on
//! `apply`/`adjoint` semantics.
//!
//! Sign/ordering conventions reproduced exactly:
//!
//! * forward-scheme [`divergence`] uses the backward-scheme gradient
//!   internally (and vice versa), realizing `div = -grad*` under the
//!   forward/backward discretization asymmetry;
//! * [`hessian`] with an unspecified finite-difference scheme uses central
//!   differences for the pure second-order diagonal terms;
//! * directional operators normalize direction fields to unit norm, and
//!   second-order forms double the off-diagonal (mixed-partial)
//!   contributions while summing only the upper-triangular axis pairs.

pub mod directional;
pub mod filters;
pub mod ops;
pub mod params;
pub mod partial;
pub mod structure_tensor;
pub mod unravel;

pub use directional::{
    directional_derivative, directional_gradient, directional_hessian, directional_laplacian,
    Directions,
};
pub use filters::{
    difference_of_gaussians, gaussian, laplace, moving_average, prewitt, scharr, sobel,
    EdgeFilter,
};
pub use ops::{divergence, gradient, hessian, jacobian, laplacian, HessianDirections};
pub use params::{DiffConfig, DiffMethod};
pub use partial::PartialDerivative;
pub use structure_tensor::StructureTensor;
pub use unravel::DiffOp;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::directional::{
        directional_derivative, directional_gradient, directional_hessian,
        directional_laplacian, Directions,
    };
    pub use crate::filters::{
        difference_of_gaussians, gaussian, laplace, moving_average, prewitt, scharr, sobel,
        EdgeFilter,
    };
    pub use crate::ops::{divergence, gradient, hessian, jacobian, laplacian, HessianDirections};
    pub use crate::params::{DiffConfig, DiffMethod};
    pub use crate::partial::PartialDerivative;
    pub use crate::structure_tensor::StructureTensor;
    pub use crate::unravel::DiffOp;
}
