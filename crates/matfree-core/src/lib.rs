//! Core traits and types for matrix-free operator algebra
//!
//! This crate provides the foundation on which the stencil engine and the
//! differential-operator builders are built:
//!
//! 1. **Scalar & precision** - a small numeric trait hierarchy plus explicit
//!    precision bookkeeping (no ambient globals).
//! 2. **Operator seam** - [`Map`]/[`LinOp`] traits and the combinators used
//!    to assemble composite operators (stacking, block-diagonal, summation,
//!    diagonal scaling) without ever materializing a matrix.
//! 3. **Boundary extension** - the [`Pad`]/[`Trim`] operator pair with an
//!    exact adjoint, shared with the stencil engine's boundary modes.
//!
//! # Design Philosophy
//!
//! - **Matrix-free**: operators expose `apply`/`adjoint` on flat buffers;
//!   dense matrices never exist.
//! - **Explicit configuration**: precision and backend choices are values
//!   passed at construction, never process-wide mutable state.
//! - **Composable**: small operators combine through a handful of
//!   combinators with exact adjoints.

pub mod boundary;
pub mod error;
pub mod linop;
pub mod numeric;
pub mod pad;
pub mod precision;
pub mod shape;

pub use boundary::BoundaryMode;
pub use error::{Error, Result};
pub use linop::{
    add, block_diag, compose, scale, sub, sum_axes, vstack, DynOp, Homothety, LinOp, Map, SumAxes,
};
pub use numeric::Scalar;
pub use pad::{Pad, Trim};
pub use precision::Precision;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::boundary::BoundaryMode;
    pub use crate::error::{Error, Result};
    pub use crate::linop::{DynOp, LinOp, Map};
    pub use crate::numeric::Scalar;
    pub use crate::pad::{Pad, Trim};
    pub use crate::precision::Precision;
}
