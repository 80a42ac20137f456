//! Matrix-free operator traits and combinators
//!
//! A [`Map`] is anything that turns a flat buffer into another flat buffer;
//! a [`LinOp`] additionally exposes the exact adjoint and a Lipschitz-constant
//! estimate. Composite operators are assembled from [`DynOp`] handles through
//! the free functions in this module ([`add`], [`compose`], [`vstack`],
//! [`block_diag`], [`sum_axes`], [`scale`]), each of which implements the
//! matching adjoint so `<Ax, y> == <x, A*y>` holds for every composition.
//!
//! # Stacked-batch contract
//!
//! Every operator accepts inputs whose length is any multiple of `dim()`;
//! the buffer is interpreted as stacked independent signals and the output
//! has the same number of stacked blocks of length `codim()`. Combinators
//! preserve this contract.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::numeric::Scalar;

/// A (possibly nonlinear) map between flat buffers
pub trait Map<T: Scalar>: Send + Sync {
    /// Length of one unbatched input signal
    fn dim(&self) -> usize;

    /// Length of one unbatched output signal
    fn codim(&self) -> usize;

    /// Evaluate the map on a stacked batch of signals
    fn apply(&self, arr: &[T]) -> Result<Vec<T>>;

    /// Number of stacked signals in a buffer, or an error naming `context`
    fn batch_count(&self, len: usize, context: &str) -> Result<usize> {
        let dim = self.dim();
        if dim == 0 || len % dim != 0 {
            return Err(Error::size_mismatch(
                format!("{context} (a multiple of the operator dimension)"),
                dim,
                len,
            ));
        }
        Ok(len / dim)
    }
}

/// A linear operator with an exact adjoint
pub trait LinOp<T: Scalar>: Map<T> {
    /// Evaluate the adjoint on a stacked batch of signals
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>>;

    /// Upper bound on the operator norm (not necessarily tight)
    fn lipschitz(&self) -> f64;
}

/// Shared handle to a linear operator
pub type DynOp<T> = Arc<dyn LinOp<T>>;

// ---------------------------------------------------------------------------
// Homothety: tagged-variant diagonal operators
// ---------------------------------------------------------------------------

/// Diagonal operator with a closed set of structural variants.
///
/// One operator type, many structurally-different behaviors: the variant is
/// selected once at construction and dispatch is a plain `match`.
#[derive(Clone, Debug)]
pub enum Homothety<T: Scalar> {
    /// The zero operator
    Zero { dim: usize },
    /// The identity
    Identity { dim: usize },
    /// Uniform scaling by a single factor
    Uniform { dim: usize, alpha: T },
    /// General elementwise scaling
    Diagonal { diag: Vec<T> },
}

impl<T: Scalar> Homothety<T> {
    pub fn zero(dim: usize) -> Self {
        Homothety::Zero { dim }
    }

    pub fn identity(dim: usize) -> Self {
        Homothety::Identity { dim }
    }

    pub fn uniform(dim: usize, alpha: T) -> Self {
        Homothety::Uniform { dim, alpha }
    }

    pub fn diagonal(diag: Vec<T>) -> Result<Self> {
        if diag.is_empty() {
            return Err(Error::invalid_parameter("diag", "must be non-empty"));
        }
        Ok(Homothety::Diagonal { diag })
    }

    /// Shared handle
    pub fn into_dyn(self) -> DynOp<T> {
        Arc::new(self)
    }
}

impl<T: Scalar> Map<T> for Homothety<T> {
    fn dim(&self) -> usize {
        match self {
            Homothety::Zero { dim }
            | Homothety::Identity { dim }
            | Homothety::Uniform { dim, .. } => *dim,
            Homothety::Diagonal { diag } => diag.len(),
        }
    }

    fn codim(&self) -> usize {
        self.dim()
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        self.batch_count(arr.len(), "homothety input")?;
        let out = match self {
            Homothety::Zero { .. } => vec![T::zero(); arr.len()],
            Homothety::Identity { .. } => arr.to_vec(),
            Homothety::Uniform { alpha, .. } => arr.iter().map(|&x| x * *alpha).collect(),
            Homothety::Diagonal { diag } => arr
                .iter()
                .enumerate()
                .map(|(i, &x)| x * diag[i % diag.len()])
                .collect(),
        };
        Ok(out)
    }
}

impl<T: Scalar> LinOp<T> for Homothety<T> {
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>> {
        // real diagonal operators are self-adjoint
        self.apply(arr)
    }

    fn lipschitz(&self) -> f64 {
        match self {
            Homothety::Zero { .. } => 0.0,
            Homothety::Identity { .. } => 1.0,
            Homothety::Uniform { alpha, .. } => alpha.as_f64().abs(),
            Homothety::Diagonal { diag } => diag
                .iter()
                .map(|d| d.as_f64().abs())
                .fold(0.0, f64::max),
        }
    }
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

struct Scaled<T: Scalar> {
    op: DynOp<T>,
    alpha: T,
}

impl<T: Scalar> Map<T> for Scaled<T> {
    fn dim(&self) -> usize {
        self.op.dim()
    }

    fn codim(&self) -> usize {
        self.op.codim()
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        let mut out = self.op.apply(arr)?;
        for v in &mut out {
            *v = *v * self.alpha;
        }
        Ok(out)
    }
}

impl<T: Scalar> LinOp<T> for Scaled<T> {
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>> {
        let mut out = self.op.adjoint(arr)?;
        for v in &mut out {
            *v = *v * self.alpha;
        }
        Ok(out)
    }

    fn lipschitz(&self) -> f64 {
        self.alpha.as_f64().abs() * self.op.lipschitz()
    }
}

struct OpAdd<T: Scalar> {
    a: DynOp<T>,
    b: DynOp<T>,
}

impl<T: Scalar> Map<T> for OpAdd<T> {
    fn dim(&self) -> usize {
        self.a.dim()
    }

    fn codim(&self) -> usize {
        self.a.codim()
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        let mut out = self.a.apply(arr)?;
        let rhs = self.b.apply(arr)?;
        for (o, r) in out.iter_mut().zip(rhs) {
            *o = *o + r;
        }
        Ok(out)
    }
}

impl<T: Scalar> LinOp<T> for OpAdd<T> {
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>> {
        let mut out = self.a.adjoint(arr)?;
        let rhs = self.b.adjoint(arr)?;
        for (o, r) in out.iter_mut().zip(rhs) {
            *o = *o + r;
        }
        Ok(out)
    }

    fn lipschitz(&self) -> f64 {
        self.a.lipschitz() + self.b.lipschitz()
    }
}

struct Composed<T: Scalar> {
    outer: DynOp<T>,
    inner: DynOp<T>,
}

impl<T: Scalar> Map<T> for Composed<T> {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn codim(&self) -> usize {
        self.outer.codim()
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        self.outer.apply(&self.inner.apply(arr)?)
    }
}

impl<T: Scalar> LinOp<T> for Composed<T> {
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>> {
        self.inner.adjoint(&self.outer.adjoint(arr)?)
    }

    fn lipschitz(&self) -> f64 {
        self.outer.lipschitz() * self.inner.lipschitz()
    }
}

struct VStack<T: Scalar> {
    ops: Vec<DynOp<T>>,
    dim: usize,
    codims: Vec<usize>,
    codim_total: usize,
}

impl<T: Scalar> Map<T> for VStack<T> {
    fn dim(&self) -> usize {
        self.dim
    }

    fn codim(&self) -> usize {
        self.codim_total
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        let batches = self.batch_count(arr.len(), "vstack input")?;
        let outs: Vec<Vec<T>> = self
            .ops
            .iter()
            .map(|op| op.apply(arr))
            .collect::<Result<_>>()?;
        let mut out = vec![T::zero(); batches * self.codim_total];
        for s in 0..batches {
            let mut offset = 0;
            for (o, &c) in outs.iter().zip(&self.codims) {
                out[s * self.codim_total + offset..s * self.codim_total + offset + c]
                    .copy_from_slice(&o[s * c..(s + 1) * c]);
                offset += c;
            }
        }
        Ok(out)
    }
}

impl<T: Scalar> LinOp<T> for VStack<T> {
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>> {
        if arr.len() % self.codim_total != 0 {
            return Err(Error::size_mismatch(
                "vstack adjoint input",
                self.codim_total,
                arr.len(),
            ));
        }
        let batches = arr.len() / self.codim_total;
        let mut out = vec![T::zero(); batches * self.dim];
        let mut offset = 0;
        for (op, &c) in self.ops.iter().zip(&self.codims) {
            let mut part = vec![T::zero(); batches * c];
            for s in 0..batches {
                part[s * c..(s + 1) * c].copy_from_slice(
                    &arr[s * self.codim_total + offset..s * self.codim_total + offset + c],
                );
            }
            let back = op.adjoint(&part)?;
            for (o, b) in out.iter_mut().zip(back) {
                *o = *o + b;
            }
            offset += c;
        }
        Ok(out)
    }

    fn lipschitz(&self) -> f64 {
        self.ops
            .iter()
            .map(|op| op.lipschitz().powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

struct BlockDiag<T: Scalar> {
    ops: Vec<DynOp<T>>,
    dims: Vec<usize>,
    codims: Vec<usize>,
    dim_total: usize,
    codim_total: usize,
}

impl<T: Scalar> Map<T> for BlockDiag<T> {
    fn dim(&self) -> usize {
        self.dim_total
    }

    fn codim(&self) -> usize {
        self.codim_total
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        let batches = self.batch_count(arr.len(), "block-diag input")?;
        let mut out = vec![T::zero(); batches * self.codim_total];
        let mut in_off = 0;
        let mut out_off = 0;
        for ((op, &d), &c) in self.ops.iter().zip(&self.dims).zip(&self.codims) {
            let mut part = vec![T::zero(); batches * d];
            for s in 0..batches {
                part[s * d..(s + 1) * d]
                    .copy_from_slice(&arr[s * self.dim_total + in_off..s * self.dim_total + in_off + d]);
            }
            let res = op.apply(&part)?;
            for s in 0..batches {
                out[s * self.codim_total + out_off..s * self.codim_total + out_off + c]
                    .copy_from_slice(&res[s * c..(s + 1) * c]);
            }
            in_off += d;
            out_off += c;
        }
        Ok(out)
    }
}

impl<T: Scalar> LinOp<T> for BlockDiag<T> {
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>> {
        if arr.len() % self.codim_total != 0 {
            return Err(Error::size_mismatch(
                "block-diag adjoint input",
                self.codim_total,
                arr.len(),
            ));
        }
        let batches = arr.len() / self.codim_total;
        let mut out = vec![T::zero(); batches * self.dim_total];
        let mut in_off = 0;
        let mut out_off = 0;
        for ((op, &d), &c) in self.ops.iter().zip(&self.dims).zip(&self.codims) {
            let mut part = vec![T::zero(); batches * c];
            for s in 0..batches {
                part[s * c..(s + 1) * c].copy_from_slice(
                    &arr[s * self.codim_total + out_off..s * self.codim_total + out_off + c],
                );
            }
            let res = op.adjoint(&part)?;
            for s in 0..batches {
                out[s * self.dim_total + in_off..s * self.dim_total + in_off + d]
                    .copy_from_slice(&res[s * d..(s + 1) * d]);
            }
            in_off += d;
            out_off += c;
        }
        Ok(out)
    }

    fn lipschitz(&self) -> f64 {
        self.ops.iter().map(|op| op.lipschitz()).fold(0.0, f64::max)
    }
}

/// Summation over the leading (stacking) axis: `(outer, inner) -> (inner)`.
///
/// The adjoint tiles its input `outer` times.
#[derive(Clone, Debug)]
pub struct SumAxes {
    outer: usize,
    inner: usize,
}

impl SumAxes {
    pub fn new(outer: usize, inner: usize) -> Self {
        Self { outer, inner }
    }
}

impl<T: Scalar> Map<T> for SumAxes {
    fn dim(&self) -> usize {
        self.outer * self.inner
    }

    fn codim(&self) -> usize {
        self.inner
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        let batches = Map::<T>::batch_count(self, arr.len(), "axis-sum input")?;
        let dim = self.outer * self.inner;
        let mut out = vec![T::zero(); batches * self.inner];
        for s in 0..batches {
            for b in 0..self.outer {
                let block = &arr[s * dim + b * self.inner..s * dim + (b + 1) * self.inner];
                for (o, &x) in out[s * self.inner..(s + 1) * self.inner].iter_mut().zip(block) {
                    *o = *o + x;
                }
            }
        }
        Ok(out)
    }
}

impl<T: Scalar> LinOp<T> for SumAxes {
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>> {
        if arr.len() % self.inner != 0 {
            return Err(Error::size_mismatch(
                "axis-sum adjoint input",
                self.inner,
                arr.len(),
            ));
        }
        let batches = arr.len() / self.inner;
        let dim = self.outer * self.inner;
        let mut out = vec![T::zero(); batches * dim];
        for s in 0..batches {
            let block = &arr[s * self.inner..(s + 1) * self.inner];
            for b in 0..self.outer {
                out[s * dim + b * self.inner..s * dim + (b + 1) * self.inner]
                    .copy_from_slice(block);
            }
        }
        Ok(out)
    }

    fn lipschitz(&self) -> f64 {
        (self.outer as f64).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Free constructors
// ---------------------------------------------------------------------------

/// Scalar multiple `alpha * op`
pub fn scale<T: Scalar>(alpha: T, op: DynOp<T>) -> DynOp<T> {
    Arc::new(Scaled { op, alpha })
}

/// Operator sum `a + b`
pub fn add<T: Scalar>(a: DynOp<T>, b: DynOp<T>) -> Result<DynOp<T>> {
    if a.dim() != b.dim() || a.codim() != b.codim() {
        return Err(Error::InvalidInput(format!(
            "operator sum requires matching shapes, got ({}, {}) and ({}, {})",
            a.codim(),
            a.dim(),
            b.codim(),
            b.dim()
        )));
    }
    Ok(Arc::new(OpAdd { a, b }))
}

/// Operator difference `a - b`
pub fn sub<T: Scalar>(a: DynOp<T>, b: DynOp<T>) -> Result<DynOp<T>> {
    add(a, scale(-T::one(), b))
}

/// Composition `outer * inner` (inner applied first)
pub fn compose<T: Scalar>(outer: DynOp<T>, inner: DynOp<T>) -> Result<DynOp<T>> {
    if outer.dim() != inner.codim() {
        return Err(Error::size_mismatch(
            "operator composition (outer dim vs inner codim)",
            outer.dim(),
            inner.codim(),
        ));
    }
    Ok(Arc::new(Composed { outer, inner }))
}

/// Vertical stack `[A_0; A_1; ...]`: all inputs shared, outputs concatenated
pub fn vstack<T: Scalar>(ops: Vec<DynOp<T>>) -> Result<DynOp<T>> {
    let first = ops
        .first()
        .ok_or_else(|| Error::InvalidInput("cannot stack zero operators".to_string()))?;
    let dim = first.dim();
    if ops.iter().any(|op| op.dim() != dim) {
        return Err(Error::InvalidInput(
            "all stacked operators must share the same input dimension".to_string(),
        ));
    }
    let codims: Vec<usize> = ops.iter().map(|op| op.codim()).collect();
    let codim_total = codims.iter().sum();
    Ok(Arc::new(VStack {
        ops,
        dim,
        codims,
        codim_total,
    }))
}

/// Block-diagonal `diag(A_0, A_1, ...)`: inputs and outputs concatenated
pub fn block_diag<T: Scalar>(ops: Vec<DynOp<T>>) -> Result<DynOp<T>> {
    if ops.is_empty() {
        return Err(Error::InvalidInput(
            "cannot build a block-diagonal of zero operators".to_string(),
        ));
    }
    let dims: Vec<usize> = ops.iter().map(|op| op.dim()).collect();
    let codims: Vec<usize> = ops.iter().map(|op| op.codim()).collect();
    let dim_total = dims.iter().sum();
    let codim_total = codims.iter().sum();
    Ok(Arc::new(BlockDiag {
        ops,
        dims,
        codims,
        dim_total,
        codim_total,
    }))
}

/// Summation over the leading axis of a `(outer, inner)` stacked buffer
pub fn sum_axes<T: Scalar>(outer: usize, inner: usize) -> DynOp<T> {
    Arc::new(SumAxes::new(outer, inner))
}
