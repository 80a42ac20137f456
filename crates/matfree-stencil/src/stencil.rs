//! The stencil linear operator
//!
//! [`Stencil`] evaluates the correlation
//!
//! ```text
//! y[i] = sum_q x[i - center + q] * k[q]
//! ```
//!
//! over arbitrarily-shaped stacked batches of N-d signals, and the exact
//! adjoint: correlation with the axis-reversed kernel and reflected center,
//! which equals convolution with the original kernel.
//!
//! # Adjoint exactness
//!
//! `<apply(x), y> == <x, adjoint(y)>` is guaranteed for index positions
//! unaffected by boundary truncation (distance >= kernel radius from every
//! edge). Full-operator exactness requires the caller to compose the
//! stencil with a matching [`Pad`](matfree_core::pad::Pad)/
//! [`Trim`](matfree_core::pad::Trim) pair so the boundary mode's assumption
//! and the adjoint's implicit zero-extension agree. This is a documented
//! caller responsibility, not something the stencil enforces.

use matfree_core::boundary::{broadcast_modes, BoundaryMode};
use matfree_core::error::{Error, Result};
use matfree_core::linop::{LinOp, Map};
use matfree_core::numeric::Scalar;
use matfree_core::shape::size;

use crate::backend::{chunked, cpu, Backend};
use crate::kernel::KernelSpec;

#[cfg(feature = "gpu")]
use crate::backend::gpu::GpuStencil;

enum Exec {
    Cpu,
    Chunked(crate::backend::ChunkOptions),
    #[cfg(feature = "gpu")]
    Gpu(GpuStencil),
}

/// Correlation operator over stacked batches of N-d signals.
///
/// Immutable after construction; `apply`/`adjoint` are pure and safe to
/// share across threads.
pub struct Stencil<T: Scalar> {
    arg_shape: Vec<usize>,
    kernel: KernelSpec<T>,
    adjoint_kernel: KernelSpec<T>,
    modes: Vec<BoundaryMode>,
    exec: Exec,
    enable_warnings: bool,
    dim: usize,
}

impl<T: Scalar> Stencil<T> {
    /// Build a stencil on the CPU backend.
    ///
    /// `modes` is a single shared boundary mode or one per axis.
    pub fn new(arg_shape: &[usize], kernel: KernelSpec<T>, modes: &[BoundaryMode]) -> Result<Self> {
        Self::with_backend(arg_shape, kernel, modes, Backend::Cpu)
    }

    /// Build a stencil on an explicit execution backend.
    ///
    /// The backend is resolved here, once; evaluation dispatches on the
    /// resolved tag with no fallback between backends.
    pub fn with_backend(
        arg_shape: &[usize],
        kernel: KernelSpec<T>,
        modes: &[BoundaryMode],
        backend: Backend,
    ) -> Result<Self> {
        if arg_shape.is_empty() || arg_shape.contains(&0) {
            return Err(Error::invalid_parameter(
                "arg_shape",
                "must be non-empty with strictly positive extents",
            ));
        }
        if kernel.ndim() != arg_shape.len() {
            return Err(Error::size_mismatch(
                "kernel rank vs arg_shape rank",
                arg_shape.len(),
                kernel.ndim(),
            ));
        }
        let modes = broadcast_modes(modes, arg_shape.len())?;

        let exec = match backend {
            Backend::Cpu => Exec::Cpu,
            Backend::Chunked(opts) => {
                if opts.chunk_len == 0 {
                    return Err(Error::invalid_parameter(
                        "chunk_len",
                        "must be at least 1",
                    ));
                }
                Exec::Chunked(opts)
            }
            #[cfg(feature = "gpu")]
            Backend::Gpu => {
                if T::PRECISION != matfree_core::precision::Precision::Single {
                    return Err(Error::Backend(
                        "the GPU backend computes in f32; requested working precision is f64"
                            .to_string(),
                    ));
                }
                Exec::Gpu(GpuStencil::new(&kernel)?)
            }
        };

        let adjoint_kernel = kernel.adjoint();
        Ok(Self {
            dim: size(arg_shape),
            arg_shape: arg_shape.to_vec(),
            kernel,
            adjoint_kernel,
            modes,
            exec,
            enable_warnings: true,
        })
    }

    /// Suppress (or re-enable) precision-mismatch warnings
    pub fn enable_warnings(mut self, enable: bool) -> Self {
        self.enable_warnings = enable;
        self
    }

    pub fn arg_shape(&self) -> &[usize] {
        &self.arg_shape
    }

    pub fn kernel(&self) -> &KernelSpec<T> {
        &self.kernel
    }

    pub fn modes(&self) -> &[BoundaryMode] {
        &self.modes
    }

    /// Per-axis halo `(left, right)` widths required by blocked evaluation
    pub fn widths(&self) -> Vec<(usize, usize)> {
        (0..self.arg_shape.len())
            .map(|d| self.kernel.width(d))
            .collect()
    }

    /// Apply with inputs held in `f64`, coercing to the working precision.
    ///
    /// A precision-mismatch warning is emitted (suppressible through
    /// [`enable_warnings`](Self::enable_warnings)) when the cast narrows.
    pub fn apply_coerced(&self, arr: &[f64]) -> Result<Vec<T>> {
        let arr = matfree_core::precision::coerce_from_f64::<T>(arr, self.enable_warnings);
        self.apply(&arr)
    }

    /// Render the kernel with its center tap parenthesized
    pub fn visualize(&self) -> String {
        match &self.kernel {
            KernelSpec::Separable(axes) => axes
                .iter()
                .enumerate()
                .map(|(d, k)| format!("axis {d}: {k}"))
                .collect::<Vec<_>>()
                .join("\n"),
            KernelSpec::Full(k) => format!(
                "joint kernel, shape {:?}, center {:?}",
                k.shape(),
                k.center()
            ),
        }
    }

    fn run(&self, arr: &[T], spec: &KernelSpec<T>) -> Result<Vec<T>> {
        let batches = self.batch_count(arr.len(), "stencil input")?;
        let mut out = vec![T::zero(); arr.len()];
        for (x, y) in arr
            .chunks(self.dim)
            .zip(out.chunks_mut(self.dim))
            .take(batches)
        {
            match &self.exec {
                Exec::Cpu => cpu::correlate_spec(x, y, &self.arg_shape, spec, &self.modes),
                Exec::Chunked(opts) => {
                    chunked::correlate_chunked(x, y, &self.arg_shape, spec, &self.modes, *opts)
                }
                #[cfg(feature = "gpu")]
                Exec::Gpu(gpu) => gpu.correlate(x, y, &self.arg_shape, spec, &self.modes)?,
            }
        }
        Ok(out)
    }
}

impl<T: Scalar> Map<T> for Stencil<T> {
    fn dim(&self) -> usize {
        self.dim
    }

    fn codim(&self) -> usize {
        self.dim
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        self.run(arr, &self.kernel)
    }
}

impl<T: Scalar> LinOp<T> for Stencil<T> {
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>> {
        self.run(arr, &self.adjoint_kernel)
    }

    fn lipschitz(&self) -> f64 {
        // cheap and sound, not tight
        2.0 * self.kernel.max_abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Kernel1d, KernelSpec, NdKernel};
    use approx::assert_relative_eq;

    fn box3<T: Scalar>() -> KernelSpec<T> {
        KernelSpec::Separable(vec![
            Kernel1d::new(vec![T::one(), T::one(), T::one()], 1).unwrap()
        ])
    }

    #[test]
    fn test_wrap_scenario() {
        // arg_shape=(10,), kernel [1,1,1], center 1, mode wrap:
        // out[0] == x[9] + x[0] + x[1]
        let x: Vec<f64> = (0..10).map(|i| (i as f64).cos()).collect();
        let op = Stencil::new(&[10], box3(), &[BoundaryMode::Wrap]).unwrap();
        let y = op.apply(&x).unwrap();
        assert_relative_eq!(y[0], x[9] + x[0] + x[1], max_relative = 1e-12);
    }

    #[test]
    fn test_batched_apply() {
        let op = Stencil::new(&[4], box3(), &[BoundaryMode::Constant]).unwrap();
        let single: Vec<f64> = op.apply(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let double = op
            .apply(&[1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0])
            .unwrap();
        assert_eq!(&double[..4], single.as_slice());
        assert_eq!(&double[4..], single.as_slice());
    }

    #[test]
    fn test_rejects_bad_input_length() {
        let op = Stencil::<f64>::new(&[4], box3(), &[BoundaryMode::Constant]).unwrap();
        assert!(op.apply(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_rank_mismatch_rejected() {
        let k = KernelSpec::Separable(vec![Kernel1d::<f64>::identity()]);
        assert!(Stencil::new(&[4, 4], k, &[BoundaryMode::Constant]).is_err());
    }

    #[test]
    fn test_adjoint_flips_kernel() {
        // forward difference adjoint is the negated backward difference
        let k = KernelSpec::Separable(vec![Kernel1d::new(vec![-1.0, 1.0], 0).unwrap()]);
        let op = Stencil::new(&[5], k, &[BoundaryMode::Constant]).unwrap();
        let y: Vec<f64> = op.adjoint(&[0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
        // adjoint kernel [1, -1] with center 1: z[i] = y[i-1] - y[i]
        assert_eq!(y, vec![0.0, 0.0, -1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_lipschitz_bound() {
        let k = KernelSpec::Full(
            NdKernel::new(vec![1.0, -3.0, 2.0], vec![3], vec![1]).unwrap(),
        );
        let op = Stencil::new(&[8], k, &[BoundaryMode::Constant]).unwrap();
        assert_relative_eq!(op.lipschitz(), 6.0);
    }

    #[test]
    fn test_apply_coerced() {
        let op = Stencil::<f32>::new(&[3], box3(), &[BoundaryMode::Constant]).unwrap();
        let y = op
            .enable_warnings(false)
            .apply_coerced(&[1.0f64, 2.0, 3.0])
            .unwrap();
        assert_eq!(y, vec![3.0f32, 6.0, 5.0]);
    }
}
