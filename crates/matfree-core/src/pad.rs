//! Multi-dimensional padding and trimming operators
//!
//! [`Pad`] extends each axis of a signal according to a boundary mode; its
//! adjoint is the exact transpose (trim plus boundary accumulation). The
//! stencil operator documents that a globally exact adjoint requires
//! composing with a matching `Pad`/`Trim` pair; this module supplies that
//! pair.
//!
//! The forward pass extends a zero-filled buffer with the core signal, then
//! fixes the border region axis by axis. The adjoint runs the mirrored
//! accumulation in reverse axis order and extracts the core, so
//! `<Pad(x), y> == <x, Pad*(y)>` holds exactly.

use crate::boundary::{broadcast_modes, BoundaryMode};
use crate::error::{Error, Result};
use crate::linop::{LinOp, Map};
use crate::numeric::Scalar;
use crate::shape::{size, strides, IndexIter};

/// Boundary-extension linear operator
#[derive(Clone, Debug)]
pub struct Pad {
    arg_shape: Vec<usize>,
    pad_width: Vec<(usize, usize)>,
    modes: Vec<BoundaryMode>,
    pad_shape: Vec<usize>,
    dim: usize,
    codim: usize,
}

impl Pad {
    /// Build a padding operator.
    ///
    /// `pad_width[d]` is the `(left, right)` extension along axis `d`;
    /// `modes` is a single shared mode or one mode per axis.
    pub fn new(
        arg_shape: &[usize],
        pad_width: &[(usize, usize)],
        modes: &[BoundaryMode],
    ) -> Result<Self> {
        if arg_shape.is_empty() || arg_shape.contains(&0) {
            return Err(Error::invalid_parameter(
                "arg_shape",
                "must be non-empty with strictly positive extents",
            ));
        }
        if pad_width.len() != arg_shape.len() {
            return Err(Error::size_mismatch(
                "pad_width",
                arg_shape.len(),
                pad_width.len(),
            ));
        }
        let modes = broadcast_modes(modes, arg_shape.len())?;

        for (d, (&n, (&(lhs, rhs), &mode))) in arg_shape
            .iter()
            .zip(pad_width.iter().zip(&modes))
            .enumerate()
        {
            let cap = mode.max_pad_width(n);
            if lhs.max(rhs) > cap {
                return Err(Error::invalid_parameter(
                    "pad_width",
                    format!("along dim-{d} is limited to {cap} for mode `{mode}`"),
                ));
            }
        }

        let pad_shape: Vec<usize> = arg_shape
            .iter()
            .zip(pad_width)
            .map(|(&n, &(l, r))| n + l + r)
            .collect();
        let dim = size(arg_shape);
        let codim = size(&pad_shape);

        Ok(Self {
            arg_shape: arg_shape.to_vec(),
            pad_width: pad_width.to_vec(),
            modes,
            pad_shape,
            dim,
            codim,
        })
    }

    /// Pad all axes by the same `(width, width)` with a shared mode
    pub fn uniform(arg_shape: &[usize], width: usize, mode: BoundaryMode) -> Result<Self> {
        let widths = vec![(width, width); arg_shape.len()];
        Self::new(arg_shape, &widths, &[mode])
    }

    /// Shape of a padded signal
    pub fn pad_shape(&self) -> &[usize] {
        &self.pad_shape
    }

    /// Per-axis `(left, right)` widths
    pub fn pad_width(&self) -> &[(usize, usize)] {
        &self.pad_width
    }

    /// The matching trim operator (`trim * pad == identity` for every mode)
    pub fn trim(&self) -> Trim {
        Trim {
            arg_shape: self.pad_shape.clone(),
            trim_width: self.pad_width.clone(),
            core_shape: self.arg_shape.clone(),
            dim: self.codim,
            codim: self.dim,
        }
    }

    fn pad_one<T: Scalar>(&self, x: &[T], out: &mut [T]) {
        let ndim = self.arg_shape.len();
        let arg_strides = strides(&self.arg_shape);
        let pad_strides = strides(&self.pad_shape);
        let row = self.arg_shape[ndim - 1];
        let last_left = self.pad_width[ndim - 1].0;

        // embed the core
        for idx in IndexIter::new(&self.arg_shape[..ndim - 1]) {
            let mut src = 0;
            let mut dst = last_left;
            for d in 0..ndim - 1 {
                src += idx[d] * arg_strides[d];
                dst += (idx[d] + self.pad_width[d].0) * pad_strides[d];
            }
            out[dst..dst + row].copy_from_slice(&x[src..src + row]);
        }

        // apply border effects axis by axis
        for axis in 0..ndim {
            let (lhs, rhs) = self.pad_width[axis];
            let n = self.pad_shape[axis];
            let mode = self.modes[axis];
            match mode {
                BoundaryMode::Constant => {}
                BoundaryMode::Wrap => {
                    for j in 0..lhs {
                        copy_axis_row(out, &self.pad_shape, axis, j, n - rhs - lhs + j);
                    }
                    for j in 0..rhs {
                        copy_axis_row(out, &self.pad_shape, axis, n - rhs + j, lhs + j);
                    }
                }
                BoundaryMode::Reflect => {
                    for j in 0..lhs {
                        copy_axis_row(out, &self.pad_shape, axis, j, 2 * lhs - j);
                    }
                    for j in 0..rhs {
                        copy_axis_row(out, &self.pad_shape, axis, n - rhs + j, n - rhs - 2 - j);
                    }
                }
                BoundaryMode::Symmetric => {
                    for j in 0..lhs {
                        copy_axis_row(out, &self.pad_shape, axis, j, 2 * lhs - 1 - j);
                    }
                    for j in 0..rhs {
                        copy_axis_row(out, &self.pad_shape, axis, n - rhs + j, n - rhs - 1 - j);
                    }
                }
                BoundaryMode::Edge => {
                    for j in 0..lhs {
                        copy_axis_row(out, &self.pad_shape, axis, j, lhs);
                    }
                    for j in 0..rhs {
                        copy_axis_row(out, &self.pad_shape, axis, n - rhs + j, n - rhs - 1);
                    }
                }
            }
        }
    }

    fn adjoint_one<T: Scalar>(&self, y: &[T], out: &mut [T]) {
        let ndim = self.arg_shape.len();
        let mut buf = y.to_vec();

        // accumulate border contributions, reverse axis order of the forward pass
        for axis in (0..ndim).rev() {
            let (lhs, rhs) = self.pad_width[axis];
            let n = self.pad_shape[axis];
            match self.modes[axis] {
                BoundaryMode::Constant => {}
                BoundaryMode::Wrap => {
                    for j in 0..lhs {
                        add_axis_row(&mut buf, &self.pad_shape, axis, n - rhs - lhs + j, j);
                    }
                    for j in 0..rhs {
                        add_axis_row(&mut buf, &self.pad_shape, axis, lhs + j, n - rhs + j);
                    }
                }
                BoundaryMode::Reflect => {
                    for j in 0..lhs {
                        add_axis_row(&mut buf, &self.pad_shape, axis, lhs + 1 + j, lhs - 1 - j);
                    }
                    for j in 0..rhs {
                        add_axis_row(&mut buf, &self.pad_shape, axis, n - 2 * rhs - 1 + j, n - 1 - j);
                    }
                }
                BoundaryMode::Symmetric => {
                    for j in 0..lhs {
                        add_axis_row(&mut buf, &self.pad_shape, axis, lhs + j, lhs - 1 - j);
                    }
                    for j in 0..rhs {
                        add_axis_row(&mut buf, &self.pad_shape, axis, n - 2 * rhs + j, n - 1 - j);
                    }
                }
                BoundaryMode::Edge => {
                    for j in 0..lhs {
                        add_axis_row(&mut buf, &self.pad_shape, axis, lhs, j);
                    }
                    for j in 0..rhs {
                        add_axis_row(&mut buf, &self.pad_shape, axis, n - rhs - 1, n - rhs + j);
                    }
                }
            }
        }

        // extract the core
        let pad_strides = strides(&self.pad_shape);
        let arg_strides = strides(&self.arg_shape);
        let row = self.arg_shape[ndim - 1];
        let last_left = self.pad_width[ndim - 1].0;
        for idx in IndexIter::new(&self.arg_shape[..ndim - 1]) {
            let mut src = last_left;
            let mut dst = 0;
            for d in 0..ndim - 1 {
                src += (idx[d] + self.pad_width[d].0) * pad_strides[d];
                dst += idx[d] * arg_strides[d];
            }
            out[dst..dst + row].copy_from_slice(&buf[src..src + row]);
        }
    }
}

/// Copy hyperplane `src` of `axis` onto hyperplane `dst` (rows must differ)
fn copy_axis_row<T: Scalar>(
    buf: &mut [T],
    shape: &[usize],
    axis: usize,
    dst: usize,
    src: usize,
) {
    debug_assert_ne!(dst, src);
    let pre: usize = shape[..axis].iter().product();
    let n = shape[axis];
    let post: usize = shape[axis + 1..].iter().product();
    for p in 0..pre {
        let src_off = (p * n + src) * post;
        let dst_off = (p * n + dst) * post;
        buf.copy_within(src_off..src_off + post, dst_off);
    }
}

/// Accumulate hyperplane `src` into hyperplane `dst` (rows must differ)
fn add_axis_row<T: Scalar>(buf: &mut [T], shape: &[usize], axis: usize, dst: usize, src: usize) {
    debug_assert_ne!(dst, src);
    let pre: usize = shape[..axis].iter().product();
    let n = shape[axis];
    let post: usize = shape[axis + 1..].iter().product();
    for p in 0..pre {
        let src_off = (p * n + src) * post;
        let dst_off = (p * n + dst) * post;
        for k in 0..post {
            let v = buf[src_off + k];
            buf[dst_off + k] = buf[dst_off + k] + v;
        }
    }
}

impl<T: Scalar> Map<T> for Pad {
    fn dim(&self) -> usize {
        self.dim
    }

    fn codim(&self) -> usize {
        self.codim
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        let batches = Map::<T>::batch_count(self, arr.len(), "pad input")?;
        let mut out = vec![T::zero(); batches * self.codim];
        for (x, y) in arr.chunks(self.dim).zip(out.chunks_mut(self.codim)) {
            self.pad_one(x, y);
        }
        Ok(out)
    }
}

impl<T: Scalar> LinOp<T> for Pad {
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>> {
        if arr.is_empty() || arr.len() % self.codim != 0 {
            return Err(Error::size_mismatch(
                "pad adjoint input",
                self.codim,
                arr.len(),
            ));
        }
        let batches = arr.len() / self.codim;
        let mut out = vec![T::zero(); batches * self.dim];
        for (y, x) in arr.chunks(self.codim).zip(out.chunks_mut(self.dim)) {
            self.adjoint_one(y, x);
        }
        Ok(out)
    }

    fn lipschitz(&self) -> f64 {
        // product of per-axis 1-d padding bounds
        self.arg_shape
            .iter()
            .zip(self.modes.iter().zip(&self.pad_width))
            .map(|(&n, (&mode, &(lhs, rhs)))| {
                let w = (lhs + rhs) as f64;
                match mode {
                    BoundaryMode::Constant => 1.0,
                    BoundaryMode::Wrap | BoundaryMode::Symmetric => {
                        (1.0 + (w / n as f64).ceil()).sqrt()
                    }
                    BoundaryMode::Reflect => (1.0 + (w / (n as f64 - 2.0)).ceil()).sqrt(),
                    BoundaryMode::Edge => (1.0 + lhs.max(rhs) as f64).sqrt(),
                }
            })
            .product()
    }
}

/// Trimming linear operator: extracts the core of a padded signal.
///
/// The adjoint embeds the core back with zero borders.
#[derive(Clone, Debug)]
pub struct Trim {
    arg_shape: Vec<usize>,
    trim_width: Vec<(usize, usize)>,
    core_shape: Vec<usize>,
    dim: usize,
    codim: usize,
}

impl Trim {
    pub fn new(arg_shape: &[usize], trim_width: &[(usize, usize)]) -> Result<Self> {
        if arg_shape.is_empty() || arg_shape.contains(&0) {
            return Err(Error::invalid_parameter(
                "arg_shape",
                "must be non-empty with strictly positive extents",
            ));
        }
        if trim_width.len() != arg_shape.len() {
            return Err(Error::size_mismatch(
                "trim_width",
                arg_shape.len(),
                trim_width.len(),
            ));
        }
        let core_shape: Vec<usize> = arg_shape
            .iter()
            .zip(trim_width)
            .map(|(&n, &(l, r))| {
                n.checked_sub(l + r)
                    .filter(|&c| c > 0)
                    .ok_or_else(|| {
                        Error::invalid_parameter("trim_width", "leaves an empty core")
                    })
            })
            .collect::<Result<_>>()?;
        let dim = size(arg_shape);
        let codim = size(&core_shape);
        Ok(Self {
            arg_shape: arg_shape.to_vec(),
            trim_width: trim_width.to_vec(),
            core_shape,
            dim,
            codim,
        })
    }

    /// Shape of the trimmed core
    pub fn core_shape(&self) -> &[usize] {
        &self.core_shape
    }

    fn for_each_core_row(&self, mut f: impl FnMut(usize, usize)) {
        let ndim = self.arg_shape.len();
        let outer_strides = strides(&self.arg_shape);
        let core_strides = strides(&self.core_shape);
        for idx in IndexIter::new(&self.core_shape[..ndim - 1]) {
            let mut outer = self.trim_width[ndim - 1].0;
            let mut core = 0;
            for d in 0..ndim - 1 {
                outer += (idx[d] + self.trim_width[d].0) * outer_strides[d];
                core += idx[d] * core_strides[d];
            }
            f(outer, core);
        }
    }
}

impl<T: Scalar> Map<T> for Trim {
    fn dim(&self) -> usize {
        self.dim
    }

    fn codim(&self) -> usize {
        self.codim
    }

    fn apply(&self, arr: &[T]) -> Result<Vec<T>> {
        let batches = Map::<T>::batch_count(self, arr.len(), "trim input")?;
        let row = self.core_shape[self.core_shape.len() - 1];
        let mut out = vec![T::zero(); batches * self.codim];
        for (x, y) in arr.chunks(self.dim).zip(out.chunks_mut(self.codim)) {
            self.for_each_core_row(|outer, core| {
                y[core..core + row].copy_from_slice(&x[outer..outer + row]);
            });
        }
        Ok(out)
    }
}

impl<T: Scalar> LinOp<T> for Trim {
    fn adjoint(&self, arr: &[T]) -> Result<Vec<T>> {
        if arr.is_empty() || arr.len() % self.codim != 0 {
            return Err(Error::size_mismatch(
                "trim adjoint input",
                self.codim,
                arr.len(),
            ));
        }
        let batches = arr.len() / self.codim;
        let row = self.core_shape[self.core_shape.len() - 1];
        let mut out = vec![T::zero(); batches * self.dim];
        for (y, x) in arr.chunks(self.codim).zip(out.chunks_mut(self.dim)) {
            self.for_each_core_row(|outer, core| {
                x[outer..outer + row].copy_from_slice(&y[core..core + row]);
            });
        }
        Ok(out)
    }

    fn lipschitz(&self) -> f64 {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_wrap_pad_matches_matrix_form() {
        // Pad((3,), (1, 1), wrap): [a b c] -> [c a b c a]
        let pad = Pad::new(&[3], &[(1, 1)], &[BoundaryMode::Wrap]).unwrap();
        let out: Vec<f64> = pad.apply(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out, vec![3.0, 1.0, 2.0, 3.0, 1.0]);

        // adjoint = matrix transpose: [y1+y4, y2, y3+y0]
        let back: Vec<f64> = pad.adjoint(&[10.0, 1.0, 2.0, 3.0, 40.0]).unwrap();
        assert_eq!(back, vec![1.0 + 40.0, 2.0, 3.0 + 10.0]);
    }

    #[test]
    fn test_pad_modes_1d() {
        let x = vec![1.0f64, 2.0, 3.0, 4.0];
        let expect = |mode: BoundaryMode| -> Vec<f64> {
            match mode {
                BoundaryMode::Constant => vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 0.0, 0.0],
                BoundaryMode::Wrap => vec![3.0, 4.0, 1.0, 2.0, 3.0, 4.0, 1.0, 2.0],
                BoundaryMode::Reflect => vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0],
                BoundaryMode::Symmetric => vec![2.0, 1.0, 1.0, 2.0, 3.0, 4.0, 4.0, 3.0],
                BoundaryMode::Edge => vec![1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 4.0, 4.0],
            }
        };
        for mode in BoundaryMode::ALL {
            let pad = Pad::new(&[4], &[(2, 2)], &[mode]).unwrap();
            let out: Vec<f64> = pad.apply(&x).unwrap();
            assert_eq!(out, expect(mode), "mode {mode}");
        }
    }

    #[test]
    fn test_trim_pad_roundtrip_all_modes() {
        let mut rng = StdRng::seed_from_u64(7);
        let x: Vec<f64> = (0..30).map(|_| rng.gen_range(-1.0..1.0)).collect();
        for mode in BoundaryMode::ALL {
            let pad = Pad::new(&[5, 6], &[(1, 2), (3, 1)], &[mode]).unwrap();
            let trim = pad.trim();
            let padded: Vec<f64> = pad.apply(&x).unwrap();
            let back: Vec<f64> = trim.apply(&padded).unwrap();
            assert_eq!(back, x, "mode {mode}");
        }
    }

    #[test]
    fn test_pad_adjoint_identity_all_modes() {
        let mut rng = StdRng::seed_from_u64(21);
        let x: Vec<f64> = (0..20).map(|_| rng.gen_range(-1.0..1.0)).collect();
        for mode in BoundaryMode::ALL {
            let pad = Pad::new(&[4, 5], &[(2, 1), (1, 2)], &[mode]).unwrap();
            let y: Vec<f64> = (0..Map::<f64>::codim(&pad))
                .map(|_| rng.gen_range(-1.0..1.0))
                .collect();
            let ax = pad.apply(&x).unwrap();
            let aty = pad.adjoint(&y).unwrap();
            assert_relative_eq!(dot(&ax, &y), dot(&x, &aty), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_width_caps() {
        assert!(Pad::new(&[4], &[(5, 0)], &[BoundaryMode::Wrap]).is_err());
        assert!(Pad::new(&[4], &[(4, 0)], &[BoundaryMode::Wrap]).is_ok());
        assert!(Pad::new(&[4], &[(4, 0)], &[BoundaryMode::Reflect]).is_err());
        assert!(Pad::new(&[4], &[(3, 0)], &[BoundaryMode::Reflect]).is_ok());
        assert!(Pad::new(&[4], &[(9, 9)], &[BoundaryMode::Edge]).is_ok());
    }

    #[test]
    fn test_lipschitz_constant_mode_is_one() {
        let pad = Pad::new(&[8, 8], &[(2, 2), (2, 2)], &[BoundaryMode::Constant]).unwrap();
        assert_relative_eq!(LinOp::<f64>::lipschitz(&pad), 1.0);
    }

    #[test]
    fn test_trim_adjoint_embeds_zeros() {
        let trim = Trim::new(&[5], &[(1, 2)]).unwrap();
        let out: Vec<f64> = trim.apply(&[9.0, 1.0, 2.0, 8.0, 7.0]).unwrap();
        assert_eq!(out, vec![1.0, 2.0]);
        let back: Vec<f64> = trim.adjoint(&[1.0, 2.0]).unwrap();
        assert_eq!(back, vec![0.0, 1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_batched_pad() {
        let pad = Pad::new(&[2], &[(1, 1)], &[BoundaryMode::Edge]).unwrap();
        let out: Vec<f64> = pad.apply(&[1.0, 2.0, 5.0, 6.0]).unwrap();
        assert_eq!(out, vec![1.0, 1.0, 2.0, 2.0, 5.0, 5.0, 6.0, 6.0]);
    }

    proptest::proptest! {
        #[test]
        fn prop_trim_pad_roundtrip(
            l in 0usize..4,
            r in 0usize..4,
            mode_idx in 0usize..5,
        ) {
            let mode = BoundaryMode::ALL[mode_idx];
            let x: Vec<f64> = (0..12).map(|i| (i as f64).sin()).collect();
            let pad = Pad::new(&[12], &[(l, r)], &[mode]).unwrap();
            let out: Vec<f64> = pad.trim().apply(&pad.apply(&x).unwrap()).unwrap();
            proptest::prop_assert_eq!(out, x);
        }
    }
}
