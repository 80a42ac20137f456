//! Kernel descriptions for stencil operators
//!
//! A kernel is either **separable** - one rank-1 tap array per axis, applied
//! successively - or **full** - a single rank-D joint array. Separable is
//! preferred whenever each axis's operation is independent: applying D 1-d
//! stencils in sequence is asymptotically cheaper than one D-dimensional
//! joint stencil.
//!
//! The adjoint kernel is derived deterministically: taps reversed along
//! every axis, `center[d] -> shape[d] - 1 - center[d]`. Correlating with the
//! adjoint kernel equals convolving with the original.

use std::fmt;

use matfree_core::error::{Error, Result};
use matfree_core::numeric::Scalar;
use matfree_core::shape::{size, strides, IndexIter};

/// A 1-d tap array with a reference (center) index
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel1d<T: Scalar> {
    taps: Vec<T>,
    center: usize,
}

impl<T: Scalar> Kernel1d<T> {
    pub fn new(taps: Vec<T>, center: usize) -> Result<Self> {
        if taps.is_empty() {
            return Err(Error::invalid_parameter("kernel", "must have at least one tap"));
        }
        if center >= taps.len() {
            return Err(Error::invalid_parameter(
                "center",
                format!("must satisfy 0 <= center < {}, got {center}", taps.len()),
            ));
        }
        if taps.iter().any(|t| !t.is_finite()) {
            return Err(Error::invalid_parameter("kernel", "taps must be finite"));
        }
        Ok(Self { taps, center })
    }

    /// The identity kernel `[1]` with center 0
    pub fn identity() -> Self {
        Self {
            taps: vec![T::one()],
            center: 0,
        }
    }

    pub fn taps(&self) -> &[T] {
        &self.taps
    }

    pub fn center(&self) -> usize {
        self.center
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// True for the do-nothing kernel `[1]`/center 0
    pub fn is_identity(&self) -> bool {
        self.taps.len() == 1 && self.center == 0 && self.taps[0] == T::one()
    }

    /// Halo `(left, right)` = `(center, len - 1 - center)`
    pub fn width(&self) -> (usize, usize) {
        (self.center, self.taps.len() - 1 - self.center)
    }

    /// Reversed taps with reflected center
    pub fn adjoint(&self) -> Self {
        let mut taps = self.taps.clone();
        taps.reverse();
        Self {
            taps,
            center: self.taps.len() - 1 - self.center,
        }
    }

    pub fn max_abs(&self) -> f64 {
        self.taps
            .iter()
            .map(|t| t.as_f64().abs())
            .fold(0.0, f64::max)
    }
}

impl<T: Scalar> fmt::Display for Kernel1d<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, t) in self.taps.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if i == self.center {
                write!(f, "({:?})", t)?;
            } else {
                write!(f, "{:?}", t)?;
            }
        }
        write!(f, "]")
    }
}

/// A joint rank-D kernel array with a per-axis center
#[derive(Clone, Debug, PartialEq)]
pub struct NdKernel<T: Scalar> {
    data: Vec<T>,
    shape: Vec<usize>,
    center: Vec<usize>,
}

impl<T: Scalar> NdKernel<T> {
    pub fn new(data: Vec<T>, shape: Vec<usize>, center: Vec<usize>) -> Result<Self> {
        if shape.is_empty() || shape.contains(&0) {
            return Err(Error::invalid_parameter(
                "kernel",
                "shape must be non-empty with strictly positive extents",
            ));
        }
        if data.len() != size(&shape) {
            return Err(Error::size_mismatch("kernel data", size(&shape), data.len()));
        }
        if center.len() != shape.len() {
            return Err(Error::size_mismatch("kernel center", shape.len(), center.len()));
        }
        for (d, (&c, &n)) in center.iter().zip(&shape).enumerate() {
            if c >= n {
                return Err(Error::invalid_parameter(
                    "center",
                    format!("center[{d}] = {c} out of range for kernel extent {n}"),
                ));
            }
        }
        if data.iter().any(|t| !t.is_finite()) {
            return Err(Error::invalid_parameter("kernel", "taps must be finite"));
        }
        Ok(Self {
            data,
            shape,
            center,
        })
    }

    /// Materialize the outer product of per-axis 1-d kernels
    pub fn outer(axes: &[Kernel1d<T>]) -> Result<Self> {
        if axes.is_empty() {
            return Err(Error::invalid_parameter(
                "kernel",
                "outer product needs at least one axis",
            ));
        }
        let shape: Vec<usize> = axes.iter().map(|k| k.len()).collect();
        let center: Vec<usize> = axes.iter().map(|k| k.center()).collect();
        let mut data = Vec::with_capacity(size(&shape));
        for idx in IndexIter::new(&shape) {
            let mut v = T::one();
            for (d, &i) in idx.iter().enumerate() {
                v = v * axes[d].taps()[i];
            }
            data.push(v);
        }
        Self::new(data, shape, center)
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn center(&self) -> &[usize] {
        &self.center
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Halo `(left, right)` along `axis`
    pub fn width(&self, axis: usize) -> (usize, usize) {
        (self.center[axis], self.shape[axis] - 1 - self.center[axis])
    }

    /// Taps reversed along every axis, centers reflected
    pub fn adjoint(&self) -> Self {
        let kstrides = strides(&self.shape);
        let mut data = vec![T::zero(); self.data.len()];
        for (flat, idx) in IndexIter::new(&self.shape).enumerate() {
            let mut rev = 0;
            for (d, &i) in idx.iter().enumerate() {
                rev += (self.shape[d] - 1 - i) * kstrides[d];
            }
            data[rev] = self.data[flat];
        }
        let center = self
            .center
            .iter()
            .zip(&self.shape)
            .map(|(&c, &n)| n - 1 - c)
            .collect();
        Self {
            data,
            shape: self.shape.clone(),
            center,
        }
    }

    pub fn max_abs(&self) -> f64 {
        self.data
            .iter()
            .map(|t| t.as_f64().abs())
            .fold(0.0, f64::max)
    }
}

/// Separable or joint kernel description
#[derive(Clone, Debug)]
pub enum KernelSpec<T: Scalar> {
    /// One independent 1-d kernel per axis, applied successively
    Separable(Vec<Kernel1d<T>>),
    /// A single joint rank-D kernel
    Full(NdKernel<T>),
}

impl<T: Scalar> KernelSpec<T> {
    pub fn separable(axes: Vec<Kernel1d<T>>) -> Result<Self> {
        if axes.is_empty() {
            return Err(Error::invalid_parameter(
                "kernel",
                "needs at least one axis",
            ));
        }
        Ok(KernelSpec::Separable(axes))
    }

    pub fn ndim(&self) -> usize {
        match self {
            KernelSpec::Separable(axes) => axes.len(),
            KernelSpec::Full(k) => k.ndim(),
        }
    }

    /// Halo `(left, right)` along `axis`
    pub fn width(&self, axis: usize) -> (usize, usize) {
        match self {
            KernelSpec::Separable(axes) => axes[axis].width(),
            KernelSpec::Full(k) => k.width(axis),
        }
    }

    /// Kernel extent along `axis`
    pub fn extent(&self, axis: usize) -> usize {
        match self {
            KernelSpec::Separable(axes) => axes[axis].len(),
            KernelSpec::Full(k) => k.shape()[axis],
        }
    }

    /// The adjoint kernel: axis-wise reversal with reflected centers
    pub fn adjoint(&self) -> Self {
        match self {
            KernelSpec::Separable(axes) => {
                KernelSpec::Separable(axes.iter().map(Kernel1d::adjoint).collect())
            }
            KernelSpec::Full(k) => KernelSpec::Full(k.adjoint()),
        }
    }

    /// Materialize as a joint kernel (outer product for separable form)
    pub fn to_full(&self) -> Result<NdKernel<T>> {
        match self {
            KernelSpec::Separable(axes) => NdKernel::outer(axes),
            KernelSpec::Full(k) => Ok(k.clone()),
        }
    }

    pub fn max_abs(&self) -> f64 {
        match self {
            // separable taps multiply across axes
            KernelSpec::Separable(axes) => axes.iter().map(Kernel1d::max_abs).product(),
            KernelSpec::Full(k) => k.max_abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel1d_validation() {
        assert!(Kernel1d::<f64>::new(vec![], 0).is_err());
        assert!(Kernel1d::new(vec![1.0, 2.0], 2).is_err());
        assert!(Kernel1d::new(vec![f64::NAN], 0).is_err());
        assert!(Kernel1d::new(vec![1.0, 2.0], 1).is_ok());
    }

    #[test]
    fn test_width_and_adjoint() {
        let k = Kernel1d::new(vec![1.0, 2.0, 3.0, 4.0], 1).unwrap();
        assert_eq!(k.width(), (1, 2));
        let adj = k.adjoint();
        assert_eq!(adj.taps(), &[4.0, 3.0, 2.0, 1.0]);
        assert_eq!(adj.center(), 2);
        assert_eq!(adj.adjoint(), k);
    }

    #[test]
    fn test_identity() {
        let k = Kernel1d::<f64>::identity();
        assert!(k.is_identity());
        assert_eq!(k.width(), (0, 0));
        assert!(!Kernel1d::new(vec![2.0], 0).unwrap().is_identity());
    }

    #[test]
    fn test_outer_product() {
        let k0 = Kernel1d::new(vec![1.0, 2.0], 0).unwrap();
        let k1 = Kernel1d::new(vec![3.0, 4.0, 5.0], 1).unwrap();
        let joint = NdKernel::outer(&[k0, k1]).unwrap();
        assert_eq!(joint.shape(), &[2, 3]);
        assert_eq!(joint.center(), &[0, 1]);
        assert_eq!(joint.data(), &[3.0, 4.0, 5.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_nd_adjoint_reverses_all_axes() {
        let k = NdKernel::new(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![2, 3],
            vec![0, 1],
        )
        .unwrap();
        let adj = k.adjoint();
        assert_eq!(adj.data(), &[6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(adj.center(), &[1, 1]);
        assert_eq!(adj.adjoint().data(), k.data());
    }

    #[test]
    fn test_display_marks_center() {
        let k = Kernel1d::new(vec![1.0, -2.0, 1.0], 1).unwrap();
        assert_eq!(k.to_string(), "[1.0 (-2.0) 1.0]");
    }
}
