//! Boundary extension modes
//!
//! The five modes shared by the [`Pad`](crate::pad::Pad) operator and the
//! stencil engine. Semantics follow the usual array-padding conventions:
//!
//! * `Constant` - zero-fill outside the domain
//! * `Wrap` - circular indexing
//! * `Reflect` - mirror, excluding the edge sample
//! * `Symmetric` - mirror, including the edge sample
//! * `Edge` - clamp to the nearest edge sample

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Per-axis boundary condition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BoundaryMode {
    /// Zero-fill outside the domain
    #[default]
    Constant,
    /// Circular indexing
    Wrap,
    /// Mirror excluding the edge sample
    Reflect,
    /// Mirror including the edge sample
    Symmetric,
    /// Clamp to the nearest edge sample
    Edge,
}

impl BoundaryMode {
    /// All supported modes, for error messages and exhaustive tests
    pub const ALL: [BoundaryMode; 5] = [
        BoundaryMode::Constant,
        BoundaryMode::Wrap,
        BoundaryMode::Reflect,
        BoundaryMode::Symmetric,
        BoundaryMode::Edge,
    ];

    /// Resolve a possibly out-of-range index against an axis of length `n`.
    ///
    /// Returns `None` when the tap contributes nothing (`Constant` mode
    /// outside the domain).
    #[inline]
    pub fn resolve(self, idx: isize, n: usize) -> Option<usize> {
        debug_assert!(n > 0);
        let ni = n as isize;
        if (0..ni).contains(&idx) {
            return Some(idx as usize);
        }
        match self {
            BoundaryMode::Constant => None,
            BoundaryMode::Wrap => Some(idx.rem_euclid(ni) as usize),
            BoundaryMode::Reflect => {
                if n == 1 {
                    return Some(0);
                }
                let period = 2 * ni - 2;
                let m = idx.rem_euclid(period);
                Some(if m < ni { m as usize } else { (period - m) as usize })
            }
            BoundaryMode::Symmetric => {
                let period = 2 * ni;
                let m = idx.rem_euclid(period);
                Some(if m < ni {
                    m as usize
                } else {
                    (period - 1 - m) as usize
                })
            }
            BoundaryMode::Edge => Some(idx.clamp(0, ni - 1) as usize),
        }
    }

    /// Maximum supported pad width along an axis of length `n`.
    ///
    /// Some modes have awkward interpretations when pad-widths cross certain
    /// thresholds; supported widths are limited to sensible regions.
    pub fn max_pad_width(self, n: usize) -> usize {
        match self {
            BoundaryMode::Constant | BoundaryMode::Edge => usize::MAX,
            BoundaryMode::Wrap | BoundaryMode::Symmetric => n,
            BoundaryMode::Reflect => n.saturating_sub(1),
        }
    }
}

impl fmt::Display for BoundaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoundaryMode::Constant => "constant",
            BoundaryMode::Wrap => "wrap",
            BoundaryMode::Reflect => "reflect",
            BoundaryMode::Symmetric => "symmetric",
            BoundaryMode::Edge => "edge",
        };
        f.write_str(name)
    }
}

impl FromStr for BoundaryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constant" => Ok(BoundaryMode::Constant),
            "wrap" => Ok(BoundaryMode::Wrap),
            "reflect" => Ok(BoundaryMode::Reflect),
            "symmetric" => Ok(BoundaryMode::Symmetric),
            "edge" => Ok(BoundaryMode::Edge),
            other => Err(Error::invalid_parameter(
                "mode",
                format!("must be one of constant|wrap|reflect|symmetric|edge, got `{other}`"),
            )),
        }
    }
}

/// Canonicalize a per-axis mode list: a single mode broadcasts to all axes.
pub fn broadcast_modes(modes: &[BoundaryMode], ndim: usize) -> Result<Vec<BoundaryMode>> {
    match modes.len() {
        1 => Ok(vec![modes[0]; ndim]),
        n if n == ndim => Ok(modes.to_vec()),
        n => Err(Error::size_mismatch("boundary modes", ndim, n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_passthrough() {
        for mode in BoundaryMode::ALL {
            assert_eq!(mode.resolve(3, 10), Some(3));
            assert_eq!(mode.resolve(0, 10), Some(0));
            assert_eq!(mode.resolve(9, 10), Some(9));
        }
    }

    #[test]
    fn test_constant() {
        assert_eq!(BoundaryMode::Constant.resolve(-1, 5), None);
        assert_eq!(BoundaryMode::Constant.resolve(5, 5), None);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(BoundaryMode::Wrap.resolve(-1, 5), Some(4));
        assert_eq!(BoundaryMode::Wrap.resolve(5, 5), Some(0));
        assert_eq!(BoundaryMode::Wrap.resolve(-6, 5), Some(4));
    }

    #[test]
    fn test_reflect() {
        // domain [a b c d e]: reflect gives ... c b | a b c d e | d c ...
        assert_eq!(BoundaryMode::Reflect.resolve(-1, 5), Some(1));
        assert_eq!(BoundaryMode::Reflect.resolve(-2, 5), Some(2));
        assert_eq!(BoundaryMode::Reflect.resolve(5, 5), Some(3));
        assert_eq!(BoundaryMode::Reflect.resolve(6, 5), Some(2));
        assert_eq!(BoundaryMode::Reflect.resolve(-1, 1), Some(0));
    }

    #[test]
    fn test_symmetric() {
        // domain [a b c d e]: symmetric gives ... b a | a b c d e | e d ...
        assert_eq!(BoundaryMode::Symmetric.resolve(-1, 5), Some(0));
        assert_eq!(BoundaryMode::Symmetric.resolve(-2, 5), Some(1));
        assert_eq!(BoundaryMode::Symmetric.resolve(5, 5), Some(4));
        assert_eq!(BoundaryMode::Symmetric.resolve(6, 5), Some(3));
    }

    #[test]
    fn test_edge() {
        assert_eq!(BoundaryMode::Edge.resolve(-3, 5), Some(0));
        assert_eq!(BoundaryMode::Edge.resolve(7, 5), Some(4));
    }

    #[test]
    fn test_parse() {
        assert_eq!("wrap".parse::<BoundaryMode>().unwrap(), BoundaryMode::Wrap);
        assert_eq!(
            " Symmetric ".parse::<BoundaryMode>().unwrap(),
            BoundaryMode::Symmetric
        );
        assert!("mirror".parse::<BoundaryMode>().is_err());
    }

    #[test]
    fn test_broadcast() {
        let m = broadcast_modes(&[BoundaryMode::Wrap], 3).unwrap();
        assert_eq!(m, vec![BoundaryMode::Wrap; 3]);
        assert!(broadcast_modes(&[BoundaryMode::Wrap, BoundaryMode::Edge], 3).is_err());
    }
}
