//! Numeric comparison tolerance.
//!
//! Floating-point coefficients are never compared exactly. A [`Tolerance`] is
//! passed explicitly to everything that needs one (expression equality, GCD
//! reduction, root clustering and stability classification) so that the same
//! threshold is applied consistently.

use crate::Sample;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Comparison thresholds.
///
/// # Examples
///
/// ```
/// use lazydsp::Tolerance;
///
/// let tol = Tolerance::default().with_epsilon(1e-8);
/// assert!(tol.approx_eq(1.0.into(), (1.0 + 1e-9).into(), 1.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tolerance {
    /// Relative threshold for coefficient comparisons and the unit circle.
    pub epsilon: f64,
    /// Distance under which two roots are reported as one repeated root.
    ///
    /// Repeated roots come back from an eigen-solver split by roughly
    /// `epsilon^(1/multiplicity)`, so this needs to be much looser than
    /// `epsilon`. A group of `m` roots may spread up to `root_merge^(2/m)`
    /// and still merge, provided the polynomial and its first `m - 1`
    /// derivatives vanish within `epsilon` at the group mean.
    pub root_merge: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            epsilon: 1e-10,
            root_merge: 1e-6,
        }
    }
}

impl Tolerance {
    /// Creates a tolerance with the given relative epsilon and default root merging.
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            ..Self::default()
        }
    }

    /// Returns a copy with a different relative epsilon.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Returns a copy with a different root-merging distance.
    pub fn with_root_merge(mut self, root_merge: f64) -> Self {
        self.root_merge = root_merge;
        self
    }

    /// Returns true if `a` and `b` agree within `epsilon * scale`.
    ///
    /// `scale` is the magnitude the comparison is relative to, usually the
    /// largest coefficient involved. A scale below 1 is treated as 1 so that
    /// values near zero still compare with an absolute floor.
    pub fn approx_eq(&self, a: Sample, b: Sample, scale: f64) -> bool {
        (a - b).norm() <= self.epsilon * scale.max(1.0)
    }

    /// Returns true if `value` is zero within `epsilon * scale`.
    pub fn is_zero(&self, value: Sample, scale: f64) -> bool {
        value.norm() <= self.epsilon * scale.max(1.0)
    }
}
