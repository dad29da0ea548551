//! Polynomial root finding.
//!
//! Roots are the eigenvalues of the companion matrix, computed with
//! `nalgebra`'s complex Schur decomposition. When the decomposition does not
//! converge (symmetric root sets such as `z^4 + 1` can stall it) the roots are
//! refined with Aberth-Ehrlich iteration instead. Roots at the origin are
//! pulled out exactly beforehand, so pure delays never go through a solver.

use std::f64::consts::TAU;

use nalgebra::DMatrix;
use nalgebra::linalg::Schur;

use crate::error::{Error, Result};
use crate::signals::Sample;
use crate::tolerance::Tolerance;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Iteration cap handed to the Schur decomposition.
const MAX_SCHUR_ITERATIONS: usize = 10_000;

/// Sweep cap for the Aberth-Ehrlich fallback.
const MAX_ABERTH_ITERATIONS: usize = 500;

/// One distinct root and how many times it repeats.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Root {
    pub value: Sample,
    pub multiplicity: usize,
}

/// Finds the roots of a polynomial given in descending powers.
///
/// `[1, -3, 2]` is `x² - 3x + 2` with roots 1 and 2. Leading zeros are
/// ignored; a constant polynomial has no roots. Roots closer together than
/// `tol.root_merge` are reported once, at their mean, with a multiplicity.
/// Larger groups are merged over a wider radius when the polynomial and its
/// derivatives vanish at the group mean (see [`Tolerance::root_merge`]).
///
/// # Examples
///
/// ```
/// use lazydsp::{Sample, Tolerance, analysis::find_roots};
///
/// let coeffs = [1.0, -3.0, 2.0].map(|c| Sample::new(c, 0.0));
/// let roots = find_roots(&coeffs, &Tolerance::default()).unwrap();
/// assert_eq!(roots.len(), 2);
/// assert!((roots[0].value.re - 1.0).abs() < 1e-9);
/// ```
pub fn find_roots(descending: &[Sample], tol: &Tolerance) -> Result<Vec<Root>> {
    let is_zero = |c: &Sample| c.re == 0.0 && c.im == 0.0;
    let start = descending
        .iter()
        .position(|c| !is_zero(c))
        .unwrap_or(descending.len());
    let full = &descending[start..];
    let mut coeffs = full;

    let mut at_origin = 0;
    while coeffs.len() > 1 && coeffs.last().is_some_and(is_zero) {
        at_origin += 1;
        coeffs = &coeffs[..coeffs.len() - 1];
    }

    let mut values = match coeffs.len() {
        0 | 1 => Vec::new(),
        2 => vec![-coeffs[1] / coeffs[0]],
        _ => match companion_eigenvalues(coeffs) {
            Some(values) => values,
            None => {
                tracing::debug!(
                    degree = coeffs.len() - 1,
                    "Schur decomposition did not converge, using Aberth iteration"
                );
                aberth(coeffs)?
            }
        },
    };
    values.extend(std::iter::repeat_n(Sample::new(0.0, 0.0), at_origin));

    Ok(cluster(values, full, tol))
}

fn companion_eigenvalues(coeffs: &[Sample]) -> Option<Vec<Sample>> {
    let degree = coeffs.len() - 1;
    let lead = coeffs[0];
    let companion = DMatrix::from_fn(degree, degree, |row, col| {
        if row == 0 {
            -coeffs[col + 1] / lead
        } else if row == col + 1 {
            Sample::new(1.0, 0.0)
        } else {
            Sample::new(0.0, 0.0)
        }
    });

    let schur = Schur::try_new(companion, f64::EPSILON, MAX_SCHUR_ITERATIONS)?;
    let eigenvalues = schur.eigenvalues()?;
    Some(eigenvalues.iter().copied().collect())
}

/// Simultaneous Aberth-Ehrlich iteration on a polynomial with no root at 0.
///
/// Stops once every estimate is a root of a polynomial within a few ulps of
/// the input (a backward-error test, which multiple roots also pass).
fn aberth(coeffs: &[Sample]) -> Result<Vec<Sample>> {
    let degree = coeffs.len() - 1;
    let lead = coeffs[0];
    let monic: Vec<Sample> = coeffs.iter().map(|c| c / lead).collect();

    // Start on a circle whose radius is the geometric mean of the root moduli
    let radius = monic[degree].norm().powf(1.0 / degree as f64);
    let mut estimates: Vec<Sample> = (0..degree)
        .map(|k| Sample::from_polar(radius, TAU * k as f64 / degree as f64 + 0.4))
        .collect();

    let threshold = 8.0 * degree as f64 * f64::EPSILON;
    for _ in 0..MAX_ABERTH_ITERATIONS {
        let mut converged = true;
        for k in 0..degree {
            let z = estimates[k];
            let (value, slope, bound) = horner_with_derivative(&monic, z);
            if value.norm() <= threshold * bound {
                continue;
            }
            converged = false;

            let newton = value / slope;
            let repulsion: Sample = estimates
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != k)
                .map(|(_, other)| (z - other).inv())
                .sum();
            let step = newton / (Sample::new(1.0, 0.0) - newton * repulsion);
            if !step.is_finite() {
                return Err(Error::RootFinding { degree });
            }
            estimates[k] = z - step;
        }
        if converged {
            return Ok(estimates);
        }
    }
    Err(Error::RootFinding { degree })
}

/// Evaluates `p(z)`, `p'(z)` and the rounding scale `sum |a_i| |z|^(n-i)`.
fn horner_with_derivative(coeffs: &[Sample], z: Sample) -> (Sample, Sample, f64) {
    let radius = z.norm();
    let mut value = coeffs[0];
    let mut slope = Sample::new(0.0, 0.0);
    let mut bound = coeffs[0].norm();
    for c in &coeffs[1..] {
        slope = slope * z + value;
        value = value * z + c;
        bound = bound * radius + c.norm();
    }
    (value, slope, bound)
}

/// Groups solver output into distinct roots.
///
/// Each pass takes one value and tries the largest group first: the value and
/// its `m - 1` nearest neighbours. A group is merged when it fits inside
/// `root_merge`, or when it fits inside `root_merge^(2/m)` and the first `m`
/// Taylor coefficients of `coeffs` vanish at the group mean.
fn cluster(values: Vec<Sample>, coeffs: &[Sample], tol: &Tolerance) -> Vec<Root> {
    let mut remaining = values;
    let mut roots = Vec::new();

    while let Some(first) = remaining.pop() {
        remaining.sort_by(|a, b| (a - first).norm().total_cmp(&(b - first).norm()));

        let mut merged = Root {
            value: first,
            multiplicity: 1,
        };
        for size in (2..=remaining.len() + 1).rev() {
            let group = &remaining[..size - 1];
            let center = (group.iter().sum::<Sample>() + first) / size as f64;
            let spread = group
                .iter()
                .chain(std::iter::once(&first))
                .map(|v| (v - center).norm())
                .fold(0.0, f64::max);

            let close = spread <= tol.root_merge;
            let confirmed = spread <= tol.root_merge.powf(2.0 / size as f64)
                && vanishes_to_order(coeffs, center, size, tol.epsilon);
            if close || confirmed {
                merged = Root {
                    value: center,
                    multiplicity: size,
                };
                remaining.drain(..size - 1);
                break;
            }
        }
        roots.push(merged);
    }

    roots.sort_by(|a, b| {
        a.value
            .re
            .total_cmp(&b.value.re)
            .then(a.value.im.total_cmp(&b.value.im))
    });
    roots
}

/// Returns true if `p(c)`, `p'(c)`, ... up to the `order - 1`th Taylor
/// coefficient are zero relative to their rounding scale.
fn vanishes_to_order(coeffs: &[Sample], center: Sample, order: usize, epsilon: f64) -> bool {
    let radius = center.norm();
    let mut shifted = coeffs.to_vec();
    let mut bounds: Vec<f64> = coeffs.iter().map(|c| c.norm()).collect();
    for _ in 0..order {
        // Synthetic division by (x - center); the remainder is the next coefficient
        for i in 1..shifted.len() {
            let carry = shifted[i - 1] * center;
            shifted[i] += carry;
            bounds[i] += bounds[i - 1] * radius;
        }
        let (Some(remainder), Some(bound)) = (shifted.pop(), bounds.pop()) else {
            return false;
        };
        if remainder.norm() > epsilon * bound {
            return false;
        }
    }
    true
}
