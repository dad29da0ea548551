//! Static and measured analysis of compiled filters.

use std::f64::consts::TAU;

use crate::analysis::roots::{Root, find_roots};
use crate::error::{Error, Result};
use crate::filters::CompiledFilter;
use crate::filters::horner;
use crate::signals::Sample;
use crate::sources;
use crate::tolerance::Tolerance;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where the poles of a filter lie relative to the unit circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Stability {
    /// Every pole is strictly inside the unit circle.
    Stable,
    /// No pole is outside, but at least one is on the circle within tolerance.
    MarginallyStable,
    /// At least one pole is outside the unit circle.
    Unstable,
}

impl Stability {
    pub fn is_stable(self) -> bool {
        self == Stability::Stable
    }
}

/// `b` and `a` padded to one length, read as descending powers of `z`.
fn padded(filter: &CompiledFilter) -> (Vec<Sample>, Vec<Sample>) {
    let len = filter.numerator().len().max(filter.denominator().len());
    let pad = |coeffs: &[Sample]| {
        let mut out = coeffs.to_vec();
        out.resize(len, Sample::new(0.0, 0.0));
        out
    };
    (pad(filter.numerator()), pad(filter.denominator()))
}

/// The poles of the filter in the z-plane.
///
/// Pure delays give poles at the origin.
pub fn poles(filter: &CompiledFilter, tol: &Tolerance) -> Result<Vec<Root>> {
    find_roots(&padded(filter).1, tol)
}

/// The zeros of the filter in the z-plane.
pub fn zeros(filter: &CompiledFilter, tol: &Tolerance) -> Result<Vec<Root>> {
    find_roots(&padded(filter).0, tol)
}

/// Classifies the filter by its pole magnitudes.
///
/// Poles within `tol.epsilon` of the unit circle make the filter marginally
/// stable, never stable.
///
/// # Examples
///
/// ```
/// use lazydsp::{Tolerance, analysis::{Stability, stability}, filters::CompiledFilter};
///
/// let integrator = CompiledFilter::from_coefficients([1.0], [1.0, -1.0]).unwrap();
/// assert_eq!(
///     stability(&integrator, &Tolerance::default()).unwrap(),
///     Stability::MarginallyStable
/// );
/// ```
pub fn stability(filter: &CompiledFilter, tol: &Tolerance) -> Result<Stability> {
    let mut verdict = Stability::Stable;
    for pole in poles(filter, tol)? {
        let magnitude = pole.value.norm();
        if magnitude > 1.0 + tol.epsilon {
            return Ok(Stability::Unstable);
        }
        if magnitude >= 1.0 - tol.epsilon {
            tracing::warn!(pole = %pole.value, "pole on the unit circle");
            verdict = Stability::MarginallyStable;
        }
    }
    Ok(verdict)
}

/// True if every pole is strictly inside the unit circle.
pub fn is_stable(filter: &CompiledFilter, tol: &Tolerance) -> Result<bool> {
    Ok(stability(filter, tol)?.is_stable())
}

/// Complex gain at `freq` cycles per sample.
pub fn frequency_response(filter: &CompiledFilter, freq: f64) -> Sample {
    let delay = Sample::from_polar(1.0, -TAU * freq);
    horner(filter.numerator(), delay) / horner(filter.denominator(), delay)
}

/// The response at `n` evenly spaced frequencies from 0 to 0.5 inclusive.
pub fn frequency_response_grid(filter: &CompiledFilter, n: usize) -> Vec<(f64, Sample)> {
    let step = if n > 1 { 0.5 / (n - 1) as f64 } else { 0.0 };
    (0..n)
        .map(|k| {
            let freq = step * k as f64;
            (freq, frequency_response(filter, freq))
        })
        .collect()
}

/// Drives a cosine at `freq` through the filter and measures the RMS gain.
///
/// The first `settle` output samples are discarded so the transient dies
/// out; the gain is measured over the next `len`.
///
/// # Examples
///
/// ```
/// use lazydsp::{analysis::measured_gain, filters::CompiledFilter};
///
/// let filter = CompiledFilter::from_coefficients([0.5, 0.5], [1.0]).unwrap();
/// let gain = measured_gain(&filter, 0.0, 1, 32).unwrap();
/// assert!((gain - 1.0).abs() < 1e-12);
/// ```
pub fn measured_gain(filter: &CompiledFilter, freq: f64, settle: usize, len: usize) -> Result<f64> {
    if len == 0 {
        return Err(Error::InvalidArgument(
            "measurement length must be positive".to_string(),
        ));
    }
    let output = filter
        .apply(sources::sinusoid(freq, 0.0))
        .skip(settle)
        .take(len)
        .drain()?;
    let input = sources::sinusoid(freq, 0.0).skip(settle).take(len).drain()?;

    let input_rms = rms(&input);
    if input_rms == 0.0 {
        return Err(Error::InvalidArgument(format!(
            "probe at {freq} cycles per sample is silent over the window"
        )));
    }
    Ok(rms(&output) / input_rms)
}

fn rms(values: &[Sample]) -> f64 {
    (values.iter().map(|x| x.norm_sqr()).sum::<f64>() / values.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::RationalExpr;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn one_pole(a1: f64) -> CompiledFilter {
        CompiledFilter::from_coefficients([1.0], [1.0, a1]).unwrap()
    }

    #[test]
    fn test_stability_classes() {
        let tol = Tolerance::default();
        assert!(is_stable(&one_pole(-0.5), &tol).unwrap());
        assert!(!is_stable(&one_pole(-1.5), &tol).unwrap());
        assert_eq!(
            stability(&one_pole(-1.5), &tol).unwrap(),
            Stability::Unstable
        );
        assert_eq!(
            stability(&one_pole(-1.0), &tol).unwrap(),
            Stability::MarginallyStable
        );
        assert!(!is_stable(&one_pole(-1.0), &tol).unwrap());
    }

    #[test]
    fn test_fir_filters_are_stable() {
        let tol = Tolerance::default();
        let filter = CompiledFilter::from_coefficients([1.0, 2.0, 3.0], [1.0]).unwrap();
        assert!(is_stable(&filter, &tol).unwrap());
        // All poles sit at the origin
        let p = poles(&filter, &tol).unwrap();
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].multiplicity, 2);
    }

    #[test]
    fn test_pure_delay_pole_at_origin() {
        let filter = RationalExpr::delay().compile().unwrap();
        let p = poles(&filter, &Tolerance::default()).unwrap();
        let origin = Root {
            value: Sample::new(0.0, 0.0),
            multiplicity: 1,
        };
        assert_eq!(p, vec![origin]);
        assert!(zeros(&filter, &Tolerance::default()).unwrap().is_empty());
    }

    #[test]
    fn test_poles_and_zeros_of_biquad() {
        // Zeros at ±1, poles at 0.5 and -0.25
        let num = RationalExpr::from_numerator([1.0, 0.0, -1.0]);
        let den = RationalExpr::from_numerator([1.0, -0.25, -0.125]);
        let filter = (num / den).unwrap().compile().unwrap();
        let tol = Tolerance::default();

        let z: Vec<f64> = zeros(&filter, &tol)
            .unwrap()
            .iter()
            .map(|r| r.value.re)
            .collect();
        assert_abs_diff_eq!(z[0], -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(z[1], 1.0, epsilon = 1e-9);

        let p: Vec<f64> = poles(&filter, &tol)
            .unwrap()
            .iter()
            .map(|r| r.value.re)
            .collect();
        assert_abs_diff_eq!(p[0], -0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(p[1], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_identity_response_is_one() {
        let identity = CompiledFilter::identity();
        for (_, h) in frequency_response_grid(&identity, 5) {
            assert_eq!(h, Sample::new(1.0, 0.0));
        }
    }

    #[test]
    fn test_response_matches_expression() {
        let expr = RationalExpr::from_coeffs([0.5, 0.5], [1.0, -0.3]).unwrap();
        let filter = expr.compile().unwrap();
        for freq in [0.0, 0.1, 0.25, 0.4] {
            let a = frequency_response(&filter, freq);
            let b = expr.frequency_response(freq);
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
        let grid = frequency_response_grid(&filter, 3);
        let freqs: Vec<f64> = grid.iter().map(|(f, _)| *f).collect();
        assert_eq!(freqs, vec![0.0, 0.25, 0.5]);
    }

    #[test]
    fn test_measured_gain_agrees_with_static_response() {
        let filter = CompiledFilter::from_coefficients([0.2], [1.0, -0.8]).unwrap();
        for freq in [0.05, 0.125] {
            let predicted = frequency_response(&filter, freq).norm();
            let measured = measured_gain(&filter, freq, 200, 400).unwrap();
            assert_relative_eq!(measured, predicted, max_relative = 1e-2);
        }
        assert!(measured_gain(&filter, 0.1, 0, 0).is_err());
    }
}
