//! Sample-by-sample analysis streams.
//!
//! Each function here turns an input stream into another lazy stream, built
//! either from a per-sample state machine or from filters written with the
//! delay algebra.

use std::f64::consts::TAU;

use crate::error::{Error, Result};
use crate::filters::{CompiledFilter, RationalExpr};
use crate::signals::{IntoStream, Sample, Stream, real};

/// Marks zero crossings with 1 and everything else with 0.
///
/// A crossing is counted when a sample lies beyond `hysteresis` on the
/// opposite side of zero from the last sign seen. Until a sign is known
/// (from `first_sign`, or from the first sample outside the band) the output
/// is 0. Complex samples fail with an ordering error.
///
/// # Examples
///
/// ```
/// use lazydsp::analysis::zcross;
///
/// let out = zcross(vec![1.0, -0.05, -0.2, 0.3], 0.1, None);
/// assert_eq!(out.drain_real().unwrap(), vec![0.0, 0.0, 1.0, 1.0]);
/// ```
pub fn zcross(input: impl IntoStream, hysteresis: f64, first_sign: Option<f64>) -> Stream {
    let mut last_sign = first_sign.filter(|s| *s != 0.0).map(f64::signum);
    input.into_stream().try_map(move |x| {
        let x = real(x)?;
        let crossed = match last_sign {
            None => {
                if x.abs() > hysteresis {
                    last_sign = Some(x.signum());
                }
                false
            }
            Some(sign) => {
                let crossed = x * sign < -hysteresis;
                if crossed {
                    last_sign = Some(-sign);
                }
                crossed
            }
        };
        Ok(Sample::new(if crossed { 1.0 } else { 0.0 }, 0.0))
    })
}

/// The measure an [`envelope`] follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// Root of the smoothed power.
    Rms,
    /// Smoothed magnitude.
    Abs,
    /// Smoothed power.
    Squared,
}

/// Follows the envelope of a signal with a one-pole lowpass.
///
/// `cutoff` is in cycles per sample. The output is never negative.
pub fn envelope(input: impl IntoStream, kind: Envelope, cutoff: f64) -> Result<Stream> {
    if !(cutoff.is_finite() && cutoff > 0.0) {
        return Err(Error::InvalidArgument(format!(
            "envelope cutoff must be positive, got {cutoff}"
        )));
    }
    let pole = (-TAU * cutoff).exp();
    let d = RationalExpr::delay();
    let smoother = ((1.0 - pole) / (1.0 - pole * d))?.compile()?;

    let input = input.into_stream();
    let measure = match kind {
        Envelope::Abs => input.abs(),
        Envelope::Rms | Envelope::Squared => input.map(|x| Sample::new(x.norm_sqr(), 0.0)),
    };
    // The lowpass has a positive impulse response, so only rounding can go negative
    let smoothed = smoother
        .apply(measure)
        .map(|y| Sample::new(y.re.max(0.0), 0.0));
    Ok(match kind {
        Envelope::Rms => smoothed.map(|y| Sample::new(y.re.sqrt(), 0.0)),
        Envelope::Abs | Envelope::Squared => smoothed,
    })
}

/// A moving average over the last `size` samples.
///
/// Written as the recursive form `(1 - z^-size) / (size·(1 - z^-1))`, which
/// reduces to the plain FIR average.
///
/// # Examples
///
/// ```
/// use lazydsp::analysis::maverage;
///
/// let avg = maverage(3).unwrap();
/// assert!(avg.is_fir());
/// let out = avg.apply(vec![3.0, 3.0, 3.0, 3.0]).drain_real().unwrap();
/// assert!((out[0] - 1.0).abs() < 1e-12 && (out[3] - 3.0).abs() < 1e-12);
/// ```
pub fn maverage(size: usize) -> Result<CompiledFilter> {
    if size == 0 {
        return Err(Error::InvalidArgument(
            "moving average size must be positive".to_string(),
        ));
    }
    let power = u32::try_from(size)
        .map_err(|_| Error::InvalidArgument(format!("moving average size {size} is too large")))?;
    let d = RationalExpr::delay();
    let expr = ((1 - d.pow(power)) / (size as f64 * (1 - d)))?;
    expr.compile()
}

/// Clamps real samples into `[low, high]`; either bound may be left open.
pub fn clip(input: impl IntoStream, low: Option<f64>, high: Option<f64>) -> Result<Stream> {
    if let (Some(lo), Some(hi)) = (low, high) {
        if lo > hi {
            return Err(Error::InvalidArgument(format!(
                "clip bounds are inverted: low {lo} > high {hi}"
            )));
        }
    }
    let low = low.unwrap_or(f64::NEG_INFINITY);
    let high = high.unwrap_or(f64::INFINITY);
    Ok(input
        .into_stream()
        .try_map(move |x| Ok(Sample::new(real(x)?.clamp(low, high), 0.0))))
}

/// Removes jumps between consecutive inputs larger than `max_delta`.
///
/// Each such jump is replaced by the smallest difference congruent to it
/// modulo `step`, and the correction accumulates over the rest of the
/// stream. Phase unwrapping is `unwrap(phase, π, 2π)`.
///
/// # Examples
///
/// ```
/// use lazydsp::analysis::unwrap;
///
/// let out = unwrap(vec![0.0, 27.0, 11.0, 19.0], 8.0, 10.0);
/// assert_eq!(out.drain_real().unwrap(), vec![0.0, -3.0, 1.0, 9.0]);
/// ```
pub fn unwrap(input: impl IntoStream, max_delta: f64, step: f64) -> Stream {
    let mut previous: Option<f64> = None;
    let mut offset = 0.0;
    input.into_stream().try_map(move |x| {
        let x = real(x)?;
        if let Some(prev) = previous {
            let diff = x - prev;
            if diff.abs() > max_delta {
                let up = floor_mod(diff, step);
                let down = floor_mod(diff, -step);
                let wrapped = if up.abs() <= down.abs() { up } else { down };
                offset += wrapped - diff;
            }
        }
        previous = Some(x);
        Ok(Sample::new(x + offset, 0.0))
    })
}

/// Remainder with the sign of the divisor.
fn floor_mod(a: f64, b: f64) -> f64 {
    a - b * (a / b).floor()
}

/// Average magnitude difference function.
///
/// Each output is the mean of `|x[n] - x[n-lag]|` over the last `size`
/// samples. A lag of 0 yields zeros.
///
/// # Examples
///
/// ```
/// use lazydsp::analysis::amdf;
///
/// let out = amdf(vec![1.0, 2.0, 3.0, 2.0, 1.0], 2, 1).unwrap();
/// assert_eq!(out.drain_real().unwrap(), vec![1.0, 2.0, 2.0, 0.0, 2.0]);
/// ```
pub fn amdf(input: impl IntoStream, lag: usize, size: usize) -> Result<Stream> {
    let lag = u32::try_from(lag)
        .map_err(|_| Error::InvalidArgument(format!("amdf lag {lag} is too large")))?;
    let difference = (1 - RationalExpr::delay().pow(lag)).compile()?;
    let average = maverage(size)?;
    Ok(average.apply(difference.apply(input).abs()))
}
