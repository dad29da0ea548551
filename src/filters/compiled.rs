//! Executable filters.
//!
//! Compiling a [`RationalExpr`] yields the coefficients of the difference
//! equation
//!
//! ```text
//! y[n] = b0·x[n] + b1·x[n-1] + ... - a1·y[n-1] - a2·y[n-2] - ...
//! ```
//!
//! with `a0` normalized to 1. The coefficients are immutable and shared; the
//! past inputs and outputs live in a [`FilterState`] owned by each
//! application of the filter to a stream.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::filters::{Polynomial, RationalExpr};
use crate::signals::{IntoStream, Length, Sample, Signal, Stream};
use crate::sources;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A compiled linear filter: numerator `b` and denominator `a` with `a[0] == 1`.
///
/// Cloning is cheap; the coefficient slices are shared.
///
/// # Examples
///
/// ```
/// use lazydsp::{filters::CompiledFilter, sources};
///
/// let smoother = CompiledFilter::from_coefficients([1.0], [1.0, -0.5]).unwrap();
/// let out = smoother.apply(sources::ones()).take(3).drain_real().unwrap();
/// assert_eq!(out, vec![1.0, 1.5, 1.75]);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "FilterCoefficients"))]
pub struct CompiledFilter {
    b: Arc<[Sample]>,
    a: Arc<[Sample]>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct FilterCoefficients {
    b: Vec<Sample>,
    a: Vec<Sample>,
}

#[cfg(feature = "serde")]
impl TryFrom<FilterCoefficients> for CompiledFilter {
    type Error = Error;

    fn try_from(raw: FilterCoefficients) -> Result<Self> {
        CompiledFilter::from_coefficients(raw.b, raw.a)
    }
}

/// The memory of one filter application.
///
/// Both vectors hold the most recent value first: `inputs[0]` is `x[n-1]`
/// and `outputs[0]` is `y[n-1]`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilterState {
    pub inputs: Vec<Sample>,
    pub outputs: Vec<Sample>,
}

impl FilterState {
    pub fn new<I, O, T, U>(inputs: I, outputs: O) -> Self
    where
        I: IntoIterator<Item = T>,
        O: IntoIterator<Item = U>,
        T: Into<Sample>,
        U: Into<Sample>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }
}

impl CompiledFilter {
    /// Compiles an expression, rejecting it if it is not causal.
    pub fn compile(expr: &RationalExpr) -> Result<Self> {
        Self::from_coefficients(
            expr.numerator().coeffs().to_vec(),
            expr.denominator().coeffs().to_vec(),
        )
    }

    /// Builds a filter from raw numerator and denominator coefficients.
    ///
    /// Both are rescaled so that `a[0] == 1`. A zero `a[0]` fails with
    /// [`Error::ImproperFilter`], an all-zero `a` with
    /// [`Error::SingularExpression`].
    pub fn from_coefficients<B, A, T, U>(b: B, a: A) -> Result<Self>
    where
        B: IntoIterator<Item = T>,
        A: IntoIterator<Item = U>,
        T: Into<Sample>,
        U: Into<Sample>,
    {
        let b = Polynomial::new(b);
        let a = Polynomial::new(a);
        let Some(&lag0) = a.coeffs().first() else {
            return Err(Error::SingularExpression);
        };
        if lag0.re == 0.0 && lag0.im == 0.0 {
            return Err(Error::ImproperFilter {
                lag0: lag0.to_string(),
            });
        }

        let mut b: Vec<Sample> = b.coeffs().iter().map(|&c| c / lag0).collect();
        if b.is_empty() {
            b.push(Sample::new(0.0, 0.0));
        }
        let mut a: Vec<Sample> = a.coeffs().iter().map(|&c| c / lag0).collect();
        a[0] = Sample::new(1.0, 0.0);

        tracing::debug!(
            numerator_order = b.len() - 1,
            denominator_order = a.len() - 1,
            "compiled filter"
        );
        Ok(Self {
            b: b.into(),
            a: a.into(),
        })
    }

    /// The filter that passes its input through unchanged.
    pub fn identity() -> Self {
        Self {
            b: Arc::from([Sample::new(1.0, 0.0)]),
            a: Arc::from([Sample::new(1.0, 0.0)]),
        }
    }

    /// Feedforward coefficients, `b[k]` multiplying `x[n-k]`.
    pub fn numerator(&self) -> &[Sample] {
        &self.b
    }

    /// Feedback coefficients, `a[k]` multiplying `y[n-k]`, with `a[0] == 1`.
    pub fn denominator(&self) -> &[Sample] {
        &self.a
    }

    /// The longest delay the recurrence reaches back.
    pub fn order(&self) -> usize {
        self.b.len().max(self.a.len()) - 1
    }

    /// True if there is no feedback.
    pub fn is_fir(&self) -> bool {
        self.a.len() == 1
    }

    /// The filter as a rational expression again.
    pub fn to_expr(&self) -> RationalExpr {
        RationalExpr::from_nonzero(
            Polynomial::new(self.b.iter().copied()),
            Polynomial::new(self.a.iter().copied()),
        )
    }

    /// An all-zero memory of the right shape for this filter.
    pub fn zero_state(&self) -> FilterState {
        FilterState {
            inputs: vec![Sample::new(0.0, 0.0); self.b.len() - 1],
            outputs: vec![Sample::new(0.0, 0.0); self.a.len() - 1],
        }
    }

    /// Filters `input` starting from silence.
    pub fn apply(&self, input: impl IntoStream) -> Stream {
        Stream::new(FilterRun {
            source: input.into_stream(),
            b: Arc::clone(&self.b),
            a: Arc::clone(&self.a),
            memory: Memory::Owned(self.zero_state()),
        })
    }

    /// Filters `input` starting from the given memory.
    ///
    /// Short state vectors are padded with zeros; long ones are rejected
    /// with [`Error::InvalidState`].
    pub fn apply_with_state(&self, input: impl IntoStream, state: FilterState) -> Result<Stream> {
        let state = self.fit(state)?;
        Ok(Stream::new(FilterRun {
            source: input.into_stream(),
            b: Arc::clone(&self.b),
            a: Arc::clone(&self.a),
            memory: Memory::Owned(state),
        }))
    }

    /// Filters `input` and returns a tap on the live memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use lazydsp::{filters::{CompiledFilter, FilterState}, sources};
    ///
    /// let filter = CompiledFilter::from_coefficients([1.0], [1.0, -0.5]).unwrap();
    /// let (mut out, tap) = filter
    ///     .apply_tapped(sources::ones(), FilterState::default())
    ///     .unwrap();
    /// out.drain_n(2).unwrap();
    /// assert_eq!(tap.state().outputs[0].re, 1.5);
    /// tap.reset();
    /// assert_eq!(out.drain_n(1).unwrap()[0].re, 1.0);
    /// ```
    pub fn apply_tapped(
        &self,
        input: impl IntoStream,
        state: FilterState,
    ) -> Result<(Stream, FilterTap)> {
        let state = Arc::new(Mutex::new(self.fit(state)?));
        let tap = FilterTap {
            state: Arc::clone(&state),
            inputs: self.b.len() - 1,
            outputs: self.a.len() - 1,
        };
        let stream = Stream::new(FilterRun {
            source: input.into_stream(),
            b: Arc::clone(&self.b),
            a: Arc::clone(&self.a),
            memory: Memory::Shared(state),
        });
        Ok((stream, tap))
    }

    /// The first `n` samples of the impulse response.
    pub fn impulse_response(&self, n: usize) -> Result<Vec<Sample>> {
        self.apply(sources::impulse()).take(n).drain()
    }

    fn fit(&self, state: FilterState) -> Result<FilterState> {
        fit_state(state, self.b.len() - 1, self.a.len() - 1)
    }
}

fn fit_state(mut state: FilterState, inputs: usize, outputs: usize) -> Result<FilterState> {
    if state.inputs.len() > inputs {
        return Err(Error::InvalidState {
            what: "inputs",
            expected: inputs,
            got: state.inputs.len(),
        });
    }
    if state.outputs.len() > outputs {
        return Err(Error::InvalidState {
            what: "outputs",
            expected: outputs,
            got: state.outputs.len(),
        });
    }
    state.inputs.resize(inputs, Sample::new(0.0, 0.0));
    state.outputs.resize(outputs, Sample::new(0.0, 0.0));
    Ok(state)
}

/// A handle on the memory of one running filter application.
///
/// Reads and writes take effect between pulls of the filtered stream.
pub struct FilterTap {
    state: Arc<Mutex<FilterState>>,
    inputs: usize,
    outputs: usize,
}

impl FilterTap {
    /// A snapshot of the current memory.
    pub fn state(&self) -> FilterState {
        self.state.lock().clone()
    }

    /// Overwrites the memory, padding or rejecting it like
    /// [`CompiledFilter::apply_with_state`].
    pub fn set_state(&self, state: FilterState) -> Result<()> {
        let state = fit_state(state, self.inputs, self.outputs)?;
        *self.state.lock() = state;
        Ok(())
    }

    /// Zeroes the memory.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.inputs.fill(Sample::new(0.0, 0.0));
        state.outputs.fill(Sample::new(0.0, 0.0));
    }
}

enum Memory {
    Owned(FilterState),
    Shared(Arc<Mutex<FilterState>>),
}

struct FilterRun<S: Signal> {
    source: S,
    b: Arc<[Sample]>,
    a: Arc<[Sample]>,
    memory: Memory,
}

impl<S: Signal> Signal for FilterRun<S> {
    fn next_sample(&mut self) -> Result<Sample> {
        // Pull first so a failed pull leaves the memory untouched
        let x = self.source.next_sample()?;
        let y = match &mut self.memory {
            Memory::Owned(state) => step(&self.b, &self.a, state, x),
            Memory::Shared(state) => step(&self.b, &self.a, &mut state.lock(), x),
        };
        Ok(y)
    }

    fn length(&self) -> Length {
        self.source.length()
    }
}

/// One Direct Form I step.
fn step(b: &[Sample], a: &[Sample], state: &mut FilterState, x: Sample) -> Sample {
    let mut y = b[0] * x;
    for (&bk, &xk) in b[1..].iter().zip(&state.inputs) {
        y += bk * xk;
    }
    for (&ak, &yk) in a[1..].iter().zip(&state.outputs) {
        y -= ak * yk;
    }
    if !state.inputs.is_empty() {
        state.inputs.rotate_right(1);
        state.inputs[0] = x;
    }
    if !state.outputs.is_empty() {
        state.outputs.rotate_right(1);
        state.outputs[0] = y;
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComputationError;
    use approx::assert_relative_eq;

    fn reals(values: &[Sample]) -> Vec<f64> {
        values.iter().map(|x| x.re).collect()
    }

    #[test]
    fn test_one_pole_on_ones() {
        let filter = CompiledFilter::from_coefficients([1.0], [1.0, -0.5]).unwrap();
        let out = filter.apply(vec![1.0; 5]).drain_real().unwrap();
        assert_eq!(out, vec![1.0, 1.5, 1.75, 1.875, 1.9375]);
    }

    #[test]
    fn test_identity_passes_input() {
        let input = vec![3.0, -1.0, 0.5];
        let out = CompiledFilter::identity()
            .apply(input.clone())
            .drain_real()
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_improper_filter_rejected() {
        let err = CompiledFilter::from_coefficients([1.0], [0.0, 1.0]).unwrap_err();
        assert!(matches!(err, Error::ImproperFilter { .. }));
        assert!(RationalExpr::z().compile().is_err());
        assert_eq!(
            CompiledFilter::from_coefficients([1.0], [0.0]).unwrap_err(),
            Error::SingularExpression
        );
    }

    #[test]
    fn test_lag0_rescaled() {
        let filter = CompiledFilter::from_coefficients([2.0, 4.0], [2.0, -1.0]).unwrap();
        assert_eq!(reals(filter.numerator()), vec![1.0, 2.0]);
        assert_eq!(reals(filter.denominator()), vec![1.0, -0.5]);
        assert_eq!(filter.order(), 1);
        assert!(!filter.is_fir());
    }

    #[test]
    fn test_zero_numerator_compiles() {
        let filter = RationalExpr::constant(0.0).compile().unwrap();
        assert_eq!(filter.numerator().len(), 1);
        assert!(filter.is_fir());
        let out = filter.apply(vec![1.0, 2.0]).drain_real().unwrap();
        assert_eq!(out, vec![0.0, 0.0]);
    }

    #[test]
    fn test_fir_delay_line() {
        let d = RationalExpr::delay();
        let filter = (1 + d.pow(2)).compile().unwrap();
        let out = filter.apply(vec![1.0, 2.0, 3.0, 4.0]).drain_real().unwrap();
        assert_eq!(out, vec![1.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_apply_with_state() {
        let filter = CompiledFilter::from_coefficients([1.0, 1.0], [1.0, -0.5]).unwrap();
        let state = FilterState::new([2.0], [4.0]);
        let out = filter
            .apply_with_state(vec![1.0], state)
            .unwrap()
            .drain_real()
            .unwrap();
        // 1 + 2 + 0.5 * 4
        assert_eq!(out, vec![5.0]);

        // Short state is zero-padded
        let out = filter
            .apply_with_state(vec![1.0], FilterState::new([2.0], Vec::<f64>::new()))
            .unwrap()
            .drain_real()
            .unwrap();
        assert_eq!(out, vec![3.0]);

        let err = filter
            .apply_with_state(vec![1.0], FilterState::new([1.0, 2.0], [0.0]))
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidState {
                what: "inputs",
                expected: 1,
                got: 2
            }
        );
    }

    #[test]
    fn test_applications_do_not_share_memory() {
        let filter = CompiledFilter::from_coefficients([1.0], [1.0, -0.5]).unwrap();
        let mut first = filter.apply(crate::sources::ones());
        first.drain_n(3).unwrap();
        let second = filter.apply(vec![1.0]).drain_real().unwrap();
        assert_eq!(second, vec![1.0]);
    }

    #[test]
    fn test_tap_set_state() {
        let filter = CompiledFilter::from_coefficients([1.0], [1.0, -0.5]).unwrap();
        let (mut out, tap) = filter
            .apply_tapped(crate::sources::zeros(), FilterState::default())
            .unwrap();
        assert_eq!(tap.state(), filter.zero_state());
        tap.set_state(FilterState::new(Vec::<f64>::new(), [8.0]))
            .unwrap();
        assert_eq!(reals(&out.drain_n(3).unwrap()), vec![4.0, 2.0, 1.0]);
        assert!(tap.set_state(FilterState::new([1.0], [1.0])).is_err());
    }

    #[test]
    fn test_input_fault_leaves_memory_untouched() {
        let filter = CompiledFilter::from_coefficients([1.0], [1.0, -0.5]).unwrap();
        let input = crate::sources::from_iter([1.0, 1.0]) / vec![1.0, 0.0];
        let (mut out, tap) = filter.apply_tapped(input, FilterState::default()).unwrap();
        assert_eq!(out.next_sample().unwrap().re, 1.0);
        assert_eq!(
            out.next_sample(),
            Err(Error::Computation(ComputationError::DivisionByZero))
        );
        assert_eq!(tap.state().outputs, vec![Sample::new(1.0, 0.0)]);
    }

    #[test]
    fn test_impulse_response_and_roundtrip() {
        let expr = RationalExpr::from_coeffs([1.0, 0.5], [1.0, -0.25]).unwrap();
        let filter = expr.compile().unwrap();
        let h = filter.impulse_response(3).unwrap();
        assert_relative_eq!(h[0].re, 1.0);
        assert_relative_eq!(h[1].re, 0.75);
        assert_relative_eq!(h[2].re, 0.1875);
        assert_eq!(filter.to_expr(), expr);
    }

    #[test]
    fn test_nan_is_not_suppressed() {
        let filter = CompiledFilter::identity();
        let out = filter.apply(vec![f64::NAN]).drain().unwrap();
        assert!(out[0].re.is_nan());
    }
}
