//! Signal combinators for composing and transforming lazy signals.
//!
//! This module provides the building blocks streams are made of: elementwise
//! zipping of two signals, per-sample maps, predicates, and structural slicing
//! (`Take`, `Skip`, `Chain`). Every combinator pulls from its sources only when
//! it is pulled itself, one upstream pull per downstream pull.

use crate::error::{ComputationError, Error, Result};
use crate::signals::{BinaryOp, Length, Sample, Signal};

/// The boxed sample function built by [`SignalExt::combine`].
pub type BoxedBinaryFn =
    Box<dyn FnMut(Sample, Sample) -> std::result::Result<Sample, ComputationError> + Send>;

/// Combines two signals sample by sample.
///
/// If either operand ends, the result ends (shortest-sequence semantics).
/// Both operands are pulled for every index, so when one of them faults the
/// other still advances and the two stay aligned for later pulls.
///
/// # Examples
///
/// ```
/// use lazydsp::{BinaryOp, Signal, sources::Constant, combinators::ZipWith};
///
/// let mut product = ZipWith::new(Constant::new(2.0), Constant::new(3.0), |a, b| {
///     BinaryOp::Mul.apply(a, b)
/// });
/// assert_eq!(product.next_sample().unwrap().re, 6.0);
/// ```
pub struct ZipWith<A: Signal, B: Signal, F>
where
    F: FnMut(Sample, Sample) -> std::result::Result<Sample, ComputationError>,
{
    a: A,
    b: B,
    func: F,
}

impl<A: Signal, B: Signal, F> ZipWith<A, B, F>
where
    F: FnMut(Sample, Sample) -> std::result::Result<Sample, ComputationError>,
{
    /// Creates a new ZipWith combinator.
    pub fn new(a: A, b: B, func: F) -> Self {
        Self { a, b, func }
    }
}

impl<A: Signal, B: Signal, F> Signal for ZipWith<A, B, F>
where
    F: FnMut(Sample, Sample) -> std::result::Result<Sample, ComputationError>,
{
    fn next_sample(&mut self) -> Result<Sample> {
        let left = self.a.next_sample();
        if let Err(Error::EndOfSequence) = left {
            return Err(Error::EndOfSequence);
        }
        let right = self.b.next_sample();
        Ok((self.func)(left?, right?)?)
    }

    fn length(&self) -> Length {
        self.a.length().shortest(self.b.length())
    }
}

/// Applies a function to each sample.
///
/// # Examples
///
/// ```
/// use lazydsp::{Signal, sources::Constant, combinators::Map};
///
/// let mut squared = Map { source: Constant::new(3.0), func: |x| x * x };
/// assert_eq!(squared.next_sample().unwrap().re, 9.0);
/// ```
pub struct Map<S: Signal, F>
where
    F: FnMut(Sample) -> Sample,
{
    pub source: S,
    pub func: F,
}

impl<S: Signal, F> Signal for Map<S, F>
where
    F: FnMut(Sample) -> Sample,
{
    fn next_sample(&mut self) -> Result<Sample> {
        let sample = self.source.next_sample()?;
        Ok((self.func)(sample))
    }

    fn length(&self) -> Length {
        self.source.length()
    }
}

/// Applies a fallible function to each sample.
///
/// A failure surfaces as [`Error::Computation`] for that pull only; the source
/// has already advanced past the offending sample.
pub struct TryMap<S: Signal, F>
where
    F: FnMut(Sample) -> std::result::Result<Sample, ComputationError>,
{
    pub source: S,
    pub func: F,
}

impl<S: Signal, F> Signal for TryMap<S, F>
where
    F: FnMut(Sample) -> std::result::Result<Sample, ComputationError>,
{
    fn next_sample(&mut self) -> Result<Sample> {
        let sample = self.source.next_sample()?;
        Ok((self.func)(sample)?)
    }

    fn length(&self) -> Length {
        self.source.length()
    }
}

/// Keeps only the samples matching a predicate.
///
/// Rejected samples are pulled and discarded in a loop until one matches or
/// the source ends.
pub struct Filter<S: Signal, P>
where
    P: FnMut(&Sample) -> bool,
{
    pub source: S,
    pub predicate: P,
}

impl<S: Signal, P> Signal for Filter<S, P>
where
    P: FnMut(&Sample) -> bool,
{
    fn next_sample(&mut self) -> Result<Sample> {
        loop {
            let sample = self.source.next_sample()?;
            if (self.predicate)(&sample) {
                return Ok(sample);
            }
        }
    }

    fn length(&self) -> Length {
        match self.source.length() {
            Length::Finite(0) => Length::Finite(0),
            _ => Length::Unknown,
        }
    }
}

/// Yields at most `remaining` samples, never pulling past them.
pub struct Take<S: Signal> {
    pub source: S,
    pub remaining: usize,
}

impl<S: Signal> Signal for Take<S> {
    fn next_sample(&mut self) -> Result<Sample> {
        if self.remaining == 0 {
            return Err(Error::EndOfSequence);
        }
        let sample = self.source.next_sample();
        match &sample {
            Err(Error::EndOfSequence) => self.remaining = 0,
            _ => self.remaining -= 1,
        }
        sample
    }

    fn length(&self) -> Length {
        self.source.length().truncated(self.remaining)
    }
}

/// Drops the first `pending` samples.
///
/// The dropped samples are still pulled from the source (on the first pull of
/// this combinator), so any side effects of the source happen. A fault raised
/// by a dropped sample is returned rather than skipped over.
pub struct Skip<S: Signal> {
    pub source: S,
    pub pending: usize,
}

impl<S: Signal> Signal for Skip<S> {
    fn next_sample(&mut self) -> Result<Sample> {
        while self.pending > 0 {
            self.pending -= 1;
            self.source.next_sample()?;
        }
        self.source.next_sample()
    }

    fn length(&self) -> Length {
        self.source.length().skipped(self.pending)
    }
}

/// Plays one signal to its end, then another.
pub struct Chain<A: Signal, B: Signal> {
    first: A,
    second: B,
    first_done: bool,
}

impl<A: Signal, B: Signal> Chain<A, B> {
    /// Creates a new Chain combinator.
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            first_done: false,
        }
    }
}

impl<A: Signal, B: Signal> Signal for Chain<A, B> {
    fn next_sample(&mut self) -> Result<Sample> {
        if !self.first_done {
            match self.first.next_sample() {
                Err(Error::EndOfSequence) => self.first_done = true,
                other => return other,
            }
        }
        self.second.next_sample()
    }

    fn length(&self) -> Length {
        if self.first_done {
            self.second.length()
        } else {
            self.first.length().followed_by(self.second.length())
        }
    }
}

/// Inverts/negates a signal.
pub struct Invert<S: Signal> {
    pub source: S,
}

impl<S: Signal> Signal for Invert<S> {
    fn next_sample(&mut self) -> Result<Sample> {
        Ok(-self.source.next_sample()?)
    }

    fn length(&self) -> Length {
        self.source.length()
    }
}

/// Magnitude of each sample (full-wave rectification for real signals).
pub struct Abs<S: Signal> {
    pub source: S,
}

impl<S: Signal> Signal for Abs<S> {
    fn next_sample(&mut self) -> Result<Sample> {
        Ok(Sample::new(self.source.next_sample()?.norm(), 0.0))
    }

    fn length(&self) -> Length {
        self.source.length()
    }
}

/// Turns NaN or infinite samples into [`ComputationError::NonFinite`].
///
/// Nothing else in the crate rejects non-finite values; this is the opt-in
/// guard for consumers that must not see them.
pub struct CheckFinite<S: Signal> {
    pub source: S,
}

impl<S: Signal> Signal for CheckFinite<S> {
    fn next_sample(&mut self) -> Result<Sample> {
        let sample = self.source.next_sample()?;
        if sample.re.is_finite() && sample.im.is_finite() {
            Ok(sample)
        } else {
            Err(ComputationError::NonFinite(sample.to_string()).into())
        }
    }

    fn length(&self) -> Length {
        self.source.length()
    }
}

/// Extension trait providing combinator methods on any Signal.
///
/// This trait is automatically implemented for all types that implement
/// `Signal`, providing a fluent API for chaining operations on plain signal
/// structs. [`Stream`](crate::Stream) offers the same operations on the boxed,
/// operator-overloaded type.
///
/// # Examples
///
/// ```
/// use lazydsp::{BinaryOp, Signal, combinators::SignalExt, sources::Constant};
///
/// let mut signal = Constant::new(2.0)
///     .combine(Constant::new(3.0), BinaryOp::Mul)
///     .map(|x| x + 1.0)
///     .take(2);
///
/// assert_eq!(signal.next_sample().unwrap().re, 7.0);
/// assert_eq!(signal.next_sample().unwrap().re, 7.0);
/// assert!(signal.next_sample().unwrap_err().is_end_of_sequence());
/// ```
pub trait SignalExt: Signal + Sized {
    /// Combines this signal with another through a sample function.
    fn zip_with<S, F>(self, other: S, func: F) -> ZipWith<Self, S, F>
    where
        S: Signal,
        F: FnMut(Sample, Sample) -> std::result::Result<Sample, ComputationError>,
    {
        ZipWith::new(self, other, func)
    }

    /// Combines this signal with another through a [`BinaryOp`].
    fn combine<S: Signal>(self, other: S, op: BinaryOp) -> ZipWith<Self, S, BoxedBinaryFn> {
        ZipWith::new(self, other, Box::new(move |a, b| op.apply(a, b)))
    }

    /// Applies a function to each sample of this signal.
    fn map<F>(self, func: F) -> Map<Self, F>
    where
        F: FnMut(Sample) -> Sample,
    {
        Map { source: self, func }
    }

    /// Applies a fallible function to each sample of this signal.
    fn try_map<F>(self, func: F) -> TryMap<Self, F>
    where
        F: FnMut(Sample) -> std::result::Result<Sample, ComputationError>,
    {
        TryMap { source: self, func }
    }

    /// Keeps only the samples matching a predicate.
    fn filter<P>(self, predicate: P) -> Filter<Self, P>
    where
        P: FnMut(&Sample) -> bool,
    {
        Filter {
            source: self,
            predicate,
        }
    }

    /// Yields at most `n` samples.
    fn take(self, n: usize) -> Take<Self> {
        Take {
            source: self,
            remaining: n,
        }
    }

    /// Drops the first `n` samples (still pulling them).
    fn skip(self, n: usize) -> Skip<Self> {
        Skip {
            source: self,
            pending: n,
        }
    }

    /// Follows this signal with another once it ends.
    fn chain<S: Signal>(self, other: S) -> Chain<Self, S> {
        Chain::new(self, other)
    }

    /// Negates this signal.
    fn invert(self) -> Invert<Self> {
        Invert { source: self }
    }

    /// Takes the magnitude of this signal.
    fn abs(self) -> Abs<Self> {
        Abs { source: self }
    }

    /// Rejects NaN and infinite samples with a computation error.
    fn check_finite(self) -> CheckFinite<Self> {
        CheckFinite { source: self }
    }
}

// Blanket implementation for all Signal types
impl<T: Signal> SignalExt for T {}
