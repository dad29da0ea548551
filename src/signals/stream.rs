//! The boxed, composable stream type.
//!
//! [`Stream`] is the value users hold: a single-consumer lazy sequence that
//! owns its producer. Arithmetic between streams and scalars goes through
//! `std::ops`, every other transformation is a consuming method, and `copy`
//! turns the producer into a shared tee so the original and the copy can be
//! pulled independently.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::combinators::{
    Abs, Chain, CheckFinite, Filter, Invert, Map, Skip, Take, TryMap, ZipWith,
};
use crate::error::{ComputationError, Error, Result};
use crate::filters::CompiledFilter;
use crate::signals::tee::TeeReader;
use crate::signals::{BinaryOp, Length, Sample, Signal};
use crate::sources::{Constant, Empty, IterSource};

enum Inner {
    Plain(Box<dyn Signal + Send>),
    Tee(TeeReader),
}

/// A lazy, pull-based, possibly infinite sequence of samples.
///
/// Operators move their operands in and return a new stream pulling from
/// both. A stream never shares its position with another one: use
/// [`Stream::copy`] to get a second, independent view of the remaining
/// samples.
///
/// # Examples
///
/// ```
/// use lazydsp::sources;
///
/// let ramp = sources::from_iter([1.0, 2.0, 3.0]);
/// let doubled = 2.0 * ramp + 1.0;
/// assert_eq!(doubled.drain_real().unwrap(), vec![3.0, 5.0, 7.0]);
/// ```
pub struct Stream {
    inner: Inner,
    exhausted: bool,
}

impl Stream {
    /// Wraps any signal in a stream. Nothing is pulled until the stream is.
    pub fn new<S: Signal + Send + 'static>(signal: S) -> Self {
        Self {
            inner: Inner::Plain(Box::new(signal)),
            exhausted: false,
        }
    }

    /// A stream with no samples.
    pub fn empty() -> Self {
        Self::new(Empty)
    }

    /// Returns an independent stream over the samples this one has left.
    ///
    /// Both streams then see the same sequence whatever order they are pulled
    /// in. Samples pulled by one and not yet by the other are buffered.
    ///
    /// # Examples
    ///
    /// ```
    /// use lazydsp::sources;
    ///
    /// let mut original = sources::from_iter([1.0, 2.0, 3.0]);
    /// original.next();
    /// let copy = original.copy();
    /// assert_eq!(copy.drain_real().unwrap(), vec![2.0, 3.0]);
    /// assert_eq!(original.drain_real().unwrap(), vec![2.0, 3.0]);
    /// ```
    pub fn copy(&mut self) -> Stream {
        if self.exhausted {
            return Stream::empty();
        }
        let reader = match std::mem::replace(&mut self.inner, Inner::Plain(Box::new(Empty))) {
            Inner::Tee(mine) => {
                let theirs = mine.fork();
                self.inner = Inner::Tee(mine);
                theirs
            }
            Inner::Plain(source) => {
                tracing::debug!(length = ?source.length(), "teeing stream");
                let (mine, theirs) = TeeReader::split(source);
                self.inner = Inner::Tee(mine);
                theirs
            }
        };
        Stream {
            inner: Inner::Tee(reader),
            exhausted: false,
        }
    }

    /// Looks at up to `n` upcoming samples without consuming them.
    pub fn peek(&mut self, n: usize) -> Result<Vec<Sample>> {
        self.copy().drain_n(n)
    }

    /// Looks at the next sample without consuming it.
    pub fn peek_one(&mut self) -> Result<Option<Sample>> {
        Ok(self.peek(1)?.into_iter().next())
    }

    /// Yields at most `n` samples.
    pub fn take(self, n: usize) -> Stream {
        Stream::new(Take {
            source: self,
            remaining: n,
        })
    }

    /// Drops the first `n` samples. They are still pulled, on the first pull.
    pub fn skip(self, n: usize) -> Stream {
        Stream::new(Skip {
            source: self,
            pending: n,
        })
    }

    /// Applies a function to each sample.
    pub fn map<F>(self, func: F) -> Stream
    where
        F: FnMut(Sample) -> Sample + Send + 'static,
    {
        Stream::new(Map { source: self, func })
    }

    /// Applies a fallible function to each sample.
    pub fn try_map<F>(self, func: F) -> Stream
    where
        F: FnMut(Sample) -> std::result::Result<Sample, ComputationError> + Send + 'static,
    {
        Stream::new(TryMap { source: self, func })
    }

    /// Keeps only the samples matching `predicate`.
    pub fn filter<P>(self, predicate: P) -> Stream
    where
        P: FnMut(&Sample) -> bool + Send + 'static,
    {
        Stream::new(Filter {
            source: self,
            predicate,
        })
    }

    /// Follows this stream with `other` once it ends.
    pub fn chain(self, other: impl IntoStream) -> Stream {
        Stream::new(Chain::new(self, other.into_stream()))
    }

    /// Magnitude of each sample.
    pub fn abs(self) -> Stream {
        Stream::new(Abs { source: self })
    }

    /// Real part of each sample.
    pub fn real(self) -> Stream {
        self.map(|x| Sample::new(x.re, 0.0))
    }

    /// Fails on NaN or infinite samples instead of passing them on.
    pub fn check_finite(self) -> Stream {
        Stream::new(CheckFinite { source: self })
    }

    /// Combines two streams sample by sample through `func`.
    pub fn zip_with<F>(self, other: impl IntoStream, func: F) -> Stream
    where
        F: FnMut(Sample, Sample) -> std::result::Result<Sample, ComputationError>
            + Send
            + 'static,
    {
        Stream::new(ZipWith::new(self, other.into_stream(), func))
    }

    /// Combines two streams sample by sample through a [`BinaryOp`].
    pub fn combine(self, other: impl IntoStream, op: BinaryOp) -> Stream {
        self.zip_with(other, move |a, b| op.apply(a, b))
    }

    /// Elementwise power.
    pub fn pow(self, exponent: impl IntoStream) -> Stream {
        self.combine(exponent, BinaryOp::Pow)
    }

    /// Elementwise `<`, yielding 1.0 or 0.0.
    pub fn lt(self, other: impl IntoStream) -> Stream {
        self.combine(other, BinaryOp::Lt)
    }

    /// Elementwise `<=`, yielding 1.0 or 0.0.
    pub fn le(self, other: impl IntoStream) -> Stream {
        self.combine(other, BinaryOp::Le)
    }

    /// Elementwise `>`, yielding 1.0 or 0.0.
    pub fn gt(self, other: impl IntoStream) -> Stream {
        self.combine(other, BinaryOp::Gt)
    }

    /// Elementwise `>=`, yielding 1.0 or 0.0.
    pub fn ge(self, other: impl IntoStream) -> Stream {
        self.combine(other, BinaryOp::Ge)
    }

    /// Elementwise equality, yielding 1.0 or 0.0.
    pub fn eq_elem(self, other: impl IntoStream) -> Stream {
        self.combine(other, BinaryOp::Eq)
    }

    /// Elementwise inequality, yielding 1.0 or 0.0.
    pub fn ne_elem(self, other: impl IntoStream) -> Stream {
        self.combine(other, BinaryOp::Ne)
    }

    /// Runs this stream through a compiled filter with zero initial state.
    pub fn apply_filter(self, filter: &CompiledFilter) -> Stream {
        filter.apply(self)
    }

    /// Pulls every remaining sample.
    ///
    /// Stops cleanly at the end of the sequence; any fault fails the whole
    /// drain. Never returns for an infinite stream.
    pub fn drain(mut self) -> Result<Vec<Sample>> {
        self.drain_n(usize::MAX)
    }

    /// Pulls at most `n` samples.
    pub fn drain_n(&mut self, n: usize) -> Result<Vec<Sample>> {
        let mut out = match self.length() {
            Length::Finite(len) => Vec::with_capacity(len.min(n)),
            _ => Vec::new(),
        };
        while out.len() < n {
            match self.next_sample() {
                Ok(sample) => out.push(sample),
                Err(Error::EndOfSequence) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    /// Pulls every remaining sample, keeping only the real parts.
    pub fn drain_real(self) -> Result<Vec<f64>> {
        Ok(self.drain()?.into_iter().map(|x| x.re).collect())
    }
}

impl Signal for Stream {
    fn next_sample(&mut self) -> Result<Sample> {
        if self.exhausted {
            return Err(Error::EndOfSequence);
        }
        let result = match &mut self.inner {
            Inner::Plain(source) => source.next_sample(),
            Inner::Tee(reader) => reader.next_sample(),
        };
        if let Err(Error::EndOfSequence) = result {
            self.exhausted = true;
        }
        result
    }

    fn length(&self) -> Length {
        if self.exhausted {
            return Length::Finite(0);
        }
        match &self.inner {
            Inner::Plain(source) => source.length(),
            Inner::Tee(reader) => reader.length(),
        }
    }
}

impl Iterator for Stream {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_sample() {
            Err(Error::EndOfSequence) => None,
            result => Some(result),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match Signal::length(self) {
            Length::Finite(n) => (n, Some(n)),
            Length::Infinite => (usize::MAX, None),
            Length::Unknown => (0, None),
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("length", &Signal::length(self))
            .field("shared", &matches!(self.inner, Inner::Tee(_)))
            .finish()
    }
}

/// Values that can stand in for a stream on either side of an operator.
///
/// Scalars become infinite constant streams, vectors finite ones.
pub trait IntoStream {
    fn into_stream(self) -> Stream;
}

impl IntoStream for Stream {
    fn into_stream(self) -> Stream {
        self
    }
}

impl IntoStream for Sample {
    fn into_stream(self) -> Stream {
        Stream::new(Constant::new(self))
    }
}

impl IntoStream for f64 {
    fn into_stream(self) -> Stream {
        Stream::new(Constant::new(self))
    }
}

impl IntoStream for i32 {
    fn into_stream(self) -> Stream {
        Stream::new(Constant::new(f64::from(self)))
    }
}

impl IntoStream for Vec<Sample> {
    fn into_stream(self) -> Stream {
        Stream::new(IterSource::new(self))
    }
}

impl IntoStream for Vec<f64> {
    fn into_stream(self) -> Stream {
        Stream::new(IterSource::new(self.into_iter().map(|x| Sample::new(x, 0.0))))
    }
}

impl From<Vec<Sample>> for Stream {
    fn from(values: Vec<Sample>) -> Self {
        values.into_stream()
    }
}

impl From<Vec<f64>> for Stream {
    fn from(values: Vec<f64>) -> Self {
        values.into_stream()
    }
}

macro_rules! impl_stream_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: IntoStream> $trait<T> for Stream {
            type Output = Stream;

            fn $method(self, rhs: T) -> Stream {
                self.combine(rhs, $op)
            }
        }

        impl_stream_op!(@scalar $trait, $method, $op, f64, i32, Sample);
    };
    (@scalar $trait:ident, $method:ident, $op:expr, $($scalar:ty),+) => {
        $(
            impl $trait<Stream> for $scalar {
                type Output = Stream;

                fn $method(self, rhs: Stream) -> Stream {
                    self.into_stream().combine(rhs, $op)
                }
            }
        )+
    };
}

impl_stream_op!(Add, add, BinaryOp::Add);
impl_stream_op!(Sub, sub, BinaryOp::Sub);
impl_stream_op!(Mul, mul, BinaryOp::Mul);
impl_stream_op!(Div, div, BinaryOp::Div);

impl Neg for Stream {
    type Output = Stream;

    fn neg(self) -> Stream {
        Stream::new(Invert { source: self })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources;

    fn reals(values: &[f64]) -> Stream {
        values.to_vec().into()
    }

    #[test]
    fn test_operators_with_scalars_on_both_sides() {
        let s = (reals(&[1.0, 2.0]) * 3.0 - 1).drain_real().unwrap();
        assert_eq!(s, vec![2.0, 5.0]);

        let s = (10.0 - reals(&[1.0, 2.0])).drain_real().unwrap();
        assert_eq!(s, vec![9.0, 8.0]);

        let s = (1 / reals(&[2.0, 4.0])).drain_real().unwrap();
        assert_eq!(s, vec![0.5, 0.25]);

        let s = (-reals(&[1.0, -2.0])).drain_real().unwrap();
        assert_eq!(s, vec![-1.0, 2.0]);
    }

    #[test]
    fn test_complex_scalar_operand() {
        let s = (Sample::new(0.0, 1.0) * reals(&[2.0])).drain().unwrap();
        assert_eq!(s, vec![Sample::new(0.0, 2.0)]);
    }

    #[test]
    fn test_shortest_sequence() {
        let sum = reals(&[1.0, 2.0, 3.0]) + reals(&[1.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(sum.length(), Length::Finite(3));
        assert_eq!(sum.drain_real().unwrap(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_division_by_zero_fails_drain() {
        let quotient = reals(&[1.0, 2.0]) / reals(&[1.0, 0.0]);
        assert_eq!(
            quotient.drain(),
            Err(Error::Computation(ComputationError::DivisionByZero))
        );
    }

    #[test]
    fn test_comparisons() {
        let values = reals(&[1.0, 2.0, 3.0]);
        assert_eq!(values.gt(1.5).drain_real().unwrap(), vec![0.0, 1.0, 1.0]);
        assert_eq!(
            reals(&[1.0, 2.0]).eq_elem(2.0).drain_real().unwrap(),
            vec![0.0, 1.0]
        );
        assert_eq!(
            reals(&[2.0, 3.0]).pow(2).drain_real().unwrap(),
            vec![4.0, 9.0]
        );
    }

    #[test]
    fn test_complex_ordering_fails() {
        let complex: Stream = vec![Sample::new(1.0, 1.0)].into();
        assert!(matches!(
            complex.lt(0.0).drain(),
            Err(Error::Computation(ComputationError::Unordered(_)))
        ));
    }

    #[test]
    fn test_copy_interleaved() {
        let mut a = reals(&[1.0, 2.0, 3.0, 4.0]);
        let mut b = a.copy();
        let mut c = b.copy();
        assert_eq!(b.next().unwrap().unwrap().re, 1.0);
        assert_eq!(b.next().unwrap().unwrap().re, 2.0);
        assert_eq!(a.next().unwrap().unwrap().re, 1.0);
        assert_eq!(c.drain_n(3).unwrap().len(), 3);
        assert_eq!(a.drain_real().unwrap(), vec![2.0, 3.0, 4.0]);
        assert_eq!(b.drain_real().unwrap(), vec![3.0, 4.0]);
        assert_eq!(c.drain_real().unwrap(), vec![4.0]);
    }

    #[test]
    fn test_copy_of_exhausted_stream_is_empty() {
        let mut a = reals(&[1.0]);
        a.drain_n(5).unwrap();
        assert!(a.copy().drain().unwrap().is_empty());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut s = reals(&[1.0, 2.0, 3.0]);
        assert_eq!(s.peek(2).unwrap().len(), 2);
        assert_eq!(s.peek_one().unwrap(), Some(Sample::new(1.0, 0.0)));
        assert_eq!(s.drain_real().unwrap(), vec![1.0, 2.0, 3.0]);

        let mut empty = Stream::empty();
        assert_eq!(empty.peek_one().unwrap(), None);
    }

    #[test]
    fn test_iterator_maps_end_to_none() {
        let collected: Result<Vec<Sample>> = reals(&[1.0, 2.0]).collect();
        assert_eq!(collected.unwrap().len(), 2);

        let mut s = reals(&[1.0]);
        assert!(s.next().is_some());
        assert!(s.next().is_none());
        assert!(s.next().is_none());
    }

    #[test]
    fn test_transformations() {
        let s = sources::ones()
            .skip(1)
            .take(3)
            .map(|x| x * 2.0)
            .chain(vec![5.0])
            .drain_real()
            .unwrap();
        assert_eq!(s, vec![2.0, 2.0, 2.0, 5.0]);

        let s = reals(&[-3.0, 4.0, -5.0])
            .filter(|x| x.re < 0.0)
            .abs()
            .drain_real()
            .unwrap();
        assert_eq!(s, vec![3.0, 5.0]);

        let s: Stream = vec![Sample::new(1.0, 2.0)].into();
        assert_eq!(s.real().drain().unwrap(), vec![Sample::new(1.0, 0.0)]);
    }

    #[test]
    fn test_drain_n_on_infinite_stream() {
        let mut s = sources::zeros();
        assert_eq!(s.drain_n(4).unwrap().len(), 4);
        assert_eq!(s.length(), Length::Infinite);
    }

    #[test]
    fn test_stream_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Stream>();
    }
}
