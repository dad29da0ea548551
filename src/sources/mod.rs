//! Sequence sources.
//!
//! Everything that starts a stream lives here: finite literal sequences,
//! producer callbacks, constants and a few deterministic generators. Each
//! source is a plain [`Signal`] struct plus a function that wraps it in a
//! [`Stream`]. All sources are fused: once they report the end of the
//! sequence they keep doing so.

pub mod noise;

pub use noise::{WhiteNoise, white_noise};

use std::f64::consts::TAU;
use std::iter::Fuse;

use crate::error::{ComputationError, Error, Result};
use crate::signals::{Length, Sample, Signal, Stream};

/// Plays back the items of an iterator.
pub struct IterSource<I: Iterator<Item = Sample>> {
    iter: Fuse<I>,
}

impl<I: Iterator<Item = Sample>> IterSource<I> {
    /// Creates a source over anything that iterates samples.
    pub fn new<T>(values: T) -> Self
    where
        T: IntoIterator<Item = Sample, IntoIter = I>,
    {
        Self {
            iter: values.into_iter().fuse(),
        }
    }
}

impl<I: Iterator<Item = Sample>> Signal for IterSource<I> {
    fn next_sample(&mut self) -> Result<Sample> {
        self.iter.next().ok_or(Error::EndOfSequence)
    }

    fn length(&self) -> Length {
        match self.iter.size_hint() {
            (low, Some(high)) if low == high => Length::Finite(low),
            _ => Length::Unknown,
        }
    }
}

/// Pulls samples from a callback until it returns `None`.
pub struct FnSource<F: FnMut() -> Option<Sample>> {
    func: F,
    done: bool,
}

impl<F: FnMut() -> Option<Sample>> FnSource<F> {
    pub fn new(func: F) -> Self {
        Self { func, done: false }
    }
}

impl<F: FnMut() -> Option<Sample>> Signal for FnSource<F> {
    fn next_sample(&mut self) -> Result<Sample> {
        if self.done {
            return Err(Error::EndOfSequence);
        }
        match (self.func)() {
            Some(sample) => Ok(sample),
            None => {
                self.done = true;
                Err(Error::EndOfSequence)
            }
        }
    }
}

/// Pulls samples from a callback that can fail.
///
/// `Ok(None)` ends the sequence. A callback error is reported for that pull
/// only; the next pull calls the producer again.
pub struct FallibleFnSource<F>
where
    F: FnMut() -> std::result::Result<Option<Sample>, ComputationError>,
{
    func: F,
    done: bool,
}

impl<F> FallibleFnSource<F>
where
    F: FnMut() -> std::result::Result<Option<Sample>, ComputationError>,
{
    pub fn new(func: F) -> Self {
        Self { func, done: false }
    }
}

impl<F> Signal for FallibleFnSource<F>
where
    F: FnMut() -> std::result::Result<Option<Sample>, ComputationError>,
{
    fn next_sample(&mut self) -> Result<Sample> {
        if self.done {
            return Err(Error::EndOfSequence);
        }
        match (self.func)()? {
            Some(sample) => Ok(sample),
            None => {
                self.done = true;
                Err(Error::EndOfSequence)
            }
        }
    }
}

/// A signal that always outputs the same value.
pub struct Constant {
    value: Sample,
}

impl Constant {
    /// Creates a new constant signal.
    ///
    /// # Examples
    ///
    /// ```
    /// use lazydsp::{Signal, sources::Constant};
    ///
    /// let mut half = Constant::new(0.5);
    /// assert_eq!(half.next_sample().unwrap().re, 0.5);
    /// ```
    pub fn new(value: impl Into<Sample>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl Signal for Constant {
    fn next_sample(&mut self) -> Result<Sample> {
        Ok(self.value)
    }

    fn length(&self) -> Length {
        Length::Infinite
    }
}

/// Repeats a finite pattern forever.
pub struct Cycle {
    pattern: Vec<Sample>,
    index: usize,
}

impl Cycle {
    pub fn new(pattern: Vec<Sample>) -> Self {
        Self { pattern, index: 0 }
    }
}

impl Signal for Cycle {
    fn next_sample(&mut self) -> Result<Sample> {
        let sample = *self.pattern.get(self.index).ok_or(Error::EndOfSequence)?;
        self.index = (self.index + 1) % self.pattern.len();
        Ok(sample)
    }

    fn length(&self) -> Length {
        if self.pattern.is_empty() {
            Length::Finite(0)
        } else {
            Length::Infinite
        }
    }
}

/// `len` evenly spaced samples from `begin` toward `end`, end excluded.
pub struct Line {
    begin: Sample,
    end: Sample,
    len: usize,
    index: usize,
}

impl Line {
    pub fn new(len: usize, begin: impl Into<Sample>, end: impl Into<Sample>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
            len,
            index: 0,
        }
    }
}

impl Signal for Line {
    fn next_sample(&mut self) -> Result<Sample> {
        if self.index >= self.len {
            return Err(Error::EndOfSequence);
        }
        let offset = (self.end - self.begin) * self.index as f64 / self.len as f64;
        self.index += 1;
        Ok(self.begin + offset)
    }

    fn length(&self) -> Length {
        Length::Finite(self.len - self.index)
    }
}

/// A single 1 followed by zeros forever.
#[derive(Default)]
pub struct Impulse {
    emitted: bool,
}

impl Signal for Impulse {
    fn next_sample(&mut self) -> Result<Sample> {
        if self.emitted {
            Ok(Sample::new(0.0, 0.0))
        } else {
            self.emitted = true;
            Ok(Sample::new(1.0, 0.0))
        }
    }

    fn length(&self) -> Length {
        Length::Infinite
    }
}

/// Cosine wave `cos(2π·freq·n + phase)`.
///
/// `freq` is in cycles per sample, so 0.5 is the Nyquist frequency.
pub struct Sinusoid {
    freq: f64,
    phase: f64,
    n: u64,
}

impl Sinusoid {
    pub fn new(freq: f64, phase: f64) -> Self {
        Self { freq, phase, n: 0 }
    }
}

impl Signal for Sinusoid {
    fn next_sample(&mut self) -> Result<Sample> {
        // Wrap the cycle count so long runs keep their precision
        let cycles = (self.freq * self.n as f64).fract();
        self.n += 1;
        Ok(Sample::new((TAU * cycles + self.phase).cos(), 0.0))
    }

    fn length(&self) -> Length {
        Length::Infinite
    }
}

/// A signal with no samples at all.
pub struct Empty;

impl Signal for Empty {
    fn next_sample(&mut self) -> Result<Sample> {
        Err(Error::EndOfSequence)
    }

    fn length(&self) -> Length {
        Length::Finite(0)
    }
}

/// Creates a finite stream from a sequence of values.
///
/// # Examples
///
/// ```
/// use lazydsp::sources;
///
/// let stream = sources::from_iter([1.0, 2.0, 3.0]);
/// assert_eq!(stream.drain_real().unwrap(), vec![1.0, 2.0, 3.0]);
/// ```
pub fn from_iter<I, T>(values: I) -> Stream
where
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + 'static,
    T: Into<Sample> + 'static,
{
    Stream::new(IterSource::new(values.into_iter().map(Into::into)))
}

/// Creates a stream from a producer callback; `None` ends it.
///
/// # Examples
///
/// ```
/// use lazydsp::{Sample, sources};
///
/// let mut count = 0.0;
/// let stream = sources::from_fn(move || {
///     count += 1.0;
///     (count <= 3.0).then(|| Sample::new(count, 0.0))
/// });
/// assert_eq!(stream.drain_real().unwrap(), vec![1.0, 2.0, 3.0]);
/// ```
pub fn from_fn<F>(func: F) -> Stream
where
    F: FnMut() -> Option<Sample> + Send + 'static,
{
    Stream::new(FnSource::new(func))
}

/// Creates a stream from a producer callback that can fail.
pub fn from_fallible_fn<F>(func: F) -> Stream
where
    F: FnMut() -> std::result::Result<Option<Sample>, ComputationError> + Send + 'static,
{
    Stream::new(FallibleFnSource::new(func))
}

/// An infinite stream of one value.
pub fn constant(value: impl Into<Sample>) -> Stream {
    Stream::new(Constant::new(value))
}

/// An infinite stream of zeros.
pub fn zeros() -> Stream {
    constant(0.0)
}

/// An infinite stream of ones.
pub fn ones() -> Stream {
    constant(1.0)
}

/// Repeats `pattern` forever. An empty pattern gives an empty stream.
pub fn cycle<I, T>(pattern: I) -> Stream
where
    I: IntoIterator<Item = T>,
    T: Into<Sample>,
{
    Stream::new(Cycle::new(pattern.into_iter().map(Into::into).collect()))
}

/// `len` evenly spaced samples from `begin` toward `end`, end excluded.
///
/// # Examples
///
/// ```
/// use lazydsp::sources;
///
/// assert_eq!(
///     sources::line(4, 0.0, 1.0).drain_real().unwrap(),
///     vec![0.0, 0.25, 0.5, 0.75]
/// );
/// ```
pub fn line(len: usize, begin: impl Into<Sample>, end: impl Into<Sample>) -> Stream {
    Stream::new(Line::new(len, begin, end))
}

/// A unit impulse followed by zeros.
pub fn impulse() -> Stream {
    Stream::new(Impulse::default())
}

/// `cos(2π·freq·n + phase)` with `freq` in cycles per sample.
pub fn sinusoid(freq: f64, phase: f64) -> Stream {
    Stream::new(Sinusoid::new(freq, phase))
}
