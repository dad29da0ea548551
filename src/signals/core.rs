//! Core pull trait and sample type.
//!
//! This module provides the fundamental `Signal` trait that represents any
//! lazy producer of samples, finite or infinite, together with the `Sample`
//! type shared by every stream and filter coefficient.

use crate::error::{Error, Result};
use num_complex::Complex64;

/// The single numeric type carried by streams and filter coefficients.
///
/// Real values are encoded with a zero imaginary part.
pub type Sample = Complex64;

/// How many samples a signal has left, as far as it can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    /// Exactly this many samples remain.
    Finite(usize),
    /// The signal never ends.
    Infinite,
    /// The signal cannot tell (callbacks, filtered signals).
    Unknown,
}

impl Length {
    /// Length of an elementwise combination: the shorter operand wins.
    pub fn shortest(self, other: Length) -> Length {
        match (self, other) {
            (Length::Finite(a), Length::Finite(b)) => Length::Finite(a.min(b)),
            (Length::Finite(n), Length::Infinite) | (Length::Infinite, Length::Finite(n)) => {
                Length::Finite(n)
            }
            (Length::Infinite, Length::Infinite) => Length::Infinite,
            _ => Length::Unknown,
        }
    }

    /// Length after keeping at most `n` samples.
    pub fn truncated(self, n: usize) -> Length {
        match self {
            Length::Finite(len) => Length::Finite(len.min(n)),
            Length::Infinite => Length::Finite(n),
            Length::Unknown => Length::Unknown,
        }
    }

    /// Length after dropping `n` samples.
    pub fn skipped(self, n: usize) -> Length {
        match self {
            Length::Finite(len) => Length::Finite(len.saturating_sub(n)),
            other => other,
        }
    }

    /// Length of one signal followed by another.
    pub fn followed_by(self, other: Length) -> Length {
        match (self, other) {
            (Length::Finite(a), Length::Finite(b)) => Length::Finite(a.saturating_add(b)),
            (Length::Infinite, _) | (Length::Finite(_), Length::Infinite) => Length::Infinite,
            _ => Length::Unknown,
        }
    }
}

/// Common interface for all sample producers and processors.
///
/// A pull either yields the next sample, reports the end of the sequence with
/// [`Error::EndOfSequence`], or fails with a fault that the caller must see.
/// Implementations should keep reporting the end once they have reached it.
pub trait Signal {
    /// Pulls the next sample.
    fn next_sample(&mut self) -> Result<Sample>;

    /// Reports how many samples remain. Defaults to [`Length::Unknown`].
    fn length(&self) -> Length {
        Length::Unknown
    }

    /// Pulls samples into a buffer until it is full or the signal ends.
    ///
    /// Returns the number of samples written. Faults other than the end of
    /// the sequence abort the fill and are returned.
    fn process(&mut self, buffer: &mut [Sample]) -> Result<usize> {
        for (filled, slot) in buffer.iter_mut().enumerate() {
            match self.next_sample() {
                Ok(sample) => *slot = sample,
                Err(Error::EndOfSequence) => return Ok(filled),
                Err(err) => return Err(err),
            }
        }
        Ok(buffer.len())
    }
}

impl<S: Signal + ?Sized> Signal for Box<S> {
    fn next_sample(&mut self) -> Result<Sample> {
        (**self).next_sample()
    }

    fn length(&self) -> Length {
        (**self).length()
    }

    fn process(&mut self, buffer: &mut [Sample]) -> Result<usize> {
        (**self).process(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComputationError;

    struct Countdown(u32);

    impl Signal for Countdown {
        fn next_sample(&mut self) -> Result<Sample> {
            if self.0 == 0 {
                return Err(Error::EndOfSequence);
            }
            self.0 -= 1;
            Ok(Sample::new(self.0 as f64, 0.0))
        }
    }

    struct Faulty;

    impl Signal for Faulty {
        fn next_sample(&mut self) -> Result<Sample> {
            Err(ComputationError::DivisionByZero.into())
        }
    }

    #[test]
    fn test_process_stops_at_end() {
        let mut signal = Countdown(3);
        let mut buffer = vec![Sample::new(9.0, 0.0); 5];
        let filled = signal.process(&mut buffer).unwrap();
        assert_eq!(filled, 3);
        assert_eq!(buffer[0].re, 2.0);
        assert_eq!(buffer[2].re, 0.0);
        // Untouched tail
        assert_eq!(buffer[3].re, 9.0);
    }

    #[test]
    fn test_process_propagates_faults() {
        let mut buffer = vec![Sample::default(); 4];
        let err = Faulty.process(&mut buffer).unwrap_err();
        assert_eq!(err, Error::Computation(ComputationError::DivisionByZero));
    }

    #[test]
    fn test_length_rules() {
        assert_eq!(
            Length::Finite(3).shortest(Length::Finite(5)),
            Length::Finite(3)
        );
        assert_eq!(
            Length::Infinite.shortest(Length::Finite(5)),
            Length::Finite(5)
        );
        assert_eq!(Length::Unknown.shortest(Length::Finite(5)), Length::Unknown);
        assert_eq!(Length::Infinite.truncated(4), Length::Finite(4));
        assert_eq!(Length::Finite(2).skipped(4), Length::Finite(0));
        assert_eq!(
            Length::Finite(2).followed_by(Length::Infinite),
            Length::Infinite
        );
    }
}
