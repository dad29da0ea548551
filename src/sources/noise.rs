//! White noise source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::signals::{Length, Sample, Signal, Stream};

/// A white noise generator.
///
/// White noise has equal power across all frequencies. Each sample is
/// a real value uniformly distributed between -1.0 and 1.0.
pub struct WhiteNoise<R: Rng = StdRng> {
    /// Random number generator
    rng: R,
}

impl WhiteNoise<StdRng> {
    /// Creates a new white noise generator seeded from system entropy.
    ///
    /// # Examples
    ///
    /// ```
    /// use lazydsp::{Signal, sources::WhiteNoise};
    ///
    /// let mut noise = WhiteNoise::new();
    /// let sample = noise.next_sample().unwrap();
    /// assert!(sample.re.abs() <= 1.0);
    /// ```
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for WhiteNoise<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> WhiteNoise<R> {
    /// Creates a new white noise generator with a custom RNG.
    ///
    /// # Examples
    ///
    /// ```
    /// use lazydsp::{Signal, sources::WhiteNoise};
    /// use rand::SeedableRng;
    ///
    /// let rng = rand::rngs::StdRng::seed_from_u64(42);
    /// let mut noise = WhiteNoise::with_rng(rng);
    /// let sample = noise.next_sample().unwrap();
    /// ```
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Signal for WhiteNoise<R> {
    fn next_sample(&mut self) -> Result<Sample> {
        Ok(Sample::new(self.rng.gen_range(-1.0..=1.0), 0.0))
    }

    fn length(&self) -> Length {
        Length::Infinite
    }
}

/// An infinite stream of uniform white noise in `[-1, 1]`.
pub fn white_noise() -> Stream {
    Stream::new(WhiteNoise::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_range() {
        let mut noise = WhiteNoise::new();
        // Generate many samples and verify all are in [-1.0, 1.0]
        for _ in 0..10000 {
            let sample = noise.next_sample().unwrap();
            assert!(sample.re >= -1.0 && sample.re <= 1.0);
            assert_eq!(sample.im, 0.0);
        }
    }

    #[test]
    fn test_randomness() {
        let samples = white_noise().drain_n(100).unwrap();
        let first = samples[0];
        let all_same = samples.iter().all(|&s| s == first);
        assert!(!all_same, "White noise should produce varying samples");
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let mut a = WhiteNoise::with_rng(StdRng::seed_from_u64(7));
        let mut b = WhiteNoise::with_rng(StdRng::seed_from_u64(7));
        for _ in 0..16 {
            assert_eq!(a.next_sample().unwrap(), b.next_sample().unwrap());
        }
    }

    #[test]
    fn test_process_buffer() {
        let mut noise = WhiteNoise::new();
        let mut buffer = vec![Sample::default(); 128];
        assert_eq!(noise.process(&mut buffer).unwrap(), 128);

        // Verify all samples are valid
        for sample in buffer {
            assert!(sample.re >= -1.0 && sample.re <= 1.0);
        }
    }
}
