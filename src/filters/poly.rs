//! Polynomials in the delay variable.
//!
//! Coefficient `i` multiplies the `i`-th power of the one-sample delay, so
//! `[1, -0.5]` is `1 - 0.5·z^-1`. Trailing zero coefficients are always
//! trimmed and the zero polynomial has no coefficients at all.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::error::{Error, Result};
use crate::signals::Sample;
use crate::tolerance::Tolerance;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A polynomial with complex coefficients in ascending powers of the delay.
///
/// # Examples
///
/// ```
/// use lazydsp::filters::Polynomial;
///
/// let p = Polynomial::new([1.0, 2.0, 0.0]);
/// assert_eq!(p.degree(), Some(1));
/// assert_eq!((&p * &p).coeffs().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<Sample>", into = "Vec<Sample>"))]
pub struct Polynomial {
    coeffs: Vec<Sample>,
}

impl Polynomial {
    /// Creates a polynomial from coefficients in ascending powers.
    pub fn new<I, T>(coeffs: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Sample>,
    {
        Self::from_vec(coeffs.into_iter().map(Into::into).collect())
    }

    pub(crate) fn from_vec(mut coeffs: Vec<Sample>) -> Self {
        while coeffs.last().is_some_and(|c| c.re == 0.0 && c.im == 0.0) {
            coeffs.pop();
        }
        Self { coeffs }
    }

    /// The zero polynomial.
    pub fn zero() -> Self {
        Self { coeffs: Vec::new() }
    }

    /// The constant polynomial 1.
    pub fn one() -> Self {
        Self::constant(Sample::new(1.0, 0.0))
    }

    /// A constant polynomial.
    pub fn constant(value: impl Into<Sample>) -> Self {
        Self::from_vec(vec![value.into()])
    }

    /// `coeff` times the `power`-th power of the delay.
    pub fn monomial(power: usize, coeff: impl Into<Sample>) -> Self {
        let mut coeffs = vec![Sample::new(0.0, 0.0); power + 1];
        coeffs[power] = coeff.into();
        Self::from_vec(coeffs)
    }

    /// Coefficients in ascending powers, without trailing zeros.
    pub fn coeffs(&self) -> &[Sample] {
        &self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Highest power with a nonzero coefficient, `None` for zero.
    pub fn degree(&self) -> Option<usize> {
        self.coeffs.len().checked_sub(1)
    }

    /// Lowest power with a nonzero coefficient, `None` for zero.
    pub fn lowest_power(&self) -> Option<usize> {
        self.coeffs.iter().position(|c| c.re != 0.0 || c.im != 0.0)
    }

    /// Evaluates the polynomial at `x` (Horner's rule).
    pub fn eval(&self, x: Sample) -> Sample {
        horner(&self.coeffs, x)
    }

    /// Multiplies every coefficient by `factor`.
    pub fn scale(&self, factor: impl Into<Sample>) -> Polynomial {
        let factor = factor.into();
        Self::from_vec(self.coeffs.iter().map(|&c| c * factor).collect())
    }

    /// Divides by `delay^k`, dropping the `k` lowest coefficients.
    ///
    /// Only meaningful when those coefficients are zero.
    pub fn shift_down(&self, k: usize) -> Polynomial {
        Self::from_vec(self.coeffs.iter().skip(k).copied().collect())
    }

    /// Multiplies by `delay^k`.
    pub fn shift_up(&self, k: usize) -> Polynomial {
        if self.is_zero() {
            return Self::zero();
        }
        let mut coeffs = vec![Sample::new(0.0, 0.0); k];
        coeffs.extend_from_slice(&self.coeffs);
        Self { coeffs }
    }

    /// Raises the polynomial to a non-negative integer power.
    pub fn pow(&self, exponent: u32) -> Polynomial {
        let mut result = Self::one();
        let mut base = self.clone();
        let mut e = exponent;
        while e > 0 {
            if e & 1 == 1 {
                result = &result * &base;
            }
            e >>= 1;
            if e > 0 {
                base = &base * &base;
            }
        }
        result
    }

    /// Long division, returning `(quotient, remainder)`.
    ///
    /// The remainder has a lower degree than the divisor. Dividing by the
    /// zero polynomial fails with [`Error::SingularExpression`].
    pub fn div_rem(&self, divisor: &Polynomial) -> Result<(Polynomial, Polynomial)> {
        let Some(dd) = divisor.degree() else {
            return Err(Error::SingularExpression);
        };
        if self.coeffs.len() <= dd {
            return Ok((Self::zero(), self.clone()));
        }
        let lead = divisor.coeffs[dd];
        let mut rem = self.coeffs.clone();
        let mut quot = vec![Sample::new(0.0, 0.0); rem.len() - dd];
        for i in (0..quot.len()).rev() {
            let c = rem[i + dd] / lead;
            quot[i] = c;
            for (j, &dc) in divisor.coeffs.iter().enumerate() {
                rem[i + j] -= c * dc;
            }
        }
        rem.truncate(dd);
        Ok((Self::from_vec(quot), Self::from_vec(rem)))
    }

    /// True if every coefficient is a finite real integer.
    pub fn is_integral(&self) -> bool {
        self.coeffs
            .iter()
            .all(|c| c.im == 0.0 && c.re.is_finite() && c.re.fract() == 0.0)
    }

    /// Largest coefficient magnitude, 0 for the zero polynomial.
    pub fn max_norm(&self) -> f64 {
        self.coeffs.iter().map(|c| c.norm()).fold(0.0, f64::max)
    }

    /// Zeroes the coefficients that are negligible relative to `scale`.
    pub(crate) fn chop(&self, tol: &Tolerance, scale: f64) -> Polynomial {
        Self::from_vec(
            self.coeffs
                .iter()
                .map(|&c| {
                    if tol.is_zero(c, scale) {
                        Sample::new(0.0, 0.0)
                    } else {
                        c
                    }
                })
                .collect(),
        )
    }

    /// Best-effort greatest common divisor by Euclid's algorithm.
    ///
    /// Returns the divisor made monic in its highest power, or `None` when
    /// the polynomials share no factor of degree one or more. Remainders
    /// within tolerance of zero count as zero.
    pub fn gcd(&self, other: &Polynomial, tol: &Tolerance) -> Option<Polynomial> {
        let scale = self.max_norm().max(other.max_norm());
        let (mut a, mut b) = if self.coeffs.len() >= other.coeffs.len() {
            (self.clone(), other.clone())
        } else {
            (other.clone(), self.clone())
        };
        while !b.is_zero() {
            let (_, rem) = a.div_rem(&b).ok()?;
            let rem = rem.chop(tol, scale);
            tracing::trace!(
                dividend = ?a.degree(),
                divisor = ?b.degree(),
                remainder = ?rem.degree(),
                "gcd step"
            );
            a = b;
            b = rem;
        }
        let degree = a.degree()?;
        if degree == 0 {
            return None;
        }
        let lead = a.coeffs[degree];
        Some(Self::from_vec(a.coeffs.iter().map(|&c| c / lead).collect()))
    }

    /// Writes the polynomial in `z^-k` notation, as the numerator or
    /// denominator of a transfer function.
    pub(crate) fn fmt_delay(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (power, &c) in self.coeffs.iter().enumerate() {
            if c.re == 0.0 && c.im == 0.0 {
                continue;
            }
            let (negative, magnitude) = if c.im == 0.0 && c.re < 0.0 {
                (true, -c)
            } else {
                (false, c)
            };
            match (first, negative) {
                (true, true) => write!(f, "-")?,
                (true, false) => {}
                (false, true) => write!(f, " - ")?,
                (false, false) => write!(f, " + ")?,
            }
            first = false;

            let unit = magnitude.im == 0.0 && magnitude.re == 1.0;
            if power == 0 || !unit {
                if magnitude.im == 0.0 {
                    write!(f, "{}", magnitude.re)?;
                } else {
                    write!(f, "({}{:+}j)", magnitude.re, magnitude.im)?;
                }
            }
            if power > 0 {
                if !unit {
                    write!(f, "*")?;
                }
                write!(f, "z^-{power}")?;
            }
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}

/// Evaluates ascending-power coefficients at `x`.
pub(crate) fn horner(coeffs: &[Sample], x: Sample) -> Sample {
    coeffs
        .iter()
        .rev()
        .fold(Sample::new(0.0, 0.0), |acc, &c| acc * x + c)
}

impl From<Vec<Sample>> for Polynomial {
    fn from(coeffs: Vec<Sample>) -> Self {
        Self::from_vec(coeffs)
    }
}

impl From<Polynomial> for Vec<Sample> {
    fn from(poly: Polynomial) -> Self {
        poly.coeffs
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_delay(f)
    }
}

impl Add for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        let len = self.coeffs.len().max(rhs.coeffs.len());
        let zero = Sample::new(0.0, 0.0);
        Polynomial::from_vec(
            (0..len)
                .map(|i| {
                    self.coeffs.get(i).copied().unwrap_or(zero)
                        + rhs.coeffs.get(i).copied().unwrap_or(zero)
                })
                .collect(),
        )
    }
}

impl Sub for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        self + &(-rhs)
    }
}

impl Mul for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        if self.is_zero() || rhs.is_zero() {
            return Polynomial::zero();
        }
        let mut coeffs = vec![Sample::new(0.0, 0.0); self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, &a) in self.coeffs.iter().enumerate() {
            for (j, &b) in rhs.coeffs.iter().enumerate() {
                coeffs[i + j] += a * b;
            }
        }
        Polynomial::from_vec(coeffs)
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        Polynomial {
            coeffs: self.coeffs.iter().map(|&c| -c).collect(),
        }
    }
}

impl Neg for Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        -&self
    }
}

macro_rules! forward_owned_op {
    ($trait:ident, $method:ident) => {
        impl $trait for Polynomial {
            type Output = Polynomial;

            fn $method(self, rhs: Polynomial) -> Polynomial {
                (&self).$method(&rhs)
            }
        }
    };
}

forward_owned_op!(Add, add);
forward_owned_op!(Sub, sub);
forward_owned_op!(Mul, mul);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn re(x: f64) -> Sample {
        Sample::new(x, 0.0)
    }

    #[test]
    fn test_trailing_zeros_trimmed() {
        let p = Polynomial::new([1.0, 0.0, 0.0]);
        assert_eq!(p.coeffs(), &[re(1.0)]);
        assert!(Polynomial::new([0.0, 0.0]).is_zero());
        assert_eq!(Polynomial::zero().degree(), None);
    }

    #[test]
    fn test_arithmetic() {
        let a = Polynomial::new([1.0, 1.0]);
        let b = Polynomial::new([1.0, -1.0]);
        assert_eq!(&a * &b, Polynomial::new([1.0, 0.0, -1.0]));
        assert_eq!(&a + &b, Polynomial::constant(2.0));
        assert!((&a - &a).is_zero());
        assert_eq!(-a.clone(), Polynomial::new([-1.0, -1.0]));
        assert_eq!(a.pow(3), Polynomial::new([1.0, 3.0, 3.0, 1.0]));
        assert_eq!(a.pow(0), Polynomial::one());
    }

    #[test]
    fn test_eval() {
        let p = Polynomial::new([1.0, 2.0, 3.0]);
        assert_eq!(p.eval(re(2.0)), re(17.0));
        assert_eq!(Polynomial::zero().eval(re(2.0)), re(0.0));
    }

    #[test]
    fn test_lowest_power_and_shifts() {
        let p = Polynomial::new([0.0, 0.0, 1.0, 2.0]);
        assert_eq!(p.lowest_power(), Some(2));
        assert_eq!(p.shift_down(2), Polynomial::new([1.0, 2.0]));
        assert_eq!(p.shift_down(2).shift_up(2), p);
        assert_eq!(Polynomial::monomial(2, 5.0).lowest_power(), Some(2));
    }

    #[test]
    fn test_div_rem() {
        // (1 - d^3) / (1 - d) = 1 + d + d^2
        let num = Polynomial::new([1.0, 0.0, 0.0, -1.0]);
        let den = Polynomial::new([1.0, -1.0]);
        let (q, r) = num.div_rem(&den).unwrap();
        assert_eq!(q, Polynomial::new([1.0, 1.0, 1.0]));
        assert!(r.is_zero());

        let short = Polynomial::new([1.0, 2.0]);
        let (q, r) = short.div_rem(&Polynomial::new([0.0, 0.0, 1.0])).unwrap();
        assert!(q.is_zero());
        assert_eq!(r, Polynomial::new([1.0, 2.0]));

        assert_eq!(
            num.div_rem(&Polynomial::zero()),
            Err(Error::SingularExpression)
        );
    }

    #[test]
    fn test_gcd() {
        let tol = Tolerance::default();
        let common = Polynomial::new([1.0, -1.0]);
        let a = &common * &Polynomial::new([2.0, 1.0]);
        let b = &common * &Polynomial::new([3.0, 0.0, 1.0]);
        let g = a.gcd(&b, &tol).unwrap();
        assert_eq!(g.degree(), Some(1));
        // Monic in the highest power: d - 1
        assert_relative_eq!(g.coeffs()[1].re, 1.0);
        assert_relative_eq!(g.coeffs()[0].re, -1.0);

        let coprime = Polynomial::new([1.0, 1.0]).gcd(&Polynomial::new([1.0, -1.0]), &tol);
        assert!(coprime.is_none());
    }

    #[test]
    fn test_is_integral() {
        assert!(Polynomial::new([1.0, -3.0]).is_integral());
        assert!(!Polynomial::new([1.0, 0.5]).is_integral());
        assert!(!Polynomial::new([Sample::new(1.0, 1.0)]).is_integral());
    }

    #[test]
    fn test_display() {
        assert_eq!(Polynomial::new([1.0, -0.5]).to_string(), "1 - 0.5*z^-1");
        assert_eq!(Polynomial::new([0.0, 1.0]).to_string(), "z^-1");
        assert_eq!(Polynomial::new([-2.0, 0.0, 1.0]).to_string(), "-2 + z^-2");
        assert_eq!(
            Polynomial::new([Sample::new(1.0, -2.0)]).to_string(),
            "(1-2j)"
        );
        assert_eq!(Polynomial::zero().to_string(), "0");
    }
}
