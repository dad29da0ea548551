//! Rational functions of the delay operator.
//!
//! A [`RationalExpr`] is the symbolic form of a linear time-invariant filter:
//! one numerator and one denominator polynomial in the delay variable. Every
//! arithmetic operation cross-multiplies into a single ratio and normalizes
//! it, so expressions never nest.

use std::f64::consts::TAU;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::error::{Error, Result};
use crate::filters::{CompiledFilter, Polynomial};
use crate::signals::Sample;
use crate::tolerance::Tolerance;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A ratio of two polynomials in the delay variable.
///
/// The denominator is never the zero polynomial.
///
/// # Examples
///
/// ```
/// use lazydsp::filters::RationalExpr;
///
/// let d = RationalExpr::delay();
/// // One-pole smoother
/// let smoother = (0.5 / (1.0 - 0.5 * d)).unwrap();
/// assert_eq!(smoother.to_string(), "(0.5) / (1 - 0.5*z^-1)");
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "RationalParts", into = "RationalParts")
)]
pub struct RationalExpr {
    num: Polynomial,
    den: Polynomial,
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct RationalParts {
    numerator: Polynomial,
    denominator: Polynomial,
}

#[cfg(feature = "serde")]
impl TryFrom<RationalParts> for RationalExpr {
    type Error = Error;

    fn try_from(parts: RationalParts) -> Result<Self> {
        RationalExpr::new(parts.numerator, parts.denominator)
    }
}

#[cfg(feature = "serde")]
impl From<RationalExpr> for RationalParts {
    fn from(expr: RationalExpr) -> Self {
        RationalParts {
            numerator: expr.num,
            denominator: expr.den,
        }
    }
}

impl RationalExpr {
    /// Creates `num / den`. Fails if `den` is the zero polynomial.
    pub fn new(num: Polynomial, den: Polynomial) -> Result<Self> {
        if den.is_zero() {
            return Err(Error::SingularExpression);
        }
        Ok(Self::normalized(num, den))
    }

    /// Creates `num / den` from coefficient lists in ascending delay powers.
    pub fn from_coeffs<N, D, T, U>(num: N, den: D) -> Result<Self>
    where
        N: IntoIterator<Item = T>,
        D: IntoIterator<Item = U>,
        T: Into<Sample>,
        U: Into<Sample>,
    {
        Self::new(Polynomial::new(num), Polynomial::new(den))
    }

    /// A pure feedforward expression with denominator 1.
    pub fn from_numerator<I, T>(coeffs: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Sample>,
    {
        Self::from_nonzero(Polynomial::new(coeffs), Polynomial::one())
    }

    /// `1 / poly`. Fails on the zero polynomial.
    pub fn from_denominator<I, T>(coeffs: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Sample>,
    {
        Self::new(Polynomial::one(), Polynomial::new(coeffs))
    }

    /// A constant gain.
    pub fn constant(value: impl Into<Sample>) -> Self {
        Self::from_nonzero(Polynomial::constant(value), Polynomial::one())
    }

    /// The one-sample delay, `z^-1`.
    pub fn delay() -> Self {
        Self::from_nonzero(Polynomial::monomial(1, 1.0), Polynomial::one())
    }

    /// The z-transform variable, `1 / delay`. Not causal on its own.
    pub fn z() -> Self {
        Self::from_nonzero(Polynomial::one(), Polynomial::monomial(1, 1.0))
    }

    /// Builds from a denominator already known to be nonzero.
    pub(crate) fn from_nonzero(num: Polynomial, den: Polynomial) -> Self {
        Self::normalized(num, den)
    }

    fn normalized(num: Polynomial, den: Polynomial) -> Self {
        if num.is_zero() {
            return Self {
                num,
                den: Polynomial::one(),
            };
        }

        let shift = match (num.lowest_power(), den.lowest_power()) {
            (Some(n), Some(d)) => n.min(d),
            _ => 0,
        };
        let (mut num, mut den) = if shift > 0 {
            (num.shift_down(shift), den.shift_down(shift))
        } else {
            (num, den)
        };

        let reducible = num.degree().is_some_and(|d| d >= 1)
            && den.degree().is_some_and(|d| d >= 1)
            && num.is_integral()
            && den.is_integral();
        if reducible {
            if let Some((reduced_num, reduced_den)) = cancel_common_factor(&num, &den) {
                tracing::debug!(
                    before = ?(num.degree(), den.degree()),
                    after = ?(reduced_num.degree(), reduced_den.degree()),
                    "cancelled common factor"
                );
                num = reduced_num;
                den = reduced_den;
            }
        }

        Self { num, den }
    }

    pub fn numerator(&self) -> &Polynomial {
        &self.num
    }

    pub fn denominator(&self) -> &Polynomial {
        &self.den
    }

    /// True for the zero expression.
    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    /// True if the current output does not depend on itself, i.e. the
    /// denominator has a nonzero lag-0 coefficient.
    pub fn is_causal(&self) -> bool {
        self.den
            .coeffs()
            .first()
            .is_some_and(|c| c.re != 0.0 || c.im != 0.0)
    }

    /// Raises the expression to a non-negative power.
    pub fn pow(&self, exponent: u32) -> RationalExpr {
        Self::from_nonzero(self.num.pow(exponent), self.den.pow(exponent))
    }

    /// Raises the expression to an integer power; negative powers invert.
    pub fn powi(&self, exponent: i32) -> Result<RationalExpr> {
        if exponent >= 0 {
            Ok(self.pow(exponent.unsigned_abs()))
        } else {
            Ok(self.recip()?.pow(exponent.unsigned_abs()))
        }
    }

    /// `1 / self`. Fails for the zero expression.
    pub fn recip(&self) -> Result<RationalExpr> {
        Self::new(self.den.clone(), self.num.clone())
    }

    /// `self / other`. Fails if `other` is the zero expression.
    pub fn checked_div(&self, other: &RationalExpr) -> Result<RationalExpr> {
        if other.is_zero() {
            return Err(Error::SingularExpression);
        }
        Ok(Self::from_nonzero(&self.num * &other.den, &self.den * &other.num))
    }

    /// Equality up to `tol`, by cross-multiplication.
    ///
    /// `n1·d2` and `n2·d1` are compared coefficient by coefficient relative to
    /// their largest coefficient, so unreduced forms of the same function
    /// compare equal.
    pub fn approx_eq(&self, other: &RationalExpr, tol: &Tolerance) -> bool {
        let left = &self.num * &other.den;
        let right = &other.num * &self.den;
        let scale = left.max_norm().max(right.max_norm());
        let zero = Sample::new(0.0, 0.0);
        let len = left.coeffs().len().max(right.coeffs().len());
        (0..len).all(|i| {
            let a = left.coeffs().get(i).copied().unwrap_or(zero);
            let b = right.coeffs().get(i).copied().unwrap_or(zero);
            tol.approx_eq(a, b, scale)
        })
    }

    /// Substitutes `d` for the delay variable.
    pub fn eval_delay(&self, d: impl Into<Sample>) -> Sample {
        let d = d.into();
        self.num.eval(d) / self.den.eval(d)
    }

    /// Substitutes `z` for the z-transform variable (`delay = 1/z`).
    pub fn eval_z(&self, z: impl Into<Sample>) -> Sample {
        self.eval_delay(Sample::new(1.0, 0.0) / z.into())
    }

    /// Response at `freq` cycles per sample, `H(e^{i·2π·freq})`.
    pub fn frequency_response(&self, freq: f64) -> Sample {
        self.eval_delay(Sample::from_polar(1.0, -TAU * freq))
    }

    /// Compiles the expression into a runnable filter.
    pub fn compile(&self) -> Result<CompiledFilter> {
        CompiledFilter::compile(self)
    }
}

/// Divides out the polynomial GCD when it divides both sides exactly.
fn cancel_common_factor(num: &Polynomial, den: &Polynomial) -> Option<(Polynomial, Polynomial)> {
    let tol = Tolerance::default();
    let common = num.gcd(den, &tol)?;
    let (reduced_num, num_rem) = num.div_rem(&common).ok()?;
    let (reduced_den, den_rem) = den.div_rem(&common).ok()?;
    let scale = num.max_norm().max(den.max_norm());
    if !num_rem.chop(&tol, scale).is_zero() || !den_rem.chop(&tol, scale).is_zero() {
        tracing::trace!("common factor does not divide exactly, keeping unreduced form");
        return None;
    }
    let reduced_den = reduced_den.chop(&tol, scale);
    // The quotient carries the GCD's scale; bring the lowest-lag denominator term to 1
    let lead = reduced_den
        .coeffs()
        .iter()
        .copied()
        .find(|c| c.re != 0.0 || c.im != 0.0)?;
    let unit = Sample::new(1.0, 0.0) / lead;
    Some((
        reduced_num.chop(&tol, scale).scale(unit),
        reduced_den.scale(unit),
    ))
}

impl PartialEq for RationalExpr {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(other, &Tolerance::default())
    }
}

impl fmt::Display for RationalExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == Polynomial::one() {
            return self.num.fmt_delay(f);
        }
        write!(f, "(")?;
        self.num.fmt_delay(f)?;
        write!(f, ") / (")?;
        self.den.fmt_delay(f)?;
        write!(f, ")")
    }
}

impl From<Sample> for RationalExpr {
    fn from(value: Sample) -> Self {
        Self::constant(value)
    }
}

impl From<f64> for RationalExpr {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl From<i32> for RationalExpr {
    fn from(value: i32) -> Self {
        Self::constant(f64::from(value))
    }
}

impl From<Polynomial> for RationalExpr {
    fn from(num: Polynomial) -> Self {
        Self::from_nonzero(num, Polynomial::one())
    }
}

impl From<&RationalExpr> for RationalExpr {
    fn from(expr: &RationalExpr) -> Self {
        expr.clone()
    }
}

impl<T: Into<RationalExpr>> Add<T> for RationalExpr {
    type Output = RationalExpr;

    fn add(self, rhs: T) -> RationalExpr {
        let rhs = rhs.into();
        RationalExpr::from_nonzero(
            &(&self.num * &rhs.den) + &(&rhs.num * &self.den),
            &self.den * &rhs.den,
        )
    }
}

impl<T: Into<RationalExpr>> Sub<T> for RationalExpr {
    type Output = RationalExpr;

    fn sub(self, rhs: T) -> RationalExpr {
        self + (-rhs.into())
    }
}

impl<T: Into<RationalExpr>> Mul<T> for RationalExpr {
    type Output = RationalExpr;

    fn mul(self, rhs: T) -> RationalExpr {
        let rhs = rhs.into();
        RationalExpr::from_nonzero(&self.num * &rhs.num, &self.den * &rhs.den)
    }
}

impl<T: Into<RationalExpr>> Div<T> for RationalExpr {
    type Output = Result<RationalExpr>;

    fn div(self, rhs: T) -> Result<RationalExpr> {
        self.checked_div(&rhs.into())
    }
}

impl Neg for RationalExpr {
    type Output = RationalExpr;

    fn neg(self) -> RationalExpr {
        RationalExpr {
            num: -self.num,
            den: self.den,
        }
    }
}

impl Neg for &RationalExpr {
    type Output = RationalExpr;

    fn neg(self) -> RationalExpr {
        -self.clone()
    }
}

macro_rules! impl_ref_op {
    ($trait:ident, $method:ident, $output:ty) => {
        impl $trait<&RationalExpr> for &RationalExpr {
            type Output = $output;

            fn $method(self, rhs: &RationalExpr) -> $output {
                self.clone().$method(rhs)
            }
        }
    };
}

impl_ref_op!(Add, add, RationalExpr);
impl_ref_op!(Sub, sub, RationalExpr);
impl_ref_op!(Mul, mul, RationalExpr);
impl_ref_op!(Div, div, Result<RationalExpr>);

macro_rules! impl_scalar_lhs {
    ($($scalar:ty),+) => {
        $(
            impl Add<RationalExpr> for $scalar {
                type Output = RationalExpr;

                fn add(self, rhs: RationalExpr) -> RationalExpr {
                    RationalExpr::from(self) + rhs
                }
            }

            impl Sub<RationalExpr> for $scalar {
                type Output = RationalExpr;

                fn sub(self, rhs: RationalExpr) -> RationalExpr {
                    RationalExpr::from(self) - rhs
                }
            }

            impl Mul<RationalExpr> for $scalar {
                type Output = RationalExpr;

                fn mul(self, rhs: RationalExpr) -> RationalExpr {
                    RationalExpr::from(self) * rhs
                }
            }

            impl Div<RationalExpr> for $scalar {
                type Output = Result<RationalExpr>;

                fn div(self, rhs: RationalExpr) -> Result<RationalExpr> {
                    RationalExpr::from(self) / rhs
                }
            }
        )+
    };
}

impl_scalar_lhs!(f64, i32, Sample);
