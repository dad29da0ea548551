//! Elementwise binary operators.
//!
//! Every arithmetic or comparison operator a stream supports is one variant of
//! [`BinaryOp`], so stream arithmetic is a single zip combinator driven by this
//! closed set rather than one combinator type per operator.

use crate::error::ComputationError;
use crate::signals::Sample;

/// The binary operators that can be applied sample by sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    /// Conventional symbol, used in logs and messages.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        }
    }

    /// Applies the operator to one pair of samples.
    ///
    /// Comparisons yield `1.0` for true and `0.0` for false. Ordering
    /// comparisons are only defined for real samples.
    ///
    /// # Examples
    ///
    /// ```
    /// use lazydsp::{BinaryOp, Sample};
    ///
    /// let three = Sample::new(3.0, 0.0);
    /// let two = Sample::new(2.0, 0.0);
    /// assert_eq!(BinaryOp::Pow.apply(three, two).unwrap().re, 9.0);
    /// assert_eq!(BinaryOp::Gt.apply(three, two).unwrap().re, 1.0);
    /// assert!(BinaryOp::Div.apply(three, Sample::new(0.0, 0.0)).is_err());
    /// ```
    pub fn apply(self, a: Sample, b: Sample) -> Result<Sample, ComputationError> {
        match self {
            BinaryOp::Add => Ok(a + b),
            BinaryOp::Sub => Ok(a - b),
            BinaryOp::Mul => Ok(a * b),
            BinaryOp::Div => {
                if is_zero(b) {
                    Err(ComputationError::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            }
            BinaryOp::Pow => pow(a, b),
            BinaryOp::Lt => ordered(a, b).map(|(x, y)| truth(x < y)),
            BinaryOp::Le => ordered(a, b).map(|(x, y)| truth(x <= y)),
            BinaryOp::Gt => ordered(a, b).map(|(x, y)| truth(x > y)),
            BinaryOp::Ge => ordered(a, b).map(|(x, y)| truth(x >= y)),
            BinaryOp::Eq => Ok(truth(a == b)),
            BinaryOp::Ne => Ok(truth(a != b)),
        }
    }
}

fn is_zero(value: Sample) -> bool {
    value.re == 0.0 && value.im == 0.0
}

fn truth(value: bool) -> Sample {
    Sample::new(if value { 1.0 } else { 0.0 }, 0.0)
}

/// Extracts the real parts of two samples that must both be real.
pub(crate) fn ordered(a: Sample, b: Sample) -> Result<(f64, f64), ComputationError> {
    Ok((real(a)?, real(b)?))
}

/// Real part of a sample that must have no imaginary component.
pub(crate) fn real(value: Sample) -> Result<f64, ComputationError> {
    if value.im != 0.0 {
        return Err(ComputationError::Unordered(value.to_string()));
    }
    Ok(value.re)
}

fn pow(base: Sample, exponent: Sample) -> Result<Sample, ComputationError> {
    if is_zero(base) {
        // 0^0 is 1, 0^x vanishes for a positive real part, anything else divides by zero
        return if is_zero(exponent) {
            Ok(Sample::new(1.0, 0.0))
        } else if exponent.re > 0.0 {
            Ok(Sample::new(0.0, 0.0))
        } else {
            Err(ComputationError::DivisionByZero)
        };
    }

    if exponent.im != 0.0 {
        return Ok(base.powc(exponent));
    }

    let e = exponent.re;
    let integral = e.fract() == 0.0 && e.abs() <= i32::MAX as f64;

    if base.im == 0.0 && (base.re > 0.0 || integral) {
        // Stay on the real line so 2^3 is exactly 8
        Ok(Sample::new(base.re.powf(e), 0.0))
    } else if integral {
        Ok(base.powi(e as i32))
    } else {
        Ok(base.powf(e))
    }
}
