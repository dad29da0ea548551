//! Transfer-function literals.
//!
//! Parses the notation [`RationalExpr`] prints, so a filter can be written as
//! text:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('^' exponent)?
//! exponent:= ['-' | '+'] integer | '(' ['-' | '+'] integer ')'
//! primary := number ['j'] | 'z' | '(' expr ')'
//! ```
//!
//! `z` is the z-transform variable, so `z^-1` is the one-sample delay.

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::filters::RationalExpr;
use crate::signals::Sample;

/// Parses a transfer function such as `"(1 - 0.5*z^-1) / (1 + 0.3*z^-1)"`.
///
/// # Examples
///
/// ```
/// use lazydsp::filters::{RationalExpr, parse_expr};
///
/// let parsed = parse_expr("1 / (1 - 0.5*z^-1)").unwrap();
/// assert_eq!(parsed, RationalExpr::from_denominator([1.0, -0.5]).unwrap());
/// ```
pub fn parse_expr(input: &str) -> Result<RationalExpr> {
    let mut parser = Parser { input, pos: 0 };
    let expr = parser.expr()?;
    parser.skip_whitespace();
    if parser.pos < input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

impl FromStr for RationalExpr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_expr(s)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    /// Consumes `c` if it is the next non-blank byte.
    fn eat(&mut self, c: u8) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<RationalExpr> {
        let mut acc = self.term()?;
        loop {
            if self.eat(b'+') {
                acc = acc + self.term()?;
            } else if self.eat(b'-') {
                acc = acc - self.term()?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn term(&mut self) -> Result<RationalExpr> {
        let mut acc = self.unary()?;
        loop {
            if self.eat(b'*') {
                acc = acc * self.unary()?;
            } else if self.eat(b'/') {
                acc = (acc / self.unary()?)?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn unary(&mut self) -> Result<RationalExpr> {
        if self.eat(b'-') {
            Ok(-self.unary()?)
        } else if self.eat(b'+') {
            self.unary()
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> Result<RationalExpr> {
        let base = self.primary()?;
        if !self.eat(b'^') {
            return Ok(base);
        }
        let exponent = if self.eat(b'(') {
            let exponent = self.integer()?;
            if !self.eat(b')') {
                return Err(self.error("expected ')' after exponent"));
            }
            exponent
        } else {
            self.integer()?
        };
        base.powi(exponent)
    }

    fn integer(&mut self) -> Result<i32> {
        self.skip_whitespace();
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let digits = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits {
            return Err(self.error("expected an integer exponent"));
        }
        match self.input[start..self.pos].parse() {
            Ok(exponent) => Ok(exponent),
            Err(_) => Err(Error::Parse {
                position: start,
                message: "exponent out of range".to_string(),
            }),
        }
    }

    fn primary(&mut self) -> Result<RationalExpr> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let inner = self.expr()?;
                if !self.eat(b')') {
                    return Err(self.error("expected ')'"));
                }
                Ok(inner)
            }
            Some(b'z') => {
                self.pos += 1;
                Ok(RationalExpr::z())
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(_) => Err(self.error("expected a number, 'z' or '('")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn number(&mut self) -> Result<RationalExpr> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == b'.') {
            self.pos += 1;
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'-' | b'+')) {
                self.pos += 1;
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let literal = &self.input[start..self.pos];
        let value = match literal.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            Ok(_) => {
                return Err(Error::Parse {
                    position: start,
                    message: format!("number '{literal}' overflows"),
                });
            }
            Err(_) => {
                return Err(Error::Parse {
                    position: start,
                    message: format!("invalid number '{literal}'"),
                });
            }
        };
        if self.peek() == Some(b'j') {
            self.pos += 1;
            Ok(RationalExpr::constant(Sample::new(0.0, value)))
        } else {
            Ok(RationalExpr::constant(value))
        }
    }
}
