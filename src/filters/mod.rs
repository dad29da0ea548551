//! Filter algebra and compilation.
//!
//! Filters are built symbolically as [`RationalExpr`] values, rational
//! functions of the one-sample delay, and compiled into [`CompiledFilter`]s
//! that run over streams.
//!
//! # Examples
//!
//! ```
//! use lazydsp::filters::RationalExpr;
//!
//! let d = RationalExpr::delay();
//! let difference = (1 - d).compile().unwrap();
//! let out = difference.apply(vec![1.0, 3.0, 6.0]).drain_real().unwrap();
//! assert_eq!(out, vec![1.0, 2.0, 3.0]);
//! ```

mod compiled;
mod parse;
mod poly;
mod rational;

pub use compiled::{CompiledFilter, FilterState, FilterTap};
pub use parse::parse_expr;
pub use poly::Polynomial;
pub(crate) use poly::horner;
pub use rational::RationalExpr;

/// Compiles an expression into a runnable filter.
pub fn compile(expr: &RationalExpr) -> crate::Result<CompiledFilter> {
    CompiledFilter::compile(expr)
}
