//! lazydsp - Lazy signal processing for Rust
//!
//! This library provides pull-based sample streams, an algebra of rational
//! functions in the delay operator for building filters, and tools to
//! analyse those filters.

pub mod analysis;
pub mod combinators;
pub mod error;
pub mod filters;
pub mod signals;
pub mod sources;
pub mod tolerance;

// Re-export commonly used types at the crate root
pub use error::{ComputationError, Error, Result};
pub use filters::{CompiledFilter, FilterState, FilterTap, Polynomial, RationalExpr};
pub use signals::{BinaryOp, IntoStream, Length, Sample, Signal, Stream};
pub use tolerance::Tolerance;

#[cfg(feature = "macros")]
pub use lazydsp_macros::tf;
