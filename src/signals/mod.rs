//! Signal processing types and traits.
//!
//! This module provides the core stream abstractions used throughout
//! the library, including:
//! - `Signal` trait for all sample producers and processors
//! - `Sample` and `Length`, the value and size vocabulary of every signal
//! - `BinaryOp`, the closed set of elementwise operators
//! - `Stream`, the boxed, operator-overloaded sequence users hold
//! - the tee hub that lets a stream be copied

mod core;
mod ops;
mod stream;
mod tee;

pub use self::core::{Length, Sample, Signal};
pub use self::ops::BinaryOp;
pub(crate) use self::ops::real;
pub use self::stream::{IntoStream, Stream};
