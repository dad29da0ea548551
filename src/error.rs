//! Error types for stream evaluation, filter algebra and analysis.
//!
//! Every fallible operation in the crate returns [`Result`]. The end of a
//! stream is reported through the same channel as faults, as
//! [`Error::EndOfSequence`], so that a pull has exactly one return path;
//! use [`Error::is_end_of_sequence`] to tell the two apart.

use thiserror::Error;

/// Arithmetic faults raised while a stream is being evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    /// An elementwise division or negative power hit a zero sample.
    #[error("division by zero")]
    DivisionByZero,

    /// An ordering comparison was asked of a sample with an imaginary part.
    #[error("ordering is undefined for complex sample {0}")]
    Unordered(String),

    /// A sample was NaN or infinite where a finite value was required.
    #[error("non-finite sample {0}")]
    NonFinite(String),

    /// The producer behind a source failed.
    #[error("producer failed: {0}")]
    Producer(String),
}

/// Errors that can occur anywhere in the crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The stream is exhausted. This is a control-flow signal, not a fault.
    #[error("end of sequence")]
    EndOfSequence,

    /// An arithmetic fault inside a combinator or producer.
    #[error("computation error: {0}")]
    Computation(#[from] ComputationError),

    /// Division by the zero polynomial in the delay-operator algebra.
    #[error("singular expression: division by the zero polynomial")]
    SingularExpression,

    /// The current output of the filter would depend on itself.
    #[error("improper filter: lag-0 denominator coefficient is {lag0}")]
    ImproperFilter { lag0: String },

    /// A filter memory does not fit the filter it was handed to.
    #[error("invalid filter state: {what} has {got} entries, filter keeps {expected}")]
    InvalidState {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// An argument was outside the range the operation accepts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A transfer-function literal could not be parsed.
    #[error("parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    /// The eigenvalue solver did not converge.
    #[error("root finding failed for a degree {degree} polynomial")]
    RootFinding { degree: usize },
}

impl Error {
    /// Returns true if this is the end-of-sequence signal rather than a fault.
    pub fn is_end_of_sequence(&self) -> bool {
        matches!(self, Error::EndOfSequence)
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
