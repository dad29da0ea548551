//! Filter and signal analysis.
//!
//! Static analysis (poles, zeros, stability, frequency response) works on
//! [`CompiledFilter`](crate::filters::CompiledFilter)s. The lazy analysis
//! functions take a stream and return another one.

mod lazy;
mod response;
mod roots;

pub use lazy::{Envelope, amdf, clip, envelope, maverage, unwrap, zcross};
pub use response::{
    Stability, frequency_response, frequency_response_grid, is_stable, measured_gain, poles,
    stability, zeros,
};
pub use roots::{Root, find_roots};
