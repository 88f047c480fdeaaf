//! Output recovery: normalization and type coercion of generated text

pub mod coercer;
pub mod normalizer;

pub use coercer::{coerce, CoerceError};
pub use normalizer::{normalize, normalize_language_output, NormalizeContext};
