//! Error taxonomy for canonical record emission.

use thiserror::Error;
use yfin_model::{currency::CurrencyError, scaled::ScaledError};

/// Errors raised while turning a raw, extractor-produced DTO into a
/// [`yfin_model::CanonicalRecord`].
#[derive(Debug, Error)]
pub enum EmitError {
    /// A period's end preceded its start.
    #[error("invalid period for key '{key}': start {start} is after end {end}")]
    InvalidPeriod {
        /// The fundamentals key this period belongs to.
        key: String,
        /// The offending start timestamp, formatted for display.
        start: String,
        /// The offending end timestamp, formatted for display.
        end: String,
    },
    /// Two period lines for the same key had overlapping ranges, and strict
    /// mode treats that as fatal rather than a warning.
    #[error("overlapping periods for key '{0}'")]
    OverlappingPeriod(String),
    /// The currency string could not be normalized to a 3-letter ISO code.
    #[error(transparent)]
    Currency(#[from] CurrencyError),
    /// A raw floating-point value could not be represented at the configured scale.
    #[error(transparent)]
    Scale(#[from] ScaledError),
    /// The emitter was given no data to emit (e.g. an empty bar series).
    #[error("nothing to emit")]
    Empty,
}
