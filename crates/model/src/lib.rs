//! Canonical domain model: exact scaled-decimal values, currency and market
//! identifier normalization, and the canonical record shapes the emitter
//! produces and the publisher serializes.

pub mod currency;
pub mod mic;
pub mod record;
pub mod scaled;

pub use currency::{Currency, CurrencyError};
pub use mic::Mic;
pub use record::{Bar, CanonicalRecord, Meta, NewsItem, PeriodLine, Profile, QuoteSnapshot, Security};
pub use scaled::{Scaled, ScaledError};
