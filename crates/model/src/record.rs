//! Canonical record shapes produced by the emitter and consumed by the publisher.
//!
//! Defining the full canonical schema is an externally-owned concern; this is a
//! minimal, explicitly-labeled representation that exercises every normalization
//! invariant the emitter enforces, standing in for that external schema crate the
//! same way an adapter in this workspace depends on the domain-model crate
//! without re-deriving it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{currency::Currency, mic::Mic, scaled::Scaled};

/// A tradable security identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Security {
    /// The raw ticker symbol, uppercased.
    pub symbol: String,
    /// Market Identifier Code, empty when unknown.
    pub mic: Mic,
}

impl Security {
    /// Builds a [`Security`] normalizing the symbol to uppercase.
    #[must_use]
    pub fn new(symbol: impl Into<String>, mic: Mic) -> Self {
        Self { symbol: symbol.into().to_ascii_uppercase(), mic }
    }

    /// The stable partition key `MIC.SYMBOL` used for publish ordering.
    #[must_use]
    pub fn partition_key(&self) -> String {
        if self.mic.is_empty() {
            self.symbol.clone()
        } else {
            format!("{}.{}", self.mic, self.symbol)
        }
    }
}

/// Metadata stamped onto every canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Identifies the scrape run that produced this record.
    pub run_id: String,
    /// The upstream data provider, e.g. `"yahoo_finance"`.
    pub source: String,
    /// The producing component, e.g. `"yfin-emitter"`.
    pub producer: String,
    /// The canonical schema version this record conforms to.
    pub schema_version: u32,
}

/// A single normalized financial line item within a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLine {
    /// The normalized field key (lowercase, underscore-separated, synonym-mapped).
    pub key: String,
    /// The exact value.
    pub value: Scaled,
    /// Reporting currency, empty when not applicable.
    pub currency: Currency,
    /// Inclusive period start, UTC.
    pub period_start: DateTime<Utc>,
    /// Inclusive period end, UTC.
    pub period_end: DateTime<Utc>,
}

/// A single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open timestamp, UTC.
    pub event_time: DateTime<Utc>,
    /// Opening price.
    pub open: Scaled,
    /// High price.
    pub high: Scaled,
    /// Low price.
    pub low: Scaled,
    /// Closing price.
    pub close: Scaled,
    /// Traded volume.
    pub volume: Scaled,
}

/// A point-in-time quote snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    /// Last traded price.
    pub last_price: Scaled,
    /// Reporting currency.
    pub currency: Currency,
    /// Timestamp the quote was observed, UTC.
    pub as_of: DateTime<Utc>,
}

/// A single news headline reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Headline text.
    pub title: String,
    /// Canonical source URL.
    pub url: String,
    /// Publication timestamp, UTC.
    pub published_at: DateTime<Utc>,
}

/// A company/issuer profile snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name of the issuer.
    pub long_name: String,
    /// Industry sector classification, if available.
    pub sector: Option<String>,
    /// Free-text business summary.
    pub summary: Option<String>,
}

/// The tagged union of all canonical record kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanonicalRecord {
    /// One or more OHLCV bars for a security.
    Bars {
        /// The security the bars belong to.
        security: Security,
        /// Bars sorted ascending by `event_time`.
        bars: Vec<Bar>,
        /// Record metadata.
        meta: Meta,
    },
    /// A single quote snapshot.
    Quote {
        /// The security the quote belongs to.
        security: Security,
        /// The snapshot.
        quote: QuoteSnapshot,
        /// Record metadata.
        meta: Meta,
    },
    /// A fundamentals snapshot, one or more normalized line items.
    FundamentalsSnapshot {
        /// The security the fundamentals belong to.
        security: Security,
        /// Normalized line items.
        lines: Vec<PeriodLine>,
        /// Record metadata.
        meta: Meta,
    },
    /// A single news item.
    News {
        /// The security the news item references.
        security: Security,
        /// The news item.
        item: NewsItem,
        /// Record metadata.
        meta: Meta,
    },
    /// A company profile snapshot.
    Profile {
        /// The security the profile belongs to.
        security: Security,
        /// The profile.
        profile: Profile,
        /// Record metadata.
        meta: Meta,
    },
}

impl CanonicalRecord {
    /// The partition key this record publishes under.
    #[must_use]
    pub fn partition_key(&self) -> String {
        match self {
            Self::Bars { security, .. }
            | Self::Quote { security, .. }
            | Self::FundamentalsSnapshot { security, .. }
            | Self::News { security, .. }
            | Self::Profile { security, .. } => security.partition_key(),
        }
    }

    /// The record metadata.
    #[must_use]
    pub fn meta(&self) -> &Meta {
        match self {
            Self::Bars { meta, .. }
            | Self::Quote { meta, .. }
            | Self::FundamentalsSnapshot { meta, .. }
            | Self::News { meta, .. }
            | Self::Profile { meta, .. } => meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_key_uses_mic_and_symbol() {
        let s = Security::new("aapl", Mic::normalize("NASDAQ"));
        assert_eq!(s.partition_key(), "XNAS.AAPL");
    }

    #[test]
    fn partition_key_falls_back_to_symbol_when_mic_empty() {
        let s = Security::new("aapl", Mic::empty());
        assert_eq!(s.partition_key(), "AAPL");
    }
}
