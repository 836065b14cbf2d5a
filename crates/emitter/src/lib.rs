//! Turns the raw, unnormalized DTOs produced by `yfin-scrape`'s extractors
//! into canonical records: normalized keys, currencies, market identifiers,
//! and validated period ranges.

pub mod error;
pub mod keys;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use yfin_model::{Bar, CanonicalRecord, Currency, Meta, PeriodLine, QuoteSnapshot, Scaled, Security};
use yfin_scrape::{RawBar, RawFinancialLine, RawQuote};

pub use error::EmitError;

const PRICE_SCALE: u8 = 6;
const VOLUME_SCALE: u8 = 0;

/// Configuration for a [`CanonicalEmitter`].
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// When `true`, overlapping period lines for the same key are a hard
    /// error instead of a logged warning.
    pub strict: bool,
    /// Currency assumed when an extractor could not determine one.
    pub default_currency: String,
    /// Schema version stamped onto every [`Meta`].
    pub schema_version: u32,
    /// Producer identity stamped onto every [`Meta`].
    pub producer: String,
    /// Source identity stamped onto every [`Meta`].
    pub source: String,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            strict: false,
            default_currency: "USD".to_string(),
            schema_version: 1,
            producer: "yfin-emitter".to_string(),
            source: "yahoo-finance".to_string(),
        }
    }
}

/// Normalizes raw extractor DTOs into [`CanonicalRecord`]s.
pub struct CanonicalEmitter {
    config: EmitterConfig,
}

impl CanonicalEmitter {
    /// Builds an emitter from `config`.
    #[must_use]
    pub fn new(config: EmitterConfig) -> Self {
        Self { config }
    }

    fn meta(&self, run_id: impl Into<String>) -> Meta {
        Meta {
            run_id: run_id.into(),
            source: self.config.source.clone(),
            producer: self.config.producer.clone(),
            schema_version: self.config.schema_version,
        }
    }

    fn default_currency(&self) -> Result<Currency, EmitError> {
        Ok(Currency::normalize(&self.config.default_currency)?)
    }

    fn normalize_currency(&self, raw: &str) -> Result<Currency, EmitError> {
        if raw.trim().is_empty() {
            self.default_currency()
        } else {
            Ok(Currency::normalize(raw)?)
        }
    }

    /// Converts a daily bar series into a [`CanonicalRecord::Bars`].
    pub fn emit_bars(&self, security: &Security, raw_bars: Vec<RawBar>, run_id: impl Into<String>) -> Result<CanonicalRecord, EmitError> {
        if raw_bars.is_empty() {
            return Err(EmitError::Empty);
        }
        let mut bars = Vec::with_capacity(raw_bars.len());
        for raw in raw_bars {
            bars.push(Bar {
                event_time: raw.event_time,
                open: Scaled::from_f64(raw.open, PRICE_SCALE)?,
                high: Scaled::from_f64(raw.high, PRICE_SCALE)?,
                low: Scaled::from_f64(raw.low, PRICE_SCALE)?,
                close: Scaled::from_f64(raw.close, PRICE_SCALE)?,
                volume: Scaled::from_f64(raw.volume, VOLUME_SCALE)?,
            });
        }
        Ok(CanonicalRecord::Bars { security: security.clone(), bars, meta: self.meta(run_id) })
    }

    /// Converts a quote snapshot into a [`CanonicalRecord::Quote`].
    pub fn emit_quote(&self, security: &Security, raw: RawQuote, run_id: impl Into<String>) -> Result<CanonicalRecord, EmitError> {
        let currency = self.normalize_currency(&raw.currency)?;
        let quote = QuoteSnapshot { last_price: Scaled::from_f64(raw.last_price, PRICE_SCALE)?, currency, as_of: raw.as_of };
        Ok(CanonicalRecord::Quote { security: security.clone(), quote, meta: self.meta(run_id) })
    }

    /// Converts fundamentals line items into a [`CanonicalRecord::FundamentalsSnapshot`].
    ///
    /// Overlapping period ranges sharing the same normalized key are logged
    /// as a warning, or rejected outright when [`EmitterConfig::strict`] is set.
    pub fn emit_financials(
        &self,
        security: &Security,
        raw_lines: Vec<RawFinancialLine>,
        run_id: impl Into<String>,
    ) -> Result<CanonicalRecord, EmitError> {
        if raw_lines.is_empty() {
            return Err(EmitError::Empty);
        }
        let mut lines = Vec::with_capacity(raw_lines.len());
        for raw in raw_lines {
            if raw.period_start > raw.period_end {
                return Err(EmitError::InvalidPeriod {
                    key: raw.key.clone(),
                    start: raw.period_start.to_rfc3339(),
                    end: raw.period_end.to_rfc3339(),
                });
            }
            lines.push(PeriodLine {
                key: keys::normalize_key(&raw.key),
                value: Scaled::from_f64(raw.value, PRICE_SCALE)?,
                currency: self.normalize_currency(&raw.currency)?,
                period_start: raw.period_start,
                period_end: raw.period_end,
            });
        }
        self.check_overlaps(&lines)?;
        Ok(CanonicalRecord::FundamentalsSnapshot { security: security.clone(), lines, meta: self.meta(run_id) })
    }

    fn check_overlaps(&self, lines: &[PeriodLine]) -> Result<(), EmitError> {
        let mut by_key: HashMap<&str, Vec<(DateTime<Utc>, DateTime<Utc>)>> = HashMap::new();
        for line in lines {
            by_key.entry(line.key.as_str()).or_default().push((line.period_start, line.period_end));
        }
        for (key, mut ranges) in by_key {
            ranges.sort_by_key(|(start, _)| *start);
            for window in ranges.windows(2) {
                let (_, prev_end) = window[0];
                let (next_start, _) = window[1];
                if next_start < prev_end {
                    if self.config.strict {
                        return Err(EmitError::OverlappingPeriod(key.to_string()));
                    }
                    tracing::warn!(key, "overlapping fundamentals periods for the same key");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use yfin_model::Mic;

    use super::*;

    fn security() -> Security {
        Security::new("AAPL", Mic::empty())
    }

    #[test]
    fn emits_bars_with_scaled_values() {
        let emitter = CanonicalEmitter::new(EmitterConfig::default());
        let raw = vec![RawBar {
            event_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            open: 10.5,
            high: 11.0,
            low: 10.0,
            close: 10.75,
            volume: 1_000_000.0,
        }];
        let record = emitter.emit_bars(&security(), raw, "test-run").unwrap();
        match record {
            CanonicalRecord::Bars { bars, .. } => assert_eq!(bars.len(), 1),
            other => panic!("expected bars, got {other:?}"),
        }
    }

    #[test]
    fn empty_bars_is_an_error() {
        let emitter = CanonicalEmitter::new(EmitterConfig::default());
        assert!(matches!(emitter.emit_bars(&security(), vec![], "test-run"), Err(EmitError::Empty)));
    }

    #[test]
    fn quote_falls_back_to_default_currency_when_blank() {
        let emitter = CanonicalEmitter::new(EmitterConfig::default());
        let raw = RawQuote { last_price: 1.0, currency: String::new(), as_of: Utc.timestamp_opt(1_700_000_000, 0).unwrap() };
        let record = emitter.emit_quote(&security(), raw, "test-run").unwrap();
        match record {
            CanonicalRecord::Quote { quote, .. } => assert_eq!(quote.currency.as_str(), "USD"),
            other => panic!("expected quote, got {other:?}"),
        }
    }

    #[test]
    fn inverted_period_is_rejected() {
        let emitter = CanonicalEmitter::new(EmitterConfig::default());
        let end = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let start = Utc.timestamp_opt(1_800_000_000, 0).unwrap();
        let raw = vec![RawFinancialLine {
            key: "totalRevenue".into(),
            value: 1.0,
            currency: "USD".into(),
            period_start: start,
            period_end: end,
        }];
        assert!(matches!(
            emitter.emit_financials(&security(), raw, "test-run"),
            Err(EmitError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn strict_mode_rejects_overlapping_periods() {
        let emitter = CanonicalEmitter::new(EmitterConfig { strict: true, ..EmitterConfig::default() });
        let start1 = Utc.timestamp_opt(1_000, 0).unwrap();
        let end1 = Utc.timestamp_opt(5_000, 0).unwrap();
        let start2 = Utc.timestamp_opt(3_000, 0).unwrap();
        let end2 = Utc.timestamp_opt(7_000, 0).unwrap();
        let raw = vec![
            RawFinancialLine { key: "totalRevenue".into(), value: 1.0, currency: "USD".into(), period_start: start1, period_end: end1 },
            RawFinancialLine { key: "totalRevenue".into(), value: 2.0, currency: "USD".into(), period_start: start2, period_end: end2 },
        ];
        assert!(matches!(
            emitter.emit_financials(&security(), raw, "test-run"),
            Err(EmitError::OverlappingPeriod(_))
        ));
    }

    #[test]
    fn non_strict_mode_warns_but_succeeds_on_overlap() {
        let emitter = CanonicalEmitter::new(EmitterConfig::default());
        let start1 = Utc.timestamp_opt(1_000, 0).unwrap();
        let end1 = Utc.timestamp_opt(5_000, 0).unwrap();
        let start2 = Utc.timestamp_opt(3_000, 0).unwrap();
        let end2 = Utc.timestamp_opt(7_000, 0).unwrap();
        let raw = vec![
            RawFinancialLine { key: "totalRevenue".into(), value: 1.0, currency: "USD".into(), period_start: start1, period_end: end1 },
            RawFinancialLine { key: "totalRevenue".into(), value: 2.0, currency: "USD".into(), period_start: start2, period_end: end2 },
        ];
        assert!(emitter.emit_financials(&security(), raw, "test-run").is_ok());
    }
}
