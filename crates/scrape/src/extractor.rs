//! Endpoint-specific extractors.
//!
//! An extractor is a narrow capability — "can turn this endpoint's response
//! body into this one DTO" — rather than a base class every endpoint must
//! subclass. Extractors never normalize currencies, MICs, or keys; that is
//! the canonical emitter's job. They only parse the wire shape into a typed,
//! still-raw value.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::ExtractionError;

/// Turns a raw response body into a typed, not-yet-canonical DTO.
pub trait Extractor: Send + Sync {
    /// The DTO this extractor produces.
    type Output;

    /// Parses `body` into [`Extractor::Output`].
    fn extract(&self, body: &[u8]) -> Result<Self::Output, ExtractionError>;
}

/// A single OHLCV bar, with prices and volume still as raw `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    /// When this bar's interval began.
    pub event_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A single-point price quote, with currency still as a raw, unvalidated string.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuote {
    pub last_price: f64,
    pub currency: String,
    pub as_of: DateTime<Utc>,
}

/// A single fundamentals line item, with key and currency still unnormalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFinancialLine {
    pub key: String,
    pub value: f64,
    pub currency: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

fn parse_json(body: &[u8]) -> Result<Value, ExtractionError> {
    serde_json::from_slice(body).map_err(|err| ExtractionError::Malformed(err.to_string()))
}

fn child<'a>(value: &'a Value, field: &str) -> Result<&'a Value, ExtractionError> {
    value.get(field).ok_or_else(|| ExtractionError::MissingField(field.to_string()))
}

fn as_f64(value: &Value, field: &str) -> Result<f64, ExtractionError> {
    value
        .as_f64()
        .ok_or_else(|| ExtractionError::SchemaDrift { field: field.to_string(), detail: "expected a number".into() })
}

fn as_array<'a>(value: &'a Value, field: &str) -> Result<&'a Vec<Value>, ExtractionError> {
    value
        .as_array()
        .ok_or_else(|| ExtractionError::SchemaDrift { field: field.to_string(), detail: "expected an array".into() })
}

fn timestamp_to_utc(secs: i64, field: &str) -> Result<DateTime<Utc>, ExtractionError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| ExtractionError::SchemaDrift { field: field.to_string(), detail: "invalid unix timestamp".into() })
}

/// Extracts daily OHLCV bars from a `/v8/finance/chart/{symbol}` response.
#[derive(Debug, Default)]
pub struct ChartExtractor;

impl Extractor for ChartExtractor {
    type Output = Vec<RawBar>;

    fn extract(&self, body: &[u8]) -> Result<Vec<RawBar>, ExtractionError> {
        let root = parse_json(body)?;
        let chart = child(&root, "chart")?;
        let results = as_array(chart, "chart.result")?;
        let result = results.first().ok_or_else(|| ExtractionError::MissingField("chart.result[0]".into()))?;

        let timestamps = as_array(child(result, "timestamp")?, "chart.result[0].timestamp")?;
        let indicators = child(result, "indicators")?;
        let quote_list = as_array(child(indicators, "quote")?, "indicators.quote")?;
        let quote = quote_list.first().ok_or_else(|| ExtractionError::MissingField("indicators.quote[0]".into()))?;

        let opens = as_array(child(quote, "open")?, "quote.open")?;
        let highs = as_array(child(quote, "high")?, "quote.high")?;
        let lows = as_array(child(quote, "low")?, "quote.low")?;
        let closes = as_array(child(quote, "close")?, "quote.close")?;
        let volumes = as_array(child(quote, "volume")?, "quote.volume")?;

        if [opens.len(), highs.len(), lows.len(), closes.len(), volumes.len()]
            .iter()
            .any(|len| *len != timestamps.len())
        {
            return Err(ExtractionError::SchemaDrift {
                field: "quote.*".into(),
                detail: "indicator arrays do not align with timestamp array length".into(),
            });
        }

        let mut bars = Vec::with_capacity(timestamps.len());
        for i in 0..timestamps.len() {
            let ts = timestamps[i].as_i64().ok_or_else(|| ExtractionError::SchemaDrift {
                field: "timestamp[i]".into(),
                detail: "expected an integer".into(),
            })?;
            // A null candle (market holiday gap) is skipped, not an error.
            if opens[i].is_null() {
                continue;
            }
            bars.push(RawBar {
                event_time: timestamp_to_utc(ts, "timestamp[i]")?,
                open: as_f64(&opens[i], "open[i]")?,
                high: as_f64(&highs[i], "high[i]")?,
                low: as_f64(&lows[i], "low[i]")?,
                close: as_f64(&closes[i], "close[i]")?,
                volume: as_f64(&volumes[i], "volume[i]")?,
            });
        }
        Ok(bars)
    }
}

/// Extracts a single quote snapshot from a `/v7/finance/quote` response.
#[derive(Debug, Default)]
pub struct QuoteExtractor;

impl Extractor for QuoteExtractor {
    type Output = RawQuote;

    fn extract(&self, body: &[u8]) -> Result<RawQuote, ExtractionError> {
        let root = parse_json(body)?;
        let response = child(&root, "quoteResponse")?;
        let results = as_array(child(response, "result")?, "quoteResponse.result")?;
        let result = results.first().ok_or_else(|| ExtractionError::MissingField("quoteResponse.result[0]".into()))?;

        let last_price = as_f64(child(result, "regularMarketPrice")?, "regularMarketPrice")?;
        let currency = child(result, "currency")?
            .as_str()
            .ok_or_else(|| ExtractionError::SchemaDrift { field: "currency".into(), detail: "expected a string".into() })?
            .to_string();
        let as_of_ts = child(result, "regularMarketTime")?
            .as_i64()
            .ok_or_else(|| ExtractionError::SchemaDrift { field: "regularMarketTime".into(), detail: "expected an integer".into() })?;

        Ok(RawQuote { last_price, currency, as_of: timestamp_to_utc(as_of_ts, "regularMarketTime")? })
    }
}

/// Extracts fundamentals line items for a named module from a
/// `/v10/finance/quoteSummary/{symbol}` response, e.g. `incomeStatementHistory`.
#[derive(Debug)]
pub struct QuoteSummaryExtractor {
    module: String,
}

impl QuoteSummaryExtractor {
    /// Builds an extractor targeting a specific quoteSummary module.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self { module: module.into() }
    }
}

fn raw_money(value: &Value, field: &str) -> Result<f64, ExtractionError> {
    match value.get("raw") {
        Some(raw) => as_f64(raw, field),
        None => as_f64(value, field),
    }
}

impl Extractor for QuoteSummaryExtractor {
    type Output = Vec<RawFinancialLine>;

    fn extract(&self, body: &[u8]) -> Result<Vec<RawFinancialLine>, ExtractionError> {
        let root = parse_json(body)?;
        let summary = child(&root, "quoteSummary")?;
        let results = as_array(child(summary, "result")?, "quoteSummary.result")?;
        let result = results.first().ok_or_else(|| ExtractionError::MissingField("quoteSummary.result[0]".into()))?;
        let module = child(result, &self.module)?;

        let statements_key = format!("{}History", self.module.trim_end_matches("History"));
        let statements = module
            .get("quarterly")
            .or_else(|| module.get(&statements_key))
            .and_then(|v| v.as_array())
            .ok_or_else(|| ExtractionError::MissingField(format!("{}.quarterly", self.module)))?;

        let mut lines = Vec::new();
        for statement in statements {
            let end_date_ts = statement
                .get("endDate")
                .and_then(|v| v.get("raw").or(Some(v)))
                .and_then(Value::as_i64)
                .ok_or_else(|| ExtractionError::MissingField("endDate".into()))?;
            let period_end = timestamp_to_utc(end_date_ts, "endDate")?;
            let period_start = period_end;

            let Some(fields) = statement.as_object() else {
                continue;
            };
            for (key, value) in fields {
                if key == "endDate" || key == "maxAge" {
                    continue;
                }
                let Ok(amount) = raw_money(value, key) else {
                    continue;
                };
                lines.push(RawFinancialLine {
                    key: key.clone(),
                    value: amount,
                    currency: String::new(),
                    period_start,
                    period_end,
                });
            }
        }
        Ok(lines)
    }
}
