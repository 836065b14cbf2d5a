//! Wires the policy gate, response cache, and HTTP client together and
//! dispatches to the right extractor for each Yahoo Finance endpoint.

use std::sync::Arc;

use url::Url;
use yfin_core::cancellation::CancellationToken;
use yfin_network::{HttpClient, Outcome};

use crate::{
    cache::{CacheConfig, ResponseCache},
    error::ScrapeError,
    extractor::{ChartExtractor, Extractor, QuoteExtractor, QuoteSummaryExtractor, RawBar, RawFinancialLine, RawQuote},
    robots::{GateResult, PolicyGate},
};

/// Base URLs for the Yahoo Finance endpoints this orchestrator dispatches to.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// `https://query1.finance.yahoo.com/v7/finance/quote`
    pub quote_base: String,
    /// `https://query1.finance.yahoo.com/v8/finance/chart`
    pub chart_base: String,
    /// `https://query2.finance.yahoo.com/v10/finance/quoteSummary`
    pub quote_summary_base: String,
    /// `https://query2.finance.yahoo.com/v1/finance/search`
    pub search_base: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            quote_base: "https://query1.finance.yahoo.com/v7/finance/quote".to_string(),
            chart_base: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            quote_summary_base: "https://query2.finance.yahoo.com/v10/finance/quoteSummary".to_string(),
            search_base: "https://query2.finance.yahoo.com/v1/finance/search".to_string(),
        }
    }
}

fn endpoint_url(base: &str, symbol: &str, query: &[(&str, &str)]) -> Result<Url, ScrapeError> {
    let raw = format!("{base}/{symbol}");
    let mut url = Url::parse(&raw).map_err(|err| ScrapeError::InvalidUrl(err.to_string()))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in query {
            pairs.append_pair(k, v);
        }
    }
    Ok(url)
}

/// Composes the robots gate, response cache, and resilient HTTP client into
/// endpoint-specific fetch operations that return typed, still-raw DTOs.
pub struct ScrapeOrchestrator {
    http: Arc<HttpClient>,
    cache: ResponseCache,
    gate: PolicyGate,
    endpoints: EndpointConfig,
}

impl ScrapeOrchestrator {
    /// Builds an orchestrator from its collaborators.
    #[must_use]
    pub fn new(http: Arc<HttpClient>, cache_config: CacheConfig, gate: PolicyGate, endpoints: EndpointConfig) -> Self {
        Self { http, cache: ResponseCache::new(cache_config), gate, endpoints }
    }

    async fn fetch_body(&self, url: Url, token: &CancellationToken) -> Result<bytes::Bytes, ScrapeError> {
        if let GateResult::Deny { reason } = self.gate.check(&url) {
            return Err(ScrapeError::RobotsDenied(reason));
        }
        let key = url.to_string();
        let http = self.http.clone();
        let token = token.clone();
        self.cache
            .get_or_fetch(key, move || async move {
                match http.fetch(&url, &token).await {
                    Outcome::Success { body, .. } => Ok(body),
                    Outcome::CircuitOpen => Err(ScrapeError::CircuitOpen),
                    Outcome::Cancelled => Err(ScrapeError::Cancelled),
                    Outcome::Fatal(kind) => Err(ScrapeError::Fatal(kind)),
                    Outcome::Retryable { kind, .. } => Err(ScrapeError::RetriesExhausted(kind)),
                }
            })
            .await
    }

    /// Fetches and extracts daily OHLCV bars for `symbol`.
    pub async fn fetch_chart(&self, symbol: &str, token: &CancellationToken) -> Result<Vec<RawBar>, ScrapeError> {
        let url = endpoint_url(&self.endpoints.chart_base, symbol, &[])?;
        let body = self.fetch_body(url, token).await?;
        Ok(ChartExtractor.extract(&body)?)
    }

    /// Fetches and extracts a price quote snapshot for `symbol`.
    pub async fn fetch_quote(&self, symbol: &str, token: &CancellationToken) -> Result<RawQuote, ScrapeError> {
        let url = endpoint_url(&self.endpoints.quote_base, "", &[("symbols", symbol)])?;
        let body = self.fetch_body(url, token).await?;
        Ok(QuoteExtractor.extract(&body)?)
    }

    /// Fetches and extracts fundamentals line items for `symbol` from a
    /// quoteSummary `module` (e.g. `"incomeStatementHistory"`).
    pub async fn fetch_financials(
        &self,
        symbol: &str,
        module: &str,
        token: &CancellationToken,
    ) -> Result<Vec<RawFinancialLine>, ScrapeError> {
        let url = endpoint_url(&self.endpoints.quote_summary_base, symbol, &[("modules", module)])?;
        let body = self.fetch_body(url, token).await?;
        Ok(QuoteSummaryExtractor::new(module).extract(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_appends_symbol_and_query() {
        let url = endpoint_url("https://query1.finance.yahoo.com/v8/finance/chart", "AAPL", &[("range", "1mo")]).unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/AAPL");
        assert_eq!(url.query(), Some("range=1mo"));
    }

    #[test]
    fn endpoint_url_without_symbol_still_has_trailing_slash() {
        let url = endpoint_url("https://query1.finance.yahoo.com/v7/finance/quote", "", &[("symbols", "AAPL")]).unwrap();
        assert_eq!(url.path(), "/v7/finance/quote/");
    }
}
