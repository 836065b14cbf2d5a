//! The externally-facing configuration surface: a flat, serde-deserializable
//! struct loaded from TOML, translated into the internal component configs
//! each crate actually runs with.

use std::time::Duration;

use serde::Deserialize;
use yfin_emitter::EmitterConfig;
use yfin_network::{CircuitBreakerConfig, HttpClientConfig};
use yfin_publisher::PublisherConfig;
use yfin_scrape::{CacheConfig, EndpointConfig};

/// Top-level application configuration, deserialized from TOML with every
/// field defaulted so an empty file (or no file at all) is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpSection,
    pub cache: CacheSection,
    pub emitter: EmitterSection,
    pub publisher: PublisherSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpSection::default(),
            cache: CacheSection::default(),
            emitter: EmitterSection::default(),
            publisher: PublisherSection::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, falling back to defaults for any
    /// field the file omits entirely.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Ok(toml::from_str(&raw)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Builds the internal HTTP client configuration.
    #[must_use]
    pub fn http_client_config(&self) -> HttpClientConfig {
        let defaults = HttpClientConfig::default();
        HttpClientConfig {
            timeout: Duration::from_millis(self.http.timeout_ms),
            max_attempts: self.http.max_attempts,
            qps: self.http.qps,
            burst: self.http.burst,
            breaker: CircuitBreakerConfig {
                failure_threshold: self.http.breaker_failure_threshold,
                min_samples: self.http.breaker_min_samples,
                ..defaults.breaker
            },
            ..defaults
        }
    }

    /// Builds the internal response cache configuration.
    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.cache.enabled,
            max_entries: self.cache.max_entries,
            ttl: Duration::from_secs(self.cache.ttl_secs),
            coalesce_in_flight: self.cache.coalesce_in_flight,
        }
    }

    /// Builds the Yahoo Finance endpoint table (not currently user-overridable).
    #[must_use]
    pub fn endpoints(&self) -> EndpointConfig {
        EndpointConfig::default()
    }

    /// Builds the internal canonical emitter configuration.
    #[must_use]
    pub fn emitter_config(&self) -> EmitterConfig {
        EmitterConfig {
            strict: self.emitter.strict,
            default_currency: self.emitter.default_currency.clone(),
            schema_version: self.emitter.schema_version,
            producer: "yfin-cli".to_string(),
            source: "yahoo-finance".to_string(),
        }
    }

    /// Builds the internal publisher configuration.
    #[must_use]
    pub fn publisher_config(&self, preview: bool) -> PublisherConfig {
        let defaults = PublisherConfig::default();
        PublisherConfig {
            max_chunk_bytes: self.publisher.max_chunk_bytes,
            max_attempts: self.publisher.max_attempts,
            preview,
            ..defaults
        }
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub qps: f64,
    pub burst: u32,
    pub breaker_failure_threshold: f64,
    pub breaker_min_samples: usize,
}

impl Default for HttpSection {
    fn default() -> Self {
        let defaults = HttpClientConfig::default();
        Self {
            timeout_ms: defaults.timeout.as_millis() as u64,
            max_attempts: defaults.max_attempts,
            qps: defaults.qps,
            burst: defaults.burst,
            breaker_failure_threshold: defaults.breaker.failure_threshold,
            breaker_min_samples: defaults.breaker.min_samples,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub enabled: bool,
    pub max_entries: usize,
    pub ttl_secs: u64,
    pub coalesce_in_flight: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            enabled: defaults.enabled,
            max_entries: defaults.max_entries,
            ttl_secs: defaults.ttl.as_secs(),
            coalesce_in_flight: defaults.coalesce_in_flight,
        }
    }
}

/// Canonical emitter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmitterSection {
    pub strict: bool,
    pub default_currency: String,
    pub schema_version: u32,
}

impl Default for EmitterSection {
    fn default() -> Self {
        let defaults = EmitterConfig::default();
        Self { strict: defaults.strict, default_currency: defaults.default_currency, schema_version: defaults.schema_version }
    }
}

/// Publisher settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublisherSection {
    pub max_chunk_bytes: usize,
    pub max_attempts: u32,
}

impl Default for PublisherSection {
    fn default() -> Self {
        let defaults = PublisherConfig::default();
        Self { max_chunk_bytes: defaults.max_chunk_bytes, max_attempts: defaults.max_attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.http.max_attempts, HttpClientConfig::default().max_attempts);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let config: AppConfig = toml::from_str("[http]\nqps = 5.0\n").unwrap();
        assert_eq!(config.http.qps, 5.0);
        assert_eq!(config.http.max_attempts, HttpClientConfig::default().max_attempts);
    }
}
