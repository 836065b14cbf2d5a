#![deny(unsafe_code)]

//! Wires configuration into the scrape orchestrator, canonical emitter, and
//! publisher, and runs the requested command.

pub mod config;
pub mod opt;

use std::sync::Arc;

use config::AppConfig;
use opt::{Commands, FetchOpt, RecordKind, YfinCli};
use thiserror::Error;
use uuid::Uuid;
use yfin_core::cancellation::CancellationToken;
use yfin_emitter::{CanonicalEmitter, EmitError};
use yfin_model::{CanonicalRecord, Mic, Security};
use yfin_network::HttpClient;
use yfin_publisher::{InMemoryDlq, InMemoryTransport, PublishError, Publisher};
use yfin_scrape::{PolicyGate, RobotsPolicy, ScrapeError, ScrapeOrchestrator};

/// A categorized failure, carrying the exit code the binary should use.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(anyhow::Error),
    #[error("fetch failed: {0}")]
    Fetch(#[from] ScrapeError),
    #[error("emission failed: {0}")]
    Emit(#[from] EmitError),
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}

impl CliError {
    /// Maps this failure onto the process exit code a caller should surface.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 3,
            Self::Fetch(_) | Self::Emit(_) => 1,
            Self::Publish(_) => 4,
        }
    }
}

/// Parses a CLI invocation and runs it to completion.
pub async fn run(opt: YfinCli) -> Result<(), CliError> {
    let config = AppConfig::load(opt.config.as_deref()).map_err(CliError::Config)?;
    match opt.command {
        Commands::Fetch(fetch_opt) => run_fetch(&config, fetch_opt).await,
    }
}

async fn run_fetch(config: &AppConfig, opt: FetchOpt) -> Result<(), CliError> {
    let http = Arc::new(HttpClient::new(config.http_client_config()));
    let gate = PolicyGate::new(RobotsPolicy::Enforce, Arc::new(yfin_scrape::AllowAll));
    let orchestrator = ScrapeOrchestrator::new(http, config.cache_config(), gate, config.endpoints());
    let emitter = CanonicalEmitter::new(config.emitter_config());
    let transport = Arc::new(InMemoryTransport::new());
    let dlq = Arc::new(InMemoryDlq::new());
    let publisher = Publisher::new(config.publisher_config(opt.preview), transport.clone(), dlq.clone());

    let token = CancellationToken::new();
    let run_id = Uuid::new_v4().to_string();
    let security = Security::new(&opt.symbol, Mic::empty());

    let record = fetch_record(&orchestrator, &emitter, &security, opt.kind, &run_id, &token).await?;

    let topic = match opt.kind {
        RecordKind::Bars => "yfin.bars",
        RecordKind::Quote => "yfin.quotes",
        RecordKind::Financials => "yfin.financials",
    };
    let report = publisher.publish_record(&record, topic, None, &token).await?;

    tracing::info!(
        symbol = %opt.symbol,
        chunks = report.chunks,
        bytes = report.bytes,
        previewed = report.previewed,
        "publish complete"
    );
    if !dlq.entries().is_empty() {
        tracing::warn!(count = dlq.entries().len(), "some envelopes were dead-lettered");
    }
    Ok(())
}

async fn fetch_record(
    orchestrator: &ScrapeOrchestrator,
    emitter: &CanonicalEmitter,
    security: &Security,
    kind: RecordKind,
    run_id: &str,
    token: &CancellationToken,
) -> Result<CanonicalRecord, CliError> {
    match kind {
        RecordKind::Bars => {
            let bars = orchestrator.fetch_chart(&security.symbol, token).await?;
            Ok(emitter.emit_bars(security, bars, run_id.to_string())?)
        }
        RecordKind::Quote => {
            let quote = orchestrator.fetch_quote(&security.symbol, token).await?;
            Ok(emitter.emit_quote(security, quote, run_id.to_string())?)
        }
        RecordKind::Financials => {
            let lines = orchestrator.fetch_financials(&security.symbol, "incomeStatementHistory", token).await?;
            Ok(emitter.emit_financials(security, lines, run_id.to_string())?)
        }
    }
}
