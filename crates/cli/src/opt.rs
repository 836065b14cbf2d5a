//! Command-line argument definitions.

use clap::Parser;

/// Command-line interface for the Yahoo Finance data-acquisition client.
#[derive(Debug, Parser)]
#[clap(version, about, author)]
pub struct YfinCli {
    /// Path to a TOML configuration file; unset fields fall back to defaults.
    #[arg(long, global = true, env = "YFIN_CONFIG")]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Parser, Debug)]
pub enum Commands {
    /// Fetch and publish data for one symbol.
    Fetch(FetchOpt),
}

/// Which canonical record kind to fetch.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum RecordKind {
    /// Daily OHLCV bars.
    Bars,
    /// A point-in-time quote snapshot.
    Quote,
    /// Quarterly income statement line items.
    Financials,
}

/// Options for the `fetch` subcommand.
#[derive(Parser, Debug)]
#[command(about = "Fetch one symbol's data and publish it", long_about = None)]
pub struct FetchOpt {
    /// Ticker symbol, e.g. `AAPL`.
    #[arg(long)]
    pub symbol: String,
    /// Which record kind to fetch.
    #[arg(long, value_enum, default_value = "bars")]
    pub kind: RecordKind,
    /// Build and measure the publish envelopes without transmitting them.
    #[arg(long)]
    pub preview: bool,
}
