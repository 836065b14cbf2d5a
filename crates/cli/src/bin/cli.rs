use clap::Parser;
use yfin_cli::opt::YfinCli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    if let Err(err) = yfin_cli::run(YfinCli::parse()).await {
        tracing::error!(error = %err, "error running yfin CLI");
        std::process::exit(err.exit_code());
    }
}
