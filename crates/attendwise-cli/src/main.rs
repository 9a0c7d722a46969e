use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;

use config::{LogFormat, LoggingConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = config::Config::load(&args.config)?;
    init_tracing(&config.logging);

    tracing::debug!(config = %args.config.display(), "configuration loaded");
    commands::run(args.command, &config).await
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
