//! DEX settlement operator - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// DEX settlement operator
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DEXOP_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    dexop_telemetry::init_logging()?;

    info!("Starting dexop-server v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > DEXOP_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("DEXOP_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = dexop_server::AppConfig::from_file(&config_path)?;
    info!(
        wallets = config.wallets.len(),
        dev_wallets = config.chain.dev_wallets,
        store = ?config.operator.store,
        "Configuration loaded"
    );

    let app = dexop_server::Application::new(config)?;
    app.run().await?;

    Ok(())
}
