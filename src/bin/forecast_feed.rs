use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use forecast_feed::api::PolymarketHttp;
use forecast_feed::config::{AppConfig, CONFIG_PATH};
use forecast_feed::server::{AppState, run_server};

#[derive(Parser)]
#[command(name = "forecast-feed", about = "Polymarket forecast feed HTTP server")]
struct Args {
    /// Path to the TOML config file (defaults apply if it does not exist)
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Override the listen address from the config
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = AppConfig::load_or_default(&args.config)?;
    let bind = args.bind.unwrap_or(config.server.bind);

    info!(
        "Upstreams: data={} gamma={}",
        config.upstream.data_api_base, config.upstream.gamma_api_base
    );
    let api = Arc::new(PolymarketHttp::new(&config.upstream)?);
    let state = AppState::new(api, config.feed);

    run_server(state, bind).await?;
    info!("Server stopped");
    Ok(())
}
