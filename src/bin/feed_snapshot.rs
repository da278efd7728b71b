use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rust_decimal::Decimal;
use tracing::info;

use forecast_feed::api::{PolymarketApi, PolymarketHttp, TradesRequest};
use forecast_feed::config::{AppConfig, CONFIG_PATH};
use forecast_feed::feed::{FeedRequest, load_feed};
use forecast_feed::reporter;
use forecast_feed::stats::compute_forecaster_stats;

#[derive(Parser)]
#[command(name = "feed_snapshot", about = "Print one enriched feed page as JSON lines")]
struct Args {
    /// Path to the TOML config file (defaults apply if it does not exist)
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Minimum trade cash amount in USD (0 disables the filter)
    #[arg(long)]
    min_amount: Option<Decimal>,

    /// Number of trades to request
    #[arg(long)]
    limit: Option<u32>,

    /// Only keep trades by this wallet (repeatable)
    #[arg(long = "address")]
    addresses: Vec<String>,

    /// Print stats for this trader instead of the feed
    #[arg(long, conflicts_with = "addresses")]
    forecaster: Option<String>,
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
    if args.limit == Some(0) {
        anyhow::bail!("--limit must be positive");
    }

    let config = AppConfig::load_or_default(&args.config)?;
    let api = PolymarketHttp::new(&config.upstream)?;

    if let Some(address) = args.forecaster {
        let trades = api
            .fetch_trades(&TradesRequest {
                limit: config.feed.forecaster_trades_limit,
                user: Some(address.clone()),
                min_cash: None,
            })
            .await?;
        info!("Fetched {} trades for {address}", trades.len());
        let stats = compute_forecaster_stats(&address, trades, config.feed.recent_trades);
        reporter::report_stats(&stats);
        return Ok(());
    }

    let limit = args.limit.unwrap_or(if args.addresses.is_empty() {
        config.feed.default_limit
    } else {
        config.feed.watch_trades_limit
    });
    let req = FeedRequest {
        limit,
        min_amount: args.min_amount.unwrap_or(config.feed.default_min_amount),
        addresses: args.addresses,
        markets_limit: config.feed.markets_limit,
    };

    let items = load_feed(&api, &req).await?;
    info!("Assembled {} feed items", items.len());
    reporter::report_feed(&items);
    Ok(())
}
