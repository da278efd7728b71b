//! HTTP server implementation using axum.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::api::{MarketsRequest, PolymarketApi, TradesRequest};
use crate::config::FeedConfig;
use crate::error::{FeedError, FeedResult};
use crate::feed::{FeedRequest, load_feed};
use crate::stats::compute_forecaster_stats;
use crate::summary::summarize_markets;
use crate::tape::{TapeFilter, build_tape};
use crate::types::{FeedItem, ForecasterStats, MarketSummary, TapeTrade};

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    api: Arc<dyn PolymarketApi>,
    feed: FeedConfig,
}

impl AppState {
    pub fn new(api: Arc<dyn PolymarketApi>, feed: FeedConfig) -> Self {
        Self { api, feed }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.to_string(),
            details: self.details().map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/feed", get(get_feed).post(post_feed))
        .route("/api/forecaster/{address}", get(get_forecaster))
        .route("/api/trades", get(get_trades))
        .route("/api/markets", get(get_markets))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedParams {
    min_amount: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WatchBody {
    #[serde(default)]
    addresses: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TapeResponse {
    trades: Vec<TapeTrade>,
}

#[derive(Debug, Serialize)]
struct MarketsResponse {
    markets: Vec<MarketSummary>,
}

fn blank_to_none(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_min_amount(raw: Option<&str>, default: Decimal) -> FeedResult<Decimal> {
    match blank_to_none(raw) {
        None => Ok(default),
        Some(s) => Decimal::from_str(s)
            .map_err(|_| FeedError::Validation(format!("minAmount must be a number, got {s:?}"))),
    }
}

fn parse_limit(raw: Option<&str>, default: u32) -> FeedResult<u32> {
    match blank_to_none(raw) {
        None => Ok(default),
        Some(s) => s
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                FeedError::Validation(format!("limit must be a positive integer, got {s:?}"))
            }),
    }
}

fn parse_min_notional(raw: Option<&str>) -> FeedResult<f64> {
    match blank_to_none(raw) {
        None => Ok(0.0),
        Some(s) => s
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(|| {
                FeedError::Validation(format!("minNotional must be a number, got {s:?}"))
            }),
    }
}

fn log_failure(route: &str, err: &FeedError) {
    match err {
        FeedError::Validation(msg) => warn!("{route} rejected: {msg}"),
        other => error!("{route} failed: {other}"),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Recent trades across all traders.
async fn get_feed(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> FeedResult<Json<Vec<FeedItem>>> {
    let req = FeedRequest {
        limit: parse_limit(params.limit.as_deref(), state.feed.default_limit)?,
        min_amount: parse_min_amount(params.min_amount.as_deref(), state.feed.default_min_amount)?,
        addresses: Vec::new(),
        markets_limit: state.feed.markets_limit,
    };
    info!(
        "Fetching recent trades (min: ${}, limit: {})",
        req.min_amount, req.limit
    );
    let items = load_feed(state.api.as_ref(), &req)
        .await
        .inspect_err(|e| log_failure("GET /api/feed", e))?;
    Ok(Json(items))
}

/// Recent trades by a set of watched wallets.
async fn post_feed(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
    body: Result<Json<WatchBody>, JsonRejection>,
) -> FeedResult<Json<Vec<FeedItem>>> {
    let Json(body) = body.map_err(|e| {
        warn!("POST /api/feed bad body: {e}");
        FeedError::Validation("Invalid request body".to_string())
    })?;
    let addresses: Vec<String> = body
        .addresses
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if addresses.is_empty() {
        return Err(FeedError::Validation("No addresses provided".to_string()));
    }

    let req = FeedRequest {
        limit: state.feed.watch_trades_limit,
        min_amount: parse_min_amount(params.min_amount.as_deref(), state.feed.default_min_amount)?,
        addresses,
        markets_limit: state.feed.markets_limit,
    };
    info!("Fetching trades for {} watched address(es)", req.addresses.len());
    let items = load_feed(state.api.as_ref(), &req)
        .await
        .inspect_err(|e| log_failure("POST /api/feed", e))?;
    Ok(Json(items))
}

/// Approximate stats for one trader.
async fn get_forecaster(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> FeedResult<Json<ForecasterStats>> {
    let address = address.trim().to_string();
    if address.is_empty() {
        return Err(FeedError::Validation("Address is required".to_string()));
    }
    let trades = state
        .api
        .fetch_trades(&TradesRequest {
            limit: state.feed.forecaster_trades_limit,
            user: Some(address.clone()),
            min_cash: None,
        })
        .await
        .inspect_err(|e| log_failure("GET /api/forecaster", e))?;
    info!("Computing stats for {address} over {} trades", trades.len());
    Ok(Json(compute_forecaster_stats(
        &address,
        trades,
        state.feed.recent_trades,
    )))
}

/// Live trade tape.
async fn get_trades(
    State(state): State<AppState>,
    Query(filter): Query<TapeFilter>,
) -> FeedResult<Json<TapeResponse>> {
    let limit = parse_limit(filter.limit.as_deref(), state.feed.tape_default_limit)?
        .min(state.feed.tape_max_limit);
    let min_notional = parse_min_notional(filter.min_notional.as_deref())?;
    let trades = state
        .api
        .fetch_trades(&TradesRequest {
            limit,
            user: None,
            min_cash: None,
        })
        .await
        .inspect_err(|e| log_failure("GET /api/trades", e))?;
    let trades = build_tape(&trades, min_notional, filter.market_id.as_deref(), Utc::now());
    Ok(Json(TapeResponse { trades }))
}

/// Open markets by 24h volume.
async fn get_markets(State(state): State<AppState>) -> FeedResult<Json<MarketsResponse>> {
    let markets = state
        .api
        .fetch_markets(&MarketsRequest {
            limit: state.feed.summary_markets_limit,
            open_only: true,
        })
        .await
        .inspect_err(|e| log_failure("GET /api/markets", e))?;
    let markets = summarize_markets(&markets, Utc::now());
    Ok(Json(MarketsResponse { markets }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the HTTP server until Ctrl+C.
pub async fn run_server(state: AppState, bind: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
