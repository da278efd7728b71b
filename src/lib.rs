//! Polymarket trade feed: enriches raw trades with market metadata and
//! serves them, plus a few dashboard views, over HTTP.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod json_util;
pub mod reporter;
pub mod server;
pub mod stats;
pub mod summary;
pub mod tape;
pub mod types;

/// Polymarket data API base URL (public, no auth required)
pub const DATA_API_BASE: &str = "https://data-api.polymarket.com";

/// Gamma API base URL (market metadata)
pub const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";

/// User-Agent sent on every upstream request
pub const USER_AGENT: &str = "ForecastFeed/1.0";
