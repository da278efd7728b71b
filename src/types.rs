use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json_util::{opt_bool, opt_string, opt_string_list};

/// A trade as returned by the Data API, or by the legacy CLOB trade shape.
///
/// Every field is optional; assembly picks whichever of the overlapping fields
/// is present rather than branching on the API generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrade {
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "transactionHash",
        default,
        deserialize_with = "opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_hash: Option<String>,
    #[serde(
        rename = "transaction_hash",
        default,
        deserialize_with = "opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_transaction_hash: Option<String>,

    #[serde(
        rename = "proxyWallet",
        default,
        deserialize_with = "opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub proxy_wallet: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub maker_address: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub taker_address: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub pseudonym: Option<String>,

    #[serde(
        rename = "conditionId",
        default,
        deserialize_with = "opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub condition_id: Option<String>,
    /// Outcome token id (Data API).
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    /// Outcome token id (legacy CLOB).
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,

    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(rename = "outcomeIndex", default, skip_serializing_if = "Option::is_none")]
    pub outcome_index: Option<Value>,

    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(
        rename = "eventSlug",
        default,
        deserialize_with = "opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_slug: Option<String>,

    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub match_time: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A Gamma market record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarket {
    #[serde(default, deserialize_with = "opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub condition_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_list")]
    pub clob_token_ids: Option<Vec<String>>,

    #[serde(default, deserialize_with = "opt_string")]
    pub question: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub market_slug: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub event_slug: Option<String>,

    #[serde(default, deserialize_with = "opt_string_list")]
    pub outcomes: Option<Vec<String>>,
    #[serde(default, deserialize_with = "opt_string_list")]
    pub outcome_prices: Option<Vec<String>>,

    #[serde(default)]
    pub volume: Option<Value>,
    #[serde(default)]
    pub volume24h: Option<Value>,
    #[serde(default)]
    pub volume_usd: Option<Value>,
    #[serde(rename = "volumeUSD", default)]
    pub volume_usd_upper: Option<Value>,
    #[serde(default)]
    pub total_volume: Option<Value>,
    #[serde(default)]
    pub volume24: Option<Value>,
    #[serde(default)]
    pub liquidity: Option<Value>,

    #[serde(default, deserialize_with = "opt_bool")]
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "opt_bool")]
    pub closed: Option<bool>,
    #[serde(default, deserialize_with = "opt_string")]
    pub end_date: Option<String>,

    // Extras only read by the market summary listing.
    #[serde(default)]
    pub volume24hr: Option<Value>,
    #[serde(default)]
    pub volume_num: Option<Value>,
    #[serde(default)]
    pub liquidity_num: Option<Value>,
    #[serde(default)]
    pub best_bid: Option<Value>,
    #[serde(default)]
    pub best_ask: Option<Value>,
    #[serde(default, deserialize_with = "opt_string")]
    pub end_date_iso: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Case-insensitive; anything unrecognised is treated as a buy.
    pub fn parse_or_buy(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("SELL") => Side::Sell,
            _ => Side::Buy,
        }
    }
}

/// Denormalized market snapshot embedded in every feed item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub id: String,
    pub question: String,
    pub description: String,
    pub outcomes: Vec<String>,
    pub outcome_prices: Vec<String>,
    pub volume: String,
    pub liquidity: String,
    pub end_date: String,
    pub image: String,
    pub icon: String,
    pub active: bool,
    pub closed: bool,
    pub market_slug: String,
    pub event_slug: String,
    pub condition_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedItemKind {
    Trade,
}

/// Canonical feed record: one trade joined with its resolved market.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FeedItemKind,
    pub trader: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trader_name: Option<String>,
    pub market: MarketSnapshot,
    pub outcome: String,
    pub side: Side,
    /// Decimal text, never parsed here.
    pub size: String,
    /// Decimal text, never parsed here.
    pub price: String,
    /// ISO-8601.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<String>,
}

/// Approximate per-trader aggregates. Win rate and P&L are heuristics, not
/// settled results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecasterStats {
    pub address: String,
    pub total_trades: usize,
    pub total_volume: f64,
    pub win_rate: f64,
    pub pnl: f64,
    pub recent_trades: Vec<RawTrade>,
}

/// One row of the live trade tape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TapeTrade {
    pub id: String,
    pub market_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_slug: Option<String>,
    pub outcome: String,
    pub price: f64,
    pub size: f64,
    pub notional: f64,
    pub taker_side: TakerSide,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trader: Option<String>,
    pub timestamp: String,
    pub odds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TakerSide {
    Buy,
    Sell,
}

/// Simplified market listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub id: String,
    pub question: String,
    pub description: Option<String>,
    pub outcomes: Vec<String>,
    pub prices: Vec<f64>,
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    pub volume24hr: Option<f64>,
    pub volume_num: Option<f64>,
    pub liquidity_num: Option<f64>,
    pub end_date: Option<String>,
    pub slug: Option<String>,
}
