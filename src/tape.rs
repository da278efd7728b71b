//! Live trade tape: flat, numeric view of recent trades for the dashboard.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use uuid::Uuid;

use crate::json_util::{first_present, parse_decimal, parse_f64};
use crate::types::{RawTrade, TakerSide, TapeTrade};

/// Filters for the tape endpoint; every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapeFilter {
    pub limit: Option<String>,
    pub min_notional: Option<String>,
    pub market_id: Option<String>,
}

/// Map one raw trade; trades without a numeric price and size are dropped.
pub fn map_tape_trade(raw: &RawTrade, now: DateTime<Utc>) -> Option<TapeTrade> {
    let price_dec = parse_decimal(raw.price.as_ref())?;
    let size_dec = parse_decimal(raw.size.as_ref())?;
    let price = price_dec.to_f64()?;
    let size = size_dec.to_f64()?;
    let notional = price_dec
        .checked_mul(size_dec)
        .map(|n| n.round_dp(2))
        .and_then(|n| n.to_f64())
        .unwrap_or(0.0);

    let id = first_present([raw.transaction_hash.as_deref(), raw.id.as_deref()])
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let market_id = first_present([raw.condition_id.as_deref(), raw.asset.as_deref()])
        .unwrap_or("unknown")
        .to_string();
    let taker_side = match raw.side.as_deref() {
        Some(s) if s.trim().eq_ignore_ascii_case("SELL") => TakerSide::Sell,
        _ => TakerSide::Buy,
    };
    let timestamp = parse_f64(raw.timestamp.as_ref())
        .and_then(|secs| DateTime::from_timestamp_millis((secs * 1000.0).round() as i64))
        .unwrap_or(now)
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    Some(TapeTrade {
        id,
        market_id,
        market_question: raw.title.clone(),
        market_slug: raw.slug.clone(),
        outcome: raw.outcome.clone().unwrap_or_else(|| "N/A".to_string()),
        price,
        size,
        notional,
        taker_side,
        trader: raw.proxy_wallet.clone(),
        timestamp,
        odds: price,
    })
}

/// Map, then apply the notional floor and the market substring filter.
pub fn build_tape(
    trades: &[RawTrade],
    min_notional: f64,
    market_filter: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<TapeTrade> {
    let needle = market_filter
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty());

    trades
        .iter()
        .filter_map(|t| map_tape_trade(t, now))
        .filter(|t| t.notional >= min_notional)
        .filter(|t| match &needle {
            None => true,
            Some(needle) => {
                t.market_id.to_lowercase().contains(needle.as_str())
                    || t
                        .market_slug
                        .as_deref()
                        .is_some_and(|s| s.to_lowercase().contains(needle.as_str()))
            }
        })
        .collect()
}
