use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::json_util::{first_present, is_blank_amount, parse_f64, scalar_to_string};
use crate::types::{FeedItem, FeedItemKind, MarketSnapshot, RawMarket, RawTrade, Side};

/// Trader shown when none of the wallet fields are present.
pub const UNKNOWN_TRADER: &str = "Unknown";

/// Identifier that upstream uses as a placeholder; never worth a lookup.
const UNKNOWN_ID: &str = "unknown";

/// Fill `volume` from the alternative volume fields when it is blank.
///
/// Priority: `volume24h`, `volumeUsd`, `volumeUSD`, `totalVolume`, `volume24`,
/// then `"0"`. Applying it twice is a no-op.
pub fn normalize_volume(mut market: RawMarket) -> RawMarket {
    if is_blank_amount(market.volume.as_ref()) {
        let fallback = [
            &market.volume24h,
            &market.volume_usd,
            &market.volume_usd_upper,
            &market.total_volume,
            &market.volume24,
        ]
        .into_iter()
        .flatten()
        .find(|v| !is_blank_amount(Some(*v)))
        .and_then(scalar_to_string)
        .unwrap_or_else(|| "0".to_string());
        market.volume = Some(Value::String(fallback));
    }
    market
}

/// Lookup table from every identifier a market carries to that market.
///
/// Each market is stored once behind an `Arc` and shared by all of its keys.
#[derive(Debug, Clone, Default)]
pub struct MarketIndex {
    by_id: HashMap<String, Arc<RawMarket>>,
}

impl MarketIndex {
    /// Index markets in input order. Later markets overwrite earlier ones on
    /// key collision; markets without any identifier are unreachable.
    pub fn build<I>(markets: I) -> Self
    where
        I: IntoIterator<Item = RawMarket>,
    {
        let mut by_id = HashMap::new();
        for market in markets {
            let market = Arc::new(normalize_volume(market));
            let token_ids = market.clob_token_ids.iter().flatten();
            let keys = token_ids
                .chain(market.condition_id.iter())
                .chain(market.id.iter())
                .filter(|k| !k.is_empty());
            for key in keys {
                by_id.insert(key.clone(), Arc::clone(&market));
            }
        }
        Self { by_id }
    }

    /// Empty keys never match.
    pub fn get(&self, key: &str) -> Option<&Arc<RawMarket>> {
        if key.is_empty() {
            return None;
        }
        self.by_id.get(key)
    }

    /// First hit among the trade's `conditionId`, `asset`, `asset_id`, `market`.
    pub fn lookup_trade(&self, trade: &RawTrade) -> Option<Arc<RawMarket>> {
        [
            &trade.condition_id,
            &trade.asset,
            &trade.asset_id,
            &trade.market,
        ]
        .into_iter()
        .flatten()
        .find_map(|key| self.get(key))
        .cloned()
    }

    /// Number of keys (not markets).
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

pub fn build_index(markets: Vec<RawMarket>) -> MarketIndex {
    MarketIndex::build(markets)
}

/// Identifier for the per-trade Gamma lookup, if the trade has a usable one.
pub fn secondary_lookup_id(trade: &RawTrade) -> Option<&str> {
    first_present([
        trade.condition_id.as_deref(),
        trade.asset.as_deref(),
        trade.asset_id.as_deref(),
        trade.market.as_deref(),
    ])
    .filter(|id| *id != UNKNOWN_ID)
}

/// An index hit with no volume is as good as a miss for display purposes.
pub fn needs_refetch(hit: Option<&RawMarket>) -> bool {
    hit.is_none_or(|m| is_blank_amount(m.volume.as_ref()))
}

/// Wallet addresses a trade can be attributed to, lowercased.
pub fn trade_wallets(trade: &RawTrade) -> impl Iterator<Item = String> + '_ {
    [
        &trade.proxy_wallet,
        &trade.maker_address,
        &trade.taker_address,
    ]
    .into_iter()
    .flatten()
    .filter(|a| !a.is_empty())
    .map(|a| a.to_lowercase())
}

/// Keep trades where any wallet field matches `watched` (already lowercased).
pub fn filter_by_wallets(trades: Vec<RawTrade>, watched: &HashSet<String>) -> Vec<RawTrade> {
    trades
        .into_iter()
        .filter(|t| trade_wallets(t).any(|w| watched.contains(&w)))
        .collect()
}

fn iso_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Unix seconds scaled to milliseconds. Zero counts as absent.
fn timestamp_millis(trade: &RawTrade) -> Option<i64> {
    parse_f64(trade.timestamp.as_ref())
        .filter(|secs| *secs != 0.0)
        .map(|secs| (secs * 1000.0).round() as i64)
}

fn trade_timestamp(trade: &RawTrade, now: DateTime<Utc>) -> String {
    if let Some(dt) = timestamp_millis(trade).and_then(DateTime::from_timestamp_millis) {
        return iso_millis(dt);
    }
    // Upstream date strings are passed through unvalidated.
    first_present([trade.match_time.as_deref(), trade.created_at.as_deref()])
        .map(str::to_string)
        .unwrap_or_else(|| iso_millis(now))
}

fn text_or(v: Option<&Value>, default: &str) -> String {
    v.and_then(scalar_to_string)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn owned_or(v: Option<&str>, default: &str) -> String {
    v.unwrap_or(default).to_string()
}

/// Build the canonical feed item for one trade. Pure apart from reading `now`
/// for the fallback id and timestamp.
///
/// `position` is the trade's index in the batch and only appears in
/// synthesized ids, which are therefore not stable across calls.
pub fn assemble_item(
    trade: &RawTrade,
    market: Option<&RawMarket>,
    position: usize,
    now: DateTime<Utc>,
) -> FeedItem {
    let market = market.cloned().map(normalize_volume);
    let m = market.as_ref();

    let transaction_hash = first_present([
        trade.transaction_hash.as_deref(),
        trade.legacy_transaction_hash.as_deref(),
    ]);
    let id = first_present([transaction_hash, trade.id.as_deref()])
        .map(str::to_string)
        .unwrap_or_else(|| format!("trade-{position}-{}", now.timestamp_millis()));

    let trader = first_present([
        trade.proxy_wallet.as_deref(),
        trade.maker_address.as_deref(),
        trade.taker_address.as_deref(),
    ]);
    let trader_name = first_present([trade.name.as_deref(), trade.pseudonym.as_deref()]);

    let short_ref: String = first_present([trade.condition_id.as_deref(), trade.asset_id.as_deref()])
        .unwrap_or_default()
        .chars()
        .take(10)
        .collect();
    let question = first_present([trade.title.as_deref(), m.and_then(|m| m.question.as_deref())])
        .map(str::to_string)
        .unwrap_or_else(|| format!("Market {short_ref}..."));

    let snapshot = MarketSnapshot {
        id: owned_or(
            first_present([
                m.and_then(|m| m.id.as_deref()),
                trade.condition_id.as_deref(),
                trade.asset_id.as_deref(),
            ]),
            UNKNOWN_ID,
        ),
        question,
        description: owned_or(first_present([m.and_then(|m| m.description.as_deref())]), ""),
        outcomes: m
            .and_then(|m| m.outcomes.clone())
            .unwrap_or_else(|| vec!["Yes".to_string(), "No".to_string()]),
        outcome_prices: m
            .and_then(|m| m.outcome_prices.clone())
            .unwrap_or_else(|| vec!["0.5".to_string(), "0.5".to_string()]),
        volume: text_or(m.and_then(|m| m.volume.as_ref()), "0"),
        liquidity: text_or(m.and_then(|m| m.liquidity.as_ref()), "0"),
        end_date: owned_or(first_present([m.and_then(|m| m.end_date.as_deref())]), ""),
        image: owned_or(
            first_present([m.and_then(|m| m.image.as_deref()), trade.icon.as_deref()]),
            "",
        ),
        icon: owned_or(
            first_present([trade.icon.as_deref(), m.and_then(|m| m.icon.as_deref())]),
            "",
        ),
        active: m.and_then(|m| m.active).unwrap_or(true),
        closed: m.and_then(|m| m.closed).unwrap_or(false),
        market_slug: owned_or(
            first_present([
                trade.slug.as_deref(),
                m.and_then(|m| m.slug.as_deref()),
                m.and_then(|m| m.market_slug.as_deref()),
            ]),
            "",
        ),
        event_slug: owned_or(
            first_present([
                trade.event_slug.as_deref(),
                m.and_then(|m| m.event_slug.as_deref()),
            ]),
            "",
        ),
        condition_id: owned_or(
            first_present([
                trade.condition_id.as_deref(),
                m.and_then(|m| m.condition_id.as_deref()),
                trade.market.as_deref(),
                trade.asset_id.as_deref(),
            ]),
            "",
        ),
    };

    let trade_id = first_present([trade.id.as_deref()])
        .map(str::to_string)
        .or_else(|| timestamp_millis(trade).map(|ms| ms.to_string()));

    FeedItem {
        id,
        kind: FeedItemKind::Trade,
        trader: owned_or(trader, UNKNOWN_TRADER),
        trader_name: trader_name.map(str::to_string),
        market: snapshot,
        outcome: owned_or(first_present([trade.outcome.as_deref()]), "Yes"),
        side: Side::parse_or_buy(trade.side.as_deref()),
        size: trade
            .size
            .as_ref()
            .and_then(scalar_to_string)
            .unwrap_or_else(|| "0".to_string()),
        price: trade
            .price
            .as_ref()
            .and_then(scalar_to_string)
            .unwrap_or_else(|| "0.5".to_string()),
        timestamp: trade_timestamp(trade, now),
        transaction_hash: transaction_hash.map(str::to_string),
        trade_id,
    }
}
