//! Open-market listing: question, prices and liquidity numbers per market,
//! ordered by 24h volume.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::json_util::{first_present, parse_f64};
use crate::types::{MarketSummary, RawMarket};

/// Simplify one market; markets without a question are dropped.
pub fn summarize_market(raw: &RawMarket) -> Option<MarketSummary> {
    let question = first_present([raw.question.as_deref()])?.to_string();
    let id = first_present([raw.id.as_deref(), raw.condition_id.as_deref()])
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let prices = raw
        .outcome_prices
        .iter()
        .flatten()
        .map(|p| p.trim().parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0))
        .collect();

    Some(MarketSummary {
        id,
        question,
        description: raw.description.clone(),
        outcomes: raw.outcomes.clone().unwrap_or_default(),
        prices,
        best_bid: parse_f64(raw.best_bid.as_ref()),
        best_ask: parse_f64(raw.best_ask.as_ref()),
        volume24hr: parse_f64(raw.volume24hr.as_ref()),
        volume_num: parse_f64(raw.volume_num.as_ref()),
        liquidity_num: parse_f64(raw.liquidity_num.as_ref()),
        end_date: first_present([raw.end_date.as_deref(), raw.end_date_iso.as_deref()])
            .map(str::to_string),
        slug: raw.slug.clone(),
    })
}

/// RFC 3339 timestamps, or bare `YYYY-MM-DD` dates taken as UTC midnight.
fn parse_end_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// True unless the end date parses and lies in the past.
fn still_open(summary: &MarketSummary, now: DateTime<Utc>) -> bool {
    summary
        .end_date
        .as_deref()
        .and_then(parse_end_date)
        .is_none_or(|end| end > now)
}

fn cmp_volume_desc(a: &MarketSummary, b: &MarketSummary) -> Ordering {
    let va = a.volume24hr.unwrap_or(0.0);
    let vb = b.volume24hr.unwrap_or(0.0);
    vb.partial_cmp(&va).unwrap_or(Ordering::Equal)
}

/// Summaries of still-open markets, highest 24h volume first.
pub fn summarize_markets(markets: &[RawMarket], now: DateTime<Utc>) -> Vec<MarketSummary> {
    let mut out: Vec<MarketSummary> = markets
        .iter()
        .filter_map(summarize_market)
        .filter(|m| still_open(m, now))
        .collect();
    out.sort_by(cmp_volume_desc);
    out
}
