use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::json_util::parse_decimal;
use crate::types::{ForecasterStats, RawTrade};

/// Price below which a buy (or above which a sell) is counted as a likely win.
const WIN_PRICE_THRESHOLD: Decimal = dec!(0.5);

/// Win rate reported for a trader with no trades.
const NEUTRAL_WIN_RATE: f64 = 0.5;

/// Share of the edge over 50% that is booked as estimated P&L.
const PNL_EDGE_FACTOR: f64 = 0.5;

fn side_is(trade: &RawTrade, side: &str) -> bool {
    trade
        .side
        .as_deref()
        .is_some_and(|s| s.trim().eq_ignore_ascii_case(side))
}

/// Heuristic: cheap buys and expensive sells tend to be the winning side.
fn is_estimated_win(trade: &RawTrade) -> bool {
    let price = parse_decimal(trade.price.as_ref()).unwrap_or(Decimal::ZERO);
    (side_is(trade, "BUY") && price < WIN_PRICE_THRESHOLD)
        || (side_is(trade, "SELL") && price > WIN_PRICE_THRESHOLD)
}

/// Notional of one trade; unparseable size or price counts as zero.
fn notional(trade: &RawTrade) -> Decimal {
    let size = parse_decimal(trade.size.as_ref()).unwrap_or(Decimal::ZERO);
    let price = parse_decimal(trade.price.as_ref()).unwrap_or(Decimal::ZERO);
    size.checked_mul(price).unwrap_or(Decimal::ZERO)
}

/// Total notional, saturating at `Decimal::MAX` instead of overflowing.
fn sum_notional(trades: &[RawTrade]) -> Decimal {
    trades.iter().map(notional).fold(Decimal::ZERO, |acc, n| {
        acc.checked_add(n).unwrap_or_else(|| {
            warn!("Trade volume overflowed; clamping to maximum");
            if n.is_sign_negative() { Decimal::MIN } else { Decimal::MAX }
        })
    })
}

/// Aggregate a trader's recent trades.
///
/// Win rate and P&L are estimates from entry prices only; resolved outcomes
/// are never consulted.
pub fn compute_forecaster_stats(
    address: &str,
    trades: Vec<RawTrade>,
    recent_limit: usize,
) -> ForecasterStats {
    let total_trades = trades.len();
    let total_volume = sum_notional(&trades);
    let wins = trades.iter().filter(|t| is_estimated_win(t)).count();

    let total_volume = total_volume.to_f64().unwrap_or(0.0);
    let win_rate = if total_trades > 0 {
        wins as f64 / total_trades as f64
    } else {
        NEUTRAL_WIN_RATE
    };
    let pnl = total_volume * (win_rate - NEUTRAL_WIN_RATE) * PNL_EDGE_FACTOR;

    let mut recent_trades = trades;
    recent_trades.truncate(recent_limit);

    ForecasterStats {
        address: address.to_string(),
        total_trades,
        total_volume,
        win_rate,
        pnl,
        recent_trades,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn trades(values: Vec<serde_json::Value>) -> Vec<RawTrade> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).expect("valid test trade JSON"))
            .collect()
    }

    #[test]
    fn no_trades_is_neutral() {
        let stats = compute_forecaster_stats("0xabc", Vec::new(), 20);
        assert_eq!(stats.total_trades, 0);
        assert!(approx_eq(stats.total_volume, 0.0));
        assert!(approx_eq(stats.win_rate, 0.5));
        assert!(approx_eq(stats.pnl, 0.0));
        assert!(stats.recent_trades.is_empty());
    }

    #[test]
    fn volume_mixes_numbers_and_strings() {
        let stats = compute_forecaster_stats(
            "0xabc",
            trades(vec![
                json!({"side": "BUY", "size": 100, "price": "0.25"}),
                json!({"side": "SELL", "size": "40", "price": 0.5}),
                json!({"side": "BUY", "size": "oops", "price": 0.9}),
            ]),
            20,
        );
        assert_eq!(stats.total_trades, 3);
        assert!(approx_eq(stats.total_volume, 45.0));
    }

    #[test]
    fn huge_volume_saturates() {
        let stats = compute_forecaster_stats(
            "0xabc",
            trades(vec![
                json!({"side": "BUY", "size": "79228162514264337593543950335", "price": "1"}),
                json!({"side": "BUY", "size": "79228162514264337593543950335", "price": "1"}),
            ]),
            20,
        );
        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.total_volume, Decimal::MAX.to_f64().unwrap());
        assert!(stats.pnl.is_finite());
    }

    #[test]
    fn win_heuristic() {
        let stats = compute_forecaster_stats(
            "0xabc",
            trades(vec![
                json!({"side": "BUY", "size": 10, "price": 0.2}),  // win
                json!({"side": "SELL", "size": 10, "price": 0.8}), // win
                json!({"side": "BUY", "size": 10, "price": 0.5}),  // not strictly below
                json!({"side": "SELL", "size": 10, "price": 0.3}), // loss
            ]),
            20,
        );
        assert!(approx_eq(stats.win_rate, 0.5));
        assert!(approx_eq(stats.pnl, 0.0));
    }

    #[test]
    fn pnl_scales_with_edge() {
        let stats = compute_forecaster_stats(
            "0xabc",
            trades(vec![
                json!({"side": "buy", "size": 100, "price": 0.4}),
                json!({"side": "BUY", "size": 100, "price": 0.4}),
            ]),
            20,
        );
        assert!(approx_eq(stats.win_rate, 1.0));
        assert!(approx_eq(stats.total_volume, 80.0));
        // 80 * (1.0 - 0.5) * 0.5
        assert!(approx_eq(stats.pnl, 20.0));
    }

    #[test]
    fn missing_side_never_wins() {
        let stats = compute_forecaster_stats(
            "0xabc",
            trades(vec![json!({"size": 10, "price": 0.1})]),
            20,
        );
        assert!(approx_eq(stats.win_rate, 0.0));
    }

    #[test]
    fn recent_trades_truncated_in_order() {
        let input = trades((0..5).map(|i| json!({"id": format!("t{i}")})).collect());
        let stats = compute_forecaster_stats("0xabc", input, 2);
        assert_eq!(stats.total_trades, 5);
        let ids: Vec<_> = stats
            .recent_trades
            .iter()
            .map(|t| t.id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["t0", "t1"]);
    }

    #[test]
    fn serializes_camel_case() {
        let stats = compute_forecaster_stats("0xabc", Vec::new(), 20);
        let v = serde_json::to_value(&stats).unwrap();
        assert_eq!(v["address"], "0xabc");
        assert_eq!(v["totalTrades"], 0);
        assert_eq!(v["winRate"], 0.5);
        assert_eq!(v["recentTrades"], json!([]));
    }
}
