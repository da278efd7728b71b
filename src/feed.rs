//! Feed assembly: index the market list, resolve each trade's market (with a
//! per-trade Gamma backfill), then build canonical feed items.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::api::{MarketFetcher, MarketsRequest, PolymarketApi, TradesRequest};
use crate::engine::{
    MarketIndex, assemble_item, build_index, filter_by_wallets, needs_refetch, normalize_volume,
    secondary_lookup_id,
};
use crate::error::FeedResult;
use crate::types::{FeedItem, RawMarket, RawTrade};

/// Resolve the market for one trade.
///
/// Index hit first; when that misses or has no volume, one Gamma lookup by the
/// trade's first usable identifier. A failed lookup is logged and the index hit
/// (possibly `None`) is kept.
pub async fn resolve_market<F>(
    trade: &RawTrade,
    index: &MarketIndex,
    fetcher: &F,
) -> Option<Arc<RawMarket>>
where
    F: MarketFetcher + ?Sized,
{
    let hit = index.lookup_trade(trade);
    if !needs_refetch(hit.as_deref()) {
        return hit;
    }
    let Some(id) = secondary_lookup_id(trade) else {
        return hit;
    };

    match fetcher.fetch_market(id).await {
        Ok(Some(fetched)) => {
            debug!("Backfilled market {id} from gamma");
            Some(Arc::new(normalize_volume(fetched)))
        }
        Ok(None) => hit,
        Err(e) => {
            warn!("Failed to fetch market {id}: {e}");
            hit
        }
    }
}

/// Build feed items for `trades` against an already-fetched market list.
///
/// Lookups for different trades run concurrently and only read the index.
/// Output order matches `trades`.
pub async fn assemble_feed<F>(
    trades: &[RawTrade],
    markets: Vec<RawMarket>,
    fetcher: &F,
) -> Vec<FeedItem>
where
    F: MarketFetcher + ?Sized,
{
    let index = build_index(markets);
    debug!("Market index holds {} keys", index.len());
    let now = Utc::now();

    let index = &index;
    join_all(trades.iter().enumerate().map(|(position, trade)| async move {
        let market = resolve_market(trade, index, fetcher).await;
        assemble_item(trade, market.as_deref(), position, now)
    }))
    .await
}

/// One feed page request, shared by the HTTP handlers and the snapshot CLI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedRequest {
    pub limit: u32,
    pub min_amount: Decimal,
    /// When non-empty, keep only trades by these wallets (any case).
    pub addresses: Vec<String>,
    /// Markets fetched to build the index.
    pub markets_limit: u32,
}

/// Fetch trades and markets, then assemble.
///
/// The trades fetch is fatal on failure. The market list only enriches, so a
/// failure there leaves every trade to the per-trade lookup.
pub async fn load_feed<A>(api: &A, req: &FeedRequest) -> FeedResult<Vec<FeedItem>>
where
    A: PolymarketApi + ?Sized,
{
    let trades = api
        .fetch_trades(&TradesRequest {
            limit: req.limit,
            user: None,
            min_cash: Some(req.min_amount),
        })
        .await?;
    info!("Fetched {} trades", trades.len());

    let trades = if req.addresses.is_empty() {
        trades
    } else {
        let watched: HashSet<String> = req.addresses.iter().map(|a| a.to_lowercase()).collect();
        let kept = filter_by_wallets(trades, &watched);
        info!("{} trades match {} watched address(es)", kept.len(), watched.len());
        kept
    };

    if trades.is_empty() {
        return Ok(Vec::new());
    }

    let markets = match api
        .fetch_markets(&MarketsRequest {
            limit: req.markets_limit,
            open_only: false,
        })
        .await
    {
        Ok(markets) => markets,
        Err(e) => {
            warn!("Market list unavailable, relying on per-trade lookups: {e}");
            Vec::new()
        }
    };
    info!("Fetched {} markets", markets.len());

    Ok(assemble_feed(&trades, markets, api).await)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::types::Side;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn trade(v: serde_json::Value) -> RawTrade {
        serde_json::from_value(v).expect("valid test trade JSON")
    }

    fn market(v: serde_json::Value) -> RawMarket {
        serde_json::from_value(v).expect("valid test market JSON")
    }

    /// In-memory Polymarket: canned trades/markets, per-id lookups, call log.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub trades: Vec<RawTrade>,
        pub markets: Vec<RawMarket>,
        pub singles: HashMap<String, RawMarket>,
        pub failing_ids: HashSet<String>,
        pub fail_trades: bool,
        pub fail_markets: bool,
        pub trade_requests: Mutex<Vec<TradesRequest>>,
        pub market_list_calls: AtomicUsize,
        pub single_calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        pub(crate) fn with_trades(trades: Vec<serde_json::Value>) -> Self {
            Self {
                trades: trades.into_iter().map(trade).collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl MarketFetcher for FakeApi {
        async fn fetch_market(&self, id: &str) -> anyhow::Result<Option<RawMarket>> {
            self.single_calls.lock().unwrap().push(id.to_string());
            if self.failing_ids.contains(id) {
                anyhow::bail!("connection reset fetching {id}");
            }
            Ok(self.singles.get(id).cloned())
        }
    }

    #[async_trait]
    impl PolymarketApi for FakeApi {
        async fn fetch_trades(&self, req: &TradesRequest) -> FeedResult<Vec<RawTrade>> {
            self.trade_requests.lock().unwrap().push(req.clone());
            if self.fail_trades {
                return Err(FeedError::UpstreamUnavailable(
                    "Polymarket API returned 503".to_string(),
                ));
            }
            Ok(self.trades.clone())
        }

        async fn fetch_markets(&self, _req: &MarketsRequest) -> FeedResult<Vec<RawMarket>> {
            self.market_list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_markets {
                return Err(FeedError::UpstreamMalformed(
                    "Invalid JSON from Polymarket".to_string(),
                ));
            }
            Ok(self.markets.clone())
        }
    }

    fn page(limit: u32) -> FeedRequest {
        FeedRequest {
            limit,
            min_amount: Decimal::TEN,
            addresses: Vec::new(),
            markets_limit: 100,
        }
    }

    // ── resolve_market ─────────────────────────────────────────────

    #[tokio::test]
    async fn index_hit_with_volume_skips_fetch() {
        let api = FakeApi::default();
        let index = build_index(vec![market(json!({"conditionId": "c1", "volume": "10"}))]);
        let hit = resolve_market(&trade(json!({"conditionId": "c1"})), &index, &api).await;
        assert_eq!(hit.unwrap().volume, Some(json!("10")));
        assert!(api.single_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_volume_hit_is_replaced_by_fetch() {
        let mut api = FakeApi::default();
        api.singles.insert(
            "c1".to_string(),
            market(json!({"conditionId": "c1", "question": "fresh", "totalVolume": "500"})),
        );
        let index = build_index(vec![market(json!({"conditionId": "c1", "question": "stale"}))]);
        let hit = resolve_market(&trade(json!({"conditionId": "c1"})), &index, &api)
            .await
            .unwrap();
        assert_eq!(hit.question.as_deref(), Some("fresh"));
        assert_eq!(hit.volume, Some(json!("500")));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_weak_hit() {
        let mut api = FakeApi::default();
        api.failing_ids.insert("c1".to_string());
        let index = build_index(vec![market(json!({"conditionId": "c1", "question": "stale"}))]);
        let hit = resolve_market(&trade(json!({"conditionId": "c1"})), &index, &api).await;
        assert_eq!(hit.unwrap().question.as_deref(), Some("stale"));
    }

    #[tokio::test]
    async fn miss_fetches_by_first_identifier() {
        let api = FakeApi::default();
        let index = MarketIndex::default();
        let t = trade(json!({"asset": "", "asset_id": "tok", "market": "m1"}));
        assert!(resolve_market(&t, &index, &api).await.is_none());
        assert_eq!(*api.single_calls.lock().unwrap(), vec!["tok".to_string()]);
    }

    #[tokio::test]
    async fn unknown_identifier_is_not_fetched() {
        let api = FakeApi::default();
        let t = trade(json!({"market": "unknown"}));
        assert!(resolve_market(&t, &MarketIndex::default(), &api).await.is_none());
        assert!(api.single_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolves_via_asset_id_only() {
        let api = FakeApi::default();
        let index = build_index(vec![market(json!({
            "clobTokenIds": ["t-legacy"],
            "question": "legacy market",
            "volume": "3"
        }))]);
        let hit = resolve_market(&trade(json!({"asset_id": "t-legacy"})), &index, &api).await;
        assert_eq!(hit.unwrap().question.as_deref(), Some("legacy market"));
    }

    // ── assemble_feed ──────────────────────────────────────────────

    #[tokio::test]
    async fn failing_lookup_does_not_fail_batch() {
        let mut api = FakeApi::default();
        api.failing_ids.insert("cA".to_string());
        api.singles.insert(
            "cB".to_string(),
            market(json!({"conditionId": "cB", "question": "B market", "volume": "7"})),
        );
        let trades = vec![
            trade(json!({"transactionHash": "0xa", "conditionId": "cA"})),
            trade(json!({"transactionHash": "0xb", "conditionId": "cB"})),
        ];
        let items = assemble_feed(&trades, Vec::new(), &api).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "0xa");
        assert_eq!(items[0].market.volume, "0");
        assert_eq!(items[0].market.id, "cA");
        assert_eq!(items[1].id, "0xb");
        assert_eq!(items[1].market.question, "B market");
        assert_eq!(items[1].market.volume, "7");
    }

    #[tokio::test]
    async fn scenario_single_trade() {
        let api = FakeApi::default();
        let trades = vec![trade(json!({
            "id": "t1",
            "conditionId": "c1",
            "side": "SELL",
            "size": 10,
            "price": "0.3",
            "timestamp": 1700000000
        }))];
        let markets = vec![market(json!({
            "id": "c1",
            "conditionId": "c1",
            "question": "Will X happen?",
            "volume": "0",
            "volumeUsd": "42"
        }))];
        let items = assemble_feed(&trades, markets, &api).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "t1");
        assert_eq!(items[0].market.volume, "42");
        assert_eq!(items[0].side, Side::Sell);
        assert_eq!(items[0].timestamp, "2023-11-14T22:13:20.000Z");
        assert!(api.single_calls.lock().unwrap().is_empty());
    }

    // ── load_feed ──────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_trades_skip_market_list() {
        let api = FakeApi::default();
        let items = load_feed(&api, &page(30)).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(api.market_list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn trades_failure_is_fatal() {
        let api = FakeApi {
            fail_trades: true,
            ..FakeApi::default()
        };
        let err = load_feed(&api, &page(30)).await.unwrap_err();
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn market_list_failure_degrades() {
        let mut api = FakeApi::with_trades(vec![json!({"id": "t1", "conditionId": "c1"})]);
        api.fail_markets = true;
        let items = load_feed(&api, &page(30)).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(*api.single_calls.lock().unwrap(), vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn request_carries_limit_and_cash_filter() {
        let api = FakeApi::default();
        load_feed(&api, &page(45)).await.unwrap();
        let reqs = api.trade_requests.lock().unwrap();
        assert_eq!(reqs[0].limit, 45);
        assert_eq!(reqs[0].min_cash, Some(Decimal::TEN));
        assert_eq!(reqs[0].user, None);
    }

    #[tokio::test]
    async fn address_filter_applies_before_assembly() {
        let api = FakeApi::with_trades(vec![
            json!({"id": "keep", "proxyWallet": "0xAAA"}),
            json!({"id": "drop", "proxyWallet": "0xbbb"}),
        ]);
        let req = FeedRequest {
            addresses: vec!["0xaaa".to_string()],
            ..page(100)
        };
        let items = load_feed(&api, &req).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "keep");
        assert_eq!(items[0].trader, "0xAAA");
    }
}
