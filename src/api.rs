use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::{FeedError, FeedResult};
use crate::types::{RawMarket, RawTrade};

/// Parameters for `GET {data}/trades`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradesRequest {
    pub limit: u32,
    /// Restrict to one trader's proxy wallet.
    pub user: Option<String>,
    /// Minimum cash size; sent as `filterType=CASH&filterAmount=N` when positive.
    pub min_cash: Option<Decimal>,
}

impl TradesRequest {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if let Some(user) = &self.user {
            params.push(("user", user.clone()));
        }
        if let Some(min) = self.min_cash.filter(|m| *m > Decimal::ZERO) {
            params.push(("filterType", "CASH".to_string()));
            params.push(("filterAmount", min.normalize().to_string()));
        }
        params
    }
}

/// Parameters for `GET {gamma}/markets`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketsRequest {
    pub limit: u32,
    /// Adds `closed=false`.
    pub open_only: bool,
}

impl MarketsRequest {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", self.limit.to_string()),
            ("active", "true".to_string()),
        ];
        if self.open_only {
            params.push(("closed", "false".to_string()));
        }
        params
    }
}

/// Single-market lookup used to backfill trades the index could not serve.
///
/// `Ok(None)` means upstream has no such market; errors are transport or
/// decoding failures. Callers treat both as "no better data".
#[async_trait]
pub trait MarketFetcher: Send + Sync {
    async fn fetch_market(&self, id: &str) -> Result<Option<RawMarket>>;
}

/// Everything the feed endpoints read from Polymarket.
#[async_trait]
pub trait PolymarketApi: MarketFetcher {
    async fn fetch_trades(&self, req: &TradesRequest) -> FeedResult<Vec<RawTrade>>;

    async fn fetch_markets(&self, req: &MarketsRequest) -> FeedResult<Vec<RawMarket>>;
}

/// Validate an upstream body as a JSON array, or an object wrapping one under
/// the `source` key (`{"trades": [...]}`).
pub fn parse_array(text: &str, source: &str) -> FeedResult<Vec<Value>> {
    if text.trim().is_empty() {
        return Err(FeedError::UpstreamMalformed(
            "Empty response from Polymarket".to_string(),
        ));
    }
    let body: Value = serde_json::from_str(text).map_err(|e| {
        let preview: String = text.chars().take(200).collect();
        error!("Failed to parse {source} response ({e}): {preview}");
        FeedError::UpstreamMalformed("Invalid JSON from Polymarket".to_string())
    })?;
    let kind = json_kind(&body);
    let items = match body {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove(source) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    };
    items.ok_or_else(|| {
        error!("{source} response is not an array: {kind}");
        FeedError::UpstreamMalformed("Unexpected response format".to_string())
    })
}

/// Decode each element, dropping the ones that are not records.
pub fn decode_records<T: DeserializeOwned>(items: Vec<Value>, source: &str) -> Vec<T> {
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed {source} record: {e}");
                None
            }
        })
        .collect();
    debug!("Decoded {}/{} {source} records", decoded.len(), total);
    decoded
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `base` with `segments` appended as percent-encoded path segments.
fn endpoint(base: &Url, segments: &[&str]) -> FeedResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| FeedError::internal("Invalid upstream base URL", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// reqwest-backed client for the public Data and Gamma APIs (no auth).
pub struct PolymarketHttp {
    client: reqwest::Client,
    data_api_base: Url,
    gamma_api_base: Url,
}

impl PolymarketHttp {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            data_api_base: config.data_api_base.clone(),
            gamma_api_base: config.gamma_api_base.clone(),
        })
    }

    async fn get_array(
        &self,
        url: Url,
        query: &[(&'static str, String)],
        source: &str,
    ) -> FeedResult<Vec<Value>> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!("Polymarket {source} request failed: {e}");
                FeedError::UpstreamUnavailable(format!("Polymarket {source} request failed"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            error!("Polymarket {source} API error: {status}");
            return Err(FeedError::UpstreamUnavailable(format!(
                "Polymarket API returned {}",
                status.as_u16()
            )));
        }

        let text = resp.text().await.map_err(|e| {
            error!("Failed to read Polymarket {source} body: {e}");
            FeedError::UpstreamUnavailable(format!("Polymarket {source} body could not be read"))
        })?;
        parse_array(&text, source)
    }
}

#[async_trait]
impl MarketFetcher for PolymarketHttp {
    async fn fetch_market(&self, id: &str) -> Result<Option<RawMarket>> {
        let url = endpoint(&self.gamma_api_base, &["markets", id])?;
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            anyhow::bail!("gamma returned {status} for market {id}");
        }
        let body: Value = resp.json().await.context("decode gamma market")?;
        let record = match body {
            Value::Array(items) => items.into_iter().next(),
            Value::Null => None,
            other => Some(other),
        };
        record
            .map(serde_json::from_value::<RawMarket>)
            .transpose()
            .context("decode gamma market")
    }
}

#[async_trait]
impl PolymarketApi for PolymarketHttp {
    async fn fetch_trades(&self, req: &TradesRequest) -> FeedResult<Vec<RawTrade>> {
        let url = endpoint(&self.data_api_base, &["trades"])?;
        let items = self.get_array(url, &req.query(), "trades").await?;
        Ok(decode_records(items, "trade"))
    }

    async fn fetch_markets(&self, req: &MarketsRequest) -> FeedResult<Vec<RawMarket>> {
        let url = endpoint(&self.gamma_api_base, &["markets"])?;
        let items = self.get_array(url, &req.query(), "markets").await?;
        Ok(decode_records(items, "market"))
    }
}
