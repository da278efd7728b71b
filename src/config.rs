use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::{DATA_API_BASE, GAMMA_API_BASE, USER_AGENT};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

/// Polymarket API endpoints and client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_data_api_base")]
    pub data_api_base: Url,
    #[serde(default = "default_gamma_api_base")]
    pub gamma_api_base: Url,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Page sizes and defaults for the feed endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Minimum cash size of a trade when `minAmount` is not given.
    #[serde(default = "default_min_amount")]
    pub default_min_amount: Decimal,
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Markets fetched to build the lookup index.
    #[serde(default = "default_markets_limit")]
    pub markets_limit: u32,
    /// Trades scanned when filtering by watched addresses.
    #[serde(default = "default_watch_trades_limit")]
    pub watch_trades_limit: u32,
    #[serde(default = "default_forecaster_trades_limit")]
    pub forecaster_trades_limit: u32,
    /// Raw trades echoed back in forecaster stats.
    #[serde(default = "default_recent_trades")]
    pub recent_trades: usize,
    #[serde(default = "default_tape_limit")]
    pub tape_default_limit: u32,
    #[serde(default = "default_tape_max_limit")]
    pub tape_max_limit: u32,
    #[serde(default = "default_summary_markets_limit")]
    pub summary_markets_limit: u32,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_data_api_base() -> Url {
    Url::parse(DATA_API_BASE).expect("DATA_API_BASE is a valid URL")
}

fn default_gamma_api_base() -> Url {
    Url::parse(GAMMA_API_BASE).expect("GAMMA_API_BASE is a valid URL")
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_min_amount() -> Decimal {
    dec!(10)
}

fn default_limit() -> u32 {
    30
}

fn default_markets_limit() -> u32 {
    100
}

fn default_watch_trades_limit() -> u32 {
    100
}

fn default_forecaster_trades_limit() -> u32 {
    100
}

fn default_recent_trades() -> usize {
    20
}

fn default_tape_limit() -> u32 {
    120
}

fn default_tape_max_limit() -> u32 {
    500
}

fn default_summary_markets_limit() -> u32 {
    80
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            data_api_base: default_data_api_base(),
            gamma_api_base: default_gamma_api_base(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_min_amount: default_min_amount(),
            default_limit: default_limit(),
            markets_limit: default_markets_limit(),
            watch_trades_limit: default_watch_trades_limit(),
            forecaster_trades_limit: default_forecaster_trades_limit(),
            recent_trades: default_recent_trades(),
            tape_default_limit: default_tape_limit(),
            tape_max_limit: default_tape_max_limit(),
            summary_markets_limit: default_summary_markets_limit(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// `None` when the file does not exist; read and parse errors still fail.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load_optional(path)? {
            Some(config) => {
                info!("Loaded config from {}", path.display());
                Ok(config)
            }
            None => {
                info!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for base in [&self.upstream.data_api_base, &self.upstream.gamma_api_base] {
            if base.cannot_be_a_base() {
                anyhow::bail!("upstream base URL {base} cannot carry a path");
            }
        }
        if self.upstream.timeout_secs == 0 {
            anyhow::bail!("upstream.timeout_secs must be positive");
        }
        if self.feed.tape_default_limit > self.feed.tape_max_limit {
            anyhow::bail!("feed.tape_default_limit exceeds feed.tape_max_limit");
        }
        Ok(())
    }
}
