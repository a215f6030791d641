//! Exchange integrations.
//!
//! Defines the `QuoteSource` trait consumed by the scan engine and the
//! per-venue `ExchangeClient` trait, with public-ticker implementations for:
//! - Binance and MEXC (shared `/api/v3/ticker/24hr` shape)
//! - KuCoin (`/api/v1/market/orderbook/level1`)
//!
//! None of the endpoints used here require API keys.

pub mod kucoin;
pub mod spot_ticker;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::types::{ArbError, Quote};
use kucoin::KucoinClient;
use spot_ticker::SpotTickerClient;

const USER_AGENT: &str = "ARBSCAN/0.1.0 (cross-exchange-scanner)";

/// Failure to obtain a single (exchange, symbol) quote.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Unknown exchange: {0}")]
    UnknownExchange(String),

    #[error("Invalid symbol '{0}', expected BASE/QUOTE")]
    InvalidSymbol(String),

    #[error("HTTP error ({exchange}): {source}")]
    Http {
        exchange: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error ({exchange}) {status}: {body}")]
    Status {
        exchange: String,
        status: String,
        body: String,
    },

    #[error("Malformed response ({exchange}): {message}")]
    Decode { exchange: String, message: String },

    #[error("No data ({exchange}) for {symbol}")]
    NoData { exchange: String, symbol: String },
}

/// Anything that can produce a quote for an (exchange, symbol) pair.
///
/// This is the seam the scan engine depends on. Timeouts and rate
/// limiting are the implementor's business.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the current best bid / ask for `symbol` on `exchange`.
    async fn fetch_quote(&self, exchange: &str, symbol: &str) -> Result<Quote, FetchError>;
}

/// A single venue's public market-data client.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Fetch the current ticker for a unified `BASE/QUOTE` symbol.
    async fn fetch_ticker(&self, symbol: &str) -> Result<Quote, FetchError>;

    /// Exchange identifier used in quotes and configuration.
    fn id(&self) -> &str;
}

/// Routes quote requests to the client registered for each exchange id.
#[derive(Default, Clone)]
pub struct ExchangeRegistry {
    clients: HashMap<String, Arc<dyn ExchangeClient>>,
}

impl ExchangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build clients for every configured exchange id.
    ///
    /// Fails on ids with no known client.
    pub fn from_config(exchanges: &[String], request_timeout: Duration) -> Result<Self> {
        let mut registry = Self::new();
        for id in exchanges {
            let client: Arc<dyn ExchangeClient> = match id.as_str() {
                "binance" => Arc::new(SpotTickerClient::binance(request_timeout)?),
                "mexc" => Arc::new(SpotTickerClient::mexc(request_timeout)?),
                "kucoin" => Arc::new(KucoinClient::new(request_timeout)?),
                other => {
                    return Err(ArbError::Config(format!("unsupported exchange '{other}'")))
                        .context("Failed to build exchange registry");
                }
            };
            registry.register(client);
        }
        info!(exchanges = ?registry.exchange_ids(), "Exchange clients ready");
        Ok(registry)
    }

    /// Add (or replace) the client for its exchange id.
    pub fn register(&mut self, client: Arc<dyn ExchangeClient>) {
        self.clients.insert(client.id().to_string(), client);
    }

    /// Registered exchange ids, sorted.
    pub fn exchange_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.clients.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl QuoteSource for ExchangeRegistry {
    async fn fetch_quote(&self, exchange: &str, symbol: &str) -> Result<Quote, FetchError> {
        let client = self
            .clients
            .get(exchange)
            .ok_or_else(|| FetchError::UnknownExchange(exchange.to_string()))?;
        client.fetch_ticker(symbol).await
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by the venue clients
// ---------------------------------------------------------------------------

/// Split a unified `BASE/QUOTE` symbol.
pub(crate) fn split_symbol(symbol: &str) -> Result<(&str, &str), FetchError> {
    match symbol.split_once('/') {
        Some((base, quote)) if !base.is_empty() && !quote.is_empty() => Ok((base, quote)),
        _ => Err(FetchError::InvalidSymbol(symbol.to_string())),
    }
}

/// Parse a decimal-string price. Empty, unparsable, non-finite or
/// non-positive values mean "no price".
pub(crate) fn parse_price(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p > 0.0)
}

fn build_http(request_timeout: Duration, exchange: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .user_agent(USER_AGENT)
        .build()
        .with_context(|| format!("Failed to build HTTP client for {exchange}"))
}
