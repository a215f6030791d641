//! KuCoin spot level-1 order book client.
//!
//! API docs: https://www.kucoin.com/docs/rest/spot-trading/market-data/get-ticker
//! Endpoint: GET /api/v1/market/orderbook/level1?symbol=BTC-USDT
//! Envelope: `{"code": "200000", "data": {...}}`; unknown symbols come back
//! with `data: null`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{build_http, parse_price, split_symbol, ExchangeClient, FetchError};
use crate::types::Quote;

const BASE_URL: &str = "https://api.kucoin.com";
const EXCHANGE_ID: &str = "kucoin";
const SUCCESS_CODE: &str = "200000";

#[derive(Debug, Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<Level1>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Level1 {
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    best_bid: Option<String>,
    #[serde(default)]
    best_ask: Option<String>,
}

/// KuCoin public market-data client.
pub struct KucoinClient {
    http: Client,
    base_url: String,
}

impl KucoinClient {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        Self::with_base_url(BASE_URL, request_timeout)
    }

    pub fn with_base_url(base_url: &str, request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http(request_timeout, EXCHANGE_ID)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// "BTC/USDT" -> "BTC-USDT"
    fn venue_symbol(symbol: &str) -> Result<String, FetchError> {
        let (base, quote) = split_symbol(symbol)?;
        Ok(format!("{base}-{quote}").to_uppercase())
    }

    fn to_quote(symbol: &str, envelope: Envelope) -> Result<Quote, FetchError> {
        if envelope.code != SUCCESS_CODE {
            return Err(FetchError::Status {
                exchange: EXCHANGE_ID.to_string(),
                status: envelope.code,
                body: envelope.msg.unwrap_or_default(),
            });
        }

        let level1 = envelope.data.ok_or_else(|| FetchError::NoData {
            exchange: EXCHANGE_ID.to_string(),
            symbol: symbol.to_string(),
        })?;

        Ok(Quote {
            symbol: symbol.to_string(),
            exchange: EXCHANGE_ID.to_string(),
            bid: parse_price(level1.best_bid.as_deref()),
            ask: parse_price(level1.best_ask.as_deref()),
            last: parse_price(level1.price.as_deref()),
            timestamp: level1.time.unwrap_or_else(|| Utc::now().timestamp_millis()),
        })
    }
}

#[async_trait]
impl ExchangeClient for KucoinClient {
    async fn fetch_ticker(&self, symbol: &str) -> Result<Quote, FetchError> {
        let url = format!(
            "{}/api/v1/market/orderbook/level1?symbol={}",
            self.base_url,
            urlencoding::encode(&Self::venue_symbol(symbol)?),
        );

        debug!(url = %url, "Fetching KuCoin level1");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                exchange: EXCHANGE_ID.to_string(),
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                exchange: EXCHANGE_ID.to_string(),
                status: status.to_string(),
                body,
            });
        }

        let envelope: Envelope = resp.json().await.map_err(|e| FetchError::Decode {
            exchange: EXCHANGE_ID.to_string(),
            message: e.to_string(),
        })?;

        Self::to_quote(symbol, envelope)
    }

    fn id(&self) -> &str {
        EXCHANGE_ID
    }
}
