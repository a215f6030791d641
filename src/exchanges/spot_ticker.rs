//! Binance-style spot ticker client.
//!
//! Binance and MEXC both serve `GET /api/v3/ticker/24hr?symbol=BTCUSDT`
//! with the same camelCase body, so one client covers both venues.
//!
//! Binance: https://api.binance.com  (weight 2 per symbol)
//! MEXC:    https://api.mexc.com

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{build_http, parse_price, split_symbol, ExchangeClient, FetchError};
use crate::types::Quote;

const BINANCE_BASE_URL: &str = "https://api.binance.com";
const MEXC_BASE_URL: &str = "https://api.mexc.com";

/// `/api/v3/ticker/24hr` body. Only the fields we need.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    #[serde(default)]
    bid_price: Option<String>,
    #[serde(default)]
    ask_price: Option<String>,
    #[serde(default)]
    last_price: Option<String>,
    /// Close of the rolling window (ms since epoch).
    #[serde(default)]
    close_time: Option<i64>,
}

/// Public 24h ticker client for Binance-compatible venues.
pub struct SpotTickerClient {
    http: Client,
    id: String,
    base_url: String,
}

impl SpotTickerClient {
    pub fn binance(request_timeout: Duration) -> Result<Self> {
        Self::with_base_url("binance", BINANCE_BASE_URL, request_timeout)
    }

    pub fn mexc(request_timeout: Duration) -> Result<Self> {
        Self::with_base_url("mexc", MEXC_BASE_URL, request_timeout)
    }

    /// Point a client at any Binance-compatible REST host.
    pub fn with_base_url(id: &str, base_url: &str, request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http(request_timeout, id)?,
            id: id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// "BTC/USDT" -> "BTCUSDT"
    fn venue_symbol(symbol: &str) -> Result<String, FetchError> {
        let (base, quote) = split_symbol(symbol)?;
        Ok(format!("{base}{quote}").to_uppercase())
    }

    fn to_quote(&self, symbol: &str, ticker: Ticker24h) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            exchange: self.id.clone(),
            bid: parse_price(ticker.bid_price.as_deref()),
            ask: parse_price(ticker.ask_price.as_deref()),
            last: parse_price(ticker.last_price.as_deref()),
            timestamp: ticker
                .close_time
                .unwrap_or_else(|| Utc::now().timestamp_millis()),
        }
    }
}

#[async_trait]
impl ExchangeClient for SpotTickerClient {
    async fn fetch_ticker(&self, symbol: &str) -> Result<Quote, FetchError> {
        let venue_symbol = Self::venue_symbol(symbol)?;
        let url = format!(
            "{}/api/v3/ticker/24hr?symbol={}",
            self.base_url,
            urlencoding::encode(&venue_symbol),
        );

        debug!(exchange = %self.id, url = %url, "Fetching ticker");

        let http_err = |source| FetchError::Http {
            exchange: self.id.clone(),
            source,
        };

        let resp = self.http.get(&url).send().await.map_err(http_err)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                exchange: self.id.clone(),
                status: status.to_string(),
                body,
            });
        }

        let ticker: Ticker24h = resp.json().await.map_err(|e| FetchError::Decode {
            exchange: self.id.clone(),
            message: e.to_string(),
        })?;

        Ok(self.to_quote(symbol, ticker))
    }

    fn id(&self) -> &str {
        &self.id
    }
}
