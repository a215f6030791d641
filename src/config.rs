//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has defaults, so an empty file (or a file that only
//! overrides a few keys) yields a runnable configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::ArbError;

/// Top 50 USDT spot pairs scanned when no symbol list is configured.
const DEFAULT_SYMBOLS: [&str; 50] = [
    "BTC/USDT", "ETH/USDT", "BNB/USDT", "SOL/USDT", "XRP/USDT",
    "USDC/USDT", "DOGE/USDT", "ADA/USDT", "AVAX/USDT", "TRX/USDT",
    "MATIC/USDT", "LINK/USDT", "DOT/USDT", "UNI/USDT", "LTC/USDT",
    "ATOM/USDT", "ETC/USDT", "XLM/USDT", "ALGO/USDT", "VET/USDT",
    "FIL/USDT", "ICP/USDT", "APT/USDT", "ARB/USDT", "OP/USDT",
    "NEAR/USDT", "AAVE/USDT", "MKR/USDT", "SAND/USDT", "MANA/USDT",
    "AXS/USDT", "GALA/USDT", "ENJ/USDT", "CHZ/USDT", "FLOW/USDT",
    "EGLD/USDT", "HBAR/USDT", "THETA/USDT", "ZIL/USDT", "IOTA/USDT",
    "EOS/USDT", "XTZ/USDT", "WAVES/USDT", "KSM/USDT", "GRT/USDT",
    "SNX/USDT", "COMP/USDT", "YFI/USDT", "SUSHI/USDT", "CRV/USDT",
];

const DEFAULT_EXCHANGES: [&str; 3] = ["binance", "mexc", "kucoin"];

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub ticker: TickerConfig,
    #[serde(default)]
    pub exchanges: ExchangesConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Parameters of the opportunity scan loop. Fixed for a scheduler run.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Unified `BASE/QUOTE` symbols, in scan order.
    pub symbols: Vec<String>,
    /// Exchange ids, in fetch order.
    pub exchanges: Vec<String>,
    #[serde(rename = "scan_interval_secs")]
    pub scan_interval_seconds: f64,
    /// Taker fee per leg as a fraction (0.001 = 0.1%).
    pub taker_fee_per_trade: f64,
    /// Minimum net profit as a fraction (0.005 = 0.5%).
    pub min_net_profit_pct: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            exchanges: DEFAULT_EXCHANGES.iter().map(|s| s.to_string()).collect(),
            scan_interval_seconds: 3.0,
            taker_fee_per_trade: 0.001,
            min_net_profit_pct: 0.005,
        }
    }
}

impl ScanConfig {
    /// Check the invariants the scheduler relies on.
    pub fn validate(&self) -> std::result::Result<(), ArbError> {
        if !(self.scan_interval_seconds.is_finite() && self.scan_interval_seconds > 0.0) {
            return Err(ArbError::Config(format!(
                "scan_interval_secs must be positive, got {}",
                self.scan_interval_seconds
            )));
        }
        if !(self.taker_fee_per_trade.is_finite() && self.taker_fee_per_trade >= 0.0) {
            return Err(ArbError::Config(format!(
                "taker_fee_per_trade must be non-negative, got {}",
                self.taker_fee_per_trade
            )));
        }
        if !self.min_net_profit_pct.is_finite() {
            return Err(ArbError::Config("min_net_profit_pct must be finite".into()));
        }
        if self.symbols.is_empty() {
            return Err(ArbError::Config("at least one symbol is required".into()));
        }
        if self.exchanges.is_empty() {
            return Err(ArbError::Config("at least one exchange is required".into()));
        }
        Ok(())
    }

    /// Pause between scan cycles.
    ///
    /// Call after `validate()`; a non-positive interval maps to zero.
    pub fn scan_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.scan_interval_seconds).unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TickerConfig {
    pub interval_secs: f64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self { interval_secs: 1.0 }
    }
}

impl TickerConfig {
    pub fn validate(&self) -> std::result::Result<(), ArbError> {
        if !(self.interval_secs.is_finite() && self.interval_secs > 0.0) {
            return Err(ArbError::Config(format!(
                "ticker interval_secs must be positive, got {}",
                self.interval_secs
            )));
        }
        Ok(())
    }

    /// Pause between ticker summaries. Call after `validate()`.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_secs).unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExchangesConfig {
    /// Per-request HTTP timeout for exchange clients.
    pub request_timeout_secs: u64,
}

impl Default for ExchangesConfig {
    fn default() -> Self {
        Self { request_timeout_secs: 10 }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Check every section the loops depend on.
    pub fn validate(&self) -> std::result::Result<(), ArbError> {
        self.scan.validate()?;
        self.ticker.validate()
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }
}
