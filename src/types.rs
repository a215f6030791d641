//! Shared types for the ARBSCAN scanner.
//!
//! These types form the data model used across all modules.
//! Exchange clients produce `Quote`s, the detector turns snapshots of
//! them into `Opportunity`s, and the publisher ships `StreamEvent`s.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

/// Best bid / best ask snapshot for one symbol on one exchange.
///
/// Missing sides are `None`. A missing price is never treated as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Unified symbol, e.g. "BTC/USDT".
    pub symbol: String,
    /// Exchange identifier, e.g. "binance".
    pub exchange: String,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    /// Milliseconds since the Unix epoch, as reported by the venue.
    pub timestamp: i64,
}

impl Quote {
    /// The bid, if present and finite.
    pub fn usable_bid(&self) -> Option<f64> {
        self.bid.filter(|p| p.is_finite())
    }

    /// The ask, if present and finite.
    pub fn usable_ask(&self) -> Option<f64> {
        self.ask.filter(|p| p.is_finite())
    }

    /// The last traded price, if present, finite and positive.
    pub fn usable_last(&self) -> Option<f64> {
        self.last.filter(|p| p.is_finite() && *p > 0.0)
    }

    /// Whether either side of the book can take part in detection.
    pub fn is_usable(&self) -> bool {
        self.usable_bid().is_some() || self.usable_ask().is_some()
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |p: Option<f64>| p.map_or_else(|| "-".to_string(), |v| format!("{v}"));
        write!(
            f,
            "[{}] {} bid {} / ask {} (last {})",
            self.exchange,
            self.symbol,
            show(self.bid),
            show(self.ask),
            show(self.last),
        )
    }
}

/// Quotes for one symbol in one scan cycle, keyed by exchange id.
///
/// Iterates in configured exchange order, which fixes the pair order used
/// for tie-breaking in detection.
pub type SymbolQuoteSet = IndexMap<String, Quote>;

/// Quotes for every symbol in one scan cycle, in configured symbol order.
pub type QuoteSnapshot = IndexMap<String, SymbolQuoteSet>;

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

/// A profitable buy-low / sell-high pairing for one symbol.
///
/// The profit percentages are held unrounded and serialised rounded to
/// four decimal places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub symbol: String,
    pub buy_exchange: String,
    pub buy_price: f64,
    pub sell_exchange: String,
    pub sell_price: f64,
    #[serde(serialize_with = "serialize_pct")]
    pub gross_profit_pct: f64,
    #[serde(serialize_with = "serialize_pct")]
    pub net_profit_pct: f64,
    /// Timestamp of the buy-leg quote (ms since epoch).
    pub timestamp: i64,
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: buy {} @ {} -> sell {} @ {} | gross {:.4}% net {:.4}%",
            self.symbol,
            self.buy_exchange,
            self.buy_price,
            self.sell_exchange,
            self.sell_price,
            self.gross_profit_pct,
            self.net_profit_pct,
        )
    }
}

/// Round a percentage to four decimal places.
pub fn round_pct(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn serialize_pct<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_pct(*value))
}

// ---------------------------------------------------------------------------
// Ticker summary
// ---------------------------------------------------------------------------

/// Last traded price on one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangePrice {
    pub exchange: String,
    pub price: f64,
}

/// Mean last price for one symbol across the exchanges that reported one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub symbol: String,
    pub avg_price: f64,
    pub exchanges: Vec<ExchangePrice>,
}

// ---------------------------------------------------------------------------
// Stream events
// ---------------------------------------------------------------------------

/// Event pushed to subscribers, serialised as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Opportunity(Opportunity),
    TickerSummary(BTreeMap<String, TickerSummary>),
}

impl StreamEvent {
    /// Event kind as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Opportunity(_) => "opportunity",
            StreamEvent::TickerSummary(_) => "ticker_summary",
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for ARBSCAN.
#[derive(Debug, thiserror::Error)]
pub enum ArbError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler cannot start from state {0}")]
    NotIdle(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
