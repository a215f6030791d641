//! Cross-exchange spread detection.
//!
//! For each symbol, tries every ordered (buy, sell) pair of exchanges,
//! buying at the ask on one venue and selling at the bid on another,
//! and keeps the single best pairing net of round-trip taker fees.

use tracing::debug;

use crate::config::ScanConfig;
use crate::types::{Opportunity, QuoteSnapshot, SymbolQuoteSet};

/// Gross spread as a percentage of the buy price.
///
/// A non-positive buy price yields zero.
pub fn calculate_gross_profit_pct(buy_price: f64, sell_price: f64) -> f64 {
    if buy_price <= 0.0 {
        return 0.0;
    }
    (sell_price - buy_price) / buy_price * 100.0
}

/// Fee and threshold settings for detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArbConfig {
    /// Taker fee per leg as a fraction.
    pub taker_fee_per_trade: f64,
    /// Minimum net profit as a fraction.
    pub min_net_profit_pct: f64,
}

impl Default for ArbConfig {
    fn default() -> Self {
        Self {
            taker_fee_per_trade: 0.001,
            min_net_profit_pct: 0.005,
        }
    }
}

impl From<&ScanConfig> for ArbConfig {
    fn from(cfg: &ScanConfig) -> Self {
        Self {
            taker_fee_per_trade: cfg.taker_fee_per_trade,
            min_net_profit_pct: cfg.min_net_profit_pct,
        }
    }
}

/// Finds the best buy-low / sell-high pairing per symbol.
///
/// Pure and synchronous: no I/O, no clock, no shared state.
#[derive(Debug, Clone, Default)]
pub struct ArbDetector {
    config: ArbConfig,
}

impl ArbDetector {
    pub fn new(config: ArbConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArbConfig {
        &self.config
    }

    /// Fees for one taker buy plus one taker sell, in percent.
    pub fn round_trip_fee_pct(&self) -> f64 {
        2.0 * self.config.taker_fee_per_trade * 100.0
    }

    /// Net profit threshold in percent.
    pub fn threshold_pct(&self) -> f64 {
        self.config.min_net_profit_pct * 100.0
    }

    pub fn calculate_net_profit_pct(&self, buy_price: f64, sell_price: f64) -> f64 {
        calculate_gross_profit_pct(buy_price, sell_price) - self.round_trip_fee_pct()
    }

    /// Best profitable pairing for one symbol, or `None`.
    ///
    /// Exchanges without a usable ask cannot be the buy leg; exchanges
    /// without a usable bid cannot be the sell leg. Ties keep the first
    /// pair in exchange order.
    pub fn detect(&self, symbol: &str, quotes: &SymbolQuoteSet) -> Option<Opportunity> {
        if quotes.len() < 2 {
            return None;
        }

        let fee_pct = self.round_trip_fee_pct();
        let mut best: Option<Opportunity> = None;

        for (buy_exchange, buy_quote) in quotes {
            let Some(ask) = buy_quote.usable_ask() else {
                continue;
            };

            for (sell_exchange, sell_quote) in quotes {
                if sell_exchange == buy_exchange {
                    continue;
                }
                let Some(bid) = sell_quote.usable_bid() else {
                    continue;
                };
                if bid <= ask {
                    continue;
                }

                let gross = calculate_gross_profit_pct(ask, bid);
                if gross <= 0.0 {
                    continue;
                }
                let net = gross - fee_pct;

                let better = best.as_ref().map_or(true, |b| net > b.net_profit_pct);
                if better {
                    best = Some(Opportunity {
                        symbol: symbol.to_string(),
                        buy_exchange: buy_exchange.clone(),
                        buy_price: ask,
                        sell_exchange: sell_exchange.clone(),
                        sell_price: bid,
                        gross_profit_pct: gross,
                        net_profit_pct: net,
                        timestamp: buy_quote.timestamp,
                    });
                }
            }
        }

        let threshold = self.threshold_pct();
        match best {
            Some(opp) if opp.net_profit_pct > threshold => {
                debug!(
                    symbol,
                    buy = %opp.buy_exchange,
                    sell = %opp.sell_exchange,
                    net_pct = opp.net_profit_pct,
                    "Spread above threshold"
                );
                Some(opp)
            }
            _ => None,
        }
    }

    /// Run `detect` over every symbol and return the hits, best first.
    ///
    /// The sort is stable: equal net profits keep snapshot order.
    pub fn scan_all_symbols(&self, snapshot: &QuoteSnapshot) -> Vec<Opportunity> {
        let mut opportunities: Vec<Opportunity> = snapshot
            .iter()
            .filter_map(|(symbol, quotes)| self.detect(symbol, quotes))
            .collect();

        opportunities.sort_by(|a, b| b.net_profit_pct.total_cmp(&a.net_profit_pct));
        opportunities
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
