//! Multi-exchange quote aggregator.
//!
//! Fires one request per (exchange, symbol) pair as a single concurrent
//! wave, drops whatever fails, and regroups the survivors per symbol.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::exchanges::QuoteSource;
use crate::types::{Quote, QuoteSnapshot};

/// Fetches and regroups quotes from a `QuoteSource`.
#[derive(Clone)]
pub struct QuoteAggregator {
    source: Arc<dyn QuoteSource>,
}

impl QuoteAggregator {
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self { source }
    }

    /// Fetch every (exchange, symbol) quote concurrently.
    ///
    /// Failed fetches are logged and left out of the snapshot. A symbol is
    /// present only if at least one exchange returned a quote for it.
    /// Symbols and the exchanges within each symbol keep the order given.
    pub async fn fetch_all(&self, exchanges: &[String], symbols: &[String]) -> QuoteSnapshot {
        let waves = exchanges
            .iter()
            .map(|exchange| self.fetch_exchange(exchange, symbols));
        let mut per_exchange = join_all(waves).await;

        for (exchange, wave) in exchanges.iter().zip(&per_exchange) {
            if wave.failed > 0 {
                warn!(
                    exchange = %exchange,
                    failed = wave.failed,
                    requested = symbols.len(),
                    "Quote fetches failed this cycle"
                );
            }
        }

        let mut snapshot = QuoteSnapshot::new();
        let mut total = 0usize;

        for symbol in symbols {
            for (exchange, wave) in exchanges.iter().zip(per_exchange.iter_mut()) {
                let Some(quote) = wave.quotes.remove(symbol) else {
                    continue;
                };
                total += 1;
                snapshot
                    .entry(symbol.clone())
                    .or_default()
                    .insert(exchange.clone(), quote);
            }
        }

        debug!(
            quotes = total,
            requested = exchanges.len() * symbols.len(),
            symbols = snapshot.len(),
            "Quote wave complete"
        );

        snapshot
    }

    /// All symbols for one exchange, concurrently. Keeps the successes.
    async fn fetch_exchange(&self, exchange: &str, symbols: &[String]) -> ExchangeWave {
        let fetches = symbols.iter().map(|symbol| async move {
            (symbol, self.source.fetch_quote(exchange, symbol).await)
        });

        let mut wave = ExchangeWave::default();
        for (symbol, result) in join_all(fetches).await {
            match result {
                Ok(quote) => {
                    wave.quotes.insert(symbol.clone(), quote);
                }
                Err(e) => {
                    debug!(exchange, symbol = %symbol, error = %e, "Quote fetch failed, skipping");
                    wave.failed += 1;
                }
            }
        }
        wave
    }
}

/// One exchange's share of a quote wave.
#[derive(Default)]
struct ExchangeWave {
    quotes: HashMap<String, Quote>,
    failed: usize,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
