//! Mock quote source for integration testing.
//!
//! Provides a deterministic `QuoteSource` that serves a fixed book per
//! (exchange, symbol), entirely in-memory with no network access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arbscan::exchanges::{FetchError, QuoteSource};
use arbscan::types::Quote;

/// A mock quote source with controllable books.
///
/// Pairs without a configured book answer `FetchError::NoData`.
#[derive(Clone, Default)]
pub struct MockQuoteSource {
    books: Arc<Mutex<HashMap<(String, String), Quote>>>,
    calls: Arc<AtomicUsize>,
    /// If set, every fetch fails with `UnknownExchange`.
    force_error: Arc<Mutex<bool>>,
}

impl MockQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bid` / `ask` for `symbol` on `exchange`. Last is the mid.
    pub fn set_book(&self, exchange: &str, symbol: &str, bid: Option<f64>, ask: Option<f64>) {
        let last = match (bid, ask) {
            (Some(b), Some(a)) => Some((b + a) / 2.0),
            (b, a) => b.or(a),
        };
        let quote = Quote {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            bid,
            ask,
            last,
            timestamp: 1_700_000_000_000,
        };
        self.books
            .lock()
            .unwrap()
            .insert((exchange.to_string(), symbol.to_string()), quote);
    }

    /// Force all subsequent fetches to fail.
    pub fn set_error(&self) {
        *self.force_error.lock().unwrap() = true;
    }

    /// Clear any forced error.
    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = false;
    }

    /// Number of fetches served or failed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    async fn fetch_quote(&self, exchange: &str, symbol: &str) -> Result<Quote, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if *self.force_error.lock().unwrap() {
            return Err(FetchError::UnknownExchange(exchange.to_string()));
        }

        self.books
            .lock()
            .unwrap()
            .get(&(exchange.to_string(), symbol.to_string()))
            .cloned()
            .ok_or_else(|| FetchError::NoData {
                exchange: exchange.to_string(),
                symbol: symbol.to_string(),
            })
    }
}
