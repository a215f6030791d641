//! Per-symbol ticker summaries for the price board.

use std::collections::BTreeMap;

use crate::types::{ExchangePrice, QuoteSnapshot, TickerSummary};

/// Mean last price per symbol over the exchanges that reported one.
///
/// Symbols where no exchange reported a usable last price are left out.
pub fn summarize_tickers(snapshot: &QuoteSnapshot) -> BTreeMap<String, TickerSummary> {
    let mut summaries = BTreeMap::new();

    for (symbol, quotes) in snapshot {
        let prices: Vec<ExchangePrice> = quotes
            .iter()
            .filter_map(|(exchange, quote)| {
                quote.usable_last().map(|price| ExchangePrice {
                    exchange: exchange.clone(),
                    price,
                })
            })
            .collect();

        if prices.is_empty() {
            continue;
        }

        let avg_price = prices.iter().map(|p| p.price).sum::<f64>() / prices.len() as f64;
        summaries.insert(
            symbol.clone(),
            TickerSummary {
                symbol: symbol.clone(),
                avg_price,
                exchanges: prices,
            },
        );
    }

    summaries
}
