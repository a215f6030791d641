//! Connectivity check: fetch one ticker from every configured exchange.
//!
//! Usage: `check_exchanges [SYMBOL]` (defaults to the first configured
//! symbol). Exits with status 1 if any exchange fails.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use arbscan::config::AppConfig;
use arbscan::exchanges::{ExchangeRegistry, QuoteSource};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("arbscan=warn")),
        )
        .init();

    let cfg = if Path::new("config.toml").exists() {
        AppConfig::load("config.toml")?
    } else {
        AppConfig::default()
    };

    let symbol = std::env::args()
        .nth(1)
        .or_else(|| cfg.scan.symbols.first().cloned())
        .unwrap_or_else(|| "BTC/USDT".to_string());

    let registry = ExchangeRegistry::from_config(
        &cfg.scan.exchanges,
        Duration::from_secs(cfg.exchanges.request_timeout_secs),
    )?;

    println!("Checking {} exchange(s) with {symbol}\n", cfg.scan.exchanges.len());

    let mut failures = 0usize;
    for exchange in &cfg.scan.exchanges {
        match registry.fetch_quote(exchange, &symbol).await {
            Ok(quote) => println!("  OK    {quote}"),
            Err(e) => {
                failures += 1;
                println!("  FAIL  [{exchange}] {e}");
            }
        }
    }

    println!();
    if failures > 0 {
        println!("{failures} exchange(s) failed");
        std::process::exit(1);
    }
    println!("All exchanges reachable");
    Ok(())
}
