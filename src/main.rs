//! ARBSCAN: Cross-Exchange Crypto Arbitrage Scanner
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the exchange clients, and runs the scan and ticker-summary
//! loops behind the WebSocket server until Ctrl+C.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use arbscan::config::AppConfig;
use arbscan::engine::ScanScheduler;
use arbscan::exchanges::{ExchangeRegistry, QuoteSource};
use arbscan::server::{self, Publisher, ServerState};

const BANNER: &str = r#"
    _    ____  ____  ____   ____    _    _   _
   / \  |  _ \| __ )/ ___| / ___|  / \  | \ | |
  / _ \ | |_) |  _ \\___ \| |     / _ \ |  \| |
 / ___ \|  _ <| |_) |___) | |___ / ___ \| |\  |
/_/   \_\_| \_\____/|____/ \____/_/   \_\_| \_|

  Cross-Exchange Crypto Arbitrage Scanner
  v0.1.0
"#;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = if Path::new(&config_path).exists() {
        AppConfig::load(&config_path)?
    } else {
        warn!(path = %config_path, "Config file not found, using defaults");
        AppConfig::default()
    };

    println!("{BANNER}");
    info!(
        symbols = cfg.scan.symbols.len(),
        exchanges = ?cfg.scan.exchanges,
        scan_interval_secs = cfg.scan.scan_interval_seconds,
        ticker_interval_secs = cfg.ticker.interval_secs,
        "ARBSCAN starting up"
    );

    // Fail fast on bad parameters before opening any connection
    cfg.validate().context("Invalid configuration")?;

    // -- Initialise components -------------------------------------------

    let registry = ExchangeRegistry::from_config(
        &cfg.scan.exchanges,
        std::time::Duration::from_secs(cfg.exchanges.request_timeout_secs),
    )?;
    let source: Arc<dyn QuoteSource> = Arc::new(registry);

    let scheduler = Arc::new(ScanScheduler::new(cfg.scan.clone(), source));
    let publisher = Arc::new(Publisher::new());

    let state = Arc::new(ServerState {
        scheduler: scheduler.clone(),
        publisher: publisher.clone(),
    });
    let server_task = server::spawn_server(state, &cfg.server.host, cfg.server.port).await?;

    // -- Loops -----------------------------------------------------------

    let scan_task = {
        let scheduler = scheduler.clone();
        let publisher = publisher.clone();
        tokio::spawn(async move { scheduler.start(publisher.as_ref()).await })
    };

    let summary_task = {
        let scheduler = scheduler.clone();
        let publisher = publisher.clone();
        let interval = cfg.ticker.interval();
        tokio::spawn(async move {
            scheduler
                .run_ticker_summaries(publisher.as_ref(), interval)
                .await
        })
    };

    info!("Scanning. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received.");
    scheduler.stop();

    match scan_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Scan loop exited with error"),
        Err(e) => error!(error = %e, "Scan loop task panicked"),
    }
    if let Err(e) = summary_task.await {
        error!(error = %e, "Ticker summary task panicked");
    }
    server_task.abort();

    info!(cycles = scheduler.cycles(), "ARBSCAN shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("arbscan=info"));

    let json_logging = std::env::var("ARBSCAN_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
