//! Scan scheduler: the fetch → detect → publish loop.
//!
//! Runs forever at a fixed cadence until `stop()` is called. Each cycle is
//! isolated: a failing handler or an empty quote wave is logged and the
//! loop simply sleeps and tries again. There is no backoff.
//!
//! The ticker-summary loop runs alongside on its own interval and shares
//! only the scheduler state, so a failure in one never affects the other.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ScanConfig;
use crate::engine::aggregator::QuoteAggregator;
use crate::engine::summary::summarize_tickers;
use crate::exchanges::QuoteSource;
use crate::strategy::{ArbConfig, ArbDetector};
use crate::types::{ArbError, Opportunity, TickerSummary};

// ---------------------------------------------------------------------------
// Handler seams
// ---------------------------------------------------------------------------

/// Receives each detected opportunity, in profit order, one at a time.
#[async_trait]
pub trait OpportunityHandler: Send + Sync {
    async fn on_opportunity(&self, opportunity: &Opportunity) -> Result<()>;
}

/// Receives each ticker summary.
#[async_trait]
pub trait SummaryHandler: Send + Sync {
    async fn on_summary(&self, summaries: &BTreeMap<String, TickerSummary>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle of a scheduler. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "IDLE"),
            SchedulerState::Running => write!(f, "RUNNING"),
            SchedulerState::Stopped => write!(f, "STOPPED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct ScanScheduler {
    config: ScanConfig,
    aggregator: QuoteAggregator,
    detector: ArbDetector,
    state: watch::Sender<SchedulerState>,
    cycles: AtomicU64,
}

impl ScanScheduler {
    pub fn new(config: ScanConfig, source: Arc<dyn QuoteSource>) -> Self {
        let detector = ArbDetector::new(ArbConfig::from(&config));
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            config,
            aggregator: QuoteAggregator::new(source),
            detector,
            state,
            cycles: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Scan cycles started since `start()`.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Single on-demand pass: fetch, detect, return best first.
    ///
    /// Independent of the loop state; safe to call while running.
    pub async fn scan_once(&self) -> Result<Vec<Opportunity>, ArbError> {
        self.config.validate()?;
        let snapshot = self
            .aggregator
            .fetch_all(&self.config.exchanges, &self.config.symbols)
            .await;
        Ok(self.detector.scan_all_symbols(&snapshot))
    }

    /// Run the scan loop until `stop()` is called.
    ///
    /// Fails without entering `Running` if the config is invalid or the
    /// scheduler has already been started or stopped.
    pub async fn start(&self, handler: &dyn OpportunityHandler) -> Result<(), ArbError> {
        self.config.validate()?;
        self.transition_to_running()?;

        let interval = self.config.scan_interval();
        let mut state_rx = self.state.subscribe();

        info!(
            symbols = self.config.symbols.len(),
            exchanges = ?self.config.exchanges,
            interval_secs = self.config.scan_interval_seconds,
            fee = self.config.taker_fee_per_trade,
            min_net_pct = self.detector.threshold_pct(),
            "Scan loop started"
        );

        while self.state() == SchedulerState::Running {
            let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;

            match self.run_cycle(handler).await {
                Ok(0) => debug!(cycle, "No opportunities this cycle"),
                Ok(found) => info!(cycle, found, "Opportunities published"),
                Err(e) => error!(cycle, error = %format!("{e:#}"), "Scan cycle failed, continuing"),
            }

            pause(interval, &mut state_rx).await;
        }

        info!(cycles = self.cycles(), "Scan loop stopped");
        Ok(())
    }

    /// Request the loops to exit. An in-flight cycle is allowed to finish.
    pub fn stop(&self) {
        let previous = self.state.send_replace(SchedulerState::Stopped);
        if previous != SchedulerState::Stopped {
            info!(from = %previous, "Scheduler stop requested");
        }
    }

    /// Publish a ticker summary every `interval` while the scan loop runs.
    ///
    /// Waits for `start()` before the first summary and exits once the
    /// scheduler is stopped.
    pub async fn run_ticker_summaries(&self, handler: &dyn SummaryHandler, interval: Duration) {
        let mut state_rx = self.state.subscribe();

        // Wait for the scheduler to leave Idle
        loop {
            if *state_rx.borrow_and_update() != SchedulerState::Idle {
                break;
            }
            if state_rx.changed().await.is_err() {
                return;
            }
        }

        info!(interval_ms = interval.as_millis() as u64, "Ticker summary loop started");

        while self.state() == SchedulerState::Running {
            if let Err(e) = self.publish_summary(handler).await {
                warn!(error = %format!("{e:#}"), "Ticker summary failed, continuing");
            }
            pause(interval, &mut state_rx).await;
        }

        info!("Ticker summary loop stopped");
    }

    // -- Internals -------------------------------------------------------

    fn transition_to_running(&self) -> Result<(), ArbError> {
        let mut from = SchedulerState::Idle;
        let started = self.state.send_if_modified(|state| {
            from = *state;
            if *state == SchedulerState::Idle {
                *state = SchedulerState::Running;
                true
            } else {
                false
            }
        });

        if started {
            Ok(())
        } else {
            Err(ArbError::NotIdle(from.to_string()))
        }
    }

    /// One fetch → detect → handle pass. Returns the number handled.
    ///
    /// The first handler error aborts the rest of this cycle.
    async fn run_cycle(&self, handler: &dyn OpportunityHandler) -> Result<usize> {
        let snapshot = self
            .aggregator
            .fetch_all(&self.config.exchanges, &self.config.symbols)
            .await;
        let opportunities = self.detector.scan_all_symbols(&snapshot);

        for opportunity in &opportunities {
            handler
                .on_opportunity(opportunity)
                .await
                .with_context(|| format!("Opportunity handler failed for {}", opportunity.symbol))?;
        }

        Ok(opportunities.len())
    }

    async fn publish_summary(&self, handler: &dyn SummaryHandler) -> Result<()> {
        let snapshot = self
            .aggregator
            .fetch_all(&self.config.exchanges, &self.config.symbols)
            .await;
        let summaries = summarize_tickers(&snapshot);
        debug!(symbols = summaries.len(), "Publishing ticker summary");
        handler
            .on_summary(&summaries)
            .await
            .context("Summary handler failed")
    }
}

/// Sleep for `interval`, waking early if the scheduler leaves `Running`.
async fn pause(interval: Duration, state_rx: &mut watch::Receiver<SchedulerState>) {
    tokio::select! {
        _ = tokio::time::sleep(interval) => {}
        _ = wait_until_not_running(state_rx) => {}
    }
}

async fn wait_until_not_running(state_rx: &mut watch::Receiver<SchedulerState>) {
    loop {
        if *state_rx.borrow_and_update() != SchedulerState::Running {
            return;
        }
        if state_rx.changed().await.is_err() {
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
