//! Scan pipeline: source → aggregator → detector → scheduler → publisher.

use std::sync::Arc;
use std::time::Duration;

use arbscan::config::ScanConfig;
use arbscan::engine::{ScanScheduler, SchedulerState};
use arbscan::server::Publisher;
use arbscan::types::ArbError;
use tokio_test::{assert_err, assert_ok};

use crate::mock_source::MockQuoteSource;

fn config(symbols: &[&str], exchanges: &[&str], interval: f64) -> ScanConfig {
    ScanConfig {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        exchanges: exchanges.iter().map(|s| s.to_string()).collect(),
        scan_interval_seconds: interval,
        taker_fee_per_trade: 0.001,
        min_net_profit_pct: 0.005,
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn test_profitable_spread_is_reported() {
    let source = MockQuoteSource::new();
    source.set_book("A", "BTC/USDT", Some(99.0), Some(100.0));
    source.set_book("B", "BTC/USDT", Some(100.8), Some(101.0));

    let sched = ScanScheduler::new(config(&["BTC/USDT"], &["A", "B"], 1.0), Arc::new(source));
    let opps = assert_ok!(sched.scan_once().await);

    assert_eq!(opps.len(), 1);
    let opp = &opps[0];
    assert_eq!(opp.buy_exchange, "A");
    assert_eq!(opp.sell_exchange, "B");
    assert_eq!(opp.buy_price, 100.0);
    assert_eq!(opp.sell_price, 100.8);
    assert!(approx(opp.gross_profit_pct, 0.8));
    assert!(approx(opp.net_profit_pct, 0.6));
}

#[tokio::test]
async fn test_spread_below_fees_is_not_reported() {
    let source = MockQuoteSource::new();
    source.set_book("A", "BTC/USDT", Some(99.0), Some(100.0));
    source.set_book("B", "BTC/USDT", Some(100.4), Some(101.0));

    let sched = ScanScheduler::new(config(&["BTC/USDT"], &["A", "B"], 1.0), Arc::new(source));
    assert!(sched.scan_once().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exchange_without_ask_is_excluded() {
    let source = MockQuoteSource::new();
    source.set_book("A", "ETH/USDT", Some(2000.0), Some(2001.0));
    source.set_book("B", "ETH/USDT", Some(2050.0), None);
    source.set_book("C", "ETH/USDT", Some(2030.0), Some(2031.0));

    let sched = ScanScheduler::new(config(&["ETH/USDT"], &["A", "B", "C"], 1.0), Arc::new(source));
    let opps = sched.scan_once().await.unwrap();

    // B can still be the sell leg, never the buy leg
    assert_eq!(opps.len(), 1);
    assert_eq!(opps[0].buy_exchange, "A");
    assert_eq!(opps[0].sell_exchange, "B");
}

#[tokio::test]
async fn test_results_sorted_by_net_profit() {
    let source = MockQuoteSource::new();
    for (symbol, sell_bid) in [("AAA/USDT", 101.0), ("BBB/USDT", 103.0), ("CCC/USDT", 102.0)] {
        source.set_book("A", symbol, Some(99.0), Some(100.0));
        source.set_book("B", symbol, Some(sell_bid), Some(sell_bid + 1.0));
    }

    let sched = ScanScheduler::new(
        config(&["AAA/USDT", "BBB/USDT", "CCC/USDT"], &["A", "B"], 1.0),
        Arc::new(source),
    );
    let symbols: Vec<String> = sched
        .scan_once()
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.symbol)
        .collect();
    assert_eq!(symbols, vec!["BBB/USDT", "CCC/USDT", "AAA/USDT"]);
}

#[tokio::test]
async fn test_scan_once_idempotent_on_frozen_quotes() {
    let source = MockQuoteSource::new();
    source.set_book("A", "BTC/USDT", Some(99.0), Some(100.0));
    source.set_book("B", "BTC/USDT", Some(101.0), Some(102.0));
    source.set_book("C", "BTC/USDT", Some(101.0), Some(102.0));

    let sched = ScanScheduler::new(config(&["BTC/USDT"], &["C", "B", "A"], 1.0), Arc::new(source));
    let first = sched.scan_once().await.unwrap();
    let second = sched.scan_once().await.unwrap();
    assert_eq!(first, second);
    // Tie between B and C resolves to the first in configured order
    assert_eq!(first[0].sell_exchange, "C");
}

#[tokio::test]
async fn test_ties_follow_configured_order() {
    let source = MockQuoteSource::new();
    for symbol in ["ZZZ/USDT", "AAA/USDT"] {
        source.set_book("binance", symbol, Some(99.0), Some(100.0));
        source.set_book("mexc", symbol, Some(101.0), Some(102.0));
        source.set_book("kucoin", symbol, Some(101.0), Some(102.0));
    }

    let sched = ScanScheduler::new(
        config(&["ZZZ/USDT", "AAA/USDT"], &["binance", "mexc", "kucoin"], 1.0),
        Arc::new(source),
    );
    let opps = assert_ok!(sched.scan_once().await);

    assert!(opps.iter().all(|o| o.buy_exchange == "binance"));
    assert!(opps.iter().all(|o| o.sell_exchange == "mexc"));
    let symbols: Vec<&str> = opps.iter().map(|o| o.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["ZZZ/USDT", "AAA/USDT"]);
}

#[tokio::test]
async fn test_invalid_config_rejected_at_start() {
    let source = MockQuoteSource::new();
    let publisher = Publisher::new();

    for bad in [
        config(&["BTC/USDT"], &["A", "B"], 0.0),
        config(&["BTC/USDT"], &["A", "B"], -1.0),
        config(&[], &["A", "B"], 1.0),
        config(&["BTC/USDT"], &[], 1.0),
        ScanConfig {
            taker_fee_per_trade: -0.001,
            ..config(&["BTC/USDT"], &["A", "B"], 1.0)
        },
    ] {
        let sched = ScanScheduler::new(bad, Arc::new(source.clone()));
        let err = assert_err!(sched.start(&publisher).await);
        assert!(matches!(err, ArbError::Config(_)), "unexpected error: {err}");
        assert_eq!(sched.state(), SchedulerState::Idle);
    }
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_failing_source_keeps_scheduler_running() {
    let source = MockQuoteSource::new();
    source.set_error();

    let sched = Arc::new(ScanScheduler::new(
        config(&["BTC/USDT", "ETH/USDT"], &["A", "B"], 0.01),
        Arc::new(source.clone()),
    ));
    let publisher = Arc::new(Publisher::new());
    let (_id, mut events) = publisher.subscribe().await;

    let task = {
        let sched = sched.clone();
        let publisher = publisher.clone();
        tokio::spawn(async move { sched.start(publisher.as_ref()).await })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(sched.state(), SchedulerState::Running);
    assert!(sched.cycles() >= 3);
    assert!(source.calls() >= 12);
    assert!(events.try_recv().is_err());

    sched.stop();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("scheduler should stop")
        .unwrap()
        .unwrap();
    assert_eq!(sched.state(), SchedulerState::Stopped);
}

#[tokio::test]
async fn test_recovered_source_publishes_to_subscribers() {
    let source = MockQuoteSource::new();
    source.set_book("A", "BTC/USDT", Some(99.0), Some(100.0));
    source.set_book("B", "BTC/USDT", Some(100.8), Some(101.0));
    source.set_error();

    let sched = Arc::new(ScanScheduler::new(
        config(&["BTC/USDT"], &["A", "B"], 0.01),
        Arc::new(source.clone()),
    ));
    let publisher = Arc::new(Publisher::new());
    let (_id, mut events) = publisher.subscribe().await;

    let task = {
        let sched = sched.clone();
        let publisher = publisher.clone();
        tokio::spawn(async move { sched.start(publisher.as_ref()).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    source.clear_error();

    let msg = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("an opportunity after recovery")
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&msg).unwrap();
    assert_eq!(json["type"], "opportunity");
    assert_eq!(json["data"]["symbol"], "BTC/USDT");
    assert_eq!(json["data"]["buy_exchange"], "A");
    assert_eq!(json["data"]["net_profit_pct"].as_f64(), Some(0.6));

    sched.stop();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_ticker_summaries_reach_subscribers() {
    let source = MockQuoteSource::new();
    source.set_book("A", "BTC/USDT", Some(99.0), Some(101.0));
    source.set_book("B", "BTC/USDT", Some(101.0), Some(103.0));

    let sched = Arc::new(ScanScheduler::new(
        config(&["BTC/USDT"], &["A", "B"], 10.0),
        Arc::new(source),
    ));
    let publisher = Arc::new(Publisher::new());
    let (_id, mut events) = publisher.subscribe().await;

    let summaries = {
        let sched = sched.clone();
        let publisher = publisher.clone();
        tokio::spawn(async move {
            sched
                .run_ticker_summaries(publisher.as_ref(), Duration::from_millis(10))
                .await
        })
    };
    let scan = {
        let sched = sched.clone();
        let publisher = publisher.clone();
        tokio::spawn(async move { sched.start(publisher.as_ref()).await })
    };

    let mut summary = None;
    for _ in 0..20 {
        let msg = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("an event")
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&msg).unwrap();
        if json["type"] == "ticker_summary" {
            summary = Some(json);
            break;
        }
    }
    let summary = summary.expect("a ticker summary");
    // Mids are 100 and 102
    assert_eq!(summary["data"]["BTC/USDT"]["avg_price"].as_f64(), Some(101.0));

    sched.stop();
    scan.await.unwrap().unwrap();
    summaries.await.unwrap();
}
