//! Strategy layer: opportunity detection over quote snapshots.

pub mod arbitrage;

pub use arbitrage::{calculate_gross_profit_pct, ArbConfig, ArbDetector};
