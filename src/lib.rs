//! ARBSCAN: Cross-Exchange Crypto Arbitrage Scanner
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry points.

pub mod config;
pub mod types;
pub mod exchanges;
pub mod strategy;
pub mod engine;
pub mod server;
