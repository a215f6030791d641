//! Core engine: the fetch → detect → publish loop.

pub mod aggregator;
pub mod scheduler;
pub mod summary;

pub use aggregator::QuoteAggregator;
pub use scheduler::{OpportunityHandler, ScanScheduler, SchedulerState, SummaryHandler};
pub use summary::summarize_tickers;
