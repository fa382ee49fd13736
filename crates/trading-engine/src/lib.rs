//! Strategy execution loop.
//!
//! Ties a [`CandleFeed`](trading_core::traits::CandleFeed), a strategy and
//! the [`Portfolio`](trading_risk::Portfolio) together tick by tick, derives
//! performance statistics from the trade ledger and renders run reports.

mod engine;
mod live;
mod report;
mod statistics;

pub use engine::{ExecutionConfig, ExecutionLoop, OrderRouter};
pub use live::{LiveRunner, LiveRunnerConfig};
pub use report::RunReport;
pub use statistics::PerformanceStats;
