//! Strategy execution runtime.
//!
//! - **StrategyRunner**: feeds indicator snapshots to per-pair strategies and
//!   publishes their advice
//! - **ExecutionCoordinator**: places, polls and cancels orders for advice
//!   through the retry scheduler
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────────┐     ┌──────────────────────┐
//! │  snapshots  │────>│ StrategyRunner │────>│ ExecutionCoordinator │
//! │  (mpsc)     │     │ on_snapshot()  │     │ - placement slot     │
//! └─────────────┘     └────────────────┘     │ - RetryScheduler     │
//!                             │              └──────────────────────┘
//!                             v                         │
//!                     ┌────────────────┐                v
//!                     │ advice (bcast) │         ┌─────────────┐
//!                     └────────────────┘         │    Venue    │
//!                                                └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use strategy_runner::{ExecutionCoordinator, StrategyRunner, StrategyRunnerConfig};
//!
//! let mut coordinator = ExecutionCoordinator::new(CoordinatorConfig::default(), metrics.clone())?;
//! coordinator.register_venue(venue);
//!
//! let mut runner = StrategyRunner::new(StrategyRunnerConfig::default(), metrics)
//!     .with_coordinator(Arc::new(coordinator));
//! runner.register_strategy("BTC/ETN", Box::new(strategy))?;
//!
//! runner.run(snapshot_rx, shutdown_rx).await?;
//! ```

mod config;
mod coordinator;
mod error;
mod runner;
#[cfg(test)]
mod testing;

pub use config::{CoordinatorConfig, StrategyRunnerConfig};
pub use coordinator::{pair_key, ExecutionCoordinator, ExecutionOutcome, SharedCoordinator};
pub use error::{CoordinatorError, RunnerError};
pub use runner::{
    create_snapshot_channel, PairAdvice, SnapshotReceiver, SnapshotSender, StrategyRunner,
};
