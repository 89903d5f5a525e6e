//! Shared utilities for the advisor workspace.
//!
//! - **Logging**: `init_logging` installs the process-wide `tracing` subscriber
//! - **Execution mode**: `ExecutionMode` selects paper or live venues
//! - **Backoff**: `ExponentialBackoff` computes clamped retry delays

mod backoff;
mod mode;

pub use backoff::ExponentialBackoff;
pub use mode::{ExecutionMode, ParseModeError};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging for binaries.
///
/// Reads the filter from `RUST_LOG`, defaulting to `info`. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
