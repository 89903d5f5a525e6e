//! Strategy trait definition.

use async_trait::async_trait;
use model::{Advice, IndicatorSnapshot};

use crate::error::StrategyError;

/// Core trait for advice-producing strategies.
///
/// A strategy is bound to one instrument and sees its snapshots in order.
///
/// # Lifecycle
///
/// 1. `on_start` - Called once when the strategy runner starts
/// 2. `on_snapshot` - Called for each indicator snapshot of the instrument
/// 3. `on_stop` - Called once when the strategy runner stops
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use model::{Advice, IndicatorSnapshot};
/// use strategy_core::{Strategy, StrategyError};
///
/// struct AlwaysLong {
///     id: String,
/// }
///
/// #[async_trait]
/// impl Strategy for AlwaysLong {
///     fn id(&self) -> &str {
///         &self.id
///     }
///
///     async fn on_snapshot(
///         &mut self,
///         snapshot: &IndicatorSnapshot,
///     ) -> Result<Advice, StrategyError> {
///         Ok(Advice::long(snapshot.timestamp_ms))
///     }
/// }
/// ```
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Returns the unique identifier for this strategy.
    fn id(&self) -> &str;

    /// Called once when the strategy runner starts.
    async fn on_start(&mut self) -> Result<(), StrategyError> {
        Ok(())
    }

    /// Called for each indicator snapshot.
    ///
    /// Return `Advice::none` when there is nothing to act on.
    async fn on_snapshot(&mut self, snapshot: &IndicatorSnapshot)
        -> Result<Advice, StrategyError>;

    /// Called once when the strategy runner stops.
    async fn on_stop(&mut self) -> Result<(), StrategyError> {
        Ok(())
    }
}

/// A boxed strategy trait object.
pub type BoxedStrategy = Box<dyn Strategy>;
