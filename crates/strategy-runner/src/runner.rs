//! Strategy runner - main execution loop.

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

use metrics::SharedMetrics;
use model::{Advice, IndicatorSnapshot};
use strategy_core::BoxedStrategy;

use crate::config::StrategyRunnerConfig;
use crate::coordinator::{ExecutionOutcome, SharedCoordinator};
use crate::error::{CoordinatorError, RunnerError};

/// Advice emitted for a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairAdvice {
    pub pair: String,
    pub advice: Advice,
}

pub type SnapshotSender = mpsc::Sender<(String, IndicatorSnapshot)>;
pub type SnapshotReceiver = mpsc::Receiver<(String, IndicatorSnapshot)>;

pub fn create_snapshot_channel(capacity: usize) -> (SnapshotSender, SnapshotReceiver) {
    mpsc::channel(capacity)
}

/// The strategy runner feeds snapshots to per-pair strategies and hands
/// their advice to the execution coordinator.
///
/// Each strategy sees its pair's snapshots strictly in order. Execution runs
/// in spawned tasks, so order polling never stalls the snapshot stream,
/// unless `inline_execution` is set, in which case each advice is settled
/// before the next snapshot is read.
pub struct StrategyRunner {
    /// Runner configuration.
    config: StrategyRunnerConfig,
    /// Strategies by pair.
    strategies: HashMap<String, BoxedStrategy>,
    /// Coordinator for actionable advice (advice-only when absent).
    coordinator: Option<SharedCoordinator>,
    /// Advice observers.
    advice_tx: Option<broadcast::Sender<PairAdvice>>,
    /// Execution metrics.
    metrics: SharedMetrics,
    /// In-flight executions.
    executions: JoinSet<()>,
}

impl StrategyRunner {
    /// Create a new strategy runner with the given configuration.
    pub fn new(config: StrategyRunnerConfig, metrics: SharedMetrics) -> Self {
        Self {
            config,
            strategies: HashMap::new(),
            coordinator: None,
            advice_tx: None,
            metrics,
            executions: JoinSet::new(),
        }
    }

    /// Set the coordinator that executes actionable advice.
    pub fn with_coordinator(mut self, coordinator: SharedCoordinator) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Subscribe to emitted advice.
    pub fn subscribe_advice(&mut self) -> broadcast::Receiver<PairAdvice> {
        let capacity = self.config.advice_capacity.max(1);
        self.advice_tx
            .get_or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe()
    }

    /// Register the strategy for `pair`.
    pub fn register_strategy(
        &mut self,
        pair: impl Into<String>,
        strategy: BoxedStrategy,
    ) -> Result<(), RunnerError> {
        let pair = pair.into();
        if self.strategies.contains_key(&pair) {
            return Err(RunnerError::DuplicatePair(pair));
        }

        info!(pair = %pair, strategy_id = %strategy.id(), "registered strategy");
        self.strategies.insert(pair, strategy);
        Ok(())
    }

    /// Run the strategy loop.
    ///
    /// Returns when shutdown is signaled or the snapshot channel closes. On
    /// shutdown, scheduled retries are canceled; in both cases in-flight
    /// executions are awaited before returning.
    pub async fn run(
        mut self,
        mut snapshot_rx: SnapshotReceiver,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), RunnerError> {
        info!(
            strategy_count = self.strategies.len(),
            executing = self.coordinator.is_some(),
            "starting strategy runner"
        );

        self.check_venues()?;
        self.start_strategies().await?;

        let mut shutdown = *shutdown_rx.borrow();

        while !shutdown {
            tokio::select! {
                biased;

                // Shutdown signal (highest priority)
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("shutdown signal received");
                        shutdown = true;
                    }
                }

                // Reap finished executions
                Some(joined) = self.executions.join_next(), if !self.executions.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "execution task panicked");
                    }
                }

                // Snapshots
                received = snapshot_rx.recv() => {
                    match received {
                        Some((pair, snapshot)) => self.handle_snapshot(pair, snapshot).await,
                        None => {
                            info!("snapshot channel closed");
                            break;
                        }
                    }
                }
            }
        }

        if shutdown {
            if let Some(coordinator) = &self.coordinator {
                coordinator.cancel_pending();
            }
        }

        self.drain_executions().await;
        self.stop_strategies().await;

        info!("strategy runner stopped");
        Ok(())
    }

    /// Every strategy needs a venue when advice is executed.
    fn check_venues(&self) -> Result<(), RunnerError> {
        let Some(coordinator) = &self.coordinator else {
            return Ok(());
        };

        for pair in self.strategies.keys() {
            if let Err(e) = coordinator.venue(pair) {
                error!(pair = %pair, "strategy has no venue");
                return Err(e.into());
            }
        }

        Ok(())
    }

    /// Call on_start for all strategies.
    async fn start_strategies(&mut self) -> Result<(), RunnerError> {
        for (pair, strategy) in &mut self.strategies {
            if let Err(e) = strategy.on_start().await {
                error!(pair = %pair, strategy_id = %strategy.id(), error = %e, "strategy start failed");
                return Err(e.into());
            }
            debug!(pair = %pair, strategy_id = %strategy.id(), "strategy started");
        }

        Ok(())
    }

    /// Call on_stop for all strategies.
    async fn stop_strategies(&mut self) {
        for (pair, strategy) in &mut self.strategies {
            if let Err(e) = strategy.on_stop().await {
                error!(pair = %pair, strategy_id = %strategy.id(), error = %e, "strategy stop failed");
                // Continue stopping other strategies
            } else {
                debug!(pair = %pair, strategy_id = %strategy.id(), "strategy stopped");
            }
        }
    }

    async fn drain_executions(&mut self) {
        if !self.executions.is_empty() {
            info!(in_flight = self.executions.len(), "waiting for in-flight executions");
        }

        while let Some(joined) = self.executions.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "execution task panicked");
            }
        }
    }

    /// Handle one snapshot.
    async fn handle_snapshot(&mut self, pair: String, snapshot: IndicatorSnapshot) {
        trace!(
            pair = %pair,
            timestamp_ms = snapshot.timestamp_ms,
            tsi = snapshot.tsi,
            ppo = snapshot.ppo_histogram,
            rsi = snapshot.rsi,
            "snapshot"
        );

        let Some(strategy) = self.strategies.get_mut(&pair) else {
            warn!(pair = %pair, "no strategy for pair, snapshot dropped");
            return;
        };

        let advice = match strategy.on_snapshot(&snapshot).await {
            Ok(advice) => advice,
            Err(e) => {
                error!(
                    pair = %pair,
                    strategy_id = %strategy.id(),
                    error = %e,
                    "strategy error on snapshot"
                );
                return;
            }
        };

        if let Some(tx) = &self.advice_tx {
            // No subscribers is fine
            let _ = tx.send(PairAdvice {
                pair: pair.clone(),
                advice,
            });
        }

        if !advice.is_actionable() {
            return;
        }

        self.metrics.inc_advice_emitted();
        info!(
            pair = %pair,
            action = %advice.action,
            timestamp_ms = advice.timestamp_ms,
            "advice"
        );

        let Some(coordinator) = self.coordinator.clone() else {
            return;
        };

        let execution = execute_advice(coordinator, pair, advice);
        if self.config.inline_execution {
            execution.await;
        } else {
            self.executions.spawn(execution);
        }
    }
}

async fn execute_advice(coordinator: SharedCoordinator, pair: String, advice: Advice) {
    match coordinator.execute(&pair, &advice).await {
        Ok(ExecutionOutcome::Filled(status)) => {
            debug!(pair = %pair, amount = %status.amount, "advice executed");
        }
        Ok(ExecutionOutcome::Canceled(id)) => {
            debug!(pair = %pair, order_id = %id, "advice order canceled");
        }
        Ok(ExecutionOutcome::Skipped) => {}
        Err(CoordinatorError::PlacementInFlight(_)) => {
            // Already logged by the coordinator
        }
        Err(e) => {
            debug!(pair = %pair, error = %e, "advice not executed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use metrics::create_metrics;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use strategy_core::{PpoRsiTsi, Settings, Strategy, StrategyError};
    use venue_core::PaperVenue;

    use crate::config::CoordinatorConfig;
    use crate::coordinator::ExecutionCoordinator;

    const PAIR: &str = "BTC/ETN";

    struct CountingStrategy {
        id: String,
        snapshots: Arc<AtomicU32>,
        stopped: Arc<AtomicU32>,
    }

    impl CountingStrategy {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                snapshots: Arc::new(AtomicU32::new(0)),
                stopped: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    #[async_trait]
    impl Strategy for CountingStrategy {
        fn id(&self) -> &str {
            &self.id
        }

        async fn on_snapshot(
            &mut self,
            snapshot: &IndicatorSnapshot,
        ) -> Result<Advice, StrategyError> {
            self.snapshots.fetch_add(1, Ordering::SeqCst);
            Ok(Advice::none(snapshot.timestamp_ms))
        }

        async fn on_stop(&mut self) -> Result<(), StrategyError> {
            self.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Records the venue's order count each time a snapshot arrives.
    struct OrderCountingStrategy {
        inner: BoxedStrategy,
        venue: Arc<PaperVenue>,
        seen: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl Strategy for OrderCountingStrategy {
        fn id(&self) -> &str {
            self.inner.id()
        }

        async fn on_snapshot(
            &mut self,
            snapshot: &IndicatorSnapshot,
        ) -> Result<Advice, StrategyError> {
            self.seen.lock().push(self.venue.order_count());
            self.inner.on_snapshot(snapshot).await
        }
    }

    struct FailingStrategy;

    #[async_trait]
    impl Strategy for FailingStrategy {
        fn id(&self) -> &str {
            "failing"
        }

        async fn on_start(&mut self) -> Result<(), StrategyError> {
            Err(StrategyError::Internal("boom".to_string()))
        }

        async fn on_snapshot(
            &mut self,
            snapshot: &IndicatorSnapshot,
        ) -> Result<Advice, StrategyError> {
            Ok(Advice::none(snapshot.timestamp_ms))
        }
    }

    /// Strategy that advises on the first qualifying candle, driven by TSI.
    fn make_signal_strategy() -> BoxedStrategy {
        let settings = Settings::default()
            .with_tsi(25.0, -25.0)
            .with_ppo(0.0, 0.0)
            .with_persistence(1);
        Box::new(PpoRsiTsi::new(PAIR, settings).unwrap())
    }

    fn oversold(ts: i64) -> IndicatorSnapshot {
        IndicatorSnapshot::new(ts, -30.0, -0.5, 50.0)
    }

    fn make_coordinator(metrics: SharedMetrics) -> (SharedCoordinator, Arc<PaperVenue>) {
        let venue = Arc::new(
            PaperVenue::new("BTC", "ETN")
                .with_balance("BTC", dec!(1))
                .with_ticker(dec!(0.0001), dec!(0.0002)),
        );
        let mut coordinator = ExecutionCoordinator::new(
            CoordinatorConfig::default().with_order_check_interval(Duration::from_millis(10)),
            metrics,
        )
        .unwrap();
        coordinator.register_venue(venue.clone());
        (Arc::new(coordinator), venue)
    }

    #[test]
    fn test_runner_creation() {
        let runner = StrategyRunner::new(StrategyRunnerConfig::default(), create_metrics());
        assert!(runner.strategies.is_empty());
        assert!(runner.coordinator.is_none());
    }

    #[test]
    fn test_register_strategy() {
        let mut runner = StrategyRunner::new(StrategyRunnerConfig::default(), create_metrics());

        runner
            .register_strategy(PAIR, Box::new(CountingStrategy::new("a")))
            .unwrap();
        let err = runner
            .register_strategy(PAIR, Box::new(CountingStrategy::new("b")))
            .unwrap_err();

        assert!(matches!(err, RunnerError::DuplicatePair(p) if p == PAIR));
        assert_eq!(runner.strategies.len(), 1);
    }

    #[tokio::test]
    async fn test_runner_shutdown() {
        let runner = StrategyRunner::new(StrategyRunnerConfig::default(), create_metrics());

        let (_snapshot_tx, snapshot_rx) = create_snapshot_channel(10);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Immediately signal shutdown
        shutdown_tx.send(true).unwrap();

        // Runner should exit cleanly with the snapshot channel still open
        let result = runner.run(snapshot_rx, shutdown_rx).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_snapshots_dispatched_in_order_until_close() {
        let mut runner = StrategyRunner::new(StrategyRunnerConfig::default(), create_metrics());
        let strategy = CountingStrategy::new("counting");
        let snapshots = strategy.snapshots.clone();
        let stopped = strategy.stopped.clone();
        runner.register_strategy(PAIR, Box::new(strategy)).unwrap();

        let (snapshot_tx, snapshot_rx) = create_snapshot_channel(10);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        for ts in 0..5 {
            snapshot_tx
                .send((PAIR.to_string(), oversold(ts)))
                .await
                .unwrap();
        }
        // Unknown pairs are dropped
        snapshot_tx
            .send(("BTC/XYZ".to_string(), oversold(9)))
            .await
            .unwrap();
        drop(snapshot_tx);

        runner.run(snapshot_rx, shutdown_rx).await.unwrap();

        assert_eq!(snapshots.load(Ordering::SeqCst), 5);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_failure_aborts() {
        let mut runner = StrategyRunner::new(StrategyRunnerConfig::default(), create_metrics());
        runner.register_strategy(PAIR, Box::new(FailingStrategy)).unwrap();

        let (_snapshot_tx, snapshot_rx) = create_snapshot_channel(10);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let err = runner.run(snapshot_rx, shutdown_rx).await.unwrap_err();
        assert!(matches!(err, RunnerError::Strategy(_)));
    }

    #[tokio::test]
    async fn test_advice_broadcast_without_coordinator() {
        let metrics = create_metrics();
        let mut runner = StrategyRunner::new(StrategyRunnerConfig::default(), metrics.clone());
        runner.register_strategy(PAIR, make_signal_strategy()).unwrap();
        let mut advice_rx = runner.subscribe_advice();

        let (snapshot_tx, snapshot_rx) = create_snapshot_channel(10);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        // Second candle is the same episode, so it advises nothing
        snapshot_tx.send((PAIR.to_string(), oversold(1))).await.unwrap();
        snapshot_tx.send((PAIR.to_string(), oversold(2))).await.unwrap();
        drop(snapshot_tx);

        runner.run(snapshot_rx, shutdown_rx).await.unwrap();

        // Observers see neutral advice too; only actionable advice counts
        for expected in [Advice::long(1), Advice::none(2)] {
            let received = advice_rx.recv().await.unwrap();
            assert_eq!(
                received,
                PairAdvice {
                    pair: PAIR.to_string(),
                    advice: expected,
                }
            );
        }
        assert!(advice_rx.try_recv().is_err());
        assert_eq!(metrics.advice_emitted(), 1);
    }

    #[tokio::test]
    async fn test_advice_executed_through_coordinator() {
        let metrics = create_metrics();
        let (coordinator, venue) = make_coordinator(metrics.clone());

        let mut runner = StrategyRunner::new(StrategyRunnerConfig::default(), metrics.clone())
            .with_coordinator(coordinator);
        runner.register_strategy(PAIR, make_signal_strategy()).unwrap();

        let (snapshot_tx, snapshot_rx) = create_snapshot_channel(10);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        snapshot_tx.send((PAIR.to_string(), oversold(1))).await.unwrap();
        drop(snapshot_tx);

        runner.run(snapshot_rx, shutdown_rx).await.unwrap();

        assert_eq!(metrics.orders_placed(), 1);
        assert_eq!(metrics.orders_filled(), 1);
        assert_eq!(venue.balance("BTC"), dec!(0));
        assert_eq!(venue.order_count(), 1);
    }

    #[tokio::test]
    async fn test_strategy_without_venue_rejected() {
        let metrics = create_metrics();
        let (coordinator, _) = make_coordinator(metrics.clone());

        let mut runner = StrategyRunner::new(StrategyRunnerConfig::default(), metrics)
            .with_coordinator(coordinator);
        runner
            .register_strategy("BTC/XYZ", Box::new(CountingStrategy::new("orphan")))
            .unwrap();

        let (_snapshot_tx, snapshot_rx) = create_snapshot_channel(10);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let err = runner.run(snapshot_rx, shutdown_rx).await.unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Coordinator(CoordinatorError::UnknownPair(p)) if p == "BTC/XYZ"
        ));
    }

    #[tokio::test]
    async fn test_inline_execution_settles_before_next_snapshot() {
        let metrics = create_metrics();
        let (coordinator, venue) = make_coordinator(metrics.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let config = StrategyRunnerConfig::default().with_inline_execution(true);
        let mut runner = StrategyRunner::new(config, metrics.clone()).with_coordinator(coordinator);
        runner
            .register_strategy(
                PAIR,
                Box::new(OrderCountingStrategy {
                    inner: make_signal_strategy(),
                    venue: venue.clone(),
                    seen: seen.clone(),
                }),
            )
            .unwrap();

        let (snapshot_tx, snapshot_rx) = create_snapshot_channel(10);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        for ts in 1..=3 {
            snapshot_tx.send((PAIR.to_string(), oversold(ts))).await.unwrap();
        }
        drop(snapshot_tx);

        runner.run(snapshot_rx, shutdown_rx).await.unwrap();

        // The order from the first candle exists before the second is seen
        assert_eq!(*seen.lock(), vec![0, 1, 1]);
        assert_eq!(metrics.orders_filled(), 1);
    }
}
