//! Replays indicator snapshots through the strategy runner against paper
//! venues.
//!
//! Usage: `advisor <snapshots.jsonl> [settings.json]`
//!
//! Each snapshot line is an `IndicatorSnapshot` plus the pair and, optionally,
//! the candle close. The close becomes the pair's paper bid and ask when that
//! snapshot is evaluated, and advice is settled before the next snapshot, so
//! every fill happens at its own candle's close:
//!
//! ```text
//! {"pair":"BTC/ETN","close":"0.0002","timestampMs":1500000000000,"tsi":-31.2,"ppoHistogram":-0.4,"rsi":18.5}
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::ExecutionMode;
use metrics::{create_metrics, SharedMetrics};
use model::{Advice, IndicatorSnapshot};
use rust_decimal::Decimal;
use serde::Deserialize;
use strategy_core::{PpoRsiTsi, Settings, Strategy, StrategyError};
use strategy_runner::{
    create_snapshot_channel, CoordinatorConfig, CoordinatorError, ExecutionCoordinator,
    RunnerError, StrategyRunner, StrategyRunnerConfig,
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};
use venue_core::PaperVenue;

/// Interval for periodic health status logging.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Starting currency balance of each paper venue, overridable with
/// `PAPER_CURRENCY_BALANCE`.
const DEFAULT_CURRENCY_BALANCE: Decimal = Decimal::ONE;

#[derive(Debug, Error)]
enum ReplayError {
    #[error("usage: advisor <snapshots.jsonl> [settings.json]")]
    Usage,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}:{line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("invalid pair {0}, expected CURRENCY/ASSET")]
    InvalidPair(String),

    #[error("invalid {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("live venues are not available in this build")]
    LiveUnsupported,

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// One replayed candle.
#[derive(Debug, Clone, Deserialize)]
struct SnapshotLine {
    pair: String,
    #[serde(default)]
    close: Option<Decimal>,
    #[serde(flatten)]
    snapshot: IndicatorSnapshot,
}

/// Quotes each candle's close on the paper venue before the wrapped strategy
/// sees the candle.
struct QuotedStrategy {
    inner: PpoRsiTsi,
    venue: Arc<PaperVenue>,
    closes: VecDeque<Option<Decimal>>,
}

#[async_trait]
impl Strategy for QuotedStrategy {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn on_snapshot(&mut self, snapshot: &IndicatorSnapshot) -> Result<Advice, StrategyError> {
        if let Some(Some(close)) = self.closes.pop_front() {
            self.venue.set_ticker(close, close);
        }
        self.inner.on_snapshot(snapshot).await
    }
}

/// Paper venues left behind by a replay, by pair.
struct Replay {
    metrics: SharedMetrics,
    venues: BTreeMap<String, Arc<PaperVenue>>,
}

fn split_pair(pair: &str) -> Result<(&str, &str), ReplayError> {
    match pair.split_once('/') {
        Some((currency, asset)) if !currency.is_empty() && !asset.is_empty() => {
            Ok((currency, asset))
        }
        _ => Err(ReplayError::InvalidPair(pair.to_string())),
    }
}

fn read_file(path: &Path) -> Result<String, ReplayError> {
    std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_snapshots(path: &Path, contents: &str) -> Result<Vec<SnapshotLine>, ReplayError> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| ReplayError::Parse {
                path: path.to_path_buf(),
                line: i + 1,
                source,
            })
        })
        .collect()
}

fn load_settings(path: Option<&Path>) -> Result<Settings, ReplayError> {
    let settings = match path {
        Some(path) => {
            serde_json::from_str(&read_file(path)?).map_err(|source| ReplayError::Parse {
                path: path.to_path_buf(),
                line: 1,
                source,
            })?
        }
        None => Settings::default(),
    };

    settings.validate()?;
    Ok(settings)
}

fn currency_balance() -> Result<Decimal, ReplayError> {
    match std::env::var("PAPER_CURRENCY_BALANCE") {
        Ok(value) => Decimal::from_str(&value).map_err(|_| ReplayError::InvalidEnv {
            name: "PAPER_CURRENCY_BALANCE",
            value,
        }),
        Err(_) => Ok(DEFAULT_CURRENCY_BALANCE),
    }
}

fn spawn_health_reporter(metrics: SharedMetrics, mut shutdown_rx: watch::Receiver<bool>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEALTH_LOG_INTERVAL);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let snapshot = metrics.snapshot();
                    info!(
                        status = %snapshot.health_status(),
                        advice = snapshot.advice_emitted,
                        filled = snapshot.orders_filled,
                        retries = snapshot.retries,
                        failures = snapshot.failures(),
                        "Health check"
                    );
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });
}

/// Feed `lines` through a strategy runner with one paper venue per pair.
///
/// Returns when every line was handled or shutdown was signaled.
async fn run_replay(
    lines: Vec<SnapshotLine>,
    settings: &Settings,
    balance: Decimal,
    coordinator_config: CoordinatorConfig,
    metrics: SharedMetrics,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<Replay, ReplayError> {
    let mut coordinator = ExecutionCoordinator::new(coordinator_config, metrics.clone())?;
    let runner_config = StrategyRunnerConfig::default().with_inline_execution(true);
    let mut runner = StrategyRunner::new(runner_config.clone(), metrics.clone());

    let mut closes: BTreeMap<String, VecDeque<Option<Decimal>>> = BTreeMap::new();
    for line in &lines {
        closes.entry(line.pair.clone()).or_default().push_back(line.close);
    }

    let mut venues: BTreeMap<String, Arc<PaperVenue>> = BTreeMap::new();
    for (pair, closes) in closes {
        let (currency, asset) = split_pair(&pair)?;
        let venue = Arc::new(PaperVenue::new(currency, asset).with_balance(currency, balance));
        let key = coordinator.register_venue(venue.clone());

        let strategy = QuotedStrategy {
            inner: PpoRsiTsi::new(key.clone(), settings.clone())?,
            venue: venue.clone(),
            closes,
        };
        runner.register_strategy(key, Box::new(strategy))?;

        venues.insert(pair, venue);
    }

    let runner = runner.with_coordinator(Arc::new(coordinator));
    let (snapshot_tx, snapshot_rx) = create_snapshot_channel(runner_config.snapshot_capacity);
    let runner_handle = tokio::spawn(runner.run(snapshot_rx, shutdown_rx));

    for line in lines {
        if snapshot_tx.send((line.pair, line.snapshot)).await.is_err() {
            warn!("Runner stopped before replay finished");
            break;
        }
    }
    drop(snapshot_tx);

    match runner_handle.await {
        Ok(result) => result?,
        Err(e) => error!(error = %e, "Runner task failed"),
    }

    Ok(Replay { metrics, venues })
}

async fn replay() -> Result<SharedMetrics, ReplayError> {
    let mut args = std::env::args().skip(1);
    let snapshots_path = PathBuf::from(args.next().ok_or(ReplayError::Usage)?);
    let settings_path = args.next().map(PathBuf::from);

    let mode = ExecutionMode::from_env();
    if mode.is_live() {
        return Err(ReplayError::LiveUnsupported);
    }

    let settings = load_settings(settings_path.as_deref())?;
    let lines = parse_snapshots(&snapshots_path, &read_file(&snapshots_path)?)?;
    let balance = currency_balance()?;

    info!(
        mode = %mode,
        snapshots = lines.len(),
        persistence = settings.persistence,
        rsi_lookback = settings.rsi_lookback,
        "Starting replay"
    );

    let metrics = create_metrics();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn ctrl_c handler
    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, initiating shutdown");
            let _ = ctrl_c_tx.send(true);
        }
    });

    spawn_health_reporter(metrics.clone(), shutdown_tx.subscribe());

    let result = run_replay(
        lines,
        &settings,
        balance,
        CoordinatorConfig::default(),
        metrics,
        shutdown_rx,
    )
    .await;

    let _ = shutdown_tx.send(true);
    let replay = result?;

    for (pair, venue) in &replay.venues {
        let (currency, asset) = split_pair(pair)?;
        info!(
            pair = %pair,
            currency = %venue.balance(currency),
            asset = %venue.balance(asset),
            orders = venue.order_count(),
            "Final paper balances"
        );
    }

    Ok(replay.metrics)
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    common::init_logging();

    match replay().await {
        Ok(metrics) => {
            // Print final metrics
            println!("\n{}", metrics.snapshot());
            info!("Shutdown complete");
        }
        Err(e) => {
            error!(error = %e, "Replay failed");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("BTC/ETN").unwrap(), ("BTC", "ETN"));
        assert!(matches!(split_pair("BTCETN"), Err(ReplayError::InvalidPair(_))));
        assert!(matches!(split_pair("/ETN"), Err(ReplayError::InvalidPair(_))));
    }

    #[test]
    fn test_parse_snapshots() {
        let contents = r#"
{"pair":"BTC/ETN","close":"0.0002","timestampMs":1,"tsi":-31.2,"ppoHistogram":-0.4,"rsi":18.5}

{"pair":"BTC/PRL","timestampMs":2,"tsi":4.0,"ppoHistogram":0.1,"rsi":50.0}
"#;

        let lines = parse_snapshots(Path::new("replay.jsonl"), contents).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].pair, "BTC/ETN");
        assert_eq!(lines[0].close, Some(dec!(0.0002)));
        assert_eq!(lines[0].snapshot, IndicatorSnapshot::new(1, -31.2, -0.4, 18.5));
        assert_eq!(lines[1].close, None);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let contents = "{\"pair\":\"BTC/ETN\",\"timestampMs\":1,\"tsi\":0,\"ppoHistogram\":0,\"rsi\":0}\nnot json\n";

        let err = parse_snapshots(Path::new("replay.jsonl"), contents).unwrap_err();
        assert!(matches!(err, ReplayError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_default_settings_when_no_file() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    fn line(pair: &str, close: Decimal, snapshot: IndicatorSnapshot) -> SnapshotLine {
        SnapshotLine {
            pair: pair.to_string(),
            close: Some(close),
            snapshot,
        }
    }

    #[tokio::test]
    async fn test_replay_fills_at_advised_candle_close() {
        use venue_core::Venue;

        let settings = Settings::default()
            .with_tsi(25.0, -25.0)
            .with_ppo(0.0, 0.0)
            .with_persistence(1);
        // Oversold candle advises long; the neutral one after it moves the price
        let lines = vec![
            line("BTC/ETN", dec!(1), IndicatorSnapshot::new(1, -30.0, -0.5, 50.0)),
            line("BTC/ETN", dec!(2), IndicatorSnapshot::new(2, 0.0, 0.0, 50.0)),
        ];
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let replay = run_replay(
            lines,
            &settings,
            dec!(1),
            CoordinatorConfig::default(),
            create_metrics(),
            shutdown_rx,
        )
        .await
        .unwrap();

        let venue = &replay.venues["BTC/ETN"];
        let trades = venue.get_trades(None, false).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, dec!(1));
        assert_eq!(trades[0].amount, dec!(1));
        assert_eq!(venue.get_ticker().await.unwrap().ask, dec!(2));
        assert_eq!(replay.metrics.orders_filled(), 1);
    }
}

