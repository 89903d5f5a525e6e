//! PPO/RSI/TSI signal engine.
//!
//! Turns a stream of indicator snapshots into debounced advice. A trend must
//! qualify for `persistence` consecutive candles before it is advised, and it
//! is advised only once until the direction flips.

use async_trait::async_trait;
use model::{Advice, IndicatorSnapshot};
use tracing::debug;

use crate::error::StrategyError;
use crate::settings::Settings;
use crate::strategy::Strategy;
use crate::trend::{Direction, TrendState};
use crate::window::RollingWindow;

/// Stochastic RSI reported when the window has no range (max == min).
pub const NEUTRAL_STOCH_RSI: f64 = 50.0;

/// Normalize `rsi` against the window range into [0, 100].
///
/// A flat or empty window yields `NEUTRAL_STOCH_RSI`.
pub fn stochastic_rsi(rsi: f64, window: &RollingWindow) -> f64 {
    let (Some(lowest), Some(highest)) = (window.min(), window.max()) else {
        return NEUTRAL_STOCH_RSI;
    };

    let range = highest - lowest;
    if !rsi.is_finite() || !range.is_finite() || range <= 0.0 {
        return NEUTRAL_STOCH_RSI;
    }

    (((rsi - lowest) / range) * 100.0).clamp(0.0, 100.0)
}

/// Per-instrument signal state machine.
///
/// Single writer: `update`/`evaluate` for one instrument must be called
/// sequentially. The engine holds no locks.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    settings: Settings,
    rsi_history: RollingWindow,
    trend: TrendState,
    stoch_rsi: f64,
}

impl SignalEngine {
    /// Create an engine, validating the settings.
    pub fn new(settings: Settings) -> Result<Self, StrategyError> {
        settings.validate()?;

        Ok(Self {
            rsi_history: RollingWindow::new(settings.rsi_lookback),
            settings,
            trend: TrendState::default(),
            stoch_rsi: NEUTRAL_STOCH_RSI,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn trend(&self) -> &TrendState {
        &self.trend
    }

    /// Stochastic RSI computed by the last `update`.
    pub fn stoch_rsi(&self) -> f64 {
        self.stoch_rsi
    }

    /// Feed the snapshot's RSI into the window and recompute stochastic RSI.
    ///
    /// A non-finite RSI is not stored; the stochastic value for that candle
    /// is neutral.
    pub fn update(&mut self, snapshot: &IndicatorSnapshot) -> f64 {
        self.stoch_rsi = if snapshot.rsi.is_finite() {
            self.rsi_history.push(snapshot.rsi);
            stochastic_rsi(snapshot.rsi, &self.rsi_history)
        } else {
            NEUTRAL_STOCH_RSI
        };

        self.stoch_rsi
    }

    /// Which episode direction, if any, the snapshot qualifies for.
    fn condition(&self, snapshot: &IndicatorSnapshot) -> Direction {
        let s = &self.settings;
        let stoch_rsi = self.stoch_rsi;

        if snapshot.ppo_histogram > s.ppo.up && (stoch_rsi > s.rsi.high || snapshot.tsi > s.tsi.high)
        {
            Direction::Up
        } else if snapshot.ppo_histogram < s.ppo.down
            && (stoch_rsi < s.rsi.low || snapshot.tsi < s.tsi.low)
        {
            Direction::Down
        } else {
            Direction::None
        }
    }

    /// Evaluate the snapshot against the thresholds and advance the trend.
    ///
    /// Must follow `update` for the same snapshot. Neutral candles leave the
    /// trend untouched, so one quiet candle does not break an episode.
    pub fn evaluate(&mut self, snapshot: &IndicatorSnapshot) -> Advice {
        let direction = self.condition(snapshot);
        let timestamp_ms = snapshot.timestamp_ms;

        if direction == Direction::None {
            return Advice::none(timestamp_ms);
        }

        if !self.trend.advance(direction, self.settings.persistence) {
            return Advice::none(timestamp_ms);
        }

        let s = &self.settings;
        if direction == Direction::Up {
            debug!(
                ppo = snapshot.ppo_histogram,
                ppo_up = s.ppo.up,
                stoch_rsi = self.stoch_rsi,
                rsi_high = s.rsi.high,
                tsi = snapshot.tsi,
                tsi_high = s.tsi.high,
                rsi_passed = self.stoch_rsi > s.rsi.high,
                tsi_passed = snapshot.tsi > s.tsi.high,
                duration = self.trend.duration,
                "advising short"
            );
            Advice::short(timestamp_ms)
        } else {
            debug!(
                ppo = snapshot.ppo_histogram,
                ppo_down = s.ppo.down,
                stoch_rsi = self.stoch_rsi,
                rsi_low = s.rsi.low,
                tsi = snapshot.tsi,
                tsi_low = s.tsi.low,
                rsi_passed = self.stoch_rsi < s.rsi.low,
                tsi_passed = snapshot.tsi < s.tsi.low,
                duration = self.trend.duration,
                "advising long"
            );
            Advice::long(timestamp_ms)
        }
    }

    /// `update` followed by `evaluate`.
    pub fn on_snapshot(&mut self, snapshot: &IndicatorSnapshot) -> Advice {
        self.update(snapshot);
        self.evaluate(snapshot)
    }
}

/// `Strategy` wrapper around a `SignalEngine` for one pair.
pub struct PpoRsiTsi {
    id: String,
    engine: SignalEngine,
}

impl PpoRsiTsi {
    pub fn new(id: impl Into<String>, settings: Settings) -> Result<Self, StrategyError> {
        Ok(Self {
            id: id.into(),
            engine: SignalEngine::new(settings)?,
        })
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }
}

#[async_trait]
impl Strategy for PpoRsiTsi {
    fn id(&self) -> &str {
        &self.id
    }

    async fn on_snapshot(&mut self, snapshot: &IndicatorSnapshot) -> Result<Advice, StrategyError> {
        Ok(self.engine.on_snapshot(snapshot))
    }
}
