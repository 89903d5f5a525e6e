//! Signal engine thresholds.

use serde::{Deserialize, Serialize};

use crate::error::StrategyError;

/// Upper and lower bounds for an oscillator (RSI, TSI).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub high: f64,
    pub low: f64,
}

/// PPO histogram thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PpoBand {
    pub up: f64,
    pub down: f64,
}

/// Configuration for the PPO/RSI/TSI signal engine.
///
/// Deserializes from the usual strategy settings shape:
///
/// ```json
/// {
///   "TSI": { "high": 25, "low": -25 },
///   "PPO": { "up": 0, "down": 0 },
///   "RSI": { "high": 80, "low": 20 },
///   "persistence": 2,
///   "rsiLookback": 14
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "TSI")]
    pub tsi: Band,
    #[serde(rename = "PPO")]
    pub ppo: PpoBand,
    /// Thresholds applied to the stochastic RSI, not the raw RSI.
    #[serde(rename = "RSI")]
    pub rsi: Band,
    /// Consecutive qualifying candles before a trend is confirmed.
    pub persistence: u32,
    /// Number of RSI samples kept for the stochastic range.
    #[serde(rename = "rsiLookback")]
    pub rsi_lookback: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tsi: Band {
                high: 25.0,
                low: -25.0,
            },
            ppo: PpoBand {
                up: 0.0,
                down: 0.0,
            },
            rsi: Band {
                high: 80.0,
                low: 20.0,
            },
            persistence: 2,
            rsi_lookback: 14,
        }
    }
}

impl Settings {
    /// Builder method to set the persistence threshold.
    pub fn with_persistence(mut self, persistence: u32) -> Self {
        self.persistence = persistence;
        self
    }

    /// Builder method to set the stochastic RSI lookback.
    pub fn with_rsi_lookback(mut self, lookback: usize) -> Self {
        self.rsi_lookback = lookback;
        self
    }

    /// Builder method to set the stochastic RSI band.
    pub fn with_rsi(mut self, high: f64, low: f64) -> Self {
        self.rsi = Band { high, low };
        self
    }

    /// Builder method to set the TSI band.
    pub fn with_tsi(mut self, high: f64, low: f64) -> Self {
        self.tsi = Band { high, low };
        self
    }

    /// Builder method to set the PPO histogram thresholds.
    pub fn with_ppo(mut self, up: f64, down: f64) -> Self {
        self.ppo = PpoBand { up, down };
        self
    }

    /// Check that the thresholds describe a usable engine.
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.persistence == 0 {
            return Err(StrategyError::InvalidConfig(
                "persistence must be at least 1".to_string(),
            ));
        }

        if self.rsi_lookback == 0 {
            return Err(StrategyError::InvalidConfig(
                "rsiLookback must be at least 1".to_string(),
            ));
        }

        let thresholds = [
            ("TSI.high", self.tsi.high),
            ("TSI.low", self.tsi.low),
            ("PPO.up", self.ppo.up),
            ("PPO.down", self.ppo.down),
            ("RSI.high", self.rsi.high),
            ("RSI.low", self.rsi.low),
        ];
        if let Some((name, _)) = thresholds.iter().find(|(_, v)| !v.is_finite()) {
            return Err(StrategyError::InvalidConfig(format!(
                "{} must be a finite number",
                name
            )));
        }

        if self.tsi.low > self.tsi.high {
            return Err(StrategyError::InvalidConfig(
                "TSI.low must not exceed TSI.high".to_string(),
            ));
        }

        if self.rsi.low > self.rsi.high {
            return Err(StrategyError::InvalidConfig(
                "RSI.low must not exceed RSI.high".to_string(),
            ));
        }

        if self.ppo.down > self.ppo.up {
            return Err(StrategyError::InvalidConfig(
                "PPO.down must not exceed PPO.up".to_string(),
            ));
        }

        Ok(())
    }
}
