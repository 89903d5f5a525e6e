use serde::{Deserialize, Serialize};

/// Indicator values computed for one candle.
///
/// `ppo_histogram` is the PPO histogram (PPO minus its signal line), `rsi`
/// the raw RSI before stochastic normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub timestamp_ms: i64,
    pub tsi: f64,
    pub ppo_histogram: f64,
    pub rsi: f64,
}

impl IndicatorSnapshot {
    pub fn new(timestamp_ms: i64, tsi: f64, ppo_histogram: f64, rsi: f64) -> Self {
        Self {
            timestamp_ms,
            tsi,
            ppo_histogram,
            rsi,
        }
    }
}
