//! Signal generation for the trading engine.
//!
//! - **Settings**: thresholds and debounce parameters, deserializable from
//!   the usual `TSI`/`PPO`/`RSI` JSON shape
//! - **SignalEngine**: the per-instrument PPO/RSI/TSI state machine
//! - **Strategy trait**: async wrapper the runner drives, implemented by
//!   `PpoRsiTsi`

mod engine;
mod error;
mod settings;
mod strategy;
mod trend;
mod window;

pub use engine::{stochastic_rsi, PpoRsiTsi, SignalEngine, NEUTRAL_STOCH_RSI};
pub use error::StrategyError;
pub use settings::{Band, PpoBand, Settings};
pub use strategy::{BoxedStrategy, Strategy};
pub use trend::{Direction, TrendState};
pub use window::RollingWindow;

pub use model::{Advice, AdviceAction, IndicatorSnapshot};
