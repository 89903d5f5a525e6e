//! Plain data shared across the workspace.
//!
//! Nothing in here owns behavior beyond small conveniences: per-candle
//! indicator snapshots flow into the signal engine, advice flows out, and the
//! venue types describe what an exchange adapter returns.

mod advice;
mod market;
mod venue;

pub use advice::{Advice, AdviceAction};
pub use market::IndicatorSnapshot;
pub use venue::{
    Balance, Capabilities, Market, MinimalOrder, OrderResult, OrderSide, OrderStatus, OrderUnit,
    Ticker, Trade,
};
