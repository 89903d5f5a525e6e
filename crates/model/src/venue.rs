//! Normalized data returned by venue adapters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Holding of one currency or asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub name: String,
    pub amount: Decimal,
}

impl Balance {
    pub fn new(name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// Best bid and ask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub bid: Decimal,
    pub ask: Decimal,
}

/// Acknowledgment of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub id: String,
}

/// Fill details of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub price: Decimal,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
}

/// A public trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: DateTime<Utc>,
    pub price: Decimal,
    pub amount: Decimal,
    pub tid: String,
}

/// Unit a minimal order amount is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderUnit {
    Asset,
    Currency,
}

/// Smallest order a market accepts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinimalOrder {
    pub amount: Decimal,
    pub unit: OrderUnit,
}

/// A tradable market, as `(currency, asset)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub pair: (String, String),
    pub minimal_order: MinimalOrder,
}

impl Market {
    pub fn currency(&self) -> &str {
        &self.pair.0
    }

    pub fn asset(&self) -> &str {
        &self.pair.1
    }
}

/// Static description of what a venue supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub name: String,
    pub slug: String,
    pub currencies: Vec<String>,
    pub assets: Vec<String>,
    pub markets: Vec<Market>,
    /// Credential names the adapter needs (e.g. `key`, `secret`).
    pub requires: Vec<String>,
    pub tradable: bool,
    /// Field used to page history, if the venue serves historical trades.
    pub provides_history: Option<String>,
}

impl Capabilities {
    /// Find the market trading `asset` against `currency`.
    pub fn market(&self, currency: &str, asset: &str) -> Option<&Market> {
        self.markets
            .iter()
            .find(|m| m.currency().eq_ignore_ascii_case(currency) && m.asset().eq_ignore_ascii_case(asset))
    }

    pub fn supports_currency(&self, currency: &str) -> bool {
        self.currencies.iter().any(|c| c.eq_ignore_ascii_case(currency))
    }

    pub fn supports_asset(&self, asset: &str) -> bool {
        self.assets.iter().any(|a| a.eq_ignore_ascii_case(asset))
    }
}
