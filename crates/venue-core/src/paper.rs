//! In-memory venue for paper trading.
//!
//! Orders fill immediately at the requested price. Balances are debited and
//! credited net of the configured fee, and every fill is recorded as a
//! trade so `get_trades` has something to return.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    Balance, Capabilities, Market, MinimalOrder, OrderResult, OrderSide, OrderStatus, OrderUnit,
    Ticker, Trade,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::VenueError;
use crate::venue::Venue;

/// Generate a paper order id.
///
/// Format: `paper_{uuid}` with the v4 UUID in simple format.
pub fn generate_order_id() -> String {
    format!("paper_{}", Uuid::new_v4().as_simple())
}

#[derive(Debug, Clone)]
struct PaperOrder {
    side: OrderSide,
    status: OrderStatus,
}

#[derive(Debug, Default)]
struct PaperState {
    balances: HashMap<String, Decimal>,
    ticker: Option<Ticker>,
    orders: HashMap<String, PaperOrder>,
    trades: Vec<Trade>,
}

/// Paper trading venue for one `(currency, asset)` pair.
pub struct PaperVenue {
    capabilities: Capabilities,
    currency: String,
    asset: String,
    fee: Decimal,
    state: Mutex<PaperState>,
}

impl PaperVenue {
    /// Default fee, 0.2%.
    pub const DEFAULT_FEE: Decimal = Decimal::from_parts(2, 0, 0, false, 3);

    pub fn new(currency: impl Into<String>, asset: impl Into<String>) -> Self {
        let currency = currency.into();
        let asset = asset.into();

        let capabilities = Capabilities {
            name: "Paper Trader".to_string(),
            slug: "paper".to_string(),
            currencies: vec![currency.clone()],
            assets: vec![asset.clone()],
            markets: vec![Market {
                pair: (currency.clone(), asset.clone()),
                minimal_order: MinimalOrder {
                    amount: Decimal::new(1, 8),
                    unit: OrderUnit::Asset,
                },
            }],
            requires: Vec::new(),
            tradable: true,
            provides_history: None,
        };

        Self {
            capabilities,
            currency,
            asset,
            fee: Self::DEFAULT_FEE,
            state: Mutex::new(PaperState::default()),
        }
    }

    pub fn with_balance(self, name: impl Into<String>, amount: Decimal) -> Self {
        self.state.lock().balances.insert(name.into(), amount);
        self
    }

    pub fn with_ticker(self, bid: Decimal, ask: Decimal) -> Self {
        self.set_ticker(bid, ask);
        self
    }

    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_minimal_order(mut self, amount: Decimal, unit: OrderUnit) -> Self {
        for market in &mut self.capabilities.markets {
            market.minimal_order = MinimalOrder { amount, unit };
        }
        self
    }

    /// Move the market.
    pub fn set_ticker(&self, bid: Decimal, ask: Decimal) {
        self.state.lock().ticker = Some(Ticker { bid, ask });
    }

    /// Current balance of `name`, zero when never funded.
    pub fn balance(&self, name: &str) -> Decimal {
        self.state
            .lock()
            .balances
            .get(name)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().orders.len()
    }

    fn fill(
        &self,
        operation: &str,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    ) -> Result<OrderResult, VenueError> {
        if amount <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(VenueError::rejected(
                operation,
                format!("Invalid order: amount {} at price {}", amount, price),
            ));
        }

        let keep = Decimal::ONE - self.fee;
        let overflow = || {
            VenueError::rejected(
                operation,
                format!("Order value overflows: amount {} at price {}", amount, price),
            )
        };
        let cost = amount.checked_mul(price).ok_or_else(overflow)?;

        let (debit_name, debit, credit_name, credit) = match side {
            OrderSide::Buy => (&self.currency, cost, &self.asset, amount.checked_mul(keep)),
            OrderSide::Sell => (&self.asset, amount, &self.currency, cost.checked_mul(keep)),
        };
        let credit = credit.ok_or_else(overflow)?;

        let mut state = self.state.lock();

        let available = state.balances.get(debit_name).copied().unwrap_or(Decimal::ZERO);
        if available < debit {
            return Err(VenueError::rejected(
                operation,
                format!(
                    "Insufficient funds: need {} {}, have {}",
                    debit, debit_name, available
                ),
            ));
        }

        let held = state.balances.get(credit_name).copied().unwrap_or(Decimal::ZERO);
        let credited = held.checked_add(credit).ok_or_else(overflow)?;

        state.balances.insert(debit_name.clone(), available - debit);
        state.balances.insert(credit_name.clone(), credited);

        let id = generate_order_id();
        let date = Utc::now();
        let status = OrderStatus {
            price,
            amount,
            date,
        };

        state.trades.push(Trade {
            date,
            price,
            amount,
            tid: id.clone(),
        });
        state.orders.insert(id.clone(), PaperOrder { side, status });

        info!(
            order_id = %id,
            side = ?side,
            amount = %amount,
            price = %price,
            "Paper order filled"
        );

        Ok(OrderResult { id })
    }

    fn order(&self, operation: &str, id: &str) -> Result<PaperOrder, VenueError> {
        self.state
            .lock()
            .orders
            .get(id)
            .cloned()
            .ok_or_else(|| VenueError::rejected(operation, format!("Unknown order {}", id)))
    }
}

#[async_trait]
impl Venue for PaperVenue {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn pair(&self) -> (&str, &str) {
        (&self.currency, &self.asset)
    }

    async fn get_portfolio(&self) -> Result<Vec<Balance>, VenueError> {
        let state = self.state.lock();
        let mut balances: Vec<Balance> = [&self.currency, &self.asset]
            .into_iter()
            .map(|name| {
                Balance::new(
                    name.clone(),
                    state.balances.get(name).copied().unwrap_or(Decimal::ZERO),
                )
            })
            .collect();

        let mut others: Vec<_> = state
            .balances
            .iter()
            .filter(|(name, _)| **name != self.currency && **name != self.asset)
            .map(|(name, amount)| Balance::new(name.clone(), *amount))
            .collect();
        others.sort_by(|a, b| a.name.cmp(&b.name));
        balances.extend(others);

        Ok(balances)
    }

    async fn get_ticker(&self) -> Result<Ticker, VenueError> {
        self.state
            .lock()
            .ticker
            .ok_or_else(|| VenueError::rejected("getTicker", "No ticker set"))
    }

    async fn get_fee(&self) -> Result<Decimal, VenueError> {
        Ok(self.fee)
    }

    async fn buy(&self, amount: Decimal, price: Decimal) -> Result<OrderResult, VenueError> {
        self.fill("buy", OrderSide::Buy, amount, price)
    }

    async fn sell(&self, amount: Decimal, price: Decimal) -> Result<OrderResult, VenueError> {
        self.fill("sell", OrderSide::Sell, amount, price)
    }

    async fn check_order(&self, id: &str) -> Result<bool, VenueError> {
        self.order("checkOrder", id).map(|_| true)
    }

    async fn get_order(&self, id: &str) -> Result<OrderStatus, VenueError> {
        self.order("getOrder", id).map(|order| order.status)
    }

    async fn cancel_order(&self, id: &str) -> Result<(), VenueError> {
        // Paper orders are filled on placement; canceling one is a no-op
        let order = self.order("cancelOrder", id)?;
        debug!(order_id = %id, side = ?order.side, "Cancel of filled paper order ignored");
        Ok(())
    }

    async fn get_trades(
        &self,
        since: Option<DateTime<Utc>>,
        descending: bool,
    ) -> Result<Vec<Trade>, VenueError> {
        let state = self.state.lock();
        let mut trades: Vec<Trade> = state
            .trades
            .iter()
            .filter(|t| since.map_or(true, |s| t.date >= s))
            .cloned()
            .collect();

        if descending {
            trades.reverse();
        }

        Ok(trades)
    }
}
