//! Execution coordinator - turns advice into venue orders.
//!
//! For each actionable advice on a pair:
//!
//! 1. Take the pair's placement slot, or fail with `PlacementInFlight`
//! 2. Read portfolio and ticker (forever policy)
//! 3. Size the order and check it against the market's minimal order
//! 4. Place it (critical policy)
//! 5. Poll `checkOrder` (forever policy) until filled or out of checks, then
//!    either fetch the fill or cancel (critical policy)
//!
//! Step 5's check and cancel run under the order id's lock. The placement
//! slot is held until the order is settled, so a persisted signal that is
//! re-evaluated cannot submit a second order for the same pair.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use execution_core::{CancelHandle, KeyedLocks, RetryError, RetryPolicy, RetryScheduler};
use metrics::SharedMetrics;
use model::{Advice, AdviceAction, Balance, OrderSide, OrderStatus, OrderUnit, Ticker};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, error, info, warn};
use venue_core::{ErrorClassifier, SharedVenue, Venue, VenueError};

use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;

/// Decimal places order amounts are truncated to.
const AMOUNT_DECIMALS: u32 = 8;

/// Key identifying a pair, `CURRENCY/ASSET`.
pub fn pair_key(currency: &str, asset: &str) -> String {
    format!("{}/{}", currency, asset)
}

/// How an advice was carried out.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The order filled.
    Filled(OrderStatus),
    /// The order did not fill within the allowed checks and was canceled.
    Canceled(String),
    /// Nothing to do (`Advice::None`).
    Skipped,
}

/// Binds one venue per pair and executes advice against it.
pub struct ExecutionCoordinator {
    config: CoordinatorConfig,
    venues: HashMap<String, SharedVenue>,
    scheduler: RetryScheduler,
    placement_slots: KeyedLocks,
    order_locks: KeyedLocks,
    metrics: SharedMetrics,
    cancel: CancelHandle,
}

/// Thread-safe shared coordinator.
pub type SharedCoordinator = Arc<ExecutionCoordinator>;

impl ExecutionCoordinator {
    /// Create a coordinator with the default error classifier.
    pub fn new(config: CoordinatorConfig, metrics: SharedMetrics) -> Result<Self, CoordinatorError> {
        config.validate()?;

        Ok(Self {
            config,
            venues: HashMap::new(),
            scheduler: RetryScheduler::new(ErrorClassifier::default()).with_metrics(metrics.clone()),
            placement_slots: KeyedLocks::new(),
            order_locks: KeyedLocks::new(),
            metrics,
            cancel: CancelHandle::new(),
        })
    }

    /// Replace the error classifier.
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.scheduler = RetryScheduler::new(classifier).with_metrics(self.metrics.clone());
        self
    }

    /// Bind `venue` to its pair, replacing any previous binding. Returns the
    /// pair key.
    pub fn register_venue(&mut self, venue: SharedVenue) -> String {
        let (currency, asset) = venue.pair();
        let key = pair_key(currency, asset);

        info!(
            pair = %key,
            venue = %venue.capabilities().slug,
            "registered venue"
        );

        self.venues.insert(key.clone(), venue);
        key
    }

    pub fn venue(&self, pair: &str) -> Result<&SharedVenue, CoordinatorError> {
        self.venues
            .get(pair)
            .ok_or_else(|| CoordinatorError::UnknownPair(pair.to_string()))
    }

    pub fn pairs(&self) -> impl Iterator<Item = &str> {
        self.venues.keys().map(String::as_str)
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Cancel every scheduled retry. Attempts already running finish.
    pub fn cancel_pending(&self) {
        info!("canceling pending venue operations");
        self.cancel.cancel();
    }

    /// Carry out `advice` on `pair`.
    ///
    /// Fatal and exhausted venue failures are logged and returned; nothing is
    /// retried here beyond what the policies do.
    pub async fn execute(
        &self,
        pair: &str,
        advice: &Advice,
    ) -> Result<ExecutionOutcome, CoordinatorError> {
        let side = match advice.action {
            AdviceAction::Long => OrderSide::Buy,
            AdviceAction::Short => OrderSide::Sell,
            AdviceAction::None => return Ok(ExecutionOutcome::Skipped),
        };

        let venue = self.venue(pair)?.clone();

        let Some(_slot) = self.placement_slots.try_lock(pair) else {
            warn!(pair = %pair, side = ?side, "order already in flight, advice dropped");
            return Err(CoordinatorError::PlacementInFlight(pair.to_string()));
        };

        let result = self.place_and_settle(pair, venue.as_ref(), side).await;

        match &result {
            Err(CoordinatorError::Retry(retry)) => error!(
                pair = %pair,
                side = ?side,
                attempts = ?retry.attempts(),
                venue_kind = ?retry.venue_error().map(|e| e.kind),
                error = %retry,
                "advice execution failed"
            ),
            Err(e) => error!(pair = %pair, side = ?side, error = %e, "advice execution failed"),
            Ok(_) => {}
        }

        result
    }

    async fn place_and_settle(
        &self,
        pair: &str,
        venue: &dyn Venue,
        side: OrderSide,
    ) -> Result<ExecutionOutcome, CoordinatorError> {
        let portfolio = self.forever("getPortfolio", || venue.get_portfolio()).await?;
        let ticker = self.forever("getTicker", || venue.get_ticker()).await?;

        let (amount, price) = self.size_order(pair, venue, side, &portfolio, &ticker)?;

        info!(
            pair = %pair,
            side = ?side,
            amount = %amount,
            price = %price,
            "placing order"
        );

        let order = match side {
            OrderSide::Buy => self.critical("buy", || venue.buy(amount, price)).await?,
            OrderSide::Sell => self.critical("sell", || venue.sell(amount, price)).await?,
        };
        self.metrics.inc_orders_placed();

        info!(pair = %pair, order_id = %order.id, "order placed");

        self.settle(pair, venue, &order.id).await
    }

    /// Poll the order until it fills, or cancel it.
    async fn settle(
        &self,
        pair: &str,
        venue: &dyn Venue,
        id: &str,
    ) -> Result<ExecutionOutcome, CoordinatorError> {
        let _order = self.order_locks.lock(id).await;

        for check in 1..=self.config.max_order_checks {
            let filled = self.forever("checkOrder", || venue.check_order(id)).await?;

            if filled {
                let status = self.forever("getOrder", || venue.get_order(id)).await?;
                self.metrics.inc_orders_filled();
                info!(
                    pair = %pair,
                    order_id = %id,
                    amount = %status.amount,
                    price = %status.price,
                    "order filled"
                );
                return Ok(ExecutionOutcome::Filled(status));
            }

            debug!(pair = %pair, order_id = %id, check, "order not filled yet");

            if check < self.config.max_order_checks {
                tokio::time::sleep(self.config.order_check_interval).await;
            }
        }

        warn!(
            pair = %pair,
            order_id = %id,
            checks = self.config.max_order_checks,
            "order not filled, canceling"
        );

        self.critical("cancelOrder", || venue.cancel_order(id)).await?;
        self.metrics.inc_orders_canceled();

        info!(pair = %pair, order_id = %id, "order canceled");
        Ok(ExecutionOutcome::Canceled(id.to_string()))
    }

    /// Amount and limit price for an order on `side`.
    ///
    /// Buys spend `commit_fraction` of the currency balance at the ask; sells
    /// offer `commit_fraction` of the asset balance at the bid.
    fn size_order(
        &self,
        pair: &str,
        venue: &dyn Venue,
        side: OrderSide,
        portfolio: &[Balance],
        ticker: &Ticker,
    ) -> Result<(Decimal, Decimal), CoordinatorError> {
        let (currency, asset) = venue.pair();
        let fraction = self.config.commit_fraction;

        let (amount, price) = match side {
            OrderSide::Buy => {
                if ticker.ask <= Decimal::ZERO {
                    return Err(CoordinatorError::InvalidTicker(pair.to_string()));
                }
                let amount = balance_of(portfolio, currency)
                    .checked_mul(fraction)
                    .and_then(|spend| spend.checked_div(ticker.ask));
                (amount, ticker.ask)
            }
            OrderSide::Sell => {
                if ticker.bid <= Decimal::ZERO {
                    return Err(CoordinatorError::InvalidTicker(pair.to_string()));
                }
                (balance_of(portfolio, asset).checked_mul(fraction), ticker.bid)
            }
        };

        let overflow = || CoordinatorError::SizingOverflow(pair.to_string());
        let amount = amount
            .ok_or_else(overflow)?
            .round_dp_with_strategy(AMOUNT_DECIMALS, RoundingStrategy::ToZero);

        let minimal = venue
            .capabilities()
            .market(currency, asset)
            .map(|m| m.minimal_order);

        let (size, minimum) = match minimal {
            Some(min) => match min.unit {
                OrderUnit::Asset => (amount, min.amount),
                OrderUnit::Currency => (amount.checked_mul(price).ok_or_else(overflow)?, min.amount),
            },
            None => (amount, Decimal::ZERO),
        };

        if amount <= Decimal::ZERO || size < minimum {
            warn!(
                pair = %pair,
                side = ?side,
                amount = %amount,
                minimum = %minimum,
                "order below minimal order"
            );
            return Err(CoordinatorError::BelowMinimalOrder {
                pair: pair.to_string(),
                amount,
                minimum,
            });
        }

        Ok((amount, price))
    }

    async fn forever<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, VenueError>>,
    {
        self.run(operation, &self.config.forever_policy, op).await
    }

    async fn critical<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, VenueError>>,
    {
        self.run(operation, &self.config.critical_policy, op).await
    }

    async fn run<T, F, Fut>(
        &self,
        operation: &str,
        policy: &RetryPolicy,
        op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, VenueError>>,
    {
        self.scheduler.run(operation, policy, &self.cancel, op).await
    }
}

/// Balance of `name`, zero when absent.
fn balance_of(portfolio: &[Balance], name: &str) -> Decimal {
    portfolio
        .iter()
        .find(|b| b.name.eq_ignore_ascii_case(name))
        .map(|b| b.amount)
        .unwrap_or(Decimal::ZERO)
}
