//! Scripted venue for coordinator and runner tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use model::{Balance, Capabilities, OrderResult, OrderStatus, Ticker, Trade};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use venue_core::{PaperVenue, Venue, VenueError};

/// Paper venue with injectable failures and delayed fills.
pub(crate) struct ScriptedVenue {
    inner: PaperVenue,
    failures: Mutex<HashMap<&'static str, VecDeque<VenueError>>>,
    always: Mutex<HashMap<&'static str, VenueError>>,
    calls: Mutex<HashMap<&'static str, u32>>,
    unfilled_checks: Mutex<u32>,
}

impl ScriptedVenue {
    pub(crate) fn new(inner: PaperVenue) -> Self {
        Self {
            inner,
            failures: Mutex::new(HashMap::new()),
            always: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            unfilled_checks: Mutex::new(0),
        }
    }

    /// Fail the next `times` calls to `operation` with `error`.
    pub(crate) fn fail(self, operation: &'static str, error: VenueError, times: usize) -> Self {
        self.failures
            .lock()
            .entry(operation)
            .or_default()
            .extend(std::iter::repeat(error).take(times));
        self
    }

    /// Fail every call to `operation` with `error`.
    pub(crate) fn fail_always(self, operation: &'static str, error: VenueError) -> Self {
        self.always.lock().insert(operation, error);
        self
    }

    /// Report orders as unfilled for the next `checks` calls to `check_order`.
    pub(crate) fn unfilled_for(self, checks: u32) -> Self {
        *self.unfilled_checks.lock() = checks;
        self
    }

    pub(crate) fn calls(&self, operation: &str) -> u32 {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    pub(crate) fn paper(&self) -> &PaperVenue {
        &self.inner
    }

    fn script(&self, operation: &'static str) -> Result<(), VenueError> {
        *self.calls.lock().entry(operation).or_default() += 1;
        if let Some(err) = self.always.lock().get(operation) {
            return Err(err.clone());
        }
        match self.failures.lock().get_mut(operation).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Venue for ScriptedVenue {
    fn capabilities(&self) -> &Capabilities {
        self.inner.capabilities()
    }

    fn pair(&self) -> (&str, &str) {
        self.inner.pair()
    }

    async fn get_portfolio(&self) -> Result<Vec<Balance>, VenueError> {
        self.script("getPortfolio")?;
        self.inner.get_portfolio().await
    }

    async fn get_ticker(&self) -> Result<Ticker, VenueError> {
        self.script("getTicker")?;
        self.inner.get_ticker().await
    }

    async fn get_fee(&self) -> Result<Decimal, VenueError> {
        self.script("getFee")?;
        self.inner.get_fee().await
    }

    async fn buy(&self, amount: Decimal, price: Decimal) -> Result<OrderResult, VenueError> {
        self.script("buy")?;
        self.inner.buy(amount, price).await
    }

    async fn sell(&self, amount: Decimal, price: Decimal) -> Result<OrderResult, VenueError> {
        self.script("sell")?;
        self.inner.sell(amount, price).await
    }

    async fn check_order(&self, id: &str) -> Result<bool, VenueError> {
        self.script("checkOrder")?;
        {
            let mut unfilled = self.unfilled_checks.lock();
            if *unfilled > 0 {
                *unfilled -= 1;
                return Ok(false);
            }
        }
        self.inner.check_order(id).await
    }

    async fn get_order(&self, id: &str) -> Result<OrderStatus, VenueError> {
        self.script("getOrder")?;
        self.inner.get_order(id).await
    }

    async fn cancel_order(&self, id: &str) -> Result<(), VenueError> {
        self.script("cancelOrder")?;
        self.inner.cancel_order(id).await
    }

    async fn get_trades(
        &self,
        since: Option<chrono::DateTime<chrono::Utc>>,
        descending: bool,
    ) -> Result<Vec<Trade>, VenueError> {
        self.script("getTrades")?;
        self.inner.get_trades(since, descending).await
    }
}
