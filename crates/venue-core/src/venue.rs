//! Venue adapter contract.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{Balance, Capabilities, OrderResult, OrderStatus, Ticker, Trade};
use rust_decimal::Decimal;

use crate::error::VenueError;

/// Normalized interface to one exchange market.
///
/// An adapter is bound to a single `(currency, asset)` pair; amounts are in
/// the asset, prices in the currency. Adapters should return structured
/// [`VenueErrorKind`](crate::VenueErrorKind)s where the transport tells them
/// what went wrong.
#[async_trait]
pub trait Venue: Send + Sync {
    fn capabilities(&self) -> &Capabilities;

    /// The `(currency, asset)` pair this adapter trades.
    fn pair(&self) -> (&str, &str);

    async fn get_portfolio(&self) -> Result<Vec<Balance>, VenueError>;

    async fn get_ticker(&self) -> Result<Ticker, VenueError>;

    /// Fee rate as a fraction (0.002 = 0.2%).
    async fn get_fee(&self) -> Result<Decimal, VenueError>;

    async fn buy(&self, amount: Decimal, price: Decimal) -> Result<OrderResult, VenueError>;

    async fn sell(&self, amount: Decimal, price: Decimal) -> Result<OrderResult, VenueError>;

    /// Whether the order is completely filled.
    async fn check_order(&self, id: &str) -> Result<bool, VenueError>;

    async fn get_order(&self, id: &str) -> Result<OrderStatus, VenueError>;

    async fn cancel_order(&self, id: &str) -> Result<(), VenueError>;

    /// Trades since `since` (all when `None`), oldest first unless
    /// `descending`.
    async fn get_trades(
        &self,
        since: Option<DateTime<Utc>>,
        descending: bool,
    ) -> Result<Vec<Trade>, VenueError>;
}

/// Thread-safe shared venue.
pub type SharedVenue = Arc<dyn Venue>;
