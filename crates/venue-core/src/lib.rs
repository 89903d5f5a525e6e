//! Venue adapter boundary.
//!
//! - **Venue trait**: the normalized exchange operations the execution layer
//!   consumes
//! - **VenueError**: failure with a structured kind attached by the adapter
//! - **ErrorClassifier**: decides whether a failure is worth retrying
//! - **PaperVenue**: in-memory adapter for dry runs and tests

mod classifier;
mod error;
mod paper;
mod venue;

pub use classifier::{Classification, ClassifierRule, ErrorClassifier};
pub use error::{VenueError, VenueErrorKind};
pub use paper::{generate_order_id, PaperVenue};
pub use venue::{SharedVenue, Venue};
