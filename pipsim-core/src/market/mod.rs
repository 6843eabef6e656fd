//! Market side: price feeds, the forex calendar, and the order-matching
//! engine.

pub mod engine;
pub mod feed;
pub mod hours;

pub use engine::{MarketEngine, OrderEvent, OrderRequest};
pub use feed::{HistoricalFeed, MarketError, PriceFeed};
pub use hours::ForexHours;
