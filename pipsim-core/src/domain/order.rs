//! Order types and the order lifecycle state machine.

use super::ids::{AccountId, OrderId};
use super::instrument::CurrencyPair;
use super::money::{Pippettes, Units};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// What kind of order and its price parameter, if any.
///
/// A single tagged union; shared fields live on [`Order`] and behavior is
/// keyed on the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fill at the current market price on the next evaluation.
    Market,
    /// Fill at the given price or better.
    Limit(Pippettes),
    /// Close-side order that fills once the price reaches the target.
    TakeProfit(Pippettes),
    /// Close-side order that fills once the price breaches the stop.
    StopLoss(Pippettes),
}

/// Order lifecycle states. `Filled` and `Cancelled` are terminal; the
/// market engine is the only mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
}

/// How long an order stays open before it is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExpiryPolicy {
    #[default]
    Never,
    ThreeMonths,
}

impl ExpiryPolicy {
    /// Instant after which the order expires, if any.
    pub fn expires_at(self, submitted_at: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            ExpiryPolicy::Never => None,
            ExpiryPolicy::ThreeMonths => Some(submitted_at + Duration::days(91)),
        }
    }

    pub fn is_expired(self, submitted_at: NaiveDateTime, now: NaiveDateTime) -> bool {
        match self.expires_at(submitted_at) {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// A submitted order. Positive units buy the pair, negative units sell
/// (close); instrument exposure itself is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account: AccountId,
    pub pair: CurrencyPair,
    pub units: Units,
    pub kind: OrderKind,
    pub submitted_at: NaiveDateTime,
    pub expiry: ExpiryPolicy,
    pub status: OrderStatus,
    /// Set exactly once, when the order fills.
    pub executed_price: Option<Pippettes>,
}

impl Order {
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expiry.is_expired(self.submitted_at, now)
    }
}
