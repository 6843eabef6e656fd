//! Externally reported account changes, the typed shape of the broker
//! gateway's account-changes response.

use crate::domain::{Pippettes, Trade, TradeId, TransactionId, Units};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A trade opened on the broker side since the last known transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOpened {
    pub trade: Trade,
    pub transaction_id: TransactionId,
}

/// A trade closed on the broker side. `units` must match the full open
/// position; partial closes are not modeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeClosed {
    pub trade_id: TradeId,
    pub units: Units,
    pub exit_price: Pippettes,
    pub closed_at: NaiveDateTime,
    pub transaction_id: TransactionId,
}

/// Batch of changes since an account's last applied transaction id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountChangeSet {
    /// The broker's latest transaction id. Equal to the account's own last
    /// applied id when nothing changed — the idempotency guard.
    pub last_transaction_id: TransactionId,
    pub opened: Vec<TradeOpened>,
    pub closed: Vec<TradeClosed>,
}

impl AccountChangeSet {
    pub fn is_empty(&self) -> bool {
        self.opened.is_empty() && self.closed.is_empty()
    }
}

/// Externally reported authoritative account state, compared against the
/// locally recomputed one during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccountState {
    pub nav: Pippettes,
    pub unrealized_pl: Pippettes,
}
