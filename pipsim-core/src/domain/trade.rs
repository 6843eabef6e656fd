//! Trade — an open or closed position in one pair.

use super::ids::TradeId;
use super::instrument::CurrencyPair;
use super::money::{Pippettes, Units};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A position: long the pair's base currency. Shorts are longs on the
/// inverse pair, so `initial_units` is always positive.
///
/// Realized and unrealized profit are mutually exclusive: while the trade
/// is open realized is zero, and once closed unrealized is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub pair: CurrencyPair,
    pub entry_price: Pippettes,
    pub initial_units: Units,
    pub current_units: Units,
    pub realized_pl: Pippettes,
    pub unrealized_pl: Pippettes,
    pub opened_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>,
}

impl Trade {
    pub fn open(
        id: TradeId,
        pair: CurrencyPair,
        entry_price: Pippettes,
        units: Units,
        opened_at: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            pair,
            entry_price,
            initial_units: units,
            current_units: units,
            realized_pl: Pippettes::ZERO,
            unrealized_pl: Pippettes::ZERO,
            opened_at,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    /// Refresh unrealized profit against the current price. No-op on a
    /// closed trade.
    pub fn mark_to_market(&mut self, price: Pippettes) {
        if self.is_open() {
            self.unrealized_pl = (price - self.entry_price).scaled_by(self.current_units);
        }
    }

    /// Current value of the position at the given price: entry cost plus
    /// unrealized profit.
    pub fn net_asset_value(&self) -> Pippettes {
        self.entry_price.scaled_by(self.current_units) + self.unrealized_pl
    }

    /// The closed copy of this trade: profit realized at the exit price,
    /// unrealized zeroed.
    pub fn into_closed(mut self, exit_price: Pippettes, closed_at: NaiveDateTime) -> Trade {
        self.realized_pl = (exit_price - self.entry_price).scaled_by(self.current_units);
        self.unrealized_pl = Pippettes::ZERO;
        self.closed_at = Some(closed_at);
        self
    }
}
