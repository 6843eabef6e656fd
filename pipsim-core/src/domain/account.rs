//! Account state: balance, realized profit, open positions.

use super::ids::{AccountId, TradeId, TransactionId};
use super::instrument::CurrencyPair;
use super::money::Pippettes;
use super::trade::Trade;
use serde::{Deserialize, Serialize};

/// One trading account. Mutated exclusively through the ledger operations
/// in [`crate::ledger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Pippettes,
    /// Cumulative realized profit across all closed trades.
    pub realized_pl: Pippettes,
    pub last_transaction_id: TransactionId,
    pub open_trades: Vec<Trade>,
}

impl Account {
    pub fn new(id: AccountId, balance: Pippettes) -> Self {
        Self {
            id,
            balance,
            realized_pl: Pippettes::ZERO,
            last_transaction_id: TransactionId::default(),
            open_trades: Vec::new(),
        }
    }

    /// The open trade for a pair, if any. Positions are keyed by the pair
    /// as traded, not its canonical direction.
    pub fn open_trade(&self, pair: CurrencyPair) -> Option<&Trade> {
        self.open_trades.iter().find(|t| t.pair == pair)
    }

    pub fn open_trade_by_id(&self, id: TradeId) -> Option<&Trade> {
        self.open_trades.iter().find(|t| t.id == id)
    }

    /// True if a position is open for the pair or its inverse. At most one
    /// of the two may be open at a time.
    pub fn has_exposure(&self, pair: CurrencyPair) -> bool {
        let inverse = pair.inverse();
        self.open_trades
            .iter()
            .any(|t| t.pair == pair || t.pair == inverse)
    }

    /// Sum of unrealized profit across open positions, as last marked.
    pub fn unrealized_pl(&self) -> Pippettes {
        self.open_trades.iter().map(|t| t.unrealized_pl).sum()
    }

    /// Net asset value: balance plus the value of all open positions at
    /// their last mark.
    pub fn net_asset_value(&self) -> Pippettes {
        self.balance + self.open_trades.iter().map(|t| t.net_asset_value()).sum()
    }
}
