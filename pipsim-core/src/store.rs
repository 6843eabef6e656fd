//! Optional persistent store for accounts, trades, and orders.
//!
//! Upserts are idempotent and keyed by natural id. The simulation calls the
//! store opportunistically after each tick; failures are logged by the
//! caller and never affect correctness within a run.

use crate::domain::{Account, AccountId, Order, Trade};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("store operation failed: {cause}")]
pub struct StoreError {
    pub cause: String,
}

impl StoreError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self { cause: cause.into() }
    }
}

pub trait StateStore: Send + Sync {
    fn upsert_account(&self, account: &Account) -> Result<(), StoreError>;
    fn upsert_trade(&self, account: &AccountId, trade: &Trade) -> Result<(), StoreError>;
    fn upsert_order(&self, order: &Order) -> Result<(), StoreError>;
    fn find_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;
}

/// In-memory store, useful for tests and single-run simulations.
#[derive(Default)]
pub struct MemoryStore {
    accounts: Mutex<HashMap<AccountId, Account>>,
    trades: Mutex<HashMap<(AccountId, crate::domain::TradeId), Trade>>,
    orders: Mutex<HashMap<crate::domain::OrderId, Order>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trade_count(&self) -> usize {
        self.trades.lock().unwrap().len()
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.trades.lock().unwrap().values().cloned().collect()
    }
}

impl StateStore for MemoryStore {
    fn upsert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    fn upsert_trade(&self, account: &AccountId, trade: &Trade) -> Result<(), StoreError> {
        self.trades
            .lock()
            .unwrap()
            .insert((account.clone(), trade.id), trade.clone());
        Ok(())
    }

    fn upsert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.lock().unwrap().insert(order.id, order.clone());
        Ok(())
    }

    fn find_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.lock().unwrap().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Pippettes;

    #[test]
    fn upsert_is_idempotent() {
        let store = MemoryStore::new();
        let mut account = Account::new(AccountId::new("a1"), Pippettes(100_000));

        store.upsert_account(&account).unwrap();
        account.balance = Pippettes(99_000);
        store.upsert_account(&account).unwrap();

        let found = store.find_account(&account.id).unwrap().unwrap();
        assert_eq!(found.balance, Pippettes(99_000));
    }

    #[test]
    fn missing_account_is_none() {
        let store = MemoryStore::new();
        assert!(store.find_account(&AccountId::new("nope")).unwrap().is_none());
    }
}
