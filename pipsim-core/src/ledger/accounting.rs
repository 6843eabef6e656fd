//! Ledger operations: the only mutators of account state.
//!
//! Balance and profit arithmetic is integer pippette arithmetic throughout.
//! Opening a position debits its full cost; closing credits the exit value
//! and realizes profit. Externally reported change sets are applied through
//! the same two operations, guarded by the transaction id.

use super::changes::{AccountChangeSet, ExternalAccountState, TradeClosed, TradeOpened};
use crate::domain::{Account, Pippettes, Trade, TradeId, TransactionId};
use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("a position is already open for {pair} or its inverse")]
    PositionAlreadyOpen { pair: String },

    #[error("no open trade with id {trade_id}")]
    UnknownTrade { trade_id: TradeId },

    #[error("partial close of trade {trade_id}: {requested} of {held} units")]
    PartialClose {
        trade_id: TradeId,
        requested: i64,
        held: i64,
    },

    #[error("transaction id {got} does not advance past {last}")]
    NonMonotonicTransaction {
        last: TransactionId,
        got: TransactionId,
    },
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Balance correction applied so local NAV matches the external one.
    pub adjustment: Pippettes,
    /// Residual unrealized-profit disagreement after the adjustment;
    /// nonzero indicates a modeling bug rather than an expected cost.
    pub unrealized_divergence: Pippettes,
}

impl Account {
    /// Record a newly opened position: debit its cost, track the trade.
    pub fn position_opened(
        &mut self,
        trade: Trade,
        transaction_id: TransactionId,
    ) -> Result<(), LedgerError> {
        if self.has_exposure(trade.pair) {
            return Err(LedgerError::PositionAlreadyOpen {
                pair: trade.pair.to_string(),
            });
        }
        self.advance_transaction(transaction_id)?;

        self.balance -= trade.entry_price.scaled_by(trade.current_units);
        self.open_trades.push(trade);
        Ok(())
    }

    /// Record a position close: credit the exit value, realize profit.
    pub fn position_closed(
        &mut self,
        trade_id: TradeId,
        exit_price: Pippettes,
        closed_at: NaiveDateTime,
        transaction_id: TransactionId,
    ) -> Result<Trade, LedgerError> {
        let index = self
            .open_trades
            .iter()
            .position(|t| t.id == trade_id)
            .ok_or(LedgerError::UnknownTrade { trade_id })?;
        self.advance_transaction(transaction_id)?;

        let closed = self
            .open_trades
            .remove(index)
            .into_closed(exit_price, closed_at);

        self.balance += exit_price.scaled_by(closed.current_units);
        self.realized_pl += closed.realized_pl;
        Ok(closed)
    }

    /// Apply a batch of externally reported changes in transaction order.
    ///
    /// A change set whose last transaction id matches the account's own has
    /// already been applied and is a no-op.
    pub fn process_changes(&mut self, changes: &AccountChangeSet) -> Result<(), LedgerError> {
        if changes.last_transaction_id == self.last_transaction_id {
            debug!(account = %self.id, "change set already applied, skipping");
            return Ok(());
        }

        enum Event<'a> {
            Open(&'a TradeOpened),
            Close(&'a TradeClosed),
        }

        let mut events: Vec<(TransactionId, Event)> = changes
            .opened
            .iter()
            .map(|o| (o.transaction_id, Event::Open(o)))
            .chain(
                changes
                    .closed
                    .iter()
                    .map(|c| (c.transaction_id, Event::Close(c))),
            )
            .collect();
        events.sort_by_key(|(tx, _)| *tx);

        for (_, event) in events {
            match event {
                Event::Open(opened) => {
                    self.position_opened(opened.trade.clone(), opened.transaction_id)?;
                }
                Event::Close(closed) => {
                    let held = self
                        .open_trade_by_id(closed.trade_id)
                        .ok_or(LedgerError::UnknownTrade {
                            trade_id: closed.trade_id,
                        })?
                        .current_units;
                    if held != closed.units {
                        return Err(LedgerError::PartialClose {
                            trade_id: closed.trade_id,
                            requested: closed.units.0,
                            held: held.0,
                        });
                    }
                    self.position_closed(
                        closed.trade_id,
                        closed.exit_price,
                        closed.closed_at,
                        closed.transaction_id,
                    )?;
                }
            }
        }

        self.last_transaction_id = changes.last_transaction_id;
        Ok(())
    }

    /// Compare the locally recomputed NAV against the externally reported
    /// one and absorb any difference into the balance as an explicit,
    /// logged adjustment. Open trades should be marked to market first.
    ///
    /// The discrepancy is expected in steady state only from unmodeled
    /// costs (financing, interest); it is surfaced rather than silently
    /// folded in, and a residual unrealized-profit divergence is logged as
    /// an error without halting anything — the external state is
    /// authoritative going forward.
    pub fn reconcile(&mut self, external: &ExternalAccountState) -> ReconcileOutcome {
        let local_nav = self.net_asset_value();
        let adjustment = external.nav - local_nav;
        if !adjustment.is_zero() {
            warn!(
                account = %self.id,
                %adjustment,
                local = %local_nav,
                external = %external.nav,
                "unexplained NAV adjustment absorbed into balance"
            );
            self.balance += adjustment;
        }

        let unrealized_divergence = external.unrealized_pl - self.unrealized_pl();
        if !unrealized_divergence.is_zero() {
            error!(
                account = %self.id,
                divergence = %unrealized_divergence,
                "unrealized P/L diverges beyond the balance adjustment"
            );
        }

        ReconcileOutcome { adjustment, unrealized_divergence }
    }

    fn advance_transaction(&mut self, transaction_id: TransactionId) -> Result<(), LedgerError> {
        if transaction_id <= self.last_transaction_id {
            return Err(LedgerError::NonMonotonicTransaction {
                last: self.last_transaction_id,
                got: transaction_id,
            });
        }
        self.last_transaction_id = transaction_id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, Currency, CurrencyPair, Units};
    use chrono::NaiveDate;

    fn eur_usd() -> CurrencyPair {
        CurrencyPair::new(Currency::Eur, Currency::Usd)
    }

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, 6)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn account() -> Account {
        Account::new(AccountId::new("a1"), Pippettes(100_000))
    }

    fn open_trade(id: u64, units: i64, entry: i64) -> Trade {
        Trade::open(
            TradeId(id),
            eur_usd(),
            Pippettes(entry),
            Units(units),
            ts(9),
        )
    }

    #[test]
    fn open_then_close_nets_to_realized_profit() {
        let mut account = account();

        // Open 1 unit at 1.10000: balance 100,000 - 110,000 = -10,000.
        account
            .position_opened(open_trade(1, 1, 110_000), TransactionId(1))
            .unwrap();
        assert_eq!(account.balance, Pippettes(-10_000));

        // Close at the spread-adjusted exit 1.10480: +480 realized,
        // balance -10,000 + 110,480 = 100,480.
        let closed = account
            .position_closed(TradeId(1), Pippettes(110_480), ts(14), TransactionId(2))
            .unwrap();
        assert_eq!(closed.realized_pl, Pippettes(480));
        assert_eq!(account.balance, Pippettes(100_480));
        assert_eq!(account.realized_pl, Pippettes(480));
        assert!(account.open_trades.is_empty());
    }

    #[test]
    fn cumulative_realized_profit_sums_closed_trades() {
        let mut account = account();
        account
            .position_opened(open_trade(1, 1, 110_000), TransactionId(1))
            .unwrap();
        account
            .position_closed(TradeId(1), Pippettes(110_480), ts(10), TransactionId(2))
            .unwrap();
        account
            .position_opened(open_trade(2, 2, 110_500), TransactionId(3))
            .unwrap();
        account
            .position_closed(TradeId(2), Pippettes(110_400), ts(11), TransactionId(4))
            .unwrap();

        assert_eq!(account.realized_pl, Pippettes(480 - 200));
    }

    #[test]
    fn second_position_for_pair_or_inverse_is_rejected() {
        let mut account = account();
        account
            .position_opened(open_trade(1, 1, 110_000), TransactionId(1))
            .unwrap();

        let err = account
            .position_opened(open_trade(2, 1, 110_100), TransactionId(2))
            .unwrap_err();
        assert!(matches!(err, LedgerError::PositionAlreadyOpen { .. }));

        let mut inverse_trade = open_trade(3, 1, 90_909);
        inverse_trade.pair = eur_usd().inverse();
        let err = account
            .position_opened(inverse_trade, TransactionId(2))
            .unwrap_err();
        assert!(matches!(err, LedgerError::PositionAlreadyOpen { .. }));

        // The failed opens must not have advanced the transaction id.
        assert_eq!(account.last_transaction_id, TransactionId(1));
    }

    #[test]
    fn closing_unknown_trade_fails() {
        let mut account = account();
        let err = account
            .position_closed(TradeId(9), Pippettes(110_000), ts(10), TransactionId(1))
            .unwrap_err();
        assert_eq!(err, LedgerError::UnknownTrade { trade_id: TradeId(9) });
    }

    #[test]
    fn transaction_ids_must_advance() {
        let mut account = account();
        account
            .position_opened(open_trade(1, 1, 110_000), TransactionId(5))
            .unwrap();
        let err = account
            .position_closed(TradeId(1), Pippettes(110_000), ts(10), TransactionId(5))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NonMonotonicTransaction { .. }));
    }

    #[test]
    fn change_set_applies_in_transaction_order() {
        let mut account = account();
        let changes = AccountChangeSet {
            last_transaction_id: TransactionId(3),
            opened: vec![TradeOpened {
                trade: open_trade(1, 1, 110_000),
                transaction_id: TransactionId(1),
            }],
            closed: vec![TradeClosed {
                trade_id: TradeId(1),
                units: Units(1),
                exit_price: Pippettes(110_480),
                closed_at: ts(12),
                transaction_id: TransactionId(2),
            }],
        };

        account.process_changes(&changes).unwrap();
        assert_eq!(account.balance, Pippettes(100_480));
        assert_eq!(account.last_transaction_id, TransactionId(3));
    }

    #[test]
    fn matching_transaction_id_is_a_noop() {
        let mut account = account();
        account.last_transaction_id = TransactionId(7);

        let changes = AccountChangeSet {
            last_transaction_id: TransactionId(7),
            opened: vec![TradeOpened {
                trade: open_trade(1, 1, 110_000),
                transaction_id: TransactionId(8),
            }],
            closed: vec![],
        };

        account.process_changes(&changes).unwrap();
        assert!(account.open_trades.is_empty());
        assert_eq!(account.balance, Pippettes(100_000));
    }

    #[test]
    fn partial_close_is_a_precondition_failure() {
        let mut account = account();
        account
            .position_opened(open_trade(1, 4, 110_000), TransactionId(1))
            .unwrap();

        let changes = AccountChangeSet {
            last_transaction_id: TransactionId(2),
            opened: vec![],
            closed: vec![TradeClosed {
                trade_id: TradeId(1),
                units: Units(2),
                exit_price: Pippettes(110_480),
                closed_at: ts(12),
                transaction_id: TransactionId(2),
            }],
        };

        let err = account.process_changes(&changes).unwrap_err();
        assert!(matches!(err, LedgerError::PartialClose { .. }));
    }

    #[test]
    fn reconcile_absorbs_nav_drift_into_balance() {
        let mut account = account();
        account
            .position_opened(open_trade(1, 1, 110_000), TransactionId(1))
            .unwrap();
        account.open_trades[0].mark_to_market(Pippettes(110_200));

        let local_nav = account.net_asset_value();
        // Broker reports 300 pippettes less (say, financing charges).
        let external = ExternalAccountState {
            nav: local_nav - Pippettes(300),
            unrealized_pl: Pippettes(200),
        };

        let outcome = account.reconcile(&external);
        assert_eq!(outcome.adjustment, Pippettes(-300));
        assert_eq!(outcome.unrealized_divergence, Pippettes::ZERO);
        assert_eq!(account.net_asset_value(), external.nav);
    }

    #[test]
    fn reconcile_flags_unrealized_divergence_without_halting() {
        let mut account = account();
        account
            .position_opened(open_trade(1, 1, 110_000), TransactionId(1))
            .unwrap();
        account.open_trades[0].mark_to_market(Pippettes(110_200));

        let external = ExternalAccountState {
            nav: account.net_asset_value(),
            unrealized_pl: Pippettes(450), // local says 200
        };

        let outcome = account.reconcile(&external);
        assert_eq!(outcome.adjustment, Pippettes::ZERO);
        assert_eq!(outcome.unrealized_divergence, Pippettes(250));
        // State unchanged apart from the (zero) adjustment.
        assert_eq!(account.unrealized_pl(), Pippettes(200));
    }
}
