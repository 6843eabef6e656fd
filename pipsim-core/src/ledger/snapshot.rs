//! Immutable per-tick account snapshots, the exposed reporting stream.

use crate::domain::{Account, AccountId, Pippettes};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account: AccountId,
    pub at: NaiveDateTime,
    pub balance: Pippettes,
    pub nav: Pippettes,
    pub unrealized_pl: Pippettes,
}

impl AccountSnapshot {
    /// Capture the account as of `at`, using its current marks.
    pub fn capture(account: &Account, at: NaiveDateTime) -> Self {
        Self {
            account: account.id.clone(),
            at,
            balance: account.balance,
            nav: account.net_asset_value(),
            unrealized_pl: account.unrealized_pl(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Currency, CurrencyPair, Trade, TradeId, Units};
    use chrono::NaiveDate;

    #[test]
    fn snapshot_reflects_current_marks() {
        let at = NaiveDate::from_ymd_opt(2023, 3, 6)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        let mut account = Account::new(AccountId::new("a1"), Pippettes(50_000));
        let mut trade = Trade::open(
            TradeId(1),
            CurrencyPair::new(Currency::Eur, Currency::Usd),
            Pippettes(110_000),
            Units(1),
            at,
        );
        trade.mark_to_market(Pippettes(110_250));
        account.open_trades.push(trade);

        let snapshot = AccountSnapshot::capture(&account, at);
        assert_eq!(snapshot.balance, Pippettes(50_000));
        assert_eq!(snapshot.unrealized_pl, Pippettes(250));
        assert_eq!(snapshot.nav, Pippettes(50_000 + 110_000 + 250));
    }
}
