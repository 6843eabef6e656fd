//! End-to-end smoke run: synthetic prices, random entries, full accounting.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use pipsim_core::candles::{CandleSeries, CandleSource, CandleStore, RangeQueryCache, SourceError};
use pipsim_core::domain::{Account, AccountId, Candle, Currency, CurrencyPair, Pippettes, Units};
use pipsim_core::ledger::AccountSnapshot;
use pipsim_core::market::HistoricalFeed;
use pipsim_core::sim::Simulation;
use pipsim_core::store::{MemoryStore, StateStore};
use pipsim_core::strategy::RandomEntry;
use std::sync::Arc;

fn eur_usd() -> CurrencyPair {
    CurrencyPair::new(Currency::Eur, Currency::Usd)
}

fn ts(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 3, 6)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

/// A gently oscillating minute series over one day.
struct Oscillator;

impl CandleSource for Oscillator {
    fn minute_candles(&self, _pair: CurrencyPair, _year: i32) -> Result<CandleSeries, SourceError> {
        let mut series = CandleSeries::new();
        for i in 0..(24 * 60) {
            // Triangle wave, period 120 minutes, amplitude 48 pips — wide
            // enough to reach the strategies' 30-pip exit brackets.
            let phase = i % 120;
            let offset = if phase < 60 { phase } else { 120 - phase };
            let level = 110_000 + offset * 8;
            series.insert(
                ts(0, 0) + Duration::minutes(i),
                Candle::new(
                    Pippettes(level),
                    Pippettes(level + 3),
                    Pippettes(level - 3),
                    Pippettes(level + 1),
                ),
            );
        }
        Ok(series)
    }
}

fn run(seed: u64) -> (Vec<AccountSnapshot>, Account, Arc<MemoryStore>) {
    let store = Arc::new(CandleStore::new(Arc::new(Oscillator)));
    let candles = Arc::new(RangeQueryCache::new(Arc::clone(&store)));
    let feed = Arc::new(HistoricalFeed::new(store));
    let persistence = Arc::new(MemoryStore::new());

    let mut sim = Simulation::new(candles, feed, ts(1, 0), seed)
        .with_store(Arc::clone(&persistence) as Arc<dyn StateStore>);
    sim.add_trader(
        Account::new(AccountId::new("smoke-1"), Pippettes(1_000_000)),
        Box::new(RandomEntry::new(eur_usd(), Units(1), 0.05)),
    );

    sim.run_until(ts(9, 0));

    let trader = &sim.traders()[0];
    (trader.snapshots.clone(), trader.account.clone(), persistence)
}

#[test]
fn identical_seeds_reproduce_identical_runs() {
    let (a, _, _) = run(7);
    let (b, _, _) = run(7);
    assert_eq!(a, b);
    assert_eq!(a.len(), 8 * 60 + 1);
}

#[test]
fn nav_identity_holds_on_every_snapshot() {
    let (snapshots, _, _) = run(7);
    for snapshot in &snapshots {
        // nav = balance + entry cost of open positions + unrealized, so the
        // residual is the open position value: zero when flat, otherwise
        // one unit's entry cost — around 1.10 long EUR/USD, around its
        // reciprocal 0.909 long the inverse.
        let position_value = snapshot.nav - snapshot.balance - snapshot.unrealized_pl;
        assert!(
            position_value == Pippettes::ZERO
                || (89_000..=111_000).contains(&position_value.0),
            "unexpected position value {position_value} at {}",
            snapshot.at
        );
    }
}

#[test]
fn cumulative_realized_profit_matches_closed_trades() {
    let (_, account, persistence) = run(7);

    let realized_from_trades: Pippettes = persistence
        .trades()
        .into_iter()
        .filter(|t| !t.is_open())
        .map(|t| t.realized_pl)
        .sum();

    assert_eq!(account.realized_pl, realized_from_trades);

    // Every persisted closed trade has its unrealized side zeroed, and
    // open ones the other way around.
    for trade in persistence.trades() {
        if trade.is_open() {
            assert_eq!(trade.realized_pl, Pippettes::ZERO);
        } else {
            assert_eq!(trade.unrealized_pl, Pippettes::ZERO);
        }
    }
}

#[test]
fn balance_reconstructs_from_trade_flows() {
    let (_, account, persistence) = run(11);

    // Starting balance minus every open debit plus every close credit.
    let mut expected = Pippettes(1_000_000);
    for trade in persistence.trades() {
        expected -= trade.entry_price.scaled_by(trade.initial_units);
        if !trade.is_open() {
            // Close credited exit value = entry cost + realized.
            expected += trade.entry_price.scaled_by(trade.initial_units) + trade.realized_pl;
        }
    }

    assert_eq!(account.balance, expected);
}
