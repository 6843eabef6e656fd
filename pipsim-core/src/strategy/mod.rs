//! Strategy seam: pure decision functions over market data.

pub mod ma_cross;
pub mod random_entry;

pub use ma_cross::MaCross;
pub use random_entry::RandomEntry;

use crate::candles::{CandleSeries, QueryError, RangeQueryCache};
use crate::domain::{Account, CurrencyPair, ExpiryPolicy, OrderKind, TimeFrame, Units};
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use std::sync::Arc;

/// A proposed opening order. Units are always positive — a short view is
/// expressed by proposing the inverse pair. Optional exit offsets become
/// take-profit / stop-loss orders once the entry fills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIntent {
    pub pair: CurrencyPair,
    pub units: Units,
    pub kind: OrderKind,
    pub expiry: ExpiryPolicy,
    /// Exit target, in pips above the entry price.
    pub take_profit_pips: Option<i64>,
    /// Protective stop, in pips below the entry price.
    pub stop_loss_pips: Option<i64>,
}

impl OrderIntent {
    pub fn market(pair: CurrencyPair, units: Units) -> Self {
        Self {
            pair,
            units,
            kind: OrderKind::Market,
            expiry: ExpiryPolicy::default(),
            take_profit_pips: None,
            stop_loss_pips: None,
        }
    }

    pub fn with_exits(mut self, take_profit_pips: i64, stop_loss_pips: i64) -> Self {
        self.take_profit_pips = Some(take_profit_pips);
        self.stop_loss_pips = Some(stop_loss_pips);
        self
    }
}

/// The deciding account's view of itself.
pub struct TraderContext<'a> {
    pub account: &'a Account,
}

/// Read-only market access for strategies, pinned to the current logical
/// time so decisions can never read the future.
pub struct MarketView<'a> {
    candles: &'a RangeQueryCache,
    now: NaiveDateTime,
}

impl<'a> MarketView<'a> {
    pub fn new(candles: &'a RangeQueryCache, now: NaiveDateTime) -> Self {
        Self { candles, now }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn candles(
        &self,
        tf: TimeFrame,
        pair: CurrencyPair,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Arc<CandleSeries>, QueryError> {
        self.candles.candles(tf, pair, start, end, self.now)
    }
}

/// A trading strategy: given the account and market data, propose an
/// opening order or nothing. No side effects; any randomness comes from
/// the seeded generator the simulation threads through.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    fn should_open_position(
        &mut self,
        ctx: &TraderContext<'_>,
        market: &MarketView<'_>,
        rng: &mut StdRng,
    ) -> Option<OrderIntent>;
}
