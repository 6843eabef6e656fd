//! Price feeds.

use crate::candles::CandleStore;
use crate::domain::{CurrencyPair, Pippettes, TimeFrame};
use chrono::{Datelike, NaiveDateTime};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarketError {
    #[error("no price for {pair} at {at}")]
    PriceUnavailable {
        pair: CurrencyPair,
        at: NaiveDateTime,
    },
}

/// Source of the current mid-market price. Inverse pairs are priced as the
/// reciprocal of the canonical pair's price, never looked up directly.
pub trait PriceFeed: Send + Sync {
    fn mid_price(&self, pair: CurrencyPair, at: NaiveDateTime) -> Result<Pippettes, MarketError>;

    /// Historical market-open predicate: data exists for this minute.
    fn is_available(&self, pair: CurrencyPair, at: NaiveDateTime) -> bool {
        self.mid_price(pair, at).is_ok()
    }
}

/// Feed backed by the candle hierarchy: the price during minute `m` is the
/// open of the M1 candle starting at `m` (its close belongs to the future).
pub struct HistoricalFeed {
    store: Arc<CandleStore>,
}

impl HistoricalFeed {
    pub fn new(store: Arc<CandleStore>) -> Self {
        Self { store }
    }
}

impl PriceFeed for HistoricalFeed {
    fn mid_price(&self, pair: CurrencyPair, at: NaiveDateTime) -> Result<Pippettes, MarketError> {
        let minute = TimeFrame::M1.align_start(at);
        let canonical = pair.canonical();
        let series = self.store.year_series(TimeFrame::M1, canonical, minute.year());
        let candle = series
            .get(minute)
            .ok_or(MarketError::PriceUnavailable { pair, at })?;

        let mid = candle.open;
        if pair.is_canonical() {
            Ok(mid)
        } else {
            Ok(mid.reciprocal())
        }
    }
}
