//! Raw one-minute data source trait.

use super::series::CandleSeries;
use crate::domain::CurrencyPair;
use thiserror::Error;

/// Provider of raw one-minute candles, one call per (pair, year).
///
/// Implementations sit outside the core (CSV files, a broker gateway); the
/// cache hierarchy is their only caller and only ever asks for canonical
/// pairs. A failed load is logged by the cache and treated as a year with
/// no data — it never propagates to queries.
pub trait CandleSource: Send + Sync {
    fn minute_candles(&self, pair: CurrencyPair, year: i32) -> Result<CandleSeries, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("raw data I/O failed for {pair} {year}: {cause}")]
    Io {
        pair: String,
        year: i32,
        cause: String,
    },

    #[error("raw data malformed for {pair} {year}: {cause}")]
    Malformed {
        pair: String,
        year: i32,
        cause: String,
    },
}
