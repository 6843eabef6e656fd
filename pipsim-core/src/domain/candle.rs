//! Candle — OHLC price summary over one time-frame interval.

use super::money::Pippettes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLC candle with all four prices in pippettes.
///
/// Well-formed candles satisfy `low <= open, close <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub open: Pippettes,
    pub high: Pippettes,
    pub low: Pippettes,
    pub close: Pippettes,
}

impl Candle {
    pub fn new(open: Pippettes, high: Pippettes, low: Pippettes, close: Pippettes) -> Self {
        Self { open, high, low, close }
    }

    pub fn is_well_formed(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.high
    }

    /// Collapse an ordered, non-empty sequence of candles into one:
    /// open of the first, close of the last, extremes over all members
    /// (the aggregate's own open and close included, which matters only
    /// for malformed inputs).
    pub fn aggregate(candles: &[Candle]) -> Result<Candle, CandleError> {
        let first = candles.first().ok_or(CandleError::EmptyAggregation)?;
        let last = candles.last().ok_or(CandleError::EmptyAggregation)?;

        let mut high = first.open.max(last.close);
        let mut low = first.open.min(last.close);
        for candle in candles {
            high = high.max(candle.high);
            low = low.min(candle.low);
        }

        Ok(Candle { open: first.open, high, low, close: last.close })
    }

    /// Reciprocal candle for the inverse pair.
    ///
    /// High and low swap: the reciprocal of a positive price reverses
    /// ordering, so the original low becomes the new high.
    pub fn inverse(self) -> Candle {
        Candle {
            open: self.open.reciprocal(),
            high: self.low.reciprocal(),
            low: self.high.reciprocal(),
            close: self.close.reciprocal(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CandleError {
    #[error("cannot aggregate an empty candle sequence")]
    EmptyAggregation,
}
