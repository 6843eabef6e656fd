//! An ordered candle series for one (pair, time frame, year).

use crate::domain::Candle;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered mapping from interval-start timestamp to candle. Built once by
/// the caches and immutable thereafter (historical data never changes
/// retroactively).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleSeries {
    candles: BTreeMap<NaiveDateTime, Candle>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, start: NaiveDateTime, candle: Candle) {
        self.candles.insert(start, candle);
    }

    pub fn get(&self, start: NaiveDateTime) -> Option<&Candle> {
        self.candles.get(&start)
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first(&self) -> Option<(NaiveDateTime, Candle)> {
        self.candles.iter().next().map(|(t, c)| (*t, *c))
    }

    pub fn last(&self) -> Option<(NaiveDateTime, Candle)> {
        self.candles.iter().next_back().map(|(t, c)| (*t, *c))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, Candle)> + '_ {
        self.candles.iter().map(|(t, c)| (*t, *c))
    }

    /// Candles with interval start in `[start, end]`. The upper bound is
    /// inclusive, matching the external wire convention.
    pub fn between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> impl Iterator<Item = (NaiveDateTime, Candle)> + '_ {
        self.candles.range(start..=end).map(|(t, c)| (*t, *c))
    }

    /// The sub-series with interval start in `[start, end]`.
    pub fn restricted(&self, start: NaiveDateTime, end: NaiveDateTime) -> CandleSeries {
        CandleSeries {
            candles: self.between(start, end).collect(),
        }
    }

    /// Merge `other` into `self`. A key present on both sides holds two
    /// partial candles of one interval (a bucket split across year series);
    /// they collapse via aggregation, earlier half first.
    pub fn merge_aggregating(&mut self, other: &CandleSeries) {
        for (start, incoming) in other.iter() {
            match self.candles.get(&start) {
                None => {
                    self.candles.insert(start, incoming);
                }
                Some(existing) => {
                    if let Ok(joined) = Candle::aggregate(&[*existing, incoming]) {
                        self.candles.insert(start, joined);
                    }
                }
            }
        }
    }

    /// The reciprocal series for the inverse pair.
    pub fn inverse(&self) -> CandleSeries {
        CandleSeries {
            candles: self
                .candles
                .iter()
                .map(|(t, c)| (*t, c.inverse()))
                .collect(),
        }
    }
}

impl FromIterator<(NaiveDateTime, Candle)> for CandleSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDateTime, Candle)>>(iter: I) -> Self {
        CandleSeries {
            candles: iter.into_iter().collect(),
        }
    }
}
