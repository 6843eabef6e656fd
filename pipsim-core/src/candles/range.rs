//! Bounded range-query cache with trailing partial-period synthesis.
//!
//! Arbitrary caller-supplied ranges are far more numerous than (pair, year)
//! keys, so results are held in a small LRU rather than forever. Eviction
//! only costs recomputation: given the per-year caches, a range result is a
//! pure function of its key.

use super::series::CandleSeries;
use super::store::CandleStore;
use crate::domain::{Candle, CurrencyPair, TimeFrame};
use chrono::{Datelike, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

/// Default capacity of the range cache.
pub const RANGE_CACHE_CAPACITY: usize = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("range start {start} is after its end {end}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("range end {end} is in the future (now {now})")]
    FutureTimestamp {
        end: NaiveDateTime,
        now: NaiveDateTime,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RangeKey {
    tf: TimeFrame,
    pair: CurrencyPair,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

struct CacheEntry {
    last_used: u64,
    series: Arc<CandleSeries>,
}

#[derive(Default)]
struct LruState {
    entries: HashMap<RangeKey, CacheEntry>,
    tick: u64,
}

/// Range-query layer over the per-year cache hierarchy.
pub struct RangeQueryCache {
    store: Arc<CandleStore>,
    capacity: usize,
    state: Mutex<LruState>,
}

impl RangeQueryCache {
    pub fn new(store: Arc<CandleStore>) -> Self {
        Self::with_capacity(store, RANGE_CACHE_CAPACITY)
    }

    pub fn with_capacity(store: Arc<CandleStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity,
            state: Mutex::new(LruState::default()),
        }
    }

    pub fn store(&self) -> &Arc<CandleStore> {
        &self.store
    }

    /// Candles for `pair` at `tf` covering `[start, end]`, end inclusive.
    ///
    /// The start is aligned down to a frame boundary. Candles of the
    /// currently open interval are never served from the year caches;
    /// when the range reaches into it, a pseudo-candle is synthesized from
    /// the completed finer intervals inside `[interval start, now]` and
    /// appended without being persisted anywhere.
    pub fn candles(
        &self,
        tf: TimeFrame,
        pair: CurrencyPair,
        start: NaiveDateTime,
        end: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<Arc<CandleSeries>, QueryError> {
        if start > end {
            return Err(QueryError::InvalidRange { start, end });
        }
        if end > now {
            return Err(QueryError::FutureTimestamp { end, now });
        }

        let aligned_start = tf.align_start(start);
        let current_open = tf.align_start(now);
        let wants_partial = end >= current_open;

        let key = RangeKey { tf, pair, start: aligned_start, end };
        if !wants_partial {
            if let Some(hit) = self.lookup(&key) {
                return Ok(hit);
            }
        }

        let mut merged = CandleSeries::new();
        for year in aligned_start.year()..=end.year() {
            merged.merge_aggregating(&self.store.year_series(tf, pair, year));
        }

        let mut result: CandleSeries = merged
            .between(aligned_start, end)
            .filter(|(t, _)| *t < current_open)
            .collect();

        if wants_partial {
            if let Some(candle) = self.pseudo_candle(tf, pair, current_open, now) {
                result.insert(current_open, candle);
            }
        }

        let result = Arc::new(result);
        if !wants_partial {
            // A result containing a pseudo-candle depends on `now` and
            // would go stale; only fully historical ranges are cached.
            self.remember(key, Arc::clone(&result));
        }
        Ok(result)
    }

    /// Synthesize the candle for the open interval `[window_start, now]` by
    /// aggregating the completed finer intervals inside it, recursing down
    /// to one-minute granularity. `None` when nothing has completed yet.
    fn pseudo_candle(
        &self,
        tf: TimeFrame,
        pair: CurrencyPair,
        window_start: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Option<Candle> {
        let finer = tf.finer()?;
        let finer_open = finer.align_start(now);

        let mut parts: Vec<Candle> = Vec::new();
        for year in window_start.year()..=now.year() {
            let series = self.store.year_series(finer, pair, year);
            parts.extend(
                series
                    .between(window_start, finer_open)
                    .filter(|(t, _)| *t < finer_open)
                    .map(|(_, c)| c),
            );
        }

        if let Some(trailing) = self.pseudo_candle(finer, pair, finer_open, now) {
            parts.push(trailing);
        }

        Candle::aggregate(&parts).ok()
    }

    fn lookup(&self, key: &RangeKey) -> Option<Arc<CandleSeries>> {
        let mut state = self.state.lock().unwrap();
        state.tick += 1;
        let tick = state.tick;
        let entry = state.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(Arc::clone(&entry.series))
    }

    fn remember(&self, key: RangeKey, series: Arc<CandleSeries>) {
        let mut state = self.state.lock().unwrap();
        state.tick += 1;
        let tick = state.tick;
        state.entries.insert(key, CacheEntry { last_used: tick, series });

        if state.entries.len() > self.capacity {
            if let Some(oldest) = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| *k)
            {
                debug!(pair = %oldest.pair, tf = %oldest.tf, "evicting range cache entry");
                state.entries.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn cached_ranges(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }
}
