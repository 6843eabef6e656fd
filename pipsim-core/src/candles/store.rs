//! Per-year cascading candle caches.
//!
//! Nine caches, one per time frame, keyed by (pair, year). Each frame above
//! M1 is a pure function of the next finer frame's series for the same key;
//! only the M1 cache reads the raw source. Entries are retained for the
//! process lifetime. Concurrent misses on one key collapse into a single
//! computation: the per-key `OnceLock` runs one initializer and blocks the
//! other callers on that key only, never on unrelated keys.

use super::series::CandleSeries;
use super::source::CandleSource;
use crate::domain::{Candle, CurrencyPair, TimeFrame};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::warn;

type YearKey = (CurrencyPair, i32);
type Slot = Arc<OnceLock<Arc<CandleSeries>>>;

#[derive(Default)]
struct FrameCache {
    entries: Mutex<HashMap<YearKey, Slot>>,
}

impl FrameCache {
    /// The memoization slot for a key. The map lock is released before any
    /// computation starts.
    fn slot(&self, key: YearKey) -> Slot {
        let mut entries = self.entries.lock().unwrap();
        entries.entry(key).or_default().clone()
    }
}

/// The candle cache hierarchy.
pub struct CandleStore {
    source: Arc<dyn CandleSource>,
    frames: HashMap<TimeFrame, FrameCache>,
}

impl CandleStore {
    pub fn new(source: Arc<dyn CandleSource>) -> Self {
        let frames = TimeFrame::ALL
            .into_iter()
            .map(|tf| (tf, FrameCache::default()))
            .collect();
        Self { source, frames }
    }

    /// The full year series for a pair at a time frame.
    ///
    /// Inverse pairs never have a stored series: the canonical pair is
    /// resolved at the same frame and inverted on the way out.
    pub fn year_series(
        &self,
        tf: TimeFrame,
        pair: CurrencyPair,
        year: i32,
    ) -> Arc<CandleSeries> {
        if !pair.is_canonical() {
            let canonical = self.year_series(tf, pair.canonical(), year);
            return Arc::new(canonical.inverse());
        }

        let slot = self.frames[&tf].slot((pair, year));
        slot.get_or_init(|| Arc::new(self.compute(tf, pair, year)))
            .clone()
    }

    fn compute(&self, tf: TimeFrame, pair: CurrencyPair, year: i32) -> CandleSeries {
        match tf.finer() {
            None => match self.source.minute_candles(pair, year) {
                Ok(series) => series,
                Err(err) => {
                    warn!(%pair, year, %err, "raw candle load failed, treating year as empty");
                    CandleSeries::new()
                }
            },
            Some(finer) => {
                let child = self.year_series(finer, pair, year);
                aggregate_frame(tf, &child)
            }
        }
    }
}

/// Aggregate a finer series into `tf` candles, grouped by `tf`'s interval
/// boundaries. Empty buckets produce no candle.
fn aggregate_frame(tf: TimeFrame, child: &CandleSeries) -> CandleSeries {
    let mut out = CandleSeries::new();
    let mut bucket_start: Option<NaiveDateTime> = None;
    let mut bucket: Vec<Candle> = Vec::new();

    for (t, candle) in child.iter() {
        let start = tf.align_start(t);
        if bucket_start != Some(start) {
            flush(&mut out, bucket_start, &mut bucket);
            bucket_start = Some(start);
        }
        bucket.push(candle);
    }
    flush(&mut out, bucket_start, &mut bucket);
    out
}

fn flush(out: &mut CandleSeries, start: Option<NaiveDateTime>, bucket: &mut Vec<Candle>) {
    if let Some(start) = start {
        if let Ok(candle) = Candle::aggregate(bucket) {
            out.insert(start, candle);
        }
    }
    bucket.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candles::source::SourceError;
    use crate::domain::{Currency, Pippettes};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn eur_usd() -> CurrencyPair {
        CurrencyPair::new(Currency::Eur, Currency::Usd)
    }

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, 6)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn candle(open: i64, high: i64, low: i64, close: i64) -> Candle {
        Candle::new(
            Pippettes(open),
            Pippettes(high),
            Pippettes(low),
            Pippettes(close),
        )
    }

    /// Source serving a fixed minute series and counting loads.
    struct CountingSource {
        series: CandleSeries,
        loads: AtomicUsize,
    }

    impl CountingSource {
        fn new(series: CandleSeries) -> Self {
            Self {
                series,
                loads: AtomicUsize::new(0),
            }
        }
    }

    impl CandleSource for CountingSource {
        fn minute_candles(
            &self,
            _pair: CurrencyPair,
            _year: i32,
        ) -> Result<CandleSeries, SourceError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.series.clone())
        }
    }

    struct FailingSource;

    impl CandleSource for FailingSource {
        fn minute_candles(
            &self,
            pair: CurrencyPair,
            year: i32,
        ) -> Result<CandleSeries, SourceError> {
            Err(SourceError::Io {
                pair: pair.to_string(),
                year,
                cause: "disk on fire".into(),
            })
        }
    }

    fn minute_fixture() -> CandleSeries {
        [
            (ts(9, 0), candle(100, 105, 95, 102)),
            (ts(9, 1), candle(102, 103, 101, 101)),
            (ts(9, 2), candle(101, 104, 100, 103)),
            (ts(9, 5), candle(103, 107, 103, 106)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn five_minute_series_aggregates_minute_buckets() {
        let store = CandleStore::new(Arc::new(CountingSource::new(minute_fixture())));
        let m5 = store.year_series(TimeFrame::M5, eur_usd(), 2023);

        assert_eq!(m5.len(), 2);
        assert_eq!(*m5.get(ts(9, 0)).unwrap(), candle(100, 105, 95, 103));
        assert_eq!(*m5.get(ts(9, 5)).unwrap(), candle(103, 107, 103, 106));
    }

    #[test]
    fn one_load_feeds_the_whole_hierarchy() {
        let source = Arc::new(CountingSource::new(minute_fixture()));
        let store = CandleStore::new(source.clone());

        for tf in TimeFrame::ALL {
            store.year_series(tf, eur_usd(), 2023);
        }
        store.year_series(TimeFrame::H1, eur_usd(), 2023);

        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_misses_collapse_into_one_load() {
        let source = Arc::new(CountingSource::new(minute_fixture()));
        let store = Arc::new(CandleStore::new(source.clone()));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    store.year_series(TimeFrame::H4, eur_usd(), 2023);
                });
            }
        });

        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn inverse_pair_is_derived_not_loaded() {
        let source = Arc::new(CountingSource::new(minute_fixture()));
        let store = CandleStore::new(source.clone());

        store.year_series(TimeFrame::M1, eur_usd(), 2023);
        let inverse = store.year_series(TimeFrame::M1, eur_usd().inverse(), 2023);

        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        let (_, first) = inverse.first().unwrap();
        assert_eq!(first, candle(100, 105, 95, 102).inverse());
    }

    #[test]
    fn failed_load_yields_empty_year() {
        let store = CandleStore::new(Arc::new(FailingSource));
        let m1 = store.year_series(TimeFrame::M1, eur_usd(), 2023);
        let d1 = store.year_series(TimeFrame::D1, eur_usd(), 2023);
        assert!(m1.is_empty());
        assert!(d1.is_empty());
    }

    #[test]
    fn monthly_series_spans_the_hierarchy() {
        // Two minutes a week apart land in different W1 buckets but the
        // same month.
        let series: CandleSeries = [
            (ts(9, 0), candle(100, 105, 95, 102)),
            (
                NaiveDate::from_ymd_opt(2023, 3, 13)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
                candle(102, 110, 101, 108),
            ),
        ]
        .into_iter()
        .collect();

        let store = CandleStore::new(Arc::new(CountingSource::new(series)));
        let w1 = store.year_series(TimeFrame::W1, eur_usd(), 2023);
        assert_eq!(w1.len(), 2);

        let mn = store.year_series(TimeFrame::Mn, eur_usd(), 2023);
        assert_eq!(mn.len(), 1);
        assert_eq!(
            *mn.get(
                NaiveDate::from_ymd_opt(2023, 3, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            )
            .unwrap(),
            candle(100, 110, 95, 108)
        );
    }
}
