//! CSV-backed raw candle source.
//!
//! Layout: `{data_dir}/{BASEQUOTE}/{year}.csv` (e.g. `EURUSD/2023.csv`),
//! rows `timestamp,open,high,low,close` with prices in quote units. A
//! missing file is a year with no data; malformed or insane rows are
//! skipped with a warning rather than failing the load.

use chrono::NaiveDateTime;
use pipsim_core::candles::{CandleSeries, CandleSource, SourceError};
use pipsim_core::domain::{Candle, CurrencyPair, Pippettes};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvCandleSource {
    data_dir: PathBuf,
}

impl CsvCandleSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    fn year_path(&self, pair: CurrencyPair, year: i32) -> PathBuf {
        self.data_dir
            .join(format!("{}{}", pair.base, pair.quote))
            .join(format!("{year}.csv"))
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl CandleSource for CsvCandleSource {
    fn minute_candles(&self, pair: CurrencyPair, year: i32) -> Result<CandleSeries, SourceError> {
        let path = self.year_path(pair, year);
        if !path.exists() {
            return Ok(CandleSeries::new());
        }

        let mut reader = csv::Reader::from_path(&path).map_err(|e| SourceError::Io {
            pair: pair.to_string(),
            year,
            cause: e.to_string(),
        })?;

        let mut series = CandleSeries::new();
        for (line, record) in reader.deserialize::<CsvRow>().enumerate() {
            let row = match record {
                Ok(row) => row,
                Err(err) => {
                    warn!(path = %path.display(), line, %err, "skipping unreadable row");
                    continue;
                }
            };
            match parse_row(&row) {
                Some((t, candle)) => series.insert(t, candle),
                None => {
                    warn!(
                        path = %path.display(),
                        line,
                        timestamp = %row.timestamp,
                        "skipping malformed candle row"
                    );
                }
            }
        }
        Ok(series)
    }
}

fn parse_row(row: &CsvRow) -> Option<(NaiveDateTime, Candle)> {
    let t = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT).ok()?;
    let candle = Candle::new(
        Pippettes::from_quote(row.open),
        Pippettes::from_quote(row.high),
        Pippettes::from_quote(row.low),
        Pippettes::from_quote(row.close),
    );
    if !candle.is_well_formed() {
        return None;
    }
    Some((t, candle))
}

/// Write a candle series back out in the same layout, used by fixture
/// generators and tests.
pub fn write_year_csv(
    dir: &Path,
    pair: CurrencyPair,
    year: i32,
    series: &CandleSeries,
) -> Result<(), std::io::Error> {
    let pair_dir = dir.join(format!("{}{}", pair.base, pair.quote));
    std::fs::create_dir_all(&pair_dir)?;
    let mut writer = csv::Writer::from_path(pair_dir.join(format!("{year}.csv")))?;

    writer.write_record(["timestamp", "open", "high", "low", "close"])?;
    for (t, c) in series.iter() {
        writer.write_record([
            t.format(TIMESTAMP_FORMAT).to_string(),
            format!("{}", c.open),
            format!("{}", c.high),
            format!("{}", c.low),
            format!("{}", c.close),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
