//! Time frames and interval alignment.
//!
//! Each frame maps an arbitrary timestamp to the start of its containing
//! interval and to the start of the following interval. Days align to
//! midnight on the logical (timezone-naive) timeline, weeks to the most
//! recent Monday, months to the first of the month; intra-day frames align
//! to multiples of their width.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candle interval width, from one minute up to one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
    Mn,
}

/// Error parsing a time frame string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseTimeFrameError;

impl fmt::Display for ParseTimeFrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time frame string")
    }
}

impl std::error::Error for ParseTimeFrameError {}

impl FromStr for TimeFrame {
    type Err = ParseTimeFrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "M1" => Ok(TimeFrame::M1),
            "M5" => Ok(TimeFrame::M5),
            "M15" => Ok(TimeFrame::M15),
            "M30" => Ok(TimeFrame::M30),
            "H1" => Ok(TimeFrame::H1),
            "H4" => Ok(TimeFrame::H4),
            "D1" => Ok(TimeFrame::D1),
            "W1" => Ok(TimeFrame::W1),
            "MN" => Ok(TimeFrame::Mn),
            _ => Err(ParseTimeFrameError),
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TimeFrame {
    /// All frames, finest first. The cache hierarchy iterates this order.
    pub const ALL: [TimeFrame; 9] = [
        TimeFrame::M1,
        TimeFrame::M5,
        TimeFrame::M15,
        TimeFrame::M30,
        TimeFrame::H1,
        TimeFrame::H4,
        TimeFrame::D1,
        TimeFrame::W1,
        TimeFrame::Mn,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::M1 => "M1",
            TimeFrame::M5 => "M5",
            TimeFrame::M15 => "M15",
            TimeFrame::M30 => "M30",
            TimeFrame::H1 => "H1",
            TimeFrame::H4 => "H4",
            TimeFrame::D1 => "D1",
            TimeFrame::W1 => "W1",
            TimeFrame::Mn => "MN",
        }
    }

    /// The next finer frame — the one this frame's candles aggregate from.
    /// `None` for M1, which reads raw data instead.
    #[must_use]
    pub fn finer(self) -> Option<TimeFrame> {
        match self {
            TimeFrame::M1 => None,
            TimeFrame::M5 => Some(TimeFrame::M1),
            TimeFrame::M15 => Some(TimeFrame::M5),
            TimeFrame::M30 => Some(TimeFrame::M15),
            TimeFrame::H1 => Some(TimeFrame::M30),
            TimeFrame::H4 => Some(TimeFrame::H1),
            TimeFrame::D1 => Some(TimeFrame::H4),
            TimeFrame::W1 => Some(TimeFrame::D1),
            TimeFrame::Mn => Some(TimeFrame::W1),
        }
    }

    /// Fixed interval width. `None` for MN, whose width follows the
    /// calendar.
    #[must_use]
    pub fn duration(self) -> Option<Duration> {
        match self {
            TimeFrame::M1 => Some(Duration::minutes(1)),
            TimeFrame::M5 => Some(Duration::minutes(5)),
            TimeFrame::M15 => Some(Duration::minutes(15)),
            TimeFrame::M30 => Some(Duration::minutes(30)),
            TimeFrame::H1 => Some(Duration::hours(1)),
            TimeFrame::H4 => Some(Duration::hours(4)),
            TimeFrame::D1 => Some(Duration::days(1)),
            TimeFrame::W1 => Some(Duration::days(7)),
            TimeFrame::Mn => None,
        }
    }

    /// Start of the interval containing `t`.
    #[must_use]
    pub fn align_start(self, t: NaiveDateTime) -> NaiveDateTime {
        let date = t.date();
        match self {
            TimeFrame::M1 => at_minute(date, t.hour(), t.minute()),
            TimeFrame::M5 => at_minute(date, t.hour(), t.minute() - t.minute() % 5),
            TimeFrame::M15 => at_minute(date, t.hour(), t.minute() - t.minute() % 15),
            TimeFrame::M30 => at_minute(date, t.hour(), t.minute() - t.minute() % 30),
            TimeFrame::H1 => at_minute(date, t.hour(), 0),
            TimeFrame::H4 => at_minute(date, t.hour() - t.hour() % 4, 0),
            TimeFrame::D1 => midnight(date),
            TimeFrame::W1 => {
                let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
                midnight(monday)
            }
            TimeFrame::Mn => midnight(first_of_month(date.year(), date.month())),
        }
    }

    /// Start of the interval after the one containing `t`.
    #[must_use]
    pub fn next_start(self, t: NaiveDateTime) -> NaiveDateTime {
        let start = self.align_start(t);
        match self.duration() {
            Some(width) => start + width,
            None => {
                let (year, month) = if start.month() == 12 {
                    (start.year() + 1, 1)
                } else {
                    (start.year(), start.month() + 1)
                };
                midnight(first_of_month(year, month))
            }
        }
    }
}

fn at_minute(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).unwrap()
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap()
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}
