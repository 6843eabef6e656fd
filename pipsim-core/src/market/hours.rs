//! Forex market calendar.

use chrono::{NaiveDateTime, Timelike, Weekday};

/// Live-mode market-open predicate. The forex market closes Friday 22:00
/// and reopens Sunday 22:00 on the naive-UTC timeline; Saturday is always
/// closed. Historical availability is a different question ("does a candle
/// exist for this minute") answered by the price feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForexHours;

impl ForexHours {
    pub fn is_open(self, at: NaiveDateTime) -> bool {
        match chrono::Datelike::weekday(&at) {
            Weekday::Sat => false,
            Weekday::Fri => at.hour() < 22,
            Weekday::Sun => at.hour() >= 22,
            _ => true,
        }
    }
}
