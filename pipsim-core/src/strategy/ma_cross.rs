//! Moving-average crossover on hourly candles.

use super::{MarketView, OrderIntent, Strategy, TraderContext};
use crate::domain::{CurrencyPair, Pippettes, TimeFrame, Units};
use chrono::Duration;
use rand::rngs::StdRng;

/// Opens long when the fast SMA crosses above the slow one, and long the
/// inverse pair on a downward cross. At most one position per pair, which
/// the ledger enforces anyway.
pub struct MaCross {
    pair: CurrencyPair,
    units: Units,
    fast: usize,
    slow: usize,
    take_profit_pips: i64,
    stop_loss_pips: i64,
}

impl MaCross {
    pub fn new(pair: CurrencyPair, units: Units, fast: usize, slow: usize) -> Self {
        Self {
            pair,
            units,
            fast,
            slow,
            take_profit_pips: 40,
            stop_loss_pips: 20,
        }
    }

    pub fn with_exits(mut self, take_profit_pips: i64, stop_loss_pips: i64) -> Self {
        self.take_profit_pips = take_profit_pips;
        self.stop_loss_pips = stop_loss_pips;
        self
    }

    fn sma(window: &[Pippettes]) -> i64 {
        window.iter().map(|p| p.0).sum::<i64>() / window.len() as i64
    }
}

impl Strategy for MaCross {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn should_open_position(
        &mut self,
        ctx: &TraderContext<'_>,
        market: &MarketView<'_>,
        _rng: &mut StdRng,
    ) -> Option<OrderIntent> {
        if ctx.account.has_exposure(self.pair) {
            return None;
        }

        let now = market.now();
        // Twice the slow window gives headroom for market gaps.
        let start = now - Duration::hours(2 * self.slow as i64);
        let series = market.candles(TimeFrame::H1, self.pair, start, now).ok()?;

        let closes: Vec<Pippettes> = series.iter().map(|(_, c)| c.close).collect();
        if closes.len() < self.slow + 1 {
            return None;
        }

        let n = closes.len();
        let fast_now = Self::sma(&closes[n - self.fast..]);
        let slow_now = Self::sma(&closes[n - self.slow..]);
        let fast_prev = Self::sma(&closes[n - 1 - self.fast..n - 1]);
        let slow_prev = Self::sma(&closes[n - 1 - self.slow..n - 1]);

        let pair = if fast_prev <= slow_prev && fast_now > slow_now {
            self.pair
        } else if fast_prev >= slow_prev && fast_now < slow_now {
            self.pair.inverse()
        } else {
            return None;
        };

        Some(
            OrderIntent::market(pair, self.units)
                .with_exits(self.take_profit_pips, self.stop_loss_pips),
        )
    }
}
