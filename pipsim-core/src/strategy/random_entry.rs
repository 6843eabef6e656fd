//! Coin-flip entries, useful as a baseline and for exercising the full
//! order/ledger path in simulations.

use super::{MarketView, OrderIntent, Strategy, TraderContext};
use crate::domain::{CurrencyPair, Units};
use rand::rngs::StdRng;
use rand::Rng;

/// Opens a position with the given per-tick probability, direction chosen
/// by coin flip (a "short" is a long on the inverse pair). Deterministic
/// for a given simulation seed: all randomness comes from the threaded
/// generator.
pub struct RandomEntry {
    pair: CurrencyPair,
    units: Units,
    probability: f64,
    take_profit_pips: i64,
    stop_loss_pips: i64,
}

impl RandomEntry {
    pub fn new(pair: CurrencyPair, units: Units, probability: f64) -> Self {
        Self {
            pair,
            units,
            probability,
            take_profit_pips: 30,
            stop_loss_pips: 30,
        }
    }
}

impl Strategy for RandomEntry {
    fn name(&self) -> &str {
        "random_entry"
    }

    fn should_open_position(
        &mut self,
        ctx: &TraderContext<'_>,
        _market: &MarketView<'_>,
        rng: &mut StdRng,
    ) -> Option<OrderIntent> {
        if ctx.account.has_exposure(self.pair) {
            return None;
        }
        if !rng.gen_bool(self.probability) {
            return None;
        }

        let pair = if rng.gen_bool(0.5) {
            self.pair
        } else {
            self.pair.inverse()
        };
        Some(
            OrderIntent::market(pair, self.units)
                .with_exits(self.take_profit_pips, self.stop_loss_pips),
        )
    }
}
