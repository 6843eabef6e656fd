//! The simulation driver.
//!
//! One tick per simulated minute, with a fixed phase order: settle pending
//! orders, let each strategy decide and submit, settle orders submitted
//! this tick, then mark to market and record snapshots. No phase of a tick
//! overlaps another tick; every effect is applied before the clock moves.

use super::clock::SimClock;
use crate::candles::RangeQueryCache;
use crate::domain::{
    Account, ExpiryPolicy, IdGen, Order, OrderId, OrderKind, Pippettes, Trade, TransactionId,
};
use crate::ledger::{AccountSnapshot, LedgerError};
use crate::market::{MarketEngine, OrderEvent, OrderRequest, PriceFeed};
use crate::store::StateStore;
use crate::strategy::{MarketView, OrderIntent, Strategy, TraderContext};
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// An account under simulation, with its strategy and snapshot stream.
pub struct Trader {
    pub account: Account,
    strategy: Box<dyn Strategy>,
    pub snapshots: Vec<AccountSnapshot>,
}

impl Trader {
    pub fn new(account: Account, strategy: Box<dyn Strategy>) -> Self {
        Self {
            account,
            strategy,
            snapshots: Vec::new(),
        }
    }
}

/// Exit orders to attach once an entry fills.
#[derive(Debug, Clone, Copy)]
struct ExitPlan {
    take_profit_pips: Option<i64>,
    stop_loss_pips: Option<i64>,
}

pub struct Simulation {
    clock: SimClock,
    engine: MarketEngine,
    candles: Arc<RangeQueryCache>,
    store: Option<Arc<dyn StateStore>>,
    traders: Vec<Trader>,
    rng: StdRng,
    id_gen: IdGen,
    next_tx: u64,
    exit_plans: HashMap<OrderId, ExitPlan>,
}

impl Simulation {
    pub fn new(
        candles: Arc<RangeQueryCache>,
        feed: Arc<dyn PriceFeed>,
        start: NaiveDateTime,
        seed: u64,
    ) -> Self {
        Self {
            clock: SimClock::new(start),
            engine: MarketEngine::new(feed),
            candles,
            store: None,
            traders: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            id_gen: IdGen::default(),
            next_tx: 0,
            exit_plans: HashMap::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn add_trader(&mut self, account: Account, strategy: Box<dyn Strategy>) {
        self.traders.push(Trader::new(account, strategy));
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn traders(&self) -> &[Trader] {
        &self.traders
    }

    pub fn engine(&self) -> &MarketEngine {
        &self.engine
    }

    /// One simulated minute.
    pub fn tick(&mut self) {
        let now = self.clock.now();

        let events = self.engine.process_pending(now);
        self.apply_events(events, now);

        for index in 0..self.traders.len() {
            let decision = {
                let Trader { account, strategy, .. } = &mut self.traders[index];
                let ctx = TraderContext { account };
                let view = MarketView::new(&self.candles, now);
                strategy.should_open_position(&ctx, &view, &mut self.rng)
            };

            if let Some(intent) = decision {
                if let Err(err) = self.submit_intent(index, intent, now) {
                    warn!(
                        account = %self.traders[index].account.id,
                        %err,
                        "order intent rejected"
                    );
                }
            }
        }

        // Orders submitted this tick get one settlement pass before the
        // clock moves.
        let events = self.engine.process_pending(now);
        self.apply_events(events, now);

        self.record_snapshots(now);
        self.clock.tick();
    }

    /// Tick until the clock passes `end` (inclusive).
    pub fn run_until(&mut self, end: NaiveDateTime) {
        while self.clock.now() <= end {
            self.tick();
        }
    }

    /// Submit a strategy's intent. Rejected up front when a position or a
    /// pending opening order already exists for the pair or its inverse.
    pub fn submit_intent(
        &mut self,
        trader_index: usize,
        intent: OrderIntent,
        now: NaiveDateTime,
    ) -> Result<OrderId, LedgerError> {
        let account = &self.traders[trader_index].account;
        let account_id = account.id.clone();
        if account.has_exposure(intent.pair) || self.engine.open_exposure(&account_id, intent.pair)
        {
            return Err(LedgerError::PositionAlreadyOpen {
                pair: intent.pair.to_string(),
            });
        }

        let request = OrderRequest {
            account: account_id,
            pair: intent.pair,
            units: intent.units,
            kind: intent.kind,
            expiry: intent.expiry,
        };
        let (id, event) = self.engine.submit(request, now);

        if intent.take_profit_pips.is_some() || intent.stop_loss_pips.is_some() {
            self.exit_plans.insert(
                id,
                ExitPlan {
                    take_profit_pips: intent.take_profit_pips,
                    stop_loss_pips: intent.stop_loss_pips,
                },
            );
        }
        self.persist_order(id);

        if let Some(event) = event {
            self.apply_events(vec![event], now);
        }
        Ok(id)
    }

    fn apply_events(&mut self, events: Vec<OrderEvent>, now: NaiveDateTime) {
        let mut queue: VecDeque<OrderEvent> = events.into();
        while let Some(event) = queue.pop_front() {
            match event {
                OrderEvent::Filled(order) => self.apply_fill(order, now, &mut queue),
                OrderEvent::Cancelled(order) => {
                    self.exit_plans.remove(&order.id);
                    debug!(order = %order.id, account = %order.account, "order cancelled");
                }
            }
        }
    }

    fn apply_fill(&mut self, order: Order, now: NaiveDateTime, queue: &mut VecDeque<OrderEvent>) {
        let Some(price) = order.executed_price else {
            error!(order = %order.id, "fill event without an execution price");
            return;
        };
        let Some(index) = self
            .traders
            .iter()
            .position(|t| t.account.id == order.account)
        else {
            warn!(order = %order.id, account = %order.account, "fill for unknown account");
            return;
        };

        if order.units.is_buy() {
            let trade =
                Trade::open(self.id_gen.next_trade_id(), order.pair, price, order.units, now);
            let opened = trade.clone();
            self.next_tx += 1;
            let tx = TransactionId(self.next_tx);

            if let Err(err) = self.traders[index].account.position_opened(trade, tx) {
                error!(order = %order.id, %err, "opening fill could not be applied");
                return;
            }
            debug!(order = %order.id, trade = %opened.id, price = %price, "position opened");
            self.persist_trade(&order, &opened);

            if let Some(plan) = self.exit_plans.remove(&order.id) {
                self.submit_exits(&order, price, plan, now, queue);
            }
        } else {
            let Some(trade_id) = self.traders[index]
                .account
                .open_trade(order.pair)
                .map(|t| t.id)
            else {
                error!(order = %order.id, "closing fill without an open position");
                return;
            };
            self.next_tx += 1;
            let tx = TransactionId(self.next_tx);

            match self.traders[index]
                .account
                .position_closed(trade_id, price, now, tx)
            {
                Ok(closed) => {
                    debug!(
                        order = %order.id,
                        trade = %closed.id,
                        realized = %closed.realized_pl,
                        "position closed"
                    );
                    self.persist_trade(&order, &closed);
                }
                Err(err) => {
                    error!(order = %order.id, %err, "closing fill could not be applied");
                    return;
                }
            }

            // The other side of the exit bracket dies with the position.
            for sibling in self.engine.open_orders_for(&order.account, order.pair) {
                if sibling != order.id {
                    if let Some(event) = self.engine.cancel(sibling) {
                        queue.push_back(event);
                    }
                }
            }
        }
    }

    fn submit_exits(
        &mut self,
        entry: &Order,
        entry_price: Pippettes,
        plan: ExitPlan,
        now: NaiveDateTime,
        queue: &mut VecDeque<OrderEvent>,
    ) {
        let pip = entry.pair.pip();
        let exits = [
            plan.take_profit_pips
                .map(|pips| OrderKind::TakeProfit(entry_price + Pippettes(pips * pip.0))),
            plan.stop_loss_pips
                .map(|pips| OrderKind::StopLoss(entry_price - Pippettes(pips * pip.0))),
        ];

        for kind in exits.into_iter().flatten() {
            let request = OrderRequest {
                account: entry.account.clone(),
                pair: entry.pair,
                units: -entry.units,
                kind,
                expiry: ExpiryPolicy::Never,
            };
            let (id, event) = self.engine.submit(request, now);
            self.persist_order(id);
            if let Some(event) = event {
                queue.push_back(event);
            }
        }
    }

    fn record_snapshots(&mut self, now: NaiveDateTime) {
        for trader in &mut self.traders {
            for trade in &mut trader.account.open_trades {
                match self.engine.price(trade.pair, now) {
                    Ok(price) => trade.mark_to_market(price),
                    Err(err) => warn!(
                        account = %trader.account.id,
                        %err,
                        "price refresh failed, carrying last mark for this tick"
                    ),
                }
            }

            trader
                .snapshots
                .push(AccountSnapshot::capture(&trader.account, now));

            if let Some(store) = &self.store {
                if let Err(err) = store.upsert_account(&trader.account) {
                    warn!(account = %trader.account.id, %err, "account upsert failed");
                }
            }
        }
    }

    fn persist_order(&self, id: OrderId) {
        if let (Some(store), Some(order)) = (&self.store, self.engine.order(id)) {
            if let Err(err) = store.upsert_order(order) {
                warn!(order = %id, %err, "order upsert failed");
            }
        }
    }

    fn persist_trade(&self, order: &Order, trade: &Trade) {
        if let Some(store) = &self.store {
            if let Err(err) = store.upsert_trade(&order.account, trade) {
                warn!(trade = %trade.id, %err, "trade upsert failed");
            }
        }
    }
}
