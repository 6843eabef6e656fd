//! Order matching against the current market price.
//!
//! The engine owns every order's lifecycle: `Open -> Filled` when the
//! order's trigger is met while unexpired, `Open -> Cancelled` on expiry or
//! explicit cancel. Exactly one terminal event is emitted per order; the
//! caller routes it back to the submitting account.

use super::feed::PriceFeed;
use crate::domain::{
    AccountId, CurrencyPair, ExpiryPolicy, Order, OrderId, OrderKind, OrderStatus, Pippettes,
    Units,
};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Terminal order transition, delivered exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    Filled(Order),
    Cancelled(Order),
}

impl OrderEvent {
    pub fn order(&self) -> &Order {
        match self {
            OrderEvent::Filled(order) | OrderEvent::Cancelled(order) => order,
        }
    }
}

/// What a caller submits; the engine assigns the id and timestamps it.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub account: AccountId,
    pub pair: CurrencyPair,
    pub units: Units,
    pub kind: OrderKind,
    pub expiry: ExpiryPolicy,
}

pub struct MarketEngine {
    feed: Arc<dyn PriceFeed>,
    orders: BTreeMap<OrderId, Order>,
    next_id: u64,
}

impl MarketEngine {
    pub fn new(feed: Arc<dyn PriceFeed>) -> Self {
        Self {
            feed,
            orders: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Record an order and immediately attempt one evaluation pass for it.
    pub fn submit(&mut self, request: OrderRequest, now: NaiveDateTime) -> (OrderId, Option<OrderEvent>) {
        self.next_id += 1;
        let id = OrderId(self.next_id);
        let order = Order {
            id,
            account: request.account,
            pair: request.pair,
            units: request.units,
            kind: request.kind,
            submitted_at: now,
            expiry: request.expiry,
            status: OrderStatus::Open,
            executed_price: None,
        };
        self.orders.insert(id, order);
        let event = self.evaluate(id, now);
        (id, event)
    }

    /// Evaluate every open order against the current price. The only place
    /// execution prices are read.
    pub fn process_pending(&mut self, now: NaiveDateTime) -> Vec<OrderEvent> {
        let open: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.is_open())
            .map(|o| o.id)
            .collect();

        open.into_iter()
            .filter_map(|id| self.evaluate(id, now))
            .collect()
    }

    /// Explicitly cancel an open order.
    pub fn cancel(&mut self, id: OrderId) -> Option<OrderEvent> {
        let order = self.orders.get_mut(&id)?;
        if !order.is_open() {
            return None;
        }
        order.status = OrderStatus::Cancelled;
        Some(OrderEvent::Cancelled(order.clone()))
    }

    /// Current mid price, inverse pairs priced by reciprocal.
    pub fn price(&self, pair: CurrencyPair, now: NaiveDateTime) -> Result<Pippettes, super::feed::MarketError> {
        self.feed.mid_price(pair, now)
    }

    pub fn is_available(&self, pair: CurrencyPair, now: NaiveDateTime) -> bool {
        self.feed.is_available(pair, now)
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn open_order_count(&self) -> usize {
        self.orders.values().filter(|o| o.is_open()).count()
    }

    /// Ids of the account's open orders on a pair.
    pub fn open_orders_for(&self, account: &AccountId, pair: CurrencyPair) -> Vec<OrderId> {
        self.orders
            .values()
            .filter(|o| o.is_open() && &o.account == account && o.pair == pair)
            .map(|o| o.id)
            .collect()
    }

    /// Open orders submitted by an account for a pair or its inverse.
    pub fn open_exposure(&self, account: &AccountId, pair: CurrencyPair) -> bool {
        let inverse = pair.inverse();
        self.orders.values().any(|o| {
            o.is_open()
                && &o.account == account
                && o.units.is_buy()
                && (o.pair == pair || o.pair == inverse)
        })
    }

    fn evaluate(&mut self, id: OrderId, now: NaiveDateTime) -> Option<OrderEvent> {
        let order = self.orders.get(&id)?;
        if !order.is_open() {
            return None;
        }

        if order.is_expired(now) {
            let order = self.orders.get_mut(&id)?;
            order.status = OrderStatus::Cancelled;
            return Some(OrderEvent::Cancelled(order.clone()));
        }

        let mid = match self.feed.mid_price(order.pair, now) {
            Ok(price) => price,
            Err(err) => {
                // Order stays open and is retried on the next tick.
                debug!(order = %id, %err, "price lookup failed, skipping order this tick");
                return None;
            }
        };

        if !triggered(order.kind, order.units, mid) {
            return None;
        }

        let half = order.pair.half_spread();
        let executed = if order.units.is_buy() { mid + half } else { mid - half };

        let order = self.orders.get_mut(&id)?;
        order.status = OrderStatus::Filled;
        order.executed_price = Some(executed);
        Some(OrderEvent::Filled(order.clone()))
    }
}

/// Whether an order's kind allows filling at the given mid price.
fn triggered(kind: OrderKind, units: Units, mid: Pippettes) -> bool {
    match kind {
        OrderKind::Market => true,
        // Fill at the given price or better.
        OrderKind::Limit(limit) | OrderKind::TakeProfit(limit) => {
            if units.is_buy() {
                mid <= limit
            } else {
                mid >= limit
            }
        }
        // Fill once the price breaches the stop.
        OrderKind::StopLoss(stop) => {
            if units.is_buy() {
                mid >= stop
            } else {
                mid <= stop
            }
        }
    }
}
