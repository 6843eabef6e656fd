//! pipsim core — forex simulation and live-trading engine.
//!
//! The two load-bearing subsystems:
//! - the candle cache hierarchy: nine per-year caches, each time frame a
//!   pure function of the next finer one, with a bounded range-query layer
//!   and trailing partial-period synthesis on top;
//! - the order-matching engine and account ledger: deterministic fills in
//!   fixed-point pippettes, position accounting, and reconciliation against
//!   externally reported account state.
//!
//! Everything else (raw data, broker gateway, persistence) enters through
//! narrow traits.

pub mod candles;
pub mod domain;
pub mod gateway;
pub mod ledger;
pub mod market;
pub mod sim;
pub mod store;
pub mod strategy;
