//! Build and run simulations from configuration.
//!
//! Every account in the batch gets its own deterministic simulation over a
//! shared candle hierarchy; the batch fans out on rayon and one account's
//! failure never takes down the others.

use crate::config::{build_strategy, AccountConfig, SimConfig};
use crate::data::CsvCandleSource;
use anyhow::{Context, Result};
use pipsim_core::candles::{CandleStore, RangeQueryCache};
use pipsim_core::domain::{Account, AccountId, Pippettes};
use pipsim_core::ledger::AccountSnapshot;
use pipsim_core::market::{HistoricalFeed, PriceFeed};
use pipsim_core::sim::Simulation;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

pub const SCHEMA_VERSION: u32 = 1;

/// Outcome of one account's simulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimResult {
    pub schema_version: u32,
    pub run_id: String,
    pub account: String,
    pub final_balance: Pippettes,
    pub realized_pl: Pippettes,
    pub final_nav: Pippettes,
    pub snapshots: Vec<AccountSnapshot>,
}

/// Run the whole configured batch. Failed accounts are logged and omitted
/// from the results; an empty batch is not an error.
pub fn run(config: &SimConfig) -> Result<Vec<SimResult>> {
    let store = Arc::new(CandleStore::new(Arc::new(CsvCandleSource::new(
        &config.data_dir,
    ))));
    let candles = Arc::new(RangeQueryCache::new(Arc::clone(&store)));
    let feed: Arc<dyn PriceFeed> = Arc::new(HistoricalFeed::new(store));
    let run_id = config.run_id();

    info!(run_id = %run_id, accounts = config.accounts.len(), "starting simulation batch");

    let results: Vec<SimResult> = config
        .accounts
        .par_iter()
        .filter_map(|account| {
            match run_account(config, account, &run_id, Arc::clone(&candles), Arc::clone(&feed)) {
                Ok(result) => Some(result),
                Err(err) => {
                    error!(account = %account.id, %err, "account simulation failed, continuing batch");
                    None
                }
            }
        })
        .collect();

    Ok(results)
}

fn run_account(
    config: &SimConfig,
    account: &AccountConfig,
    run_id: &str,
    candles: Arc<RangeQueryCache>,
    feed: Arc<dyn PriceFeed>,
) -> Result<SimResult> {
    let strategy = build_strategy(&account.strategy)
        .with_context(|| format!("building strategy for account {}", account.id))?;

    let mut sim = Simulation::new(candles, feed, config.start, config.seed);
    sim.add_trader(
        Account::new(AccountId::new(&account.id), Pippettes(account.balance)),
        strategy,
    );
    sim.run_until(config.end);

    let trader = &sim.traders()[0];
    Ok(SimResult {
        schema_version: SCHEMA_VERSION,
        run_id: run_id.to_string(),
        account: account.id.clone(),
        final_balance: trader.account.balance,
        realized_pl: trader.account.realized_pl,
        final_nav: trader.account.net_asset_value(),
        snapshots: trader.snapshots.clone(),
    })
}
