//! pipsim CLI: run simulations and inspect candle ranges.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use pipsim_core::candles::{CandleStore, RangeQueryCache};
use pipsim_core::domain::{CurrencyPair, TimeFrame};
use pipsim_runner::config::SimConfig;
use pipsim_runner::data::CsvCandleSource;
use pipsim_runner::{export, runner};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "pipsim", about = "Forex simulation engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a simulation batch from a TOML config.
    Run {
        /// Path to the simulation config.
        #[arg(long)]
        config: PathBuf,

        /// Write the snapshot stream as CSV to this path.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print a candle range for a pair and time frame.
    Candles {
        /// Directory holding {PAIR}/{year}.csv minute files.
        #[arg(long)]
        data_dir: PathBuf,

        /// Pair, e.g. EUR/USD.
        #[arg(long)]
        pair: String,

        /// Time frame: M1, M5, M15, M30, H1, H4, D1, W1, MN.
        #[arg(long, default_value = "H1")]
        tf: String,

        /// Range start, e.g. 2023-03-06T00:00:00.
        #[arg(long)]
        start: String,

        /// Range end (inclusive).
        #[arg(long)]
        end: String,
    },
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .with_context(|| format!("could not parse '{s}' as a timestamp"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Run { config, out } => {
            let config = SimConfig::load(&config)?;
            let results = runner::run(&config)?;
            info!(accounts = results.len(), "batch finished");

            for result in &results {
                println!(
                    "{}: balance {} nav {} realized {}",
                    result.account, result.final_balance, result.final_nav, result.realized_pl
                );
            }

            if let Some(path) = out {
                export::write_snapshots_csv(&results, &path)?;
                println!("snapshots written to {}", path.display());
            }
            Ok(())
        }

        Command::Candles { data_dir, pair, tf, start, end } => {
            let pair: CurrencyPair = pair
                .parse()
                .with_context(|| format!("could not parse pair '{pair}'"))?;
            let tf: TimeFrame = tf
                .parse()
                .with_context(|| format!("could not parse time frame '{tf}'"))?;
            let start = parse_datetime(&start)?;
            let end = parse_datetime(&end)?;

            let store = Arc::new(CandleStore::new(Arc::new(CsvCandleSource::new(data_dir))));
            let cache = RangeQueryCache::new(store);
            // Inspection is offline: treat the range end as "now".
            let series = cache.candles(tf, pair, start, end, end)?;

            println!("{pair} {tf}: {} candles", series.len());
            for (t, c) in series.iter() {
                println!("{t}  O {}  H {}  L {}  C {}", c.open, c.high, c.low, c.close);
            }
            Ok(())
        }
    }
}
