//! Config-to-results pipeline over a generated CSV fixture.

use chrono::{Duration, NaiveDate};
use pipsim_core::candles::CandleSeries;
use pipsim_core::domain::{Candle, Currency, CurrencyPair, Pippettes};
use pipsim_runner::config::SimConfig;
use pipsim_runner::data::write_year_csv;
use pipsim_runner::export::{export_snapshots_csv, import_json};
use pipsim_runner::{export, runner};
use std::path::Path;

fn eur_usd() -> CurrencyPair {
    CurrencyPair::new(Currency::Eur, Currency::Usd)
}

/// A morning of oscillating minute bars on 2023-03-06.
fn write_fixture(dir: &Path) {
    let start = NaiveDate::from_ymd_opt(2023, 3, 6)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    let mut series = CandleSeries::new();
    for i in 0..300 {
        let phase = i % 60;
        let offset = if phase < 30 { phase } else { 60 - phase };
        let level = 110_000 + offset * 2;
        series.insert(
            start + Duration::minutes(i),
            Candle::new(
                Pippettes(level),
                Pippettes(level + 3),
                Pippettes(level - 3),
                Pippettes(level + 1),
            ),
        );
    }
    write_year_csv(dir, eur_usd(), 2023, &series).unwrap();
}

fn config_toml(data_dir: &Path) -> String {
    format!(
        r#"
data_dir = "{}"
start = "2023-03-06T09:00:00"
end = "2023-03-06T12:00:00"
seed = 9

[[accounts]]
id = "alpha"
balance = 1000000

[accounts.strategy]
type = "RANDOM_ENTRY"
pair = "EUR/USD"
units = 1
probability = 0.05
"#,
        data_dir.display()
    )
}

#[test]
fn batch_runs_deterministically_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let config = SimConfig::from_toml(&config_toml(dir.path())).unwrap();

    let first = runner::run(&config).unwrap();
    let second = runner::run(&config).unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);

    let result = &first[0];
    assert_eq!(result.account, "alpha");
    assert_eq!(result.run_id, config.run_id());
    assert_eq!(result.snapshots.len(), 181);
    assert_eq!(result.final_nav, result.snapshots.last().unwrap().nav);
}

#[test]
fn results_survive_json_and_csv_export() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let config = SimConfig::from_toml(&config_toml(dir.path())).unwrap();
    let results = runner::run(&config).unwrap();

    let json = export::export_json(&results).unwrap();
    assert_eq!(import_json(&json).unwrap(), results);

    let csv = export_snapshots_csv(&results).unwrap();
    // Header plus one row per snapshot.
    assert_eq!(csv.trim_end().lines().count(), 1 + results[0].snapshots.len());
}

#[test]
fn account_without_data_still_completes() {
    // No CSV for USD/JPY: the account's orders can never fill, but the
    // batch still returns a full snapshot stream for it.
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let toml = format!(
        r#"
data_dir = "{}"
start = "2023-03-06T09:00:00"
end = "2023-03-06T10:00:00"
seed = 9

[[accounts]]
id = "alpha"
balance = 1000000

[accounts.strategy]
type = "RANDOM_ENTRY"
pair = "EUR/USD"
units = 1
probability = 0.05

[[accounts]]
id = "no-data"
balance = 1000000

[accounts.strategy]
type = "RANDOM_ENTRY"
pair = "USD/JPY"
units = 1
probability = 0.5
"#,
        dir.path().display()
    );
    let config = SimConfig::from_toml(&toml).unwrap();
    let results = runner::run(&config).unwrap();

    assert_eq!(results.len(), 2);
    let stuck = results.iter().find(|r| r.account == "no-data").unwrap();
    assert_eq!(stuck.final_balance, Pippettes(1_000_000));
    assert_eq!(stuck.snapshots.len(), 61);
}
