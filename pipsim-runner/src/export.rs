//! Result export — JSON for round-tripping, CSV for external analysis.

use crate::runner::{SimResult, SCHEMA_VERSION};
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Serialize results to pretty JSON.
pub fn export_json(results: &[SimResult]) -> Result<String> {
    serde_json::to_string_pretty(results).context("failed to serialize results to JSON")
}

/// Deserialize results from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<Vec<SimResult>> {
    let results: Vec<SimResult> =
        serde_json::from_str(json).context("failed to deserialize results from JSON")?;
    for result in &results {
        if result.schema_version > SCHEMA_VERSION {
            bail!(
                "unsupported schema version {} (max supported: {})",
                result.schema_version,
                SCHEMA_VERSION
            );
        }
    }
    Ok(results)
}

/// Snapshot streams as CSV: one row per account per tick.
///
/// Columns: account, at, balance, nav, unrealized_pl (all money columns in
/// quote units).
pub fn export_snapshots_csv(results: &[SimResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["account", "at", "balance", "nav", "unrealized_pl"])?;

    for result in results {
        for snapshot in &result.snapshots {
            writer.write_record([
                result.account.clone(),
                snapshot.at.to_string(),
                snapshot.balance.to_string(),
                snapshot.nav.to_string(),
                snapshot.unrealized_pl.to_string(),
            ])?;
        }
    }

    let bytes = writer.into_inner().context("flushing CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

/// Write the snapshot CSV to a file.
pub fn write_snapshots_csv(results: &[SimResult], path: &Path) -> Result<()> {
    let csv = export_snapshots_csv(results)?;
    std::fs::write(path, csv).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pipsim_core::domain::{AccountId, Pippettes};
    use pipsim_core::ledger::AccountSnapshot;

    fn sample_result() -> SimResult {
        let at = NaiveDate::from_ymd_opt(2023, 3, 6)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        SimResult {
            schema_version: SCHEMA_VERSION,
            run_id: "abc".into(),
            account: "alpha".into(),
            final_balance: Pippettes(100_480),
            realized_pl: Pippettes(480),
            final_nav: Pippettes(100_480),
            snapshots: vec![AccountSnapshot {
                account: AccountId::new("alpha"),
                at,
                balance: Pippettes(100_480),
                nav: Pippettes(100_480),
                unrealized_pl: Pippettes::ZERO,
            }],
        }
    }

    #[test]
    fn json_round_trips() {
        let results = vec![sample_result()];
        let json = export_json(&results).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(results, back);
    }

    #[test]
    fn future_schema_versions_are_rejected() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&[result]).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn csv_has_one_row_per_snapshot() {
        let csv = export_snapshots_csv(&[sample_result()]).unwrap();
        let lines: Vec<&str> = csv.trim_end().lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("account,at,"));
        assert!(lines[1].starts_with("alpha,"));
        assert!(lines[1].contains("1.00480"));
    }
}
