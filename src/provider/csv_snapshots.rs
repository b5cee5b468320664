// =============================================================================
// CSV Snapshot Loader — pre-recorded market cross-sections
// =============================================================================
//
// Offline counterpart to the live market fetch: a directory of CSV files,
// each holding one cross-section.  Expected header:
//
//   taken_at,asset_id,price,market_cap,volume
//
// `taken_at` is RFC 3339 and identical on every row of one file; the first
// row's value stamps the snapshot.  Rows with a non-positive or unparseable
// price are skipped with a warning — one bad row must not lose the snapshot.
//
// Loaded snapshots are sorted ascending by capture time so they can be pushed
// straight into the snapshot history.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::types::{MarketSnapshot, PricePoint};

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    taken_at: DateTime<Utc>,
    asset_id: String,
    price: f64,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
}

/// Load every `*.csv` file under `dir`, oldest snapshot first.
pub fn load_snapshot_dir(dir: impl AsRef<Path>) -> Result<Vec<MarketSnapshot>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read snapshot directory {}", dir.display()))?;

    let mut snapshots = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list snapshot directory {}", dir.display()))?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }

        let file = std::fs::File::open(&path)
            .with_context(|| format!("failed to open snapshot file {}", path.display()))?;
        match parse_snapshot(file) {
            Ok(Some(snapshot)) => {
                info!(
                    path = %path.display(),
                    assets = snapshot.len(),
                    taken_at = %snapshot.taken_at,
                    "loaded CSV snapshot"
                );
                snapshots.push(snapshot);
            }
            Ok(None) => {
                warn!(path = %path.display(), "snapshot file has no usable rows — skipped");
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to parse snapshot file {}", path.display()));
            }
        }
    }

    snapshots.sort_by_key(|s| s.taken_at);
    Ok(snapshots)
}

/// Parse one snapshot file.  Returns `Ok(None)` when no row survives
/// validation.
fn parse_snapshot(reader: impl Read) -> Result<Option<MarketSnapshot>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut taken_at: Option<DateTime<Utc>> = None;
    let mut points: HashMap<String, PricePoint> = HashMap::new();

    for record in csv_reader.deserialize() {
        let row: SnapshotRow = record.context("malformed CSV row")?;

        if !row.price.is_finite() || row.price < 0.0 {
            warn!(asset_id = %row.asset_id, price = row.price, "skipping row with bad price");
            continue;
        }

        taken_at.get_or_insert(row.taken_at);
        points.insert(
            row.asset_id,
            PricePoint {
                price: row.price,
                market_cap: row.market_cap,
                volume: row.volume,
            },
        );
    }

    match taken_at {
        Some(ts) if !points.is_empty() => Ok(Some(MarketSnapshot::new(ts, points))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_snapshot() {
        let csv = "\
taken_at,asset_id,price,market_cap,volume
2024-01-01T00:00:00Z,bitcoin,42000.0,820000000000,15000000000
2024-01-01T00:00:00Z,ethereum,2300.5,280000000000,9000000000
";
        let snapshot = parse_snapshot(csv.as_bytes()).unwrap().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.price_of("bitcoin"), Some(42000.0));
        assert_eq!(snapshot.taken_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn empty_optional_columns_are_none() {
        let csv = "\
taken_at,asset_id,price,market_cap,volume
2024-01-01T00:00:00Z,bitcoin,42000.0,,
";
        let snapshot = parse_snapshot(csv.as_bytes()).unwrap().unwrap();
        let point = snapshot.points.get("bitcoin").unwrap();
        assert_eq!(point.market_cap, None);
        assert_eq!(point.volume, None);
    }

    #[test]
    fn bad_price_row_is_skipped_not_fatal() {
        let csv = "\
taken_at,asset_id,price,market_cap,volume
2024-01-01T00:00:00Z,bitcoin,42000.0,,
2024-01-01T00:00:00Z,broken,NaN,,
";
        let snapshot = parse_snapshot(csv.as_bytes()).unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.price_of("broken").is_none());
    }

    #[test]
    fn zero_price_rows_are_kept() {
        // Zero is a legal cross-section price; the movers engine is the one
        // that treats it as an undefined change base.
        let csv = "\
taken_at,asset_id,price,market_cap,volume
2024-01-01T00:00:00Z,delisted,0.0,,
";
        let snapshot = parse_snapshot(csv.as_bytes()).unwrap().unwrap();
        assert_eq!(snapshot.price_of("delisted"), Some(0.0));
    }

    #[test]
    fn file_with_no_rows_yields_none() {
        let csv = "taken_at,asset_id,price,market_cap,volume\n";
        assert!(parse_snapshot(csv.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn loads_and_sorts_directory() {
        let dir = std::env::temp_dir().join(format!("coinpulse-snap-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        std::fs::write(
            dir.join("b_later.csv"),
            "taken_at,asset_id,price,market_cap,volume\n2024-01-02T00:00:00Z,bitcoin,43000.0,,\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("a_earlier.csv"),
            "taken_at,asset_id,price,market_cap,volume\n2024-01-01T00:00:00Z,bitcoin,42000.0,,\n",
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let snapshots = load_snapshot_dir(&dir).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].taken_at < snapshots[1].taken_at);
        assert_eq!(snapshots[0].price_of("bitcoin"), Some(42000.0));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
