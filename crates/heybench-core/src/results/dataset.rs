//! CSV dataset of parsed repetitions.
//!
//! The writer emits a fixed twelve-column schema; the reader looks columns up
//! by header name and turns every row into a [`ResultRow`]. A column missing
//! on read, a short row, or an unparsable cell all read as zero.

use std::collections::HashMap;
use std::path::Path;

use crate::error::HeybenchError;
use crate::extractors::{BenchmarkRecord, Field};
use crate::results::{IdentityRules, ResultRow};

/// Dataset header, in order.
pub const DATASET_COLUMNS: [&str; 12] = [
    "file",
    "total",
    "average",
    "fastest",
    "slowest",
    "requests_per_sec",
    "size_request",
    "p50",
    "p75",
    "p90",
    "p95",
    "p99",
];

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Write `records` to `path`, replacing any existing file. Absent fields are
/// written as empty cells.
pub async fn write_dataset(
    records: &[BenchmarkRecord],
    path: impl AsRef<Path>,
) -> Result<(), HeybenchError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(DATASET_COLUMNS)?;
    for record in records {
        writer.write_record(dataset_row(record))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| HeybenchError::Io(e.into_error()))?;

    tokio::fs::write(path.as_ref(), bytes).await?;
    tracing::info!(
        "Dataset written to {} ({} rows)",
        path.as_ref().display(),
        records.len()
    );
    Ok(())
}

fn dataset_row(record: &BenchmarkRecord) -> Vec<String> {
    std::iter::once(record.file.clone())
        .chain(
            Field::ALL
                .into_iter()
                .map(|field| record.formatted(field).unwrap_or_default()),
        )
        .collect()
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Read a dataset written by [`write_dataset`], attributing each row to a
/// target through `rules`.
///
/// Fails only when the file cannot be read or has no parsable header.
pub async fn read_dataset(
    path: impl AsRef<Path>,
    rules: &IdentityRules,
) -> Result<Vec<ResultRow>, HeybenchError> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes.as_slice());

    let headers = reader.headers()?.clone();
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    let missing: Vec<&str> = ["file", "requests_per_sec", "p95", "average", "total"]
        .into_iter()
        .filter(|col| !index.contains_key(col))
        .collect();
    if !missing.is_empty() {
        tracing::warn!(
            "Dataset {} lacks columns {:?}; they read as zero",
            path.as_ref().display(),
            missing
        );
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping dataset row {}: {e}", line + 1);
                continue;
            }
        };
        let cell = |name: &str| {
            index
                .get(name)
                .and_then(|&i| record.get(i))
                .unwrap_or("")
        };

        let file = cell("file").to_string();
        rows.push(ResultRow {
            target: rules.infer(&file).to_string(),
            rps: parse_float(cell("requests_per_sec")),
            p95: parse_float(cell("p95")),
            average: parse_float(cell("average")),
            total: parse_float(cell("total")),
            file,
        });
    }

    Ok(rows)
}

fn parse_float(s: &str) -> f64 {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
