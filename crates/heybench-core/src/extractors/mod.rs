//! Metric extraction: turns the text report printed by `hey` into a
//! [`BenchmarkRecord`].
//!
//! Parsing is table-driven: every [`Field`] owns one regex with a single
//! numeric capture group, and each report line is tried against every
//! pattern. A later matching line overwrites an earlier one.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;

use crate::error::HeybenchError;

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// A numeric field scraped from a report. Declaration order is the dataset
/// column order after `file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Total,
    Average,
    Fastest,
    Slowest,
    RequestsPerSec,
    SizeRequest,
    P50,
    P75,
    P90,
    P95,
    P99,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Total,
        Field::Average,
        Field::Fastest,
        Field::Slowest,
        Field::RequestsPerSec,
        Field::SizeRequest,
        Field::P50,
        Field::P75,
        Field::P90,
        Field::P95,
        Field::P99,
    ];

    /// Column name used in the dataset header.
    pub fn column(self) -> &'static str {
        match self {
            Field::Total => "total",
            Field::Average => "average",
            Field::Fastest => "fastest",
            Field::Slowest => "slowest",
            Field::RequestsPerSec => "requests_per_sec",
            Field::SizeRequest => "size_request",
            Field::P50 => "p50",
            Field::P75 => "p75",
            Field::P90 => "p90",
            Field::P95 => "p95",
            Field::P99 => "p99",
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            Field::Total => r"Total:\s+([\d.]+)",
            Field::Average => r"Average:\s+([\d.]+)",
            Field::Fastest => r"Fastest:\s+([\d.]+)",
            Field::Slowest => r"Slowest:\s+([\d.]+)",
            Field::RequestsPerSec => r"Requests/sec:\s+([\d.]+)",
            Field::SizeRequest => r"Size/request:\s+([\d.]+)",
            Field::P50 => r"50% in ([\d.]+)",
            Field::P75 => r"75% in ([\d.]+)",
            Field::P90 => r"90% in ([\d.]+)",
            Field::P95 => r"95% in ([\d.]+)",
            Field::P99 => r"99% in ([\d.]+)",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// BenchmarkRecord
// ---------------------------------------------------------------------------

/// Parsed output of one repetition.
///
/// A field is present only if a report line matched it; a measured zero is
/// kept and is distinct from "no data".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkRecord {
    /// Base name of the raw report file.
    pub file: String,
    /// Target URL the report was produced against, when known.
    pub target: Option<String>,
    pub values: BTreeMap<Field, f64>,
}

impl BenchmarkRecord {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.values.get(&field).copied()
    }

    /// The value as persisted: four decimal places.
    pub fn formatted(&self, field: Field) -> Option<String> {
        self.get(field).map(|v| format!("{v:.4}"))
    }

    /// Flat `name → value` view, `file` included, absent fields omitted.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("file".to_string(), self.file.clone());
        for (field, value) in &self.values {
            map.insert(field.column().to_string(), format!("{value:.4}"));
        }
        map
    }

    /// `true` when no metric matched.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ReportParser
// ---------------------------------------------------------------------------

/// Compiled pattern table for `hey` text reports.
#[derive(Debug, Clone)]
pub struct ReportParser {
    patterns: Vec<(Field, Regex)>,
}

impl ReportParser {
    pub fn new() -> Result<Self, HeybenchError> {
        let patterns = Field::ALL
            .into_iter()
            .map(|field| Ok((field, Regex::new(field.pattern())?)))
            .collect::<Result<Vec<_>, HeybenchError>>()?;
        Ok(Self { patterns })
    }

    /// Parse report text saved under `file_name`.
    pub fn parse(&self, text: &str, file_name: &str) -> BenchmarkRecord {
        let mut record = BenchmarkRecord::new(file_name);
        for line in text.lines() {
            for (field, re) in &self.patterns {
                if let Some(value) = capture_float(re, line) {
                    tracing::debug!("{file_name}: {field} = {value}");
                    record.values.insert(*field, value);
                }
            }
        }
        record
    }

    /// Parse a report file. An unreadable file yields a record carrying only
    /// the file name.
    pub async fn parse_file(&self, path: impl AsRef<Path>) -> BenchmarkRecord {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match tokio::fs::read(path).await {
            Ok(bytes) => self.parse(&String::from_utf8_lossy(&bytes), &file_name),
            Err(e) => {
                tracing::warn!("Skipping unreadable report {}: {e}", path.display());
                BenchmarkRecord::new(file_name)
            }
        }
    }
}

fn capture_float(re: &Regex, line: &str) -> Option<f64> {
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
