pub mod chart;
pub mod dataset;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HeybenchError;
use crate::extractors::BenchmarkRecord;

// ---------------------------------------------------------------------------
// ResultRow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// Target identity inferred from `file`.
    pub target: String,
    pub file: String,
    /// Throughput in requests per second.
    pub rps: f64,
    /// 95th percentile latency (s).
    pub p95: f64,
    /// Average latency (s).
    pub average: f64,
    /// Wall-clock duration of the whole repetition (s).
    pub total: f64,
}

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// One of the four charted metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Rps,
    P95,
    Average,
    Total,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Rps, Metric::P95, Metric::Average, Metric::Total];

    pub fn key(self) -> &'static str {
        match self {
            Metric::Rps => "rps",
            Metric::P95 => "p95",
            Metric::Average => "average",
            Metric::Total => "total",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Metric::Rps => "Requests Per Second",
            Metric::P95 => "95th Percentile Latency",
            Metric::Average => "Average Latency",
            Metric::Total => "Total Time",
        }
    }

    /// Chart artifact file name.
    pub fn file_name(self) -> &'static str {
        match self {
            Metric::Rps => "chart_rps.html",
            Metric::P95 => "chart_p95.html",
            Metric::Average => "chart_avg.html",
            Metric::Total => "chart_total.html",
        }
    }

    pub fn value(self, row: &ResultRow) -> f64 {
        match self {
            Metric::Rps => row.rps,
            Metric::P95 => row.p95,
            Metric::Average => row.average,
            Metric::Total => row.total,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Metric {
    type Err = HeybenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.key() == s)
            .ok_or_else(|| HeybenchError::UnknownMetric(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// IdentityRules
// ---------------------------------------------------------------------------

/// Maps a marker substring of a report file name to a target label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IdentityRule {
    pub marker: String,
    pub label: String,
}

/// Ordered marker rules plus a fallback label. The first rule whose marker
/// occurs in the file name wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct IdentityRules {
    pub rules: Vec<IdentityRule>,
    pub fallback: String,
}

impl Default for IdentityRules {
    fn default() -> Self {
        Self {
            rules: vec![IdentityRule {
                marker: "green".to_string(),
                label: "green-cloud".to_string(),
            }],
            fallback: "t2no3".to_string(),
        }
    }
}

impl IdentityRules {
    pub fn infer(&self, file_name: &str) -> &str {
        self.rules
            .iter()
            .find(|r| file_name.contains(&r.marker))
            .map(|r| r.label.as_str())
            .unwrap_or(&self.fallback)
    }
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

/// A repetition that produced no record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RepetitionFailure {
    pub target: String,
    pub repetition: u32,
    pub error: String,
}

/// Outcome counts for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TargetTally {
    pub target: String,
    pub succeeded: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Repetitions for which the load generator was invoked.
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
    /// Per-target counts in run order.
    #[serde(default)]
    pub targets: Vec<TargetTally>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RepetitionFailure>,
}

impl RunSummary {
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            cancelled: false,
            targets: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Count a parsed record against the target it was produced for.
    pub fn record_success(&mut self, record: &BenchmarkRecord) {
        self.attempted += 1;
        self.succeeded += 1;
        if let Some(target) = &record.target {
            self.tally(target).succeeded += 1;
        }
    }

    pub fn record_failure(&mut self, target: &str, repetition: u32, error: &HeybenchError) {
        self.attempted += 1;
        self.failed += 1;
        self.tally(target).failed += 1;
        self.failures.push(RepetitionFailure {
            target: target.to_string(),
            repetition,
            error: error.to_string(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    pub fn tally_for(&self, target: &str) -> Option<&TargetTally> {
        self.targets.iter().find(|t| t.target == target)
    }

    fn tally(&mut self, target: &str) -> &mut TargetTally {
        let idx = match self.targets.iter().position(|t| t.target == target) {
            Some(idx) => idx,
            None => {
                self.targets.push(TargetTally {
                    target: target.to_string(),
                    succeeded: 0,
                    failed: 0,
                });
                self.targets.len() - 1
            }
        };
        &mut self.targets[idx]
    }
}

/// Write a [`RunSummary`] as pretty-printed JSON.
pub async fn write_summary(
    summary: &RunSummary,
    path: impl AsRef<std::path::Path>,
) -> Result<(), HeybenchError> {
    let content = serde_json::to_string_pretty(summary)?;
    tokio::fs::write(path.as_ref(), content).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
