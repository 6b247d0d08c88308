use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::results::IdentityRules;

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// BenchConfig
// ---------------------------------------------------------------------------

/// Everything a benchmark run needs: what to hit, how hard, how often, and
/// where the artifacts go.
///
/// Missing fields in a config file fall back to [`BenchConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BenchConfig {
    /// Endpoints under test, in run order.
    pub targets: Vec<String>,
    /// Number of repetitions per target.
    pub repeat: u32,
    /// Total requests per repetition (`hey -n`).
    pub requests: u32,
    /// Concurrent workers per repetition (`hey -c`).
    pub concurrency: u32,
    /// HTTP method (`hey -m`).
    pub method: HttpMethod,
    /// Load generator executable, resolved on `PATH` when not absolute.
    pub program: String,
    /// Directory receiving one raw report per repetition. Cleared on every run.
    pub output_dir: PathBuf,
    pub dataset_path: PathBuf,
    pub chart_dir: PathBuf,
    /// Pause between consecutive invocations, in milliseconds.
    pub pause_ms: u64,
    /// Per-invocation timeout. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    pub identity: IdentityRules,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                "https://green-apis.nesgnas.uk/persons".to_string(),
                "https://apis.nesgnas.uk/persons".to_string(),
            ],
            repeat: 30,
            requests: 1000,
            concurrency: 100,
            method: HttpMethod::Get,
            program: "hey".to_string(),
            output_dir: PathBuf::from("hey_results"),
            dataset_path: PathBuf::from("hey_results.csv"),
            chart_dir: PathBuf::from("."),
            pause_ms: 1000,
            timeout_secs: None,
            identity: IdentityRules::default(),
        }
    }
}

impl BenchConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Path of the run summary written next to the raw reports.
    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join("run_summary.json")
    }
}
