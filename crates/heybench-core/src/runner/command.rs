use std::future::Future;

use tokio::process::Command;

use crate::config::{BenchConfig, HttpMethod};
use crate::error::HeybenchError;

// ---------------------------------------------------------------------------
// LoadTest
// ---------------------------------------------------------------------------

/// Shape of one load-generator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTest {
    pub url: String,
    pub requests: u32,
    pub concurrency: u32,
    pub method: HttpMethod,
}

impl LoadTest {
    pub fn from_config(config: &BenchConfig, url: &str) -> Self {
        Self {
            url: url.to_string(),
            requests: config.requests,
            concurrency: config.concurrency,
            method: config.method,
        }
    }

    /// Command-line arguments in `hey` syntax.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-n".to_string(),
            self.requests.to_string(),
            "-c".to_string(),
            self.concurrency.to_string(),
            "-m".to_string(),
            self.method.to_string(),
            self.url.clone(),
        ]
    }
}

// ---------------------------------------------------------------------------
// LoadGenerator
// ---------------------------------------------------------------------------

/// Runs one load test and returns its raw text report.
pub trait LoadGenerator: Send + Sync {
    fn execute(
        &self,
        test: &LoadTest,
    ) -> impl Future<Output = Result<String, HeybenchError>> + Send;
}

/// [`LoadGenerator`] backed by the `hey` executable.
#[derive(Debug, Clone)]
pub struct HeyCommand {
    program: String,
}

impl HeyCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl LoadGenerator for HeyCommand {
    async fn execute(&self, test: &LoadTest) -> Result<String, HeybenchError> {
        // A dropped future (timeout) must not leave the child running.
        let output = Command::new(&self.program)
            .args(test.args())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| HeybenchError::Command(format!("failed to start {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HeybenchError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
