use std::io::ErrorKind;
use std::path::Path;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::{validation::ensure_valid, BenchConfig};
use crate::error::HeybenchError;
use crate::extractors::{BenchmarkRecord, ReportParser};
use crate::results::RunSummary;
use crate::runner::command::{LoadGenerator, LoadTest};

/// Records collected by a run plus its accounting.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub records: Vec<BenchmarkRecord>,
    pub summary: RunSummary,
}

/// File-name-safe token for a target: scheme stripped, every character
/// outside `[A-Za-z0-9]` replaced by `_`.
pub fn slugify_target(target: &str) -> String {
    let rest = target
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(target);
    rest.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Raw report file name for one repetition.
pub fn artifact_name(target: &str, repetition: u32) -> String {
    format!("hey_result_{}_{}.txt", slugify_target(target), repetition)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs every target `repeat` times, one invocation at a time.
pub struct Orchestrator<G> {
    config: BenchConfig,
    generator: G,
    parser: ReportParser,
}

impl<G: LoadGenerator> Orchestrator<G> {
    pub fn new(config: BenchConfig, generator: G) -> Result<Self, HeybenchError> {
        ensure_valid(&config)?;
        Ok(Self {
            config,
            generator,
            parser: ReportParser::new()?,
        })
    }

    /// Run all repetitions. Failed repetitions are logged, counted and
    /// skipped; cancellation stops scheduling and keeps what was collected.
    ///
    /// Errors only when the output directory cannot be prepared.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunOutcome, HeybenchError> {
        reset_dir(&self.config.output_dir).await?;

        let mut summary = RunSummary::start();
        let mut records = Vec::new();
        let pause = self.config.pause();
        let mut invoked = 0usize;

        tracing::info!(
            "Starting run {}: {} target(s) x {} repetition(s)",
            summary.run_id,
            self.config.targets.len(),
            self.config.repeat
        );

        'targets: for target in &self.config.targets {
            for repetition in 1..=self.config.repeat {
                if cancel.is_cancelled() {
                    summary.cancelled = true;
                    break 'targets;
                }

                if invoked > 0 && !pause.is_zero() {
                    tokio::select! {
                        _ = sleep(pause) => {}
                        _ = cancel.cancelled() => {
                            summary.cancelled = true;
                            break 'targets;
                        }
                    }
                }
                invoked += 1;

                tracing::info!(
                    "Running test {repetition}/{} for {target}",
                    self.config.repeat
                );
                match self.run_repetition(target, repetition).await {
                    Ok(record) => {
                        summary.record_success(&record);
                        records.push(record);
                    }
                    Err(e) => {
                        tracing::warn!("Skipping repetition {repetition} for {target}: {e}");
                        summary.record_failure(target, repetition, &e);
                    }
                }
            }
        }

        summary.finish();
        if summary.cancelled {
            tracing::warn!("Run {} cancelled after {} invocation(s)", summary.run_id, invoked);
        }
        tracing::info!(
            "Run {} finished: {} succeeded, {} failed",
            summary.run_id,
            summary.succeeded,
            summary.failed
        );

        Ok(RunOutcome { records, summary })
    }

    async fn run_repetition(
        &self,
        target: &str,
        repetition: u32,
    ) -> Result<BenchmarkRecord, HeybenchError> {
        let test = LoadTest::from_config(&self.config, target);
        let output = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, self.generator.execute(&test))
                .await
                .map_err(|_| HeybenchError::Timeout(limit.as_secs()))??,
            None => self.generator.execute(&test).await?,
        };

        let path = self.config.output_dir.join(artifact_name(target, repetition));
        tokio::fs::write(&path, output).await?;
        tracing::debug!("Saved report to {}", path.display());

        Ok(self.parser.parse_file(&path).await.with_target(target))
    }
}

/// Remove `dir` if it exists and recreate it empty.
async fn reset_dir(dir: &Path) -> Result<(), HeybenchError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::extractors::Field;

    const REPORT: &str = "Summary:\n  Total:\t3.0000 secs\n  Average:\t0.0234 secs\n  Requests/sec:\t123.4500\n\nLatency distribution:\n  95% in 0.0456 secs\n";

    /// Returns the same report for every invocation and remembers the calls.
    struct CannedGenerator {
        calls: Mutex<Vec<LoadTest>>,
    }

    impl CannedGenerator {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<LoadTest> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    impl LoadGenerator for CannedGenerator {
        async fn execute(&self, test: &LoadTest) -> Result<String, HeybenchError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(test.clone());
            }
            Ok(REPORT.to_string())
        }
    }

    /// Fails every second invocation.
    struct FlakyGenerator {
        count: AtomicUsize,
    }

    impl LoadGenerator for FlakyGenerator {
        async fn execute(&self, _test: &LoadTest) -> Result<String, HeybenchError> {
            let n = self.count.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 1 {
                Err(HeybenchError::Command("hey exited with status 1".to_string()))
            } else {
                Ok(REPORT.to_string())
            }
        }
    }

    struct SlowGenerator;

    impl LoadGenerator for SlowGenerator {
        async fn execute(&self, _test: &LoadTest) -> Result<String, HeybenchError> {
            sleep(Duration::from_secs(30)).await;
            Ok(REPORT.to_string())
        }
    }

    fn make_config(dir: &Path, repeat: u32) -> BenchConfig {
        BenchConfig {
            targets: vec![
                "https://green-apis.example.uk/persons".to_string(),
                "https://apis.example.uk/persons".to_string(),
            ],
            repeat,
            requests: 20,
            concurrency: 2,
            pause_ms: 0,
            output_dir: dir.join("hey_results"),
            dataset_path: dir.join("hey_results.csv"),
            chart_dir: dir.to_path_buf(),
            ..BenchConfig::default()
        }
    }

    // -----------------------------------------------------------------------
    // Naming
    // -----------------------------------------------------------------------

    #[test]
    fn slug_strips_scheme_and_replaces_symbols() {
        let slug = slugify_target("https://example.uk/persons");
        assert_eq!(slug, "example_uk_persons");
        assert!(slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn slug_handles_plain_http_and_ports() {
        assert_eq!(slugify_target("http://localhost:8080/a?b=c"), "localhost_8080_a_b_c");
        assert_eq!(slugify_target("no-scheme.io"), "no_scheme_io");
        assert_eq!(slugify_target("https://exämple.uk"), "ex_mple_uk");
    }

    #[test]
    fn artifact_name_combines_slug_and_repetition() {
        assert_eq!(
            artifact_name("https://green-apis.nesgnas.uk/persons", 7),
            "hey_result_green_apis_nesgnas_uk_persons_7.txt"
        );
    }

    // -----------------------------------------------------------------------
    // Orchestrator
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn runs_every_target_and_repetition_in_order() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = make_config(dir.path(), 3);
        let orchestrator =
            Orchestrator::new(config.clone(), CannedGenerator::new()).expect("valid config");

        let outcome = orchestrator
            .run(&CancellationToken::new())
            .await
            .expect("run should succeed");

        assert_eq!(outcome.records.len(), 6);
        assert_eq!(outcome.summary.attempted, 6);
        assert_eq!(outcome.summary.succeeded, 6);
        assert_eq!(outcome.summary.failed, 0);
        assert!(!outcome.summary.cancelled);

        let calls = orchestrator.generator.calls();
        assert_eq!(calls.len(), 6);
        assert!(calls[..3].iter().all(|c| c.url == config.targets[0]));
        assert!(calls[3..].iter().all(|c| c.url == config.targets[1]));
        assert_eq!(calls[0].requests, 20);
        assert_eq!(calls[0].concurrency, 2);

        let first = &outcome.records[0];
        assert_eq!(first.file, "hey_result_green_apis_example_uk_persons_1.txt");
        assert_eq!(first.target.as_deref(), Some("https://green-apis.example.uk/persons"));
        assert_eq!(first.formatted(Field::P95).as_deref(), Some("0.0456"));
        assert_eq!(outcome.records[5].file, "hey_result_apis_example_uk_persons_3.txt");
    }

    #[tokio::test]
    async fn raw_reports_are_persisted() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = make_config(dir.path(), 1);
        let orchestrator =
            Orchestrator::new(config.clone(), CannedGenerator::new()).expect("valid config");

        orchestrator
            .run(&CancellationToken::new())
            .await
            .expect("run should succeed");

        let saved = config
            .output_dir
            .join("hey_result_apis_example_uk_persons_1.txt");
        let content = tokio::fs::read_to_string(saved).await.expect("report should exist");
        assert_eq!(content, REPORT);
    }

    #[tokio::test]
    async fn output_dir_is_cleared_first() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = make_config(dir.path(), 1);
        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .expect("seed dir should be created");
        let stale = config.output_dir.join("stale.txt");
        tokio::fs::write(&stale, "old").await.expect("seed write should succeed");

        let orchestrator = Orchestrator::new(config, CannedGenerator::new()).expect("valid config");
        orchestrator
            .run(&CancellationToken::new())
            .await
            .expect("run should succeed");

        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn failed_repetitions_are_skipped_and_counted() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = make_config(dir.path(), 2);
        let generator = FlakyGenerator {
            count: AtomicUsize::new(0),
        };
        let orchestrator = Orchestrator::new(config, generator).expect("valid config");

        let outcome = orchestrator
            .run(&CancellationToken::new())
            .await
            .expect("run should succeed");

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.summary.attempted, 4);
        assert_eq!(outcome.summary.failed, 2);
        assert_eq!(outcome.summary.failures[0].repetition, 2);
        assert!(outcome.summary.failures[0].error.contains("exited with status 1"));
        for tally in &outcome.summary.targets {
            assert_eq!((tally.succeeded, tally.failed), (1, 1), "{}", tally.target);
        }
        assert_eq!(outcome.summary.targets.len(), 2);
        let files: Vec<&str> = outcome.records.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(
            files,
            vec![
                "hey_result_green_apis_example_uk_persons_1.txt",
                "hey_result_apis_example_uk_persons_1.txt",
            ]
        );
    }

    #[tokio::test]
    async fn cancelled_token_runs_nothing() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = make_config(dir.path(), 5);
        let orchestrator = Orchestrator::new(config, CannedGenerator::new()).expect("valid config");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = orchestrator.run(&cancel).await.expect("run should succeed");

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.summary.attempted, 0);
        assert!(outcome.summary.cancelled);
        assert!(orchestrator.generator.calls().is_empty());
    }

    #[tokio::test]
    async fn cancellation_interrupts_pause() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = BenchConfig {
            pause_ms: 60_000,
            ..make_config(dir.path(), 3)
        };
        let cancel = CancellationToken::new();
        let orchestrator = Orchestrator::new(config, CannedGenerator::new()).expect("valid config");

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let outcome = tokio::time::timeout(Duration::from_secs(10), orchestrator.run(&cancel))
            .await
            .expect("cancel should cut the pause short")
            .expect("run should succeed");

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(orchestrator.generator.calls().len(), 1);
        assert!(outcome.summary.cancelled);
    }

    #[tokio::test]
    async fn slow_invocation_times_out() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = BenchConfig {
            targets: vec!["http://localhost:9/".to_string()],
            timeout_secs: Some(1),
            ..make_config(dir.path(), 1)
        };
        let orchestrator = Orchestrator::new(config, SlowGenerator).expect("valid config");

        let outcome = orchestrator
            .run(&CancellationToken::new())
            .await
            .expect("run should succeed");

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(outcome.summary.failures[0].error, "Timed out after 1s");
    }

    #[cfg(target_os = "linux")]
    fn process_is_gone(pid: &str) -> bool {
        // A reaped child has no /proc entry; a killed but unreaped one is a zombie.
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .is_some_and(|(_, rest)| rest.trim_start().starts_with('Z')),
            Err(_) => true,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timed_out_child_process_is_killed() {
        use std::os::unix::fs::PermissionsExt;

        use crate::runner::command::HeyCommand;

        let dir = tempfile::tempdir().expect("tempdir should be created");
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).expect("bin dir should be created");
        let script = bin.join("hang.sh");
        std::fs::write(&script, "#!/bin/sh\necho $$ > \"$(dirname \"$0\")/pid\"\nexec sleep 30\n")
            .expect("script should be written");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("script should be executable");

        let config = BenchConfig {
            targets: vec!["http://localhost:9/".to_string()],
            timeout_secs: Some(1),
            ..make_config(dir.path(), 1)
        };
        let hey = HeyCommand::new(script.to_string_lossy());
        let orchestrator = Orchestrator::new(config, hey).expect("valid config");

        let started = std::time::Instant::now();
        let outcome = orchestrator
            .run(&CancellationToken::new())
            .await
            .expect("run should succeed");
        let elapsed = started.elapsed();

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(outcome.summary.failures[0].error, "Timed out after 1s");
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_secs(10), "took {elapsed:?}");

        #[cfg(target_os = "linux")]
        {
            let pid = std::fs::read_to_string(bin.join("pid")).expect("script should record its pid");
            let pid = pid.trim().to_string();
            let mut gone = false;
            for _ in 0..40 {
                if process_is_gone(&pid) {
                    gone = true;
                    break;
                }
                sleep(Duration::from_millis(50)).await;
            }
            assert!(gone, "child {pid} still running after timeout");
        }
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = BenchConfig {
            repeat: 0,
            ..BenchConfig::default()
        };
        let result = Orchestrator::new(config, CannedGenerator::new());
        assert!(matches!(result, Err(HeybenchError::Validation(_))));
    }
}
