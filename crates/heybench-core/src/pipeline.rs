//! End-to-end phases: benchmark → dataset, then dataset → charts.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::config::BenchConfig;
use crate::error::HeybenchError;
use crate::results::chart::render_line_chart;
use crate::results::dataset::{read_dataset, write_dataset};
use crate::results::{write_summary, Metric};
use crate::runner::{LoadGenerator, Orchestrator, RunOutcome};

/// Run every repetition, then persist the dataset and the run summary.
pub async fn run_benchmarks<G: LoadGenerator>(
    config: &BenchConfig,
    generator: G,
    cancel: &CancellationToken,
) -> Result<RunOutcome, HeybenchError> {
    let orchestrator = Orchestrator::new(config.clone(), generator)?;
    let outcome = orchestrator.run(cancel).await?;

    write_dataset(&outcome.records, &config.dataset_path).await?;
    let summary_path = config.summary_path();
    write_summary(&outcome.summary, &summary_path).await?;
    tracing::info!("Run summary written to {}", summary_path.display());

    Ok(outcome)
}

/// Reload the dataset and render one chart per [`Metric`] into `chart_dir`.
/// A dataset that cannot be read aborts before any chart is written.
pub async fn render_reports(config: &BenchConfig) -> Result<Vec<PathBuf>, HeybenchError> {
    let rows = read_dataset(&config.dataset_path, &config.identity).await?;
    tokio::fs::create_dir_all(&config.chart_dir).await?;

    let mut written = Vec::with_capacity(Metric::ALL.len());
    for metric in Metric::ALL {
        let path = config.chart_dir.join(metric.file_name());
        render_line_chart(&rows, metric, metric.title(), config.repeat, &path).await?;
        written.push(path);
    }
    Ok(written)
}
