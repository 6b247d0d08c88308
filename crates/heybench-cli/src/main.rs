use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use heybench_core::config::{read_config, write_config, BenchConfig};
use heybench_core::extractors::ReportParser;
use heybench_core::pipeline::{render_reports, run_benchmarks};
use heybench_core::runner::HeyCommand;

#[derive(Parser)]
#[command(name = "heybench", version, about = "Repeated hey load tests with CSV and chart reports")]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark every target, write the dataset, then render charts
    Run {
        /// JSON config file; built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the number of repetitions per target
        #[arg(short, long)]
        repeat: Option<u32>,

        /// Stop after writing the dataset
        #[arg(long)]
        no_charts: bool,
    },

    /// Render charts from an existing dataset
    Report {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dataset to read instead of the configured one
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Repetitions per target the dataset was produced with
        #[arg(short, long)]
        repeat: Option<u32>,
    },

    /// Write the default config as JSON to start from
    Init {
        #[arg(default_value = "heybench.json")]
        path: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Parse one saved hey report and print its fields as JSON
    Parse {
        report: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            repeat,
            no_charts,
        } => {
            let mut config = load_config(config.as_deref()).await?;
            if let Some(repeat) = repeat {
                config.repeat = repeat;
            }
            run(&config, no_charts).await
        }
        Commands::Report {
            config,
            dataset,
            repeat,
        } => {
            let mut config = load_config(config.as_deref()).await?;
            if let Some(dataset) = dataset {
                config.dataset_path = dataset;
            }
            if let Some(repeat) = repeat {
                config.repeat = repeat;
            }
            render_reports(&config)
                .await
                .with_context(|| format!("failed to render charts from {}", config.dataset_path.display()))?;
            Ok(())
        }
        Commands::Parse { report } => parse(&report).await,
        Commands::Init { path, force } => init(&path, force).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn load_config(path: Option<&Path>) -> Result<BenchConfig> {
    match path {
        Some(path) => read_config(path)
            .await
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(BenchConfig::default()),
    }
}

async fn run(config: &BenchConfig, no_charts: bool) -> Result<()> {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping after the current repetition");
            trigger.cancel();
        }
    });

    let generator = HeyCommand::new(config.program.clone());
    let outcome = run_benchmarks(config, generator, &cancel)
        .await
        .context("benchmark run failed")?;

    let summary = &outcome.summary;
    if summary.failed > 0 {
        tracing::warn!(
            "{} of {} repetitions failed; see {}",
            summary.failed,
            summary.attempted,
            config.summary_path().display()
        );
    }

    if no_charts {
        return Ok(());
    }
    render_reports(config)
        .await
        .context("failed to render charts")?;
    Ok(())
}

async fn init(path: &Path, force: bool) -> Result<()> {
    if !force && tokio::fs::try_exists(path).await.unwrap_or(false) {
        bail!("{} already exists; pass --force to replace it", path.display());
    }
    write_config(&BenchConfig::default(), path)
        .await
        .with_context(|| format!("failed to write config {}", path.display()))?;
    tracing::info!("Default config written to {}", path.display());
    Ok(())
}

async fn parse(report: &Path) -> Result<()> {
    let parser = ReportParser::new()?;
    let record = parser.parse_file(report).await;
    if record.is_empty() {
        tracing::warn!("No metrics found in {}", report.display());
    }
    println!("{}", serde_json::to_string_pretty(&record.to_map())?);
    Ok(())
}
