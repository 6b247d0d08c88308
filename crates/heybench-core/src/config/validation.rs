use std::path::{Component, Path, PathBuf};

use crate::config::model::BenchConfig;
use crate::error::HeybenchError;

/// Validate a [`BenchConfig`] and return every problem found.
///
/// An empty `Vec` means the config is usable.
pub fn validate_config(config: &BenchConfig) -> Vec<HeybenchError> {
    let mut errors = Vec::new();

    if config.targets.is_empty() {
        errors.push(HeybenchError::Validation(
            "At least one target is required".to_string(),
        ));
    }

    for target in &config.targets {
        let url = target.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(HeybenchError::Validation(format!(
                "Target must start with http:// or https:// (got: {target})"
            )));
        }
    }

    if config.repeat == 0 {
        errors.push(HeybenchError::Validation(
            "repeat must be at least 1".to_string(),
        ));
    }

    if config.concurrency == 0 {
        errors.push(HeybenchError::Validation(
            "concurrency must be at least 1".to_string(),
        ));
    }

    // hey refuses to run with fewer requests than workers.
    if config.requests < config.concurrency {
        errors.push(HeybenchError::Validation(format!(
            "requests ({}) must not be lower than concurrency ({})",
            config.requests, config.concurrency
        )));
    }

    if config.program.trim().is_empty() {
        errors.push(HeybenchError::Validation(
            "program must not be empty".to_string(),
        ));
    }

    if config.timeout_secs == Some(0) {
        errors.push(HeybenchError::Validation(
            "timeout_secs must be at least 1 when set".to_string(),
        ));
    }

    validate_output_dir(config, &mut errors);

    errors
}

/// `output_dir` is wiped before every run, so it must name a dedicated
/// directory that holds none of the other artifacts.
fn validate_output_dir(config: &BenchConfig, errors: &mut Vec<HeybenchError>) {
    let output_dir = lexical(&config.output_dir);
    if !output_dir
        .components()
        .any(|c| matches!(c, Component::Normal(_)))
    {
        errors.push(HeybenchError::Validation(format!(
            "output_dir must name a dedicated directory (got: {:?})",
            config.output_dir
        )));
        return;
    }

    if lexical(&config.chart_dir).starts_with(&output_dir) {
        errors.push(HeybenchError::Validation(format!(
            "chart_dir ({}) must not be inside output_dir ({})",
            config.chart_dir.display(),
            config.output_dir.display()
        )));
    }

    let dataset_dir = config.dataset_path.parent().unwrap_or(Path::new(""));
    if lexical(dataset_dir).starts_with(&output_dir) {
        errors.push(HeybenchError::Validation(format!(
            "dataset_path ({}) must not be inside output_dir ({})",
            config.dataset_path.display(),
            config.output_dir.display()
        )));
    }
}

/// `path` with `.` components dropped; no filesystem access.
fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Fail with a single [`HeybenchError::Validation`] listing every problem.
pub fn ensure_valid(config: &BenchConfig) -> Result<(), HeybenchError> {
    let errors = validate_config(config);
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors
        .into_iter()
        .map(|e| match e {
            HeybenchError::Validation(msg) => msg,
            other => other.to_string(),
        })
        .collect();
    Err(HeybenchError::Validation(messages.join("; ")))
}
