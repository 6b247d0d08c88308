#[derive(Debug, thiserror::Error)]
pub enum HeybenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
}
