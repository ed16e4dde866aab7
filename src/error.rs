use thiserror::Error;

/// Activity pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No rows survived sensor alignment and warm-up discard")]
    EmptyMerge,

    #[error("Series of {rows} rows is shorter than one window of {window_size}")]
    InsufficientData { rows: usize, window_size: usize },

    #[error("No windows supplied to feature extraction")]
    EmptyWindowBatch,

    #[error("{source_name} is missing expected columns: {}", missing.join(", "))]
    SchemaMismatch {
        source_name: String,
        missing: Vec<String>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid feature width: expected {expected}, got {actual}")]
    FeatureWidthMismatch { expected: usize, actual: usize },

    #[error("{labels} labels supplied for {rows} rows")]
    LabelMismatch { rows: usize, labels: usize },

    #[error("Feature row {row} contains a non-finite value")]
    NonFiniteFeatures { row: usize },

    #[error("Classifier has no training data")]
    UntrainedModel,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
