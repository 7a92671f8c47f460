use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriangleError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    ShapeMismatch { column: String, expected: usize, actual: usize },

    #[error("Column '{column}' not found")]
    MissingColumn { column: String },

    #[error("Stage '{stage}' is not ready: {missing} missing")]
    StageNotReady { stage: String, missing: String },

    #[error("Sheet '{sheet}' malformed: {reason}")]
    SheetFormat { sheet: String, reason: String },

    #[error("Language model response unusable: {reason}")]
    LlmResponse { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TriangleResult<T> = Result<T, TriangleError>;
