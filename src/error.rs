//! Error types for the orthoscan library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum OrthoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Input format error: {0}")]
    InputFormat(String),

    #[error("Invalid count value '{value}' at row {row}, column {col}")]
    InvalidCount {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown organism '{0}'")]
    UnknownOrganism(String),

    #[error("Unreadable result file {path}: {reason}")]
    UnreadableResult { path: String, reason: String },

    #[error("Annotation service error: {0}")]
    Service(String),

    #[error("HTTP error: {0}")]
    Http(#[from] Box<ureq::Error>),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OrthoError {
    /// True for errors caused by malformed input data rather than bad parameters.
    pub fn is_input_format(&self) -> bool {
        matches!(self, Self::InputFormat(_) | Self::InvalidCount { .. })
    }

    /// True for errors caused by out-of-range or inconsistent parameters.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::UnknownOrganism(_))
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, OrthoError>;
