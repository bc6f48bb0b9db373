//! Error handling
//!
//! Three failure classes, each with a different blast radius:
//! - `SchemaError`     - bad request input, aborts one request
//! - `ModelLoadError`  - artifact unusable, aborts startup (no retry, no fallback)
//! - `PredictionError` - backend failed on one row, aborts one request

use std::path::PathBuf;

use thiserror::Error;

pub type ClvResult<T> = Result<T, ClvError>;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be {expected}, got {found}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("unknown customer segment id {0} (expected 0-3)")]
    UnknownSegment(i64),

    #[error("feature record must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("invalid JSON input: {0}")]
    InvalidJson(String),
}

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),

    #[error("corrupt model artifact: {0}")]
    Corrupt(String),

    #[error("model backend error: {0}")]
    Backend(String),

    #[error("model schema mismatch: {0}")]
    SchemaMismatch(String),
}

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("prediction backend failed: {0}")]
    Backend(String),

    #[error("predictor returned {actual} values for {expected} rows")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("feature table shape error: {0}")]
    Shape(String),

    #[error("non-finite prediction ({stage}): {value}")]
    NonFinite { stage: &'static str, value: f64 },
}

#[derive(Debug, Error)]
pub enum ClvError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl ClvError {
    /// Short category used in user-facing messages
    pub fn kind(&self) -> &'static str {
        match self {
            ClvError::Schema(_) => "SchemaError",
            ClvError::ModelLoad(_) => "ModelLoadError",
            ClvError::Prediction(_) => "PredictionError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_field() {
        let err = SchemaError::MissingField("Recency");
        assert_eq!(err.to_string(), "missing required field `Recency`");

        let err = SchemaError::WrongType {
            field: "Quantity",
            expected: "a non-negative integer",
            found: "\"ten\"".to_string(),
        };
        assert!(err.to_string().contains("Quantity"));
    }

    #[test]
    fn test_kind_from_conversion() {
        let err: ClvError = PredictionError::RowCountMismatch { expected: 1, actual: 0 }.into();
        assert_eq!(err.kind(), "PredictionError");

        let err: ClvError = ModelLoadError::NotFound(PathBuf::from("x.json")).into();
        assert_eq!(err.kind(), "ModelLoadError");
        assert_eq!(err.to_string(), "model not found: x.json");
    }
}
