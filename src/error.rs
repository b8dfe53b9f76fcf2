use serde::Serialize;
use thiserror::Error;

/// Failures that callers branch on. Anything else travels as `anyhow::Error`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DetectionError {
    /// Unreadable or zero-dimension image, or parameters that cannot be applied.
    #[error("invalid input: {0}")]
    BadInput(String),

    /// A detector could not be initialised.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// A detector call failed after initialisation.
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Serializable tag for [`DetectionError`], used in reports.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    BadInput,
    ModelUnavailable,
    InferenceError,
}

impl DetectionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DetectionError::BadInput(_) => FailureKind::BadInput,
            DetectionError::ModelUnavailable(_) => FailureKind::ModelUnavailable,
            DetectionError::Inference(_) => FailureKind::InferenceError,
        }
    }

    /// Recover the typed error from an `anyhow` chain, treating anything
    /// untyped as an inference failure.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<DetectionError>() {
            Some(typed) => typed.clone(),
            None => DetectionError::Inference(format!("{:#}", err)),
        }
    }
}

pub type DetectionResult<T> = std::result::Result<T, DetectionError>;
