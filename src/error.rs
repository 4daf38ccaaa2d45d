//! Error taxonomy for the inference pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by the pipeline stages.
///
/// Everything except a per-image classification failure is terminal for a
/// run and ends up in the `error` field of the failure-shaped report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input table is unreadable or malformed.
    #[error("input error: {0}")]
    Input(String),

    /// Required feature columns are absent from the input table.
    #[error("missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A model artifact is missing, corrupt or incompatible.
    #[error("failed to load {kind} model from {}: {reason}", .path.display())]
    ModelLoad {
        kind: String,
        path: PathBuf,
        reason: String,
    },

    /// A model invocation failed.
    #[error("inference failed in {model}: {reason}")]
    Inference { model: String, reason: String },

    /// An image artifact could not be written.
    #[error("image artifact error at {}: {reason}", .path.display())]
    Artifact { path: PathBuf, reason: String },

    /// The column scaler was asked for a method it does not implement.
    #[error("Unsupported normalization method: {0}")]
    UnsupportedMethod(String),

    /// Configuration could not be built or deserialized.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn input(reason: impl Into<String>) -> Self {
        Self::Input(reason.into())
    }

    pub fn model_load(
        kind: impl Into<String>,
        path: impl Into<PathBuf>,
        reason: impl ToString,
    ) -> Self {
        Self::ModelLoad {
            kind: kind.into(),
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn inference(model: impl Into<String>, reason: impl ToString) -> Self {
        Self::Inference {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    pub fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Artifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable category name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "InputError",
            Self::Schema { .. } => "SchemaError",
            Self::ModelLoad { .. } => "ModelLoadError",
            Self::Inference { .. } => "InferenceError",
            Self::Artifact { .. } => "ArtifactError",
            Self::UnsupportedMethod(_) => "UnsupportedMethodError",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        Self::Input(e.to_string())
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
