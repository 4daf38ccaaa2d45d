//! Type definitions for the inference pipeline

pub mod record;
pub mod report;

pub use record::{FeatureRow, NormalizedTable, FEATURE_COUNT, REQUIRED_COLUMNS};
pub use report::{AnomalyResult, ClassificationResult, PipelineReport};
