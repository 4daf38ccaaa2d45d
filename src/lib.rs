//! IoT Botnet Inference Library
//!
//! Two-stage detection over aggregated flow statistics: an autoencoder
//! scores per-row reconstruction error, and a CNN classifies small rasters
//! synthesized from the same normalized rows.

pub mod config;
pub mod emitter;
pub mod error;
pub mod imaging;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod reader;
pub mod transform;
pub mod types;

pub use config::AppConfig;
pub use emitter::ReportEmitter;
pub use error::{PipelineError, Result};
pub use imaging::ImageSynthesizer;
pub use models::{AnomalyScorer, ImageClassifier, ModelLoader, ModelProvider, ScoringModel};
pub use normalizer::FeatureNormalizer;
pub use pipeline::Pipeline;
pub use reader::FlowReader;
pub use transform::{ColumnScaler, ScalingMethod};
pub use types::{ClassificationResult, PipelineReport};
