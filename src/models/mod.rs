//! ML model inference components

pub mod aggregator;
pub mod autoencoder;
pub mod classifier;
pub mod loader;
pub mod scoring;

pub use aggregator::ResultAggregator;
pub use autoencoder::AnomalyScorer;
pub use classifier::{ClassifyStats, ImageClassifier};
pub use loader::{ModelLoader, ModelProvider};
pub use scoring::{OnnxModel, ScoringModel};
