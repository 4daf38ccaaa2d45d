//! Configuration management for the inference pipeline

use crate::error::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the optional configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/inference.toml";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub input: InputConfig,
    pub models: ModelsConfig,
    pub detection: DetectionConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// Input table configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    /// CSV with the aggregated flow statistics
    pub csv_path: PathBuf,
}

/// Model artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsConfig {
    /// Autoencoder ONNX graph, (N,6) -> (N,6)
    pub autoencoder_path: PathBuf,
    /// CNN ONNX graph, (N,3,64,64) -> (N,4)
    pub cnn_path: PathBuf,
    /// Number of intra-op threads per ONNX session
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionConfig {
    /// Reconstruction error above which a row is flagged
    pub threshold: f64,
}

/// Batching and artifact locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Rows per autoencoder call
    pub autoencoder_batch_size: usize,
    /// Rows per image synthesis progress batch
    pub image_batch_size: usize,
    /// Images per CNN call
    pub cnn_batch_size: usize,
    /// Directory holding the synthesized rasters
    pub image_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file location
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path.
    ///
    /// Layers, lowest precedence first: built-in defaults, the TOML file (if
    /// present), `IOT_*` environment variables with `__` as the section
    /// separator.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::default())?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("IOT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the batching loops meaningless.
    pub fn validate(&self) -> Result<()> {
        let batches = [
            ("autoencoder_batch_size", self.pipeline.autoencoder_batch_size),
            ("image_batch_size", self.pipeline.image_batch_size),
            ("cnn_batch_size", self.pipeline.cnn_batch_size),
        ];
        for (name, value) in batches {
            if value == 0 {
                return Err(crate::error::PipelineError::Config(format!(
                    "{name} must be at least 1"
                )));
            }
        }
        if !self.detection.threshold.is_finite() {
            return Err(crate::error::PipelineError::Config(
                "threshold must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: InputConfig {
                csv_path: PathBuf::from("final_aggregated.csv"),
            },
            models: ModelsConfig {
                autoencoder_path: PathBuf::from("models/autoencoder_model.onnx"),
                cnn_path: PathBuf::from("models/cnn_model_balanced_50k.onnx"),
                onnx_threads: default_onnx_threads(),
            },
            detection: DetectionConfig { threshold: 0.05 },
            pipeline: PipelineConfig {
                autoencoder_batch_size: 1000,
                image_batch_size: 200,
                cnn_batch_size: 20,
                image_dir: PathBuf::from("images"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
