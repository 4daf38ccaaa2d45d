//! ONNX model loader and the two model adapters

use crate::error::{PipelineError, Result};
use crate::models::scoring::{OnnxModel, ScoringModel};
use crate::types::record::FEATURE_COUNT;
use ndarray::{ArrayD, ArrayViewD};
use ort::environment::Environment;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

/// Process-wide ONNX Runtime environment (ort allows only one per process).
fn ort_environment() -> std::result::Result<&'static Environment, ort::Error> {
    static ENV: OnceLock<Environment> = OnceLock::new();
    if let Some(env) = ENV.get() {
        return Ok(env);
    }
    let env = ort::init().build()?;
    Ok(ENV.get_or_init(|| env))
}

/// Produces the two models a run needs.
///
/// The pipeline only talks to this trait, so tests can hand it stub models
/// instead of ONNX graphs.
pub trait ModelProvider {
    fn autoencoder(&self, path: &Path) -> Result<Box<dyn ScoringModel>>;
    fn classifier(&self, path: &Path) -> Result<Box<dyn ScoringModel>>;
}

/// Autoencoder adapter: `(N,6)` features in, `(N,6)` reconstruction out
pub struct AutoencoderModel {
    inner: OnnxModel,
}

impl ScoringModel for AutoencoderModel {
    fn run(&mut self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        if input.ndim() != 2 || input.shape()[1] != FEATURE_COUNT {
            return Err(PipelineError::inference(
                &self.inner.name,
                format!("expected (N,{FEATURE_COUNT}) input, got {:?}", input.shape()),
            ));
        }
        let output = self.inner.run(input.view())?;
        if output.shape() != input.shape() {
            return Err(PipelineError::inference(
                &self.inner.name,
                format!(
                    "reconstruction shape {:?} does not match input {:?}",
                    output.shape(),
                    input.shape()
                ),
            ));
        }
        Ok(output)
    }
}

/// Classifier adapter: `(N,3,64,64)` images in, `(N,classes)` logits out
pub struct ClassifierModel {
    inner: OnnxModel,
}

impl ScoringModel for ClassifierModel {
    fn run(&mut self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        if input.ndim() != 4 {
            return Err(PipelineError::inference(
                &self.inner.name,
                format!("expected (N,C,H,W) input, got {:?}", input.shape()),
            ));
        }
        let batch = input.shape()[0];
        let output = self.inner.run(input.view())?;
        if output.ndim() != 2 || output.shape()[0] != batch {
            return Err(PipelineError::inference(
                &self.inner.name,
                format!("expected ({batch},classes) logits, got {:?}", output.shape()),
            ));
        }
        Ok(output)
    }
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a single ONNX model from file
    pub fn load_model(&self, path: &Path, kind: &str) -> Result<OnnxModel> {
        info!(model = %kind, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        if !path.is_file() {
            return Err(PipelineError::model_load(kind, path, "file not found"));
        }

        let env = ort_environment().map_err(|e| PipelineError::model_load(kind, path, e))?;
        let session = Session::builder(env)
            .map_err(|e| PipelineError::model_load(kind, path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| PipelineError::model_load(kind, path, e))?
            .with_intra_threads(self.onnx_threads)
            .map_err(|e| PipelineError::model_load(kind, path, e))?
            .commit_from_file(path)
            .map_err(|e| PipelineError::model_load(kind, path, e))?;

        let model = OnnxModel::from_session(kind, session);

        info!(
            model = %kind,
            input = %model.input_name(),
            output = %model.output_name(),
            "Model loaded successfully"
        );

        Ok(model)
    }

    pub fn load_autoencoder(&self, path: &Path) -> Result<AutoencoderModel> {
        Ok(AutoencoderModel {
            inner: self.load_model(path, "autoencoder")?,
        })
    }

    pub fn load_classifier(&self, path: &Path) -> Result<ClassifierModel> {
        Ok(ClassifierModel {
            inner: self.load_model(path, "cnn")?,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelProvider for ModelLoader {
    fn autoencoder(&self, path: &Path) -> Result<Box<dyn ScoringModel>> {
        Ok(Box::new(self.load_autoencoder(path)?))
    }

    fn classifier(&self, path: &Path) -> Result<Box<dyn ScoringModel>> {
        Ok(Box::new(self.load_classifier(path)?))
    }
}
