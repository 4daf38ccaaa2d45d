//! The batch-in, batch-out contract shared by both models

use crate::error::{PipelineError, Result};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use ort::session::Session;
use ort::value::Tensor;
use tracing::debug;

/// A pretrained model used as an opaque scoring function.
///
/// The first axis of `input` is the batch axis. Implementations must return
/// one output row per input row.
pub trait ScoringModel {
    fn run(&mut self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>>;
}

impl<M: ScoringModel + ?Sized> ScoringModel for Box<M> {
    fn run(&mut self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        (**self).run(input)
    }
}

/// ONNX Runtime session with its resolved input and output names
pub struct OnnxModel {
    /// Model name used in logs and errors
    pub name: String,
    session: Session,
    input_name: String,
    output_name: String,
}

impl OnnxModel {
    /// Wrap a committed session, resolving the tensor names to use.
    pub fn from_session(name: &str, session: Session) -> Self {
        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "input".to_string());

        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .unwrap_or_else(|| "output".to_string());

        Self {
            name: name.to_string(),
            session,
            input_name,
            output_name,
        }
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

impl ScoringModel for OnnxModel {
    fn run(&mut self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let data: Vec<f32> = input.iter().copied().collect();

        let input_tensor = Tensor::from_array((shape, data))
            .map_err(|e| PipelineError::inference(&self.name, format!("input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(|e| PipelineError::inference(&self.name, e))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            PipelineError::inference(&self.name, format!("missing output {}", self.output_name))
        })?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::inference(&self.name, format!("output tensor: {e}")))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        debug!(model = %self.name, output_shape = ?dims, "ONNX call complete");

        ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())
            .map_err(|e| PipelineError::inference(&self.name, format!("output shape: {e}")))
    }
}
