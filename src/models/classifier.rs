//! CNN classification over the synthesized image artifacts

use crate::error::{PipelineError, Result};
use crate::imaging::artifact_order;
use crate::models::scoring::ScoringModel;
use crate::types::report::ClassificationResult;
use image::imageops::{self, FilterType};
use ndarray::{stack, Array3, ArrayView1, ArrayView3, Axis, Ix2};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Side length the classifier expects
pub const IMAGE_SIZE: u32 = 64;
/// Color channels per image
pub const CHANNELS: usize = 3;
/// Number of traffic classes the classifier was trained on
pub const NUM_CLASSES: usize = 4;

/// List the `.png` files in `dir`, ordered by row index.
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| PipelineError::artifact(dir, format!("cannot list directory: {e}")))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::artifact(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".png") && entry.path().is_file() {
            names.push(name);
        }
    }

    names.sort_by(|a, b| artifact_order(a, b));
    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}

/// Decode an image into a `(3, 64, 64)` tensor with values in [0, 1].
///
/// Any decodable image is accepted; it is converted to RGB and resized
/// bilinearly.
pub fn load_tensor(path: &Path) -> Result<Array3<f32>> {
    let rgb = image::open(path)
        .map_err(|e| PipelineError::artifact(path, e))?
        .to_rgb8();
    let resized = imageops::resize(&rgb, IMAGE_SIZE, IMAGE_SIZE, FilterType::Triangle);
    let side = IMAGE_SIZE as usize;

    Ok(Array3::from_shape_fn((CHANNELS, side, side), |(c, y, x)| {
        f32::from(resized.get_pixel(x as u32, y as u32)[c]) / 255.0
    }))
}

/// Index of the largest logit. Ties go to the first; a NaN beats everything.
pub fn argmax(logits: ArrayView1<'_, f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in logits.iter().enumerate() {
        if value.is_nan() {
            return Some(idx);
        }
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Counts from one classification pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyStats {
    pub classified: usize,
    pub failed: usize,
}

/// Runs the CNN over every image in a directory.
pub struct ImageClassifier {
    batch_size: usize,
}

impl ImageClassifier {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Predict a class for each image in `image_dir`.
    ///
    /// An image that cannot be decoded or scored is logged and left out of
    /// the result; the pass itself only fails if the directory is unreadable.
    pub fn classify_all(
        &self,
        model: &mut dyn ScoringModel,
        image_dir: &Path,
    ) -> Result<(ClassificationResult, ClassifyStats)> {
        let paths = discover_images(image_dir)?;
        let total = paths.len();
        let batch_count = total.div_ceil(self.batch_size);
        info!(images = total, "Running CNN inference");

        let mut predictions = ClassificationResult::new();
        let mut stats = ClassifyStats::default();

        for (batch_idx, chunk) in paths.chunks(self.batch_size).enumerate() {
            info!(
                batch = batch_idx + 1,
                batches = batch_count,
                "Processing CNN batch"
            );

            let mut names = Vec::with_capacity(chunk.len());
            let mut tensors = Vec::with_capacity(chunk.len());
            for path in chunk {
                match load_tensor(path) {
                    Ok(tensor) => {
                        names.push(file_name(path));
                        tensors.push(tensor);
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Error processing image");
                        stats.failed += 1;
                    }
                }
            }

            if tensors.is_empty() {
                continue;
            }

            match self.predict_batch(model, &tensors) {
                Ok(classes) => {
                    for (name, class_id) in names.into_iter().zip(classes) {
                        predictions.insert(name, class_id);
                        stats.classified += 1;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Batched CNN call failed, classifying images one by one");
                    for (name, tensor) in names.into_iter().zip(&tensors) {
                        match self.predict_batch(model, std::slice::from_ref(tensor)) {
                            Ok(classes) if classes.len() == 1 => {
                                predictions.insert(name, classes[0]);
                                stats.classified += 1;
                            }
                            Ok(_) => {
                                warn!(image = %name, "CNN returned no prediction");
                                stats.failed += 1;
                            }
                            Err(e) => {
                                warn!(image = %name, error = %e, "Error processing image");
                                stats.failed += 1;
                            }
                        }
                    }
                }
            }
        }

        info!(
            classified = stats.classified,
            failed = stats.failed,
            "CNN inference complete"
        );
        Ok((predictions, stats))
    }

    fn predict_batch(&self, model: &mut dyn ScoringModel, tensors: &[Array3<f32>]) -> Result<Vec<u8>> {
        let views: Vec<ArrayView3<'_, f32>> = tensors.iter().map(|t| t.view()).collect();
        let batch = stack(Axis(0), &views).map_err(|e| PipelineError::inference("cnn", e))?;

        let logits = model
            .run(batch.view().into_dyn())?
            .into_dimensionality::<Ix2>()
            .map_err(|e| PipelineError::inference("cnn", e))?;

        if logits.nrows() != tensors.len() {
            return Err(PipelineError::inference(
                "cnn",
                format!("{} logit rows for {} images", logits.nrows(), tensors.len()),
            ));
        }
        if logits.ncols() != NUM_CLASSES {
            return Err(PipelineError::inference(
                "cnn",
                format!("expected {NUM_CLASSES} logits per image, got {}", logits.ncols()),
            ));
        }

        logits
            .rows()
            .into_iter()
            .map(|row| {
                let idx = argmax(row)
                    .ok_or_else(|| PipelineError::inference("cnn", "empty logit row"))?;
                u8::try_from(idx)
                    .map_err(|_| PipelineError::inference("cnn", format!("class index {idx}")))
            })
            .collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
