//! Autoencoder reconstruction-error scoring

use crate::error::{PipelineError, Result};
use crate::models::scoring::ScoringModel;
use crate::types::record::{NormalizedTable, FEATURE_COUNT};
use crate::types::report::AnomalyResult;
use ndarray::{s, Array2, Ix2};
use tracing::{info, warn};

/// Mean squared error of each row against its reconstruction.
pub fn reconstruction_errors(input: &Array2<f32>, reconstruction: &Array2<f32>) -> Vec<f32> {
    input
        .rows()
        .into_iter()
        .zip(reconstruction.rows())
        .map(|(original, rebuilt)| {
            let width = original.len().max(1) as f32;
            original
                .iter()
                .zip(rebuilt.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f32>()
                / width
        })
        .collect()
}

/// Scores normalized rows with the autoencoder, one batch at a time.
///
/// Batching bounds memory only; a row's error does not depend on which
/// batch it lands in.
pub struct AnomalyScorer {
    threshold: f64,
    batch_size: usize,
}

impl AnomalyScorer {
    pub fn new(threshold: f64, batch_size: usize) -> Self {
        Self {
            threshold,
            batch_size: batch_size.max(1),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Reconstruction error and anomaly flag for every row, index aligned.
    pub fn score(
        &self,
        model: &mut dyn ScoringModel,
        rows: &NormalizedTable,
    ) -> Result<AnomalyResult> {
        let total = rows.len();
        let batch_count = total.div_ceil(self.batch_size);
        let mut errors = Vec::with_capacity(total);

        for (batch_idx, chunk) in rows.rows().chunks(self.batch_size).enumerate() {
            info!(
                batch = batch_idx + 1,
                batches = batch_count,
                "Autoencoder inference"
            );

            let batch = Array2::from_shape_fn((chunk.len(), FEATURE_COUNT), |(i, j)| {
                chunk[i][j] as f32
            });
            let reconstruction = self.reconstruct(model, &batch)?;
            errors.extend(reconstruction_errors(&batch, &reconstruction));
        }

        let result = AnomalyResult::from_errors(errors, self.threshold);
        info!(
            rows = result.len(),
            anomalies = result.anomaly_count(),
            threshold = self.threshold,
            "Anomalies flagged"
        );
        Ok(result)
    }

    /// Reconstruct a batch with one call, falling back to one call per row.
    ///
    /// Some exported graphs have a fixed batch dimension of 1 and reject
    /// larger inputs; the per-row path serves those.
    fn reconstruct(&self, model: &mut dyn ScoringModel, batch: &Array2<f32>) -> Result<Array2<f32>> {
        let direct = model
            .run(batch.view().into_dyn())
            .and_then(|out| {
                out.into_dimensionality::<Ix2>()
                    .map_err(|e| PipelineError::inference("autoencoder", e))
            })
            .and_then(|out| {
                if out.dim() == batch.dim() {
                    Ok(out)
                } else {
                    Err(PipelineError::inference(
                        "autoencoder",
                        format!("reconstruction shape {:?}, expected {:?}", out.dim(), batch.dim()),
                    ))
                }
            });

        match direct {
            Ok(out) => Ok(out),
            Err(e) => {
                warn!(error = %e, "Direct model call failed, scoring row by row");
                self.reconstruct_rows(model, batch)
            }
        }
    }

    fn reconstruct_rows(
        &self,
        model: &mut dyn ScoringModel,
        batch: &Array2<f32>,
    ) -> Result<Array2<f32>> {
        let mut out = Array2::<f32>::zeros(batch.dim());

        for i in 0..batch.nrows() {
            let row = batch.slice(s![i..i + 1, ..]);
            let rebuilt = model.run(row.into_dyn())?;
            if rebuilt.len() != FEATURE_COUNT {
                return Err(PipelineError::inference(
                    "autoencoder",
                    format!("row reconstruction has {} values", rebuilt.len()),
                ));
            }
            for (dst, src) in out.row_mut(i).iter_mut().zip(rebuilt.iter()) {
                *dst = *src;
            }
        }

        Ok(out)
    }
}
