//! Result aggregation across the two models

use crate::models::classifier::NUM_CLASSES;
use crate::types::report::{AnomalyResult, ClassificationResult, PipelineReport};

/// Merges the per-row anomaly results and per-image class predictions into
/// the final report, and derives the summaries logged at the end of a run.
pub struct ResultAggregator {
    threshold: f64,
}

impl ResultAggregator {
    /// Create an aggregator for a run scored against `threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Assemble the success-shaped report.
    ///
    /// `total_rows` is the number of scored rows, so it always equals the
    /// length of `reconstruction_errors`.
    pub fn assemble(
        &self,
        anomalies: AnomalyResult,
        predictions: ClassificationResult,
    ) -> PipelineReport {
        PipelineReport {
            error: None,
            total_rows: anomalies.len(),
            anomalies_flagged: anomalies.anomaly_count(),
            autoencoder_threshold: self.threshold,
            reconstruction_errors: anomalies.errors,
            cnn_predictions: predictions,
        }
    }

    /// Number of predictions per class id. Ids outside the known classes
    /// are not counted.
    pub fn class_distribution(predictions: &ClassificationResult) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for (_, class_id) in predictions.iter() {
            if let Some(slot) = counts.get_mut(usize::from(class_id)) {
                *slot += 1;
            }
        }
        counts
    }

    /// Most frequent class and its share of all predictions.
    ///
    /// Ties go to the lower class id. `None` when nothing was classified.
    pub fn dominant_class(predictions: &ClassificationResult) -> Option<(u8, f64)> {
        let counts = Self::class_distribution(predictions);
        let total: usize = counts.iter().sum();
        if total == 0 {
            return None;
        }

        let (class_id, &count) = counts
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|&(_, count)| *count)?;

        Some((class_id as u8, count as f64 / total as f64))
    }

    /// Fraction of rows flagged anomalous.
    pub fn anomaly_rate(report: &PipelineReport) -> f64 {
        if report.total_rows == 0 {
            return 0.0;
        }
        report.anomalies_flagged as f64 / report.total_rows as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predictions(classes: &[u8]) -> ClassificationResult {
        classes
            .iter()
            .enumerate()
            .map(|(idx, &class)| (format!("img_{idx}.png"), class))
            .collect()
    }

    #[test]
    fn test_assemble_report() {
        let aggregator = ResultAggregator::new(0.05);
        let anomalies = AnomalyResult::from_errors(vec![0.2, 0.01, 0.0], 0.05);

        let report = aggregator.assemble(anomalies, predictions(&[1, 1, 2]));

        assert!(report.is_success());
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.anomalies_flagged, 1);
        assert_eq!(report.autoencoder_threshold, 0.05);
        assert_eq!(report.reconstruction_errors, vec![0.2, 0.01, 0.0]);
        assert_eq!(report.cnn_predictions.get("img_2.png"), Some(2));
    }

    #[test]
    fn test_class_distribution() {
        let preds = predictions(&[0, 3, 3, 1, 3]);
        assert_eq!(ResultAggregator::class_distribution(&preds), [1, 1, 0, 3]);
    }

    #[test]
    fn test_unknown_class_not_counted() {
        let preds = predictions(&[0, 7]);
        assert_eq!(ResultAggregator::class_distribution(&preds), [1, 0, 0, 0]);
    }

    #[test]
    fn test_dominant_class() {
        let (class_id, share) = ResultAggregator::dominant_class(&predictions(&[2, 2, 1, 2])).unwrap();
        assert_eq!(class_id, 2);
        assert!((share - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_dominant_class_tie_prefers_lower_id() {
        let (class_id, share) = ResultAggregator::dominant_class(&predictions(&[3, 1])).unwrap();
        assert_eq!(class_id, 1);
        assert!((share - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_predictions() {
        let preds = ClassificationResult::new();
        assert_eq!(ResultAggregator::dominant_class(&preds), None);
        assert_eq!(ResultAggregator::class_distribution(&preds), [0; NUM_CLASSES]);
    }

    #[test]
    fn test_anomaly_rate() {
        let aggregator = ResultAggregator::new(0.05);
        let report = aggregator.assemble(
            AnomalyResult::from_errors(vec![0.5, 0.0, 0.9, 0.0], 0.05),
            ClassificationResult::new(),
        );
        assert!((ResultAggregator::anomaly_rate(&report) - 0.5).abs() < 1e-9);

        let failed = PipelineReport::failure_message("boom", 0.05);
        assert_eq!(ResultAggregator::anomaly_rate(&failed), 0.0);
    }
}
