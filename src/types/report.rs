//! Stage results and the JSON report handed back to the caller

use crate::error::PipelineError;
use crate::imaging::artifact_order;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-row autoencoder output.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyResult {
    /// Reconstruction error per row, always finite and non-negative
    pub errors: Vec<f32>,
    /// `errors[i] > threshold`
    pub flags: Vec<bool>,
    /// Threshold the flags were computed against
    pub threshold: f64,
}

impl AnomalyResult {
    /// Build the result from raw errors.
    ///
    /// Non-finite errors become 0.0 before flagging, so the emitted errors and
    /// the anomaly count always agree.
    pub fn from_errors(errors: Vec<f32>, threshold: f64) -> Self {
        let errors: Vec<f32> = errors
            .into_iter()
            .map(|e| if e.is_finite() { e.max(0.0) } else { 0.0 })
            .collect();
        let flags = errors.iter().map(|&e| f64::from(e) > threshold).collect();

        Self {
            errors,
            flags,
            threshold,
        }
    }

    pub fn anomaly_count(&self) -> usize {
        self.flags.iter().filter(|&&flag| flag).count()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Image filename to predicted class id.
///
/// Entries are kept in ascending row index order (`img_2.png` before
/// `img_10.png`) and serialize as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationResult {
    entries: Vec<(String, u8)>,
}

impl ClassificationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the prediction for `name`.
    pub fn insert(&mut self, name: impl Into<String>, class_id: u8) {
        let name = name.into();
        match self
            .entries
            .binary_search_by(|(existing, _)| artifact_order(existing, &name))
        {
            Ok(pos) => self.entries[pos].1 = class_id,
            Err(pos) => self.entries.insert(pos, (name, class_id)),
        }
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.entries
            .binary_search_by(|(existing, _)| artifact_order(existing, name))
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.entries.iter().map(|(name, class)| (name.as_str(), *class))
    }

    /// Filenames in row index order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl FromIterator<(String, u8)> for ClassificationResult {
    fn from_iter<I: IntoIterator<Item = (String, u8)>>(iter: I) -> Self {
        let mut result = Self::new();
        for (name, class_id) in iter {
            result.insert(name, class_id);
        }
        result
    }
}

impl Serialize for ClassificationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, class_id) in &self.entries {
            map.serialize_entry(name, class_id)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ClassificationResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, u8>::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}

/// The single machine-readable output of a run.
///
/// Success and failure share one shape; on failure `error` is set and the
/// data fields are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub total_rows: usize,
    pub anomalies_flagged: usize,
    pub autoencoder_threshold: f64,
    pub reconstruction_errors: Vec<f32>,
    pub cnn_predictions: ClassificationResult,
}

impl PipelineReport {
    /// Failure-shaped report carrying the configured threshold.
    pub fn failure(error: &PipelineError, threshold: f64) -> Self {
        Self::failure_message(error.to_string(), threshold)
    }

    pub fn failure_message(message: impl Into<String>, threshold: f64) -> Self {
        Self {
            error: Some(message.into()),
            total_rows: 0,
            anomalies_flagged: 0,
            autoencoder_threshold: threshold,
            reconstruction_errors: Vec::new(),
            cnn_predictions: ClassificationResult::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_errors_zeroed_before_flagging() {
        let result = AnomalyResult::from_errors(
            vec![0.2, f32::NAN, f32::INFINITY, 0.01, f32::NEG_INFINITY],
            0.05,
        );
        assert_eq!(result.errors, vec![0.2, 0.0, 0.0, 0.01, 0.0]);
        assert_eq!(result.flags, vec![true, false, false, false, false]);
        assert_eq!(result.anomaly_count(), 1);
    }

    #[test]
    fn test_threshold_is_strict() {
        let result = AnomalyResult::from_errors(vec![0.5], 0.5);
        assert_eq!(result.anomaly_count(), 0);
    }

    #[test]
    fn test_predictions_sorted_by_row_index() {
        let mut preds = ClassificationResult::new();
        preds.insert("img_10.png", 1);
        preds.insert("img_2.png", 3);
        preds.insert("notes.png", 0);
        preds.insert("img_0.png", 2);

        assert_eq!(
            preds.names(),
            vec!["img_0.png", "img_2.png", "img_10.png", "notes.png"]
        );
        assert_eq!(preds.get("img_2.png"), Some(3));
        assert!(!preds.contains("img_1.png"));

        let json = serde_json::to_string(&preds).unwrap();
        assert_eq!(
            json,
            r#"{"img_0.png":2,"img_2.png":3,"img_10.png":1,"notes.png":0}"#
        );
    }

    #[test]
    fn test_insert_replaces_existing_entry() {
        let mut preds = ClassificationResult::new();
        preds.insert("img_1.png", 1);
        preds.insert("img_1.png", 2);
        assert_eq!(preds.len(), 1);
        assert_eq!(preds.get("img_1.png"), Some(2));
    }

    #[test]
    fn test_failure_report_shape() {
        let err = PipelineError::Schema {
            missing: vec!["outbound_length_std".to_string()],
        };
        let report = PipelineReport::failure(&err, 0.05);
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("outbound_length_std"));
        assert_eq!(json["total_rows"], 0);
        assert_eq!(json["anomalies_flagged"], 0);
        assert_eq!(json["autoencoder_threshold"], 0.05);
        assert_eq!(json["reconstruction_errors"], serde_json::json!([]));
        assert_eq!(json["cnn_predictions"], serde_json::json!({}));
    }

    #[test]
    fn test_success_report_omits_error_field() {
        let report = PipelineReport {
            error: None,
            total_rows: 1,
            anomalies_flagged: 0,
            autoencoder_threshold: 0.05,
            reconstruction_errors: vec![0.01],
            cnn_predictions: [("img_0.png".to_string(), 1)].into_iter().collect(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("\"error\""));

        let parsed: PipelineReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
