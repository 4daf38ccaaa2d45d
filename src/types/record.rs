//! Flow feature records

use serde::{Deserialize, Serialize};

/// Number of flow statistics fed to both models.
pub const FEATURE_COUNT: usize = 6;

/// Column names in the order expected by the autoencoder.
pub const REQUIRED_COLUMNS: [&str; FEATURE_COUNT] = [
    "inbound_length_count",
    "inbound_length_mean",
    "inbound_length_std",
    "outbound_length_count",
    "outbound_length_mean",
    "outbound_length_std",
];

/// Aggregated packet-length statistics of one flow window.
///
/// Identity is the 0-based row index in the source table; the record itself
/// does not carry it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Number of inbound packets
    pub inbound_length_count: f64,
    /// Mean inbound packet length
    pub inbound_length_mean: f64,
    /// Standard deviation of inbound packet length
    pub inbound_length_std: f64,
    /// Number of outbound packets
    pub outbound_length_count: f64,
    /// Mean outbound packet length
    pub outbound_length_mean: f64,
    /// Standard deviation of outbound packet length
    pub outbound_length_std: f64,
}

impl FeatureRow {
    /// Build a row from values ordered as [`REQUIRED_COLUMNS`].
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            inbound_length_count: values[0],
            inbound_length_mean: values[1],
            inbound_length_std: values[2],
            outbound_length_count: values[3],
            outbound_length_mean: values[4],
            outbound_length_std: values[5],
        }
    }

    /// Values ordered as [`REQUIRED_COLUMNS`].
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            self.inbound_length_count,
            self.inbound_length_mean,
            self.inbound_length_std,
            self.outbound_length_count,
            self.outbound_length_mean,
            self.outbound_length_std,
        ]
    }
}

/// Min-max normalized feature rows, index aligned with the source table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    rows: Vec<[f64; FEATURE_COUNT]>,
}

impl NormalizedTable {
    pub fn new(rows: Vec<[f64; FEATURE_COUNT]>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[[f64; FEATURE_COUNT]] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[f64; FEATURE_COUNT]> {
        self.rows.get(index)
    }

    /// All values of one column, in row order.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[index]).collect()
    }
}
