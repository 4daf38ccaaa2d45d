//! Min-max feature normalization.
//!
//! The scaler is fitted on the whole table in a single pass and applied to
//! the same table. Fit parameters are not persisted between runs.

use crate::types::record::{FeatureRow, NormalizedTable, FEATURE_COUNT};
use tracing::debug;

/// Per-column min-max scaler.
///
/// NaN cells are ignored when fitting and stay NaN when transforming. A
/// constant column has its range treated as 1, so it maps to 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit on column-major data.
    pub fn fit(columns: &[Vec<f64>]) -> Self {
        let mut data_min = Vec::with_capacity(columns.len());
        let mut data_max = Vec::with_capacity(columns.len());

        for column in columns {
            let (min, max) = column
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .fold((f64::NAN, f64::NAN), |(lo, hi), v| {
                    (
                        if lo.is_nan() { v } else { lo.min(v) },
                        if hi.is_nan() { v } else { hi.max(v) },
                    )
                });
            data_min.push(min);
            data_max.push(max);
        }

        Self { data_min, data_max }
    }

    pub fn data_min(&self) -> &[f64] {
        &self.data_min
    }

    pub fn data_max(&self) -> &[f64] {
        &self.data_max
    }

    /// Observed range of a column, 1.0 when the column is constant.
    fn range(&self, column: usize) -> f64 {
        let range = self.data_max[column] - self.data_min[column];
        if range == 0.0 {
            1.0
        } else {
            range
        }
    }

    /// Multiplicative factor applied after subtracting the column minimum.
    pub fn scale(&self, column: usize) -> f64 {
        1.0 / self.range(column)
    }

    /// Rescale one value of the given column.
    pub fn transform_value(&self, column: usize, value: f64) -> f64 {
        (value - self.data_min[column]) / self.range(column)
    }

    /// Rescale column-major data with the fitted parameters.
    pub fn transform(&self, columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
        columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                column
                    .iter()
                    .map(|&v| self.transform_value(idx, v))
                    .collect()
            })
            .collect()
    }
}

/// Normalizes the six flow features for both models.
pub struct FeatureNormalizer;

impl FeatureNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Fit a scaler on `rows` and return the rescaled table.
    pub fn normalize(&self, rows: &[FeatureRow]) -> NormalizedTable {
        self.fit_transform(rows).1
    }

    /// Same as [`normalize`](Self::normalize), also returning the fitted scaler.
    pub fn fit_transform(&self, rows: &[FeatureRow]) -> (MinMaxScaler, NormalizedTable) {
        let columns: Vec<Vec<f64>> = (0..FEATURE_COUNT)
            .map(|idx| rows.iter().map(|row| row.values()[idx]).collect())
            .collect();
        let scaler = MinMaxScaler::fit(&columns);

        let normalized = rows
            .iter()
            .map(|row| {
                let values = row.values();
                let mut out = [0.0f64; FEATURE_COUNT];
                for (idx, value) in values.iter().enumerate() {
                    out[idx] = scaler.transform_value(idx, *value);
                }
                out
            })
            .collect();

        debug!(
            rows = rows.len(),
            data_min = ?scaler.data_min(),
            data_max = ?scaler.data_max(),
            "Fitted min-max scaler"
        );

        (scaler, NormalizedTable::new(normalized))
    }
}

impl Default for FeatureNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
