//! Column scaling for arbitrary numeric CSV tables.
//!
//! A batch tool next to the inference pipeline: it applies one scaling
//! method to every numeric column of a table and reports the fitted
//! parameters plus before/after statistics for each column.

use crate::error::{PipelineError, Result};
use crate::normalizer::MinMaxScaler;
use crate::reader::{parse_cell, RawTable};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use tracing::{debug, info};

/// Upper bound on the number of quantiles fitted per column
const MAX_QUANTILES: usize = 1000;
/// Probabilities are kept this far away from 0 and 1 before the probit
const BOUNDS_THRESHOLD: f64 = 1e-7;
/// Number of before/after rows included in a report
const SAMPLE_ROWS: usize = 5;

/// Supported scaling methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingMethod {
    /// Rescale to [0, 1]
    MinMax,
    /// Zero mean, unit population variance
    ZScore,
    /// Median-centred, IQR-scaled
    Robust,
    /// Map through the empirical CDF onto a standard normal
    Quantile,
    /// Natural log, shifted with log1p when the column is not positive
    Log,
}

impl ScalingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MinMax => "min_max",
            Self::ZScore => "z_score",
            Self::Robust => "robust",
            Self::Quantile => "quantile",
            Self::Log => "log",
        }
    }
}

impl FromStr for ScalingMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "min_max" => Ok(Self::MinMax),
            "z_score" => Ok(Self::ZScore),
            "robust" => Ok(Self::Robust),
            "quantile" => Ok(Self::Quantile),
            "log" => Ok(Self::Log),
            other => Err(PipelineError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl fmt::Display for ScalingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary statistics of one column, missing cells excluded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
}

impl SummaryStats {
    fn of(values: &[f64]) -> Self {
        let sorted = sorted(values);
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        Self {
            min: sorted.first().copied().unwrap_or(f64::NAN),
            max: sorted.last().copied().unwrap_or(f64::NAN),
            mean,
            median: percentile(&sorted, 0.5),
            std,
        }
    }
}

/// Statistics of a column before scaling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginalStats {
    #[serde(flatten)]
    pub summary: SummaryStats,
    pub count: usize,
    pub missing: usize,
}

/// Fitted parameters, shaped per method
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TransformParams {
    MinMax {
        min: f64,
        max: f64,
        scale: f64,
    },
    ZScore {
        mean: f64,
        std: f64,
    },
    Robust {
        center: f64,
        scale: f64,
    },
    Quantile {
        n_quantiles: usize,
        output_distribution: &'static str,
    },
    NaturalLog {
        transform: &'static str,
    },
    Log1p {
        transform: &'static str,
        offset: f64,
    },
}

/// Per-column outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ColumnOutcome {
    Success {
        original_stats: OriginalStats,
        transformation_params: TransformParams,
        transformed_stats: SummaryStats,
    },
    Skipped {
        reason: String,
    },
}

/// One row shown before and after scaling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub original: BTreeMap<String, Value>,
    pub transformed: BTreeMap<String, Value>,
}

/// Successful scaling report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingReport {
    pub success: bool,
    pub method: String,
    pub columns: Vec<String>,
    pub results: BTreeMap<String, ColumnOutcome>,
    pub samples: Vec<Sample>,
}

/// Report emitted when scaling could not run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingFailure {
    pub success: bool,
    pub error: String,
    pub method: String,
}

impl ScalingFailure {
    pub fn new(method: &str, error: &PipelineError) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            method: method.to_string(),
        }
    }
}

/// Scaled copy of the input table; untouched columns keep their text
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ScaledTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// A column transform fitted on the column's own values
#[derive(Debug, Clone)]
enum FittedColumn {
    MinMax(MinMaxScaler),
    Standardize { center: f64, scale: f64 },
    Quantile { quantiles: Vec<f64>, references: Vec<f64> },
    NaturalLog,
    Log1p { offset: f64 },
}

impl FittedColumn {
    fn fit(method: ScalingMethod, values: &[f64]) -> (Self, TransformParams) {
        match method {
            ScalingMethod::MinMax => {
                let scaler = MinMaxScaler::fit(&[values.to_vec()]);
                let params = TransformParams::MinMax {
                    min: scaler.data_min()[0],
                    max: scaler.data_max()[0],
                    scale: scaler.scale(0),
                };
                (Self::MinMax(scaler), params)
            }
            ScalingMethod::ZScore => {
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
                let std = non_zero(std);
                (
                    Self::Standardize { center: mean, scale: std },
                    TransformParams::ZScore { mean, std },
                )
            }
            ScalingMethod::Robust => {
                let sorted = sorted(values);
                let center = percentile(&sorted, 0.5);
                let scale = non_zero(percentile(&sorted, 0.75) - percentile(&sorted, 0.25));
                (
                    Self::Standardize { center, scale },
                    TransformParams::Robust { center, scale },
                )
            }
            ScalingMethod::Quantile => {
                let sorted = sorted(values);
                let n_quantiles = sorted.len().clamp(1, MAX_QUANTILES);
                let references = linspace(0.0, 1.0, n_quantiles);
                let quantiles = references.iter().map(|&q| percentile(&sorted, q)).collect();
                (
                    Self::Quantile { quantiles, references },
                    TransformParams::Quantile {
                        n_quantiles,
                        output_distribution: "normal",
                    },
                )
            }
            ScalingMethod::Log => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                if min > 0.0 {
                    (
                        Self::NaturalLog,
                        TransformParams::NaturalLog {
                            transform: "natural_log",
                        },
                    )
                } else {
                    let offset = min.abs() + 1.0;
                    (
                        Self::Log1p { offset },
                        TransformParams::Log1p {
                            transform: "log1p",
                            offset,
                        },
                    )
                }
            }
        }
    }

    fn apply(&self, value: f64) -> f64 {
        match self {
            Self::MinMax(scaler) => scaler.transform_value(0, value),
            Self::Standardize { center, scale } => (value - center) / scale,
            Self::Quantile {
                quantiles,
                references,
            } => quantile_to_normal(value, quantiles, references),
            Self::NaturalLog => value.ln(),
            Self::Log1p { offset } => (value + offset).ln_1p(),
        }
    }
}

/// Scales the numeric columns of a table with one method.
pub struct ColumnScaler {
    method: ScalingMethod,
}

impl ColumnScaler {
    pub fn new(method: ScalingMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> ScalingMethod {
        self.method
    }

    /// Scale `columns` (every column when `None`) of `table`.
    ///
    /// Columns that hold any non-numeric text are reported as skipped and
    /// copied through unchanged. Naming a column the table lacks is a
    /// schema error.
    pub fn scale(
        &self,
        table: &RawTable,
        columns: Option<&[String]>,
    ) -> Result<(ScalingReport, ScaledTable)> {
        let headers: Vec<String> = table.headers().map(str::to_string).collect();
        let targets = select_columns(table, &headers, columns)?;

        let mut rows: Vec<Vec<String>> = table
            .records()
            .iter()
            .map(|record| {
                (0..headers.len())
                    .map(|idx| record.get(idx).unwrap_or("").to_string())
                    .collect()
            })
            .collect();

        let mut results = BTreeMap::new();
        let mut scaled: Vec<(usize, Vec<Option<f64>>)> = Vec::new();

        for &idx in &targets {
            let name = &headers[idx];
            let Some(cells) = numeric_column(table, idx) else {
                debug!(column = %name, "Skipping non-numeric column");
                results.insert(
                    name.clone(),
                    ColumnOutcome::Skipped {
                        reason: "column is not numeric".to_string(),
                    },
                );
                continue;
            };

            let present: Vec<f64> = cells.iter().flatten().copied().collect();
            let original_stats = OriginalStats {
                summary: SummaryStats::of(&present),
                count: present.len(),
                missing: cells.len() - present.len(),
            };

            let (fitted, transformation_params) = FittedColumn::fit(self.method, &present);
            let transformed: Vec<Option<f64>> =
                cells.iter().map(|cell| cell.map(|v| fitted.apply(v))).collect();

            let finite: Vec<f64> = transformed
                .iter()
                .flatten()
                .copied()
                .filter(|v| !v.is_nan())
                .collect();
            let transformed_stats = SummaryStats::of(&finite);

            for (row, value) in rows.iter_mut().zip(&transformed) {
                row[idx] = match value {
                    Some(v) if !v.is_nan() => v.to_string(),
                    _ => String::new(),
                };
            }

            results.insert(
                name.clone(),
                ColumnOutcome::Success {
                    original_stats,
                    transformation_params,
                    transformed_stats,
                },
            );
            scaled.push((idx, transformed));
        }

        let samples = sample_indices(table.len(), SAMPLE_ROWS)
            .into_iter()
            .map(|row| Sample {
                original: targets
                    .iter()
                    .map(|&idx| {
                        let cell = table.records()[row].get(idx).unwrap_or("");
                        (headers[idx].clone(), cell_value(cell))
                    })
                    .collect(),
                transformed: scaled
                    .iter()
                    .map(|(idx, values)| (headers[*idx].clone(), number(values[row])))
                    .collect(),
            })
            .collect();

        info!(
            method = %self.method,
            columns = targets.len(),
            scaled = scaled.len(),
            rows = table.len(),
            "Columns scaled"
        );

        let report = ScalingReport {
            success: true,
            method: self.method.to_string(),
            columns: targets.iter().map(|&idx| headers[idx].clone()).collect(),
            results,
            samples,
        };
        Ok((report, ScaledTable { headers, rows }))
    }
}

/// Scale a table and return only the report.
pub fn scale_table(
    table: &RawTable,
    columns: Option<&[String]>,
    method: ScalingMethod,
) -> Result<ScalingReport> {
    ColumnScaler::new(method)
        .scale(table, columns)
        .map(|(report, _)| report)
}

fn select_columns(
    table: &RawTable,
    headers: &[String],
    columns: Option<&[String]>,
) -> Result<Vec<usize>> {
    let Some(columns) = columns else {
        return Ok((0..headers.len()).collect());
    };

    let mut indices = Vec::with_capacity(columns.len());
    let mut missing = Vec::new();
    for name in columns {
        match table.column_index(name) {
            Some(idx) if !indices.contains(&idx) => indices.push(idx),
            Some(_) => {}
            None => missing.push(name.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(PipelineError::Schema { missing });
    }
    Ok(indices)
}

/// Values of a column with missing cells as `None`, or `None` if any cell
/// is text or no cell holds a value.
fn numeric_column(table: &RawTable, idx: usize) -> Option<Vec<Option<f64>>> {
    let cells: Vec<Option<f64>> = table
        .records()
        .iter()
        .map(|record| {
            parse_cell(record.get(idx).unwrap_or(""))
                .map(|v| if v.is_nan() { None } else { Some(v) })
        })
        .collect::<Option<_>>()?;

    cells.iter().any(Option::is_some).then_some(cells)
}

fn cell_value(cell: &str) -> Value {
    match parse_cell(cell) {
        Some(v) => number(Some(v)),
        None => Value::String(cell.to_string()),
    }
}

fn number(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn non_zero(scale: f64) -> f64 {
    if scale == 0.0 {
        1.0
    } else {
        scale
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Linear-interpolated percentile of sorted data, `q` in [0, 1].
fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Up to `n` evenly spaced row indices, first and last included.
fn sample_indices(len: usize, n: usize) -> Vec<usize> {
    let count = len.min(n);
    linspace(0.0, len.saturating_sub(1) as f64, count)
        .into_iter()
        .map(|pos| pos as usize)
        .collect()
}

/// Piecewise-linear interpolation with the endpoints held constant.
fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    let j = xp.partition_point(|&v| v <= x) - 1;
    let t = (x - xp[j]) / (xp[j + 1] - xp[j]);
    fp[j] + t * (fp[j + 1] - fp[j])
}

/// Empirical CDF position of `value`, mapped onto a standard normal.
///
/// Repeated quantiles are resolved by averaging the forward and backward
/// interpolation, so a run of equal values lands mid-run.
fn quantile_to_normal(value: f64, quantiles: &[f64], references: &[f64]) -> f64 {
    if value.is_nan() || quantiles.is_empty() {
        return f64::NAN;
    }
    let lower = quantiles[0];
    let upper = quantiles[quantiles.len() - 1];

    let p = if value == lower {
        0.0
    } else if value == upper {
        1.0
    } else {
        let neg_q: Vec<f64> = quantiles.iter().rev().map(|q| -q).collect();
        let neg_r: Vec<f64> = references.iter().rev().map(|r| -r).collect();
        0.5 * (interp(value, quantiles, references) - interp(-value, &neg_q, &neg_r))
    };

    probit(p.clamp(BOUNDS_THRESHOLD, 1.0 - BOUNDS_THRESHOLD))
}

/// Inverse of the standard normal CDF (Acklam's rational approximation).
fn probit(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader(csv.as_bytes()).unwrap()
    }

    fn success(report: &ScalingReport, column: &str) -> (OriginalStats, TransformParams, SummaryStats) {
        match &report.results[column] {
            ColumnOutcome::Success {
                original_stats,
                transformation_params,
                transformed_stats,
            } => (
                original_stats.clone(),
                transformation_params.clone(),
                transformed_stats.clone(),
            ),
            other => panic!("expected success for {column}, got {other:?}"),
        }
    }

    #[test]
    fn test_method_names() {
        for name in ["min_max", "z_score", "robust", "quantile", "log"] {
            assert_eq!(name.parse::<ScalingMethod>().unwrap().as_str(), name);
        }
        let err = "box_cox".parse::<ScalingMethod>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported normalization method: box_cox");
    }

    #[test]
    fn test_min_max_params_and_stats() {
        let report = scale_table(&table("a\n2\n4\n6\n"), None, ScalingMethod::MinMax).unwrap();
        let (original, params, transformed) = success(&report, "a");

        assert_eq!(original.count, 3);
        assert_eq!(original.missing, 0);
        assert_eq!(original.summary.median, 4.0);
        assert_eq!(original.summary.std, 2.0);
        assert_eq!(
            params,
            TransformParams::MinMax {
                min: 2.0,
                max: 6.0,
                scale: 0.25
            }
        );
        assert_eq!(transformed.min, 0.0);
        assert_eq!(transformed.max, 1.0);
    }

    #[test]
    fn test_z_score_uses_population_std() {
        let report = scale_table(&table("a\n1\n3\n"), None, ScalingMethod::ZScore).unwrap();
        let (_, params, transformed) = success(&report, "a");

        assert_eq!(params, TransformParams::ZScore { mean: 2.0, std: 1.0 });
        assert_eq!(transformed.min, -1.0);
        assert_eq!(transformed.max, 1.0);
    }

    #[test]
    fn test_robust_uses_median_and_iqr() {
        let report = scale_table(&table("a\n1\n2\n3\n4\n5\n"), None, ScalingMethod::Robust).unwrap();
        let (_, params, transformed) = success(&report, "a");

        assert_eq!(params, TransformParams::Robust { center: 3.0, scale: 2.0 });
        assert_eq!(transformed.median, 0.0);
    }

    #[test]
    fn test_log_variants() {
        let report = scale_table(&table("pos,neg\n1,-2\n10,0\n"), None, ScalingMethod::Log).unwrap();

        let (_, params, transformed) = success(&report, "pos");
        assert_eq!(params, TransformParams::NaturalLog { transform: "natural_log" });
        assert_eq!(transformed.min, 0.0);

        let (_, params, transformed) = success(&report, "neg");
        assert_eq!(
            params,
            TransformParams::Log1p {
                transform: "log1p",
                offset: 3.0
            }
        );
        // log1p(-2 + 3) = ln 2
        assert!((transformed.min - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_is_symmetric_around_median() {
        let report = scale_table(&table("a\n1\n2\n3\n4\n5\n"), None, ScalingMethod::Quantile).unwrap();
        let (_, params, transformed) = success(&report, "a");

        assert_eq!(
            params,
            TransformParams::Quantile {
                n_quantiles: 5,
                output_distribution: "normal"
            }
        );
        assert!(transformed.median.abs() < 1e-9);
        assert!((transformed.min + transformed.max).abs() < 1e-6);
        assert!(transformed.min < -5.0);
    }

    #[test]
    fn test_probit_reference_points() {
        assert_eq!(probit(0.5), 0.0);
        assert!((probit(0.975) - 1.959_963_985).abs() < 1e-6);
        assert!((probit(0.01) + 2.326_347_874).abs() < 1e-6);
    }

    #[test]
    fn test_text_column_skipped_and_copied() {
        let (report, scaled) = ColumnScaler::new(ScalingMethod::MinMax)
            .scale(&table("name,v\nalpha,0\nbeta,10\n"), None)
            .unwrap();

        assert_eq!(
            report.results["name"],
            ColumnOutcome::Skipped {
                reason: "column is not numeric".to_string()
            }
        );
        assert_eq!(scaled.rows()[1], vec!["beta".to_string(), "1".to_string()]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"]["name"]["status"], "skipped");
        assert_eq!(json["results"]["v"]["status"], "success");
        assert_eq!(json["results"]["v"]["original_stats"]["count"], 2);
    }

    #[test]
    fn test_missing_cells_counted_and_preserved() {
        let (report, scaled) = ColumnScaler::new(ScalingMethod::MinMax)
            .scale(&table("id,v\na,0\nb,\nc,4\n"), None)
            .unwrap();
        let (original, _, _) = success(&report, "v");

        assert_eq!(original.count, 2);
        assert_eq!(original.missing, 1);
        assert_eq!(scaled.rows()[1], vec!["b".to_string(), String::new()]);
        assert_eq!(report.samples[1].transformed["v"], Value::Null);
    }

    #[test]
    fn test_column_selection() {
        let t = table("a,b,c\n1,2,3\n4,5,6\n");
        let only_b = vec!["b".to_string()];
        let report = scale_table(&t, Some(&only_b), ScalingMethod::MinMax).unwrap();
        assert_eq!(report.columns, vec!["b"]);
        assert_eq!(report.results.len(), 1);

        let unknown = vec!["b".to_string(), "zz".to_string()];
        let err = scale_table(&t, Some(&unknown), ScalingMethod::MinMax).unwrap_err();
        assert_eq!(err.kind(), "SchemaError");
        assert!(err.to_string().contains("zz"));
    }

    #[test]
    fn test_sample_indices_evenly_spaced() {
        assert_eq!(sample_indices(3, 5), vec![0, 1, 2]);
        assert_eq!(sample_indices(10, 5), vec![0, 2, 4, 6, 9]);
        assert!(sample_indices(0, 5).is_empty());
    }

    #[test]
    fn test_scaled_csv_output() {
        let (_, scaled) = ColumnScaler::new(ScalingMethod::MinMax)
            .scale(&table("id,v\nx,2\ny,4\n"), None)
            .unwrap();
        let mut out = Vec::new();
        scaled.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["id,v", "x,0", "y,1"]);
    }

    #[test]
    fn test_failure_shape() {
        let err = PipelineError::UnsupportedMethod("box_cox".to_string());
        let json = serde_json::to_value(ScalingFailure::new("box_cox", &err)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["method"], "box_cox");
        assert_eq!(json["error"], "Unsupported normalization method: box_cox");
    }
}
