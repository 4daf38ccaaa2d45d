//! CSV reader for aggregated flow statistics

use crate::error::{PipelineError, Result};
use crate::types::record::{FeatureRow, FEATURE_COUNT, REQUIRED_COLUMNS};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Raw table as read from disk, before column selection.
#[derive(Debug, Clone)]
pub struct RawTable {
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl RawTable {
    /// Parse a CSV document with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let headers = reader.headers()?.clone();
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { headers, records })
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    pub fn records(&self) -> &[StringRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Pick the six required columns, in their canonical order.
    ///
    /// Every absent column is reported at once. Empty cells become NaN;
    /// any other non-numeric cell is an input error.
    pub fn select_features(&self) -> Result<Vec<FeatureRow>> {
        let mut indices = [0usize; FEATURE_COUNT];
        let mut missing = Vec::new();
        for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
            match self.column_index(name) {
                Some(idx) => indices[slot] = idx,
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(PipelineError::Schema { missing });
        }

        self.records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let mut values = [0.0f64; FEATURE_COUNT];
                for (slot, &idx) in indices.iter().enumerate() {
                    let cell = record.get(idx).unwrap_or("");
                    values[slot] = parse_cell(cell).ok_or_else(|| {
                        PipelineError::input(format!(
                            "row {row}: column {} has non-numeric value {cell:?}",
                            REQUIRED_COLUMNS[slot]
                        ))
                    })?;
                }
                Ok(FeatureRow::from_values(values))
            })
            .collect()
    }
}

/// Empty and NA-style cells read as NaN, the way pandas reads them.
pub(crate) fn parse_cell(cell: &str) -> Option<f64> {
    match cell {
        "" | "NA" | "NaN" | "nan" | "null" => Some(f64::NAN),
        _ => cell.parse::<f64>().ok(),
    }
}

/// Reader for the flow statistics table
pub struct FlowReader {
    path: PathBuf,
}

impl FlowReader {
    /// Create a reader for the given CSV path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the whole table into memory
    pub fn read(&self) -> Result<RawTable> {
        info!(path = %self.path.display(), "Reading CSV file");

        let file = File::open(&self.path).map_err(|e| {
            PipelineError::input(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        let table = RawTable::from_reader(file).map_err(|e| match e {
            PipelineError::Input(reason) => {
                PipelineError::input(format!("{}: {}", self.path.display(), reason))
            }
            other => other,
        })?;

        debug!(
            columns = table.headers.len(),
            rows = table.len(),
            "CSV parsed"
        );
        info!(rows = table.len(), "Loaded rows from CSV");
        Ok(table)
    }

    /// Get the input path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
