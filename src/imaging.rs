//! Raster synthesis from normalized feature rows.
//!
//! Each row becomes a tiny square grayscale image replicated over three RGB
//! channels and stored as `img_{index}.png`. Existing files are never
//! rewritten, so an interrupted run can be resumed on the same directory.
//!
//! The existence check and the write are two separate filesystem calls.
//! Two pipeline instances sharing one output directory can therefore both
//! write the same key; the pipeline is meant to run once per directory.

use crate::error::{PipelineError, Result};
use crate::types::record::NormalizedTable;
use image::{Rgb, RgbImage};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const ARTIFACT_PREFIX: &str = "img_";
const ARTIFACT_EXTENSION: &str = "png";

/// File name of the artifact for a row index.
pub fn artifact_file_name(index: usize) -> String {
    format!("{ARTIFACT_PREFIX}{index}.{ARTIFACT_EXTENSION}")
}

/// Row index encoded in an artifact file name, if it follows the naming scheme.
pub fn artifact_index(name: &str) -> Option<usize> {
    name.strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// Ordering of artifact names by row index.
///
/// Names outside the `img_{n}.png` scheme sort after all indexed names,
/// lexicographically among themselves.
pub fn artifact_order(a: &str, b: &str) -> Ordering {
    match (artifact_index(a), artifact_index(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Side length of the square raster needed for `len` values.
pub fn raster_side(len: usize) -> u32 {
    let mut side = (len as f64).sqrt().ceil() as u32;
    // Guard against sqrt rounding just below a perfect square
    while (side as usize) * (side as usize) < len {
        side += 1;
    }
    side.max(1)
}

/// Map one value to an 8-bit intensity: clip to [0,1], scale, truncate.
fn intensity(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Build the RGB raster for one row.
///
/// Values fill cells row-major; trailing cells stay black.
pub fn build_raster(values: &[f64]) -> RgbImage {
    let side = raster_side(values.len());
    let mut img = RgbImage::new(side, side);

    for (cell, &value) in values.iter().enumerate() {
        let x = cell as u32 % side;
        let y = cell as u32 / side;
        let level = intensity(value);
        img.put_pixel(x, y, Rgb([level, level, level]));
    }

    img
}

/// Outcome of one synthesis pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisStats {
    /// Artifacts written in this pass
    pub written: usize,
    /// Artifacts already present and left untouched
    pub skipped: usize,
}

/// Writes one raster artifact per normalized row.
pub struct ImageSynthesizer {
    output_dir: PathBuf,
}

impl ImageSynthesizer {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the artifact for a row index.
    pub fn artifact_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(artifact_file_name(index))
    }

    /// Populate the output directory with one artifact per row.
    ///
    /// `batch_size` only controls progress logging. All files are closed
    /// when this returns.
    pub fn synthesize_all(
        &self,
        rows: &NormalizedTable,
        batch_size: usize,
    ) -> Result<SynthesisStats> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            PipelineError::artifact(&self.output_dir, format!("cannot create directory: {e}"))
        })?;

        let total = rows.len();
        let batch_size = batch_size.max(1);
        let batch_count = total.div_ceil(batch_size);
        let mut stats = SynthesisStats::default();

        for (batch_idx, chunk) in rows.rows().chunks(batch_size).enumerate() {
            info!(
                batch = batch_idx + 1,
                batches = batch_count,
                "Generating RGB images"
            );

            for (offset, row) in chunk.iter().enumerate() {
                let index = batch_idx * batch_size + offset;
                let path = self.artifact_path(index);

                if path.exists() {
                    debug!(path = %path.display(), "Artifact exists, skipping");
                    stats.skipped += 1;
                    continue;
                }

                build_raster(row)
                    .save(&path)
                    .map_err(|e| PipelineError::artifact(&path, e))?;
                stats.written += 1;
            }
        }

        info!(
            dir = %self.output_dir.display(),
            written = stats.written,
            skipped = stats.skipped,
            "RGB images saved"
        );

        Ok(stats)
    }
}
