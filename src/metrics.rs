//! Run statistics for the inference pipeline.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

use crate::imaging::SynthesisStats;
use crate::models::classifier::{ClassifyStats, NUM_CLASSES};

/// Metrics collector for one pipeline run
pub struct PipelineMetrics {
    /// Rows read and normalized
    pub rows_processed: AtomicU64,
    /// Rows flagged by the autoencoder
    pub anomalies_flagged: AtomicU64,
    /// Image artifacts written in this run
    pub images_written: AtomicU64,
    /// Image artifacts found on disk and reused
    pub images_skipped: AtomicU64,
    /// Images with a CNN prediction
    pub images_classified: AtomicU64,
    /// Images dropped during classification
    pub images_failed: AtomicU64,
    /// Wall time per stage, in execution order
    stage_times: RwLock<Vec<(String, Duration)>>,
    /// Wall-clock start, reported in the summary
    started_at: DateTime<Utc>,
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            rows_processed: AtomicU64::new(0),
            anomalies_flagged: AtomicU64::new(0),
            images_written: AtomicU64::new(0),
            images_skipped: AtomicU64::new(0),
            images_classified: AtomicU64::new(0),
            images_failed: AtomicU64::new(0),
            stage_times: RwLock::new(Vec::with_capacity(8)),
            started_at: Utc::now(),
            start_time: Instant::now(),
        }
    }

    pub fn record_rows(&self, rows: usize) {
        self.rows_processed.store(rows as u64, Ordering::Relaxed);
    }

    pub fn record_anomalies(&self, anomalies: usize) {
        self.anomalies_flagged.store(anomalies as u64, Ordering::Relaxed);
    }

    pub fn record_synthesis(&self, stats: SynthesisStats) {
        self.images_written.fetch_add(stats.written as u64, Ordering::Relaxed);
        self.images_skipped.fetch_add(stats.skipped as u64, Ordering::Relaxed);
    }

    pub fn record_classification(&self, stats: ClassifyStats) {
        self.images_classified
            .fetch_add(stats.classified as u64, Ordering::Relaxed);
        self.images_failed.fetch_add(stats.failed as u64, Ordering::Relaxed);
    }

    /// Record how long a stage took
    pub fn record_stage(&self, stage: &str, duration: Duration) {
        if let Ok(mut times) = self.stage_times.write() {
            times.push((stage.to_string(), duration));
        }
    }

    /// Run `f` and record its wall time under `stage`, whatever it returns.
    pub fn time_stage<T>(&self, stage: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record_stage(stage, start.elapsed());
        out
    }

    /// Stage timings in execution order
    pub fn stage_times(&self) -> Vec<(String, Duration)> {
        self.stage_times
            .read()
            .map(|times| times.clone())
            .unwrap_or_default()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Rows per second over the whole run so far
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.rows_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log summary statistics
    pub fn log_summary(&self, class_distribution: &[usize; NUM_CLASSES]) {
        let rows = self.rows_processed.load(Ordering::Relaxed);
        let anomalies = self.anomalies_flagged.load(Ordering::Relaxed);
        let anomaly_pct = if rows > 0 {
            (anomalies as f64 / rows as f64) * 100.0
        } else {
            0.0
        };

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            IOT BOTNET INFERENCE - RUN SUMMARY                ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Started: {}", self.started_at.to_rfc3339());
        info!(
            "║ Rows Processed:    {:>8}  │  Throughput: {:>8.1} rows/s",
            rows,
            self.throughput()
        );
        info!(
            "║ Anomalies Flagged: {:>8}  │  Anomaly Rate: {:>6.1}%",
            anomalies, anomaly_pct
        );
        info!(
            "║ Images: written={} skipped={} classified={} failed={}",
            self.images_written.load(Ordering::Relaxed),
            self.images_skipped.load(Ordering::Relaxed),
            self.images_classified.load(Ordering::Relaxed),
            self.images_failed.load(Ordering::Relaxed)
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ CNN Class Distribution:");
        let total: usize = class_distribution.iter().sum();
        for (class_id, &count) in class_distribution.iter().enumerate() {
            let pct = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            let bar: String = "█".repeat(((pct / 5.0) as usize).min(20));
            info!("║   class {}: {:>6} ({:>5.1}%) {}", class_id, count, pct, bar);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Stage Times (ms):");
        for (stage, duration) in self.stage_times() {
            info!("║   {:<22} {:>10.1}", stage, duration.as_secs_f64() * 1000.0);
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
