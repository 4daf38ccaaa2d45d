//! Two-stage inference pipeline.
//!
//! Stages run strictly in order on a single thread:
//!
//! 1. read the flow table and select the six feature columns
//! 2. min-max normalize
//! 3. load the autoencoder and score reconstruction errors
//! 4. synthesize one raster per row into the image directory
//! 5. load the CNN and classify every raster in the directory
//! 6. assemble the report
//!
//! Any failure before the report is assembled ends the run with a
//! failure-shaped report carrying the error message.

use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::imaging::ImageSynthesizer;
use crate::metrics::PipelineMetrics;
use crate::models::{AnomalyScorer, ImageClassifier, ModelLoader, ModelProvider, ResultAggregator};
use crate::normalizer::FeatureNormalizer;
use crate::reader::FlowReader;
use crate::types::report::PipelineReport;
use tracing::{error, info, info_span};
use uuid::Uuid;

/// One configured pipeline invocation
pub struct Pipeline<P = ModelLoader> {
    config: AppConfig,
    provider: P,
    metrics: PipelineMetrics,
}

impl Pipeline<ModelLoader> {
    /// Pipeline backed by ONNX Runtime models
    pub fn new(config: AppConfig) -> Self {
        let provider = ModelLoader::with_threads(config.models.onnx_threads);
        Self::with_provider(config, provider)
    }
}

impl<P: ModelProvider> Pipeline<P> {
    /// Pipeline that obtains its models from `provider`
    pub fn with_provider(config: AppConfig, provider: P) -> Self {
        Self {
            config,
            provider,
            metrics: PipelineMetrics::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Run every stage, returning the first fatal error.
    pub fn execute(&self) -> Result<PipelineReport> {
        let cfg = &self.config;
        let metrics = &self.metrics;

        let rows = metrics.time_stage("read", || {
            let table = FlowReader::new(&cfg.input.csv_path).read()?;
            if table.is_empty() {
                return Err(PipelineError::input(format!(
                    "{} has no data rows",
                    cfg.input.csv_path.display()
                )));
            }
            table.select_features()
        })?;
        metrics.record_rows(rows.len());

        let normalized = metrics.time_stage("normalize", || FeatureNormalizer::new().normalize(&rows));

        let mut autoencoder = self.provider.autoencoder(&cfg.models.autoencoder_path)?;
        let scorer = AnomalyScorer::new(cfg.detection.threshold, cfg.pipeline.autoencoder_batch_size);
        let anomalies =
            metrics.time_stage("autoencoder", || scorer.score(autoencoder.as_mut(), &normalized))?;
        metrics.record_anomalies(anomalies.anomaly_count());
        drop(autoencoder);

        let synthesizer = ImageSynthesizer::new(&cfg.pipeline.image_dir);
        let synthesis = metrics.time_stage("synthesize", || {
            synthesizer.synthesize_all(&normalized, cfg.pipeline.image_batch_size)
        })?;
        metrics.record_synthesis(synthesis);

        let mut cnn = self.provider.classifier(&cfg.models.cnn_path)?;
        let classifier = ImageClassifier::new(cfg.pipeline.cnn_batch_size);
        let (predictions, classify_stats) = metrics.time_stage("classify", || {
            classifier.classify_all(cnn.as_mut(), synthesizer.output_dir())
        })?;
        metrics.record_classification(classify_stats);

        let distribution = ResultAggregator::class_distribution(&predictions);
        if let Some((class_id, share)) = ResultAggregator::dominant_class(&predictions) {
            info!(class_id, share = format!("{:.1}%", share * 100.0), "Dominant CNN class");
        }

        let report = ResultAggregator::new(cfg.detection.threshold).assemble(anomalies, predictions);
        info!(
            total_rows = report.total_rows,
            anomalies_flagged = report.anomalies_flagged,
            anomaly_rate = ResultAggregator::anomaly_rate(&report),
            predictions = report.cnn_predictions.len(),
            "Pipeline complete"
        );
        metrics.log_summary(&distribution);

        Ok(report)
    }

    /// Run the pipeline and always produce a report.
    pub fn run(&self) -> PipelineReport {
        let span = info_span!("pipeline", run_id = %Uuid::new_v4());
        let _guard = span.enter();

        info!(
            csv = %self.config.input.csv_path.display(),
            threshold = self.config.detection.threshold,
            image_dir = %self.config.pipeline.image_dir.display(),
            "Starting IoT botnet inference"
        );

        match self.execute() {
            Ok(report) => report,
            Err(e) => {
                error!(kind = e.kind(), error = %e, "Pipeline failed");
                PipelineReport::failure(&e, self.config.detection.threshold)
            }
        }
    }
}
