// End-to-end pipeline tests
// CSV on disk -> normalization -> stub autoencoder -> PNG artifacts -> stub CNN -> report

use iot_botnet_inference::config::AppConfig;
use iot_botnet_inference::emitter::ReportEmitter;
use iot_botnet_inference::error::{PipelineError, Result};
use iot_botnet_inference::models::{ModelProvider, ScoringModel};
use iot_botnet_inference::pipeline::Pipeline;
use iot_botnet_inference::types::PipelineReport;
use ndarray::{Array2, ArrayD, ArrayViewD, Axis};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

// ========== Stub Models ==========

/// Reconstructs its input perfectly except for the very first row it sees,
/// which it inverts.
struct FirstRowOff {
    seen: usize,
    max_batch: usize,
}

impl ScoringModel for FirstRowOff {
    fn run(&mut self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        let n = input.shape()[0];
        if n > self.max_batch {
            return Err(PipelineError::inference("stub-ae", "batch dimension too large"));
        }
        let mut out = input.to_owned();
        if self.seen == 0 && n > 0 {
            out.index_axis_mut(Axis(0), 0).mapv_inplace(|v| 1.0 - v);
        }
        self.seen += n;
        Ok(out)
    }
}

/// Always predicts the same class
struct FixedLabel {
    label: usize,
}

impl ScoringModel for FixedLabel {
    fn run(&mut self, input: ArrayViewD<'_, f32>) -> Result<ArrayD<f32>> {
        let n = input.shape()[0];
        let mut logits = Array2::<f32>::zeros((n, 4));
        for i in 0..n {
            logits[[i, self.label]] = 1.0;
        }
        Ok(logits.into_dyn())
    }
}

struct StubProvider {
    ae_max_batch: usize,
    label: usize,
}

impl StubProvider {
    fn new() -> Self {
        Self {
            ae_max_batch: usize::MAX,
            label: 2,
        }
    }
}

impl ModelProvider for StubProvider {
    fn autoencoder(&self, _path: &Path) -> Result<Box<dyn ScoringModel>> {
        Ok(Box::new(FirstRowOff {
            seen: 0,
            max_batch: self.ae_max_batch,
        }))
    }

    fn classifier(&self, _path: &Path) -> Result<Box<dyn ScoringModel>> {
        Ok(Box::new(FixedLabel { label: self.label }))
    }
}

// ========== Helper Functions ==========

const HEADER: &str = "inbound_length_count,inbound_length_mean,inbound_length_std,\
                      outbound_length_count,outbound_length_mean,outbound_length_std";

/// Row 0 holds every column minimum, so it normalizes to all zeros.
fn three_rows() -> String {
    format!("{HEADER}\n1,1,1,1,1,1\n5,50,2,7,40,3\n9,100,3,13,80,5\n")
}

fn write_csv(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("final_aggregated.csv");
    fs::write(&path, contents).unwrap();
    path
}

fn config_for(dir: &Path, contents: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.input.csv_path = write_csv(dir, contents);
    config.models.autoencoder_path = dir.join("autoencoder_model.onnx");
    config.models.cnn_path = dir.join("cnn_model.onnx");
    config.pipeline.image_dir = dir.join("images");
    config
}

fn run_stubbed(config: AppConfig) -> PipelineReport {
    Pipeline::with_provider(config, StubProvider::new()).run()
}

fn to_json(report: &PipelineReport) -> serde_json::Value {
    let mut emitter = ReportEmitter::new(Vec::new());
    emitter.emit(report).unwrap();
    serde_json::from_slice(&emitter.into_inner()).unwrap()
}

// ========== Scenarios ==========

#[test]
fn test_three_row_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let report = run_stubbed(config_for(dir.path(), &three_rows()));

    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.total_rows, 3);
    assert_eq!(report.anomalies_flagged, 1);
    assert_eq!(report.autoencoder_threshold, 0.05);
    assert_eq!(report.reconstruction_errors, vec![1.0, 0.0, 0.0]);
    assert_eq!(
        report.cnn_predictions.names(),
        vec!["img_0.png", "img_1.png", "img_2.png"]
    );
    assert!(report.cnn_predictions.iter().all(|(_, class)| class == 2));

    let json = to_json(&report);
    assert!(json.get("error").is_none());
    assert_eq!(json["cnn_predictions"]["img_1.png"], 2);
}

#[test]
fn test_missing_column_reported() {
    let dir = tempfile::tempdir().unwrap();
    let csv = "inbound_length_count,inbound_length_mean,inbound_length_std,\
               outbound_length_count,outbound_length_mean\n1,2,3,4,5\n";
    let report = run_stubbed(config_for(dir.path(), csv));

    let json = to_json(&report);
    assert!(json["error"].as_str().unwrap().contains("outbound_length_std"));
    assert_eq!(json["total_rows"], 0);
    assert_eq!(json["anomalies_flagged"], 0);
    assert_eq!(json["autoencoder_threshold"], 0.05);
    assert_eq!(json["reconstruction_errors"], serde_json::json!([]));
    assert_eq!(json["cnn_predictions"], serde_json::json!({}));
}

#[test]
fn test_failure_report_leads_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path(), &three_rows());
    config.input.csv_path = dir.path().join("missing.csv");

    let report = run_stubbed(config);
    let mut emitter = ReportEmitter::new(Vec::new());
    emitter.emit(&report).unwrap();
    let text = String::from_utf8(emitter.into_inner()).unwrap();

    assert!(text.starts_with("{\n  \"error\": "));
}

#[test]
fn test_extra_column_ignored() {
    let plain_dir = tempfile::tempdir().unwrap();
    let plain = run_stubbed(config_for(plain_dir.path(), &three_rows()));

    let extra_dir = tempfile::tempdir().unwrap();
    let csv = format!(
        "device_id,{HEADER},label\n\
         cam-1,1,1,1,1,1,1,benign\n\
         cam-2,5,50,2,7,40,3,mirai\n\
         plug-7,9,100,3,13,80,5,benign\n"
    );
    let extra = run_stubbed(config_for(extra_dir.path(), &csv));

    assert_eq!(plain, extra);
}

#[test]
fn test_corrupted_image_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &three_rows());
    fs::create_dir_all(&config.pipeline.image_dir).unwrap();
    fs::write(config.pipeline.image_dir.join("img_1.png"), b"not a png").unwrap();

    let pipeline = Pipeline::with_provider(config, StubProvider::new());
    let report = pipeline.run();

    assert!(report.is_success());
    assert_eq!(report.total_rows, 3);
    assert_eq!(report.cnn_predictions.names(), vec!["img_0.png", "img_2.png"]);
    assert_eq!(pipeline.metrics().images_failed.load(Ordering::Relaxed), 1);
    assert_eq!(pipeline.metrics().images_skipped.load(Ordering::Relaxed), 1);
}

#[test]
fn test_rerun_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &three_rows());

    let first = Pipeline::with_provider(config.clone(), StubProvider::new());
    let first_report = first.run();
    assert_eq!(first.metrics().images_written.load(Ordering::Relaxed), 3);

    let before: Vec<Vec<u8>> = (0..3)
        .map(|i| fs::read(config.pipeline.image_dir.join(format!("img_{i}.png"))).unwrap())
        .collect();

    let second = Pipeline::with_provider(config.clone(), StubProvider::new());
    let second_report = second.run();

    assert_eq!(second.metrics().images_written.load(Ordering::Relaxed), 0);
    assert_eq!(second.metrics().images_skipped.load(Ordering::Relaxed), 3);
    assert_eq!(first_report, second_report);

    let after: Vec<Vec<u8>> = (0..3)
        .map(|i| fs::read(config.pipeline.image_dir.join(format!("img_{i}.png"))).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn test_errors_are_always_finite() {
    let dir = tempfile::tempdir().unwrap();
    let csv = format!("{HEADER}\n1,,1,1,1,1\n5,50,2,7,40,3\n9,100,,13,80,5\n");
    let report = run_stubbed(config_for(dir.path(), &csv));

    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.reconstruction_errors.len(), report.total_rows);
    assert!(report.reconstruction_errors.iter().all(|e| e.is_finite()));

    let text = serde_json::to_string(&report).unwrap();
    assert!(!text.contains("null"));
    assert!(!text.contains("NaN"));
}

#[test]
fn test_single_row_model_fallback() {
    let batched_dir = tempfile::tempdir().unwrap();
    let batched = run_stubbed(config_for(batched_dir.path(), &three_rows()));

    let fallback_dir = tempfile::tempdir().unwrap();
    let provider = StubProvider {
        ae_max_batch: 1,
        ..StubProvider::new()
    };
    let fallback = Pipeline::with_provider(config_for(fallback_dir.path(), &three_rows()), provider).run();

    assert!(fallback.is_success(), "{:?}", fallback.error);
    assert_eq!(batched, fallback);
}

#[test]
fn test_batch_sizes_do_not_change_report() {
    let default_dir = tempfile::tempdir().unwrap();
    let baseline = run_stubbed(config_for(default_dir.path(), &three_rows()));

    let small_dir = tempfile::tempdir().unwrap();
    let mut config = config_for(small_dir.path(), &three_rows());
    config.pipeline.autoencoder_batch_size = 2;
    config.pipeline.image_batch_size = 1;
    config.pipeline.cnn_batch_size = 2;
    let small = run_stubbed(config);

    assert_eq!(baseline, small);
}

#[test]
fn test_missing_model_file_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &three_rows());

    let report = Pipeline::new(config).run();

    let error = report.error.expect("load must fail");
    assert!(error.contains("autoencoder"));
    assert!(error.contains("file not found"));
    assert_eq!(report.total_rows, 0);
    assert!(report.cnn_predictions.is_empty());
}

#[test]
fn test_custom_threshold_flows_through() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path(), &three_rows());
    config.detection.threshold = 2.0;

    let report = run_stubbed(config);

    assert_eq!(report.autoencoder_threshold, 2.0);
    assert_eq!(report.anomalies_flagged, 0);
    assert_eq!(report.reconstruction_errors[0], 1.0);
}
