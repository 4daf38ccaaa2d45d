//! IoT Botnet Inference - Main Entry Point
//!
//! Runs the autoencoder + CNN pipeline over a flow statistics CSV and prints
//! one JSON report on stdout. Diagnostics go to stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use iot_botnet_inference::{
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    emitter::ReportEmitter,
    pipeline::Pipeline,
    reader::FlowReader,
    transform::{ColumnScaler, ScalingFailure, ScalingMethod, ScalingReport},
    PipelineError, PipelineReport,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::filter::{Directive, EnvFilter, LevelFilter};

#[derive(Parser)]
#[command(name = "iot-botnet-inference")]
#[command(about = "IoT botnet detection with an autoencoder and a CNN", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the inference pipeline (default)
    Run(RunArgs),

    /// Scale the numeric columns of a CSV and report statistics
    Scale {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Scaling method (min_max, z_score, robust, quantile, log)
        #[arg(short, long)]
        method: String,

        /// Comma-separated columns to scale (default: all)
        #[arg(short, long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Write the scaled table to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Overrides for the pipeline configuration
#[derive(Args, Clone, Default)]
struct RunArgs {
    /// Flow statistics CSV with the six feature columns
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Autoencoder ONNX model
    #[arg(long)]
    autoencoder: Option<PathBuf>,

    /// CNN ONNX model
    #[arg(long)]
    cnn: Option<PathBuf>,

    /// Reconstruction error threshold
    #[arg(long)]
    threshold: Option<f64>,

    /// Folder for the generated RGB images
    #[arg(long, alias = "image_folder")]
    image_folder: Option<PathBuf>,

    /// Rows per autoencoder batch
    #[arg(long, alias = "batch_size")]
    batch_size: Option<usize>,

    /// Rows per image generation batch
    #[arg(long, alias = "img_batch")]
    img_batch: Option<usize>,

    /// Images per CNN batch
    #[arg(long, alias = "cnn_batch")]
    cnn_batch: Option<usize>,
}

impl RunArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(csv) = &self.csv {
            config.input.csv_path = csv.clone();
        }
        if let Some(path) = &self.autoencoder {
            config.models.autoencoder_path = path.clone();
        }
        if let Some(path) = &self.cnn {
            config.models.cnn_path = path.clone();
        }
        if let Some(threshold) = self.threshold {
            config.detection.threshold = threshold;
        }
        if let Some(dir) = &self.image_folder {
            config.pipeline.image_dir = dir.clone();
        }
        if let Some(n) = self.batch_size {
            config.pipeline.autoencoder_batch_size = n;
        }
        if let Some(n) = self.img_batch {
            config.pipeline.image_batch_size = n;
        }
        if let Some(n) = self.cnn_batch {
            config.pipeline.cnn_batch_size = n;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command.unwrap_or(Commands::Run(cli.run)) {
        Commands::Run(args) => run(config, &args),
        Commands::Scale {
            input,
            method,
            columns,
            output,
        } => {
            let logging = config.map(|c| c.logging).unwrap_or_else(|_| AppConfig::default().logging);
            init_tracing(&logging);
            scale(&input, &method, columns.as_deref(), output.as_deref())
        }
    }
}

fn load_config(path: Option<&Path>) -> iot_botnet_inference::Result<AppConfig> {
    AppConfig::load_from_path(path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH)))
}

/// Initialize logging to stderr; stdout is reserved for the report.
fn init_tracing(logging: &LoggingConfig) {
    let directive: Directive = format!("iot_botnet_inference={}", logging.level)
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(config: iot_botnet_inference::Result<AppConfig>, args: &RunArgs) -> Result<()> {
    let config = config.and_then(|mut config| {
        args.apply(&mut config);
        config.validate()?;
        Ok(config)
    });

    let report = match config {
        Ok(config) => {
            init_tracing(&config.logging);
            info!("Configuration loaded successfully");
            Pipeline::new(config).run()
        }
        Err(e) => {
            let defaults = AppConfig::default();
            init_tracing(&defaults.logging);
            error!(error = %e, "Invalid configuration");
            let threshold = args.threshold.unwrap_or(defaults.detection.threshold);
            PipelineReport::failure(&e, threshold)
        }
    };

    ReportEmitter::stdout()
        .emit(&report)
        .context("failed to write report to stdout")
}

fn scale(
    input: &Path,
    method: &str,
    columns: Option<&[String]>,
    output: Option<&Path>,
) -> Result<()> {
    let mut emitter = ReportEmitter::stdout();

    let written = match scale_columns(input, method, columns, output) {
        Ok(report) => emitter.emit(&report),
        Err(e) => {
            error!(error = %e, method, "Scaling failed");
            emitter.emit(&ScalingFailure::new(method, &e))
        }
    };
    written.context("failed to write report to stdout")
}

fn scale_columns(
    input: &Path,
    method: &str,
    columns: Option<&[String]>,
    output: Option<&Path>,
) -> Result<ScalingReport, PipelineError> {
    let method: ScalingMethod = method.parse()?;
    let table = FlowReader::new(input).read()?;
    let (report, scaled) = ColumnScaler::new(method).scale(&table, columns)?;

    if let Some(path) = output {
        let file = File::create(path).map_err(|e| PipelineError::artifact(path, e))?;
        scaled.write_csv(BufWriter::new(file))?;
        info!(path = %path.display(), "Scaled table written");
    }

    Ok(report)
}
