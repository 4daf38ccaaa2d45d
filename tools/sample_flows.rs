//! Sample Flow Generator
//!
//! Writes a synthetic aggregated-flow CSV for exercising the inference
//! pipeline without captured traffic.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "sample_flows")]
#[command(about = "Generate a synthetic IoT flow statistics CSV", long_about = None)]
struct Cli {
    /// Number of rows to generate
    #[arg(short, long, default_value = "1000")]
    rows: usize,

    /// Share of botnet-like rows, between 0 and 1
    #[arg(short, long, default_value = "0.1")]
    botnet_rate: f64,

    /// Number of distinct devices
    #[arg(short, long, default_value = "25")]
    devices: u32,

    /// Seed for reproducible output
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// One row in the layout the pipeline reads
#[derive(Debug, Serialize)]
struct FlowRecord {
    device_id: String,
    inbound_length_count: u32,
    inbound_length_mean: f64,
    inbound_length_std: f64,
    outbound_length_count: u32,
    outbound_length_mean: f64,
    outbound_length_std: f64,
    label: &'static str,
}

/// Flow window generator
struct FlowGenerator {
    rng: StdRng,
    devices: u32,
}

impl FlowGenerator {
    fn new(seed: Option<u64>, devices: u32) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            devices: devices.max(1),
        }
    }

    fn device_id(&mut self) -> String {
        format!("iot-{:03}", self.rng.gen_range(0..self.devices))
    }

    /// Sparse, mixed-size telemetry traffic
    fn generate_benign(&mut self) -> FlowRecord {
        FlowRecord {
            device_id: self.device_id(),
            inbound_length_count: self.rng.gen_range(5..120),
            inbound_length_mean: self.rng.gen_range(80.0..900.0),
            inbound_length_std: self.rng.gen_range(20.0..400.0),
            outbound_length_count: self.rng.gen_range(5..100),
            outbound_length_mean: self.rng.gen_range(60.0..600.0),
            outbound_length_std: self.rng.gen_range(10.0..300.0),
            label: "benign",
        }
    }

    /// Floods of small, uniform packets from a scanning or attacking bot
    fn generate_botnet(&mut self) -> FlowRecord {
        let label = if self.rng.gen_bool(0.5) { "mirai" } else { "gafgyt" };
        FlowRecord {
            device_id: self.device_id(),
            inbound_length_count: self.rng.gen_range(0..10),
            inbound_length_mean: self.rng.gen_range(40.0..80.0),
            inbound_length_std: self.rng.gen_range(0.0..5.0),
            outbound_length_count: self.rng.gen_range(500..5000),
            outbound_length_mean: self.rng.gen_range(54.0..74.0),
            outbound_length_std: self.rng.gen_range(0.0..3.0),
            label,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_flows=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let botnet_rate = cli.botnet_rate.clamp(0.0, 1.0);

    info!(
        rows = cli.rows,
        botnet_rate,
        devices = cli.devices,
        seed = ?cli.seed,
        "Generating sample flows"
    );

    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    let mut writer = csv::Writer::from_writer(sink);

    let mut generator = FlowGenerator::new(cli.seed, cli.devices);
    let mut botnet_rows = 0usize;

    for _ in 0..cli.rows {
        let record = if generator.rng.gen_bool(botnet_rate) {
            botnet_rows += 1;
            generator.generate_botnet()
        } else {
            generator.generate_benign()
        };
        writer.serialize(&record)?;
    }
    writer.flush()?;

    info!(
        rows = cli.rows,
        botnet_rows,
        "Sample flows written"
    );

    Ok(())
}
