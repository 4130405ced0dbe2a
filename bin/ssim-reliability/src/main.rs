//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Binary entrypoint for the grid reliability simulator."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ssim_common::config::{hours_to_seconds, AppConfig};
use ssim_common::logging::init_tracing;
use ssim_reliability::{
    GeneratorStatus, GridReliabilityModel, ReliabilityError, ReliabilityRunner, StaticTopology,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Grid component reliability simulator",
    long_about = "Samples failures and repairs for every line, switch, and generator of a grid \
                  and writes the resulting event stream as JSON lines."
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Grid topology description (JSON or YAML)")]
    topology: PathBuf,

    #[arg(long, default_value_t = 24.0, help = "Simulated horizon in hours")]
    hours: f64,

    #[arg(
        long,
        default_value_t = 1.0,
        help = "Minimum spacing between ticks in seconds"
    )]
    resolution: f64,

    #[arg(long, help = "Override the configured RNG seed")]
    seed: Option<u64>,

    #[arg(long, value_name = "FILE", help = "Write events here instead of stdout")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/reliability.yaml"));
    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    init_tracing("ssim-reliability", &config.logging)?;
    info!(config = %loaded.source.display(), "configuration loaded");

    if let Some(seed) = cli.seed {
        config.reliability.seed = Some(seed);
    }
    if !cli.hours.is_finite() || cli.hours < 0.0 {
        bail!("--hours must be a non-negative number (got {})", cli.hours);
    }

    let topology = StaticTopology::from_path(&cli.topology)
        .with_context(|| format!("unable to load topology {}", cli.topology.display()))?;
    let model = GridReliabilityModel::new(&config.reliability, &topology)
        .context("failed to build grid reliability model")?;
    info!(
        seed = model.seed(),
        components = model.component_count(),
        hours = cli.hours,
        "starting reliability run"
    );

    let generators: Vec<String> = model.generator_names().map(str::to_owned).collect();
    let mut runner = ReliabilityRunner::new(model, cli.resolution)?;

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("unable to create output {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    // Generators are assumed to run continuously, so operating time tracks wall time.
    let summary = runner.run(
        hours_to_seconds(cli.hours),
        |time| {
            generators
                .iter()
                .map(|name| GeneratorStatus::new(name.clone(), time))
                .collect()
        },
        |event| {
            let line = serde_json::to_string(&event).map_err(ReliabilityError::Encode)?;
            writeln!(out, "{line}")?;
            Ok(())
        },
    )?;
    out.flush()?;

    info!(
        ticks = summary.ticks,
        failures = summary.failures,
        restorations = summary.restorations,
        end_time = ?summary.end_time,
        still_failed = ?runner.model().failed_elements(),
        "simulation finished"
    );
    Ok(())
}
