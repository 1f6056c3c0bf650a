use satsim::{ScenarioConfig, Scenario, Simulation};
use satsim::{bench_integrators, bench_compositors};

use clap::Parser;
use anyhow::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "satsim")]
#[command(about = "Satellites around a fixed center, rendered as an inverse-distance color field")]
struct Args {
    /// Scenario file under scenarios/
    #[arg(short, long = "file", default_value = "default.yaml")]
    file_name: String,

    /// Frames to run
    #[arg(long, default_value = "10")]
    frames: u64,

    /// Override the initializer seed
    #[arg(long)]
    seed: Option<u64>,

    /// Run the reference vs accelerated benchmarks instead
    #[arg(long)]
    bench: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    let scenario_cfg = ScenarioConfig::from_yaml_file(&config_path)
        .with_context(|| format!("failed to load scenario {}", config_path.display()))?;
    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    if args.bench {
        bench_integrators()?;
        bench_compositors()?;
        return Ok(());
    }

    let mut scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    if let Some(seed) = args.seed {
        scenario_cfg.parameters.seed = Some(seed);
    }

    let scenario = Scenario::build_scenario(scenario_cfg).context("invalid scenario")?;
    info!(
        bodies = scenario.store.len(),
        width = scenario.parameters.width,
        height = scenario.parameters.height,
        substeps = scenario.parameters.substeps,
        backend = ?scenario.engine.backend,
        seed = ?scenario.seed,
        "starting simulation"
    );

    let mut sim = Simulation::new(scenario).context("failed to set up execution backend")?;

    for _ in 0..args.frames {
        sim.advance_frame()?;
    }

    if let Some((physics, coloring, total)) = sim.stats().averages() {
        info!(
            frames = sim.frame(),
            "done, averaged {} + {} = {} ms",
            physics.as_millis(),
            coloring.as_millis(),
            total.as_millis()
        );
    }

    Ok(())
}
