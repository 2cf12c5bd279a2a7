//! sph2d headless runner
//!
//! Usage: `sph2d [config.json] [--steps N]`
//!
//! Without a config file a periodic unit box of 1000 particles is simulated.
//! Diagnostics are printed to stdout as one JSON object per step.

use std::io::Write;
use std::process::ExitCode;

use sph2d::sim::{SpawnerConfig, UniformRect};
use sph2d::{Result, Simulation, SimulationConfig};

const DEFAULT_STEPS: u64 = 100;

struct Args {
    config: Option<String>,
    steps: u64,
}

fn parse_args() -> std::result::Result<Args, String> {
    let mut args = Args {
        config: None,
        steps: DEFAULT_STEPS,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--steps" | "-n" => {
                let value = iter.next().ok_or("--steps needs a value")?;
                args.steps = value
                    .parse()
                    .map_err(|_| format!("invalid step count `{value}`"))?;
            }
            "--help" | "-h" => {
                return Err("usage: sph2d [config.json] [--steps N]".to_string());
            }
            _ if args.config.is_none() => args.config = Some(arg),
            _ => return Err(format!("unexpected argument `{arg}`")),
        }
    }
    Ok(args)
}

fn default_config() -> SimulationConfig {
    SimulationConfig {
        dt: 1e-3,
        start: vec![SpawnerConfig::UniformRect(UniformRect::unit(1000, 12345678))],
        ..Default::default()
    }
    .with_periodic_box(0.0, 1.0)
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            log::info!("Loading config from {path}");
            SimulationConfig::load(path)?
        }
        None => default_config(),
    };
    let mut sim = Simulation::new(config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for _ in 0..args.steps {
        sim.step();
        let diagnostics = sim.diagnostics();
        if !diagnostics.is_finite() {
            log::warn!("non-finite diagnostics at step {}", diagnostics.step);
        }
        serde_json::to_writer(&mut out, &diagnostics)?;
        writeln!(out)?;
    }
    log::info!(
        "Finished {} steps, t = {:.5}, {} particles",
        sim.step_count(),
        sim.time(),
        sim.particles().len()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
