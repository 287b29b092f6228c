// mazenav_sim/src/main.rs

use std::process::ExitCode;

use clap::Parser;
use mazenav_sim::prelude::*;
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    match run(&cli) {
        Ok(report) => {
            info!(
                "final pose ({:.1}, {:.1}, {:.3}), estimate ({:.1}, {:.1}, {:.3})",
                report.final_pose.x,
                report.final_pose.y,
                report.final_pose.theta,
                report.final_estimate.x,
                report.final_estimate.y,
                report.final_estimate.theta,
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<RunReport, SimError> {
    let mut config = ScenarioConfig::load(&cli.scenario)?;
    // Command-line overrides win over the scenario file.
    if let Some(steps) = cli.steps {
        config.simulation.steps = steps;
    }
    if cli.seed.is_some() {
        config.simulation.seed = cli.seed;
    }

    let mut simulation = Simulation::from_config(&config)?;
    simulation.run(config.simulation.steps)
}
