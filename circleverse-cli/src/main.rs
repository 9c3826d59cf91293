//! Circleverse simulation CLI.
//!
//! Build a population, then either run it to a given month in one go or
//! drive it interactively from stdin.

mod controller;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use circleverse_core::{
    ScenarioConfig, Simulation, example_simulation, random_simulation, simulation_from_scenario,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use controller::{Command as ControlCommand, Controller};

const DEFAULT_SEED: u64 = 42;

#[derive(Parser)]
#[command(name = "circleverse")]
#[command(about = "Simulate household wealth across towns with different economies")]
struct Cli {
    #[command(flatten)]
    population: PopulationArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct PopulationArgs {
    /// Seed for population generation and monthly noise [default: 42, or
    /// the scenario file's seed]
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Load towns from a JSON scenario file instead of the example economy
    #[arg(long, global = true, conflicts_with = "random")]
    scenario: Option<PathBuf>,

    /// Generate TOWNS random towns of HOUSEHOLDS households each
    #[arg(long, num_args = 2, value_names = ["TOWNS", "HOUSEHOLDS"], global = true)]
    random: Option<Vec<usize>>,
}

#[derive(Subcommand)]
enum Command {
    /// Run to a month, print statistics and optionally export
    Run {
        /// Month to run until
        #[arg(short, long, default_value = "12")]
        months: u32,

        /// Write the household history to this CSV file
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Record every simulation event into a timestamped folder of CSV
        /// tables under this directory
        #[arg(long, value_name = "DIR")]
        capture: Option<PathBuf>,
    },

    /// Read commands from stdin (the default)
    Interactive,
}

impl PopulationArgs {
    fn build(&self) -> Result<Simulation> {
        if let Some(path) = &self.scenario {
            let mut scenario = ScenarioConfig::from_file(path)
                .with_context(|| format!("loading scenario {}", path.display()))?;
            if let Some(seed) = self.seed {
                scenario.seed = seed;
            }
            return Ok(simulation_from_scenario(&scenario)?);
        }
        let seed = self.seed.unwrap_or(DEFAULT_SEED);
        if let Some(counts) = &self.random {
            let (towns, households) = (counts[0], counts[1]);
            return random_simulation(towns, households, seed).context("generating random towns");
        }
        Ok(example_simulation(seed)?)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "circleverse=info,circleverse_core=warn".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let sim = cli.population.build()?;
    tracing::info!(
        towns = sim.towns().len(),
        households = sim.households().count(),
        seed = ?cli.population.seed,
        "population ready"
    );

    let mut controller = Controller::new(sim);
    match cli.command.unwrap_or(Command::Interactive) {
        Command::Run {
            months,
            export,
            capture,
        } => {
            let mut stdout = std::io::stdout().lock();
            controller.run_batch(months, capture.as_deref(), &mut stdout)?;
            if let Some(path) = export {
                controller.execute(ControlCommand::Export(path.display().to_string()), &mut stdout)?;
            }
        }
        Command::Interactive => {
            let stdin = std::io::stdin();
            controller.run_interactive(stdin.lock(), std::io::stdout())?;
        }
    }
    Ok(())
}
