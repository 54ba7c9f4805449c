//! Optimize Example
//!
//! Solves one vendor assignment for a scenario and prints the breakdown.
//!
//! Use `-p` to load a price set by name
//! Use `-s` to load a scenario by name
//! Use `-f` to override the far vendor access cost

use std::{io, time::Instant};

use anyhow::Result;

use clap::Parser;
use shopwise::{
    report::AssignmentReport,
    repository::YamlPriceRepository,
    scenario::Scenario,
    solvers::ilp::{ILPSolver, TracingObserver},
    utils::DemoArgs,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Optimize Example
#[expect(clippy::print_stdout, reason = "Example code")]
pub fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().compact().with_target(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = DemoArgs::parse();

    let scenario = Scenario::from_set(&args.fixtures, &args.scenario)?;
    let repository = YamlPriceRepository::from_set(&args.fixtures, &args.prices);

    let catalog = scenario.load_catalog(&repository)?;

    let mut cost_model = scenario.cost_model();

    if let Some(far_cost) = args.far_cost {
        cost_model = cost_model.with_far_cost(far_cost);
    }

    let start = Instant::now();

    let assignment = ILPSolver::solve_with_options(
        &catalog,
        &scenario.shopping_list,
        &cost_model,
        &scenario.solve_options(),
        &mut TracingObserver,
    )?;

    let elapsed = start.elapsed().as_secs_f32();

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    AssignmentReport::new(&assignment, scenario.currency()?).write_to(&mut handle)?;

    println!("Solution: {elapsed}s");

    Ok(())
}
