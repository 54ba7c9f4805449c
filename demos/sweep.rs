//! Sweep Example
//!
//! Re-solves a scenario across a range of access costs for the sweep target and
//! reports where its visit decision flips.
//!
//! Use `-p` to load a price set by name
//! Use `-s` to load a scenario by name

use std::{io, time::Instant};

use anyhow::Result;

use clap::Parser;
use shopwise::{
    report::SweepReport, repository::YamlPriceRepository, scenario::Scenario, sweep::sweep,
    utils::DemoArgs,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Sweep Example
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
    let config = scenario.sweep()?;
    let values = config.range().values()?;

    let start = Instant::now();

    let result = sweep(
        &catalog,
        &scenario.shopping_list,
        &config.target_vendor,
        |value| scenario.swept_cost_model(&config.target_vendor, value),
        &values,
        &scenario.solve_options(),
    )?;

    let elapsed = start.elapsed().as_secs_f32();

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    SweepReport::new(&result, scenario.currency()?).write_to(&mut handle)?;

    println!("Sweep: {} solves in {elapsed}s", values.len());

    Ok(())
}
