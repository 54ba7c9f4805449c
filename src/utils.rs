//! Utils

use clap::Parser;
use rust_decimal::Decimal;

/// Arguments for the demos
#[derive(Debug, Parser)]
pub struct DemoArgs {
    /// Price set to load from `fixtures/prices`
    #[clap(short, long, default_value = "supermarkets")]
    pub prices: String,

    /// Scenario to load from `fixtures/scenarios`
    #[clap(short, long, default_value = "supermarkets")]
    pub scenario: String,

    /// Override the access cost of every vendor other than the near vendor
    #[clap(short, long)]
    pub far_cost: Option<Decimal>,

    /// Directory holding the `prices` and `scenarios` sets
    #[clap(long, default_value = "./fixtures")]
    pub fixtures: String,
}
