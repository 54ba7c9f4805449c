//! Scenarios
//!
//! A scenario is the configuration surface of a run: what to buy, how much it
//! costs to reach each vendor, which parameter to sweep, and solver limits.
//!
//! ```yaml
//! currency: SAR
//! shopping_list: [Milk, Eggs, Chicken, Rice]
//! costs:
//!   near_vendor: Supermarket A
//!   near_cost: 5
//!   far_cost: 15
//! sweep:
//!   target_vendor: Supermarket B
//!   start: 0
//!   end: 30
//!   step: 1
//! solver:
//!   timeout_ms: 10000
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    catalog::{CatalogError, DuplicatePolicy, PriceCatalog},
    costs::{TwoTierCostModel, VendorCostTable},
    repository::{PriceRepository, RepositoryError, yaml::parse_currency},
    shopping::ShoppingList,
    solvers::SolveOptions,
    sweep::SweepRange,
};

/// Scenario Errors
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// IO error reading a scenario file
    #[error("failed to read scenario file {path}: {source}")]
    Io {
        /// File that failed to read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("failed to parse scenario: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Wrapped repository error
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Wrapped catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The scenario has no sweep section
    #[error("scenario has no sweep section")]
    MissingSweep,
}

/// Access cost settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CostsConfig {
    /// Vendor charged `near_cost`
    pub near_vendor: String,

    /// Access cost of the near vendor
    pub near_cost: Decimal,

    /// Access cost of every other vendor
    pub far_cost: Decimal,
}

/// Sweep settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SweepConfig {
    /// Vendor whose visit decision is tracked; its access cost is swept
    pub target_vendor: String,

    /// First swept value
    pub start: Decimal,

    /// Last swept value
    pub end: Decimal,

    /// Distance between swept values
    #[serde(default = "default_step")]
    pub step: Decimal,
}

impl SweepConfig {
    /// Swept values as a range.
    pub fn range(&self) -> SweepRange {
        SweepRange::new(self.start, self.end, self.step)
    }
}

fn default_step() -> Decimal {
    Decimal::ONE
}

/// Solver settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock limit per solve in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Scenario
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scenario {
    /// ISO 4217 code used to display amounts
    pub currency: String,

    /// Items to buy
    pub shopping_list: ShoppingList,

    /// Access costs
    pub costs: CostsConfig,

    /// Optional sensitivity sweep
    #[serde(default)]
    pub sweep: Option<SweepConfig>,

    /// Solver limits
    #[serde(default)]
    pub solver: SolverConfig,

    /// Treatment of repeated item/vendor records
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

impl Scenario {
    /// Load `<base_path>/scenarios/<name>.yml`.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] if the file cannot be read or parsed.
    pub fn from_set(base_path: impl AsRef<Path>, name: &str) -> Result<Self, ScenarioError> {
        Self::from_file(
            base_path
                .as_ref()
                .join("scenarios")
                .join(format!("{name}.yml")),
        )
    }

    /// Load a scenario file.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents)
    }

    /// Parse scenario YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Yaml`] for invalid YAML, an empty shopping list, or
    /// missing fields.
    pub fn parse(contents: &str) -> Result<Self, ScenarioError> {
        Ok(serde_norway::from_str(contents)?)
    }

    /// Currency used to display amounts.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::UnknownCurrency`] (wrapped) for an unknown code.
    pub fn currency(&self) -> Result<&'static Currency, ScenarioError> {
        Ok(parse_currency(&self.currency)?)
    }

    /// Cost model described by the `costs` section.
    pub fn cost_model(&self) -> TwoTierCostModel {
        TwoTierCostModel::new(
            self.costs.near_vendor.clone(),
            self.costs.near_cost,
            self.costs.far_cost,
        )
    }

    /// Cost model for one swept value: the sweep target is charged `value` and
    /// every other vendor keeps its `costs` section price.
    pub fn swept_cost_model(&self, target_vendor: &str, value: Decimal) -> VendorCostTable {
        VendorCostTable::new(self.costs.far_cost)
            .with_cost(self.costs.near_vendor.clone(), self.costs.near_cost)
            .with_cost(target_vendor, value)
    }

    /// Solve options described by the `solver` section.
    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            timeout: self.solver.timeout_ms.map(Duration::from_millis),
        }
    }

    /// The sweep section.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::MissingSweep`] if the scenario has none.
    pub fn sweep(&self) -> Result<&SweepConfig, ScenarioError> {
        self.sweep.as_ref().ok_or(ScenarioError::MissingSweep)
    }

    /// Build a catalog restricted to the shopping list from a repository.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] if the repository cannot be read or the catalog
    /// cannot be built.
    pub fn load_catalog(
        &self,
        repository: &dyn PriceRepository,
    ) -> Result<PriceCatalog, ScenarioError> {
        let records = repository.records()?;

        Ok(PriceCatalog::build_with_policy(
            records,
            Some(&self.shopping_list),
            self.duplicates,
        )?)
    }
}
