//! Solvers for Vendor Assignment

use std::{collections::BTreeMap, io, time::Duration};

use good_lp::ResolutionError;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::{catalog::PriceCatalog, costs::CostModel, shopping::ShoppingList};

pub mod ilp;

/// Solver Errors
#[derive(Debug, Error)]
pub enum SolverError {
    /// An item on the shopping list has no vendor offering it.
    #[error("no vendor offers {item}")]
    ItemUnavailable {
        /// Item without any offer
        item: String,
    },

    /// The backend proved the program has no feasible solution.
    #[error("the assignment program has no feasible solution")]
    Infeasible,

    /// A cost model produced a negative access cost.
    #[error("negative access cost {cost} for vendor {vendor}")]
    NegativeAccessCost {
        /// Vendor name
        vendor: String,
        /// Offending cost
        cost: Decimal,
    },

    /// A price or cost cannot be represented as a finite solver coefficient.
    #[error("amount cannot be represented as a solver coefficient: {value}")]
    CoefficientNotRepresentable {
        /// The amount that failed to convert
        value: Decimal,
    },

    /// The solve did not finish within the configured limit.
    #[error("solver did not finish within {limit:?}")]
    Timeout {
        /// The configured time limit
        limit: Duration,
    },

    /// The worker thread for a time-limited solve could not be started.
    #[error("failed to start solver thread: {0}")]
    Thread(#[source] io::Error),

    /// Wrapped backend failure, other than infeasibility.
    #[error(transparent)]
    Backend(ResolutionError),

    /// Internal solver invariant was violated (this is a bug).
    #[error("solver invariant violated: {message}")]
    InvariantViolation {
        /// What invariant was violated
        message: &'static str,
    },
}

impl SolverError {
    /// Returns `true` when the error means no valid assignment exists, either
    /// because an item has no vendor or because the backend proved infeasibility.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::ItemUnavailable { .. } | Self::Infeasible)
    }
}

impl From<ResolutionError> for SolverError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => Self::Infeasible,
            other => Self::Backend(other),
        }
    }
}

/// Options for a single solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveOptions {
    /// Wall-clock limit for the backend; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl SolveOptions {
    /// Options with a wall-clock limit.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// One shopping-list item and the vendor chosen to supply it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentLine {
    /// Item name
    pub item: String,

    /// Vendor supplying the item
    pub vendor: String,

    /// Unit price paid at that vendor
    pub unit_price: Decimal,
}

/// Result of a vendor assignment solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    lines: Vec<AssignmentLine>,
    visits: BTreeMap<String, Decimal>,
    total_cost: Decimal,
}

impl Assignment {
    /// Create an assignment from chosen lines and visited vendors (with their
    /// access costs). The total is the exact sum of both.
    pub fn new(lines: Vec<AssignmentLine>, visits: BTreeMap<String, Decimal>) -> Self {
        let total_cost = lines.iter().map(|line| line.unit_price).sum::<Decimal>()
            + visits.values().copied().sum::<Decimal>();

        Self {
            lines,
            visits,
            total_cost,
        }
    }

    /// Chosen lines, in shopping-list order.
    pub fn lines(&self) -> &[AssignmentLine] {
        &self.lines
    }

    /// Lines sourced from the given vendor.
    pub fn lines_for<'a>(&'a self, vendor: &'a str) -> impl Iterator<Item = &'a AssignmentLine> {
        self.lines.iter().filter(move |line| line.vendor == vendor)
    }

    /// Vendor supplying an item.
    pub fn vendor_for(&self, item: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| line.item == item)
            .map(|line| line.vendor.as_str())
    }

    /// Visited vendors, in lexical order.
    pub fn visited(&self) -> impl Iterator<Item = &str> {
        self.visits.keys().map(String::as_str)
    }

    /// Returns `true` if the vendor is visited.
    pub fn is_visited(&self, vendor: &str) -> bool {
        self.visits.contains_key(vendor)
    }

    /// Access cost paid for a visited vendor.
    pub fn access_cost(&self, vendor: &str) -> Option<Decimal> {
        self.visits.get(vendor).copied()
    }

    /// Sum of chosen unit prices.
    pub fn item_cost(&self) -> Decimal {
        self.lines.iter().map(|line| line.unit_price).sum()
    }

    /// Sum of access costs of visited vendors.
    pub fn access_cost_total(&self) -> Decimal {
        self.visits.values().copied().sum()
    }

    /// Optimal total cost.
    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    /// Returns `true` when the visited vendors are exactly the vendors that supply
    /// at least one item.
    pub fn visits_match_lines(&self) -> bool {
        let used_everywhere_visited = self
            .lines
            .iter()
            .all(|line| self.visits.contains_key(&line.vendor));

        let visited_all_used = self
            .visits
            .keys()
            .all(|vendor| self.lines.iter().any(|line| &line.vendor == vendor));

        used_everywhere_visited && visited_all_used
    }
}

/// Trait for solving vendor assignment problems
pub trait Solver {
    /// Choose a vendor for every item on the shopping list, minimising unit prices
    /// plus access costs of the visited vendors.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if an item cannot be sourced, the program is
    /// infeasible, or the backend fails.
    fn solve(
        catalog: &PriceCatalog,
        shopping_list: &ShoppingList,
        cost_model: &dyn CostModel,
    ) -> Result<Assignment, SolverError>;
}
