//! ILP Observer

use good_lp::{Expression, Variable};
use rust_decimal::Decimal;
use tracing::trace;

/// Observer trait for capturing the ILP formulation as it's built.
///
/// The solver remains the only implementation of ILP construction; observers
/// passively record what happens for rendering or analysis purposes. All callbacks
/// run on the calling thread, before the backend is invoked.
pub trait ILPObserver {
    /// Called when a visit variable is created for a vendor.
    ///
    /// # Parameters
    ///
    /// - `vendor`: Vendor name
    /// - `var`: The binary decision variable
    /// - `access_cost`: Fixed cost paid if the vendor is visited
    fn on_visit_variable(&mut self, vendor: &str, var: Variable, access_cost: Decimal);

    /// Called when a buy variable is created for an item/vendor pair.
    ///
    /// # Parameters
    ///
    /// - `item`: Item name
    /// - `vendor`: Vendor offering the item
    /// - `var`: The binary decision variable
    /// - `unit_price`: Price paid if the item is sourced there
    fn on_buy_variable(&mut self, item: &str, vendor: &str, var: Variable, unit_price: Decimal);

    /// Called when a term is added to the objective function.
    fn on_objective_term(&mut self, _var: Variable, _coefficient: f64) {}

    /// Called when the coverage constraint (`Σ buy = 1`) is added for an item.
    fn on_coverage_constraint(&mut self, item: &str, constraint_expr: &Expression);

    /// Called when a linking constraint (`buy - visit <= 0`) is added.
    fn on_linking_constraint(&mut self, _item: &str, _vendor: &str, _constraint_expr: &Expression) {
    }

    /// Called when a usage constraint (`visit - Σ buy <= 0`) is added for a vendor.
    fn on_usage_constraint(&mut self, _vendor: &str, _constraint_expr: &Expression) {}
}

/// No-op observer for unobserved solves.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl ILPObserver for NoopObserver {
    fn on_visit_variable(&mut self, _: &str, _: Variable, _: Decimal) {}

    fn on_buy_variable(&mut self, _: &str, _: &str, _: Variable, _: Decimal) {}

    fn on_coverage_constraint(&mut self, _: &str, _: &Expression) {}
}

/// Observer that emits each step of the formulation as `trace` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ILPObserver for TracingObserver {
    fn on_visit_variable(&mut self, vendor: &str, var: Variable, access_cost: Decimal) {
        trace!(vendor, ?var, %access_cost, "visit variable");
    }

    fn on_buy_variable(&mut self, item: &str, vendor: &str, var: Variable, unit_price: Decimal) {
        trace!(item, vendor, ?var, %unit_price, "buy variable");
    }

    fn on_objective_term(&mut self, var: Variable, coefficient: f64) {
        trace!(?var, coefficient, "objective term");
    }

    fn on_coverage_constraint(&mut self, item: &str, _constraint_expr: &Expression) {
        trace!(item, "coverage constraint");
    }

    fn on_linking_constraint(&mut self, item: &str, vendor: &str, _constraint_expr: &Expression) {
        trace!(item, vendor, "linking constraint");
    }

    fn on_usage_constraint(&mut self, vendor: &str, _constraint_expr: &Expression) {
        trace!(vendor, "usage constraint");
    }
}
