//! ILP Solver
//!
//! Formulates vendor assignment as a binary integer program:
//!
//! - `buy[i, v]` is 1 when item `i` is sourced from vendor `v` (only for vendors
//!   offering `i`); `visit[v]` is 1 when vendor `v` is visited at all.
//! - The objective is `Σ price[i, v] · buy[i, v] + Σ access_cost[v] · visit[v]`, so
//!   an access cost is paid once however many items are bought there.
//! - Coverage: `Σ_v buy[i, v] = 1` for each item.
//! - Linking: `buy[i, v] <= visit[v]`; nothing is bought from an unvisited vendor.
//! - Usage: `visit[v] <= Σ_i buy[i, v]`; no vendor is visited without being used.

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::Duration,
};

use good_lp::{Expression, SolverModel};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as default_solver;
#[cfg(all(not(feature = "solver-highs"), feature = "solver-microlp"))]
use good_lp::solvers::microlp::microlp as default_solver;

use crate::{
    catalog::PriceCatalog,
    costs::CostModel,
    shopping::ShoppingList,
    solvers::{
        Assignment, SolveOptions, Solver, SolverError,
        ilp::state::{ConstraintRelation, ILPConstraint},
    },
};

pub mod observer;
pub(crate) mod state;

pub use observer::{ILPObserver, NoopObserver, TracingObserver};
pub use state::ILPState;

/// Binary threshold for determining truthiness
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Solver using Integer Linear Programming (ILP)
#[derive(Debug)]
pub struct ILPSolver;

impl ILPSolver {
    /// Solve with options and an observer for capturing the ILP formulation.
    ///
    /// The observer receives every variable, objective term and constraint as the
    /// formulation is built. When `options.timeout` is set, the backend runs on a
    /// worker thread and the call returns [`SolverError::Timeout`] once the limit
    /// expires; the abandoned worker finishes in the background.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if an item has no vendor, a cost is negative or not
    /// representable, the program is infeasible, the backend fails, or the time
    /// limit expires.
    #[tracing::instrument(
        name = "ilp.solve",
        skip_all,
        fields(items = shopping_list.len(), vendors = catalog.vendors().len())
    )]
    pub fn solve_with_options(
        catalog: &PriceCatalog,
        shopping_list: &ShoppingList,
        cost_model: &dyn CostModel,
        options: &SolveOptions,
        observer: &mut dyn ILPObserver,
    ) -> Result<Assignment, SolverError> {
        let state = Self::formulate(catalog, shopping_list, cost_model, observer)?;

        debug!(
            variables = state.variable_count(),
            constraints = state.constraint_count(),
            "formulated assignment program"
        );

        let assignment = match options.timeout {
            Some(limit) => solve_state_with_time_limit(state, limit)?,
            None => solve_state(state)?,
        };

        debug!(
            total_cost = %assignment.total_cost(),
            visited = assignment.visited().count(),
            "solved assignment program"
        );

        Ok(assignment)
    }

    /// Build the complete formulation without solving it.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::ItemUnavailable`] if an item has no vendor,
    /// [`SolverError::NegativeAccessCost`] for a negative access cost, and
    /// [`SolverError::CoefficientNotRepresentable`] if an amount has no finite
    /// `f64` value.
    pub fn formulate(
        catalog: &PriceCatalog,
        shopping_list: &ShoppingList,
        cost_model: &dyn CostModel,
        observer: &mut dyn ILPObserver,
    ) -> Result<ILPState, SolverError> {
        // Fail on the first unsourceable item before building anything.
        if let Some(item) = shopping_list
            .iter()
            .find(|item| !catalog.contains_item(item))
        {
            return Err(SolverError::ItemUnavailable {
                item: item.to_string(),
            });
        }

        let mut state = ILPState::new(shopping_list);

        build_visit_variables(catalog, cost_model, &mut state, observer)?;
        build_buy_variables(catalog, shopping_list, &mut state, observer)?;

        add_coverage_constraints(&mut state, observer);
        add_linking_constraints(&mut state, observer);
        add_usage_constraints(&mut state, observer);

        Ok(state)
    }
}

impl Solver for ILPSolver {
    fn solve(
        catalog: &PriceCatalog,
        shopping_list: &ShoppingList,
        cost_model: &dyn CostModel,
    ) -> Result<Assignment, SolverError> {
        let mut observer = NoopObserver;

        Self::solve_with_options(
            catalog,
            shopping_list,
            cost_model,
            &SolveOptions::default(),
            &mut observer,
        )
    }
}

/// Create a visit variable for every catalog vendor and add its access cost to
/// the objective.
fn build_visit_variables(
    catalog: &PriceCatalog,
    cost_model: &dyn CostModel,
    state: &mut ILPState,
    observer: &mut dyn ILPObserver,
) -> Result<(), SolverError> {
    for vendor in catalog.vendors() {
        let access_cost = cost_model.access_cost(vendor);

        if access_cost < Decimal::ZERO {
            return Err(SolverError::NegativeAccessCost {
                vendor: vendor.clone(),
                cost: access_cost,
            });
        }

        let coefficient = decimal_to_f64(access_cost)?;
        let (_vendor_idx, var) = state.add_visit_variable(vendor, access_cost);

        state.add_to_objective(var, coefficient);

        observer.on_visit_variable(vendor, var, access_cost);
        observer.on_objective_term(var, coefficient);
    }

    Ok(())
}

/// Create a buy variable for every (listed item, offering vendor) pair and add the
/// unit price to the objective.
fn build_buy_variables(
    catalog: &PriceCatalog,
    shopping_list: &ShoppingList,
    state: &mut ILPState,
    observer: &mut dyn ILPObserver,
) -> Result<(), SolverError> {
    for (item_idx, item) in shopping_list.iter().enumerate() {
        let offers = catalog
            .offers(item)
            .ok_or_else(|| SolverError::ItemUnavailable {
                item: item.to_string(),
            })?;

        for (vendor, unit_price) in offers {
            let vendor_idx = state
                .vendor_index(vendor)
                .ok_or(SolverError::InvariantViolation {
                    message: "offer from a vendor without a visit variable",
                })?;

            let coefficient = decimal_to_f64(*unit_price)?;
            let var = state.add_buy_variable(item_idx, vendor_idx, *unit_price);

            state.add_to_objective(var, coefficient);

            observer.on_buy_variable(item, vendor, var, *unit_price);
            observer.on_objective_term(var, coefficient);
        }
    }

    Ok(())
}

/// Each item is sourced from exactly one vendor.
fn add_coverage_constraints(state: &mut ILPState, observer: &mut dyn ILPObserver) {
    let coverage: Vec<Expression> = (0..state.item_count())
        .map(|item_idx| {
            state
                .buy_variables()
                .iter()
                .filter(|buy| buy.item_idx == item_idx)
                .map(|buy| buy.var)
                .sum()
        })
        .collect();

    for (item_idx, expr) in coverage.into_iter().enumerate() {
        if let Some(item) = state.item(item_idx) {
            observer.on_coverage_constraint(item, &expr);
        }

        state.add_eq_constraint(expr, 1.0);
    }
}

/// An item can only be sourced from a visited vendor.
fn add_linking_constraints(state: &mut ILPState, observer: &mut dyn ILPObserver) {
    let mut linking = Vec::with_capacity(state.buy_variables().len());

    for buy in state.buy_variables() {
        let Some(&visit) = state.visit_variables().get(buy.vendor_idx) else {
            continue;
        };

        let mut lhs = Expression::from(buy.var);
        lhs += visit * -1.0;

        if let (Some(item), Some(vendor)) = (state.item(buy.item_idx), state.vendor(buy.vendor_idx))
        {
            observer.on_linking_constraint(item, vendor, &lhs);
        }

        linking.push(lhs);
    }

    for lhs in linking {
        state.add_leq_constraint(lhs, 0.0);
    }
}

/// A vendor is only visited when it supplies at least one item.
fn add_usage_constraints(state: &mut ILPState, observer: &mut dyn ILPObserver) {
    let mut usage = Vec::with_capacity(state.visit_variables().len());

    for (vendor_idx, &visit) in state.visit_variables().iter().enumerate() {
        let mut lhs = Expression::from(visit);

        for buy in state
            .buy_variables()
            .iter()
            .filter(|buy| buy.vendor_idx == vendor_idx)
        {
            lhs += buy.var * -1.0;
        }

        if let Some(vendor) = state.vendor(vendor_idx) {
            observer.on_usage_constraint(vendor, &lhs);
        }

        usage.push(lhs);
    }

    for lhs in usage {
        state.add_leq_constraint(lhs, 0.0);
    }
}

/// Hand the formulation to the backend and read the assignment back.
fn solve_state(state: ILPState) -> Result<Assignment, SolverError> {
    let (pb, cost, constraints, layout) = state.into_parts_with_constraints();

    let model = apply_recorded_constraints(pb.minimise(cost).using(default_solver), constraints);

    let solution = model.solve()?;

    layout.read_assignment(&solution)
}

/// Solve on a worker thread, giving up after `limit`.
fn solve_state_with_time_limit(state: ILPState, limit: Duration) -> Result<Assignment, SolverError> {
    let (tx, rx) = mpsc::sync_channel(1);

    thread::Builder::new()
        .name("ilp-solve".to_string())
        .spawn(move || {
            if tx.send(solve_state(state)).is_err() {
                debug!("solve finished after the caller stopped waiting");
            }
        })
        .map_err(SolverError::Thread)?;

    await_solve(&rx, limit)
}

/// Wait up to `limit` for the worker's result.
fn await_solve(
    rx: &Receiver<Result<Assignment, SolverError>>,
    limit: Duration,
) -> Result<Assignment, SolverError> {
    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!(?limit, "solver timed out");

            Err(SolverError::Timeout { limit })
        }
        Err(RecvTimeoutError::Disconnected) => Err(SolverError::InvariantViolation {
            message: "solver thread exited without a result",
        }),
    }
}

fn apply_recorded_constraints<S: SolverModel>(mut model: S, constraints: Vec<ILPConstraint>) -> S {
    for constraint in constraints {
        model = match constraint.relation {
            ConstraintRelation::Eq => model.with(constraint.lhs.eq(constraint.rhs)),
            ConstraintRelation::Leq => model.with(constraint.lhs.leq(constraint.rhs)),
        };
    }

    model
}

/// Convert a decimal amount to a finite solver coefficient.
///
/// `good_lp` stores coefficients as `f64`; the reported total is recomputed from
/// the decimals, so only the ranking of alternatives depends on this conversion.
///
/// # Errors
///
/// Returns [`SolverError::CoefficientNotRepresentable`] if the value has no finite
/// `f64` image.
pub fn decimal_to_f64(value: Decimal) -> Result<f64, SolverError> {
    value
        .to_f64()
        .filter(|f| f.is_finite())
        .ok_or(SolverError::CoefficientNotRepresentable { value })
}

#[cfg(test)]
mod tests {
    use good_lp::Variable;
    use rust_decimal::dec;
    use testresult::TestResult;

    use crate::{
        catalog::{PriceRecord, build_catalog},
        costs::{TwoTierCostModel, VendorCostTable},
    };

    use super::*;

    fn catalog() -> TestResult<PriceCatalog> {
        Ok(build_catalog(
            [
                PriceRecord::new("Milk", "A", dec!(8.00)),
                PriceRecord::new("Eggs", "A", dec!(22.00)),
                PriceRecord::new("Milk", "B", dec!(7.50)),
                PriceRecord::new("Eggs", "B", dec!(18.00)),
                PriceRecord::new("Rice", "B", dec!(34.00)),
            ],
            None,
        )?)
    }

    #[derive(Debug, Default)]
    struct CountingObserver {
        visit: usize,
        buy: usize,
        objective_terms: usize,
        coverage: Vec<String>,
        linking: Vec<(String, String)>,
        usage: Vec<String>,
    }

    impl ILPObserver for CountingObserver {
        fn on_visit_variable(&mut self, _vendor: &str, _var: Variable, _access_cost: Decimal) {
            self.visit += 1;
        }

        fn on_buy_variable(
            &mut self,
            _item: &str,
            _vendor: &str,
            _var: Variable,
            _unit_price: Decimal,
        ) {
            self.buy += 1;
        }

        fn on_objective_term(&mut self, _var: Variable, _coefficient: f64) {
            self.objective_terms += 1;
        }

        fn on_coverage_constraint(&mut self, item: &str, _constraint_expr: &Expression) {
            self.coverage.push(item.to_string());
        }

        fn on_linking_constraint(&mut self, item: &str, vendor: &str, _constraint_expr: &Expression) {
            self.linking.push((item.to_string(), vendor.to_string()));
        }

        fn on_usage_constraint(&mut self, vendor: &str, _constraint_expr: &Expression) {
            self.usage.push(vendor.to_string());
        }
    }

    #[test]
    fn formulation_creates_one_buy_variable_per_offer() -> TestResult {
        let catalog = catalog()?;
        let list = ShoppingList::new(["Milk", "Rice"])?;
        let costs = VendorCostTable::new(dec!(5));
        let mut observer = CountingObserver::default();

        let state = ILPSolver::formulate(&catalog, &list, &costs, &mut observer)?;

        // Milk at A and B, Rice at B; both vendors get a visit variable.
        assert_eq!(observer.buy, 3);
        assert_eq!(observer.visit, 2);
        assert_eq!(observer.objective_terms, 5);
        assert_eq!(state.variable_count(), 5);

        // 2 coverage + 3 linking + 2 usage
        assert_eq!(state.constraint_count(), 7);
        assert_eq!(observer.coverage, ["Milk", "Rice"]);
        assert_eq!(
            observer.linking,
            [
                ("Milk".to_string(), "A".to_string()),
                ("Milk".to_string(), "B".to_string()),
                ("Rice".to_string(), "B".to_string()),
            ]
        );
        assert_eq!(observer.usage, ["A", "B"]);

        Ok(())
    }

    #[test]
    fn unavailable_item_fails_before_formulation() -> TestResult {
        let catalog = catalog()?;
        let list = ShoppingList::new(["Milk", "Chicken"])?;
        let costs = VendorCostTable::new(dec!(5));
        let mut observer = CountingObserver::default();

        let result = ILPSolver::formulate(&catalog, &list, &costs, &mut observer);

        assert!(
            matches!(result, Err(SolverError::ItemUnavailable { ref item }) if item == "Chicken")
        );
        assert_eq!(observer.visit, 0);

        Ok(())
    }

    #[test]
    fn negative_access_cost_is_rejected() -> TestResult {
        let catalog = catalog()?;
        let list = ShoppingList::new(["Milk"])?;
        let costs = TwoTierCostModel::new("A", dec!(5), dec!(-1));

        let result = ILPSolver::solve(&catalog, &list, &costs);

        assert!(
            matches!(result, Err(SolverError::NegativeAccessCost { ref vendor, .. }) if vendor == "B")
        );

        Ok(())
    }

    #[test]
    fn access_cost_consolidates_purchases() -> TestResult {
        let catalog = catalog()?;
        let list = ShoppingList::new(["Milk", "Eggs"])?;

        // B is cheaper on both lines, but A is free to reach and B costs 10.
        let costs = VendorCostTable::new(dec!(10)).with_cost("A", dec!(0));

        let assignment = ILPSolver::solve(&catalog, &list, &costs)?;

        // A: 8 + 22 = 30; B: 7.5 + 18 + 10 = 35.5
        assert_eq!(assignment.total_cost(), dec!(30.00));
        assert_eq!(assignment.visited().collect::<Vec<_>>(), ["A"]);

        Ok(())
    }

    #[test]
    fn zero_cost_vendor_is_not_visited_without_purchases() -> TestResult {
        let catalog = catalog()?;
        let list = ShoppingList::new(["Rice"])?;

        // A costs nothing to visit but sells no rice.
        let costs = VendorCostTable::new(dec!(3)).with_cost("A", dec!(0));

        let assignment = ILPSolver::solve(&catalog, &list, &costs)?;

        assert_eq!(assignment.visited().collect::<Vec<_>>(), ["B"]);
        assert_eq!(assignment.total_cost(), dec!(37.00));

        Ok(())
    }

    #[test]
    fn generous_time_limit_returns_the_same_assignment() -> TestResult {
        let catalog = catalog()?;
        let list = ShoppingList::new(["Milk", "Eggs", "Rice"])?;
        let costs = VendorCostTable::new(dec!(4));

        let unlimited = ILPSolver::solve(&catalog, &list, &costs)?;
        let limited = ILPSolver::solve_with_options(
            &catalog,
            &list,
            &costs,
            &SolveOptions::with_timeout(Duration::from_secs(30)),
            &mut NoopObserver,
        )?;

        assert_eq!(unlimited.total_cost(), limited.total_cost());

        Ok(())
    }

    #[test]
    fn expired_time_limit_is_a_timeout() {
        let (_tx, rx) = mpsc::sync_channel(1);
        let limit = Duration::from_millis(20);

        let result = await_solve(&rx, limit);

        assert!(
            matches!(result, Err(SolverError::Timeout { limit: reported }) if reported == limit)
        );
        assert!(result.is_err_and(|err| !err.is_infeasible()));
    }

    #[test]
    fn worker_exiting_without_result_is_an_invariant_violation() {
        let (tx, rx) = mpsc::sync_channel::<Result<Assignment, SolverError>>(1);
        drop(tx);

        let result = await_solve(&rx, Duration::from_secs(5));

        assert!(matches!(
            result,
            Err(SolverError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn result_sent_before_limit_is_returned() -> TestResult {
        let (tx, rx) = mpsc::sync_channel(1);
        let assignment = Assignment::new(Vec::new(), std::collections::BTreeMap::new());

        assert!(tx.send(Ok(assignment.clone())).is_ok(), "send failed");

        assert_eq!(await_solve(&rx, Duration::from_secs(5))?, assignment);

        Ok(())
    }

    #[test]
    fn decimal_to_f64_converts_prices() -> TestResult {
        assert!((decimal_to_f64(dec!(7.50))? - 7.5).abs() <= f64::EPSILON);
        assert!((decimal_to_f64(Decimal::ZERO)?).abs() <= f64::EPSILON);

        Ok(())
    }
}
