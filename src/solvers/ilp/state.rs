//! ILP State

use std::{collections::BTreeMap, fmt};

use good_lp::{Expression, ProblemVariables, Solution, Variable, variable};
use rust_decimal::Decimal;
use smallvec::SmallVec;

use crate::{
    shopping::ShoppingList,
    solvers::{Assignment, AssignmentLine, SolverError, ilp::BINARY_THRESHOLD},
};

/// Relation operator for a linear ILP constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConstraintRelation {
    /// Equality (`lhs == rhs`)
    Eq,

    /// Less than or equal (`lhs <= rhs`)
    Leq,
}

/// Recorded linear ILP constraint emitted during model construction.
#[derive(Debug, Clone)]
pub(crate) struct ILPConstraint {
    /// Left-hand side expression
    pub(crate) lhs: Expression,

    /// Relation operator
    pub(crate) relation: ConstraintRelation,

    /// Right-hand side scalar
    pub(crate) rhs: f64,
}

/// Binary "source this item from this vendor" variable.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BuyVariable {
    /// Position of the item in the shopping list
    pub(crate) item_idx: usize,

    /// Position of the vendor in the vendor list
    pub(crate) vendor_idx: usize,

    /// Decision variable
    pub(crate) var: Variable,

    /// Unit price paid if chosen
    pub(crate) unit_price: Decimal,
}

/// Where each decision variable lives, kept after the model consumes the
/// problem variables so the solution can be mapped back to items and vendors.
#[derive(Debug, Clone)]
pub(crate) struct VariableLayout {
    items: Vec<String>,
    vendors: Vec<String>,
    access_costs: Vec<Decimal>,
    visit: SmallVec<[Variable; 8]>,
    buy: Vec<BuyVariable>,
}

impl VariableLayout {
    /// Translate a backend solution into an [`Assignment`].
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvariantViolation`] if an item is not sourced
    /// exactly once, or if the visited vendors differ from the supplying vendors.
    pub(crate) fn read_assignment(
        &self,
        solution: &impl Solution,
    ) -> Result<Assignment, SolverError> {
        let mut lines = Vec::with_capacity(self.items.len());

        for (item_idx, item) in self.items.iter().enumerate() {
            // `var` is binary but the backend returns floats; treat values above the
            // threshold as chosen to tolerate numerical noise.
            let mut chosen = self
                .buy
                .iter()
                .filter(|buy| buy.item_idx == item_idx)
                .filter(|buy| solution.value(buy.var) > BINARY_THRESHOLD);

            let buy = chosen.next().ok_or(SolverError::InvariantViolation {
                message: "item is not sourced from any vendor",
            })?;

            if chosen.next().is_some() {
                return Err(SolverError::InvariantViolation {
                    message: "item is sourced from more than one vendor",
                });
            }

            let vendor = self
                .vendors
                .get(buy.vendor_idx)
                .ok_or(SolverError::InvariantViolation {
                    message: "buy variable refers to unknown vendor",
                })?;

            lines.push(AssignmentLine {
                item: item.clone(),
                vendor: vendor.clone(),
                unit_price: buy.unit_price,
            });
        }

        let mut visits = BTreeMap::new();

        for ((vendor, cost), var) in self
            .vendors
            .iter()
            .zip(self.access_costs.iter())
            .zip(self.visit.iter())
        {
            if solution.value(*var) > BINARY_THRESHOLD {
                visits.insert(vendor.clone(), *cost);
            }
        }

        let assignment = Assignment::new(lines, visits);

        if !assignment.visits_match_lines() {
            return Err(SolverError::InvariantViolation {
                message: "visited vendors differ from supplying vendors",
            });
        }

        Ok(assignment)
    }
}

/// Builder state for ILP problem variables, objective and constraints
pub struct ILPState {
    pb: ProblemVariables,
    cost: Expression,
    layout: VariableLayout,
    constraints: Vec<ILPConstraint>,
}

impl fmt::Debug for ILPState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ILPState")
            .field("pb", &"<ProblemVariables>")
            .field("cost", &"<Expression>")
            .field("items", &self.layout.items)
            .field("vendors", &self.layout.vendors)
            .field(
                "variables",
                &format!(
                    "[{} buy, {} visit]",
                    self.layout.buy.len(),
                    self.layout.visit.len()
                ),
            )
            .field(
                "constraints",
                &format!("[{} constraints]", self.constraints.len()),
            )
            .finish()
    }
}

impl ILPState {
    /// Create an empty state for the items on a shopping list.
    pub(crate) fn new(shopping_list: &ShoppingList) -> Self {
        Self {
            pb: ProblemVariables::new(),
            cost: Expression::default(),
            layout: VariableLayout {
                items: shopping_list.iter().map(str::to_string).collect(),
                vendors: Vec::new(),
                access_costs: Vec::new(),
                visit: SmallVec::new(),
                buy: Vec::new(),
            },
            constraints: Vec::new(),
        }
    }

    /// Add a binary visit variable for a vendor and return its index and variable.
    ///
    /// The caller is responsible for adding the access cost to the objective.
    pub(crate) fn add_visit_variable(
        &mut self,
        vendor: &str,
        access_cost: Decimal,
    ) -> (usize, Variable) {
        let var = self.pb.add(variable().binary());
        let vendor_idx = self.layout.vendors.len();

        self.layout.vendors.push(vendor.to_string());
        self.layout.access_costs.push(access_cost);
        self.layout.visit.push(var);

        (vendor_idx, var)
    }

    /// Add a binary buy variable for an item/vendor pair.
    ///
    /// The caller is responsible for adding the unit price to the objective.
    pub(crate) fn add_buy_variable(
        &mut self,
        item_idx: usize,
        vendor_idx: usize,
        unit_price: Decimal,
    ) -> Variable {
        let var = self.pb.add(variable().binary());

        self.layout.buy.push(BuyVariable {
            item_idx,
            vendor_idx,
            var,
            unit_price,
        });

        var
    }

    /// Add a term to the objective function (cost expression)
    ///
    /// Tells the solver "if you choose this option (set this variable to 1), add this
    /// cost to the total".
    pub fn add_to_objective(&mut self, var: Variable, coefficient: f64) {
        self.cost += var * coefficient;
    }

    /// Record an equality constraint.
    pub fn add_eq_constraint(&mut self, lhs: Expression, rhs: f64) {
        self.constraints.push(ILPConstraint {
            lhs,
            relation: ConstraintRelation::Eq,
            rhs,
        });
    }

    /// Record a less-than-or-equal constraint.
    pub fn add_leq_constraint(&mut self, lhs: Expression, rhs: f64) {
        self.constraints.push(ILPConstraint {
            lhs,
            relation: ConstraintRelation::Leq,
            rhs,
        });
    }

    /// Position of a vendor among the visit variables.
    pub(crate) fn vendor_index(&self, vendor: &str) -> Option<usize> {
        self.layout.vendors.iter().position(|known| known == vendor)
    }

    /// Name of the item at a shopping-list position.
    pub(crate) fn item(&self, item_idx: usize) -> Option<&str> {
        self.layout.items.get(item_idx).map(String::as_str)
    }

    /// Name of the vendor at a vendor position.
    pub(crate) fn vendor(&self, vendor_idx: usize) -> Option<&str> {
        self.layout.vendors.get(vendor_idx).map(String::as_str)
    }

    /// Number of shopping-list items.
    pub(crate) fn item_count(&self) -> usize {
        self.layout.items.len()
    }

    /// Visit variables, indexed by vendor position.
    pub(crate) fn visit_variables(&self) -> &[Variable] {
        &self.layout.visit
    }

    /// Buy variables in creation order.
    pub(crate) fn buy_variables(&self) -> &[BuyVariable] {
        &self.layout.buy
    }

    /// Number of recorded constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Number of decision variables.
    pub fn variable_count(&self) -> usize {
        self.layout.buy.len() + self.layout.visit.len()
    }

    /// Extract the problem variables, cost expression, recorded constraints and the
    /// variable layout.
    pub(crate) fn into_parts_with_constraints(
        self,
    ) -> (
        ProblemVariables,
        Expression,
        Vec<ILPConstraint>,
        VariableLayout,
    ) {
        (self.pb, self.cost, self.constraints, self.layout)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal::dec;
    use testresult::TestResult;

    use super::*;

    fn two_vendor_state() -> TestResult<(ILPState, Variable, Variable, Variable)> {
        let list = ShoppingList::new(["Milk"])?;
        let mut state = ILPState::new(&list);

        let (a_idx, visit_a) = state.add_visit_variable("A", dec!(5));
        let (_b_idx, visit_b) = state.add_visit_variable("B", dec!(15));
        let buy_a = state.add_buy_variable(0, a_idx, dec!(8.00));

        Ok((state, visit_a, visit_b, buy_a))
    }

    #[test]
    fn debug_includes_variable_counts() -> TestResult {
        let (state, ..) = two_vendor_state()?;

        let formatted = format!("{state:?}");

        assert!(formatted.contains("ILPState"));
        assert!(formatted.contains("1 buy, 2 visit"));
        assert!(formatted.contains("0 constraints"));

        Ok(())
    }

    #[test]
    fn vendor_positions_follow_insertion_order() -> TestResult {
        let (state, ..) = two_vendor_state()?;

        assert_eq!(state.vendor_index("A"), Some(0));
        assert_eq!(state.vendor_index("B"), Some(1));
        assert_eq!(state.vendor_index("C"), None);
        assert_eq!(state.vendor(1), Some("B"));
        assert_eq!(state.item(0), Some("Milk"));
        assert_eq!(state.variable_count(), 3);

        Ok(())
    }

    #[test]
    fn reads_assignment_from_solution_values() -> TestResult {
        let (state, visit_a, visit_b, buy_a) = two_vendor_state()?;
        let (_pb, _cost, _constraints, layout) = state.into_parts_with_constraints();

        let solution: HashMap<Variable, f64> =
            HashMap::from([(visit_a, 1.0), (visit_b, 0.0), (buy_a, 0.999_999)]);

        let assignment = layout.read_assignment(&solution)?;

        assert_eq!(assignment.vendor_for("Milk"), Some("A"));
        assert_eq!(assignment.visited().collect::<Vec<_>>(), ["A"]);
        assert_eq!(assignment.total_cost(), dec!(13.00));

        Ok(())
    }

    #[test]
    fn unsourced_item_is_an_invariant_violation() -> TestResult {
        let (state, visit_a, visit_b, buy_a) = two_vendor_state()?;
        let (_pb, _cost, _constraints, layout) = state.into_parts_with_constraints();

        let solution: HashMap<Variable, f64> =
            HashMap::from([(visit_a, 0.0), (visit_b, 0.0), (buy_a, 0.0)]);

        let result = layout.read_assignment(&solution);

        assert!(matches!(
            result,
            Err(SolverError::InvariantViolation { .. })
        ));

        Ok(())
    }

    #[test]
    fn unused_visit_is_an_invariant_violation() -> TestResult {
        let (state, visit_a, visit_b, buy_a) = two_vendor_state()?;
        let (_pb, _cost, _constraints, layout) = state.into_parts_with_constraints();

        let solution: HashMap<Variable, f64> =
            HashMap::from([(visit_a, 1.0), (visit_b, 1.0), (buy_a, 1.0)]);

        let result = layout.read_assignment(&solution);

        assert!(matches!(
            result,
            Err(SolverError::InvariantViolation { .. })
        ));

        Ok(())
    }
}
