use good_lp::{Expression, Solution, Variable};

use crate::{
    input::{InputError, problem_from_str},
    problem::Problem,
    solvers::milp::{
        observer::{MILPObserver, VariableRole},
        state::{ConstraintKind, ConstraintRelation, MILPConstraint},
    },
};

/// Two items, two retailers, every pair priced.
///
/// North: threshold 50.00 USD, 115 units in stock. South: threshold 80.00 USD.
pub(crate) const TWO_BY_TWO: &str = r#"
currency: USD
items:
  - { id: lure, quantity: 3 }
  - { id: line, quantity: 2 }
retailers:
  - { id: north, shipping_fee: "5.00", free_shipping_threshold: "50.00" }
  - { id: south, shipping_fee: "7.50", free_shipping_threshold: "80.00" }
prices:
  - { item: lure, retailer: north, price: "12.50" }
  - { item: line, retailer: north, price: "4.00" }
  - { item: lure, retailer: south, price: "11.00" }
  - { item: line, retailer: south, price: "3.50" }
inventory:
  - { item: lure, retailer: north, units: 100 }
  - { item: line, retailer: north, units: 15 }
  - { item: lure, retailer: south, units: 20 }
  - { item: line, retailer: south, units: 40 }
"#;

pub(crate) fn two_by_two_problem() -> Result<Problem, InputError> {
    problem_from_str(TWO_BY_TWO)
}

#[derive(Debug, Default)]
pub(crate) struct RecordingObserver {
    pub(crate) variables: Vec<(VariableRole, Variable)>,
    pub(crate) objective_terms: Vec<(Variable, f64)>,
    pub(crate) constraints: Vec<(ConstraintKind, Expression, ConstraintRelation, f64)>,
}

impl MILPObserver for RecordingObserver {
    fn on_variable(&mut self, role: VariableRole, var: Variable) {
        self.variables.push((role, var));
    }

    fn on_objective_term(&mut self, var: Variable, coefficient: f64) {
        self.objective_terms.push((var, coefficient));
    }

    fn on_constraint(
        &mut self,
        kind: ConstraintKind,
        lhs: &Expression,
        relation: ConstraintRelation,
        rhs: f64,
    ) {
        self.constraints.push((kind, lhs.clone(), relation, rhs));
    }
}

/// Check every recorded constraint against a solution, with a small tolerance.
pub(crate) fn violated_constraints<'a>(
    constraints: &'a [MILPConstraint],
    solution: &impl Solution,
) -> Vec<&'a MILPConstraint> {
    const TOLERANCE: f64 = 1e-6;

    constraints
        .iter()
        .filter(|constraint| {
            let lhs = solution.eval(&constraint.lhs);

            match constraint.relation {
                ConstraintRelation::Eq => (lhs - constraint.rhs).abs() > TOLERANCE,
                ConstraintRelation::Leq => lhs > constraint.rhs + TOLERANCE,
                ConstraintRelation::Geq => lhs < constraint.rhs - TOLERANCE,
            }
        })
        .collect()
}
