//! MILP State

use std::fmt;

use good_lp::{Expression, ProblemVariables, Variable};
use tracing::trace;

use crate::solvers::milp::observer::MILPObserver;

/// Relation operator for a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintRelation {
    /// Equality (`lhs == rhs`)
    Eq,

    /// Less than or equal (`lhs <= rhs`)
    Leq,

    /// Greater than or equal (`lhs >= rhs`)
    Geq,
}

impl fmt::Display for ConstraintRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintRelation::Eq => f.write_str("="),
            ConstraintRelation::Leq => f.write_str("<="),
            ConstraintRelation::Geq => f.write_str(">="),
        }
    }
}

/// Which rule of the model a constraint encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `q[l][r] <= I[l][r]`
    Capacity {
        /// Item index
        item: usize,
        /// Retailer index
        retailer: usize,
    },

    /// `sum_r q[l][r] >= n[l]` (or `=` under the exact policy)
    Demand {
        /// Item index
        item: usize,
    },

    /// `sum_l q[l][r] <= N[r] * (1 - z[r])`
    EmptyOrder {
        /// Retailer index
        retailer: usize,
    },

    /// `spend[r] - T[r] + M[r] * y[r] >= -N[r] * z[r]`
    ShippingDue {
        /// Retailer index
        retailer: usize,
    },
}

impl ConstraintKind {
    /// Short human-readable name of the rule
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::Capacity { .. } => "capacity",
            ConstraintKind::Demand { .. } => "demand",
            ConstraintKind::EmptyOrder { .. } => "empty order",
            ConstraintKind::ShippingDue { .. } => "shipping due",
        }
    }
}

/// Recorded linear constraint emitted during model construction.
#[derive(Debug, Clone)]
pub struct MILPConstraint {
    /// Rule this constraint encodes
    pub kind: ConstraintKind,

    /// Left-hand side expression
    pub lhs: Expression,

    /// Relation operator
    pub relation: ConstraintRelation,

    /// Right-hand side scalar
    pub rhs: f64,
}

/// Builder state for MILP problem variables, objective and constraints.
///
/// One state is built per solve and consumed by it.
pub struct MILPState {
    pb: ProblemVariables,
    cost: Expression,
    constraints: Vec<MILPConstraint>,
}

impl fmt::Debug for MILPState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MILPState")
            .field("pb", &"<ProblemVariables>")
            .field("cost", &"<Expression>")
            .field(
                "constraints",
                &format!("[{} constraints]", self.constraints.len()),
            )
            .finish()
    }
}

impl Default for MILPState {
    fn default() -> Self {
        Self::new()
    }
}

impl MILPState {
    /// Create an empty state
    pub fn new() -> Self {
        Self {
            pb: ProblemVariables::new(),
            cost: Expression::default(),
            constraints: Vec::new(),
        }
    }

    /// Get mutable access to the problem variables
    ///
    /// Used to add new decision variables to the problem.
    pub fn problem_variables_mut(&mut self) -> &mut ProblemVariables {
        &mut self.pb
    }

    /// Add a term to the objective function (cost expression)
    pub fn add_to_objective(
        &mut self,
        var: Variable,
        coefficient: f64,
        observer: &mut dyn MILPObserver,
    ) {
        observer.on_objective_term(var, coefficient);

        self.cost += var * coefficient;
    }

    /// Record a constraint and notify the observer.
    pub fn add_constraint(
        &mut self,
        kind: ConstraintKind,
        lhs: Expression,
        relation: ConstraintRelation,
        rhs: f64,
        observer: &mut dyn MILPObserver,
    ) {
        trace!(kind = kind.name(), %relation, rhs, "recorded constraint");

        observer.on_constraint(kind, &lhs, relation, rhs);

        self.constraints.push(MILPConstraint {
            kind,
            lhs,
            relation,
            rhs,
        });
    }

    /// Recorded constraints in emission order
    pub fn constraints(&self) -> &[MILPConstraint] {
        &self.constraints
    }

    /// Extract the problem variables, cost expression and recorded constraints.
    pub(crate) fn into_parts(self) -> (ProblemVariables, Expression, Vec<MILPConstraint>) {
        (self.pb, self.cost, self.constraints)
    }
}

#[cfg(test)]
mod tests {
    use good_lp::variable;

    use crate::solvers::milp::observer::NoopObserver;

    use super::*;

    #[test]
    fn debug_includes_constraint_count() {
        let mut state = MILPState::new();
        let x = state.problem_variables_mut().add(variable().integer().min(0));

        state.add_constraint(
            ConstraintKind::Demand { item: 0 },
            Expression::from(x),
            ConstraintRelation::Geq,
            2.0,
            &mut NoopObserver,
        );

        let formatted = format!("{state:?}");

        assert!(formatted.contains("MILPState"));
        assert!(formatted.contains("1 constraints"));
    }

    #[test]
    fn constraints_are_kept_in_emission_order() {
        let mut state = MILPState::new();
        let x = state.problem_variables_mut().add(variable().integer().min(0));

        state.add_constraint(
            ConstraintKind::Capacity {
                item: 0,
                retailer: 0,
            },
            Expression::from(x),
            ConstraintRelation::Leq,
            4.0,
            &mut NoopObserver,
        );

        state.add_constraint(
            ConstraintKind::Demand { item: 0 },
            Expression::from(x),
            ConstraintRelation::Eq,
            3.0,
            &mut NoopObserver,
        );

        let kinds: Vec<&str> = state.constraints().iter().map(|c| c.kind.name()).collect();

        assert_eq!(kinds, vec!["capacity", "demand"]);
    }

    #[test]
    fn relation_displays_as_operator() {
        assert_eq!(ConstraintRelation::Eq.to_string(), "=");
        assert_eq!(ConstraintRelation::Leq.to_string(), "<=");
        assert_eq!(ConstraintRelation::Geq.to_string(), ">=");
    }
}
