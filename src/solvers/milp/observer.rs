//! MILP Observer

use good_lp::{Expression, Variable};

use crate::solvers::milp::state::{ConstraintKind, ConstraintRelation};

/// Role a decision variable plays in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableRole {
    /// Integer units of an item bought from a retailer (`q`)
    Quantity {
        /// Item index
        item: usize,
        /// Retailer index
        retailer: usize,
    },

    /// Binary: shipping fee is owed to the retailer (`y`)
    PayShipping {
        /// Retailer index
        retailer: usize,
    },

    /// Binary: nothing is ordered from the retailer (`z`)
    EmptyOrder {
        /// Retailer index
        retailer: usize,
    },
}

/// Observer trait for capturing the MILP formulation as it's built.
///
/// Observers passively record variables, objective terms and constraints so
/// the formulation can be rendered or inspected without duplicating the
/// model construction logic.
pub trait MILPObserver {
    /// Called when a decision variable is declared.
    fn on_variable(&mut self, role: VariableRole, var: Variable);

    /// Called when a term is added to the objective function.
    ///
    /// `coefficient` is expressed in minor units (e.g. pence, cents).
    fn on_objective_term(&mut self, _var: Variable, _coefficient: f64) {}

    /// Called when a constraint is recorded.
    fn on_constraint(
        &mut self,
        kind: ConstraintKind,
        lhs: &Expression,
        relation: ConstraintRelation,
        rhs: f64,
    );
}

/// No-op observer for unobserved solves.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl MILPObserver for NoopObserver {
    fn on_variable(&mut self, _: VariableRole, _: Variable) {}

    fn on_constraint(&mut self, _: ConstraintKind, _: &Expression, _: ConstraintRelation, _: f64) {
    }
}
