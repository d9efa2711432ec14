//! MILP Solver
//!
//! Builds the purchase-split model for one [`Problem`] and hands it to the
//! backend selected by cargo features (`solver-microlp` or `solver-highs`).
//!
//! Decision variables, per item `l` and retailer `r`:
//!
//! - `q[l][r]`: integer units bought, `>= 0`
//! - `y[r]`: binary, the retailer's shipping fee is owed
//! - `z[r]`: binary, nothing is ordered from the retailer
//!
//! Money enters the model as exact integer minor units.

use good_lp::{
    ResolutionError, Solution, SolutionStatus, SolverModel, Variable,
};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use tracing::debug;

#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as default_solver;
#[cfg(all(not(feature = "solver-highs"), feature = "solver-microlp"))]
use good_lp::solvers::microlp::microlp as default_solver;

use crate::{
    constants::derive_constants,
    plan::SolutionPlan,
    problem::Problem,
    solvers::{
        SolveOptions, SolveStatus, Solver, SolverError,
        milp::state::{ConstraintRelation, MILPConstraint},
    },
};

pub(crate) mod constraints;
pub mod indicator;
pub(crate) mod objective;
pub mod observer;
pub mod renderers;
pub mod state;
pub mod variables;

#[cfg(test)]
pub(crate) mod test_support;

pub use indicator::{Implication, IndicatorBounds};
pub use observer::{MILPObserver, NoopObserver, VariableRole};
pub use state::{ConstraintKind, MILPState};
pub use variables::DecisionVariables;

/// Binary threshold for determining truthiness
pub const BINARY_THRESHOLD: f64 = 0.5;

/// A fully built model, ready to hand to the backend.
#[derive(Debug)]
pub struct MILPModel {
    variables: DecisionVariables,
    state: MILPState,
}

impl MILPModel {
    /// Build variables, constraints and objective for `problem`.
    ///
    /// The observer is notified of every variable, objective term and
    /// constraint as it is created.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if a coefficient cannot be represented exactly or
    /// an internal construction invariant is broken.
    pub fn build(
        problem: &Problem,
        options: SolveOptions,
        observer: &mut dyn MILPObserver,
    ) -> Result<Self, SolverError> {
        let constants = derive_constants(problem);
        let mut state = MILPState::new();

        let variables = DecisionVariables::declare(problem, &mut state, observer);

        constraints::add_capacity_constraints(problem, &variables, &mut state, observer)?;
        constraints::add_demand_constraints(
            problem,
            &variables,
            options.demand,
            &mut state,
            observer,
        );
        constraints::add_shipping_constraints(
            problem,
            &variables,
            &constants,
            &mut state,
            observer,
        )?;

        objective::add_objective(problem, &variables, &mut state, observer)?;

        debug!(
            variables = variables.all().count(),
            constraints = state.constraints().len(),
            demand = ?options.demand,
            "assembled model"
        );

        Ok(Self { variables, state })
    }

    /// Decision variables of the model
    pub fn variables(&self) -> &DecisionVariables {
        &self.variables
    }

    /// Recorded constraints in emission order
    pub fn constraints(&self) -> &[MILPConstraint] {
        self.state.constraints()
    }

    /// Run the backend and capture its status and, when optimal, every
    /// variable's value.
    pub fn solve(self) -> SolveOutcome {
        let Self { variables, state } = self;
        let (pb, cost, constraints) = state.into_parts();

        let model = pb.minimise(cost).using(default_solver);
        let model = apply_recorded_constraints(model, constraints);

        let (status, assignment) = match model.solve() {
            Ok(solution) => match solution.status() {
                SolutionStatus::Optimal => (
                    SolveStatus::Optimal,
                    Some(Assignment::capture(&solution, variables.all())),
                ),
                _ => (SolveStatus::NotSolved, None),
            },
            Err(ResolutionError::Infeasible) => (SolveStatus::Infeasible, None),
            Err(ResolutionError::Unbounded) => (SolveStatus::Unbounded, None),
            Err(err) => {
                debug!(error = %err, "backend failed");

                (SolveStatus::NotSolved, None)
            }
        };

        debug!(%status, "solver returned");

        SolveOutcome {
            status,
            variables,
            assignment,
        }
    }
}

/// Status and values reported by one backend run.
#[derive(Debug)]
pub struct SolveOutcome {
    /// Status reported by the backend
    pub status: SolveStatus,

    /// Variables the values refer to
    pub variables: DecisionVariables,

    /// Value of every variable, present only when `status` is optimal
    pub assignment: Option<Assignment>,
}

/// Values of every decision variable after an optimal solve.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    values: FxHashMap<Variable, f64>,
}

impl Assignment {
    fn capture(solution: &impl Solution, variables: impl Iterator<Item = Variable>) -> Self {
        let values = variables
            .map(|var| (var, solution.value(var)))
            .collect();

        Self { values }
    }
}

impl Solution for Assignment {
    fn status(&self) -> SolutionStatus {
        SolutionStatus::Optimal
    }

    fn value(&self, variable: Variable) -> f64 {
        self.values.get(&variable).copied().unwrap_or(0.0)
    }
}

/// Solver using Mixed-Integer Linear Programming (MILP)
#[derive(Debug)]
pub struct MILPSolver;

impl MILPSolver {
    /// Solve with an observer for capturing the MILP formulation.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if the model cannot be built or the backend does
    /// not report an optimal plan.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use cartsplit::{
    ///     input::load_problem,
    ///     solvers::{DemandPolicy, SolveOptions, milp::{MILPSolver, renderers::text::FormulationWriter}},
    /// };
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let problem = load_problem("fixtures/problems/small.yml")?;
    /// let mut writer = FormulationWriter::new(&problem);
    ///
    /// let plan = MILPSolver::solve_with_observer(
    ///     &problem,
    ///     SolveOptions::new(DemandPolicy::AtLeast),
    ///     &mut writer,
    /// )?;
    ///
    /// println!("{}", writer.render());
    /// # Ok(())
    /// # }
    /// ```
    pub fn solve_with_observer(
        problem: &Problem,
        options: SolveOptions,
        observer: &mut dyn MILPObserver,
    ) -> Result<SolutionPlan, SolverError> {
        let model = MILPModel::build(problem, options, observer)?;

        SolutionPlan::from_outcome(problem, &model.solve())
    }
}

impl Solver for MILPSolver {
    fn solve(problem: &Problem, options: SolveOptions) -> Result<SolutionPlan, SolverError> {
        Self::solve_with_observer(problem, options, &mut NoopObserver)
    }
}

fn apply_recorded_constraints<S: SolverModel>(mut model: S, constraints: Vec<MILPConstraint>) -> S {
    for constraint in constraints {
        model = match constraint.relation {
            ConstraintRelation::Eq => model.with(constraint.lhs.eq(constraint.rhs)),
            ConstraintRelation::Leq => model.with(constraint.lhs.leq(constraint.rhs)),
            ConstraintRelation::Geq => model.with(constraint.lhs.geq(constraint.rhs)),
        };
    }

    model
}

/// Convert an `i64` to an `f64` if it can be represented exactly.
pub fn i64_to_f64_exact(v: i64) -> Option<f64> {
    let f = v.to_f64()?;

    (f.to_i64() == Some(v)).then_some(f)
}

/// Solver coefficient for an amount in minor units.
///
/// `good_lp` stores coefficients as `f64`; only integers with absolute value
/// `<= 2^53` survive the conversion unchanged.
pub(crate) fn minor_coefficient(minor_units: i64) -> Result<f64, SolverError> {
    i64_to_f64_exact(minor_units).ok_or(SolverError::MinorUnitsNotRepresentable(minor_units))
}

/// Solver coefficient for a derived constant multiplied by `scale`.
pub(crate) fn scaled_constant(value: Decimal, scale: i64) -> Result<f64, SolverError> {
    let scaled = value
        .checked_mul(Decimal::from(scale))
        .ok_or(SolverError::ConstantNotRepresentable(value))?;

    if !scaled.fract().is_zero() {
        return Err(SolverError::ConstantNotRepresentable(value));
    }

    scaled
        .to_i64()
        .and_then(i64_to_f64_exact)
        .ok_or(SolverError::ConstantNotRepresentable(value))
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        input::problem_from_str,
        solvers::{
            DemandPolicy,
            milp::test_support::{RecordingObserver, two_by_two_problem, violated_constraints},
        },
    };

    use super::*;

    #[test]
    fn i64_to_f64_exact_accepts_exactly_representable_integers() {
        assert_eq!(i64_to_f64_exact(0), Some(0.0));
        assert_eq!(i64_to_f64_exact(1_250), Some(1_250.0));
        assert_eq!(i64_to_f64_exact(1_i64 << 53), Some(9_007_199_254_740_992.0));
    }

    #[test]
    fn i64_to_f64_exact_rejects_nonrepresentable_integers() {
        assert_eq!(i64_to_f64_exact((1_i64 << 53) + 1), None);
    }

    #[test]
    fn scaled_constant_moves_decimals_into_minor_units() -> TestResult {
        assert!((scaled_constant(Decimal::new(5_001, 2), 100)? - 5_001.0).abs() < f64::EPSILON);
        assert!((scaled_constant(Decimal::from(166), 1)? - 166.0).abs() < f64::EPSILON);

        assert!(matches!(
            scaled_constant(Decimal::new(5, 1), 1),
            Err(SolverError::ConstantNotRepresentable(_))
        ));

        Ok(())
    }

    #[test]
    fn optimal_assignment_satisfies_every_recorded_constraint() -> TestResult {
        let problem = two_by_two_problem()?;
        let options = SolveOptions::new(DemandPolicy::AtLeast);

        let model = MILPModel::build(&problem, options, &mut NoopObserver)?;
        let constraints = model.constraints().to_vec();

        let outcome = model.solve();
        let assignment = outcome.assignment.ok_or("expected an optimal assignment")?;

        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!(violated_constraints(&constraints, &assignment).is_empty());

        Ok(())
    }

    #[test]
    fn infeasible_model_reports_status_without_values() -> TestResult {
        let problem = problem_from_str(
            r#"
currency: USD
items: [{ id: rod, quantity: 5 }]
retailers: [{ id: a, shipping_fee: "5", free_shipping_threshold: "100" }]
prices: [{ item: rod, retailer: a, price: "2" }]
inventory: [{ item: rod, retailer: a, units: 3 }]
"#,
        )?;

        let model = MILPModel::build(
            &problem,
            SolveOptions::new(DemandPolicy::AtLeast),
            &mut NoopObserver,
        )?;

        let outcome = model.solve();

        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(outcome.assignment.is_none());

        Ok(())
    }

    #[test]
    fn observer_sees_whole_formulation() -> TestResult {
        let problem = two_by_two_problem()?;
        let mut observer = RecordingObserver::default();

        let model = MILPModel::build(
            &problem,
            SolveOptions::new(DemandPolicy::Exactly),
            &mut observer,
        )?;

        assert_eq!(observer.variables.len(), model.variables().all().count());
        assert_eq!(observer.constraints.len(), model.constraints().len());
        assert_eq!(observer.objective_terms.len(), 6);

        Ok(())
    }

    #[test]
    fn solver_trait_returns_cheapest_plan() -> TestResult {
        let problem = two_by_two_problem()?;

        let plan = MILPSolver::solve(&problem, SolveOptions::new(DemandPolicy::Exactly))?;

        // 3 lures and 2 lines at south: 33.00 + 7.00 + 7.50 shipping.
        assert_eq!(plan.total().to_minor_units(), 4_750);

        Ok(())
    }
}
