//! Cartsplit
//!
//! Cartsplit splits a multi-item purchase across retailers so that the total
//! spend, item prices plus shipping fees, is as small as possible. Each retailer
//! charges a flat shipping fee unless the order's subtotal reaches its
//! free-shipping threshold, which can make buying surplus units worthwhile.
//!
//! The problem is expressed as a mixed-integer linear program and solved with
//! [`good_lp`].
//!
//! ```rust,no_run
//! use cartsplit::{
//!     input::load_problem,
//!     solvers::{DemandPolicy, SolveOptions, Solver, milp::MILPSolver},
//! };
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let problem = load_problem("fixtures/problems/small.yml")?;
//! let plan = MILPSolver::solve(&problem, SolveOptions::new(DemandPolicy::AtLeast))?;
//!
//! plan.write_to(std::io::stdout().lock())?;
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

pub mod constants;
pub mod input;
pub mod plan;
pub mod problem;
pub mod solvers;

use crate::{
    plan::SolutionPlan,
    problem::{Problem, RawProblem, ValidationError},
    solvers::{SolveOptions, Solver, SolverError, milp::MILPSolver},
};

/// Errors from validating and solving a raw problem in one step.
#[derive(Debug, Error)]
pub enum Error {
    /// The raw tables do not describe a valid problem
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The solver could not produce a plan
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Validate `raw` and find its cheapest purchase plan.
///
/// # Errors
///
/// Returns [`Error::Validation`] for malformed input and [`Error::Solver`] when
/// no optimal plan exists.
pub fn optimize(raw: &RawProblem, options: SolveOptions) -> Result<SolutionPlan, Error> {
    let problem = Problem::try_from(raw)?;

    Ok(MILPSolver::solve(&problem, options)?)
}
