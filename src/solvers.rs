//! Solvers for purchase splitting

use std::fmt;

use rust_decimal::Decimal;
use rusty_money::MoneyError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{plan::SolutionPlan, problem::Problem};

pub mod milp;

/// Outcome reported by the solver backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// An optimal assignment was found.
    Optimal,

    /// No assignment satisfies every constraint.
    Infeasible,

    /// The objective can decrease without bound.
    Unbounded,

    /// The backend failed or stopped without a usable answer.
    NotSolved,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => f.write_str("optimal"),
            SolveStatus::Infeasible => f.write_str("infeasible"),
            SolveStatus::Unbounded => f.write_str("unbounded"),
            SolveStatus::NotSolved => f.write_str("not solved"),
        }
    }
}

/// How desired quantities bind the total ordered per item.
///
/// There is deliberately no default: callers must pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DemandPolicy {
    /// Order at least the desired quantity. Surplus units may be bought when
    /// they unlock free shipping and lower the total.
    AtLeast,

    /// Order exactly the desired quantity.
    Exactly,
}

/// Options for a single solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveOptions {
    /// Demand satisfaction policy
    pub demand: DemandPolicy,
}

impl SolveOptions {
    /// Options with the given demand policy
    pub fn new(demand: DemandPolicy) -> Self {
        Self { demand }
    }
}

/// Solver Errors
#[derive(Debug, Error)]
pub enum SolverError {
    /// Money amount in minor units cannot be represented exactly as a solver coefficient.
    #[error(
        "money amount in minor units cannot be represented exactly as a solver coefficient: {0}"
    )]
    MinorUnitsNotRepresentable(i64),

    /// Derived constant cannot be represented exactly as a solver coefficient.
    #[error("derived constant cannot be represented exactly as a solver coefficient: {0}")]
    ConstantNotRepresentable(Decimal),

    /// A solver value cannot be read back as a unit count.
    #[error("solver value is not a valid unit count: {0}")]
    ValueOutOfRange(f64),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Internal model construction invariant was violated (this is a bug).
    #[error("model construction invariant violated: {message}")]
    ModelConstruction {
        /// What invariant was violated
        message: &'static str,
    },

    /// The solver did not produce an optimal assignment, so there is no plan.
    #[error("no purchase plan: solver finished with status {status}")]
    NoSolution {
        /// Status reported by the solver
        status: SolveStatus,
    },
}

impl SolverError {
    /// Solver status behind the error, if the error came from the solve itself.
    pub fn status(&self) -> Option<SolveStatus> {
        match self {
            SolverError::NoSolution { status } => Some(*status),
            _ => None,
        }
    }
}

/// Trait for turning a validated problem into a purchase plan
pub trait Solver {
    /// Find the cheapest purchase plan for the problem.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if the model cannot be built or the solver does
    /// not find an optimal plan.
    fn solve(problem: &Problem, options: SolveOptions) -> Result<SolutionPlan, SolverError>;
}
