//! Objective

use crate::{
    problem::Problem,
    solvers::{
        SolverError,
        milp::{
            minor_coefficient, observer::MILPObserver, state::MILPState,
            variables::DecisionVariables,
        },
    },
};

/// Minimise spend plus owed shipping fees, in minor units.
///
/// Unavailable pairs carry no price and contribute nothing; their quantities
/// are pinned to zero by the capacity rows.
pub(crate) fn add_objective(
    problem: &Problem,
    vars: &DecisionVariables,
    state: &mut MILPState,
    observer: &mut dyn MILPObserver,
) -> Result<(), SolverError> {
    for (item, retailer) in problem.pairs() {
        if problem.offer(item, retailer).is_none() {
            continue;
        }

        let q = vars
            .quantity(item, retailer)
            .ok_or(SolverError::ModelConstruction {
                message: "quantity variable missing for item/retailer pair",
            })?;

        let coeff = minor_coefficient(problem.unit_price_minor(item, retailer))?;

        state.add_to_objective(q, coeff, observer);
    }

    for (retailer_idx, retailer) in problem.retailers().iter().enumerate() {
        let y = vars
            .pay_shipping(retailer_idx)
            .ok_or(SolverError::ModelConstruction {
                message: "shipping indicator missing for retailer",
            })?;

        let coeff = minor_coefficient(retailer.shipping_fee().to_minor_units())?;

        state.add_to_objective(y, coeff, observer);
    }

    Ok(())
}
