//! Constraint Generation

use good_lp::Expression;

use crate::{
    constants::DerivedConstants,
    problem::Problem,
    solvers::{
        DemandPolicy, SolverError,
        milp::{
            indicator::{Implication, IndicatorBounds},
            minor_coefficient,
            observer::MILPObserver,
            scaled_constant,
            state::{ConstraintKind, ConstraintRelation, MILPState},
            variables::DecisionVariables,
        },
    },
};

/// Cap every quantity by the pair's effective inventory: `q[l][r] <= I[l][r]`.
///
/// Unavailable pairs are capped at zero.
pub(crate) fn add_capacity_constraints(
    problem: &Problem,
    vars: &DecisionVariables,
    state: &mut MILPState,
    observer: &mut dyn MILPObserver,
) -> Result<(), SolverError> {
    for (item, retailer) in problem.pairs() {
        let q = vars
            .quantity(item, retailer)
            .ok_or(SolverError::ModelConstruction {
                message: "quantity variable missing for item/retailer pair",
            })?;

        state.add_constraint(
            ConstraintKind::Capacity { item, retailer },
            Expression::from(q),
            ConstraintRelation::Leq,
            f64::from(problem.inventory(item, retailer)),
            observer,
        );
    }

    Ok(())
}

/// Make every item's total meet its desired quantity.
pub(crate) fn add_demand_constraints(
    problem: &Problem,
    vars: &DecisionVariables,
    policy: DemandPolicy,
    state: &mut MILPState,
    observer: &mut dyn MILPObserver,
) {
    let relation = match policy {
        DemandPolicy::AtLeast => ConstraintRelation::Geq,
        DemandPolicy::Exactly => ConstraintRelation::Eq,
    };

    for (item_idx, item) in problem.items().iter().enumerate() {
        let total: Expression = vars.quantities_of_item(item_idx).map(|(_, q)| q).sum();

        state.add_constraint(
            ConstraintKind::Demand { item: item_idx },
            total,
            relation,
            f64::from(item.desired()),
            observer,
        );
    }
}

/// Emit the empty-order and shipping-due rows for every retailer.
///
/// Both rows come from one [`Implication`]: "if anything is ordered from `r`
/// then `spend[r] + M[r] * y[r] >= T[r]`", gated by the empty-order binary
/// `z[r]`. Both rows are written in minor units: scaling an inequality by the
/// currency's minor-unit factor leaves its solutions unchanged and keeps every
/// coefficient integral when `T` carries a fractional part.
pub(crate) fn add_shipping_constraints(
    problem: &Problem,
    vars: &DecisionVariables,
    constants: &DerivedConstants,
    state: &mut MILPState,
    observer: &mut dyn MILPObserver,
) -> Result<(), SolverError> {
    let scale = problem.minor_unit_scale();

    for (retailer_idx, retailer) in problem.retailers().iter().enumerate() {
        let retailer_constants =
            constants
                .get(retailer_idx)
                .ok_or(SolverError::ModelConstruction {
                    message: "derived constants missing for retailer",
                })?;

        let y = vars
            .pay_shipping(retailer_idx)
            .ok_or(SolverError::ModelConstruction {
                message: "shipping indicator missing for retailer",
            })?;

        let z = vars
            .empty_order(retailer_idx)
            .ok_or(SolverError::ModelConstruction {
                message: "empty-order indicator missing for retailer",
            })?;

        let units: Expression = vars
            .quantities_at_retailer(retailer_idx)
            .map(|(_, q)| q)
            .sum();
        let units = units * minor_coefficient(scale)?;

        let mut spend = Expression::default();

        for (item_idx, q) in vars.quantities_at_retailer(retailer_idx) {
            let price_minor = problem.unit_price_minor(item_idx, retailer_idx);

            if price_minor != 0 {
                spend += q * minor_coefficient(price_minor)?;
            }
        }

        let big_m = scaled_constant(retailer_constants.big_m(), scale)?;
        let big_n = scaled_constant(retailer_constants.big_n(), scale)?;
        let threshold = minor_coefficient(retailer.free_shipping_threshold().to_minor_units())?;

        let rows = Implication::new(
            units,
            spend + y * big_m,
            threshold,
            IndicatorBounds::uniform(big_n),
        )
        .linearize(z);

        state.add_constraint(
            ConstraintKind::EmptyOrder {
                retailer: retailer_idx,
            },
            rows.gate,
            ConstraintRelation::Leq,
            rows.gate_rhs,
            observer,
        );

        state.add_constraint(
            ConstraintKind::ShippingDue {
                retailer: retailer_idx,
            },
            rows.enforce,
            ConstraintRelation::Geq,
            rows.enforce_rhs,
            observer,
        );
    }

    Ok(())
}
