//! Shared helpers for integration tests

use cartsplit::{
    input::load_problem,
    plan::SolutionPlan,
    problem::Problem,
    solvers::{DemandPolicy, SolveOptions, Solver, SolverError, milp::MILPSolver},
};

/// Load a problem from `fixtures/problems/<name>.yml`.
pub fn fixture(name: &str) -> Result<Problem, cartsplit::input::InputError> {
    load_problem(format!("fixtures/problems/{name}.yml"))
}

/// Solve a fixture under `policy`.
pub fn solve_fixture(
    name: &str,
    policy: DemandPolicy,
) -> Result<(Problem, SolutionPlan), Box<dyn std::error::Error>> {
    let problem = fixture(name)?;
    let plan = solve(&problem, policy)?;

    Ok((problem, plan))
}

/// Solve `problem` under `policy` with the default backend.
pub fn solve(problem: &Problem, policy: DemandPolicy) -> Result<SolutionPlan, SolverError> {
    MILPSolver::solve(problem, SolveOptions::new(policy))
}

/// Check every plan-level guarantee: capacity, demand, and the shipping rules.
pub fn assert_plan_invariants(problem: &Problem, plan: &SolutionPlan, policy: DemandPolicy) {
    for (item_idx, item) in problem.items().iter().enumerate() {
        let bought = plan.units_for_item(item_idx);

        match policy {
            DemandPolicy::AtLeast => assert!(
                bought >= item.desired(),
                "{} bought {bought}, wanted at least {}",
                item.id(),
                item.desired()
            ),
            DemandPolicy::Exactly => assert_eq!(
                bought,
                item.desired(),
                "{} bought {bought}, wanted exactly {}",
                item.id(),
                item.desired()
            ),
        }

        for retailer_idx in 0..problem.retailers().len() {
            assert!(
                plan.quantity(item_idx, retailer_idx) <= problem.inventory(item_idx, retailer_idx),
                "capacity exceeded for item {item_idx} at retailer {retailer_idx}"
            );
        }
    }

    let mut total = 0_i64;

    for (retailer_idx, retailer) in problem.retailers().iter().enumerate() {
        let bill = plan.bill(retailer_idx);

        assert!(bill.is_some(), "missing bill for retailer {retailer_idx}");

        let Some(bill) = bill else {
            continue;
        };

        let subtotal = bill.subtotal().to_minor_units();
        let shipping = bill.shipping().to_minor_units();
        let threshold = retailer.free_shipping_threshold().to_minor_units();
        let fee = retailer.shipping_fee().to_minor_units();

        if bill.is_empty() {
            assert_eq!(subtotal, 0, "empty order with a subtotal at {}", retailer.id());
            assert_eq!(shipping, 0, "empty order charged shipping at {}", retailer.id());
        } else if subtotal >= threshold {
            assert_eq!(shipping, 0, "shipping charged above threshold at {}", retailer.id());
        } else if subtotal > 0 {
            assert_eq!(shipping, fee, "shipping waived below threshold at {}", retailer.id());
        }

        total += subtotal + shipping;
    }

    assert_eq!(total, plan.total().to_minor_units(), "bills do not add up");
}
