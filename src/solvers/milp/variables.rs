//! Decision Variables

use good_lp::{Variable, variable};
use smallvec::SmallVec;

use crate::{
    problem::Problem,
    solvers::milp::{
        indicator::Implication,
        observer::{MILPObserver, VariableRole},
        state::MILPState,
    },
};

/// Decision variables of one solve session.
///
/// Quantities are stored item-major: the variable for `(item, retailer)` lives
/// at `item * retailer_count + retailer`.
#[derive(Debug, Clone)]
pub struct DecisionVariables {
    item_count: usize,
    retailer_count: usize,
    quantities: Vec<Variable>,
    pay_shipping: SmallVec<[Variable; 10]>,
    empty_order: SmallVec<[Variable; 10]>,
}

impl DecisionVariables {
    /// Declare `q`, `y` and `z` for every pair and retailer of the problem.
    pub(crate) fn declare(
        problem: &Problem,
        state: &mut MILPState,
        observer: &mut dyn MILPObserver,
    ) -> Self {
        let retailer_count = problem.retailers().len();
        let pb = state.problem_variables_mut();

        let mut quantities = Vec::with_capacity(problem.items().len() * retailer_count);

        for (item, retailer) in problem.pairs() {
            let var = pb.add(variable().integer().min(0));

            observer.on_variable(VariableRole::Quantity { item, retailer }, var);

            quantities.push(var);
        }

        let mut pay_shipping = SmallVec::with_capacity(retailer_count);
        let mut empty_order = SmallVec::with_capacity(retailer_count);

        for retailer in 0..retailer_count {
            let y = pb.add(variable().binary());
            let z = Implication::declare_indicator(pb);

            observer.on_variable(VariableRole::PayShipping { retailer }, y);
            observer.on_variable(VariableRole::EmptyOrder { retailer }, z);

            pay_shipping.push(y);
            empty_order.push(z);
        }

        Self {
            item_count: problem.items().len(),
            retailer_count,
            quantities,
            pay_shipping,
            empty_order,
        }
    }

    /// Number of retailers the variables were declared for
    pub fn retailer_count(&self) -> usize {
        self.retailer_count
    }

    /// Number of items the variables were declared for
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Units of `item` bought from `retailer`
    pub fn quantity(&self, item: usize, retailer: usize) -> Option<Variable> {
        if item >= self.item_count || retailer >= self.retailer_count {
            return None;
        }

        self.quantities
            .get(item * self.retailer_count + retailer)
            .copied()
    }

    /// Shipping-due indicator of `retailer`
    pub fn pay_shipping(&self, retailer: usize) -> Option<Variable> {
        self.pay_shipping.get(retailer).copied()
    }

    /// Empty-order indicator of `retailer`
    pub fn empty_order(&self, retailer: usize) -> Option<Variable> {
        self.empty_order.get(retailer).copied()
    }

    /// Quantity variables of every item bought from `retailer`, with item indexes.
    pub fn quantities_at_retailer(
        &self,
        retailer: usize,
    ) -> impl Iterator<Item = (usize, Variable)> + '_ {
        (0..self.item_count()).filter_map(move |item| {
            self.quantity(item, retailer)
                .map(|var| (item, var))
        })
    }

    /// Quantity variables of `item` at every retailer, with retailer indexes.
    pub fn quantities_of_item(&self, item: usize) -> impl Iterator<Item = (usize, Variable)> + '_ {
        (0..self.retailer_count).filter_map(move |retailer| {
            self.quantity(item, retailer)
                .map(|var| (retailer, var))
        })
    }

    /// Every declared variable, quantities first.
    pub fn all(&self) -> impl Iterator<Item = Variable> + '_ {
        self.quantities
            .iter()
            .chain(self.pay_shipping.iter())
            .chain(self.empty_order.iter())
            .copied()
    }
}
