//! Purchase Plans

use std::{fs, io, path::Path};

use good_lp::Solution;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use serde::Serialize;
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;
use tracing::debug;

use crate::{
    problem::{Amount, Item, Problem, normalize_identifier},
    solvers::{
        SolveStatus, SolverError,
        milp::{BINARY_THRESHOLD, SolveOutcome},
    },
};

/// Errors that can occur when rendering or exporting a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// IO error writing the plan
    #[error(transparent)]
    Io(#[from] io::Error),

    /// YAML serialization error
    #[error("Failed to serialize plan: {0}")]
    Yaml(#[from] serde_norway::Error),
}

/// What one retailer is paid under a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct RetailerBill {
    retailer: usize,
    units: u32,
    subtotal: Amount,
    shipping: Amount,
    total: Amount,
}

impl RetailerBill {
    /// Retailer index in the problem
    pub fn retailer(&self) -> usize {
        self.retailer
    }

    /// Units ordered from the retailer across all items
    pub fn units(&self) -> u32 {
        self.units
    }

    /// Whether nothing is ordered from the retailer
    pub fn is_empty(&self) -> bool {
        self.units == 0
    }

    /// Item bill: sum of unit price times quantity
    pub fn subtotal(&self) -> Amount {
        self.subtotal
    }

    /// Shipping fee paid (zero when waived or when nothing is ordered)
    pub fn shipping(&self) -> Amount {
        self.shipping
    }

    /// Item bill plus shipping
    pub fn total(&self) -> Amount {
        self.total
    }
}

/// The cheapest way to buy every item, as found by the solver.
#[derive(Debug, Clone)]
pub struct SolutionPlan {
    currency: &'static Currency,
    item_ids: Vec<String>,
    retailer_ids: Vec<String>,
    desired: Vec<u32>,

    /// Units bought, item-major
    quantities: Vec<u32>,

    bills: SmallVec<[RetailerBill; 10]>,
    total: Amount,
}

impl SolutionPlan {
    /// Read a plan out of a solver outcome.
    ///
    /// Quantities are rounded to the nearest integer and binaries are read as
    /// set above [`BINARY_THRESHOLD`].
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::NoSolution`] if the outcome is not optimal, or
    /// another [`SolverError`] if a solver value cannot be read back.
    pub fn from_outcome(problem: &Problem, outcome: &SolveOutcome) -> Result<Self, SolverError> {
        let assignment = match (&outcome.assignment, outcome.status) {
            (Some(assignment), SolveStatus::Optimal) => assignment,
            (_, status) => return Err(SolverError::NoSolution { status }),
        };

        let vars = &outcome.variables;
        let currency = problem.currency();
        let retailer_count = problem.retailers().len();

        let mut quantities = Vec::with_capacity(problem.items().len() * retailer_count);

        for (item, retailer) in problem.pairs() {
            let var = vars
                .quantity(item, retailer)
                .ok_or(SolverError::ModelConstruction {
                    message: "quantity variable missing for item/retailer pair",
                })?;

            let value = assignment.value(var);
            let units = value
                .round()
                .to_u32()
                .ok_or(SolverError::ValueOutOfRange(value))?;

            quantities.push(units);
        }

        let mut bills: SmallVec<[RetailerBill; 10]> = SmallVec::with_capacity(retailer_count);
        let mut total = Money::from_minor(0, currency);

        for (retailer_idx, retailer) in problem.retailers().iter().enumerate() {
            let mut units = 0_u32;
            let mut subtotal = Money::from_minor(0, currency);

            for item_idx in 0..problem.items().len() {
                let bought = quantities
                    .get(item_idx * retailer_count + retailer_idx)
                    .copied()
                    .unwrap_or(0);

                if bought == 0 {
                    continue;
                }

                let line = problem
                    .unit_price_minor(item_idx, retailer_idx)
                    .checked_mul(i64::from(bought))
                    .ok_or(SolverError::ValueOutOfRange(f64::from(bought)))?;

                units = units.saturating_add(bought);
                subtotal = subtotal.add(Money::from_minor(line, currency))?;
            }

            let y = vars
                .pay_shipping(retailer_idx)
                .ok_or(SolverError::ModelConstruction {
                    message: "shipping indicator missing for retailer",
                })?;

            let shipping = if assignment.value(y) > BINARY_THRESHOLD {
                retailer.shipping_fee()
            } else {
                Money::from_minor(0, currency)
            };

            let retailer_total = subtotal.add(shipping)?;

            total = total.add(retailer_total)?;

            bills.push(RetailerBill {
                retailer: retailer_idx,
                units,
                subtotal,
                shipping,
                total: retailer_total,
            });
        }

        debug!(total = %total, "extracted plan");

        Ok(Self {
            currency,
            item_ids: problem.items().iter().map(|item| item.id().to_string()).collect(),
            retailer_ids: problem
                .retailers()
                .iter()
                .map(|retailer| retailer.id().to_string())
                .collect(),
            desired: problem.items().iter().map(Item::desired).collect(),
            quantities,
            bills,
            total,
        })
    }

    /// Currency of every amount in the plan
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Units of `item` bought from `retailer` (zero for unknown indexes)
    pub fn quantity(&self, item: usize, retailer: usize) -> u32 {
        if item >= self.item_ids.len() || retailer >= self.retailer_ids.len() {
            return 0;
        }

        self.quantities
            .get(item * self.retailer_ids.len() + retailer)
            .copied()
            .unwrap_or(0)
    }

    /// Units bought by identifier; `None` if either identifier is unknown.
    pub fn quantity_of(&self, item_id: &str, retailer_id: &str) -> Option<u32> {
        let item = position(&self.item_ids, item_id)?;
        let retailer = position(&self.retailer_ids, retailer_id)?;

        Some(self.quantity(item, retailer))
    }

    /// Total units of `item` across all retailers
    pub fn units_for_item(&self, item: usize) -> u32 {
        (0..self.retailer_ids.len())
            .map(|retailer| self.quantity(item, retailer))
            .sum()
    }

    /// Items bought beyond their desired quantity, with the surplus.
    ///
    /// Surplus only appears under the at-least policy, when extra units push a
    /// retailer over its free-shipping threshold and lower the total.
    pub fn extra_units(&self) -> SmallVec<[(usize, u32); 10]> {
        self.desired
            .iter()
            .enumerate()
            .filter_map(|(item, &desired)| {
                let surplus = self.units_for_item(item).saturating_sub(desired);

                (surplus > 0).then_some((item, surplus))
            })
            .collect()
    }

    /// Per-retailer bills in retailer declaration order
    pub fn bills(&self) -> &[RetailerBill] {
        &self.bills
    }

    /// Bill for the retailer at `retailer`
    pub fn bill(&self, retailer: usize) -> Option<&RetailerBill> {
        self.bills.get(retailer)
    }

    /// Grand total: every subtotal plus every shipping fee paid
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Serializable summary of the plan.
    pub fn report(&self) -> PlanReport {
        let quantities = (0..self.item_ids.len())
            .flat_map(|item| (0..self.retailer_ids.len()).map(move |retailer| (item, retailer)))
            .filter_map(|(item, retailer)| {
                let units = self.quantity(item, retailer);

                (units > 0).then(|| QuantityEntry {
                    item: self.item_id(item).to_string(),
                    retailer: self.retailer_id(retailer).to_string(),
                    units,
                })
            })
            .collect();

        let bills = self
            .bills
            .iter()
            .map(|bill| BillEntry {
                retailer: self.retailer_id(bill.retailer).to_string(),
                units: bill.units,
                items: self.decimal(bill.subtotal),
                shipping: self.decimal(bill.shipping),
                total: self.decimal(bill.total),
            })
            .collect();

        let extra_units = self
            .extra_units()
            .into_iter()
            .map(|(item, units)| ExtraUnitsEntry {
                item: self.item_id(item).to_string(),
                units,
            })
            .collect();

        PlanReport {
            currency: self.currency.iso_alpha_code.to_string(),
            total: self.decimal(self.total),
            quantities,
            bills,
            extra_units,
        }
    }

    /// Write [`Self::report`] as YAML to `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`] if the report cannot be serialized or written.
    pub fn write_report(&self, path: impl AsRef<Path>) -> Result<(), PlanError> {
        let yaml = serde_norway::to_string(&self.report())?;

        fs::write(path, yaml)?;

        Ok(())
    }

    /// Render the quantity table and the bill table.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Io`] if writing to `out` fails.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), PlanError> {
        write_table(&mut out, self.quantity_table(), 1)?;
        write_table(&mut out, self.bill_table(), 1)?;

        let extra = self.extra_units();

        if !extra.is_empty() {
            writeln!(out, " Bought beyond desired quantity:")?;

            for (item, units) in extra {
                writeln!(out, "   {}: +{units}", self.item_id(item))?;
            }

            writeln!(out)?;
        }

        Ok(())
    }

    fn quantity_table(&self) -> Builder {
        let mut builder = Builder::default();

        let mut header = vec!["Item".to_string()];
        header.extend(self.retailer_ids.iter().cloned());
        header.push("Bought".to_string());
        header.push("Desired".to_string());

        builder.push_record(header);

        for (item, id) in self.item_ids.iter().enumerate() {
            let mut row = vec![id.clone()];

            row.extend(
                (0..self.retailer_ids.len()).map(|retailer| {
                    self.quantity(item, retailer).to_string()
                }),
            );

            row.push(self.units_for_item(item).to_string());
            row.push(self.desired.get(item).copied().unwrap_or(0).to_string());

            builder.push_record(row);
        }

        builder
    }

    fn bill_table(&self) -> Builder {
        let mut builder = Builder::default();

        builder.push_record(["Retailer", "Items", "Shipping", "Total"]);

        for bill in &self.bills {
            builder.push_record([
                self.retailer_id(bill.retailer).to_string(),
                bill.subtotal.to_string(),
                bill.shipping.to_string(),
                bill.total.to_string(),
            ]);
        }

        builder.push_record([
            "Total".to_string(),
            String::new(),
            String::new(),
            self.total.to_string(),
        ]);

        builder
    }

    fn item_id(&self, item: usize) -> &str {
        self.item_ids.get(item).map_or("", String::as_str)
    }

    fn retailer_id(&self, retailer: usize) -> &str {
        self.retailer_ids.get(retailer).map_or("", String::as_str)
    }

    fn decimal(&self, amount: Amount) -> Decimal {
        Decimal::new(amount.to_minor_units(), self.currency.exponent)
    }
}

/// Serializable summary of a [`SolutionPlan`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    /// ISO currency code of every amount
    pub currency: String,

    /// Grand total
    pub total: Decimal,

    /// Non-zero quantities
    pub quantities: Vec<QuantityEntry>,

    /// One bill per retailer
    pub bills: Vec<BillEntry>,

    /// Items bought beyond their desired quantity
    pub extra_units: Vec<ExtraUnitsEntry>,
}

/// Units of one item bought from one retailer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuantityEntry {
    /// Item identifier
    pub item: String,

    /// Retailer identifier
    pub retailer: String,

    /// Units bought
    pub units: u32,
}

/// What one retailer is paid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillEntry {
    /// Retailer identifier
    pub retailer: String,

    /// Units ordered
    pub units: u32,

    /// Item bill
    pub items: Decimal,

    /// Shipping bill
    pub shipping: Decimal,

    /// Item bill plus shipping
    pub total: Decimal,
}

/// Surplus units of one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraUnitsEntry {
    /// Item identifier
    pub item: String,

    /// Units beyond the desired quantity
    pub units: u32,
}

fn position(ids: &[String], id: &str) -> Option<usize> {
    let id = normalize_identifier(id);

    ids.iter().position(|candidate| *candidate == id)
}

fn write_table(
    out: &mut impl io::Write,
    builder: Builder,
    first_numeric_column: usize,
) -> Result<(), PlanError> {
    let mut table = builder.build();

    table.with(Theme::from(Style::modern_rounded()));
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(first_numeric_column..), Alignment::right());

    writeln!(out, "\n{table}")?;

    Ok(())
}
