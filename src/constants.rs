//! Shipping Constants
//!
//! Dominating constants used to linearise the conditional shipping logic.
//! For a retailer with free-shipping threshold `T` and total stock `U`:
//!
//! - `big_m = T + 1`, which exceeds `T - subtotal` for every non-negative subtotal.
//! - `big_n = T + 1 + U`, which exceeds both the units that could ever be ordered
//!   from the retailer and `big_m`.

use rust_decimal::Decimal;
use smallvec::SmallVec;
use tracing::debug;

use crate::problem::Problem;

/// Constants for a single retailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetailerConstants {
    big_m: Decimal,
    big_n: Decimal,
}

impl RetailerConstants {
    /// Derive the constants from a threshold (in major units) and the retailer's
    /// total stock across all items.
    pub fn from_terms(free_shipping_threshold: Decimal, total_units: u64) -> Self {
        let big_m = free_shipping_threshold + Decimal::ONE;
        let big_n = big_m + Decimal::from(total_units);

        Self { big_m, big_n }
    }

    /// Multiplier on the shipping-due indicator, in major units
    pub fn big_m(&self) -> Decimal {
        self.big_m
    }

    /// Multiplier on the empty-order indicator
    pub fn big_n(&self) -> Decimal {
        self.big_n
    }
}

/// Constants for every retailer in a problem, in retailer declaration order.
#[derive(Debug, Clone, Default)]
pub struct DerivedConstants {
    retailers: SmallVec<[RetailerConstants; 10]>,
}

impl DerivedConstants {
    /// Constants for the retailer at `retailer_idx`
    pub fn get(&self, retailer_idx: usize) -> Option<&RetailerConstants> {
        self.retailers.get(retailer_idx)
    }

    /// Number of retailers covered
    pub fn len(&self) -> usize {
        self.retailers.len()
    }

    /// Whether no retailer is covered
    pub fn is_empty(&self) -> bool {
        self.retailers.is_empty()
    }
}

/// Derive per-retailer constants from the problem data.
pub fn derive_constants(problem: &Problem) -> DerivedConstants {
    let exponent = problem.currency().exponent;

    let retailers = problem
        .retailers()
        .iter()
        .enumerate()
        .map(|(retailer_idx, retailer)| {
            let threshold = Decimal::new(
                retailer.free_shipping_threshold().to_minor_units(),
                exponent,
            );

            let total_units: u64 = (0..problem.items().len())
                .map(|item_idx| u64::from(problem.inventory(item_idx, retailer_idx)))
                .sum();

            let constants = RetailerConstants::from_terms(threshold, total_units);

            debug!(
                retailer = retailer.id(),
                big_m = %constants.big_m,
                big_n = %constants.big_n,
                "derived shipping constants"
            );

            constants
        })
        .collect();

    DerivedConstants { retailers }
}
