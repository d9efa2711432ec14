//! Problem Data

use std::fmt;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rustc_hash::FxHashMap;
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, USD},
};
use serde::Deserialize;
use thiserror::Error;

/// Monetary amount in the problem currency.
pub type Amount = Money<'static, Currency>;

/// Table an entry was declared in, used when reporting bad references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// Unit price table
    Prices,

    /// Inventory cap table
    Inventory,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Prices => f.write_str("price"),
            Table::Inventory => f.write_str("inventory"),
        }
    }
}

/// Problem validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Currency code is not supported.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Identifier is empty once normalised.
    #[error("identifier {0:?} is empty after normalisation")]
    EmptyIdentifier(String),

    /// The same item identifier was declared twice.
    #[error("duplicate item identifier: {0}")]
    DuplicateItem(String),

    /// The same retailer identifier was declared twice.
    #[error("duplicate retailer identifier: {0}")]
    DuplicateRetailer(String),

    /// A price or inventory entry names an item that was never declared.
    #[error("{table} entry references undeclared item: {item}")]
    UnknownItem {
        /// Table holding the entry
        table: Table,
        /// Referenced item identifier
        item: String,
    },

    /// A price or inventory entry names a retailer that was never declared.
    #[error("{table} entry references undeclared retailer: {retailer}")]
    UnknownRetailer {
        /// Table holding the entry
        table: Table,
        /// Referenced retailer identifier
        retailer: String,
    },

    /// Two entries of the same table target the same (item, retailer) pair.
    #[error("duplicate {table} entry for item {item} at retailer {retailer}")]
    DuplicateEntry {
        /// Table holding the entries
        table: Table,
        /// Item identifier
        item: String,
        /// Retailer identifier
        retailer: String,
    },

    /// A quantity or amount is negative.
    #[error("{subject} must not be negative, got {value}")]
    Negative {
        /// What the value describes
        subject: String,
        /// Offending value
        value: Decimal,
    },

    /// Desired quantity is zero.
    #[error("desired quantity of item {0} must be positive")]
    ZeroQuantity(String),

    /// A unit count has a fractional part.
    #[error("{subject} must be a whole number, got {value}")]
    NonInteger {
        /// What the value describes
        subject: String,
        /// Offending value
        value: Decimal,
    },

    /// A value does not fit the type used to store it.
    #[error("{subject} is out of range: {value}")]
    OutOfRange {
        /// What the value describes
        subject: String,
        /// Offending value
        value: Decimal,
    },

    /// An amount has more decimal places than the currency's minor unit.
    #[error("{subject} has more decimal places than {currency} allows: {value}")]
    ExcessPrecision {
        /// What the value describes
        subject: String,
        /// Offending value
        value: Decimal,
        /// ISO code of the problem currency
        currency: &'static str,
    },
}

/// Unvalidated problem tables, as read from a problem file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProblem {
    /// ISO currency code shared by every amount (e.g. `"USD"`)
    pub currency: String,

    /// Items to buy and how many of each
    pub items: Vec<RawItem>,

    /// Retailers and their shipping terms
    pub retailers: Vec<RawRetailer>,

    /// Unit prices per (item, retailer) pair
    #[serde(default)]
    pub prices: Vec<RawPrice>,

    /// Inventory caps per (item, retailer) pair
    #[serde(default)]
    pub inventory: Vec<RawInventory>,
}

/// Unvalidated item row
#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    /// Item identifier
    pub id: String,

    /// Desired quantity
    pub quantity: Decimal,
}

/// Unvalidated retailer row
#[derive(Debug, Clone, Deserialize)]
pub struct RawRetailer {
    /// Retailer identifier
    pub id: String,

    /// Flat shipping fee charged below the threshold
    pub shipping_fee: Decimal,

    /// Subtotal at or above which shipping is free
    pub free_shipping_threshold: Decimal,
}

/// Unvalidated price row
#[derive(Debug, Clone, Deserialize)]
pub struct RawPrice {
    /// Item identifier
    pub item: String,

    /// Retailer identifier
    pub retailer: String,

    /// Unit price
    pub price: Decimal,
}

/// Unvalidated inventory row
#[derive(Debug, Clone, Deserialize)]
pub struct RawInventory {
    /// Item identifier
    pub item: String,

    /// Retailer identifier
    pub retailer: String,

    /// Maximum purchasable units
    pub units: Decimal,
}

/// An item to buy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: String,
    desired: u32,
}

impl Item {
    /// Normalised item identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of units wanted
    pub fn desired(&self) -> u32 {
        self.desired
    }
}

/// A retailer and its shipping terms.
#[derive(Debug, Clone)]
pub struct Retailer {
    id: String,
    shipping_fee: Amount,
    free_shipping_threshold: Amount,
}

impl Retailer {
    /// Normalised retailer identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Flat shipping fee
    pub fn shipping_fee(&self) -> Amount {
        self.shipping_fee
    }

    /// Subtotal at which shipping becomes free
    pub fn free_shipping_threshold(&self) -> Amount {
        self.free_shipping_threshold
    }
}

/// A priced (item, retailer) pair.
#[derive(Debug, Clone, Copy)]
pub struct Offer {
    price: Amount,
    inventory: u32,
}

impl Offer {
    /// Unit price
    pub fn price(&self) -> Amount {
        self.price
    }

    /// Units in stock
    pub fn inventory(&self) -> u32 {
        self.inventory
    }
}

/// Validated purchase problem.
///
/// Items and retailers are addressed by their position in declaration order.
/// Pairs without a price are unavailable and behave as if their inventory
/// were zero.
#[derive(Debug, Clone)]
pub struct Problem {
    currency: &'static Currency,
    items: Vec<Item>,
    retailers: Vec<Retailer>,
    offers: FxHashMap<(usize, usize), Offer>,
}

impl Problem {
    /// Currency shared by every amount in the problem
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Items in declaration order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Retailers in declaration order
    pub fn retailers(&self) -> &[Retailer] {
        &self.retailers
    }

    /// Offer for an (item, retailer) pair, if the pair is priced
    pub fn offer(&self, item_idx: usize, retailer_idx: usize) -> Option<&Offer> {
        self.offers.get(&(item_idx, retailer_idx))
    }

    /// Effective inventory cap for a pair (zero when unavailable)
    pub fn inventory(&self, item_idx: usize, retailer_idx: usize) -> u32 {
        self.offer(item_idx, retailer_idx)
            .map_or(0, Offer::inventory)
    }

    /// Unit price for a pair in minor units (zero when unavailable)
    pub fn unit_price_minor(&self, item_idx: usize, retailer_idx: usize) -> i64 {
        self.offer(item_idx, retailer_idx)
            .map_or(0, |offer| offer.price().to_minor_units())
    }

    /// Iterate over every (item, retailer) index pair, item-major.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let retailer_count = self.retailers.len();

        (0..self.items.len())
            .flat_map(move |item_idx| (0..retailer_count).map(move |r| (item_idx, r)))
    }

    /// Position of an item by identifier (normalised before lookup)
    pub fn item_index(&self, id: &str) -> Option<usize> {
        let id = normalize_identifier(id);

        self.items.iter().position(|item| item.id == id)
    }

    /// Position of a retailer by identifier (normalised before lookup)
    pub fn retailer_index(&self, id: &str) -> Option<usize> {
        let id = normalize_identifier(id);

        self.retailers
            .iter()
            .position(|retailer| retailer.id == id)
    }

    /// Number of minor units in one major unit of the problem currency.
    pub fn minor_unit_scale(&self) -> i64 {
        minor_unit_scale(self.currency)
    }
}

impl TryFrom<&RawProblem> for Problem {
    type Error = ValidationError;

    fn try_from(raw: &RawProblem) -> Result<Self, Self::Error> {
        let currency = parse_currency(&raw.currency)?;

        let items = validate_items(&raw.items)?;
        let retailers = validate_retailers(&raw.retailers, currency)?;

        let item_lookup = index_by_id(items.iter().map(Item::id));
        let retailer_lookup = index_by_id(retailers.iter().map(Retailer::id));

        let mut prices: FxHashMap<(usize, usize), Amount> = FxHashMap::default();

        for entry in &raw.prices {
            let key = resolve_pair(
                Table::Prices,
                &entry.item,
                &entry.retailer,
                &item_lookup,
                &retailer_lookup,
            )?;

            let subject = format!("price of {} at {}", entry.item, entry.retailer);
            let price = to_amount(entry.price, currency, &subject)?;

            if prices.insert(key, price).is_some() {
                return Err(duplicate_entry(Table::Prices, &entry.item, &entry.retailer));
            }
        }

        let mut inventory: FxHashMap<(usize, usize), u32> = FxHashMap::default();

        for entry in &raw.inventory {
            let key = resolve_pair(
                Table::Inventory,
                &entry.item,
                &entry.retailer,
                &item_lookup,
                &retailer_lookup,
            )?;

            let subject = format!("inventory of {} at {}", entry.item, entry.retailer);
            let units = to_count(entry.units, &subject)?;

            if inventory.insert(key, units).is_some() {
                return Err(duplicate_entry(
                    Table::Inventory,
                    &entry.item,
                    &entry.retailer,
                ));
            }
        }

        // Only priced pairs are purchasable; a stock figure without a price is ignored.
        let offers = prices
            .into_iter()
            .map(|(key, price)| {
                let units = inventory.get(&key).copied().unwrap_or(0);

                (
                    key,
                    Offer {
                        price,
                        inventory: units,
                    },
                )
            })
            .collect();

        Ok(Self {
            currency,
            items,
            retailers,
            offers,
        })
    }
}

impl TryFrom<RawProblem> for Problem {
    type Error = ValidationError;

    fn try_from(raw: RawProblem) -> Result<Self, Self::Error> {
        Problem::try_from(&raw)
    }
}

/// Normalise an identifier: lower-case it and collapse every run of
/// characters outside `[0-9a-z]` into a single `-`.
pub fn normalize_identifier(id: &str) -> String {
    let mut normalized = String::with_capacity(id.len());
    let mut in_separator_run = false;

    for c in id.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            normalized.push(c);
            in_separator_run = false;
        } else if !in_separator_run {
            normalized.push('-');
            in_separator_run = true;
        }
    }

    normalized
}

/// Look up a supported ISO currency by code.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownCurrency`] for anything other than GBP, USD or EUR.
pub fn parse_currency(code: &str) -> Result<&'static Currency, ValidationError> {
    match code.trim().to_ascii_uppercase().as_str() {
        "GBP" => Ok(GBP),
        "USD" => Ok(USD),
        "EUR" => Ok(EUR),
        _ => Err(ValidationError::UnknownCurrency(code.to_string())),
    }
}

pub(crate) fn minor_unit_scale(currency: &Currency) -> i64 {
    10_i64.pow(currency.exponent)
}

fn validate_items(raw: &[RawItem]) -> Result<Vec<Item>, ValidationError> {
    let mut items: Vec<Item> = Vec::with_capacity(raw.len());

    for entry in raw {
        let id = validated_identifier(&entry.id)?;

        if items.iter().any(|item| item.id == id) {
            return Err(ValidationError::DuplicateItem(id));
        }

        let desired = to_count(entry.quantity, &format!("desired quantity of {id}"))?;

        if desired == 0 {
            return Err(ValidationError::ZeroQuantity(id));
        }

        items.push(Item { id, desired });
    }

    Ok(items)
}

fn validate_retailers(
    raw: &[RawRetailer],
    currency: &'static Currency,
) -> Result<Vec<Retailer>, ValidationError> {
    let mut retailers: Vec<Retailer> = Vec::with_capacity(raw.len());

    for entry in raw {
        let id = validated_identifier(&entry.id)?;

        if retailers.iter().any(|retailer| retailer.id == id) {
            return Err(ValidationError::DuplicateRetailer(id));
        }

        let shipping_fee = to_amount(
            entry.shipping_fee,
            currency,
            &format!("shipping fee of {id}"),
        )?;

        let free_shipping_threshold = to_amount(
            entry.free_shipping_threshold,
            currency,
            &format!("free shipping threshold of {id}"),
        )?;

        retailers.push(Retailer {
            id,
            shipping_fee,
            free_shipping_threshold,
        });
    }

    Ok(retailers)
}

fn validated_identifier(raw: &str) -> Result<String, ValidationError> {
    let id = normalize_identifier(raw);

    if id.is_empty() {
        return Err(ValidationError::EmptyIdentifier(raw.to_string()));
    }

    Ok(id)
}

fn index_by_id<'a>(ids: impl Iterator<Item = &'a str>) -> FxHashMap<&'a str, usize> {
    ids.enumerate().map(|(idx, id)| (id, idx)).collect()
}

fn resolve_pair(
    table: Table,
    item: &str,
    retailer: &str,
    item_lookup: &FxHashMap<&str, usize>,
    retailer_lookup: &FxHashMap<&str, usize>,
) -> Result<(usize, usize), ValidationError> {
    let item_id = normalize_identifier(item);
    let retailer_id = normalize_identifier(retailer);

    let item_idx = item_lookup
        .get(item_id.as_str())
        .copied()
        .ok_or(ValidationError::UnknownItem {
            table,
            item: item_id.clone(),
        })?;

    let retailer_idx = retailer_lookup
        .get(retailer_id.as_str())
        .copied()
        .ok_or(ValidationError::UnknownRetailer {
            table,
            retailer: retailer_id.clone(),
        })?;

    Ok((item_idx, retailer_idx))
}

fn duplicate_entry(table: Table, item: &str, retailer: &str) -> ValidationError {
    ValidationError::DuplicateEntry {
        table,
        item: normalize_identifier(item),
        retailer: normalize_identifier(retailer),
    }
}

fn to_count(value: Decimal, subject: &str) -> Result<u32, ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::Negative {
            subject: subject.to_string(),
            value,
        });
    }

    if !value.fract().is_zero() {
        return Err(ValidationError::NonInteger {
            subject: subject.to_string(),
            value,
        });
    }

    value.to_u32().ok_or_else(|| ValidationError::OutOfRange {
        subject: subject.to_string(),
        value,
    })
}

fn to_amount(
    value: Decimal,
    currency: &'static Currency,
    subject: &str,
) -> Result<Amount, ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::Negative {
            subject: subject.to_string(),
            value,
        });
    }

    let scaled = value
        .checked_mul(Decimal::from(minor_unit_scale(currency)))
        .ok_or_else(|| ValidationError::OutOfRange {
            subject: subject.to_string(),
            value,
        })?;

    if !scaled.fract().is_zero() {
        return Err(ValidationError::ExcessPrecision {
            subject: subject.to_string(),
            value,
            currency: currency.iso_alpha_code,
        });
    }

    let minor_units = scaled.to_i64().ok_or_else(|| ValidationError::OutOfRange {
        subject: subject.to_string(),
        value,
    })?;

    Ok(Money::from_minor(minor_units, currency))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use testresult::TestResult;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap_or_default()
    }

    fn raw_problem() -> RawProblem {
        RawProblem {
            currency: "USD".to_string(),
            items: vec![
                RawItem {
                    id: "Spinner Bait".to_string(),
                    quantity: dec("3"),
                },
                RawItem {
                    id: "jig".to_string(),
                    quantity: dec("20"),
                },
            ],
            retailers: vec![
                RawRetailer {
                    id: "Tackle Shop".to_string(),
                    shipping_fee: dec("7.00"),
                    free_shipping_threshold: dec("50.00"),
                },
                RawRetailer {
                    id: "lures.com".to_string(),
                    shipping_fee: dec("4"),
                    free_shipping_threshold: dec("60"),
                },
            ],
            prices: vec![
                RawPrice {
                    item: "spinner bait".to_string(),
                    retailer: "tackle shop".to_string(),
                    price: dec("4.99"),
                },
                RawPrice {
                    item: "jig".to_string(),
                    retailer: "lures.com".to_string(),
                    price: dec("3.49"),
                },
            ],
            inventory: vec![
                RawInventory {
                    item: "spinner bait".to_string(),
                    retailer: "tackle shop".to_string(),
                    units: dec("100"),
                },
                RawInventory {
                    item: "jig".to_string(),
                    retailer: "tackle shop".to_string(),
                    units: dec("15"),
                },
            ],
        }
    }

    #[test]
    fn normalize_identifier_collapses_separators() {
        assert_eq!(normalize_identifier("Spinner  Bait #2"), "spinner-bait-2");
        assert_eq!(normalize_identifier("lures.com"), "lures-com");
        assert_eq!(normalize_identifier("R1"), "r1");
    }

    #[test]
    fn valid_problem_is_accepted() -> TestResult {
        let problem = Problem::try_from(raw_problem())?;

        assert_eq!(problem.items().len(), 2);
        assert_eq!(problem.retailers().len(), 2);
        assert_eq!(problem.item_index("Spinner Bait"), Some(0));
        assert_eq!(problem.retailer_index("lures.com"), Some(1));
        assert_eq!(problem.minor_unit_scale(), 100);

        let offer = problem.offer(0, 0).ok_or("missing offer")?;

        assert_eq!(offer.price().to_minor_units(), 499);
        assert_eq!(offer.inventory(), 100);

        Ok(())
    }

    #[test]
    fn missing_pairs_default_to_zero_inventory() -> TestResult {
        let problem = Problem::try_from(raw_problem())?;

        // Priced but no stock entry
        assert_eq!(problem.inventory(1, 1), 0);
        assert_eq!(problem.unit_price_minor(1, 1), 349);

        // Stocked but never priced
        assert!(problem.offer(1, 0).is_none());
        assert_eq!(problem.inventory(1, 0), 0);

        // Neither
        assert_eq!(problem.inventory(0, 1), 0);
        assert_eq!(problem.unit_price_minor(0, 1), 0);

        Ok(())
    }

    #[test]
    fn pairs_iterates_item_major() -> TestResult {
        let problem = Problem::try_from(raw_problem())?;

        let pairs: Vec<_> = problem.pairs().collect();

        assert_eq!(pairs, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);

        Ok(())
    }

    #[test]
    fn undeclared_item_reference_is_rejected() {
        let mut raw = raw_problem();

        raw.prices.push(RawPrice {
            item: "crankbait".to_string(),
            retailer: "lures.com".to_string(),
            price: dec("1"),
        });

        assert_eq!(
            Problem::try_from(raw).err(),
            Some(ValidationError::UnknownItem {
                table: Table::Prices,
                item: "crankbait".to_string(),
            })
        );
    }

    #[test]
    fn undeclared_retailer_reference_is_rejected() {
        let mut raw = raw_problem();

        raw.inventory.push(RawInventory {
            item: "jig".to_string(),
            retailer: "bait barn".to_string(),
            units: dec("1"),
        });

        assert_eq!(
            Problem::try_from(raw).err(),
            Some(ValidationError::UnknownRetailer {
                table: Table::Inventory,
                retailer: "bait-barn".to_string(),
            })
        );
    }

    #[test]
    fn negative_values_are_rejected() {
        let mut raw = raw_problem();

        if let Some(price) = raw.prices.first_mut() {
            price.price = dec("-1.00");
        }

        assert!(matches!(
            Problem::try_from(raw),
            Err(ValidationError::Negative { .. })
        ));

        let mut raw = raw_problem();

        if let Some(retailer) = raw.retailers.first_mut() {
            retailer.free_shipping_threshold = dec("-5");
        }

        assert!(matches!(
            Problem::try_from(raw),
            Err(ValidationError::Negative { .. })
        ));

        let mut raw = raw_problem();

        if let Some(entry) = raw.inventory.first_mut() {
            entry.units = dec("-2");
        }

        assert!(matches!(
            Problem::try_from(raw),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn zero_desired_quantity_is_rejected() {
        let mut raw = raw_problem();

        if let Some(item) = raw.items.first_mut() {
            item.quantity = Decimal::ZERO;
        }

        assert_eq!(
            Problem::try_from(raw).err(),
            Some(ValidationError::ZeroQuantity("spinner-bait".to_string()))
        );
    }

    #[test]
    fn fractional_quantities_are_rejected() {
        let mut raw = raw_problem();

        if let Some(item) = raw.items.first_mut() {
            item.quantity = dec("2.5");
        }

        assert!(matches!(
            Problem::try_from(raw),
            Err(ValidationError::NonInteger { .. })
        ));

        let mut raw = raw_problem();

        if let Some(entry) = raw.inventory.first_mut() {
            entry.units = dec("0.5");
        }

        assert!(matches!(
            Problem::try_from(raw),
            Err(ValidationError::NonInteger { .. })
        ));
    }

    #[test]
    fn sub_cent_prices_are_rejected() {
        let mut raw = raw_problem();

        if let Some(price) = raw.prices.first_mut() {
            price.price = dec("4.995");
        }

        assert!(matches!(
            Problem::try_from(raw),
            Err(ValidationError::ExcessPrecision { currency: "USD", .. })
        ));
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let mut raw = raw_problem();

        raw.items.push(RawItem {
            id: "JIG".to_string(),
            quantity: dec("1"),
        });

        assert_eq!(
            Problem::try_from(raw).err(),
            Some(ValidationError::DuplicateItem("jig".to_string()))
        );

        let mut raw = raw_problem();

        raw.prices.push(RawPrice {
            item: "Jig".to_string(),
            retailer: "Lures.com".to_string(),
            price: dec("3.00"),
        });

        assert!(matches!(
            Problem::try_from(raw),
            Err(ValidationError::DuplicateEntry {
                table: Table::Prices,
                ..
            })
        ));
    }

    #[test]
    fn unknown_currency_is_rejected() {
        let mut raw = raw_problem();

        raw.currency = "XYZ".to_string();

        assert_eq!(
            Problem::try_from(raw).err(),
            Some(ValidationError::UnknownCurrency("XYZ".to_string()))
        );
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let mut raw = raw_problem();

        raw.retailers.push(RawRetailer {
            id: String::new(),
            shipping_fee: Decimal::ZERO,
            free_shipping_threshold: Decimal::ZERO,
        });

        assert!(matches!(
            Problem::try_from(raw),
            Err(ValidationError::EmptyIdentifier(_))
        ));
    }
}
