//! Problem Files
//!
//! Problems are read from YAML documents holding the raw tables:
//!
//! ```yaml
//! currency: USD
//! items:
//!   - id: spinner bait
//!     quantity: 3
//! retailers:
//!   - id: tackle shop
//!     shipping_fee: "7.00"
//!     free_shipping_threshold: "50.00"
//! prices:
//!   - { item: spinner bait, retailer: tackle shop, price: "4.99" }
//! inventory:
//!   - { item: spinner bait, retailer: tackle shop, units: 100 }
//! ```

use std::{fs, path::Path};

use thiserror::Error;
use tracing::debug;

use crate::problem::{Problem, RawProblem, ValidationError};

/// Problem File Errors
#[derive(Debug, Error)]
pub enum InputError {
    /// IO error reading the problem file
    #[error("Failed to read problem file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// The tables parsed but do not describe a valid problem
    #[error("Invalid problem: {0}")]
    Validation(#[from] ValidationError),
}

/// Parse raw problem tables from a YAML document without validating them.
///
/// # Errors
///
/// Returns [`InputError::Yaml`] if the document does not match the table layout.
pub fn raw_problem_from_str(yaml: &str) -> Result<RawProblem, InputError> {
    Ok(serde_norway::from_str(yaml)?)
}

/// Parse and validate a problem from a YAML document.
///
/// # Errors
///
/// Returns an [`InputError`] if the document cannot be parsed or fails validation.
pub fn problem_from_str(yaml: &str) -> Result<Problem, InputError> {
    let raw = raw_problem_from_str(yaml)?;

    Ok(Problem::try_from(raw)?)
}

/// Load and validate a problem from a YAML file.
///
/// # Errors
///
/// Returns an [`InputError`] if the file cannot be read, parsed, or validated.
pub fn load_problem(path: impl AsRef<Path>) -> Result<Problem, InputError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let problem = problem_from_str(&contents)?;

    debug!(
        path = %path.display(),
        items = problem.items().len(),
        retailers = problem.retailers().len(),
        "loaded problem"
    );

    Ok(problem)
}
