//! Plain-text Formulation Renderer
//!
//! Captures the model through observer callbacks and renders it as readable
//! text: declared variables, the objective and every constraint, with
//! variables labelled by the item and retailer identifiers they refer to.
//!
//! ```text
//! Variables
//!   q[lure,north]  integer >= 0
//!   y[north]       binary
//!   z[north]       binary
//!
//! Minimise
//!   1250 q[lure,north] + 500 y[north]
//!
//! Subject to
//!   capacity      q[lure,north] <= 100
//!   demand        q[lure,north] >= 3
//! ```

use std::{fs, io, path::Path};

use good_lp::{Expression, IntoAffineExpression, Variable};
use rustc_hash::FxHashMap;

use crate::{
    problem::Problem,
    solvers::milp::{
        observer::{MILPObserver, VariableRole},
        state::{ConstraintKind, ConstraintRelation},
    },
};

type RecordedConstraint = (ConstraintKind, Expression, ConstraintRelation, f64);

/// Observer that renders the formulation as plain text.
#[derive(Debug, Clone)]
pub struct FormulationWriter {
    item_ids: Vec<String>,
    retailer_ids: Vec<String>,

    /// Variables with their labels, in declaration order
    variables: Vec<(Variable, VariableRole, String)>,

    /// Declaration position of each variable, for ordering terms
    positions: FxHashMap<Variable, usize>,

    objective_terms: Vec<(Variable, f64)>,
    constraints: Vec<RecordedConstraint>,
}

impl FormulationWriter {
    /// Create a writer that labels variables with `problem`'s identifiers.
    pub fn new(problem: &Problem) -> Self {
        Self {
            item_ids: problem
                .items()
                .iter()
                .map(|item| item.id().to_string())
                .collect(),
            retailer_ids: problem
                .retailers()
                .iter()
                .map(|retailer| retailer.id().to_string())
                .collect(),
            variables: Vec::new(),
            positions: FxHashMap::default(),
            objective_terms: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Number of constraints captured so far
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Render the captured formulation.
    pub fn render(&self) -> String {
        let mut out = String::from("Variables\n");

        let width = self
            .variables
            .iter()
            .map(|(_, _, label)| label.len())
            .max()
            .unwrap_or(0);

        for (_, role, label) in &self.variables {
            let domain = match role {
                VariableRole::Quantity { .. } => "integer >= 0",
                VariableRole::PayShipping { .. } | VariableRole::EmptyOrder { .. } => "binary",
            };

            out.push_str(&format!("  {label:<width$}  {domain}\n"));
        }

        out.push_str("\nMinimise\n  ");
        out.push_str(&self.render_terms(self.objective_terms.iter().copied(), 0.0));
        out.push_str("\n\nSubject to\n");

        let kind_width = self
            .constraints
            .iter()
            .map(|(kind, ..)| kind.name().len())
            .max()
            .unwrap_or(0);

        for (kind, lhs, relation, rhs) in &self.constraints {
            let name = kind.name();
            let lhs = self.render_terms(lhs.linear_coefficients(), lhs.constant());

            out.push_str(&format!(
                "  {name:<kind_width$}  {lhs} {relation} {}\n",
                render_number(*rhs)
            ));
        }

        out
    }

    /// Write the rendered formulation to `path`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), io::Error> {
        fs::write(path, self.render())
    }

    fn label(&self, role: VariableRole) -> String {
        match role {
            VariableRole::Quantity { item, retailer } => format!(
                "q[{},{}]",
                id_or_index(&self.item_ids, item),
                id_or_index(&self.retailer_ids, retailer)
            ),
            VariableRole::PayShipping { retailer } => {
                format!("y[{}]", id_or_index(&self.retailer_ids, retailer))
            }
            VariableRole::EmptyOrder { retailer } => {
                format!("z[{}]", id_or_index(&self.retailer_ids, retailer))
            }
        }
    }

    fn var_label(&self, var: Variable) -> &str {
        self.positions
            .get(&var)
            .and_then(|&pos| self.variables.get(pos))
            .map_or("?", |(_, _, label)| label.as_str())
    }

    fn render_terms(&self, terms: impl Iterator<Item = (Variable, f64)>, constant: f64) -> String {
        let mut terms: Vec<(Variable, f64)> = terms
            .filter(|(_, coeff)| coeff.abs() >= f64::EPSILON)
            .collect();

        terms.sort_by_key(|(var, _)| self.positions.get(var).copied().unwrap_or(usize::MAX));

        let mut out = String::new();

        for (var, coeff) in terms {
            let sign = if coeff < 0.0 { "-" } else { "+" };

            if out.is_empty() {
                if coeff < 0.0 {
                    out.push_str("- ");
                }
            } else {
                out.push_str(&format!(" {sign} "));
            }

            let magnitude = coeff.abs();

            if (magnitude - 1.0).abs() >= f64::EPSILON {
                out.push_str(&render_number(magnitude));
                out.push(' ');
            }

            out.push_str(self.var_label(var));
        }

        if constant.abs() >= f64::EPSILON {
            let sign = if constant < 0.0 { "-" } else { "+" };

            if out.is_empty() {
                if constant < 0.0 {
                    out.push('-');
                }
            } else {
                out.push_str(&format!(" {sign} "));
            }

            out.push_str(&render_number(constant.abs()));
        }

        if out.is_empty() {
            out.push('0');
        }

        out
    }
}

impl MILPObserver for FormulationWriter {
    fn on_variable(&mut self, role: VariableRole, var: Variable) {
        let label = self.label(role);

        self.positions.insert(var, self.variables.len());
        self.variables.push((var, role, label));
    }

    fn on_objective_term(&mut self, var: Variable, coefficient: f64) {
        self.objective_terms.push((var, coefficient));
    }

    fn on_constraint(
        &mut self,
        kind: ConstraintKind,
        lhs: &Expression,
        relation: ConstraintRelation,
        rhs: f64,
    ) {
        self.constraints.push((kind, lhs.clone(), relation, rhs));
    }
}

fn id_or_index(ids: &[String], idx: usize) -> String {
    ids.get(idx).cloned().unwrap_or_else(|| idx.to_string())
}

fn render_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
