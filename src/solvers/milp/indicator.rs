//! Indicator Linearisation
//!
//! Encodes the conditional rule "if `f > 0` then `g >= b`" with linear rows and
//! one binary `off`:
//!
//! ```text
//! f + N_f * off <= N_f
//! g + N_g * off >= b
//! ```
//!
//! With `off = 1` the first row forces `f <= 0` and the second is relaxed, so
//! the rule is vacuous. With `off = 0` the first row is slack and `g >= b` must
//! hold. Any positive `f` therefore forces `off = 0`.
//!
//! Soundness rests on the bounds: `N_f` must be at least the largest value `f`
//! can take and `N_g` at least `b - min(g)`. Bounds that are too small silently
//! cut off feasible plans.

use good_lp::{Expression, ProblemVariables, Variable, variable};

/// Dominating constants for each side of an [`Implication`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorBounds {
    /// Upper bound on the condition expression
    pub condition: f64,

    /// Upper bound on how far the consequence can fall short of its right-hand side
    pub consequence: f64,
}

impl IndicatorBounds {
    /// Use the same constant on both sides.
    pub fn uniform(bound: f64) -> Self {
        Self {
            condition: bound,
            consequence: bound,
        }
    }
}

/// "If `condition > 0` then `consequence >= consequence_rhs`".
#[derive(Debug, Clone)]
pub struct Implication {
    condition: Expression,
    consequence: Expression,
    consequence_rhs: f64,
    bounds: IndicatorBounds,
}

/// The two linear rows produced by [`Implication::linearize`].
#[derive(Debug, Clone)]
pub struct LinearizedImplication {
    /// `condition + N_f * off`, constrained `<= gate_rhs`
    pub gate: Expression,

    /// Right-hand side of the gate row (`N_f`)
    pub gate_rhs: f64,

    /// `consequence + N_g * off`, constrained `>= enforce_rhs`
    pub enforce: Expression,

    /// Right-hand side of the enforce row
    pub enforce_rhs: f64,
}

impl Implication {
    /// Create an implication from its parts.
    pub fn new(
        condition: Expression,
        consequence: Expression,
        consequence_rhs: f64,
        bounds: IndicatorBounds,
    ) -> Self {
        Self {
            condition,
            consequence,
            consequence_rhs,
            bounds,
        }
    }

    /// Declare a fresh binary suitable as the `off` indicator.
    pub fn declare_indicator(pb: &mut ProblemVariables) -> Variable {
        pb.add(variable().binary())
    }

    /// Produce the gate and enforce rows for the given `off` indicator.
    pub fn linearize(self, off: Variable) -> LinearizedImplication {
        let gate = self.condition + off * self.bounds.condition;
        let enforce = self.consequence + off * self.bounds.consequence;

        LinearizedImplication {
            gate,
            gate_rhs: self.bounds.condition,
            enforce,
            enforce_rhs: self.consequence_rhs,
        }
    }
}
