//! MILP Formulation Renderers
//!
//! Renderers implement [`MILPObserver`](super::observer::MILPObserver) and
//! capture the formulation while the model is built.

pub mod text;
