//! The read-only input to the compiler: a circuit's MNA equations and unknowns.

use crate::equation::{Arrow, Equation};
use crate::expr::Expr;

/// A circuit expressed as Modified Nodal Analysis equations, ready to compile.
///
/// This is built directly against the [`Expr`]/[`Equation`] API (there is no netlist
/// or schematic format): the caller assembles one equation per node (KCL) or branch
/// (device law) the same way a geometry problem is assembled directly against a
/// `Constraint` enum.
#[derive(Clone, Debug, Default)]
pub struct Analysis {
    equations: Vec<Equation>,
    unknowns: Vec<Expr>,
    initial_conditions_hint: Vec<Arrow>,
}

impl Analysis {
    pub fn new(equations: Vec<Equation>, unknowns: Vec<Expr>) -> Self {
        Self {
            equations,
            unknowns,
            initial_conditions_hint: Vec::new(),
        }
    }

    /// Supplies hints used only during DC analysis: numeric bindings for otherwise
    /// symbolic component parameters, or guesses for unknowns that remain nonlinear
    /// after the symbolic linear peel.
    pub fn with_initial_conditions_hint(mut self, hints: Vec<Arrow>) -> Self {
        self.initial_conditions_hint = hints;
        self
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn unknowns(&self) -> &[Expr] {
        &self.unknowns
    }

    pub fn initial_conditions_hint(&self) -> &[Arrow] {
        &self.initial_conditions_hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_exposes_what_it_was_built_with() {
        let v = Expr::symbol("v");
        let eq = Equation::new(v.clone(), Expr::constant(0.0));
        let analysis = Analysis::new(vec![eq.clone()], vec![v.clone()]);
        assert_eq!(analysis.equations(), &[eq]);
        assert_eq!(analysis.unknowns(), &[v]);
        assert!(analysis.initial_conditions_hint().is_empty());
    }
}
