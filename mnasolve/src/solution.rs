//! The output shapes of the compiler: [`SolutionSet`] and [`TransientSolution`].

use crate::equation::Arrow;
use crate::linear_combination::LinearCombination;

/// One stage of evaluation, applied once per sample.
#[derive(Clone, Debug)]
pub enum SolutionSet {
    /// Assignments evaluated in order; each right-hand side references only
    /// previously-solved unknowns, prior solution sets, and time symbols.
    LinearSolutions {
        /// The ordered closed-form assignments.
        assignments: Vec<Arrow>,
    },
    /// One Newton step: a Jacobian system in the update deltas `Δy`, partitioned
    /// into the part that drops out linearly (`linear_updates`) and the part that
    /// must be solved numerically each iteration (`nonlinear_deltas`).
    NewtonIteration {
        /// Closed-form updates for the Δ's that participate only linearly.
        linear_updates: Vec<Arrow>,
        /// The remaining Jacobian rows, over the `nonlinear_deltas` basis.
        jacobian: Vec<LinearCombination>,
        /// The Δ's that must be solved numerically.
        nonlinear_deltas: Vec<crate::expr::Expr>,
        /// Starting guess for each surviving unknown (`y := prev(y)`).
        initial_guess: Vec<Arrow>,
    },
}

/// The fully compiled transient solver for one circuit.
#[derive(Clone, Debug)]
pub struct TransientSolution {
    time_step: crate::expr::Expr,
    solutions: Vec<SolutionSet>,
    initial_conditions: Vec<Arrow>,
}

impl TransientSolution {
    pub fn new(
        time_step: crate::expr::Expr,
        solutions: Vec<SolutionSet>,
        initial_conditions: Vec<Arrow>,
    ) -> Self {
        Self {
            time_step,
            solutions,
            initial_conditions,
        }
    }

    pub fn time_step(&self) -> &crate::expr::Expr {
        &self.time_step
    }

    pub fn solutions(&self) -> &[SolutionSet] {
        &self.solutions
    }

    pub fn initial_conditions(&self) -> &[Arrow] {
        &self.initial_conditions
    }
}
