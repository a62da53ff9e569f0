#![doc = include_str!("../README.md")]

pub use crate::analysis::Analysis;
pub use crate::equation::{Arrow, Equation};
pub use crate::error::{AlgebraError, CompileError};
pub use crate::expr::{Expr, MathFn, Marker};
pub use crate::log::{Log, NullLog, Severity, StandardLog};
pub use crate::solution::{SolutionSet, TransientSolution};

/// Circuit inputs: equations, unknowns, and DC hints.
mod analysis;
/// Compiled output shapes.
mod solution;
/// Equations and solved assignments over [`Expr`].
mod equation;
/// The symbolic expression tree and its algebra operations.
mod expr;
mod error;
/// Symbolic linear-system rows.
mod linear_combination;
/// Gaussian elimination over [`linear_combination::LinearCombination`] rows.
mod gauss;
/// Trapezoidal discretization of differential equations.
mod discretize;
/// Dense Newton-Raphson for DC initial conditions.
mod nsolve;
mod log;
/// The `solve` pipeline itself.
mod compiler;

/// Compiles a circuit's MNA equations into a discrete-time transient solver.
///
/// `h` is the simulation timestep (a constant or symbolic expression with time
/// units). When `with_initial_conditions` is true, the returned
/// [`TransientSolution::initial_conditions`] gives the DC steady-state value of each
/// unknown; DC failure is never fatal, only logged through `log`.
///
/// ```
/// use mnasolve::{Analysis, Equation, Expr, NullLog, solve};
///
/// // A resistor divider: (Vn - V)/R1 + Vn/R2 = 0.
/// let vn = Expr::symbol("Vn");
/// let v = Expr::symbol("V");
/// let r1 = Expr::symbol("R1");
/// let r2 = Expr::symbol("R2");
/// let residual = vn.sub(&v).div(&r1).add(&vn.div(&r2));
/// let analysis = Analysis::new(vec![Equation::new(residual, Expr::zero())], vec![vn]);
///
/// let solution = solve(&analysis, &Expr::symbol("h"), true, &NullLog).unwrap();
/// assert_eq!(solution.solutions().len(), 1);
/// ```
pub fn solve(
    analysis: &Analysis,
    h: &Expr,
    with_initial_conditions: bool,
    log: &dyn Log,
) -> Result<TransientSolution, CompileError> {
    compiler::solve(analysis, h, with_initial_conditions, log)
}
