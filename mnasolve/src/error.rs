//! Error types for the algebra layer and the compiler.

use crate::expr::Expr;

/// Failures from the algebra library's numeric operations (`nsolve`, numeric
/// evaluation).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AlgebraError {
    /// The numeric solver exceeded its iteration budget without converging.
    #[error("numeric solve did not converge after {iterations} iterations")]
    DidNotConverge {
        /// Iterations attempted before giving up.
        iterations: usize,
    },

    /// A symbol had no numeric binding during evaluation.
    #[error("unbound symbol: {0}")]
    UnboundSymbol(String),
}

/// Failures from the `solve` compiler pipeline.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CompileError {
    /// A Newton-block unknown had no pivot and no nonzero Jacobian column; the
    /// system is singular and no closed form or well-posed numeric scheme exists.
    #[error("singular Jacobian: no equation pins down {unknown}")]
    SingularJacobian {
        /// The unknown (or its paired Δ) that could not be resolved.
        unknown: Expr,
    },

    /// An underlying algebra operation failed in a context where it cannot be
    /// soft-failed (unlike the DC initial-conditions step, which downgrades this
    /// to a warning instead).
    #[error(transparent)]
    Algebra(#[from] AlgebraError),
}
