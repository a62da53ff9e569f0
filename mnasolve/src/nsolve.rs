//! Numeric solving of a small nonlinear system via dense LU-backed Newton-Raphson.
//!
//! This is deliberately separate from the sparse per-sample Newton loop a downstream
//! runtime would run at audio rate: it exists only to resolve DC initial conditions
//! once per compile, so a dense solve is the right tool for the job.

use faer::Mat;

use crate::equation::Arrow;
use crate::error::AlgebraError;
use crate::expr::Expr;

const MAX_ITERS: usize = 50;
const TOLERANCE: f64 = 1e-10;

/// Solves `residuals[i](unknowns) = 0` for `unknowns`, starting from
/// `initial_guess`, using Newton-Raphson with a dense LU solve of the numeric
/// Jacobian at each step. Every free symbol in `residuals` other than `unknowns`
/// must already be a plain constant, or evaluation fails with
/// [`AlgebraError::UnboundSymbol`].
pub fn nsolve(
    residuals: &[Expr],
    unknowns: &[Expr],
    initial_guess: &[f64],
) -> Result<Vec<Arrow>, AlgebraError> {
    debug_assert_eq!(residuals.len(), unknowns.len());
    debug_assert_eq!(unknowns.len(), initial_guess.len());
    let n = unknowns.len();
    let mut y = initial_guess.to_vec();

    for iteration in 0..MAX_ITERS {
        let bindings: Vec<(Expr, f64)> = unknowns.iter().cloned().zip(y.iter().copied()).collect();

        let mut f = Vec::with_capacity(n);
        for r in residuals {
            f.push(r.eval_numeric(&bindings)?);
        }
        let residual_norm = f.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if residual_norm < TOLERANCE {
            return Ok(to_arrows(unknowns, &y));
        }

        let mut jacobian = vec![0.0; n * n];
        for (i, r) in residuals.iter().enumerate() {
            for (j, u) in unknowns.iter().enumerate() {
                jacobian[i * n + j] = r.derivative(u).eval_numeric(&bindings)?;
            }
        }

        let mat = Mat::from_fn(n, n, |i, j| jacobian[i * n + j]);
        let rhs = Mat::from_fn(n, 1, |i, _| -f[i]);
        let lu = mat.partial_piv_lu();
        let delta = lu.solve(&rhs);

        let mut step_norm = 0.0_f64;
        for (i, yi) in y.iter_mut().enumerate() {
            let d = delta.get(i, 0);
            *yi += *d;
            step_norm = step_norm.max(d.abs());
        }
        if step_norm < TOLERANCE {
            return Ok(to_arrows(unknowns, &y));
        }
        let _ = iteration;
    }

    Err(AlgebraError::DidNotConverge {
        iterations: MAX_ITERS,
    })
}

fn to_arrows(unknowns: &[Expr], values: &[f64]) -> Vec<Arrow> {
    unknowns
        .iter()
        .zip(values.iter())
        .map(|(u, v)| Arrow::new(u.clone(), Expr::constant(*v)))
        .collect()
}
