//! The top-level `solve` pipeline: compiles an [`Analysis`] into a [`TransientSolution`].

use indexmap::IndexSet;

use crate::analysis::Analysis;
use crate::discretize::integrate_trapezoid;
use crate::equation::{Arrow, Equation};
use crate::error::{AlgebraError, CompileError};
use crate::expr::Expr;
use crate::gauss::{System, symbolic_linear_solve};
use crate::linear_combination::LinearCombination;
use crate::log::{Log, Severity};
use crate::nsolve::nsolve;
use crate::solution::{SolutionSet, TransientSolution};

/// Compiles `analysis` into a transient solver stepping at `h`.
///
/// `with_initial_conditions` controls whether DC steady-state initial conditions are
/// computed at all; when `false` the returned `initial_conditions` list is always
/// empty. DC failure (non-convergence or an unbound symbol during the numeric
/// fallback) is never fatal: it is logged as a warning and the compiler proceeds with
/// an empty initials list.
pub fn solve(
    analysis: &Analysis,
    h: &Expr,
    with_initial_conditions: bool,
    log: &dyn Log,
) -> Result<TransientSolution, CompileError> {
    let t = Expr::t();
    let t0 = Expr::t0();

    let dy_dt: Vec<Expr> = analysis
        .unknowns()
        .iter()
        .map(|y| Expr::d_dt(y, &t))
        .filter(|d| analysis.equations().iter().any(|eq| eq.depends_on(&[d.clone()])))
        .collect();

    let initial_conditions = if with_initial_conditions {
        compute_initial_conditions(analysis, &dy_dt, log)
    } else {
        Vec::new()
    };

    let mut unknowns: Vec<Expr> = analysis.unknowns().to_vec();
    let mut mna: Vec<Equation> = Vec::new();
    let mut diffeq_rows = Vec::new();

    for eq in analysis.equations() {
        if eq.depends_on(&dy_dt) {
            diffeq_rows.push(build_row(eq, &dy_dt));
        } else {
            mna.push(eq.clone());
        }
    }

    let mut diffeq_system = System::new(diffeq_rows);
    diffeq_system.row_reduce(&dy_dt);
    diffeq_system.back_substitute(&dy_dt);
    let derivative_arrows = diffeq_system.solve_and_remove(&dy_dt);

    for leftover in diffeq_system.into_rows() {
        mna.push(Equation::new(leftover.to_expression(), Expr::zero()));
    }

    let discretized = integrate_trapezoid(&derivative_arrows, &unknowns, &t, &t0, h);
    for arrow in &discretized {
        mna.push(Equation::new(arrow.left().clone(), arrow.right().clone()));
    }

    let mut solutions = Vec::new();

    let (linear_assignments, consumed) = symbolic_linear_solve(&mna, &unknowns);
    if !linear_assignments.is_empty() {
        let substitutions: Vec<(Expr, Expr)> = linear_assignments
            .iter()
            .map(Arrow::as_substitution)
            .collect();
        mna = mna
            .iter()
            .enumerate()
            .filter(|(i, _)| !consumed.contains(i))
            .map(|(_, eq)| eq.evaluate(&substitutions))
            .collect();
        let solved: IndexSet<Expr> = linear_assignments.iter().map(|a| a.left().clone()).collect();
        unknowns.retain(|y| !solved.contains(y));
        solutions.push(SolutionSet::LinearSolutions {
            assignments: linear_assignments,
        });
    }

    if !unknowns.is_empty() {
        solutions.push(build_newton_block(&mna, &unknowns)?);
    }

    Ok(TransientSolution::new(h.clone(), solutions, initial_conditions))
}

/// Builds a [`LinearCombination`] over the `dy_dt` basis for one differential
/// equation's residual; MNA capacitor/inductor stamps are affine in the derivative
/// term itself, so this is always exact (never an approximation).
fn build_row(eq: &Equation, dy_dt: &[Expr]) -> LinearCombination {
    let residual = eq.residual();
    let zero_bindings: Vec<(Expr, Expr)> = dy_dt.iter().map(|d| (d.clone(), Expr::zero())).collect();
    let mut row = LinearCombination::new();
    for d in dy_dt {
        row.set_coefficient(d.clone(), residual.derivative(d).factor());
    }
    row.set_constant(residual.evaluate(&zero_bindings).factor());
    row
}

fn compute_initial_conditions(analysis: &Analysis, dy_dt: &[Expr], log: &dyn Log) -> Vec<Arrow> {
    match try_compute_initial_conditions(analysis, dy_dt) {
        Ok(arrows) => arrows,
        Err(err) => {
            log.log(
                Severity::Warning,
                &format!("DC initial-condition analysis failed, proceeding with no initial conditions: {err}"),
            );
            Vec::new()
        }
    }
}

fn try_compute_initial_conditions(
    analysis: &Analysis,
    dy_dt: &[Expr],
) -> Result<Vec<Arrow>, AlgebraError> {
    let t = Expr::t();
    let t0 = Expr::t0();
    let mut zero_bindings: Vec<(Expr, Expr)> = dy_dt.iter().map(|d| (d.clone(), Expr::zero())).collect();
    zero_bindings.push((t, Expr::zero()));
    zero_bindings.push((t0, Expr::zero()));

    let hint_substitutions: Vec<(Expr, Expr)> = analysis
        .initial_conditions_hint()
        .iter()
        .map(Arrow::as_substitution)
        .collect();

    let dc_equations: Vec<Equation> = analysis
        .equations()
        .iter()
        .map(|eq| eq.evaluate(&zero_bindings).evaluate(&hint_substitutions))
        .collect();

    let mut unknowns = analysis.unknowns().to_vec();
    let (mut solved, consumed) = symbolic_linear_solve(&dc_equations, &unknowns);

    let solved_set: IndexSet<Expr> = solved.iter().map(|a| a.left().clone()).collect();
    unknowns.retain(|y| !solved_set.contains(y));

    if unknowns.is_empty() {
        return Ok(solved);
    }

    let substitutions: Vec<(Expr, Expr)> = solved.iter().map(Arrow::as_substitution).collect();
    let remaining_equations: Vec<Equation> = dc_equations
        .iter()
        .enumerate()
        .filter(|(i, _)| !consumed.contains(i))
        .map(|(_, eq)| eq.evaluate(&substitutions))
        .filter(|eq| eq.depends_on(&unknowns))
        .collect();

    if remaining_equations.len() != unknowns.len() {
        return Err(AlgebraError::UnboundSymbol(format!(
            "DC system is not square after the linear peel: {} equations for {} unknowns",
            remaining_equations.len(),
            unknowns.len()
        )));
    }

    let residuals: Vec<Expr> = remaining_equations.iter().map(Equation::residual).collect();
    let initial_guess: Vec<f64> = unknowns
        .iter()
        .map(|y| {
            analysis
                .initial_conditions_hint()
                .iter()
                .find(|a| a.left() == y)
                .and_then(|a| a.right().as_const())
                .unwrap_or(0.0)
        })
        .collect();

    let numeric = nsolve(&residuals, &unknowns, &initial_guess)?;
    solved.extend(numeric);
    Ok(solved)
}

fn build_newton_block(mna: &[Equation], unknowns: &[Expr]) -> Result<SolutionSet, CompileError> {
    let deltas: Vec<Expr> = unknowns.iter().map(Expr::newton_delta).collect();

    let mut rows: Vec<LinearCombination> = Vec::with_capacity(mna.len());
    for eq in mna {
        let residual = eq.residual();
        let mut row = LinearCombination::new();
        for (delta, y) in deltas.iter().zip(unknowns.iter()) {
            row.set_coefficient(delta.clone(), residual.derivative(y).factor());
        }
        let residual = residual.factor();
        row.set_constant(residual.clone());
        row.set_tag(residual);
        rows.push(row);
    }

    // A column is "ly" (linear) iff no row's coefficient in that column depends on
    // any surviving unknown. Columns whose coefficients depend on y are genuinely
    // nonlinear and must be solved numerically per-sample.
    let mut ly = Vec::new();
    let mut nonlinear = Vec::new();
    for (delta, y) in deltas.iter().zip(unknowns.iter()) {
        let is_linear = rows
            .iter()
            .all(|row| !row.coefficient(delta).depends_on(unknowns));
        if is_linear {
            ly.push((delta.clone(), y.clone()));
        } else {
            nonlinear.push((delta.clone(), y.clone()));
        }
    }

    let combined_order: Vec<Expr> = ly
        .iter()
        .map(|(d, _)| d.clone())
        .chain(nonlinear.iter().map(|(d, _)| d.clone()))
        .collect();

    let mut system = System::new(rows);
    system.row_reduce(&combined_order);
    system.back_substitute(&combined_order);

    let ly_order: Vec<Expr> = ly.iter().map(|(d, _)| d.clone()).collect();
    let linear_updates = system.solve_and_remove(&ly_order);

    let solved_deltas: IndexSet<Expr> = linear_updates.iter().map(|a| a.left().clone()).collect();
    for (delta, y) in &ly {
        if !solved_deltas.contains(delta) {
            return Err(CompileError::SingularJacobian { unknown: y.clone() });
        }
    }

    let remaining_rows = system.into_rows();
    for (delta, y) in &nonlinear {
        // After full row reduction and back-substitution, a well-posed nonlinear
        // column has exactly one row whose *leading* nonzero entry is this delta; a
        // merely-nonzero (but not leading) coefficient means the row was already
        // claimed by another variable and this column is actually undetermined, as
        // happens when two unknowns appear only through a redundant combination.
        let has_pivot = remaining_rows
            .iter()
            .any(|row| row.pivot_position().as_ref() == Some(delta));
        if !has_pivot {
            return Err(CompileError::SingularJacobian { unknown: y.clone() });
        }
    }

    let nonlinear_deltas: Vec<Expr> = nonlinear.iter().map(|(d, _)| d.clone()).collect();

    Ok(SolutionSet::NewtonIteration {
        linear_updates,
        jacobian: remaining_rows,
        nonlinear_deltas,
        initial_guess: initial_guesses(unknowns),
    })
}

fn initial_guesses(unknowns: &[Expr]) -> Vec<Arrow> {
    unknowns
        .iter()
        .map(|y| Arrow::new(y.clone(), Expr::prev(y)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NullLog;

    #[test]
    fn resistor_divider_is_pure_linear_solution() {
        let vn = Expr::symbol("Vn");
        let v = Expr::symbol("V");
        let r1 = Expr::symbol("R1");
        let r2 = Expr::symbol("R2");
        // KCL at node n: (Vn - V)/R1 + Vn/R2 = 0
        let residual = vn.sub(&v).div(&r1).add(&vn.div(&r2));
        let analysis = Analysis::new(vec![Equation::new(residual, Expr::zero())], vec![vn.clone()]);

        let result = solve(&analysis, &Expr::symbol("h"), true, &NullLog).unwrap();
        assert_eq!(result.solutions().len(), 1);
        match &result.solutions()[0] {
            SolutionSet::LinearSolutions { assignments } => {
                assert_eq!(assignments.len(), 1);
                assert_eq!(assignments[0].left(), &vn);
            }
            SolutionSet::NewtonIteration { .. } => panic!("expected a pure linear solution"),
        }
        assert_eq!(result.initial_conditions().len(), 1);
    }

    #[test]
    fn singular_jacobian_is_reported_for_coupled_sum_only_unknowns() {
        // a + b - 5 = 0, and twice that equation again: the same pair of unknowns,
        // the same coefficients, nothing to tell them apart. The pivot row consumes
        // one of `a`/`b`, its scaled multiple cancels to the zero row, and the other
        // unknown is left without any row to its name.
        let a = Expr::symbol("a");
        let b = Expr::symbol("b");
        let residual = a.add(&b).sub(&Expr::constant(5.0));
        let analysis = Analysis::new(
            vec![
                Equation::new(residual.clone(), Expr::zero()),
                Equation::new(residual.mul(&Expr::constant(2.0)), Expr::zero()),
            ],
            vec![a, b],
        );
        let err = solve(&analysis, &Expr::symbol("h"), false, &NullLog).unwrap_err();
        assert!(matches!(err, CompileError::SingularJacobian { .. }));
    }
}
