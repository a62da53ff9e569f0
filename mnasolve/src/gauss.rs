//! Symbolic Gaussian elimination over a list of [`LinearCombination`] rows.

use indexmap::IndexSet;

use crate::equation::{Arrow, Equation};
use crate::expr::Expr;
use crate::linear_combination::LinearCombination;

/// Best-effort symbolic linear solver: admits only the equations that are genuinely
/// affine in `unknowns` (none of their coefficients, obtained via `derivative`,
/// themselves depend on `unknowns`), eliminates those, and returns the closed-form
/// arrows whose right-hand sides no longer reference any unknown still outstanding,
/// alongside the set of indices (into `equations`) that were fully discharged and can
/// be dropped by the caller. Equations that aren't affine in `unknowns`, or whose
/// elimination result still depends on an unsolved unknown, are left out of the
/// consumed set for the caller to keep handling (nonlinear fallback, or left as free).
pub fn symbolic_linear_solve(
    equations: &[Equation],
    unknowns: &[Expr],
) -> (Vec<Arrow>, IndexSet<usize>) {
    let zero_bindings: Vec<(Expr, Expr)> =
        unknowns.iter().map(|y| (y.clone(), Expr::zero())).collect();

    let mut rows = Vec::new();
    let mut origins = Vec::new();
    for (i, eq) in equations.iter().enumerate() {
        let residual = eq.residual();
        let coefficients: Vec<Expr> = unknowns
            .iter()
            .map(|y| residual.derivative(y).factor())
            .collect();
        if coefficients.iter().any(|c| c.depends_on(unknowns)) {
            continue;
        }
        let mut row = LinearCombination::new();
        for (y, c) in unknowns.iter().zip(coefficients.iter()) {
            row.set_coefficient(y.clone(), c.clone());
        }
        row.set_constant(residual.evaluate(&zero_bindings).factor());
        rows.push(row);
        origins.push(i);
    }

    let mut system = System::new(rows);
    system.row_reduce(unknowns);
    system.back_substitute(unknowns);

    let mut arrows = Vec::new();
    let mut consumed = IndexSet::new();
    for (arrow, origin) in system.solve_and_remove_with_origins(unknowns, &mut origins) {
        if !arrow.right().depends_on(unknowns) {
            consumed.insert(origin);
            arrows.push(arrow);
        }
    }
    (arrows, consumed)
}

/// A mutable, owned, single-writer list of rows being eliminated.
#[derive(Clone, Debug, Default)]
pub struct System {
    rows: Vec<LinearCombination>,
}

impl System {
    pub fn new(rows: Vec<LinearCombination>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[LinearCombination] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<LinearCombination> {
        self.rows
    }

    pub fn push(&mut self, row: LinearCombination) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the first row whose symbolic pivot position equals `v`.
    pub fn find_pivot(&self, v: &Expr) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.pivot_position().as_ref() == Some(v))
    }

    /// Returns the first row with a nonzero coefficient in column `v`, if any.
    fn find_nonzero(&self, v: &Expr) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| !row.coefficient(v).factor().is_zero())
    }

    /// Standard symbolic forward elimination over the pivot order `x`. For each
    /// variable, in order: find a pivot row (leading nonzero column), skip if none;
    /// scale it so the pivot coefficient is 1; subtract a multiple of it from every
    /// other row with a nonzero entry in that column.
    pub fn row_reduce(&mut self, x: &[Expr]) {
        let mut used = vec![false; self.rows.len()];
        for v in x {
            let Some(pivot_idx) = self.pick_unused_pivot(v, &used) else {
                continue;
            };
            used[pivot_idx] = true;
            let pivot_coeff = self.rows[pivot_idx].coefficient(v);
            let inv = Expr::one().div(&pivot_coeff);
            self.rows[pivot_idx].scale(&inv);

            for i in 0..self.rows.len() {
                if i == pivot_idx {
                    continue;
                }
                let factor_expr = self.rows[i].coefficient(v);
                if factor_expr.factor().is_zero() {
                    continue;
                }
                let pivot_row = self.rows[pivot_idx].clone();
                self.rows[i].add_scaled(&pivot_row, &factor_expr.neg());
            }
        }
    }

    fn pick_unused_pivot(&self, v: &Expr, used: &[bool]) -> Option<usize> {
        self.rows.iter().enumerate().find_map(|(i, row)| {
            if used[i] {
                return None;
            }
            (!row.coefficient(v).factor().is_zero()).then_some(i)
        })
    }

    /// From the last pivot row backward, eliminates above-pivot entries so each
    /// pivot column becomes a clean basis vector.
    pub fn back_substitute(&mut self, x: &[Expr]) {
        for v in x.iter().rev() {
            let Some(pivot_idx) = self.find_pivot(v) else {
                continue;
            };
            for i in 0..self.rows.len() {
                if i == pivot_idx {
                    continue;
                }
                let factor_expr = self.rows[i].coefficient(v);
                if factor_expr.factor().is_zero() {
                    continue;
                }
                let pivot_row = self.rows[pivot_idx].clone();
                self.rows[i].add_scaled(&pivot_row, &factor_expr.neg());
            }
        }
    }

    /// Walks `x` **in reverse**. For each variable, tries [`Self::find_pivot`], then
    /// falls back to any row with a nonzero coefficient in that column. When found,
    /// solves the row for that variable and removes it from the system. Variables
    /// with no matching row at all are skipped (left unsolved); the caller decides
    /// whether that is acceptable or fatal.
    pub fn solve_and_remove(&mut self, x: &[Expr]) -> Vec<Arrow> {
        let mut arrows = Vec::new();
        for v in x.iter().rev() {
            let idx = self.find_pivot(v).or_else(|| self.find_nonzero(v));
            let Some(idx) = idx else { continue };
            let row = self.rows.remove(idx);
            if let Some(arrow) = row.solve_arrow(v) {
                arrows.push(arrow);
            }
        }
        arrows
    }

    /// Like [`Self::solve_and_remove`], but `origins` is a parallel array (one entry
    /// per current row, in the same order) that is kept in lock-step as rows are
    /// removed, so the caller can trace each solved arrow back to whatever it was
    /// built from (e.g. an index into the original equation list).
    pub fn solve_and_remove_with_origins(
        &mut self,
        x: &[Expr],
        origins: &mut Vec<usize>,
    ) -> Vec<(Arrow, usize)> {
        debug_assert_eq!(self.rows.len(), origins.len());
        let mut out = Vec::new();
        for v in x.iter().rev() {
            let idx = self.find_pivot(v).or_else(|| self.find_nonzero(v));
            let Some(idx) = idx else { continue };
            let row = self.rows.remove(idx);
            let origin = origins.remove(idx);
            if let Some(arrow) = row.solve_arrow(v) {
                out.push((arrow, origin));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(coeffs: &[(Expr, f64)], constant: f64) -> LinearCombination {
        let mut r = LinearCombination::with_constant(Expr::constant(constant));
        for (b, c) in coeffs {
            r.set_coefficient(b.clone(), Expr::constant(*c));
        }
        r
    }

    #[test]
    fn solves_a_simple_two_by_two_system() {
        // x + y = 3; x - y = 1 -> x = 2, y = 1
        let x = Expr::symbol("x");
        let y = Expr::symbol("y");
        let r1 = row(&[(x.clone(), 1.0), (y.clone(), 1.0)], -3.0);
        let r2 = row(&[(x.clone(), 1.0), (y.clone(), -1.0)], -1.0);
        let mut sys = System::new(vec![r1, r2]);
        let order = vec![x.clone(), y.clone()];
        sys.row_reduce(&order);
        sys.back_substitute(&order);
        let arrows = sys.solve_and_remove(&order);
        let find = |sym: &Expr| {
            arrows
                .iter()
                .find(|a| a.left() == sym)
                .unwrap()
                .right()
                .clone()
                .factor()
        };
        assert_eq!(find(&x), Expr::constant(2.0));
        assert_eq!(find(&y), Expr::constant(1.0));
    }

    #[test]
    fn symbolic_linear_solve_handles_free_symbolic_coefficients() {
        // Resistor divider: (v - vin)/r1 + v/r2 = 0 -> v = vin * r2 / (r1 + r2).
        let v = Expr::symbol("v");
        let vin = Expr::symbol("vin");
        let r1 = Expr::symbol("r1");
        let r2 = Expr::symbol("r2");
        let residual = v.sub(&vin).div(&r1).add(&v.div(&r2));
        let eq = crate::equation::Equation::new(residual, Expr::zero());
        let (arrows, consumed) = symbolic_linear_solve(&[eq], &[v.clone()]);
        assert_eq!(arrows.len(), 1);
        assert_eq!(arrows[0].left(), &v);
        assert!(!arrows[0].right().depends_on(&[v]));
        assert_eq!(consumed.len(), 1);
        assert!(consumed.contains(&0));
    }

    #[test]
    fn symbolic_linear_solve_excludes_nonlinear_equations() {
        let y = Expr::symbol("y");
        let residual = y.powi(2).sub(&Expr::constant(4.0));
        let eq = crate::equation::Equation::new(residual, Expr::zero());
        let (arrows, consumed) = symbolic_linear_solve(&[eq], &[y]);
        assert!(arrows.is_empty());
        assert!(consumed.is_empty());
    }

    #[test]
    fn skips_variables_with_no_matching_row() {
        let x = Expr::symbol("x");
        let z = Expr::symbol("z");
        let r1 = row(&[(x.clone(), 1.0)], -5.0);
        let mut sys = System::new(vec![r1]);
        let order = vec![x.clone(), z.clone()];
        sys.row_reduce(&order);
        sys.back_substitute(&order);
        let arrows = sys.solve_and_remove(&order);
        assert_eq!(arrows.len(), 1);
        assert_eq!(arrows[0].left(), &x);
    }
}
