//! Trapezoidal discretization of symbolic first-order ODEs.

use crate::equation::Arrow;
use crate::expr::Expr;

/// Discretizes `dy/dt := f(y, t)` arrows into algebraic update arrows
///
/// `y := prev(y) + (h/2)·(f(y, t) + f(prev(y), t0))`
///
/// via trapezoidal (Tustin) integration. `f_prev` is obtained by substituting
/// `t → t0` and every surviving unknown `yᵢ → prev(yᵢ)` in a single parallel pass
/// against the *original* `f`, not cascaded. The result may still reference the
/// current-step `y` (the method is implicit).
pub fn integrate_trapezoid(
    derivative_arrows: &[Arrow],
    unknowns: &[Expr],
    t: &Expr,
    t0: &Expr,
    h: &Expr,
) -> Vec<Arrow> {
    let mut prev_substitution: Vec<(Expr, Expr)> = vec![(t.clone(), t0.clone())];
    for y in unknowns {
        prev_substitution.push((y.clone(), Expr::prev(y)));
    }

    let half_h = h.div(&Expr::constant(2.0));

    derivative_arrows
        .iter()
        .map(|arrow| {
            let y = arrow.left().clone();
            let f = arrow.right();
            let f_prev = f.evaluate(&prev_substitution);
            let update = Expr::prev(&y).add(&half_h.mul(&f.add(&f_prev)));
            Arrow::new(y, update).factored()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_low_pass_matches_the_closed_form_trapezoidal_update() {
        // dv/dt = (vin - v) / (R*C)
        let v = Expr::symbol("v");
        let vin = Expr::symbol("vin");
        let r = Expr::symbol("R");
        let c = Expr::symbol("C");
        let t = Expr::symbol("t");
        let t0 = Expr::symbol("t0");
        let h = Expr::symbol("h");

        let f = vin.sub(&v).div(&r.mul(&c));
        let arrow = Arrow::new(v.clone(), f);
        let updates = integrate_trapezoid(&[arrow], &[v.clone()], &t, &t0, &h);
        assert_eq!(updates.len(), 1);
        assert!(updates[0].right().depends_on(&[Expr::prev(&v)]));
        assert!(updates[0].right().depends_on(&[v]));
    }

    #[test]
    fn substitution_is_parallel_across_all_unknowns() {
        let x = Expr::symbol("x");
        let y = Expr::symbol("y");
        let t = Expr::symbol("t");
        let t0 = Expr::symbol("t0");
        let h = Expr::symbol("h");
        // dx/dt = y; ensure y is replaced with prev(y), not left untouched.
        let arrow = Arrow::new(x.clone(), y.clone());
        let updates = integrate_trapezoid(&[arrow], &[x.clone(), y.clone()], &t, &t0, &h);
        assert!(updates[0].right().depends_on(&[Expr::prev(&y)]));
    }
}
