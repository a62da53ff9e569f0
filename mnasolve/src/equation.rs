//! Equations and solved assignments over [`Expr`](crate::expr::Expr).

use std::fmt;

use crate::expr::Expr;

/// An equality `left = right`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Equation {
    left: Expr,
    right: Expr,
}

impl Equation {
    pub fn new(left: Expr, right: Expr) -> Self {
        Self { left, right }
    }

    pub fn left(&self) -> &Expr {
        &self.left
    }

    pub fn right(&self) -> &Expr {
        &self.right
    }

    /// `left - right`, the expression that must equal zero.
    pub fn residual(&self) -> Expr {
        self.left.sub(&self.right)
    }

    pub fn depends_on(&self, vars: &[Expr]) -> bool {
        self.left.depends_on(vars) || self.right.depends_on(vars)
    }

    pub fn evaluate(&self, arrows: &[(Expr, Expr)]) -> Equation {
        Equation::new(self.left.evaluate(arrows), self.right.evaluate(arrows))
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

/// A solved assignment `left := right`. Invariant: `left` is a single unknown symbol,
/// and `right` must not reference any unknown listed after this arrow in its
/// containing sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Arrow {
    left: Expr,
    right: Expr,
}

impl Arrow {
    pub fn new(left: Expr, right: Expr) -> Self {
        Self { left, right }
    }

    pub fn left(&self) -> &Expr {
        &self.left
    }

    pub fn right(&self) -> &Expr {
        &self.right
    }

    /// The `(from, to)` pair usable directly with [`Expr::evaluate`].
    pub fn as_substitution(&self) -> (Expr, Expr) {
        (self.left.clone(), self.right.clone())
    }

    /// Applies `factor` to the right-hand side.
    pub fn factored(self) -> Self {
        Self {
            left: self.left,
            right: self.right.factor(),
        }
    }
}

impl fmt::Display for Arrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} := {}", self.left, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residual_is_left_minus_right() {
        let eq = Equation::new(Expr::symbol("x"), Expr::constant(1.0));
        assert_eq!(
            eq.residual(),
            Expr::symbol("x").sub(&Expr::constant(1.0))
        );
    }

    #[test]
    fn arrow_substitution_round_trips() {
        let arrow = Arrow::new(Expr::symbol("x"), Expr::constant(2.0));
        let (from, to) = arrow.as_substitution();
        assert_eq!(from, Expr::symbol("x"));
        assert_eq!(to, Expr::constant(2.0));
    }
}
