//! A symbolic linear system row: a sparse vector of coefficients over an ordered
//! basis, plus a constant term.

use indexmap::IndexMap;

use crate::equation::Arrow;
use crate::expr::Expr;

/// `Σ cᵢ·bᵢ + constant`, keyed by an ordered basis `b₁, …, bₙ`.
///
/// Basis order is exactly insertion/swap order (an `IndexMap`), so there is no
/// separate ordering side-channel: iteration order *is* pivot-scanning order.
#[derive(Clone, Debug, Default)]
pub struct LinearCombination {
    coefficients: IndexMap<Expr, Expr>,
    constant: Expr,
    /// Carries the original residual this row was built from, during Jacobian
    /// construction, before row reduction starts mutating the constant column.
    tag: Option<Expr>,
}

impl LinearCombination {
    pub fn new() -> Self {
        Self {
            coefficients: IndexMap::new(),
            constant: Expr::zero(),
            tag: None,
        }
    }

    pub fn with_constant(constant: Expr) -> Self {
        Self {
            coefficients: IndexMap::new(),
            constant,
            tag: None,
        }
    }

    pub fn set_tag(&mut self, tag: Expr) {
        self.tag = Some(tag);
    }

    pub fn tag(&self) -> Option<&Expr> {
        self.tag.as_ref()
    }

    pub fn constant(&self) -> &Expr {
        &self.constant
    }

    pub fn set_constant(&mut self, constant: Expr) {
        self.constant = constant;
    }

    pub fn coefficient(&self, basis_element: &Expr) -> Expr {
        self.coefficients
            .get(basis_element)
            .cloned()
            .unwrap_or_else(Expr::zero)
    }

    pub fn set_coefficient(&mut self, basis_element: Expr, value: Expr) {
        if value.factor().is_zero() {
            self.coefficients.shift_remove(&basis_element);
        } else {
            self.coefficients.insert(basis_element, value);
        }
    }

    pub fn add_to_coefficient(&mut self, basis_element: Expr, delta: Expr) {
        let current = self.coefficient(&basis_element);
        self.set_coefficient(basis_element, current.add(&delta).factor());
    }

    /// Iteration order defines pivot scanning order.
    pub fn basis(&self) -> impl Iterator<Item = &Expr> {
        self.coefficients.keys()
    }

    /// The first basis element whose coefficient is symbolically nonzero.
    pub fn pivot_position(&self) -> Option<Expr> {
        self.coefficients
            .iter()
            .find(|(_, c)| !c.factor().is_zero())
            .map(|(b, _)| b.clone())
    }

    /// Permutes the basis to the given order; coefficients follow their keys.
    /// Any basis element in `self` but missing from `new_order` keeps its relative
    /// position after the given ones.
    pub fn swap_columns(&mut self, new_order: &[Expr]) {
        let mut rebuilt = IndexMap::new();
        for b in new_order {
            if let Some(c) = self.coefficients.get(b) {
                rebuilt.insert(b.clone(), c.clone());
            }
        }
        for (b, c) in &self.coefficients {
            rebuilt.entry(b.clone()).or_insert_with(|| c.clone());
        }
        self.coefficients = rebuilt;
    }

    /// Scales every coefficient and the constant by `factor_expr`.
    pub fn scale(&mut self, factor_expr: &Expr) {
        for c in self.coefficients.values_mut() {
            *c = c.mul(factor_expr).factor();
        }
        self.constant = self.constant.mul(factor_expr).factor();
    }

    /// `self += other * factor_expr`, column by column.
    pub fn add_scaled(&mut self, other: &LinearCombination, factor_expr: &Expr) {
        for (b, c) in &other.coefficients {
            self.add_to_coefficient(b.clone(), c.mul(factor_expr));
        }
        let added = other.constant.mul(factor_expr).factor();
        self.constant = self.constant.add(&added).factor();
    }

    /// `-(Σ_{b'≠b} c_{b'}·b' + c₀) / c_b`. Returns `None` if `c_b` is symbolically
    /// zero.
    pub fn solve_for(&self, b: &Expr) -> Option<Expr> {
        let c_b = self.coefficient(b);
        if c_b.factor().is_zero() {
            return None;
        }
        let mut rest = self.constant.clone();
        for (other, c) in &self.coefficients {
            if other != b {
                rest = rest.add(&c.mul(other));
            }
        }
        Some(rest.neg().div(&c_b))
    }

    /// `self.solve_for(b)` packaged as an [`Arrow`], factored.
    pub fn solve_arrow(&self, b: &Expr) -> Option<Arrow> {
        self.solve_for(b).map(|rhs| Arrow::new(b.clone(), rhs).factored())
    }

    /// `Σ cᵢ·bᵢ + c₀`.
    pub fn to_expression(&self) -> Expr {
        let mut sum = self.constant.clone();
        for (b, c) in &self.coefficients {
            sum = sum.add(&c.mul(b));
        }
        sum
    }
}
