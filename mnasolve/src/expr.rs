//! Symbolic expression tree and the algebra operations the compiler is built on.
//!
//! `Expr` is the first-party stand-in for the "algebra library" collaborator described
//! in the design: structural equality, differentiation, substitution, factoring, and a
//! small set of marker nodes (`D(y, t)`, `prev(y)`, `Δy`) used to tag time-derivatives,
//! previous-timestep values, and Newton update variables without giving them special
//! status in the tree itself.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::error::AlgebraError;

/// A floating point constant with total ordering and bitwise equality, so `Expr` can be
/// used as a map key. NaN is never produced by any operation in this module.
#[derive(Clone, Copy, Debug)]
pub struct Num(pub f64);

impl Num {
    #[inline(always)]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Num {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Num {}

impl std::hash::Hash for Num {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Num {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Num {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Known transcendental functions. Differentiated via the ordinary chain rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MathFn {
    Exp,
    Ln,
    Sin,
    Cos,
    Tanh,
}

impl MathFn {
    fn eval(self, x: f64) -> f64 {
        match self {
            MathFn::Exp => libm::exp(x),
            MathFn::Ln => libm::log(x),
            MathFn::Sin => libm::sin(x),
            MathFn::Cos => libm::cos(x),
            MathFn::Tanh => libm::tanh(x),
        }
    }

    fn name(self) -> &'static str {
        match self {
            MathFn::Exp => "exp",
            MathFn::Ln => "ln",
            MathFn::Sin => "sin",
            MathFn::Cos => "cos",
            MathFn::Tanh => "tanh",
        }
    }
}

/// Structural tags used to mark derivative, previous-step, and Newton-delta nodes.
/// These are opaque to differentiation except by exact structural match against the
/// differentiation variable itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Marker {
    /// `D(y, t)`: the time derivative of `y`.
    Derivative,
    /// `prev(y)`: `y` evaluated at the previous timestep.
    Prev,
    /// `Δy`: the Newton update variable paired with unknown `y`.
    Delta,
}

impl Marker {
    fn name(self) -> &'static str {
        match self {
            Marker::Derivative => "D",
            Marker::Prev => "prev",
            Marker::Delta => "Δ",
        }
    }
}

/// A symbolic expression. Nodes are immutable and structurally shared via `Rc`, so every
/// transformation (substitution, factoring, differentiation) builds a new tree rather
/// than mutating an existing one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    Const(Num),
    Symbol(Rc<str>),
    Add(Rc<Expr>, Rc<Expr>),
    Mul(Rc<Expr>, Rc<Expr>),
    Div(Rc<Expr>, Rc<Expr>),
    Neg(Rc<Expr>),
    Pow(Rc<Expr>, i32),
    Fn(MathFn, Rc<Expr>),
    Marker(Marker, Rc<[Expr]>),
}

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr::Const(Num(value))
    }

    pub fn symbol(name: impl Into<Rc<str>>) -> Self {
        Expr::Symbol(name.into())
    }

    pub fn zero() -> Self {
        Expr::constant(0.0)
    }

    pub fn one() -> Self {
        Expr::constant(1.0)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(Num(v)) if *v == 0.0)
    }

    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(Num(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn neg(&self) -> Self {
        Expr::Neg(Rc::new(self.clone()))
    }

    pub fn add(&self, rhs: &Expr) -> Self {
        Expr::Add(Rc::new(self.clone()), Rc::new(rhs.clone()))
    }

    pub fn sub(&self, rhs: &Expr) -> Self {
        self.add(&rhs.neg())
    }

    pub fn mul(&self, rhs: &Expr) -> Self {
        Expr::Mul(Rc::new(self.clone()), Rc::new(rhs.clone()))
    }

    pub fn div(&self, rhs: &Expr) -> Self {
        Expr::Div(Rc::new(self.clone()), Rc::new(rhs.clone()))
    }

    pub fn powi(&self, exp: i32) -> Self {
        Expr::Pow(Rc::new(self.clone()), exp)
    }

    pub fn call(f: MathFn, arg: &Expr) -> Self {
        Expr::Fn(f, Rc::new(arg.clone()))
    }

    fn marker(tag: Marker, args: &[Expr]) -> Self {
        Expr::Marker(tag, args.to_vec().into())
    }

    /// `D(y, t)`, the time derivative of `y`.
    pub fn d_dt(y: &Expr, t: &Expr) -> Self {
        Self::marker(Marker::Derivative, &[y.clone(), t.clone()])
    }

    /// `prev(y)`, the previous-timestep value of `y`.
    pub fn prev(y: &Expr) -> Self {
        Self::marker(Marker::Prev, &[y.clone()])
    }

    /// `Δy`, the Newton update variable paired with unknown `y`.
    pub fn newton_delta(y: &Expr) -> Self {
        Self::marker(Marker::Delta, &[y.clone()])
    }

    /// The distinguished current-time symbol `t`.
    pub fn t() -> Self {
        Expr::symbol("t")
    }

    /// The distinguished previous-step-time symbol `t0`.
    pub fn t0() -> Self {
        Expr::symbol("t0")
    }

    /// Tests whether `self` is `marker(args...)` with `args[arg_index] == arg_value`.
    pub fn is_call(&self, marker: Marker, arg_index: usize, arg_value: &Expr) -> bool {
        match self {
            Expr::Marker(tag, args) => {
                *tag == marker && args.get(arg_index).is_some_and(|a| a == arg_value)
            }
            _ => false,
        }
    }

    /// True iff `self` is a marker of the given kind at all (regardless of arguments).
    pub fn is_marker(&self, marker: Marker) -> bool {
        matches!(self, Expr::Marker(tag, _) if *tag == marker)
    }

    /// Every free symbol referenced transitively by this expression.
    pub fn free_symbols(&self) -> IndexSet<Rc<str>> {
        let mut out = IndexSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut IndexSet<Rc<str>>) {
        match self {
            Expr::Const(_) => {}
            Expr::Symbol(s) => {
                out.insert(s.clone());
            }
            Expr::Add(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Neg(a) | Expr::Pow(a, _) | Expr::Fn(_, a) => a.collect_symbols(out),
            Expr::Marker(_, args) => {
                for a in args.iter() {
                    a.collect_symbols(out);
                }
            }
        }
    }

    /// Whether `self` depends (transitively) on any expression in `vars`, using
    /// structural equality. This is subexpression containment, not just free-symbol
    /// membership, so it also detects e.g. dependence on a whole marker node like
    /// `D(y, t)` or `Δy`.
    pub fn depends_on(&self, vars: &[Expr]) -> bool {
        if vars.iter().any(|v| v == self) {
            return true;
        }
        match self {
            Expr::Const(_) | Expr::Symbol(_) => false,
            Expr::Add(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.depends_on(vars) || b.depends_on(vars)
            }
            Expr::Neg(a) | Expr::Pow(a, _) | Expr::Fn(_, a) => a.depends_on(vars),
            Expr::Marker(_, args) => args.iter().any(|a| a.depends_on(vars)),
        }
    }

    /// Substitutes every pair `(from, to)` simultaneously (a single parallel pass
    /// against the original tree, never cascaded through previously-substituted
    /// results).
    pub fn evaluate(&self, arrows: &[(Expr, Expr)]) -> Expr {
        if let Some((_, to)) = arrows.iter().find(|(from, _)| from == self) {
            return to.clone();
        }
        match self {
            Expr::Const(_) | Expr::Symbol(_) => self.clone(),
            Expr::Add(a, b) => a.evaluate(arrows).add(&b.evaluate(arrows)),
            Expr::Mul(a, b) => a.evaluate(arrows).mul(&b.evaluate(arrows)),
            Expr::Div(a, b) => a.evaluate(arrows).div(&b.evaluate(arrows)),
            Expr::Neg(a) => a.evaluate(arrows).neg(),
            Expr::Pow(a, n) => a.evaluate(arrows).powi(*n),
            Expr::Fn(f, a) => Expr::call(*f, &a.evaluate(arrows)),
            Expr::Marker(tag, args) => {
                let evaluated: Vec<Expr> = args.iter().map(|a| a.evaluate(arrows)).collect();
                Expr::marker(*tag, &evaluated)
            }
        }
    }

    /// Differentiates `self` with respect to `var`, where `var` may be any atomic
    /// subexpression (a plain symbol, or a compound node such as `D(y, t)`), not only a
    /// leaf symbol. `d(var)/d(var) = 1`; any other subexpression that is structurally
    /// equal to `var` (but is not itself being recursed into further) also differentiates
    /// to 1 via the same equality check, and marker nodes are opaque (differentiate to 0)
    /// unless they match `var` exactly.
    pub fn derivative(&self, var: &Expr) -> Expr {
        if self == var {
            return Expr::one();
        }
        match self {
            Expr::Const(_) => Expr::zero(),
            Expr::Symbol(_) => Expr::zero(),
            Expr::Add(a, b) => a.derivative(var).add(&b.derivative(var)),
            Expr::Neg(a) => a.derivative(var).neg(),
            Expr::Mul(a, b) => {
                let da = a.derivative(var).mul(b);
                let db = a.mul(&b.derivative(var));
                da.add(&db)
            }
            Expr::Div(a, b) => {
                // d(a/b) = (a' b - a b') / b^2
                let num = a.derivative(var).mul(b).sub(&a.mul(&b.derivative(var)));
                num.div(&b.powi(2))
            }
            Expr::Pow(a, n) => {
                // d(a^n) = n * a^(n-1) * a'
                let coeff = Expr::constant(f64::from(*n)).mul(&a.powi(n - 1));
                coeff.mul(&a.derivative(var))
            }
            Expr::Fn(f, a) => {
                let outer = match f {
                    MathFn::Exp => Expr::call(MathFn::Exp, a),
                    MathFn::Ln => Expr::one().div(a),
                    MathFn::Sin => Expr::call(MathFn::Cos, a),
                    MathFn::Cos => Expr::call(MathFn::Sin, a).neg(),
                    MathFn::Tanh => Expr::one().sub(&Expr::call(MathFn::Tanh, a).powi(2)),
                };
                outer.mul(&a.derivative(var))
            }
            Expr::Marker(..) => Expr::zero(),
        }
    }

    /// Best-effort symbolic normalization: constant folding, identity removal, and a
    /// canonical ordering of commutative operands, so structurally equal expressions
    /// reliably compare equal and render identically. Terminates in one bottom-up pass.
    pub fn factor(&self) -> Expr {
        match self {
            Expr::Const(_) | Expr::Symbol(_) => self.clone(),
            Expr::Add(a, b) => fold_add(a.factor(), b.factor()),
            Expr::Mul(a, b) => fold_mul(a.factor(), b.factor()),
            Expr::Div(a, b) => fold_div(a.factor(), b.factor()),
            Expr::Neg(a) => fold_neg(a.factor()),
            Expr::Pow(a, n) => fold_pow(a.factor(), *n),
            Expr::Fn(f, a) => {
                let a = a.factor();
                if let Some(v) = a.as_const() {
                    Expr::constant(f.eval(v))
                } else {
                    Expr::call(*f, &a)
                }
            }
            Expr::Marker(tag, args) => {
                let folded: Vec<Expr> = args.iter().map(Expr::factor).collect();
                Expr::marker(*tag, &folded)
            }
        }
    }

    /// Numerically evaluates `self` given numeric bindings for every free symbol.
    /// Returns `AlgebraError::UnboundSymbol` if a symbol has no binding.
    pub fn eval_numeric(&self, bindings: &[(Expr, f64)]) -> Result<f64, AlgebraError> {
        match self {
            Expr::Const(Num(v)) => Ok(*v),
            Expr::Symbol(_) => bindings
                .iter()
                .find(|(sym, _)| sym == self)
                .map(|(_, v)| *v)
                .ok_or_else(|| AlgebraError::UnboundSymbol(self.to_string())),
            Expr::Add(a, b) => Ok(a.eval_numeric(bindings)? + b.eval_numeric(bindings)?),
            Expr::Mul(a, b) => Ok(a.eval_numeric(bindings)? * b.eval_numeric(bindings)?),
            Expr::Div(a, b) => Ok(a.eval_numeric(bindings)? / b.eval_numeric(bindings)?),
            Expr::Neg(a) => Ok(-a.eval_numeric(bindings)?),
            Expr::Pow(a, n) => Ok(libm::pow(a.eval_numeric(bindings)?, f64::from(*n))),
            Expr::Fn(f, a) => Ok(f.eval(a.eval_numeric(bindings)?)),
            Expr::Marker(..) => bindings
                .iter()
                .find(|(sym, _)| sym == self)
                .map(|(_, v)| *v)
                .ok_or_else(|| AlgebraError::UnboundSymbol(self.to_string())),
        }
    }
}

fn fold_neg(a: Expr) -> Expr {
    match a {
        Expr::Const(Num(v)) => Expr::constant(-v),
        Expr::Neg(inner) => (*inner).clone(),
        _ => a.neg(),
    }
}

fn fold_add(a: Expr, b: Expr) -> Expr {
    if a.is_zero() {
        return b;
    }
    if b.is_zero() {
        return a;
    }
    if let (Some(x), Some(y)) = (a.as_const(), b.as_const()) {
        return Expr::constant(x + y);
    }
    if canonical_key(&a) <= canonical_key(&b) {
        a.add(&b)
    } else {
        b.add(&a)
    }
}

fn fold_mul(a: Expr, b: Expr) -> Expr {
    if a.is_zero() || b.is_zero() {
        return Expr::zero();
    }
    if a == Expr::one() {
        return b;
    }
    if b == Expr::one() {
        return a;
    }
    if let (Some(x), Some(y)) = (a.as_const(), b.as_const()) {
        return Expr::constant(x * y);
    }
    if canonical_key(&a) <= canonical_key(&b) {
        a.mul(&b)
    } else {
        b.mul(&a)
    }
}

fn fold_div(a: Expr, b: Expr) -> Expr {
    if a.is_zero() {
        return Expr::zero();
    }
    if b == Expr::one() {
        return a;
    }
    if let (Some(x), Some(y)) = (a.as_const(), b.as_const()) {
        return Expr::constant(x / y);
    }
    a.div(&b)
}

fn fold_pow(a: Expr, n: i32) -> Expr {
    if n == 0 {
        return Expr::one();
    }
    if n == 1 {
        return a;
    }
    if let Some(v) = a.as_const() {
        return Expr::constant(v.powi(n));
    }
    a.powi(n)
}

/// A stable ordering key used only to pick a deterministic operand order for
/// commutative operations during `factor`. Not a mathematical ordering.
fn canonical_key(e: &Expr) -> String {
    e.to_string()
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(Num(v)) => write!(f, "{v}"),
            Expr::Symbol(s) => write!(f, "{s}"),
            Expr::Add(a, b) => write!(f, "({a} + {b})"),
            Expr::Mul(a, b) => write!(f, "({a} * {b})"),
            Expr::Div(a, b) => write!(f, "({a} / {b})"),
            Expr::Neg(a) => write!(f, "-{a}"),
            Expr::Pow(a, n) => write!(f, "{a}^{n}"),
            Expr::Fn(func, a) => write!(f, "{}({a})", func.name()),
            Expr::Marker(tag, args) => {
                write!(f, "{}(", tag.name())?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl std::ops::Add for &Expr {
    type Output = Expr;
    fn add(self, rhs: &Expr) -> Expr {
        Expr::add(self, rhs)
    }
}

impl std::ops::Sub for &Expr {
    type Output = Expr;
    fn sub(self, rhs: &Expr) -> Expr {
        Expr::sub(self, rhs)
    }
}

impl std::ops::Mul for &Expr {
    type Output = Expr;
    fn mul(self, rhs: &Expr) -> Expr {
        Expr::mul(self, rhs)
    }
}

impl std::ops::Div for &Expr {
    type Output = Expr;
    fn div(self, rhs: &Expr) -> Expr {
        Expr::div(self, rhs)
    }
}

impl std::ops::Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::neg(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_is_bitwise_on_constants() {
        assert_eq!(Expr::constant(1.0), Expr::constant(1.0));
        assert_ne!(Expr::constant(1.0), Expr::constant(1.0 + f64::EPSILON));
    }

    #[test]
    fn derivative_of_linear_term() {
        let x = Expr::symbol("x");
        let expr = Expr::constant(3.0).mul(&x).add(&Expr::constant(2.0));
        assert_eq!(expr.derivative(&x).factor(), Expr::constant(3.0));
    }

    #[test]
    fn derivative_of_marker_matches_only_itself() {
        let y = Expr::symbol("y");
        let t = Expr::symbol("t");
        let dydt = Expr::d_dt(&y, &t);
        assert_eq!(dydt.derivative(&dydt), Expr::one());
        assert_eq!(dydt.derivative(&y), Expr::zero());
    }

    #[test]
    fn evaluate_is_parallel_not_cascaded() {
        let x = Expr::symbol("x");
        let y = Expr::symbol("y");
        // swap x and y: if cascaded, x -> y -> x would be a no-op; parallel swap is not.
        let swapped = x.evaluate(&[(x.clone(), y.clone()), (y.clone(), x.clone())]);
        assert_eq!(swapped, y);
    }

    #[test]
    fn factor_folds_constants_and_identities() {
        let x = Expr::symbol("x");
        let expr = x.add(&Expr::zero()).mul(&Expr::one());
        assert_eq!(expr.factor(), x);
    }

    #[test]
    fn depends_on_detects_compound_subexpression() {
        let y = Expr::symbol("y");
        let t = Expr::symbol("t");
        let dydt = Expr::d_dt(&y, &t);
        let expr = dydt.mul(&Expr::constant(2.0));
        assert!(expr.depends_on(&[dydt.clone()]));
        assert!(!expr.depends_on(&[y]));
    }

    #[test]
    fn eval_numeric_requires_all_bindings() {
        let x = Expr::symbol("x");
        let expr = x.add(&Expr::constant(1.0));
        assert!(expr.eval_numeric(&[]).is_err());
        assert_eq!(expr.eval_numeric(&[(x, 2.0)]).unwrap(), 3.0);
    }
}
