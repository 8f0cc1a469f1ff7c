//! Integer interval inference
//!
//! Intervals are in mathematical (unwrapped) integers. Sources, from
//! weakest to strongest:
//!
//! - the bounds of the expression's type
//! - declared `min`/`max` on a variable
//! - facts: conditions known to hold at the current program point
//! - the shape of the expression (`x & 15`, `x % 10`, literals, casts)

use crate::ast::{BinOp, Expr, Node, Pattern, Type, UnOp};
use crate::interp::{Environment, numeric};

use super::purity::is_pure;
use super::typing::infer_type;

/// Closed interval `[lo, hi]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub lo: i128,
    pub hi: i128,
}

impl Interval {
    pub fn new(lo: i128, hi: i128) -> Self {
        Interval { lo, hi }
    }

    pub fn point(n: i128) -> Self {
        Interval::new(n, n)
    }

    /// Every value of an integral type
    pub fn of_type(ty: &Type) -> Option<Self> {
        Some(Interval::new(ty.min_value()?, ty.max_value()?))
    }

    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    pub fn intersect(self, other: Interval) -> Interval {
        Interval::new(self.lo.max(other.lo), self.hi.min(other.hi))
    }

    /// Smallest interval containing both
    pub fn hull(self, other: Interval) -> Interval {
        Interval::new(self.lo.min(other.lo), self.hi.max(other.hi))
    }

    /// Entirely representable in `ty`
    pub fn fits(&self, ty: &Type) -> bool {
        ty.contains(self.lo) && ty.contains(self.hi)
    }

    pub fn as_point(&self) -> Option<i128> {
        (self.lo == self.hi).then_some(self.lo)
    }
}

/// Environment and facts in effect at one program point
#[derive(Clone, Copy)]
pub struct RangeScope<'a> {
    env: &'a Environment,
    facts: &'a [Node],
}

impl<'a> RangeScope<'a> {
    pub fn new(env: &'a Environment, facts: &'a [Node]) -> Self {
        RangeScope { env, facts }
    }

    /// Interval of an integral expression, `None` for other types or
    /// when the facts are contradictory (unreachable code)
    pub fn interval(&self, node: &Node) -> Option<Interval> {
        let ty = infer_type(node, self.env)?;
        if !ty.is_integral() {
            return None;
        }
        let full = Interval::of_type(&ty)?;
        let iv = match self.derive(node, &ty) {
            Some(derived) => derived.intersect(full),
            None => full,
        };
        (!iv.is_empty()).then_some(iv)
    }

    fn derive(&self, node: &Node, ty: &Type) -> Option<Interval> {
        match &node.node {
            Expr::Literal(value) => value.as_i128().map(Interval::point),
            Expr::Var(name) => Some(self.variable(name, ty)),
            Expr::Cast { ty: target, expr } => {
                let inner = self.interval(expr)?;
                inner.fits(target).then_some(inner)
            }
            Expr::Unary {
                op: UnOp::Neg,
                operand,
            } => {
                let inner = self.interval(operand)?;
                let iv = Interval::new(-inner.hi, -inner.lo);
                iv.fits(ty).then_some(iv)
            }
            Expr::Conditional {
                then_branch,
                else_branch,
                ..
            } => {
                // arms convert to the conditional's type; a wrapping conversion
                // leaves nothing known
                let iv = self.interval(then_branch)?.hull(self.interval(else_branch)?);
                iv.fits(ty).then_some(iv)
            }
            Expr::Binary { op, left, right } => self.derive_binary(*op, left, right, ty),
            _ => None,
        }
    }

    fn derive_binary(&self, op: BinOp, left: &Node, right: &Node, ty: &Type) -> Option<Interval> {
        match op {
            BinOp::BitAnd => {
                let masks: Vec<i128> = [left, right]
                    .iter()
                    .filter_map(|n| self.interval(n))
                    .filter(|iv| iv.lo >= 0)
                    .map(|iv| iv.hi)
                    .collect();
                masks.into_iter().min().map(|hi| Interval::new(0, hi))
            }
            BinOp::Rem => {
                let m = self.constant(right)?.checked_abs()?;
                if m == 0 {
                    return None;
                }
                let l = self.interval(left)?;
                let lo = if l.lo >= 0 { 0 } else { l.lo.max(-(m - 1)) };
                let hi = if l.hi <= 0 { 0 } else { l.hi.min(m - 1) };
                Some(Interval::new(lo, hi))
            }
            BinOp::Shr => {
                let count = self.constant(right)?;
                let l = self.interval(left)?;
                if !(0..32).contains(&count) || l.lo < 0 {
                    return None;
                }
                Some(Interval::new(l.lo >> count, l.hi >> count))
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul => {
                let l = self.interval(left)?;
                let r = self.interval(right)?;
                let iv = match op {
                    BinOp::Add => Interval::new(l.lo.checked_add(r.lo)?, l.hi.checked_add(r.hi)?),
                    BinOp::Sub => Interval::new(l.lo.checked_sub(r.hi)?, l.hi.checked_sub(r.lo)?),
                    _ => {
                        let corners = [
                            l.lo.checked_mul(r.lo)?,
                            l.lo.checked_mul(r.hi)?,
                            l.hi.checked_mul(r.lo)?,
                            l.hi.checked_mul(r.hi)?,
                        ];
                        Interval::new(
                            corners.iter().copied().min()?,
                            corners.iter().copied().max()?,
                        )
                    }
                };
                // a result that may wrap says nothing
                iv.fits(ty).then_some(iv)
            }
            _ => None,
        }
    }

    fn variable(&self, name: &str, ty: &Type) -> Interval {
        let Some(item) = self.env.lookup(name) else {
            return Interval::of_type(ty).unwrap_or(Interval::new(i128::MIN, i128::MAX));
        };
        if let Some(n) = item.value.as_ref().and_then(|v| v.as_i128()) {
            return Interval::point(n);
        }
        let mut iv = Interval::of_type(&item.ty)
            .or_else(|| Interval::of_type(ty))
            .unwrap_or(Interval::new(i128::MIN, i128::MAX));
        if let Some(min) = item.min.as_ref().and_then(|v| v.as_i128()) {
            iv.lo = iv.lo.max(min);
        }
        if let Some(max) = item.max.as_ref().and_then(|v| v.as_i128()) {
            iv.hi = iv.hi.min(max);
        }
        for fact in self.facts {
            self.apply_fact(name, fact, true, &mut iv);
        }
        iv
    }

    /// Narrow `iv` by a condition known to evaluate to `holds`
    fn apply_fact(&self, name: &str, fact: &Node, holds: bool, iv: &mut Interval) {
        match &fact.node {
            Expr::Binary {
                op: BinOp::And,
                left,
                right,
            } if holds => {
                self.apply_fact(name, left, true, iv);
                self.apply_fact(name, right, true, iv);
            }
            Expr::Binary {
                op: BinOp::Or,
                left,
                right,
            } if !holds => {
                self.apply_fact(name, left, false, iv);
                self.apply_fact(name, right, false, iv);
            }
            Expr::Unary {
                op: UnOp::Not,
                operand,
            } => self.apply_fact(name, operand, !holds, iv),
            Expr::Binary { op, left, right } if op.is_comparison() => {
                let op = if holds { Some(*op) } else { op.negated() };
                let Some(op) = op else { return };
                if left.as_var() == Some(name) {
                    if let Some(k) = self.constant(right) {
                        constrain(iv, op, k);
                    }
                } else if right.as_var() == Some(name) {
                    if let (Some(k), Some(op)) = (self.constant(left), op.flipped()) {
                        constrain(iv, op, k);
                    }
                }
            }
            Expr::Is { operand, pattern } if holds && operand.as_var() == Some(name) => {
                apply_pattern(iv, pattern);
            }
            _ => {}
        }
    }

    /// Integral value of a literal or known variable
    fn constant(&self, node: &Node) -> Option<i128> {
        match &node.node {
            Expr::Literal(value) => value.as_i128(),
            Expr::Var(name) => self.env.value(name).and_then(|v| v.as_i128()),
            _ => None,
        }
    }

    /// Outcome of an integral comparison that holds for every value the
    /// operands can take. Both operands must be pure since the answer
    /// replaces the whole comparison.
    pub fn decide(&self, op: BinOp, left: &Node, right: &Node) -> Option<bool> {
        if !op.is_comparison() || !is_pure(left) || !is_pure(right) {
            return None;
        }
        let a = self.interval(left)?;
        let b = self.interval(right)?;
        let operating = numeric::promote(
            &infer_type(left, self.env)?,
            &infer_type(right, self.env)?,
        )?;
        // mixed-sign 64-bit comparisons convert operands, so math order
        // is only trustworthy when both sides fit the compared type
        if !a.fits(&operating) || !b.fits(&operating) {
            return None;
        }
        decide_intervals(op, a, b)
    }

    /// Proven non-negative
    pub fn non_negative(&self, node: &Node) -> bool {
        self.interval(node).is_some_and(|iv| iv.lo >= 0)
    }

    /// Truth value of a condition built from literals, `!` and
    /// comparisons, when provable
    pub fn decide_condition(&self, node: &Node) -> Option<bool> {
        if let Some(b) = node.as_literal().and_then(|v| v.as_bool()) {
            return Some(b);
        }
        if let Some(inner) = node.as_not() {
            return self.decide_condition(inner).map(|b| !b);
        }
        match node.as_binary()? {
            (op, left, right) if op.is_comparison() => self.decide(op, left, right),
            _ => None,
        }
    }
}

fn decide_intervals(op: BinOp, a: Interval, b: Interval) -> Option<bool> {
    match op {
        BinOp::Lt if a.hi < b.lo => Some(true),
        BinOp::Lt if a.lo >= b.hi => Some(false),
        BinOp::Le if a.hi <= b.lo => Some(true),
        BinOp::Le if a.lo > b.hi => Some(false),
        BinOp::Gt => decide_intervals(BinOp::Lt, b, a),
        BinOp::Ge => decide_intervals(BinOp::Le, b, a),
        BinOp::Eq if a.intersect(b).is_empty() => Some(false),
        BinOp::Eq if a.as_point().is_some() && a.as_point() == b.as_point() => Some(true),
        BinOp::Ne => decide_intervals(BinOp::Eq, a, b).map(|eq| !eq),
        _ => None,
    }
}

fn constrain(iv: &mut Interval, op: BinOp, k: i128) {
    match op {
        BinOp::Lt => iv.hi = iv.hi.min(k - 1),
        BinOp::Le => iv.hi = iv.hi.min(k),
        BinOp::Gt => iv.lo = iv.lo.max(k + 1),
        BinOp::Ge => iv.lo = iv.lo.max(k),
        BinOp::Eq => {
            iv.lo = iv.lo.max(k);
            iv.hi = iv.hi.min(k);
        }
        BinOp::Ne => {
            if iv.lo == k {
                iv.lo += 1;
            } else if iv.hi == k {
                iv.hi -= 1;
            }
        }
        _ => {}
    }
}

fn apply_pattern(iv: &mut Interval, pattern: &Pattern) {
    match pattern {
        Pattern::Constant(value) => {
            if let Some(k) = value.as_i128() {
                constrain(iv, BinOp::Eq, k);
            }
        }
        Pattern::Relational { op, value } => {
            if let Some(k) = value.as_i128() {
                constrain(iv, *op, k);
            }
        }
        Pattern::And(a, b) => {
            apply_pattern(iv, a);
            apply_pattern(iv, b);
        }
        _ => {}
    }
}
