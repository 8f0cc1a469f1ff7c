//! Short-circuit `&&` and `||` rules
//!
//! The right operand is only evaluated when the left one does not decide
//! the result, so dropping the right operand is always safe while dropping
//! or duplicating the left one needs it to be pure.

use crate::analysis::RangeScope;
use crate::ast::{BinOp, Node, Type};
use crate::interp::numeric;

use super::super::bitmask;
use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{is_bool, operands};

pub static AND_RULES: &[Rule] = &[
    Rule::new("and_left_literal", Domain::Boolean, and_left_literal),
    Rule::new("and_right_literal", Domain::Boolean, and_right_literal),
    Rule::new("and_idempotent", Domain::Boolean, idempotent),
    Rule::symmetric("and_contradiction", Domain::Boolean, and_contradiction),
    Rule::new("and_absorption", Domain::Boolean, and_absorption),
    Rule::new("and_implied_operand", Domain::Boolean, and_implied_operand),
    Rule::new("and_de_morgan", Domain::Boolean, and_de_morgan),
    Rule::symmetric("and_range_merge", Domain::Boolean, and_range_merge),
];

pub static OR_RULES: &[Rule] = &[
    Rule::new("or_equality_chain_to_bitmask", Domain::Boolean, or_equality_chain),
    Rule::new("or_left_literal", Domain::Boolean, or_left_literal),
    Rule::new("or_right_literal", Domain::Boolean, or_right_literal),
    Rule::new("or_idempotent", Domain::Boolean, idempotent),
    Rule::symmetric("or_tautology", Domain::Boolean, or_tautology),
    Rule::new("or_absorption", Domain::Boolean, or_absorption),
    Rule::new("or_implied_operand", Domain::Boolean, or_implied_operand),
    Rule::new("or_de_morgan", Domain::Boolean, or_de_morgan),
];

// ============================================================================
// Shared
// ============================================================================

/// `a && a => a`, `a || a => a`
fn idempotent(ctx: &OptimizeContext<'_>) -> Option<Node> {
    ctx.same_value(ctx.left, ctx.right).then(|| ctx.left.clone())
}

/// `a` and `!a` for the same pure `a`
fn contradicts(ctx: &OptimizeContext<'_>, a: &Node, b: &Node) -> bool {
    b.as_not().is_some_and(|inner| ctx.same_value(a, inner))
}

/// Decide `node` with `assumed` added to the facts in effect
fn decide_assuming(ctx: &OptimizeContext<'_>, assumed: Node, node: &Node) -> Option<bool> {
    let mut facts = ctx.facts.to_vec();
    facts.push(assumed);
    RangeScope::new(ctx.env, &facts).decide_condition(node)
}

/// `!a op !b => !(a flipped b)`
fn de_morgan(ctx: &OptimizeContext<'_>, flipped: BinOp) -> Option<Node> {
    let a = ctx.left.as_not()?;
    let b = ctx.right.as_not()?;
    Some(Node::not(Node::binary(flipped, a.clone(), b.clone())))
}

// ============================================================================
// &&
// ============================================================================

/// `true && x => x`, `false && x => false`
fn and_left_literal(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if is_bool(ctx, ctx.left, true) {
        return Some(ctx.right.clone());
    }
    is_bool(ctx, ctx.left, false).then(|| Node::bool(false))
}

/// `x && true => x`, `x && false => false`
fn and_right_literal(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if is_bool(ctx, ctx.right, true) {
        return Some(ctx.left.clone());
    }
    (is_bool(ctx, ctx.right, false) && ctx.is_pure(ctx.left)).then(|| Node::bool(false))
}

/// `a && !a => false`
fn and_contradiction(ctx: &OptimizeContext<'_>) -> Option<Node> {
    contradicts(ctx, ctx.left, ctx.right).then(|| Node::bool(false))
}

/// `a && (a || b) => a` and `(a || b) && a => a`
fn and_absorption(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if let Some((a, _)) = operands(ctx.right, BinOp::Or) {
        // b never runs: a true short-circuits the inner `||`
        if ctx.same_value(ctx.left, a) {
            return Some(ctx.left.clone());
        }
    }
    let (a, b) = operands(ctx.left, BinOp::Or)?;
    let absorbed = (ctx.same_value(ctx.right, a) && ctx.is_pure(b))
        || (ctx.same_value(ctx.right, b) && ctx.is_pure(a));
    absorbed.then(|| ctx.right.clone())
}

/// Drop an operand the other one implies, or fold a contradiction:
/// `x > 0 && x > 5 => x > 5`, `x > 5 && x < 3 => false`
fn and_implied_operand(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.is_pure(ctx.left) || !ctx.is_pure(ctx.right) {
        return None;
    }
    if decide_assuming(ctx, ctx.right.clone(), ctx.left) == Some(true) {
        return Some(ctx.right.clone());
    }
    match decide_assuming(ctx, ctx.left.clone(), ctx.right) {
        Some(true) => Some(ctx.left.clone()),
        Some(false) => Some(Node::bool(false)),
        None => None,
    }
}

/// `!a && !b => !(a || b)`
fn and_de_morgan(ctx: &OptimizeContext<'_>) -> Option<Node> {
    de_morgan(ctx, BinOp::Or)
}

/// Inclusive bound a comparison against a constant puts on its subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Lower(i128),
    Upper(i128),
}

/// `x >= 3`, `x > 2`, `3 <= x` and `2 < x` are all `Lower(3)` on `x`
fn bound<'n>(ctx: &OptimizeContext<'_>, node: &'n Node) -> Option<(&'n Node, Bound)> {
    let (op, left, right) = node.as_binary()?;
    if !op.is_relational() {
        return None;
    }
    let (subject, op, k, constant) = match (ctx.int_constant(left), ctx.int_constant(right)) {
        (None, Some(k)) => (left, op, k, right),
        (Some(k), None) => (right, op.flipped()?, k, left),
        _ => return None,
    };
    // the comparison must be exact over every value of the subject
    let subject_ty = ctx.type_of(subject)?;
    let compared = numeric::promote(&subject_ty, &ctx.type_of(constant)?)?;
    let full = crate::analysis::Interval::of_type(&subject_ty)?;
    if !subject_ty.is_integral() || !full.fits(&compared) {
        return None;
    }
    let bound = match op {
        BinOp::Ge => Bound::Lower(k),
        BinOp::Gt => Bound::Lower(k.checked_add(1)?),
        BinOp::Le => Bound::Upper(k),
        BinOp::Lt => Bound::Upper(k.checked_sub(1)?),
        _ => return None,
    };
    Some((subject, bound))
}

/// `x >= lo && x <= hi => (u32)(x - lo) <= hi - lo`
fn and_range_merge(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (subject, lower) = bound(ctx, ctx.left)?;
    let (other, upper) = bound(ctx, ctx.right)?;
    let (Bound::Lower(lo), Bound::Upper(hi)) = (lower, upper) else {
        return None;
    };
    if !ctx.same_value(subject, other) {
        return None;
    }
    let ty: Type = ctx.type_of(subject)?;
    let lo = lo.max(ty.min_value()?);
    let hi = hi.min(ty.max_value()?);
    if lo > hi {
        return Some(Node::bool(false));
    }
    bitmask::range_check(subject, &ty, lo, hi)
}

// ============================================================================
// ||
// ============================================================================

/// `x == 1 || x == 5 || x == 10` as a bit test; only at the top of a chain
fn or_equality_chain(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if ctx.parent == Some(BinOp::Or) {
        return None;
    }
    bitmask::compact_or(ctx)
}

/// `true || x => true`, `false || x => x`
fn or_left_literal(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if is_bool(ctx, ctx.left, false) {
        return Some(ctx.right.clone());
    }
    is_bool(ctx, ctx.left, true).then(|| Node::bool(true))
}

/// `x || false => x`, `x || true => true`
fn or_right_literal(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if is_bool(ctx, ctx.right, false) {
        return Some(ctx.left.clone());
    }
    (is_bool(ctx, ctx.right, true) && ctx.is_pure(ctx.left)).then(|| Node::bool(true))
}

/// `a || !a => true`
fn or_tautology(ctx: &OptimizeContext<'_>) -> Option<Node> {
    contradicts(ctx, ctx.left, ctx.right).then(|| Node::bool(true))
}

/// `a || (a && b) => a` and `(a && b) || a => a`
fn or_absorption(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if let Some((a, _)) = operands(ctx.right, BinOp::And) {
        if ctx.same_value(ctx.left, a) {
            return Some(ctx.left.clone());
        }
    }
    let (a, b) = operands(ctx.left, BinOp::And)?;
    let absorbed = (ctx.same_value(ctx.right, a) && ctx.is_pure(b))
        || (ctx.same_value(ctx.right, b) && ctx.is_pure(a));
    absorbed.then(|| ctx.right.clone())
}

/// Keep the weaker operand, or fold a tautology:
/// `x > 5 || x > 0 => x > 0`, `x < 5 || x >= 5 => true`
fn or_implied_operand(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.is_pure(ctx.left) || !ctx.is_pure(ctx.right) {
        return None;
    }
    if decide_assuming(ctx, ctx.left.clone(), ctx.right) == Some(true) {
        return Some(ctx.right.clone());
    }
    if decide_assuming(ctx, ctx.right.clone(), ctx.left) == Some(true) {
        return Some(ctx.left.clone());
    }
    let negated = Node::not(ctx.left.clone());
    (decide_assuming(ctx, negated, ctx.right) == Some(true)).then(|| Node::bool(true))
}

/// `!a || !b => !(a && b)`
fn or_de_morgan(ctx: &OptimizeContext<'_>) -> Option<Node> {
    de_morgan(ctx, BinOp::And)
}
