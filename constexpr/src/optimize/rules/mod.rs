//! Algebraic rewrite rules, one module per operator
//!
//! Every rule sees an [`OptimizeContext`] and returns a replacement that
//! evaluates to the same value, traps in the same cases and performs the
//! same side effects in the same order. Constants are compared after
//! conversion to the operating type, so `x + 0L` and `x + 0` match alike.

pub mod add;
pub mod bitand;
pub mod bitor;
pub mod bitxor;
pub mod div;
pub mod equality;
pub mod logical;
pub mod mul;
pub mod relational;
pub mod rem;
pub mod shift;
pub mod sub;

use crate::ast::{BinOp, Node, Type, UnOp};
use crate::interp::{Value, numeric};

use super::context::OptimizeContext;

// ============================================================================
// Constant tests
// ============================================================================

fn is_zero(ctx: &OptimizeContext<'_>, node: &Node) -> bool {
    ctx.typed_constant(node).is_some_and(|v| v.is_zero())
}

/// Integral zero or `+0.0`
fn is_positive_zero(ctx: &OptimizeContext<'_>, node: &Node) -> bool {
    ctx.typed_constant(node).is_some_and(|v| v.is_positive_zero())
}

fn is_one(ctx: &OptimizeContext<'_>, node: &Node) -> bool {
    ctx.typed_constant(node).is_some_and(|v| v.is_one())
}

fn is_minus_one(ctx: &OptimizeContext<'_>, node: &Node) -> bool {
    ctx.typed_constant(node).is_some_and(|v| v.is_minus_one())
}

fn is_all_ones(ctx: &OptimizeContext<'_>, node: &Node) -> bool {
    ctx.typed_constant(node).is_some_and(|v| v.is_all_ones())
}

fn is_bool(ctx: &OptimizeContext<'_>, node: &Node, expected: bool) -> bool {
    ctx.constant(node).and_then(|v| v.as_bool()) == Some(expected)
}

fn is_constant(ctx: &OptimizeContext<'_>, node: &Node) -> bool {
    ctx.constant(node).is_some()
}

/// Integral constant in the operating type
fn int_value(ctx: &OptimizeContext<'_>, node: &Node) -> Option<i128> {
    ctx.typed_constant(node)?.as_i128()
}

/// `0` for integers, `false` for booleans
fn is_zero_or_false(ctx: &OptimizeContext<'_>, node: &Node) -> bool {
    is_zero(ctx, node) || is_bool(ctx, node, false)
}

/// `~0` for integers, `true` for booleans
fn is_all_ones_or_true(ctx: &OptimizeContext<'_>, node: &Node) -> bool {
    is_all_ones(ctx, node) || is_bool(ctx, node, true)
}

fn zero_or_false(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if ctx.is_bool() {
        return Some(Node::bool(false));
    }
    ctx.zero()
}

fn all_ones_or_true(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if ctx.is_bool() {
        return Some(Node::bool(true));
    }
    ctx.number(-1)
}

// ============================================================================
// Shape helpers
// ============================================================================

/// Operands of `node` when it is a binary `op`
fn operands(node: &Node, op: BinOp) -> Option<(&Node, &Node)> {
    match node.as_binary() {
        Some((found, left, right)) if found == op => Some((left, right)),
        _ => None,
    }
}

/// Operand of an arithmetic negation
fn negated(node: &Node) -> Option<&Node> {
    match node.as_unary() {
        Some((UnOp::Neg, operand)) => Some(operand),
        _ => None,
    }
}

/// Operand of a bitwise complement
fn complemented(node: &Node) -> Option<&Node> {
    match node.as_unary() {
        Some((UnOp::BitNot, operand)) => Some(operand),
        _ => None,
    }
}

/// Operand of `~x`, or of `!x` when the operator works on booleans
fn inverted<'n>(ctx: &OptimizeContext<'_>, node: &'n Node) -> Option<&'n Node> {
    if ctx.is_bool() {
        node.as_not()
    } else {
        complemented(node)
    }
}

/// Position of the constant in a binary node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Split `x op C` or `C op x` into the non-constant operand, the constant
/// (in the operating type) and the constant's side. The inner node must
/// compute in the operating type.
fn split_constant<'n>(
    ctx: &OptimizeContext<'_>,
    node: &'n Node,
    op: BinOp,
) -> Option<(&'n Node, Value, Side)> {
    let (left, right) = operands(node, op)?;
    if !ctx.has_op_type(node) {
        return None;
    }
    match (is_constant(ctx, left), is_constant(ctx, right)) {
        (false, true) => Some((left, ctx.typed_constant(right)?, Side::Right)),
        (true, false) => Some((right, ctx.typed_constant(left)?, Side::Left)),
        _ => None,
    }
}

/// Operand whose own unary promotion is the operating type, so shifting or
/// negating it alone computes in the same width
fn promotes_to_op(ctx: &OptimizeContext<'_>, node: &Node) -> bool {
    let promoted = ctx.type_of(node).and_then(|t| numeric::unary_promote(&t));
    promoted.is_some() && promoted == ctx.op_ty
}

fn shift_count(n: u32) -> Node {
    Node::literal(Value::I32(n as i32))
}

fn literal(value: Value) -> Node {
    Node::literal(value)
}

/// Width of the operating type in bits
fn op_width(ctx: &OptimizeContext<'_>) -> Option<u32> {
    ctx.op_ty.as_ref().and_then(Type::bit_width)
}
