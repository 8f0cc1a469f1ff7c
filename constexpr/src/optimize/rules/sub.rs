//! Subtraction rules

use crate::ast::{BinOp, Node, UnOp};

use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{Side, is_constant, is_positive_zero, is_zero, negated, operands, split_constant};

pub static RULES: &[Rule] = &[
    Rule::new("sub_identity", Domain::Numeric, identity),
    Rule::new("sub_from_zero", Domain::SignedOrFloat, from_zero),
    Rule::new("sub_self", Domain::Numeric, self_cancel),
    Rule::new("sub_negated_operand", Domain::Numeric, negated_operand),
    Rule::new("sub_constant_folding", Domain::Numeric, constant_folding),
    Rule::new("sub_addition_cancel", Domain::Integer, addition_cancel),
    Rule::new("sub_fma_left_multiply", Domain::Float, fma_left_multiply),
    Rule::new("sub_fma_right_multiply", Domain::Float, fma_right_multiply),
];

/// `x - 0 => x`; `x - (-0.0)` is `x + 0.0`, which is inexact for `-0.0`
fn identity(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !is_zero(ctx, ctx.right) {
        return None;
    }
    let exact = ctx.is_integer() || is_positive_zero(ctx, ctx.right) || ctx.fast_math();
    exact.then(|| ctx.left.clone())
}

/// `0 - x => -x`. For floats the exact form is `-0.0 - x`.
fn from_zero(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !is_zero(ctx, ctx.left) || !ctx.has_op_type(ctx.right) {
        return None;
    }
    let exact = ctx.is_integer() || !is_positive_zero(ctx, ctx.left) || ctx.fast_math();
    exact.then(|| Node::unary(UnOp::Neg, ctx.right.clone()))
}

/// `x - x => 0`; for floats `inf - inf` is NaN
fn self_cancel(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if ctx.is_float() && !ctx.fast_math() {
        return None;
    }
    if ctx.same_value(ctx.left, ctx.right) {
        return ctx.zero();
    }
    None
}

/// `x - (-y) => x + y`
fn negated_operand(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let y = negated(ctx.right)?;
    if !ctx.has_op_type(y) {
        return None;
    }
    Some(Node::binary(BinOp::Add, ctx.left.clone(), y.clone()))
}

/// Merge constants across a nested addition or subtraction:
///
/// | before            | after             |
/// |-------------------|-------------------|
/// | `(x + C1) - C2`   | `x + (C1 - C2)`   |
/// | `(x - C1) - C2`   | `x - (C1 + C2)`   |
/// | `(C1 - x) - C2`   | `(C1 - C2) - x`   |
/// | `C1 - (x + C2)`   | `(C1 - C2) - x`   |
/// | `C1 - (x - C2)`   | `(C1 + C2) - x`   |
/// | `C1 - (C2 - x)`   | `x + (C1 - C2)`   |
fn constant_folding(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.reassociable() {
        return None;
    }
    let plus = |x: &Node, k| Some(Node::binary(BinOp::Add, x.clone(), Node::literal(k)));
    let minus = |x: &Node, k| Some(Node::binary(BinOp::Sub, x.clone(), Node::literal(k)));
    let from = |k, x: &Node| Some(Node::binary(BinOp::Sub, Node::literal(k), x.clone()));

    if !is_constant(ctx, ctx.left) {
        let c2 = ctx.typed_constant(ctx.right)?;
        if let Some((x, c1, _)) = split_constant(ctx, ctx.left, BinOp::Add) {
            return plus(x, ctx.fold(BinOp::Sub, &c1, &c2)?);
        }
        return match split_constant(ctx, ctx.left, BinOp::Sub)? {
            (x, c1, Side::Right) => minus(x, ctx.fold(BinOp::Add, &c1, &c2)?),
            (x, c1, Side::Left) => from(ctx.fold(BinOp::Sub, &c1, &c2)?, x),
        };
    }

    let c1 = ctx.typed_constant(ctx.left)?;
    if let Some((x, c2, _)) = split_constant(ctx, ctx.right, BinOp::Add) {
        return from(ctx.fold(BinOp::Sub, &c1, &c2)?, x);
    }
    match split_constant(ctx, ctx.right, BinOp::Sub)? {
        (x, c2, Side::Right) => from(ctx.fold(BinOp::Add, &c1, &c2)?, x),
        (x, c2, Side::Left) => plus(x, ctx.fold(BinOp::Sub, &c1, &c2)?),
    }
}

/// `(x + a) - a => x` and `(a + x) - a => x`
fn addition_cancel(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (l, r) = operands(ctx.left, BinOp::Add)?;
    if !ctx.has_op_type(ctx.left) {
        return None;
    }
    if ctx.same_value(r, ctx.right) {
        return Some(l.clone());
    }
    if ctx.same_value(l, ctx.right) {
        return Some(r.clone());
    }
    None
}

fn fused(ctx: &OptimizeContext<'_>, a: Node, b: Node, c: Node) -> Option<Node> {
    let ty = ctx.op_ty.clone()?;
    let args = vec![a, b, c];
    ctx.capability_call(&ty, "fused_multiply_add", args.clone(), ty.clone())
        .or_else(|| ctx.capability_call(&ty, "multiply_add_estimate", args, ty.clone()))
}

/// `(a * b) - c => fma(a, b, -c)`
fn fma_left_multiply(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.fast_math() || !ctx.has_op_type(ctx.left) {
        return None;
    }
    let (a, b) = operands(ctx.left, BinOp::Mul)?;
    if !(ctx.is_pure(a) && ctx.is_pure(b) && ctx.is_pure(ctx.right)) {
        return None;
    }
    let c = Node::unary(UnOp::Neg, ctx.right.clone());
    fused(ctx, a.clone(), b.clone(), c)
}

/// `c - (a * b) => fma(-a, b, c)`
fn fma_right_multiply(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.fast_math() || !ctx.has_op_type(ctx.right) {
        return None;
    }
    let (a, b) = operands(ctx.right, BinOp::Mul)?;
    if !(ctx.is_pure(a) && ctx.is_pure(b) && ctx.is_pure(ctx.left)) {
        return None;
    }
    let a = Node::unary(UnOp::Neg, a.clone());
    fused(ctx, a, b.clone(), ctx.left.clone())
}
