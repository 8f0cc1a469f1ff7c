//! `==` and `!=` rules
//!
//! Rules are written for `==`; for `!=` the same replacement is negated.

use crate::ast::{BinOp, Node, Type};

use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{Side, is_bool, is_zero, is_zero_or_false, negated, operands, split_constant};

pub static RULES: &[Rule] = &[
    Rule::new("equality_self", Domain::Any, self_compare),
    Rule::new("equality_range_decide", Domain::Integer, range_decide),
    Rule::symmetric("equality_bool_literal", Domain::Boolean, bool_literal),
    Rule::symmetric("equality_parity", Domain::Integer, parity),
    Rule::symmetric("equality_difference_zero", Domain::Integer, difference_zero),
    Rule::symmetric("equality_xor_zero", Domain::IntegerOrBoolean, xor_zero),
    Rule::new("equality_negation", Domain::Numeric, negation),
    Rule::symmetric("equality_offset", Domain::Integer, offset),
];

fn is_ne(ctx: &OptimizeContext<'_>) -> bool {
    ctx.op == BinOp::Ne
}

/// `a == b`, or `a != b` under `!=`
fn compare(ctx: &OptimizeContext<'_>, a: Node, b: Node) -> Node {
    Node::binary(ctx.op, a, b)
}

/// `x == x => true` for non-float `x`
fn self_compare(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let floating = ctx.type_of(ctx.left).is_none_or(|t| t.is_float()) || ctx.is_float();
    if floating || !ctx.same_value(ctx.left, ctx.right) {
        return None;
    }
    Some(Node::bool(!is_ne(ctx)))
}

/// Comparison the operand intervals already decide
fn range_decide(ctx: &OptimizeContext<'_>) -> Option<Node> {
    ctx.ranges()
        .decide(ctx.op, ctx.left, ctx.right)
        .map(Node::bool)
}

/// `b == true => b`, `b == false => !b`
fn bool_literal(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if ctx.type_of(ctx.left) != Some(Type::Bool) {
        return None;
    }
    let expected = if is_bool(ctx, ctx.right, true) {
        true
    } else if is_bool(ctx, ctx.right, false) {
        false
    } else {
        return None;
    };
    if expected != is_ne(ctx) {
        Some(ctx.left.clone())
    } else {
        Some(Node::not(ctx.left.clone()))
    }
}

/// `(x & 1) == 0 => T::is_even(x)`, `x % 2 != 0 => T::is_odd(x)`
fn parity(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let expected = ctx.int_constant(ctx.right)?;
    if !matches!(expected, 0 | 1) {
        return None;
    }
    let (x, by_remainder) = if let Some((x, k)) = operands(ctx.left, BinOp::BitAnd) {
        match (ctx.int_constant(x), ctx.int_constant(k)) {
            (None, Some(1)) => (x, false),
            (Some(1), None) => (k, false),
            _ => return None,
        }
    } else {
        let (x, k) = operands(ctx.left, BinOp::Rem)?;
        if ctx.int_constant(k) != Some(2) {
            return None;
        }
        (x, true)
    };
    // a negative odd dividend leaves -1, never 1
    if by_remainder && expected == 1 && !ctx.ranges().non_negative(x) {
        return None;
    }
    let odd = (expected == 1) != is_ne(ctx);
    let ty = ctx.type_of(x)?;
    let member = if odd { "is_odd" } else { "is_even" };
    ctx.capability_call(&ty, member, vec![x.clone()], Type::Bool)
}

/// `x - y == 0 => x == y`
fn difference_zero(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (x, y) = operands(ctx.left, BinOp::Sub)?;
    if !is_zero(ctx, ctx.right) || !ctx.type_of(ctx.left)?.is_integral() {
        return None;
    }
    Some(compare(ctx, x.clone(), y.clone()))
}

/// `(x ^ y) == 0 => x == y`, `(a ^ b) == false => a == b`
fn xor_zero(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (x, y) = operands(ctx.left, BinOp::BitXor)?;
    if !is_zero_or_false(ctx, ctx.right) {
        return None;
    }
    Some(compare(ctx, x.clone(), y.clone()))
}

/// `-x == -y => x == y` when both negations compute in the compared type
fn negation(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let x = negated(ctx.left)?;
    let y = negated(ctx.right)?;
    if !ctx.has_op_type(ctx.left) || !ctx.has_op_type(ctx.right) {
        return None;
    }
    Some(compare(ctx, x.clone(), y.clone()))
}

/// `x + C1 == C2 => x == C2 - C1`; wrapping addition is a bijection, so
/// this holds even when the sum overflows
fn offset(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let c2 = ctx.typed_constant(ctx.right)?;
    let (op, _, _) = ctx.left.as_binary()?;
    let subtract = match op {
        BinOp::Add => false,
        BinOp::Sub => true,
        _ => return None,
    };
    let (x, c1, side) = split_constant(ctx, ctx.left, op)?;
    let k = match (subtract, side) {
        (false, _) => ctx.fold(BinOp::Sub, &c2, &c1)?,
        (true, Side::Right) => ctx.fold(BinOp::Add, &c2, &c1)?,
        // C1 - x == C2
        (true, Side::Left) => ctx.fold(BinOp::Sub, &c1, &c2)?,
    };
    Some(compare(ctx, x.clone(), Node::literal(k)))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::host::HostLibrary;
    use crate::interp::{Environment, Interpreter, Value};

    fn x() -> Node {
        var("x", Type::I32)
    }

    fn env() -> Environment {
        unknowns(&[
            ("x", Type::I32),
            ("y", Type::I32),
            ("u", Type::U32),
            ("b", Type::Bool),
            ("f", Type::F64),
        ])
    }

    #[test]
    fn test_self_comparison() {
        let env = env();
        assert_eq!(rendered(BinOp::Eq, x(), x(), &env).as_deref(), Some("true"));
        assert_eq!(rendered(BinOp::Ne, x(), x(), &env).as_deref(), Some("false"));
        // NaN != NaN
        let f = var("f", Type::F64);
        assert_eq!(rewrite(BinOp::Eq, &f, &f, &env), None);
    }

    #[test]
    fn test_bool_literal() {
        let env = env();
        let b = var("b", Type::Bool);
        assert_eq!(
            rendered(BinOp::Eq, b.clone(), Node::bool(true), &env).as_deref(),
            Some("b")
        );
        assert_eq!(
            rendered(BinOp::Eq, Node::bool(false), b.clone(), &env).as_deref(),
            Some("!b")
        );
        assert_eq!(
            rendered(BinOp::Ne, b, Node::bool(false), &env).as_deref(),
            Some("b")
        );
    }

    #[test]
    fn test_parity() {
        let env = env();
        let low_bit = Node::binary(BinOp::BitAnd, x(), i32_lit(1));
        assert_eq!(
            rendered(BinOp::Eq, low_bit.clone(), i32_lit(0), &env).as_deref(),
            Some("i32::is_even(x)")
        );
        assert_eq!(
            rendered(BinOp::Ne, low_bit, i32_lit(0), &env).as_deref(),
            Some("i32::is_odd(x)")
        );
        let rem = Node::binary(BinOp::Rem, x(), i32_lit(2));
        assert_eq!(
            rendered(BinOp::Eq, i32_lit(0), rem.clone(), &env).as_deref(),
            Some("i32::is_even(x)")
        );
        // -3 % 2 is -1
        assert_eq!(rewrite(BinOp::Eq, &rem, &i32_lit(1), &env), None);

        let u = var("u", Type::U32);
        let rem = Node::binary(BinOp::Rem, u, Node::literal(Value::U32(2)));
        assert_eq!(
            rendered(BinOp::Eq, rem, Node::literal(Value::U32(1)), &env).as_deref(),
            Some("u32::is_odd(u)")
        );
    }

    #[test]
    fn test_parity_needs_host_member() {
        let env = env();
        let host = HostLibrary::standard().without("is_even");
        let options = crate::config::OptimizerOptions::default();
        let low_bit = Node::binary(BinOp::BitAnd, x(), i32_lit(1));
        let zero = i32_lit(0);
        let ctx = OptimizeContext::new(BinOp::Eq, &low_bit, &zero, &env, &host, &options);
        assert!(parity(&ctx).is_none());
    }

    #[test]
    fn test_difference_and_xor() {
        let env = env();
        let y = var("y", Type::I32);
        let diff = Node::binary(BinOp::Sub, x(), y.clone());
        assert_eq!(
            rendered(BinOp::Eq, diff, i32_lit(0), &env).as_deref(),
            Some("x == y")
        );
        let xor = Node::binary(BinOp::BitXor, x(), y);
        assert_eq!(
            rendered(BinOp::Ne, i32_lit(0), xor, &env).as_deref(),
            Some("x != y")
        );
    }

    #[test]
    fn test_negation() {
        let env = env();
        let neg = |n: Node| Node::unary(crate::ast::UnOp::Neg, n);
        assert_eq!(
            rendered(BinOp::Eq, neg(x()), neg(var("y", Type::I32)), &env).as_deref(),
            Some("x == y")
        );
    }

    #[test]
    fn test_offset_wraps_consistently() {
        let env = env();
        let sum = Node::binary(BinOp::Add, x(), i32_lit(3));
        let original = Node::binary(BinOp::Eq, sum.clone(), i32_lit(i32::MIN));
        let (name, node) = rewrite(BinOp::Eq, &sum, &i32_lit(i32::MIN), &env).unwrap();
        assert_eq!(name, "equality_offset");
        assert_eq!(node.to_string(), "x == 2147483645");
        assert_equivalent(
            &original,
            &node,
            &env,
            "x",
            &[Value::I32(i32::MAX - 2), Value::I32(0), Value::I32(i32::MAX)],
        );

        let diff = Node::binary(BinOp::Sub, i32_lit(10), x());
        assert_eq!(
            rendered(BinOp::Ne, diff, i32_lit(4), &env).as_deref(),
            Some("x != 6")
        );
    }

    #[test]
    fn test_offset_every_operand_order() {
        let env = env();
        let cases = [
            (Node::binary(BinOp::Add, i32_lit(3), x()), "x == 4"),
            (Node::binary(BinOp::Sub, x(), i32_lit(3)), "x == 10"),
            (Node::binary(BinOp::Sub, i32_lit(3), x()), "x == -4"),
        ];
        let right = || i32_lit(7);
        for (left, expected) in cases {
            let original = Node::binary(BinOp::Eq, left.clone(), right());
            let (name, node) = rewrite(BinOp::Eq, &left, &right(), &env).unwrap();
            assert_eq!(name, "equality_offset");
            assert_eq!(node.to_string(), expected);
            assert_equivalent(
                &original,
                &node,
                &env,
                "x",
                &[Value::I32(-4), Value::I32(4), Value::I32(10), Value::I32(i32::MIN)],
            );
        }
        // x * 3 == 7 is not an offset
        let product = Node::binary(BinOp::Mul, x(), i32_lit(3));
        let rewritten = rewrite(BinOp::Eq, &product, &right(), &env);
        assert_ne!(rewritten.map(|(name, _)| name), Some("equality_offset"));
    }

    #[test]
    fn test_range_decide() {
        let env = unknowns(&[("b", Type::U8)]);
        let b = var("b", Type::U8);
        assert_eq!(
            rendered(BinOp::Eq, b.clone(), i32_lit(300), &env).as_deref(),
            Some("false")
        );
        let masked = Node::binary(BinOp::BitAnd, b, i32_lit(7));
        let node = Node::binary(BinOp::Ne, masked.clone(), i32_lit(8));
        assert_eq!(
            rendered(BinOp::Ne, masked, i32_lit(8), &env).as_deref(),
            Some("true")
        );
        let host = HostLibrary::standard();
        let mut bound = env.clone();
        bound.assign("b", Some(Value::U8(255)));
        assert_eq!(
            Interpreter::new(&host).evaluate(&node, &mut bound),
            Some(Value::Bool(true))
        );
    }
}
