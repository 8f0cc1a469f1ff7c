//! Property-based tests for the rewrite engine.
//!
//! Random integer and boolean trees over unknown variables are optimized,
//! then checked:
//! 1. Soundness: the optimized tree evaluates like the original for
//!    sampled values of the variables
//! 2. Idempotence: optimizing the result again changes nothing
//!
//! One family uses two `i32` variables; the other mixes `u8`, `i32`, `u32`
//! and `i64` operands so numeric promotion is exercised, conditionals with
//! arms of different types included.

use constexpr::{BinOp, Environment, Node, Type, UnOp, Value, evaluate, optimize_to_fixpoint};
use proptest::prelude::*;

// -- Tree Generation Strategies --

fn int(n: i32) -> Node {
    Node::literal(Value::I32(n))
}

fn leaf_strategy() -> BoxedStrategy<Node> {
    prop_oneof![
        Just(Node::var("x", Type::I32)),
        Just(Node::var("y", Type::I32)),
        (-8i32..=8).prop_map(int),
        Just(int(i32::MAX)),
    ]
    .boxed()
}

fn arithmetic_op_strategy() -> impl Strategy<Value = BinOp> {
    prop_oneof![
        Just(BinOp::Add),
        Just(BinOp::Sub),
        Just(BinOp::Mul),
        Just(BinOp::BitAnd),
        Just(BinOp::BitOr),
        Just(BinOp::BitXor),
    ]
}

fn comparison_op_strategy() -> impl Strategy<Value = BinOp> {
    prop_oneof![
        Just(BinOp::Eq),
        Just(BinOp::Ne),
        Just(BinOp::Lt),
        Just(BinOp::Le),
        Just(BinOp::Gt),
        Just(BinOp::Ge),
    ]
}

/// Integer-valued tree (recursive with depth limit)
fn int_expr_strategy(depth: u32) -> BoxedStrategy<Node> {
    if depth == 0 {
        return leaf_strategy();
    }
    let sub = || int_expr_strategy(depth - 1);
    prop_oneof![
        leaf_strategy(),
        (arithmetic_op_strategy(), sub(), sub())
            .prop_map(|(op, left, right)| Node::binary(op, left, right)),
        // divisors that can neither be zero nor -1
        (sub(), 2i32..=9, any::<bool>()).prop_map(|(left, d, rem)| {
            let op = if rem { BinOp::Rem } else { BinOp::Div };
            Node::binary(op, left, int(d))
        }),
        (sub(), 0i32..=5, any::<bool>()).prop_map(|(left, n, right_shift)| {
            let op = if right_shift { BinOp::Shr } else { BinOp::Shl };
            Node::binary(op, left, int(n))
        }),
        sub().prop_map(|e| Node::unary(UnOp::Neg, e)),
        sub().prop_map(|e| Node::unary(UnOp::BitNot, e)),
        (bool_expr_strategy(depth - 1), sub(), sub())
            .prop_map(|(cond, a, b)| Node::conditional(cond, a, b)),
    ]
    .boxed()
}

/// Boolean-valued tree (recursive with depth limit)
fn bool_expr_strategy(depth: u32) -> BoxedStrategy<Node> {
    let comparison = (
        comparison_op_strategy(),
        int_expr_strategy(depth.saturating_sub(1)),
        int_expr_strategy(depth.saturating_sub(1)),
    )
        .prop_map(|(op, left, right)| Node::binary(op, left, right));
    if depth == 0 {
        return comparison.boxed();
    }
    let sub = || bool_expr_strategy(depth - 1);
    prop_oneof![
        comparison,
        (sub(), sub(), any::<bool>()).prop_map(|(left, right, and)| {
            let op = if and { BinOp::And } else { BinOp::Or };
            Node::binary(op, left, right)
        }),
        sub().prop_map(Node::not),
        (sub(), any::<bool>()).prop_map(|(e, b)| Node::binary(BinOp::And, e, Node::bool(b))),
    ]
    .boxed()
}

/// `x == k1 || x == k2 || ...` over a small key set
fn equality_chain_strategy() -> impl Strategy<Value = Node> {
    prop::collection::vec(-4i32..40, 3..7).prop_map(|keys| {
        keys.into_iter()
            .map(|k| Node::binary(BinOp::Eq, Node::var("x", Type::I32), int(k)))
            .reduce(|acc, term| Node::binary(BinOp::Or, acc, term))
            .unwrap_or_else(|| Node::bool(false))
    })
}

// -- Mixed-Width Strategies --

/// Variables of the mixed family: `n: u8`, `a: i32`, `u: u32`, `w: i64`
fn mixed_leaf_strategy() -> BoxedStrategy<Node> {
    prop_oneof![
        Just(Node::var("n", Type::U8)),
        Just(Node::var("a", Type::I32)),
        Just(Node::var("u", Type::U32)),
        Just(Node::var("w", Type::I64)),
        (-8i32..=8).prop_map(int),
        prop_oneof![Just(0u32), Just(1), Just(7), Just(u32::MAX)]
            .prop_map(|n| Node::literal(Value::U32(n))),
        prop_oneof![Just(-1i64), Just(0), Just(3), Just(i64::MAX)]
            .prop_map(|n| Node::literal(Value::I64(n))),
        (0u8..=255).prop_map(|n| Node::literal(Value::U8(n))),
    ]
    .boxed()
}

fn divisor_strategy() -> impl Strategy<Value = Node> {
    prop_oneof![
        Just(int(-1)),
        (2i32..=9).prop_map(int),
        Just(Node::literal(Value::I64(-1))),
        Just(Node::literal(Value::I64(4))),
        Just(Node::literal(Value::U32(3))),
    ]
}

fn mixed_expr_strategy(depth: u32) -> BoxedStrategy<Node> {
    if depth == 0 {
        return mixed_leaf_strategy();
    }
    let sub = || mixed_expr_strategy(depth - 1);
    prop_oneof![
        mixed_leaf_strategy(),
        (arithmetic_op_strategy(), sub(), sub())
            .prop_map(|(op, left, right)| Node::binary(op, left, right)),
        (sub(), divisor_strategy(), any::<bool>()).prop_map(|(left, d, rem)| {
            let op = if rem { BinOp::Rem } else { BinOp::Div };
            Node::binary(op, left, d)
        }),
        (sub(), 0i32..=5, any::<bool>()).prop_map(|(left, n, right_shift)| {
            let op = if right_shift { BinOp::Shr } else { BinOp::Shl };
            Node::binary(op, left, int(n))
        }),
        sub().prop_map(|e| Node::unary(UnOp::Neg, e)),
        sub().prop_map(|e| Node::unary(UnOp::BitNot, e)),
        (mixed_bool_strategy(depth - 1), sub(), sub())
            .prop_map(|(cond, a, b)| Node::conditional(cond, a, b)),
    ]
    .boxed()
}

fn mixed_bool_strategy(depth: u32) -> BoxedStrategy<Node> {
    let comparison = (
        comparison_op_strategy(),
        mixed_expr_strategy(depth.saturating_sub(1)),
        mixed_expr_strategy(depth.saturating_sub(1)),
    )
        .prop_map(|(op, left, right)| Node::binary(op, left, right));
    if depth == 0 {
        return comparison.boxed();
    }
    let sub = || mixed_bool_strategy(depth - 1);
    prop_oneof![
        comparison,
        (sub(), sub(), any::<bool>()).prop_map(|(left, right, and)| {
            let op = if and { BinOp::And } else { BinOp::Or };
            Node::binary(op, left, right)
        }),
        sub().prop_map(Node::not),
    ]
    .boxed()
}

/// One binding of the mixed family's variables
#[derive(Debug, Clone, Copy)]
struct MixedSample {
    n: u8,
    a: i32,
    u: u32,
    w: i64,
}

fn mixed_sample_strategy() -> impl Strategy<Value = MixedSample> {
    (
        any::<u8>(),
        sample_strategy(),
        prop_oneof![0u32..=20, any::<u32>(), Just(u32::MAX)],
        prop_oneof![-20i64..=20, any::<i64>(), Just(i64::MIN), Just(i64::MAX)],
    )
        .prop_map(|(n, a, u, w)| MixedSample { n, a, u, w })
}

fn mixed_unknowns() -> Environment {
    Environment::new()
        .with_unknown("n", Type::U8)
        .with_unknown("a", Type::I32)
        .with_unknown("u", Type::U32)
        .with_unknown("w", Type::I64)
}

fn mixed_bound(sample: MixedSample) -> Environment {
    Environment::new()
        .with_value("n", Value::U8(sample.n))
        .with_value("a", Value::I32(sample.a))
        .with_value("u", Value::U32(sample.u))
        .with_value("w", Value::I64(sample.w))
}

fn check_mixed_sound(tree: &Node, samples: &[MixedSample]) -> Result<(), TestCaseError> {
    let optimized = optimize_to_fixpoint(tree, &mixed_unknowns());
    for &sample in samples {
        let env = mixed_bound(sample);
        prop_assert_eq!(
            evaluate(tree, &env),
            evaluate(&optimized, &env),
            "{:?}: {} => {}",
            sample,
            tree,
            optimized
        );
    }
    Ok(())
}

fn sample_strategy() -> impl Strategy<Value = i32> {
    prop_oneof![
        -20i32..=20,
        any::<i32>(),
        Just(i32::MIN),
        Just(i32::MAX),
    ]
}

fn unknowns() -> Environment {
    Environment::new()
        .with_unknown("x", Type::I32)
        .with_unknown("y", Type::I32)
}

fn bound(x: i32, y: i32) -> Environment {
    Environment::new()
        .with_value("x", Value::I32(x))
        .with_value("y", Value::I32(y))
}

fn check_sound(tree: &Node, samples: &[(i32, i32)]) -> Result<(), TestCaseError> {
    let optimized = optimize_to_fixpoint(tree, &unknowns());
    for &(x, y) in samples {
        let env = bound(x, y);
        prop_assert_eq!(
            evaluate(tree, &env),
            evaluate(&optimized, &env),
            "x = {}, y = {}: {} => {}",
            x,
            y,
            tree,
            optimized
        );
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_int_rewrites_are_sound(
        tree in int_expr_strategy(3),
        samples in prop::collection::vec((sample_strategy(), sample_strategy()), 8),
    ) {
        check_sound(&tree, &samples)?;
    }

    #[test]
    fn prop_bool_rewrites_are_sound(
        tree in bool_expr_strategy(2),
        samples in prop::collection::vec((sample_strategy(), sample_strategy()), 8),
    ) {
        check_sound(&tree, &samples)?;
    }

    #[test]
    fn prop_equality_chains_are_sound(
        tree in equality_chain_strategy(),
        samples in prop::collection::vec((-10i32..50, Just(0)), 16),
    ) {
        check_sound(&tree, &samples)?;
    }

    #[test]
    fn prop_fixpoint_is_idempotent(tree in int_expr_strategy(3)) {
        let env = unknowns();
        let once = optimize_to_fixpoint(&tree, &env);
        let twice = optimize_to_fixpoint(&once, &env);
        prop_assert_eq!(&once, &twice, "{} => {}", tree, once);
    }

    #[test]
    fn prop_mixed_width_rewrites_are_sound(
        tree in mixed_expr_strategy(3),
        samples in prop::collection::vec(mixed_sample_strategy(), 8),
    ) {
        check_mixed_sound(&tree, &samples)?;
    }

    #[test]
    fn prop_mixed_width_conditions_are_sound(
        tree in mixed_bool_strategy(2),
        samples in prop::collection::vec(mixed_sample_strategy(), 8),
    ) {
        check_mixed_sound(&tree, &samples)?;
    }

    #[test]
    fn prop_mixed_width_fixpoint_is_idempotent(tree in mixed_expr_strategy(3)) {
        let env = mixed_unknowns();
        let once = optimize_to_fixpoint(&tree, &env);
        let twice = optimize_to_fixpoint(&once, &env);
        prop_assert_eq!(&once, &twice, "{} => {}", tree, once);
    }

    #[test]
    fn prop_bool_fixpoint_is_idempotent(tree in bool_expr_strategy(2)) {
        let env = unknowns();
        let once = optimize_to_fixpoint(&tree, &env);
        let twice = optimize_to_fixpoint(&once, &env);
        prop_assert_eq!(&once, &twice, "{} => {}", tree, once);
    }
}
