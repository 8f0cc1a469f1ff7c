//! Rules for `!x`, `-x` and `~x`

use crate::ast::{BinOp, Node, UnOp};

use super::context::Scope;

type UnaryRule = fn(&Scope<'_>, UnOp, &Node) -> Option<Node>;

static RULES: &[(&str, UnaryRule)] = &[
    ("unary_double_not", double_not),
    ("unary_not_comparison", not_comparison),
    ("unary_not_de_morgan", not_de_morgan),
    ("unary_double_negation", double_negation),
    ("unary_double_complement", double_complement),
    ("unary_negated_difference", negated_difference),
];

/// First rule that rewrites `op operand`
pub fn optimize(scope: &Scope<'_>, op: UnOp, operand: &Node) -> Option<(&'static str, Node)> {
    RULES.iter().find_map(|(name, rule)| {
        let node = rule(scope, op, operand)?;
        tracing::trace!(rule = name, op = %op, "rule fired");
        Some((*name, node))
    })
}

/// `!!x => x`
fn double_not(_: &Scope<'_>, op: UnOp, operand: &Node) -> Option<Node> {
    if op != UnOp::Not {
        return None;
    }
    operand.as_not().cloned()
}

/// `!(a < b) => a >= b`; ordering comparisons on floats only under
/// fast-math since NaN makes both `a < b` and `a >= b` false
fn not_comparison(scope: &Scope<'_>, op: UnOp, operand: &Node) -> Option<Node> {
    if op != UnOp::Not {
        return None;
    }
    inverted_comparison(scope, operand)
}

fn inverted_comparison(scope: &Scope<'_>, node: &Node) -> Option<Node> {
    let (cmp, a, b) = node.as_binary()?;
    let negated = cmp.negated()?;
    if !cmp.is_equality() {
        let floating = [a, b]
            .iter()
            .any(|n| scope.type_of(n).is_none_or(|t| t.is_float()));
        if floating && !scope.fast_math() {
            return None;
        }
    }
    Some(Node::binary(negated, a.clone(), b.clone()))
}

/// Negation of a condition without a new `!`, when one exists
fn cheap_negation(scope: &Scope<'_>, node: &Node) -> Option<Node> {
    if let Some(b) = node.as_literal().and_then(|v| v.as_bool()) {
        return Some(Node::bool(!b));
    }
    if let Some(inner) = node.as_not() {
        return Some(inner.clone());
    }
    inverted_comparison(scope, node)
}

/// `!(a && b) => !a || !b` when that removes at least one `!`
fn not_de_morgan(scope: &Scope<'_>, op: UnOp, operand: &Node) -> Option<Node> {
    if op != UnOp::Not {
        return None;
    }
    let (logical, a, b) = operand.as_binary()?;
    let flipped = match logical {
        BinOp::And => BinOp::Or,
        BinOp::Or => BinOp::And,
        _ => return None,
    };
    let na = cheap_negation(scope, a);
    let nb = cheap_negation(scope, b);
    if na.is_none() && nb.is_none() {
        return None;
    }
    let na = na.unwrap_or_else(|| Node::not(a.clone()));
    let nb = nb.unwrap_or_else(|| Node::not(b.clone()));
    Some(Node::binary(flipped, na, nb))
}

/// The inner node has the outer node's type, so dropping both operators
/// keeps the width
fn keeps_type(scope: &Scope<'_>, op: UnOp, inner: &Node, operand: &Node) -> bool {
    let outer = scope
        .type_of(operand)
        .and_then(|t| crate::interp::numeric::unary_result_type(op, &t));
    outer.is_some() && outer == scope.type_of(inner)
}

/// `-(-x) => x`
fn double_negation(scope: &Scope<'_>, op: UnOp, operand: &Node) -> Option<Node> {
    if op != UnOp::Neg {
        return None;
    }
    match operand.as_unary() {
        Some((UnOp::Neg, inner)) if keeps_type(scope, op, inner, operand) => Some(inner.clone()),
        _ => None,
    }
}

/// `~~x => x`
fn double_complement(scope: &Scope<'_>, op: UnOp, operand: &Node) -> Option<Node> {
    if op != UnOp::BitNot {
        return None;
    }
    match operand.as_unary() {
        Some((UnOp::BitNot, inner)) if keeps_type(scope, op, inner, operand) => {
            Some(inner.clone())
        }
        _ => None,
    }
}

/// `-(x - y) => y - x`; evaluates `y` first, so both sides must be pure.
/// For floats `x == y` gives `-0.0` against `+0.0`, hence fast-math only.
fn negated_difference(scope: &Scope<'_>, op: UnOp, operand: &Node) -> Option<Node> {
    if op != UnOp::Neg {
        return None;
    }
    let (BinOp::Sub, x, y) = operand.as_binary()? else {
        return None;
    };
    if !scope.is_pure(x) || !scope.is_pure(y) {
        return None;
    }
    let ty = scope.type_of(operand)?;
    let exact = ty.is_integral() || (ty.is_float() && scope.fast_math());
    // -(x - y) computes in the promoted type of the difference
    let same_width = crate::interp::numeric::unary_result_type(op, &ty) == Some(ty.clone());
    (exact && same_width).then(|| Node::binary(BinOp::Sub, y.clone(), x.clone()))
}
