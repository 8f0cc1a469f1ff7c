//! Rules for `cond ? a : b`

use crate::analysis;
use crate::ast::{BinOp, Node, Type};

use super::context::{Scope, convert};

type ConditionalRule = fn(&Scope<'_>, &Node, &Node, &Node) -> Option<Node>;

static RULES: &[(&str, ConditionalRule)] = &[
    ("conditional_known_condition", known_condition),
    ("conditional_negated_condition", negated_condition),
    ("conditional_equal_branches", equal_branches),
    ("conditional_bool_branches", bool_branches),
    ("conditional_bool_branch_to_logical", bool_branch_to_logical),
    ("conditional_min_max", min_max),
];

/// First rule that rewrites `cond ? then_branch : else_branch`
pub fn optimize(
    scope: &Scope<'_>,
    cond: &Node,
    then_branch: &Node,
    else_branch: &Node,
) -> Option<(&'static str, Node)> {
    RULES.iter().find_map(|(name, rule)| {
        let node = rule(scope, cond, then_branch, else_branch)?;
        tracing::trace!(rule = name, "rule fired");
        Some((*name, node))
    })
}

fn bool_literal(node: &Node) -> Option<bool> {
    node.as_literal().and_then(|v| v.as_bool())
}

/// One arm standing in for the whole conditional, converted to the type
/// both arms meet in
fn arm(scope: &Scope<'_>, taken: &Node, a: &Node, b: &Node) -> Node {
    let ty = analysis::conditional_type(a, b, scope.env);
    convert(taken.clone(), ty.as_ref(), scope.env)
}

/// `true ? a : b => a`, also for conditions the facts decide
fn known_condition(scope: &Scope<'_>, cond: &Node, a: &Node, b: &Node) -> Option<Node> {
    let taken = match bool_literal(cond) {
        Some(value) => value,
        None => scope.ranges().decide_condition(cond)?,
    };
    Some(arm(scope, if taken { a } else { b }, a, b))
}

/// `!c ? a : b => c ? b : a`
fn negated_condition(_: &Scope<'_>, cond: &Node, a: &Node, b: &Node) -> Option<Node> {
    let inner = cond.as_not()?;
    Some(Node::conditional(inner.clone(), b.clone(), a.clone()))
}

/// `c ? a : a => a`
fn equal_branches(scope: &Scope<'_>, cond: &Node, a: &Node, b: &Node) -> Option<Node> {
    (scope.is_pure(cond) && scope.same_value(a, b)).then(|| arm(scope, a, a, b))
}

/// `c ? true : false => c`, `c ? false : true => !c`
fn bool_branches(_: &Scope<'_>, cond: &Node, a: &Node, b: &Node) -> Option<Node> {
    match (bool_literal(a)?, bool_literal(b)?) {
        (true, false) => Some(cond.clone()),
        (false, true) => Some(Node::not(cond.clone())),
        _ => None,
    }
}

/// One branch is a boolean literal: `c ? true : b => c || b`,
/// `c ? a : false => c && a` and the negated forms
fn bool_branch_to_logical(scope: &Scope<'_>, cond: &Node, a: &Node, b: &Node) -> Option<Node> {
    let is_bool = |n: &Node| scope.type_of(n) == Some(Type::Bool);
    if !is_bool(a) || !is_bool(b) {
        return None;
    }
    if let Some(value) = bool_literal(a) {
        return Some(if value {
            Node::binary(BinOp::Or, cond.clone(), b.clone())
        } else {
            Node::binary(BinOp::And, Node::not(cond.clone()), b.clone())
        });
    }
    let value = bool_literal(b)?;
    Some(if value {
        Node::binary(BinOp::Or, Node::not(cond.clone()), a.clone())
    } else {
        Node::binary(BinOp::And, cond.clone(), a.clone())
    })
}

/// `x < y ? x : y => T::min(x, y)` and the other orderings.
///
/// Floats only under fast-math: `min` orders `-0.0` below `+0.0` and
/// propagates NaN where the comparison does neither.
fn min_max(scope: &Scope<'_>, cond: &Node, a: &Node, b: &Node) -> Option<Node> {
    let (op, x, y) = cond.as_binary()?;
    let less = match op {
        BinOp::Lt | BinOp::Le => true,
        BinOp::Gt | BinOp::Ge => false,
        _ => return None,
    };
    let picks_left = if scope.same_value(a, x) && scope.same_value(b, y) {
        true
    } else if scope.same_value(a, y) && scope.same_value(b, x) {
        false
    } else {
        return None;
    };
    let ty = scope.type_of(x)?;
    if scope.type_of(y).as_ref() != Some(&ty) || !ty.is_numeric() {
        return None;
    }
    if ty.is_float() && !scope.fast_math() {
        return None;
    }
    let member = if less == picks_left { "min" } else { "max" };
    scope.capability_call(&ty, member, vec![x.clone(), y.clone()], ty.clone())
}
