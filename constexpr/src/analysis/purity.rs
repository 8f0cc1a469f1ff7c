//! Purity and read/write sets
//!
//! A pure expression has no side effects and cannot trap, so it may be
//! duplicated, dropped or reordered freely.

use std::collections::HashSet;

use crate::ast::{BinOp, Expr, Node};

/// Side-effect free and trap free
pub fn is_pure(node: &Node) -> bool {
    match &node.node {
        Expr::Literal(_) | Expr::Var(_) => true,
        Expr::Unary { op, operand } => !op.is_mutating() && is_pure(operand),
        Expr::Binary { op, left, right } => {
            if matches!(op, BinOp::Div | BinOp::Rem) && !safe_divisor(right) {
                return false;
            }
            is_pure(left) && is_pure(right)
        }
        Expr::Conditional {
            cond,
            then_branch,
            else_branch,
        } => is_pure(cond) && is_pure(then_branch) && is_pure(else_branch),
        Expr::Cast { expr, .. } => is_pure(expr),
        Expr::Member { receiver, .. } => is_pure(receiver),
        Expr::Is { operand, .. } => is_pure(operand),
        Expr::Tuple(items) | Expr::Collection(items) => items.iter().all(is_pure),
        // Host calls and element access may throw or have effects
        Expr::Call { .. } | Expr::Index { .. } => false,
        _ => false,
    }
}

/// A literal divisor that can neither be zero nor trigger `MIN / -1`
fn safe_divisor(node: &Node) -> bool {
    match node.as_literal() {
        Some(v) if v.is_float() => true,
        Some(v) if v.is_integral() => !v.is_zero() && !(v.ty().is_signed() && v.is_minus_one()),
        _ => false,
    }
}

/// Contains any assignment, declaration, increment or call
pub fn has_writes(node: &Node) -> bool {
    match &node.node {
        Expr::Assign { .. } | Expr::Declare { .. } | Expr::Call { .. } => true,
        Expr::Unary { op, .. } if op.is_mutating() => true,
        _ => node.children().into_iter().any(has_writes),
    }
}

/// Names written anywhere inside `node`
pub fn assigned_variables(node: &Node) -> HashSet<String> {
    let mut names = HashSet::new();
    collect_writes(node, &mut names);
    names
}

fn collect_writes(node: &Node, names: &mut HashSet<String>) {
    match &node.node {
        Expr::Assign { target, .. } => {
            names.insert(target.clone());
        }
        Expr::Unary { op, operand } if op.is_mutating() => {
            if let Some(name) = operand.as_var() {
                names.insert(name.to_string());
            }
        }
        Expr::ForEach { var, .. } => {
            names.insert(var.clone());
        }
        _ => {}
    }
    for child in node.children() {
        collect_writes(child, names);
    }
}

/// Names read anywhere inside `node`
pub fn read_variables(node: &Node) -> HashSet<String> {
    let mut names = HashSet::new();
    collect_reads(node, &mut names);
    names
}

fn collect_reads(node: &Node, names: &mut HashSet<String>) {
    match &node.node {
        Expr::Var(name) => {
            names.insert(name.clone());
        }
        Expr::Assign {
            target,
            op: Some(_),
            ..
        } => {
            names.insert(target.clone());
        }
        _ => {}
    }
    for child in node.children() {
        collect_reads(child, names);
    }
}
