//! Result type of an expression

use crate::ast::{Expr, Node, Type};
use crate::interp::{Environment, numeric};

/// Resolved type if the node carries one, otherwise derived from its parts
pub fn infer_type(node: &Node, env: &Environment) -> Option<Type> {
    if let Some(ty) = &node.ty {
        return Some(ty.clone());
    }
    match &node.node {
        Expr::Literal(value) => Some(value.ty()),
        Expr::Var(name) => env.lookup(name).map(|item| item.ty.clone()),
        Expr::Binary { op, left, right } => {
            if op.is_comparison() || op.is_logical() {
                return Some(Type::Bool);
            }
            let l = infer_type(left, env)?;
            let r = infer_type(right, env)?;
            numeric::binary_result_type(*op, &l, &r)
        }
        Expr::Unary { op, operand } => numeric::unary_result_type(*op, &infer_type(operand, env)?),
        Expr::Conditional {
            then_branch,
            else_branch,
            ..
        } => conditional_type(then_branch, else_branch, env),
        Expr::Cast { ty, .. } => Some(ty.clone()),
        Expr::Is { .. } => Some(Type::Bool),
        Expr::Assign { target, .. } => env.lookup(target).map(|item| item.ty.clone()),
        _ => None,
    }
}

/// Type of `c ? a : b` from its arms. Numeric arms of different types
/// meet in their promoted type; an arm of unknown type defers to the other.
pub fn conditional_type(then_branch: &Node, else_branch: &Node, env: &Environment) -> Option<Type> {
    match (infer_type(then_branch, env), infer_type(else_branch, env)) {
        (Some(a), Some(b)) => numeric::conditional_type(&a, &b).or(Some(a)),
        (a, b) => a.or(b),
    }
}
