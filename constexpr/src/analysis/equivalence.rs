//! Conservative expression equivalence

use crate::ast::Node;
use crate::interp::Environment;

/// Two expressions always produce the same value: they are structurally
/// identical, or they are variables bound to the same known value.
///
/// A `false` answer means "not proven", never "different".
pub fn equivalent(a: &Node, b: &Node, env: &Environment) -> bool {
    if a == b {
        return true;
    }
    match (a.as_var(), b.as_var()) {
        (Some(x), Some(y)) => match (env.value(x), env.value(y)) {
            (Some(vx), Some(vy)) => vx == vy,
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Type};
    use crate::interp::Value;

    #[test]
    fn test_structural_identity() {
        let env = Environment::new();
        let a = Node::binary(BinOp::Add, Node::var("x", Type::I32), Node::literal(Value::I32(1)));
        assert!(equivalent(&a, &a.clone(), &env));
        let b = Node::binary(BinOp::Add, Node::literal(Value::I32(1)), Node::var("x", Type::I32));
        assert!(!equivalent(&a, &b, &env));
    }

    #[test]
    fn test_variables_with_equal_known_values() {
        let env = Environment::new()
            .with_value("a", Value::I32(3))
            .with_value("b", Value::I32(3))
            .with_value("c", Value::I64(3))
            .with_unknown("d", Type::I32);
        let var = |n: &str| Node::untyped_var(n);
        assert!(equivalent(&var("a"), &var("b"), &env));
        assert!(!equivalent(&var("a"), &var("c"), &env));
        assert!(!equivalent(&var("a"), &var("d"), &env));
        assert!(equivalent(&var("d"), &var("d"), &env));
    }

    #[test]
    fn test_signed_zeros_are_distinct() {
        let env = Environment::new();
        let pos = Node::literal(Value::F64(0.0));
        let neg = Node::literal(Value::F64(-0.0));
        assert!(!equivalent(&pos, &neg, &env));
    }
}
