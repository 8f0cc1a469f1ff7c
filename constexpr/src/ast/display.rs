//! C-family rendering of trees
//!
//! Literals carry suffixes so the rendered text keeps its type:
//! `5` is i32, `5L` i64, `5U` u32, `5UL` u64, `1.5F` f32, `1.5` f64.
//! Narrow integers render as casts, e.g. `(u8)5`.

use std::fmt::{self, Display, Formatter};

use super::{BinOp, Callee, Expr, Node, Pattern, UnOp};
use crate::interp::Value;

const PREC_ASSIGN: u8 = 0;
const PREC_CONDITIONAL: u8 = 1;
const PREC_RELATIONAL: u8 = 8;
const PREC_PREFIX: u8 = 12;
const PREC_POSTFIX: u8 = 13;

fn precedence(node: &Node) -> u8 {
    match &node.node {
        Expr::Assign { .. } => PREC_ASSIGN,
        Expr::Conditional { .. } => PREC_CONDITIONAL,
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Is { .. } => PREC_RELATIONAL,
        Expr::Unary { op, .. } if op.is_postfix() => PREC_POSTFIX,
        Expr::Unary { .. } | Expr::Cast { .. } => PREC_PREFIX,
        Expr::Literal(v) if literal_is_prefixed(v) => PREC_PREFIX,
        _ => PREC_POSTFIX,
    }
}

/// Literals rendered with a leading sign or cast bind like prefix operators
fn literal_is_prefixed(value: &Value) -> bool {
    match value {
        Value::I8(_) | Value::I16(_) | Value::U8(_) | Value::U16(_) => true,
        Value::F32(f) => f.is_sign_negative(),
        Value::F64(f) => f.is_sign_negative(),
        other => other.as_i128().is_some_and(|n| n < 0),
    }
}

/// Parenthesise operands of bitwise, shift and logical operators whenever
/// they are a different binary operator, even where precedence would allow
/// omitting them.
fn needs_parens(child: &Node, parent: BinOp, is_right: bool) -> bool {
    let child_prec = precedence(child);
    let parent_prec = parent.precedence();
    if child_prec < parent_prec || (is_right && child_prec == parent_prec) {
        return true;
    }
    match child.as_binary() {
        Some((child_op, _, _)) => {
            let grouped = parent.is_bitwise() || parent.is_shift() || parent.is_logical();
            grouped && child_op != parent
        }
        None => false,
    }
}

struct Operand<'a>(&'a Node, bool);

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.1 {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn write_literal(f: &mut Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::I64(n) => write!(f, "{n}L"),
        Value::U32(n) => write!(f, "{n}U"),
        Value::U64(n) => write!(f, "{n}UL"),
        Value::I8(n) => write!(f, "(i8){n}"),
        Value::I16(n) => write!(f, "(i16){n}"),
        Value::U8(n) => write!(f, "(u8){n}"),
        Value::U16(n) => write!(f, "(u16){n}"),
        Value::F32(x) if x.is_nan() => write!(f, "f32::NAN"),
        Value::F32(x) if x.is_infinite() => {
            write!(f, "{}f32::INFINITY", if *x < 0.0 { "-" } else { "" })
        }
        Value::F32(x) => write!(f, "{x:?}F"),
        Value::F64(x) if x.is_nan() => write!(f, "f64::NAN"),
        Value::F64(x) if x.is_infinite() => {
            write!(f, "{}f64::INFINITY", if *x < 0.0 { "-" } else { "" })
        }
        Value::Array(items) => {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_literal(f, item)?;
            }
            write!(f, "]")
        }
        other => write!(f, "{other}"),
    }
}

fn write_list(f: &mut Formatter<'_>, items: &[Node]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Statements that end in a block do not take a trailing semicolon
fn write_stmt(f: &mut Formatter<'_>, stmt: &Node) -> fmt::Result {
    match &stmt.node {
        Expr::Block(_)
        | Expr::If { .. }
        | Expr::While { .. }
        | Expr::For { .. }
        | Expr::ForEach { .. } => write!(f, "{stmt}"),
        _ => write!(f, "{stmt};"),
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Constant(v) => write_literal(f, v),
            Pattern::Relational { op, value } => {
                write!(f, "{op} ")?;
                write_literal(f, value)
            }
            Pattern::Not(inner) => match inner.as_ref() {
                Pattern::And(..) | Pattern::Or(..) => write!(f, "not ({inner})"),
                _ => write!(f, "not {inner}"),
            },
            Pattern::And(a, b) => {
                for (i, p) in [a, b].into_iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    match p.as_ref() {
                        Pattern::Or(..) => write!(f, "({p})")?,
                        _ => write!(f, "{p}")?,
                    }
                }
                Ok(())
            }
            Pattern::Or(a, b) => write!(f, "{a} or {b}"),
            Pattern::Discard => write!(f, "_"),
        }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.node {
            Expr::Literal(v) => write_literal(f, v),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Binary { op, left, right } => write!(
                f,
                "{} {op} {}",
                Operand(left, needs_parens(left, *op, false)),
                Operand(right, needs_parens(right, *op, true)),
            ),
            Expr::Unary { op, operand } => {
                if op.is_postfix() {
                    let wrap = precedence(operand) < PREC_POSTFIX;
                    write!(f, "{}{op}", Operand(operand, wrap))
                } else {
                    // `-(-x)` must not render as the decrement `--x`
                    let doubled = match (&operand.node, op) {
                        (Expr::Unary { op: inner, .. }, _) => {
                            inner == op
                                || matches!(
                                    (op, inner),
                                    (UnOp::Neg, UnOp::PreDecrement)
                                        | (UnOp::Neg, UnOp::PostDecrement)
                                )
                        }
                        (Expr::Literal(v), UnOp::Neg) => literal_is_prefixed(v),
                        _ => false,
                    };
                    let wrap = doubled || precedence(operand) < PREC_PREFIX;
                    write!(f, "{op}{}", Operand(operand, wrap))
                }
            }
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => write!(
                f,
                "{} ? {} : {}",
                Operand(cond, precedence(cond) <= PREC_CONDITIONAL),
                then_branch,
                Operand(else_branch, precedence(else_branch) < PREC_CONDITIONAL),
            ),
            Expr::Cast { ty, expr } => {
                write!(f, "({ty}){}", Operand(expr, precedence(expr) < PREC_POSTFIX))
            }
            Expr::Call { callee, args } => {
                match callee {
                    Callee::Function(name) => write!(f, "{name}(")?,
                    Callee::Static { ty, method } => write!(f, "{ty}::{method}(")?,
                    Callee::Method { receiver, method } => write!(
                        f,
                        "{}.{method}(",
                        Operand(receiver, precedence(receiver) < PREC_POSTFIX)
                    )?,
                }
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Member { receiver, name } => write!(
                f,
                "{}.{name}",
                Operand(receiver, precedence(receiver) < PREC_POSTFIX)
            ),
            Expr::Index { base, index } => write!(
                f,
                "{}[{index}]",
                Operand(base, precedence(base) < PREC_POSTFIX)
            ),
            Expr::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            Expr::Collection(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expr::Is { operand, pattern } => write!(
                f,
                "{} is {pattern}",
                Operand(operand, precedence(operand) <= PREC_RELATIONAL)
            ),
            Expr::Block(stmts) => {
                write!(f, "{{")?;
                for stmt in stmts {
                    write!(f, " ")?;
                    write_stmt(f, stmt)?;
                }
                write!(f, " }}")
            }
            Expr::Declare { name, ty, init } => match init {
                Some(init) => write!(f, "let {name}: {ty} = {init}"),
                None => write!(f, "let {name}: {ty}"),
            },
            Expr::Assign { target, op, value } => match op {
                Some(op) => write!(f, "{target} {op}= {value}"),
                None => write!(f, "{target} = {value}"),
            },
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                write!(f, "if ({cond}) ")?;
                write_stmt(f, then_branch)?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else ")?;
                    write_stmt(f, else_branch)?;
                }
                Ok(())
            }
            Expr::While { cond, body } => {
                write!(f, "while ({cond}) ")?;
                write_stmt(f, body)
            }
            Expr::DoWhile { body, cond } => {
                write!(f, "do ")?;
                write_stmt(f, body)?;
                write!(f, " while ({cond})")
            }
            Expr::For {
                init,
                cond,
                step,
                body,
            } => {
                write!(f, "for (")?;
                write_list(f, init)?;
                write!(f, ";")?;
                if let Some(cond) = cond {
                    write!(f, " {cond}")?;
                }
                write!(f, ";")?;
                if !step.is_empty() {
                    write!(f, " ")?;
                    write_list(f, step)?;
                }
                write!(f, ") ")?;
                write_stmt(f, body)
            }
            Expr::ForEach {
                var,
                iterable,
                body,
            } => {
                write!(f, "foreach ({var} in {iterable}) ")?;
                write_stmt(f, body)
            }
            Expr::Return(Some(value)) => write!(f, "return {value}"),
            Expr::Return(None) => write!(f, "return"),
            Expr::Break => write!(f, "break"),
            Expr::Continue => write!(f, "continue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Type;

    fn x() -> Node {
        Node::var("x", Type::I32)
    }

    fn int(n: i32) -> Node {
        Node::literal(Value::I32(n))
    }

    #[test]
    fn test_literal_suffixes() {
        assert_eq!(Node::literal(Value::I64(5)).to_string(), "5L");
        assert_eq!(Node::literal(Value::U32(19)).to_string(), "19U");
        assert_eq!(Node::literal(Value::U64(1)).to_string(), "1UL");
        assert_eq!(Node::literal(Value::F32(1.5)).to_string(), "1.5F");
        assert_eq!(Node::literal(Value::F64(2.0)).to_string(), "2.0");
        assert_eq!(Node::literal(Value::U8(7)).to_string(), "(u8)7");
        assert_eq!(Node::literal(Value::Char('\n')).to_string(), "'\\n'");
        assert_eq!(Node::literal(Value::Str("a\"b".into())).to_string(), "\"a\\\"b\"");
    }

    #[test]
    fn test_precedence_parens() {
        let sum = Node::binary(BinOp::Add, x(), int(1));
        let prod = Node::binary(BinOp::Mul, sum.clone(), int(2));
        assert_eq!(prod.to_string(), "(x + 1) * 2");
        let diff = Node::binary(BinOp::Sub, int(1), Node::binary(BinOp::Sub, x(), int(2)));
        assert_eq!(diff.to_string(), "1 - (x - 2)");
    }

    #[test]
    fn test_bitwise_operands_grouped() {
        let masked = Node::binary(BinOp::BitAnd, x(), int(1));
        let eq = Node::binary(BinOp::Eq, masked, int(0));
        assert_eq!(eq.to_string(), "(x & 1) == 0");
        let shifted = Node::binary(
            BinOp::Shr,
            Node::literal(Value::U32(9)),
            Node::binary(BinOp::Sub, x(), int(1)),
        );
        assert_eq!(shifted.to_string(), "9U >> (x - 1)");
    }

    #[test]
    fn test_cast_and_unary() {
        let cast = Node::cast(Type::U32, Node::binary(BinOp::Sub, x(), int(1)));
        assert_eq!(cast.to_string(), "(u32)(x - 1)");
        let neg = Node::unary(UnOp::Neg, Node::unary(UnOp::Neg, x()));
        assert_eq!(neg.to_string(), "-(-x)");
        let not_cmp = Node::not(Node::binary(BinOp::Lt, x(), int(3)));
        assert_eq!(not_cmp.to_string(), "!(x < 3)");
    }

    #[test]
    fn test_statements() {
        let body = Node::block(vec![
            Node::declare("s", Type::I32, Some(int(0))),
            Node::compound_assign("s", BinOp::Add, x()),
            Node::ret(Some(Node::untyped_var("s"))),
        ]);
        assert_eq!(body.to_string(), "{ let s: i32 = 0; s += x; return s; }");
    }

    #[test]
    fn test_pattern_rendering() {
        let pattern = Pattern::Or(
            Box::new(Pattern::Constant(Value::I32(1))),
            Box::new(Pattern::Relational {
                op: BinOp::Gt,
                value: Value::I32(10),
            }),
        );
        assert_eq!(Node::is_pattern(x(), pattern).to_string(), "x is 1 or > 10");
    }
}
