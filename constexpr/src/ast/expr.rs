//! Expression and statement nodes

use serde::{Deserialize, Serialize};

use super::{Type, Typed};
use crate::interp::{Value, numeric};

/// A tree node: an expression or statement with its optional resolved type
pub type Node = Typed<Expr>;

/// Tree node kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Literal(Value),

    /// Variable reference
    Var(String),

    /// Binary operation
    Binary {
        op: BinOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Unary operation (including increments)
    Unary { op: UnOp, operand: Box<Node> },

    /// Ternary: cond ? then_branch : else_branch
    Conditional {
        cond: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Box<Node>,
    },

    /// Explicit conversion: (ty)expr
    Cast { ty: Type, expr: Box<Node> },

    /// Invocation of a host routine
    Call { callee: Callee, args: Vec<Node> },

    /// Member access: receiver.name
    Member { receiver: Box<Node>, name: String },

    /// Element access: base[index]
    Index { base: Box<Node>, index: Box<Node> },

    /// Tuple literal: (a, b, ...)
    Tuple(Vec<Node>),

    /// Collection literal: [a, b, ...]
    Collection(Vec<Node>),

    /// Pattern test: operand is pattern
    Is { operand: Box<Node>, pattern: Pattern },

    /// Statement block; its value is the value of the last statement
    Block(Vec<Node>),

    /// Local declaration: let name: ty = init
    Declare {
        name: String,
        ty: Type,
        init: Option<Box<Node>>,
    },

    /// Assignment: target = value, or compound target op= value
    Assign {
        target: String,
        op: Option<BinOp>,
        value: Box<Node>,
    },

    /// If statement
    If {
        cond: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },

    /// While loop
    While { cond: Box<Node>, body: Box<Node> },

    /// Do-while loop
    DoWhile { body: Box<Node>, cond: Box<Node> },

    /// For loop: for (init; cond; step) body
    For {
        init: Vec<Node>,
        cond: Option<Box<Node>>,
        step: Vec<Node>,
        body: Box<Node>,
    },

    /// Foreach loop: foreach (var in iterable) body
    ForEach {
        var: String,
        iterable: Box<Node>,
        body: Box<Node>,
    },

    /// Return statement
    Return(Option<Box<Node>>),

    Break,

    Continue,
}

/// Target of an invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Callee {
    /// Free function: name(args)
    Function(String),
    /// Static member of a type: ty::method(args)
    Static { ty: Type, method: String },
    /// Instance method: receiver.method(args)
    Method { receiver: Box<Node>, method: String },
}

impl Callee {
    pub fn name(&self) -> &str {
        match self {
            Callee::Function(name) => name,
            Callee::Static { method, .. } | Callee::Method { method, .. } => method,
        }
    }
}

/// Pattern of an `is` test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// Matches a value equal to the constant
    Constant(Value),
    /// Matches when `operand op value` holds
    Relational { op: BinOp, value: Value },
    Not(Box<Pattern>),
    And(Box<Pattern>, Box<Pattern>),
    Or(Box<Pattern>, Box<Pattern>),
    /// Matches anything
    Discard,
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    /// Short-circuit logical and
    And,
    /// Short-circuit logical or
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 2,
            BinOp::And => 3,
            BinOp::BitOr => 4,
            BinOp::BitXor => 5,
            BinOp::BitAnd => 6,
            BinOp::Eq | BinOp::Ne => 7,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 8,
            BinOp::Shl | BinOp::Shr => 9,
            BinOp::Add | BinOp::Sub => 10,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 11,
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }

    pub fn is_relational(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    pub fn is_comparison(self) -> bool {
        self.is_equality() || self.is_relational()
    }

    /// Operand order does not affect the result
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinOp::Add
                | BinOp::Mul
                | BinOp::BitAnd
                | BinOp::BitOr
                | BinOp::BitXor
                | BinOp::Eq
                | BinOp::Ne
        )
    }

    /// Comparison producing the logical complement: `<` becomes `>=`
    pub fn negated(self) -> Option<BinOp> {
        Some(match self {
            BinOp::Eq => BinOp::Ne,
            BinOp::Ne => BinOp::Eq,
            BinOp::Lt => BinOp::Ge,
            BinOp::Le => BinOp::Gt,
            BinOp::Gt => BinOp::Le,
            BinOp::Ge => BinOp::Lt,
            _ => return None,
        })
    }

    /// Comparison with operands exchanged: `a < b` is `b > a`
    pub fn flipped(self) -> Option<BinOp> {
        Some(match self {
            BinOp::Eq => BinOp::Eq,
            BinOp::Ne => BinOp::Ne,
            BinOp::Lt => BinOp::Gt,
            BinOp::Le => BinOp::Ge,
            BinOp::Gt => BinOp::Lt,
            BinOp::Ge => BinOp::Le,
            _ => return None,
        })
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Logical not (!)
    Not,
    /// Bitwise complement (~)
    BitNot,
    /// ++x
    PreIncrement,
    /// --x
    PreDecrement,
    /// x++
    PostIncrement,
    /// x--
    PostDecrement,
}

impl UnOp {
    /// Writes its operand
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            UnOp::PreIncrement | UnOp::PreDecrement | UnOp::PostIncrement | UnOp::PostDecrement
        )
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnOp::PostIncrement | UnOp::PostDecrement)
    }
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "!"),
            UnOp::BitNot => write!(f, "~"),
            UnOp::PreIncrement | UnOp::PostIncrement => write!(f, "++"),
            UnOp::PreDecrement | UnOp::PostDecrement => write!(f, "--"),
        }
    }
}

// ============================================================================
// Node construction
// ============================================================================

impl Node {
    /// Literal carrying the value's own type
    pub fn literal(value: Value) -> Node {
        let ty = value.ty();
        Typed::new(Expr::Literal(value), Some(ty))
    }

    pub fn bool(b: bool) -> Node {
        Node::literal(Value::Bool(b))
    }

    /// Integral literal of type `ty`, wrapped to its width
    pub fn int(ty: &Type, n: i128) -> Option<Node> {
        Value::from_i128(ty, n).map(Node::literal)
    }

    pub fn var(name: impl Into<String>, ty: Type) -> Node {
        Typed::new(Expr::Var(name.into()), Some(ty))
    }

    /// Variable reference with no resolved type
    pub fn untyped_var(name: impl Into<String>) -> Node {
        Typed::new(Expr::Var(name.into()), None)
    }

    /// Binary node typed by the promotion rules
    pub fn binary(op: BinOp, left: Node, right: Node) -> Node {
        let ty = match (&left.ty, &right.ty) {
            (Some(l), Some(r)) => numeric::binary_result_type(op, l, r),
            _ if op.is_comparison() || op.is_logical() => Some(Type::Bool),
            _ => None,
        };
        Typed::new(
            Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
        )
    }

    pub fn unary(op: UnOp, operand: Node) -> Node {
        let ty = operand
            .ty
            .as_ref()
            .and_then(|t| numeric::unary_result_type(op, t));
        Typed::new(
            Expr::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    pub fn not(operand: Node) -> Node {
        Node::unary(UnOp::Not, operand)
    }

    pub fn conditional(cond: Node, then_branch: Node, else_branch: Node) -> Node {
        let ty = match (&then_branch.ty, &else_branch.ty) {
            (Some(a), Some(b)) => numeric::conditional_type(a, b).or_else(|| Some(a.clone())),
            (a, b) => a.clone().or_else(|| b.clone()),
        };
        Typed::new(
            Expr::Conditional {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            ty,
        )
    }

    pub fn cast(ty: Type, expr: Node) -> Node {
        Typed::new(
            Expr::Cast {
                ty: ty.clone(),
                expr: Box::new(expr),
            },
            Some(ty),
        )
    }

    /// Static member call `ty::method(args)` returning `ret`
    pub fn call_static(ty: Type, method: impl Into<String>, args: Vec<Node>, ret: Type) -> Node {
        Typed::new(
            Expr::Call {
                callee: Callee::Static {
                    ty,
                    method: method.into(),
                },
                args,
            },
            Some(ret),
        )
    }

    pub fn call(name: impl Into<String>, args: Vec<Node>, ret: Option<Type>) -> Node {
        Typed::new(
            Expr::Call {
                callee: Callee::Function(name.into()),
                args,
            },
            ret,
        )
    }

    pub fn block(stmts: Vec<Node>) -> Node {
        Typed::untyped(Expr::Block(stmts))
    }

    pub fn declare(name: impl Into<String>, ty: Type, init: Option<Node>) -> Node {
        Typed::untyped(Expr::Declare {
            name: name.into(),
            ty,
            init: init.map(Box::new),
        })
    }

    pub fn assign(target: impl Into<String>, value: Node) -> Node {
        Typed::untyped(Expr::Assign {
            target: target.into(),
            op: None,
            value: Box::new(value),
        })
    }

    pub fn compound_assign(target: impl Into<String>, op: BinOp, value: Node) -> Node {
        Typed::untyped(Expr::Assign {
            target: target.into(),
            op: Some(op),
            value: Box::new(value),
        })
    }

    pub fn if_stmt(cond: Node, then_branch: Node, else_branch: Option<Node>) -> Node {
        Typed::untyped(Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        })
    }

    pub fn while_loop(cond: Node, body: Node) -> Node {
        Typed::untyped(Expr::While {
            cond: Box::new(cond),
            body: Box::new(body),
        })
    }

    pub fn for_loop(init: Vec<Node>, cond: Option<Node>, step: Vec<Node>, body: Node) -> Node {
        Typed::untyped(Expr::For {
            init,
            cond: cond.map(Box::new),
            step,
            body: Box::new(body),
        })
    }

    pub fn for_each(var: impl Into<String>, iterable: Node, body: Node) -> Node {
        Typed::untyped(Expr::ForEach {
            var: var.into(),
            iterable: Box::new(iterable),
            body: Box::new(body),
        })
    }

    pub fn ret(value: Option<Node>) -> Node {
        Typed::untyped(Expr::Return(value.map(Box::new)))
    }

    pub fn break_stmt() -> Node {
        Typed::untyped(Expr::Break)
    }

    pub fn continue_stmt() -> Node {
        Typed::untyped(Expr::Continue)
    }

    pub fn is_pattern(operand: Node, pattern: Pattern) -> Node {
        Typed::new(
            Expr::Is {
                operand: Box::new(operand),
                pattern,
            },
            Some(Type::Bool),
        )
    }

    // ------------------------------------------------------------------------
    // Shape queries
    // ------------------------------------------------------------------------

    pub fn as_literal(&self) -> Option<&Value> {
        match &self.node {
            Expr::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&str> {
        match &self.node {
            Expr::Var(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<(BinOp, &Node, &Node)> {
        match &self.node {
            Expr::Binary { op, left, right } => Some((*op, left, right)),
            _ => None,
        }
    }

    pub fn as_unary(&self) -> Option<(UnOp, &Node)> {
        match &self.node {
            Expr::Unary { op, operand } => Some((*op, operand)),
            _ => None,
        }
    }

    /// Operand of a logical `!`
    pub fn as_not(&self) -> Option<&Node> {
        match self.as_unary() {
            Some((UnOp::Not, operand)) => Some(operand),
            _ => None,
        }
    }

    /// Direct sub-nodes in evaluation order
    pub fn children(&self) -> Vec<&Node> {
        match &self.node {
            Expr::Literal(_) | Expr::Var(_) | Expr::Break | Expr::Continue => Vec::new(),
            Expr::Binary { left, right, .. } => vec![left, right],
            Expr::Unary { operand, .. } => vec![operand],
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => vec![cond, then_branch, else_branch],
            Expr::Cast { expr, .. } => vec![expr],
            Expr::Call { callee, args } => {
                let mut children: Vec<&Node> = Vec::with_capacity(args.len() + 1);
                if let Callee::Method { receiver, .. } = callee {
                    children.push(receiver);
                }
                children.extend(args.iter());
                children
            }
            Expr::Member { receiver, .. } => vec![receiver],
            Expr::Index { base, index } => vec![base, index],
            Expr::Tuple(items) | Expr::Collection(items) | Expr::Block(items) => {
                items.iter().collect()
            }
            Expr::Is { operand, .. } => vec![operand],
            Expr::Declare { init, .. } => init.iter().map(|b| b.as_ref()).collect(),
            Expr::Assign { value, .. } => vec![value],
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut children: Vec<&Node> = vec![cond, then_branch];
                children.extend(else_branch.iter().map(|b| b.as_ref()));
                children
            }
            Expr::While { cond, body } => vec![cond, body],
            Expr::DoWhile { body, cond } => vec![body, cond],
            Expr::For {
                init,
                cond,
                step,
                body,
            } => {
                let mut children: Vec<&Node> = init.iter().collect();
                children.extend(cond.iter().map(|b| b.as_ref()));
                children.push(body);
                children.extend(step.iter());
                children
            }
            Expr::ForEach { iterable, body, .. } => vec![iterable, body],
            Expr::Return(value) => value.iter().map(|b| b.as_ref()).collect(),
        }
    }

    pub fn is_literal(&self) -> bool {
        self.as_literal().is_some()
    }

    /// Statement kinds that produce no value of their own
    pub fn is_statement(&self) -> bool {
        matches!(
            self.node,
            Expr::Block(_)
                | Expr::Declare { .. }
                | Expr::If { .. }
                | Expr::While { .. }
                | Expr::DoWhile { .. }
                | Expr::For { .. }
                | Expr::ForEach { .. }
                | Expr::Return(_)
                | Expr::Break
                | Expr::Continue
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_result_type() {
        let n = Node::binary(
            BinOp::Add,
            Node::var("x", Type::U8),
            Node::literal(Value::I32(1)),
        );
        assert_eq!(n.ty, Some(Type::I32));
        let c = Node::binary(BinOp::Lt, Node::untyped_var("a"), Node::untyped_var("b"));
        assert_eq!(c.ty, Some(Type::Bool));
    }

    #[test]
    fn test_comparison_negation_and_flip() {
        assert_eq!(BinOp::Lt.negated(), Some(BinOp::Ge));
        assert_eq!(BinOp::Ge.flipped(), Some(BinOp::Le));
        assert_eq!(BinOp::Add.negated(), None);
    }

    #[test]
    fn test_equality_ignores_types() {
        let typed = Node::var("x", Type::I32);
        let untyped = Node::untyped_var("x");
        assert_eq!(typed, untyped);
    }

    #[test]
    fn test_shape_queries() {
        let n = Node::not(Node::var("b", Type::Bool));
        assert_eq!(n.as_not().and_then(Node::as_var), Some("b"));
        assert!(Node::ret(None).is_statement());
        assert!(!Node::bool(true).is_statement());
    }
}
