//! Read-only view of one binary expression handed to the rewrite rules

use crate::analysis::{self, RangeScope};
use crate::ast::{BinOp, Node, Type};
use crate::config::OptimizerOptions;
use crate::host::Host;
use crate::interp::{Environment, Value, numeric};

/// Everything a rule may inspect about `left op right`.
///
/// Rules never mutate the context; they only return a replacement node.
#[derive(Clone)]
pub struct OptimizeContext<'a> {
    pub op: BinOp,
    pub left: &'a Node,
    pub right: &'a Node,
    pub left_ty: Option<Type>,
    pub right_ty: Option<Type>,
    /// Static type of the whole expression
    pub result_ty: Option<Type>,
    /// Type the operator computes in (the promoted operand type)
    pub op_ty: Option<Type>,
    pub env: &'a Environment,
    pub host: &'a dyn Host,
    pub options: &'a OptimizerOptions,
    /// Conditions known to hold at this point
    pub facts: &'a [Node],
    /// Operator of the enclosing binary node, if any
    pub parent: Option<BinOp>,
}

impl<'a> OptimizeContext<'a> {
    pub fn new(
        op: BinOp,
        left: &'a Node,
        right: &'a Node,
        env: &'a Environment,
        host: &'a dyn Host,
        options: &'a OptimizerOptions,
    ) -> Self {
        let left_ty = analysis::infer_type(left, env);
        let right_ty = analysis::infer_type(right, env);
        let (op_ty, result_ty) = match (&left_ty, &right_ty) {
            (Some(l), Some(r)) => (
                numeric::operating_type(op, l, r),
                numeric::binary_result_type(op, l, r),
            ),
            _ => (None, None),
        };
        OptimizeContext {
            op,
            left,
            right,
            left_ty,
            right_ty,
            result_ty,
            op_ty,
            env,
            host,
            options,
            facts: &[],
            parent: None,
        }
    }

    pub fn with_facts(mut self, facts: &'a [Node]) -> Self {
        self.facts = facts;
        self
    }

    pub fn with_parent(mut self, parent: Option<BinOp>) -> Self {
        self.parent = parent;
        self
    }

    /// Same expression with the operands exchanged
    pub fn swapped(&self) -> Self {
        OptimizeContext {
            left: self.right,
            right: self.left,
            left_ty: self.right_ty.clone(),
            right_ty: self.left_ty.clone(),
            ..self.clone()
        }
    }

    // ------------------------------------------------------------------------
    // Operand queries
    // ------------------------------------------------------------------------

    /// Value of a literal or of a variable with a known value
    pub fn constant(&self, node: &Node) -> Option<Value> {
        match node.as_literal() {
            Some(value) => Some(value.clone()),
            None => node.as_var().and_then(|name| self.env.value(name)).cloned(),
        }
    }

    /// Integral constant widened to i128
    pub fn int_constant(&self, node: &Node) -> Option<i128> {
        self.constant(node).and_then(|v| v.as_i128())
    }

    /// Constant converted to the operating type
    pub fn typed_constant(&self, node: &Node) -> Option<Value> {
        let ty = self.op_ty.as_ref()?;
        self.constant(node)?.cast(ty)
    }

    pub fn is_pure(&self, node: &Node) -> bool {
        analysis::is_pure(node)
    }

    pub fn equivalent(&self, a: &Node, b: &Node) -> bool {
        analysis::equivalent(a, b, self.env)
    }

    /// Pure and equivalent: safe to treat as the same value
    pub fn same_value(&self, a: &Node, b: &Node) -> bool {
        self.is_pure(a) && self.is_pure(b) && self.equivalent(a, b)
    }

    pub fn type_of(&self, node: &Node) -> Option<Type> {
        analysis::infer_type(node, self.env)
    }

    /// The node computes in the operating type
    pub fn has_op_type(&self, node: &Node) -> bool {
        self.op_ty.is_some() && self.type_of(node) == self.op_ty
    }

    pub fn ranges(&self) -> RangeScope<'a> {
        RangeScope::new(self.env, self.facts)
    }

    // ------------------------------------------------------------------------
    // Type queries on the operating type
    // ------------------------------------------------------------------------

    pub fn is_integer(&self) -> bool {
        self.op_ty.as_ref().is_some_and(Type::is_integral)
    }

    pub fn is_signed(&self) -> bool {
        self.op_ty.as_ref().is_some_and(Type::is_signed)
    }

    pub fn is_float(&self) -> bool {
        self.op_ty.as_ref().is_some_and(Type::is_float)
    }

    pub fn is_bool(&self) -> bool {
        self.op_ty.as_ref().is_some_and(Type::is_bool)
    }

    pub fn fast_math(&self) -> bool {
        self.options.fast_math()
    }

    /// Exact integer arithmetic, or floating point when rounding changes
    /// are allowed
    pub fn reassociable(&self) -> bool {
        self.is_integer() || (self.is_float() && self.fast_math())
    }

    // ------------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------------

    /// Literal `n` in the operating type
    pub fn number(&self, n: i128) -> Option<Node> {
        let ty = self.op_ty.as_ref()?;
        Value::from_i128(ty, n).map(Node::literal)
    }

    pub fn zero(&self) -> Option<Node> {
        self.number(0)
    }

    /// Fold `a op b` over two constants in the operating type
    pub fn fold(&self, op: BinOp, a: &Value, b: &Value) -> Option<Value> {
        let ty = self.op_ty.as_ref()?;
        let result = numeric::eval_binary(op, &a.cast(ty)?, &b.cast(ty)?).ok()?;
        result.cast(ty)
    }

    /// Static call `ty::name(args)` if the host type exposes that member
    pub fn capability_call(&self, ty: &Type, name: &str, args: Vec<Node>, ret: Type) -> Option<Node> {
        self.host
            .has_member(ty, name, args.len())
            .then(|| Node::call_static(ty.clone(), name, args, ret))
    }

    /// Fit a replacement to the static type of the expression it replaces
    pub fn coerce(&self, node: Node) -> Node {
        convert(node, self.result_ty.as_ref(), self.env)
    }
}

/// Numeric conversion of `node` to `target`, folded into literals
pub fn convert(node: Node, target: Option<&Type>, env: &Environment) -> Node {
    let (Some(target), Some(actual)) = (target, analysis::infer_type(&node, env)) else {
        return node;
    };
    if *target == actual || !target.is_numeric() || !actual.is_numeric() {
        return node;
    }
    match node.as_literal().and_then(|v| v.cast(target)) {
        Some(value) => Node::literal(value),
        None => Node::cast(target.clone(), node),
    }
}

/// Inputs shared by every node rewritten at one program point
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub env: &'a Environment,
    pub host: &'a dyn Host,
    pub options: &'a OptimizerOptions,
    pub facts: &'a [Node],
}

impl<'a> Scope<'a> {
    pub fn new(env: &'a Environment, host: &'a dyn Host, options: &'a OptimizerOptions) -> Self {
        Scope {
            env,
            host,
            options,
            facts: &[],
        }
    }

    pub fn with_facts(mut self, facts: &'a [Node]) -> Self {
        self.facts = facts;
        self
    }

    /// Rule context for `left op right` at this point
    pub fn binary<'n>(&self, op: BinOp, left: &'n Node, right: &'n Node) -> OptimizeContext<'n>
    where
        'a: 'n,
    {
        OptimizeContext::new(op, left, right, self.env, self.host, self.options)
            .with_facts(self.facts)
    }

    pub fn is_pure(&self, node: &Node) -> bool {
        analysis::is_pure(node)
    }

    pub fn same_value(&self, a: &Node, b: &Node) -> bool {
        self.is_pure(a) && self.is_pure(b) && analysis::equivalent(a, b, self.env)
    }

    pub fn type_of(&self, node: &Node) -> Option<Type> {
        analysis::infer_type(node, self.env)
    }

    pub fn ranges(&self) -> RangeScope<'a> {
        RangeScope::new(self.env, self.facts)
    }

    pub fn fast_math(&self) -> bool {
        self.options.fast_math()
    }

    /// Static call `ty::name(args)` if the host type exposes that member
    pub fn capability_call(&self, ty: &Type, name: &str, args: Vec<Node>, ret: Type) -> Option<Node> {
        self.host
            .has_member(ty, name, args.len())
            .then(|| Node::call_static(ty.clone(), name, args, ret))
    }
}
