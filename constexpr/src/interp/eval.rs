//! Tree evaluator
//!
//! Evaluates a node against an environment of statically known values.
//! Anything that cannot be decided (an unknown operand, an unsupported node,
//! a failing host call) surfaces as an `EvalError`; control flow (break,
//! continue, return) travels the same way and is caught by the construct
//! that owns it.

use super::env::{Environment, VariableItem};
use super::error::{ErrorKind, EvalError, EvalResult};
use super::numeric;
use super::value::Value;
use crate::analysis;
use crate::ast::{BinOp, Callee, Expr, Node, Pattern, Type, UnOp};
use crate::config::OptimizerOptions;
use crate::host::{CallTarget, Host};

/// Stack growth parameters for deep trees
const STACK_RED_ZONE: usize = 64 * 1024; // 64KB remaining triggers growth
const STACK_GROW_SIZE: usize = 2 * 1024 * 1024; // Grow by 2MB each time

/// The interpreter
pub struct Interpreter<'h> {
    host: &'h dyn Host,
    /// Iterations any single loop may run before evaluation gives up
    max_loop_iterations: usize,
    /// Nesting bound for recursive evaluation
    max_depth: usize,
    depth: usize,
}

impl<'h> Interpreter<'h> {
    pub fn new(host: &'h dyn Host) -> Self {
        Self::with_options(host, &OptimizerOptions::default())
    }

    pub fn with_options(host: &'h dyn Host, options: &OptimizerOptions) -> Self {
        Interpreter {
            host,
            max_loop_iterations: options.max_loop_iterations,
            max_depth: options.max_depth,
            depth: 0,
        }
    }

    /// Evaluate to a value, or `None` when the node cannot be fully decided.
    /// A `return` reached at the top level yields its value.
    pub fn evaluate(&mut self, node: &Node, env: &mut Environment) -> Option<Value> {
        match self.eval(node, env) {
            Ok(value) => Some(value),
            Err(EvalError {
                kind: ErrorKind::Return(value),
                ..
            }) => Some(value.map(|v| *v).unwrap_or(Value::Unit)),
            Err(e) => {
                tracing::trace!(reason = %e.message, "evaluation gave up");
                None
            }
        }
    }

    /// Evaluate a node, threading environment mutation
    pub fn eval(&mut self, node: &Node, env: &mut Environment) -> EvalResult<Value> {
        if self.depth >= self.max_depth {
            return Err(EvalError::depth_limit(self.max_depth));
        }
        self.depth += 1;
        let result =
            stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(node, env));
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, node: &Node, env: &mut Environment) -> EvalResult<Value> {
        match &node.node {
            Expr::Literal(value) => Ok(value.clone()),

            Expr::Var(name) => {
                let item = env
                    .lookup(name)
                    .ok_or_else(|| EvalError::undefined_variable(name))?;
                item.value
                    .clone()
                    .ok_or_else(|| EvalError::unknown_value(name))
            }

            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, env),

            Expr::Unary { op, operand } => {
                if op.is_mutating() {
                    return self.eval_step(*op, operand, env);
                }
                let value = self.eval(operand, env)?;
                numeric::eval_unary(*op, &value)
            }

            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                let value = if self.eval_bool(cond, env)? {
                    self.eval(then_branch, env)?
                } else {
                    self.eval(else_branch, env)?
                };
                let ty = node
                    .ty
                    .clone()
                    .or_else(|| analysis::conditional_type(then_branch, else_branch, env));
                match ty {
                    Some(ty) if value.ty().is_numeric() => coerce(value, &ty),
                    _ => Ok(value),
                }
            }

            Expr::Cast { ty, expr } => {
                let value = self.eval(expr, env)?;
                value
                    .cast(ty)
                    .ok_or_else(|| EvalError::type_mismatch(&format!("({ty})"), &value.type_name()))
            }

            Expr::Call { callee, args } => self.eval_call(callee, args, env),

            Expr::Member { receiver, name } => {
                let value = self.eval(receiver, env)?;
                self.host
                    .member(&value, name)
                    .ok_or_else(|| EvalError::method_failed(name))
            }

            Expr::Index { base, index } => {
                let base = self.eval(base, env)?;
                let index = self.eval(index, env)?;
                let i = index
                    .as_i128()
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or_else(|| EvalError::unsupported("index out of range"))?;
                match base {
                    Value::Array(items) => items
                        .get(i)
                        .cloned()
                        .ok_or_else(|| EvalError::unsupported("index out of range")),
                    Value::Str(s) => s
                        .encode_utf16()
                        .nth(i)
                        .and_then(|unit| Value::from_i128(&Type::Char, unit as i128))
                        .ok_or_else(|| EvalError::unsupported("index out of range")),
                    other => Err(EvalError::type_mismatch("[]", &other.type_name())),
                }
            }

            Expr::Tuple(items) | Expr::Collection(items) => items
                .iter()
                .map(|item| self.eval(item, env))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::Array),

            Expr::Is { operand, pattern } => {
                let value = self.eval(operand, env)?;
                match_pattern(&value, pattern).map(Value::Bool)
            }

            Expr::Block(stmts) => {
                env.push_scope();
                let result = self.eval_sequence(stmts, env);
                env.pop_scope();
                result
            }

            Expr::Declare { name, ty, init } => {
                let item = match init {
                    Some(init) => {
                        let value = self.eval(init, env)?;
                        VariableItem {
                            value: Some(coerce(value, ty)?),
                            ..VariableItem::unknown(ty.clone())
                        }
                    }
                    None => VariableItem::uninitialized(ty.clone()),
                };
                env.declare(name.clone(), item);
                Ok(Value::Unit)
            }

            Expr::Assign { target, op, value } => {
                let ty = env
                    .lookup(target)
                    .map(|item| item.ty.clone())
                    .ok_or_else(|| EvalError::undefined_variable(target))?;
                let rhs = self.eval(value, env)?;
                let new_value = match op {
                    Some(op) => {
                        let current = env
                            .value(target)
                            .cloned()
                            .ok_or_else(|| EvalError::unknown_value(target))?;
                        coerce(numeric::eval_binary(*op, &current, &rhs)?, &ty)?
                    }
                    None => coerce(rhs, &ty)?,
                };
                env.assign(target, Some(new_value.clone()));
                Ok(new_value)
            }

            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_bool(cond, env)? {
                    self.eval(then_branch, env)?;
                } else if let Some(else_branch) = else_branch {
                    self.eval(else_branch, env)?;
                }
                Ok(Value::Unit)
            }

            Expr::While { cond, body } => {
                let mut iterations = 0;
                while self.eval_bool(cond, env)? {
                    self.tick(&mut iterations)?;
                    if !self.run_body(body, env)? {
                        break;
                    }
                }
                Ok(Value::Unit)
            }

            Expr::DoWhile { body, cond } => {
                let mut iterations = 0;
                loop {
                    self.tick(&mut iterations)?;
                    if !self.run_body(body, env)? || !self.eval_bool(cond, env)? {
                        break;
                    }
                }
                Ok(Value::Unit)
            }

            Expr::For {
                init,
                cond,
                step,
                body,
            } => {
                env.push_scope();
                let result = self.eval_for(init, cond.as_deref(), step, body, env);
                env.pop_scope();
                result
            }

            Expr::ForEach {
                var,
                iterable,
                body,
            } => {
                let items = match self.eval(iterable, env)? {
                    Value::Array(items) => items,
                    Value::Str(s) => s
                        .encode_utf16()
                        .filter_map(|unit| Value::from_i128(&Type::Char, unit as i128))
                        .collect(),
                    other => return Err(EvalError::type_mismatch("foreach", &other.type_name())),
                };
                let mut iterations = 0;
                for item in items {
                    self.tick(&mut iterations)?;
                    env.push_scope();
                    env.declare(var.clone(), VariableItem::known(item));
                    let result = self.run_body(body, env);
                    env.pop_scope();
                    if !result? {
                        break;
                    }
                }
                Ok(Value::Unit)
            }

            Expr::Return(value) => {
                let value = match value {
                    Some(value) => Some(self.eval(value, env)?),
                    None => None,
                };
                Err(EvalError::return_signal(value))
            }

            Expr::Break => Err(EvalError::break_signal()),

            Expr::Continue => Err(EvalError::continue_signal()),
        }
    }

    fn eval_bool(&mut self, node: &Node, env: &mut Environment) -> EvalResult<bool> {
        let value = self.eval(node, env)?;
        value
            .as_bool()
            .ok_or_else(|| EvalError::type_mismatch("condition", &value.type_name()))
    }

    fn eval_binary(
        &mut self,
        op: BinOp,
        left: &Node,
        right: &Node,
        env: &mut Environment,
    ) -> EvalResult<Value> {
        match op {
            // Short-circuit: the right operand is only evaluated when needed
            BinOp::And => {
                if !self.eval_bool(left, env)? {
                    return Ok(Value::Bool(false));
                }
                self.eval_bool(right, env).map(Value::Bool)
            }
            BinOp::Or => {
                if self.eval_bool(left, env)? {
                    return Ok(Value::Bool(true));
                }
                self.eval_bool(right, env).map(Value::Bool)
            }
            _ => {
                let l = self.eval(left, env)?;
                let r = self.eval(right, env)?;
                numeric::eval_binary(op, &l, &r)
            }
        }
    }

    /// Increment or decrement a variable in place
    fn eval_step(&mut self, op: UnOp, operand: &Node, env: &mut Environment) -> EvalResult<Value> {
        let name = operand
            .as_var()
            .ok_or_else(|| EvalError::unsupported("increment of a non-variable"))?;
        let current = self.eval(operand, env)?;
        let updated = numeric::step(op, &current)?;
        env.assign(name, Some(updated.clone()));
        Ok(if op.is_postfix() { current } else { updated })
    }

    fn eval_call(&mut self, callee: &Callee, args: &[Node], env: &mut Environment) -> EvalResult<Value> {
        let receiver = match callee {
            Callee::Method { receiver, .. } => Some(self.eval(receiver, env)?),
            _ => None,
        };
        let args = args
            .iter()
            .map(|arg| self.eval(arg, env))
            .collect::<EvalResult<Vec<_>>>()?;
        let target = match callee {
            Callee::Function(name) => CallTarget::Function(name),
            Callee::Static { ty, method } => CallTarget::Static(ty, method),
            Callee::Method { method, .. } => CallTarget::Method(method),
        };
        self.host
            .invoke(target, receiver.as_ref(), &args)
            .ok_or_else(|| EvalError::method_failed(callee.name()))
    }

    fn eval_sequence(&mut self, stmts: &[Node], env: &mut Environment) -> EvalResult<Value> {
        let mut last = Value::Unit;
        for stmt in stmts {
            last = self.eval(stmt, env)?;
        }
        Ok(last)
    }

    fn eval_for(
        &mut self,
        init: &[Node],
        cond: Option<&Node>,
        step: &[Node],
        body: &Node,
        env: &mut Environment,
    ) -> EvalResult<Value> {
        self.eval_sequence(init, env)?;
        let mut iterations = 0;
        loop {
            if let Some(cond) = cond {
                if !self.eval_bool(cond, env)? {
                    break;
                }
            }
            self.tick(&mut iterations)?;
            if !self.run_body(body, env)? {
                break;
            }
            self.eval_sequence(step, env)?;
        }
        Ok(Value::Unit)
    }

    /// Run a loop body. Returns false when the loop should stop.
    fn run_body(&mut self, body: &Node, env: &mut Environment) -> EvalResult<bool> {
        match self.eval(body, env) {
            Ok(_) => Ok(true),
            Err(e) if e.kind == ErrorKind::Continue => Ok(true),
            Err(e) if e.kind == ErrorKind::Break => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn tick(&self, iterations: &mut usize) -> EvalResult<()> {
        *iterations += 1;
        if *iterations > self.max_loop_iterations {
            tracing::debug!(limit = self.max_loop_iterations, "loop iteration bound reached");
            return Err(EvalError::iteration_limit(self.max_loop_iterations));
        }
        Ok(())
    }
}

/// Implicit conversion of an assigned value to the variable's type
fn coerce(value: Value, ty: &Type) -> EvalResult<Value> {
    if value.ty() == *ty || !ty.is_numeric() {
        return Ok(value);
    }
    value
        .cast(ty)
        .ok_or_else(|| EvalError::type_mismatch("=", &value.type_name()))
}

/// Test a value against an `is` pattern
pub fn match_pattern(value: &Value, pattern: &Pattern) -> EvalResult<bool> {
    match pattern {
        Pattern::Constant(constant) => numeric::compare(BinOp::Eq, value, constant),
        Pattern::Relational { op, value: bound } => numeric::compare(*op, value, bound),
        Pattern::Not(inner) => Ok(!match_pattern(value, inner)?),
        Pattern::And(a, b) => Ok(match_pattern(value, a)? && match_pattern(value, b)?),
        Pattern::Or(a, b) => Ok(match_pattern(value, a)? || match_pattern(value, b)?),
        Pattern::Discard => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostLibrary;

    fn int(n: i32) -> Node {
        Node::literal(Value::I32(n))
    }

    fn var(name: &str) -> Node {
        Node::var(name, Type::I32)
    }

    fn run(node: &Node, env: &mut Environment) -> Option<Value> {
        let host = HostLibrary::standard();
        Interpreter::new(&host).evaluate(node, env)
    }

    #[test]
    fn test_literal_and_variable() {
        let mut env = Environment::new().with_value("x", Value::I32(4));
        assert_eq!(run(&int(3), &mut env), Some(Value::I32(3)));
        assert_eq!(run(&var("x"), &mut env), Some(Value::I32(4)));
    }

    #[test]
    fn test_unknown_variable_yields_none() {
        let mut env = Environment::new().with_unknown("x", Type::I32);
        let expr = Node::binary(BinOp::Add, var("x"), int(1));
        assert_eq!(run(&expr, &mut env), None);
        assert_eq!(run(&var("missing"), &mut env), None);
    }

    #[test]
    fn test_division_by_zero_yields_none() {
        let expr = Node::binary(BinOp::Div, int(1), int(0));
        assert_eq!(run(&expr, &mut Environment::new()), None);
    }

    #[test]
    fn test_short_circuit_skips_unknown() {
        let mut env = Environment::new().with_unknown("y", Type::Bool);
        let expr = Node::binary(BinOp::And, Node::bool(false), Node::var("y", Type::Bool));
        assert_eq!(run(&expr, &mut env), Some(Value::Bool(false)));
        let expr = Node::binary(BinOp::Or, Node::bool(true), Node::var("y", Type::Bool));
        assert_eq!(run(&expr, &mut env), Some(Value::Bool(true)));
    }

    #[test]
    fn test_conditional_takes_only_one_branch() {
        let mut env = Environment::new().with_value("n", Value::I32(0));
        let expr = Node::conditional(
            Node::bool(true),
            int(10),
            Node::unary(UnOp::PreIncrement, var("n")),
        );
        assert_eq!(run(&expr, &mut env), Some(Value::I32(10)));
        assert_eq!(env.value("n"), Some(&Value::I32(0)));
    }

    #[test]
    fn test_conditional_converts_arm_to_common_type() {
        let mut env = Environment::new()
            .with_value("f", Value::Bool(false))
            .with_value("c", Value::I64(-2));
        let f = || Node::var("f", Type::Bool);
        let zeros = Node::conditional(f(), Node::literal(Value::I64(0)), int(0));
        assert_eq!(zeros.ty, Some(Type::I64));
        assert_eq!(run(&zeros, &mut env), Some(Value::I64(0)));

        let mixed = Node::conditional(
            f(),
            Node::literal(Value::U32(u32::MAX)),
            Node::var("c", Type::I64),
        );
        assert_eq!(mixed.ty, Some(Type::I64));
        assert_eq!(run(&mixed, &mut env), Some(Value::I64(-2)));
        let below = Node::binary(BinOp::Lt, mixed, Node::unary(UnOp::BitNot, int(0)));
        assert_eq!(run(&below, &mut env), Some(Value::Bool(true)));
    }

    #[test]
    fn test_for_loop_sum() {
        let program = Node::block(vec![
            Node::declare("sum", Type::I32, Some(int(0))),
            Node::for_loop(
                vec![Node::declare("i", Type::I32, Some(int(0)))],
                Some(Node::binary(BinOp::Lt, var("i"), int(5))),
                vec![Node::unary(UnOp::PostIncrement, var("i"))],
                Node::compound_assign("sum", BinOp::Add, var("i")),
            ),
            Node::ret(Some(var("sum"))),
        ]);
        assert_eq!(run(&program, &mut Environment::new()), Some(Value::I32(10)));
    }

    #[test]
    fn test_while_with_break_and_continue() {
        // sum of the even values of i in 1..=10
        let program = Node::block(vec![
            Node::declare("i", Type::I32, Some(int(0))),
            Node::declare("s", Type::I32, Some(int(0))),
            Node::while_loop(
                Node::bool(true),
                Node::block(vec![
                    Node::unary(UnOp::PreIncrement, var("i")),
                    Node::if_stmt(
                        Node::binary(BinOp::Gt, var("i"), int(10)),
                        Node::break_stmt(),
                        None,
                    ),
                    Node::if_stmt(
                        Node::binary(
                            BinOp::Eq,
                            Node::binary(BinOp::Rem, var("i"), int(2)),
                            int(1),
                        ),
                        Node::continue_stmt(),
                        None,
                    ),
                    Node::compound_assign("s", BinOp::Add, var("i")),
                ]),
            ),
            var("s"),
        ]);
        assert_eq!(run(&program, &mut Environment::new()), Some(Value::I32(30)));
    }

    #[test]
    fn test_infinite_loop_hits_bound() {
        let host = HostLibrary::standard();
        let options = OptimizerOptions {
            max_loop_iterations: 100,
            ..OptimizerOptions::default()
        };
        let mut interp = Interpreter::with_options(&host, &options);
        let program = Node::while_loop(Node::bool(true), Node::block(vec![]));
        let err = interp.eval(&program, &mut Environment::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IterationLimit);
    }

    #[test]
    fn test_foreach_over_collection() {
        let items = crate::ast::Typed::untyped(Expr::Collection(vec![int(2), int(3), int(4)]));
        let program = Node::block(vec![
            Node::declare("p", Type::I32, Some(int(1))),
            Node::for_each("v", items, Node::compound_assign("p", BinOp::Mul, var("v"))),
            var("p"),
        ]);
        assert_eq!(run(&program, &mut Environment::new()), Some(Value::I32(24)));
    }

    #[test]
    fn test_block_scope_is_restored() {
        let mut env = Environment::new().with_value("x", Value::I32(1));
        let program = Node::block(vec![Node::declare("x", Type::I32, Some(int(9)))]);
        run(&program, &mut env);
        assert_eq!(env.value("x"), Some(&Value::I32(1)));
    }

    #[test]
    fn test_compound_assign_narrows_to_declared_type() {
        let program = Node::block(vec![
            Node::declare("b", Type::U8, Some(Node::literal(Value::U8(250)))),
            Node::compound_assign("b", BinOp::Add, int(10)),
            Node::untyped_var("b"),
        ]);
        assert_eq!(run(&program, &mut Environment::new()), Some(Value::U8(4)));
    }

    #[test]
    fn test_host_call() {
        let call = Node::call_static(Type::I32, "is_even", vec![int(6)], Type::Bool);
        assert_eq!(run(&call, &mut Environment::new()), Some(Value::Bool(true)));
        let missing = Node::call("no_such_function", vec![], None);
        assert_eq!(run(&missing, &mut Environment::new()), None);
    }

    #[test]
    fn test_is_pattern() {
        let pattern = Pattern::Or(
            Box::new(Pattern::Constant(Value::I32(1))),
            Box::new(Pattern::Relational {
                op: BinOp::Ge,
                value: Value::I32(10),
            }),
        );
        let mut env = Environment::new().with_value("x", Value::I32(12));
        let test = Node::is_pattern(var("x"), pattern);
        assert_eq!(run(&test, &mut env), Some(Value::Bool(true)));
    }

    #[test]
    fn test_index_and_member() {
        let s = Node::literal(Value::Str("abc".into()));
        let index = crate::ast::Typed::untyped(Expr::Index {
            base: Box::new(s.clone()),
            index: Box::new(int(1)),
        });
        assert_eq!(run(&index, &mut Environment::new()), Some(Value::Char('b')));
        let length = crate::ast::Typed::untyped(Expr::Member {
            receiver: Box::new(s),
            name: "length".into(),
        });
        assert_eq!(run(&length, &mut Environment::new()), Some(Value::I32(3)));
    }
}
