//! Partial evaluation of whole trees
//!
//! The rewriter walks a tree in evaluation order, carrying an environment
//! of the values known at each point:
//!
//! - expressions whose operands are all known are replaced by literals
//! - other operators go through the rule library, with the conditions of
//!   enclosing branches and `&&` left operands available as facts
//! - branches on known conditions are replaced by the taken branch, and
//!   after an unknown branch only the values both paths agree on survive
//! - a loop whose state is fully known is run to completion and replaced
//!   by the final values of the variables it assigns; any other loop
//!   forgets the variables it assigns before its body is rewritten
//! - statements after `return`, `break` or `continue` are dropped

use crate::analysis::{
    RangeScope, assigned_variables, conditional_type, is_pure, read_variables,
};
use crate::ast::{BinOp, Callee, Expr, Node, Type, Typed, UnOp};
use crate::config::OptimizerOptions;
use crate::host::Host;
use crate::interp::{Environment, Interpreter, Value, VariableItem, numeric};

use super::context::{Scope, convert};
use super::{CancellationToken, OptimizationStats, bitmask, conditional, strategy, unary};

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 2 * 1024 * 1024;

/// One partial-evaluation walk over a tree
pub struct Rewriter<'a> {
    host: &'a dyn Host,
    options: &'a OptimizerOptions,
    cancel: &'a CancellationToken,
    /// Apply the rule library, not only evaluation
    rules: bool,
    /// Conditions known to hold, with the id of the scope that added them
    facts: Vec<Node>,
    fact_ids: Vec<u64>,
    next_fact_id: u64,
    /// Operator of the binary node whose operand is being rewritten
    parent: Option<BinOp>,
    stats: OptimizationStats,
}

impl<'a> Rewriter<'a> {
    pub fn new(
        host: &'a dyn Host,
        options: &'a OptimizerOptions,
        cancel: &'a CancellationToken,
    ) -> Self {
        Rewriter {
            host,
            options,
            cancel,
            rules: true,
            facts: Vec::new(),
            fact_ids: Vec::new(),
            next_fact_id: 0,
            parent: None,
            stats: OptimizationStats::new(),
        }
    }

    /// Evaluate and propagate values without algebraic rules
    pub fn folding_only(mut self) -> Self {
        self.rules = false;
        self
    }

    pub fn into_stats(self) -> OptimizationStats {
        self.stats
    }

    /// Rewrite `node`, leaving `env` as it stands after the node ran
    pub fn rewrite(&mut self, node: Node, env: &mut Environment) -> Node {
        self.node(node, env)
    }

    fn node(&mut self, node: Node, env: &mut Environment) -> Node {
        if self.cancel.is_cancelled() {
            return node;
        }
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.node_inner(node, env))
    }

    /// Rewrite an operand of the binary operator `op`
    fn operand(&mut self, op: BinOp, node: Node, env: &mut Environment) -> Node {
        self.parent = Some(op);
        self.node(node, env)
    }

    fn node_inner(&mut self, node: Node, env: &mut Environment) -> Node {
        let parent = self.parent.take();
        let Typed { node: expr, ty } = node;
        let rebuilt = match expr {
            Expr::Literal(_) | Expr::Break | Expr::Continue => return Typed::new(expr, ty),

            Expr::Var(name) => {
                return match env.value(&name) {
                    Some(value) => Node::literal(value.clone()),
                    None => Typed::new(Expr::Var(name), ty),
                };
            }

            Expr::Binary { op, left, right } if op.is_logical() => {
                let left = self.operand(op, *left, env);
                // the right operand only runs when the left one did not decide
                let mut branch = env.clone();
                let right = if is_pure(&left) {
                    let guard = if op == BinOp::And {
                        left.clone()
                    } else {
                        Node::not(left.clone())
                    };
                    self.with_fact(guard, |this| this.operand(op, *right, &mut branch))
                } else {
                    self.operand(op, *right, &mut branch)
                };
                env.merge(&branch);
                Typed::new(
                    Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    ty,
                )
            }

            Expr::Binary { op, left, right } => {
                let left = self.operand(op, *left, env);
                let right = self.operand(op, *right, env);
                Typed::new(
                    Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    ty,
                )
            }

            Expr::Unary { op, operand } if op.is_mutating() => {
                self.step(op, &operand, env);
                return Typed::new(Expr::Unary { op, operand }, ty);
            }

            Expr::Unary { op, operand } => {
                let operand = self.node(*operand, env);
                Typed::new(
                    Expr::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    ty,
                )
            }

            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.node(*cond, env);
                if let Some(taken) = self.known_condition(&cond, env) {
                    self.stats.record_rule("conditional_known_condition");
                    let target = ty
                        .clone()
                        .or_else(|| conditional_type(&then_branch, &else_branch, env));
                    let branch = if taken { then_branch } else { else_branch };
                    let branch = self.node(*branch, env);
                    return convert(branch, target.as_ref(), env);
                }
                let (then_branch, else_branch) =
                    self.branches(&cond, *then_branch, Some(*else_branch), env);
                Typed::new(
                    Expr::Conditional {
                        cond: Box::new(cond),
                        then_branch: Box::new(then_branch),
                        else_branch: Box::new(else_branch.unwrap_or_else(|| Node::block(vec![]))),
                    },
                    ty,
                )
            }

            Expr::Cast { ty: target, expr } => {
                let expr = self.node(*expr, env);
                Typed::new(
                    Expr::Cast {
                        ty: target,
                        expr: Box::new(expr),
                    },
                    ty,
                )
            }

            Expr::Call { callee, args } => {
                let callee = match callee {
                    Callee::Method { receiver, method } => Callee::Method {
                        receiver: Box::new(self.node(*receiver, env)),
                        method,
                    },
                    other => other,
                };
                let args = self.sequence(args, env);
                Typed::new(Expr::Call { callee, args }, ty)
            }

            Expr::Member { receiver, name } => {
                let receiver = self.node(*receiver, env);
                Typed::new(
                    Expr::Member {
                        receiver: Box::new(receiver),
                        name,
                    },
                    ty,
                )
            }

            Expr::Index { base, index } => {
                let base = self.node(*base, env);
                let index = self.node(*index, env);
                Typed::new(
                    Expr::Index {
                        base: Box::new(base),
                        index: Box::new(index),
                    },
                    ty,
                )
            }

            Expr::Tuple(items) => Typed::new(Expr::Tuple(self.sequence(items, env)), ty),

            Expr::Collection(items) => Typed::new(Expr::Collection(self.sequence(items, env)), ty),

            Expr::Is { operand, pattern } => {
                let operand = self.node(*operand, env);
                Typed::new(
                    Expr::Is {
                        operand: Box::new(operand),
                        pattern,
                    },
                    ty,
                )
            }

            Expr::Block(stmts) => return Typed::new(Expr::Block(self.block(stmts, env)), ty),

            Expr::Declare { name, ty: declared, init } => {
                let init = init.map(|init| self.node(*init, env));
                let item = match &init {
                    Some(init) => VariableItem {
                        value: init.as_literal().and_then(|v| fit(v, &declared)),
                        ..VariableItem::unknown(declared.clone())
                    },
                    None => VariableItem::uninitialized(declared.clone()),
                };
                env.declare(name.clone(), item);
                self.forget_facts(&name);
                return Typed::new(
                    Expr::Declare {
                        name,
                        ty: declared,
                        init: init.map(Box::new),
                    },
                    ty,
                );
            }

            Expr::Assign { target, op, value } => {
                return self.assign(target, op, *value, ty, env);
            }

            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.node(*cond, env);
                if let Some(taken) = self.known_condition(&cond, env) {
                    self.stats.record_rule("if_known_condition");
                    return match (taken, else_branch) {
                        (true, _) => self.node(*then_branch, env),
                        (false, Some(else_branch)) => self.node(*else_branch, env),
                        (false, None) => Node::block(vec![]),
                    };
                }
                let (then_branch, else_branch) =
                    self.branches(&cond, *then_branch, else_branch.map(|b| *b), env);
                return Typed::new(
                    Expr::If {
                        cond: Box::new(cond),
                        then_branch: Box::new(then_branch),
                        else_branch: else_branch.map(Box::new),
                    },
                    ty,
                );
            }

            expr @ (Expr::While { .. }
            | Expr::DoWhile { .. }
            | Expr::For { .. }
            | Expr::ForEach { .. }) => return self.looping(Typed::new(expr, ty), env),

            Expr::Return(value) => {
                let value = value.map(|v| Box::new(self.node(*v, env)));
                return Typed::new(Expr::Return(value), ty);
            }
        };
        self.simplify(rebuilt, parent, env)
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    /// Fold a node whose value is now known, otherwise apply the first
    /// matching rule
    fn simplify(&mut self, node: Node, parent: Option<BinOp>, env: &Environment) -> Node {
        if let Some(literal) = self.fold(&node, env) {
            return literal;
        }
        if !self.rules {
            return node;
        }
        let scope = Scope::new(env, self.host, self.options).with_facts(&self.facts);
        let rewritten = match &node.node {
            Expr::Binary { op, left, right } => {
                let ctx = scope.binary(*op, left, right).with_parent(parent);
                strategy::dispatch(&ctx)
            }
            Expr::Unary { op, operand } => unary::optimize(&scope, *op, operand),
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => conditional::optimize(&scope, cond, then_branch, else_branch),
            Expr::Is { operand, pattern } => bitmask::compact_pattern(operand, pattern, env)
                .map(|node| ("is_pattern_to_range_check", node)),
            _ => None,
        };
        match rewritten {
            Some((name, replacement)) => {
                self.stats.record_rule(name);
                replacement
            }
            None => node,
        }
    }

    /// Value of a node that has no writes and evaluates completely
    fn fold(&self, node: &Node, env: &Environment) -> Option<Node> {
        if node.is_literal() || node.is_statement() || !assigned_variables(node).is_empty() {
            return None;
        }
        let mut scratch = env.clone();
        let value = Interpreter::with_options(self.host, self.options).evaluate(node, &mut scratch)?;
        (value != Value::Unit).then(|| Node::literal(value))
    }

    /// Truth value of a rewritten condition, from its literal or the facts
    fn known_condition(&self, cond: &Node, env: &Environment) -> Option<bool> {
        if let Some(b) = cond.as_literal().and_then(Value::as_bool) {
            return Some(b);
        }
        if !self.rules || !is_pure(cond) {
            return None;
        }
        RangeScope::new(env, &self.facts).decide_condition(cond)
    }

    fn sequence(&mut self, items: Vec<Node>, env: &mut Environment) -> Vec<Node> {
        items.into_iter().map(|item| self.node(item, env)).collect()
    }

    /// `x++` and friends: track the new value when the old one is known
    fn step(&mut self, op: UnOp, operand: &Node, env: &mut Environment) {
        let Some(name) = operand.as_var() else {
            return;
        };
        let updated = env
            .value(name)
            .and_then(|current| numeric::step(op, current).ok());
        env.assign(name, updated);
        self.forget_facts(name);
    }

    fn assign(
        &mut self,
        target: String,
        op: Option<BinOp>,
        value: Node,
        ty: Option<Type>,
        env: &mut Environment,
    ) -> Node {
        let value = self.node(value, env);
        let declared = env.lookup(&target).map(|item| item.ty.clone());
        let rhs = value.as_literal();
        let stored = match (op, rhs, &declared) {
            (None, Some(rhs), Some(declared)) => fit(rhs, declared),
            (Some(op), Some(rhs), Some(declared)) => env
                .value(&target)
                .and_then(|current| numeric::eval_binary(op, current, rhs).ok())
                .and_then(|result| fit(&result, declared)),
            _ => None,
        };
        env.assign(&target, stored.clone());
        self.forget_facts(&target);
        match (op, stored) {
            // x += 3 with x known is a plain store of the result
            (Some(_), Some(result)) => {
                self.stats.record_rule("compound_assign_to_store");
                Typed::new(
                    Expr::Assign {
                        target,
                        op: None,
                        value: Box::new(Node::literal(result)),
                    },
                    ty,
                )
            }
            _ => Typed::new(
                Expr::Assign {
                    target,
                    op,
                    value: Box::new(value),
                },
                ty,
            ),
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn block(&mut self, stmts: Vec<Node>, env: &mut Environment) -> Vec<Node> {
        env.push_scope();
        let count = stmts.len();
        let mut out = Vec::with_capacity(count);
        for (i, stmt) in stmts.into_iter().enumerate() {
            let last = i + 1 == count;
            let stmt = self.node(stmt, env);
            let exits = matches!(stmt.node, Expr::Return(_) | Expr::Break | Expr::Continue);
            match stmt.node {
                // a block without declarations of its own can be inlined
                Expr::Block(inner)
                    if (!last || !inner.is_empty()) && !inner.iter().any(is_declaration) =>
                {
                    out.extend(inner)
                }
                _ if !last && !stmt.is_statement() && is_pure(&stmt) => {}
                _ => out.push(stmt),
            }
            if exits && !last {
                self.stats.record_rule("unreachable_after_exit");
                tracing::debug!(dropped = count - i - 1, "statements after exit removed");
                break;
            }
        }
        env.pop_scope();
        out
    }

    /// Rewrite both arms of a branch on an unknown condition, then keep only
    /// the values the two paths agree on
    fn branches(
        &mut self,
        cond: &Node,
        then_branch: Node,
        else_branch: Option<Node>,
        env: &mut Environment,
    ) -> (Node, Option<Node>) {
        let mut then_env = env.clone();
        let then_branch = self.with_fact(cond.clone(), |this| this.node(then_branch, &mut then_env));
        let mut else_env = env.clone();
        let else_branch = else_branch.map(|branch| {
            self.with_fact(Node::not(cond.clone()), |this| this.node(branch, &mut else_env))
        });
        then_env.merge(&else_env);
        *env = then_env;
        (then_branch, else_branch)
    }

    fn looping(&mut self, node: Node, env: &mut Environment) -> Node {
        if let Some(unrolled) = self.unroll(&node, env) {
            return unrolled;
        }
        // values carried around the loop are unknown inside and after it
        for name in assigned_variables(&node) {
            env.invalidate(&name);
            self.forget_facts(&name);
        }
        let Typed { node: expr, ty } = node;
        let expr = match expr {
            Expr::While { cond, body } => {
                let cond = self.node(*cond, &mut env.clone());
                if cond.as_literal().and_then(Value::as_bool) == Some(false) {
                    self.stats.record_rule("loop_never_runs");
                    return Node::block(vec![]);
                }
                let body = self.loop_body(Some(&cond), *body, env);
                Expr::While {
                    cond: Box::new(cond),
                    body: Box::new(body),
                }
            }
            Expr::DoWhile { body, cond } => {
                let body = self.loop_body(None, *body, env);
                let cond = self.node(*cond, &mut env.clone());
                Expr::DoWhile {
                    body: Box::new(body),
                    cond: Box::new(cond),
                }
            }
            Expr::For {
                init,
                cond,
                step,
                body,
            } => {
                env.push_scope();
                let init = self.sequence(init, env);
                for name in assigned_variables(&body)
                    .into_iter()
                    .chain(step.iter().flat_map(assigned_variables))
                {
                    env.invalidate(&name);
                }
                let cond = cond.map(|c| self.node(*c, &mut env.clone()));
                let body = self.loop_body(cond.as_ref(), *body, env);
                let step = self.sequence(step, &mut env.clone());
                env.pop_scope();
                Expr::For {
                    init,
                    cond: cond.map(Box::new),
                    step,
                    body: Box::new(body),
                }
            }
            Expr::ForEach {
                var,
                iterable,
                body,
            } => {
                let iterable = self.node(*iterable, env);
                let element = match self.scope_type(&iterable, env) {
                    Some(Type::Array(element)) => Some(*element),
                    Some(Type::String) => Some(Type::Char),
                    _ => None,
                };
                let mut inner = env.clone();
                inner.push_scope();
                if let Some(element) = element {
                    inner.declare(var.clone(), VariableItem::unknown(element));
                }
                let body = self.node(*body, &mut inner);
                Expr::ForEach {
                    var,
                    iterable: Box::new(iterable),
                    body: Box::new(body),
                }
            }
            other => other,
        };
        Typed::new(expr, ty)
    }

    fn loop_body(&mut self, cond: Option<&Node>, body: Node, env: &Environment) -> Node {
        let mut inner = env.clone();
        match cond {
            Some(cond) => self.with_fact(cond.clone(), |this| this.node(body, &mut inner)),
            None => self.node(body, &mut inner),
        }
    }

    /// Run a loop whose inputs are all known and replace it by the stores
    /// it leaves behind in the enclosing scope
    fn unroll(&mut self, node: &Node, env: &mut Environment) -> Option<Node> {
        if contains_call(node) {
            return None;
        }
        let mut trial = env.clone();
        let mut interp = Interpreter::with_options(self.host, self.options);
        if let Err(e) = interp.eval(node, &mut trial) {
            tracing::debug!(reason = %e.message, "loop kept");
            return None;
        }
        let mut names: Vec<String> = assigned_variables(node)
            .into_iter()
            .filter(|name| env.contains(name))
            .collect();
        names.sort_unstable();
        let mut stores = Vec::new();
        for name in names {
            let value = trial.value(&name)?;
            if env.value(&name) != Some(value) {
                stores.push(Node::assign(name.clone(), Node::literal(value.clone())));
            }
        }
        tracing::debug!(stores = stores.len(), "loop evaluated completely");
        self.stats.record_rule("loop_unrolled");
        *env = trial;
        Some(Node::block(stores))
    }

    fn scope_type(&self, node: &Node, env: &Environment) -> Option<Type> {
        crate::analysis::infer_type(node, env).or_else(|| node.as_literal().map(Value::ty))
    }

    // ------------------------------------------------------------------------
    // Facts
    // ------------------------------------------------------------------------

    /// Run `f` with `fact` known to hold
    fn with_fact<T>(&mut self, fact: Node, f: impl FnOnce(&mut Self) -> T) -> T {
        let id = self.next_fact_id;
        self.next_fact_id += 1;
        self.facts.push(fact);
        self.fact_ids.push(id);
        let result = f(self);
        // already gone if `f` assigned one of its variables
        if let Some(pos) = self.fact_ids.iter().rposition(|&i| i == id) {
            self.facts.remove(pos);
            self.fact_ids.remove(pos);
        }
        result
    }

    /// Drop facts that mention `name`
    fn forget_facts(&mut self, name: &str) {
        let mut i = 0;
        while i < self.facts.len() {
            if read_variables(&self.facts[i]).contains(name) {
                self.facts.remove(i);
                self.fact_ids.remove(i);
            } else {
                i += 1;
            }
        }
    }
}

fn is_declaration(node: &Node) -> bool {
    matches!(node.node, Expr::Declare { .. })
}

fn contains_call(node: &Node) -> bool {
    matches!(node.node, Expr::Call { .. }) || node.children().into_iter().any(contains_call)
}

/// Implicit conversion of a stored value to the variable's type
fn fit(value: &Value, ty: &Type) -> Option<Value> {
    if value.ty() == *ty || !ty.is_numeric() {
        return Some(value.clone());
    }
    value.cast(ty)
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

    fn rewrite_in(node: Node, env: &mut Environment) -> (Node, OptimizationStats) {
        let host = HostLibrary::standard();
        let options = OptimizerOptions::default();
        let cancel = CancellationToken::new();
        let mut rewriter = Rewriter::new(&host, &options, &cancel);
        let node = rewriter.rewrite(node, env);
        (node, rewriter.into_stats())
    }

    fn rewrite(node: Node) -> String {
        let mut env = Environment::new().with_unknown("x", Type::I32);
        rewrite_in(node, &mut env).0.to_string()
    }

    #[test]
    fn test_known_values_propagate() {
        let program = Node::block(vec![
            Node::declare("a", Type::I32, Some(int(4))),
            Node::ret(Some(Node::binary(BinOp::Mul, var("a"), var("x")))),
        ]);
        let rendered = rewrite(program);
        assert!(rendered.contains("return x << 2;"), "{rendered}");
    }

    #[test]
    fn test_branch_on_known_condition() {
        let program = Node::block(vec![
            Node::declare("a", Type::I32, Some(int(1))),
            Node::if_stmt(
                Node::binary(BinOp::Gt, var("a"), int(0)),
                Node::assign("a", int(10)),
                Some(Node::assign("a", int(20))),
            ),
            Node::ret(Some(var("a"))),
        ]);
        let rendered = rewrite(program);
        assert!(rendered.contains("a = 10;"), "{rendered}");
        assert!(!rendered.contains("20"), "{rendered}");
        assert!(rendered.contains("return 10;"), "{rendered}");
    }

    #[test]
    fn test_unknown_branch_merges_environments() {
        let program = Node::block(vec![
            Node::declare("a", Type::I32, Some(int(1))),
            Node::declare("b", Type::I32, Some(int(2))),
            Node::if_stmt(
                Node::binary(BinOp::Gt, var("x"), int(0)),
                Node::assign("a", int(5)),
                None,
            ),
            Node::ret(Some(Node::binary(BinOp::Add, var("a"), var("b")))),
        ]);
        let rendered = rewrite(program);
        assert!(rendered.contains("return a + 2;"), "{rendered}");
    }

    #[test]
    fn test_branch_condition_becomes_fact() {
        let inner = Node::if_stmt(
            Node::binary(BinOp::Lt, var("x"), int(0)),
            Node::ret(Some(int(1))),
            None,
        );
        let program = Node::if_stmt(
            Node::binary(BinOp::Gt, var("x"), int(10)),
            Node::block(vec![inner, Node::ret(Some(int(2)))]),
            None,
        );
        let rendered = rewrite(program);
        assert!(!rendered.contains("x < 0"), "{rendered}");
        assert!(!rendered.contains("return 1"), "{rendered}");
    }

    #[test]
    fn test_assignment_kills_fact() {
        let body = Node::block(vec![
            Node::assign("x", Node::binary(BinOp::Sub, var("x"), int(100))),
            Node::ret(Some(Node::binary(BinOp::Lt, var("x"), int(0)))),
        ]);
        let program = Node::if_stmt(Node::binary(BinOp::Gt, var("x"), int(10)), body, None);
        let rendered = rewrite(program);
        assert!(rendered.contains("return x < 0;"), "{rendered}");
    }

    #[test]
    fn test_loop_unrolled_to_final_store() {
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
        let mut env = Environment::new();
        let (node, stats) = rewrite_in(program, &mut env);
        let rendered = node.to_string();
        assert!(rendered.contains("sum = 10;"), "{rendered}");
        assert!(rendered.contains("return 10;"), "{rendered}");
        assert!(!rendered.contains("for"), "{rendered}");
        assert_eq!(stats.rule_counts.get("loop_unrolled"), Some(&1));
    }

    #[test]
    fn test_unknown_loop_forgets_assigned_values() {
        let program = Node::block(vec![
            Node::declare("n", Type::I32, Some(int(0))),
            Node::while_loop(
                Node::binary(BinOp::Lt, var("n"), var("x")),
                Node::unary(UnOp::PreIncrement, var("n")),
            ),
            Node::ret(Some(var("n"))),
        ]);
        let rendered = rewrite(program);
        assert!(rendered.contains("while (n < x)"), "{rendered}");
        assert!(rendered.contains("return n;"), "{rendered}");
    }

    #[test]
    fn test_iteration_limit_keeps_loop() {
        let program = Node::block(vec![
            Node::declare("n", Type::I32, Some(int(0))),
            Node::while_loop(Node::bool(true), Node::unary(UnOp::PreIncrement, var("n"))),
        ]);
        let host = HostLibrary::standard();
        let options = OptimizerOptions {
            max_loop_iterations: 50,
            ..OptimizerOptions::default()
        };
        let cancel = CancellationToken::new();
        let mut env = Environment::new();
        let node = Rewriter::new(&host, &options, &cancel).rewrite(program, &mut env);
        assert!(node.to_string().contains("while (true)"), "{node}");
    }

    #[test]
    fn test_code_after_return_dropped() {
        let program = Node::block(vec![
            Node::ret(Some(var("x"))),
            Node::assign("x", int(1)),
        ]);
        let (node, stats) = rewrite_in(program, &mut Environment::new().with_unknown("x", Type::I32));
        assert!(!node.to_string().contains("x = 1"), "{node}");
        assert_eq!(stats.rule_counts.get("unreachable_after_exit"), Some(&1));
    }

    #[test]
    fn test_compound_assignment_folds() {
        let program = Node::block(vec![
            Node::declare("a", Type::I32, Some(int(3))),
            Node::compound_assign("a", BinOp::Mul, int(7)),
            Node::ret(Some(Node::binary(BinOp::Add, var("a"), var("x")))),
        ]);
        let rendered = rewrite(program);
        assert!(rendered.contains("a = 21;"), "{rendered}");
        assert!(rendered.contains("return 21 + x;"), "{rendered}");
    }

    #[test]
    fn test_cancelled_walk_leaves_tree() {
        let program = Node::binary(BinOp::Add, var("x"), int(0));
        let host = HostLibrary::standard();
        let options = OptimizerOptions::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut env = Environment::new().with_unknown("x", Type::I32);
        let node = Rewriter::new(&host, &options, &cancel).rewrite(program.clone(), &mut env);
        assert_eq!(node, program);
    }

    #[test]
    fn test_folding_only_skips_rules() {
        let host = HostLibrary::standard();
        let options = OptimizerOptions::default();
        let cancel = CancellationToken::new();
        let mut env = Environment::new().with_unknown("x", Type::I32);
        let node = Node::binary(BinOp::Add, var("x"), Node::binary(BinOp::Mul, int(2), int(0)));
        let node = Rewriter::new(&host, &options, &cancel)
            .folding_only()
            .rewrite(node, &mut env);
        assert_eq!(node.to_string(), "x + 0");
    }
}
