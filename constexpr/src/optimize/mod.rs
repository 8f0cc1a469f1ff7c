//! Optimization passes and the fixpoint driver
//!
//! Passes implement [`OptimizationPass`] and run over the whole tree; the
//! [`Optimizer`] repeats them until a pass changes nothing or the pass
//! bound is reached.
//!
//! - `PartialEvaluation`: evaluates what is known, applies the rule
//!   library bottom-up, prunes branches and unrolls fully known loops
//! - `DeadCodePruning`: removes locals nothing reads

pub mod bitmask;
pub mod conditional;
pub mod context;
pub mod prune;
pub mod rewriter;
pub mod rules;
pub mod strategy;
pub mod unary;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::analysis::assigned_variables;
use crate::ast::{Expr, Node};
use crate::config::{OptLevel, OptimizerOptions};
use crate::host::Host;
use crate::interp::{Environment, Interpreter, Value};

use context::Scope;
use rewriter::Rewriter;

/// Trait for tree optimization passes
pub trait OptimizationPass {
    /// Name of the optimization pass
    fn name(&self) -> &'static str;

    /// Run the pass on a tree with the given inputs in scope.
    /// Returns true if any changes were made.
    fn run_on_tree(&self, tree: &mut Node, env: &Environment, stats: &mut OptimizationStats) -> bool;
}

/// Statistics from optimization passes
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct OptimizationStats {
    /// Number of passes run
    pub iterations: usize,
    /// Passes that changed the tree, by name
    pub pass_counts: HashMap<String, usize>,
    /// Rule applications, by rule name
    pub rule_counts: HashMap<String, usize>,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&mut self, name: &str) {
        *self.pass_counts.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn record_rule(&mut self, name: &str) {
        *self.rule_counts.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &OptimizationStats) {
        for (name, count) in &other.pass_counts {
            *self.pass_counts.entry(name.clone()).or_insert(0) += count;
        }
        for (name, count) in &other.rule_counts {
            *self.rule_counts.entry(name.clone()).or_insert(0) += count;
        }
    }

    /// Total rule applications
    pub fn rules_applied(&self) -> usize {
        self.rule_counts.values().sum()
    }
}

/// Cooperative cancellation flag shared between the host and a running
/// optimization. Checked at every node the rewriter visits.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Passes
// ============================================================================

/// Evaluation, rule rewriting and control-flow simplification in one walk
pub struct PartialEvaluation<'a> {
    host: &'a dyn Host,
    options: &'a OptimizerOptions,
    cancel: &'a CancellationToken,
    rules: bool,
}

impl OptimizationPass for PartialEvaluation<'_> {
    fn name(&self) -> &'static str {
        if self.rules {
            "partial_evaluation"
        } else {
            "constant_folding"
        }
    }

    fn run_on_tree(&self, tree: &mut Node, env: &Environment, stats: &mut OptimizationStats) -> bool {
        let mut rewriter = Rewriter::new(self.host, self.options, self.cancel);
        if !self.rules {
            rewriter = rewriter.folding_only();
        }
        let rewritten = rewriter.rewrite(tree.clone(), &mut env.clone());
        stats.merge(&rewriter.into_stats());
        let changed = rewritten != *tree;
        *tree = rewritten;
        changed
    }
}

/// Removal of unread locals and their stores
pub struct DeadCodePruning;

impl OptimizationPass for DeadCodePruning {
    fn name(&self) -> &'static str {
        "dead_code_pruning"
    }

    fn run_on_tree(&self, tree: &mut Node, _env: &Environment, stats: &mut OptimizationStats) -> bool {
        let (pruned, removed) = prune::prune(tree.clone());
        for _ in 0..removed {
            stats.record_rule("dead_local_removed");
        }
        *tree = pruned;
        removed > 0
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Entry point for evaluation and optimization against one host
pub struct Optimizer<'h> {
    host: &'h dyn Host,
    options: OptimizerOptions,
    cancel: CancellationToken,
}

impl<'h> Optimizer<'h> {
    pub fn new(host: &'h dyn Host) -> Self {
        Self::with_options(host, OptimizerOptions::default())
    }

    pub fn with_options(host: &'h dyn Host, options: OptimizerOptions) -> Self {
        Optimizer {
            host,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe `token` for cancellation requests
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &OptimizerOptions {
        &self.options
    }

    /// Passes for the configured level, in run order
    fn passes(&self) -> Vec<Box<dyn OptimizationPass + '_>> {
        let evaluation = |rules| PartialEvaluation {
            host: self.host,
            options: &self.options,
            cancel: &self.cancel,
            rules,
        };
        match self.options.level {
            OptLevel::None => Vec::new(),
            OptLevel::Fold => vec![Box::new(evaluation(false))],
            OptLevel::Full => vec![Box::new(evaluation(true)), Box::new(DeadCodePruning)],
        }
    }

    /// Fully evaluate `node`; `None` when any part of it is unknown
    pub fn evaluate(&self, node: &Node, env: &Environment) -> Option<Value> {
        Interpreter::with_options(self.host, &self.options).evaluate(node, &mut env.clone())
    }

    /// Best single rewrite of one node: its value when it evaluates,
    /// otherwise the first local rule that applies to it. `None` when the
    /// node stays as it is.
    pub fn try_optimize(&self, node: &Node, env: &Environment) -> Option<Node> {
        if self.options.level == OptLevel::None || self.cancel.is_cancelled() {
            return None;
        }
        if !node.is_literal() && !node.is_statement() && assigned_variables(node).is_empty() {
            if let Some(value) = self.evaluate(node, env).filter(|v| *v != Value::Unit) {
                return Some(Node::literal(value));
            }
        }
        if self.options.level != OptLevel::Full {
            return None;
        }
        let scope = Scope::new(env, self.host, &self.options);
        let rewritten = match &node.node {
            Expr::Binary { op, left, right } => strategy::dispatch(&scope.binary(*op, left, right)),
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
        rewritten.map(|(_, node)| node).filter(|new| new != node)
    }

    /// Optimize until a pass changes nothing
    pub fn optimize_to_fixpoint(&self, tree: &Node, env: &Environment) -> Node {
        self.optimize_with_stats(tree, env).0
    }

    /// Optimize until a pass changes nothing, bounded by `max_passes`.
    /// A cancelled run returns the tree as of the last completed pass.
    pub fn optimize_with_stats(&self, tree: &Node, env: &Environment) -> (Node, OptimizationStats) {
        let passes = self.passes();
        let mut stats = OptimizationStats::new();
        let mut current = tree.clone();
        if passes.is_empty() {
            return (current, stats);
        }

        let mut iteration = 0;
        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!(pass = iteration, "optimization cancelled");
                break;
            }
            iteration += 1;
            let mut next = current.clone();
            let mut pass_stats = OptimizationStats::new();
            let mut changed = false;
            for pass in &passes {
                if pass.run_on_tree(&mut next, env, &mut pass_stats) {
                    changed = true;
                    pass_stats.record_pass(pass.name());
                }
            }
            if self.cancel.is_cancelled() {
                tracing::debug!(pass = iteration, "optimization cancelled, pass discarded");
                iteration -= 1;
                break;
            }
            stats.merge(&pass_stats);
            current = next;
            tracing::debug!(pass = iteration, changed, "fixpoint pass");

            if !changed || iteration >= self.options.max_passes {
                break;
            }
        }

        stats.iterations = iteration;
        (current, stats)
    }
}
