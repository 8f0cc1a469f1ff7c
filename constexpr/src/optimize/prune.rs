//! Removal of local variables nothing reads
//!
//! A declaration is dead when no later statement of its block reads the
//! name and every later write to it is a plain store in statement
//! position. The declaration and those stores go; initializers and stored
//! values with side effects stay behind as expression statements.

use crate::analysis::{is_pure, read_variables};
use crate::ast::{Expr, Node, Typed};

/// Prune dead locals everywhere in `node`. Returns the number removed.
pub fn prune(node: Node) -> (Node, usize) {
    let mut removed = 0;
    let node = prune_node(node, &mut removed);
    (node, removed)
}

fn prune_node(node: Node, removed: &mut usize) -> Node {
    let Typed { node: expr, ty } = node;
    let expr = match expr {
        Expr::Block(stmts) => {
            let stmts = stmts.into_iter().map(|s| prune_node(s, removed)).collect();
            Expr::Block(prune_block(stmts, removed))
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => Expr::If {
            cond,
            then_branch: Box::new(prune_node(*then_branch, removed)),
            else_branch: else_branch.map(|b| Box::new(prune_node(*b, removed))),
        },
        Expr::While { cond, body } => Expr::While {
            cond,
            body: Box::new(prune_node(*body, removed)),
        },
        Expr::DoWhile { body, cond } => Expr::DoWhile {
            body: Box::new(prune_node(*body, removed)),
            cond,
        },
        Expr::For {
            init,
            cond,
            step,
            body,
        } => Expr::For {
            init,
            cond,
            step,
            body: Box::new(prune_node(*body, removed)),
        },
        Expr::ForEach {
            var,
            iterable,
            body,
        } => Expr::ForEach {
            var,
            iterable,
            body: Box::new(prune_node(*body, removed)),
        },
        other => other,
    };
    Typed::new(expr, ty)
}

fn prune_block(mut stmts: Vec<Node>, removed: &mut usize) -> Vec<Node> {
    let mut i = 0;
    while i < stmts.len() {
        let dead = match &stmts[i].node {
            Expr::Declare { name, init, .. } => {
                let rest = &stmts[i + 1..];
                let unread = !rest.iter().any(|s| read_variables(s).contains(name));
                let stores_only = rest.iter().all(|s| stores_in_statements(s, name, true));
                (unread && stores_only).then(|| (name.clone(), init.clone()))
            }
            _ => None,
        };
        let Some((name, init)) = dead else {
            i += 1;
            continue;
        };
        tracing::debug!(variable = %name, "unread local removed");
        *removed += 1;
        let rest: Vec<Node> = stmts.drain(i + 1..).map(|s| strip_stores(s, &name)).collect();
        match init {
            Some(init) if !is_pure(&init) => {
                stmts[i] = *init;
                i += 1;
            }
            _ => {
                stmts.remove(i);
            }
        }
        stmts.extend(rest);
    }
    let count = stmts.len();
    stmts
        .into_iter()
        .enumerate()
        .filter(|(i, s)| i + 1 == count || !is_empty_block(s))
        .map(|(_, s)| s)
        .collect()
}

fn is_empty_block(node: &Node) -> bool {
    matches!(&node.node, Expr::Block(items) if items.is_empty())
}

/// Every write to `name` inside `node` is a plain store whose own value is
/// discarded
fn stores_in_statements(node: &Node, name: &str, statement: bool) -> bool {
    match &node.node {
        Expr::Assign { target, op, value } if target == name => {
            statement && op.is_none() && stores_in_statements(value, name, false)
        }
        Expr::Block(items) => items.iter().enumerate().all(|(i, item)| {
            stores_in_statements(item, name, statement || i + 1 < items.len())
        }),
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            stores_in_statements(cond, name, false)
                && stores_in_statements(then_branch, name, statement)
                && else_branch
                    .as_ref()
                    .is_none_or(|b| stores_in_statements(b, name, statement))
        }
        Expr::While { cond, body } | Expr::DoWhile { body, cond } => {
            stores_in_statements(cond, name, false) && stores_in_statements(body, name, true)
        }
        Expr::For {
            init,
            cond,
            step,
            body,
        } => {
            init.iter().chain(step.iter()).all(|s| stores_in_statements(s, name, true))
                && cond.as_ref().is_none_or(|c| stores_in_statements(c, name, false))
                && stores_in_statements(body, name, true)
        }
        Expr::ForEach { iterable, body, .. } => {
            stores_in_statements(iterable, name, false) && stores_in_statements(body, name, true)
        }
        _ => node
            .children()
            .into_iter()
            .all(|child| stores_in_statements(child, name, false)),
    }
}

/// Replace statement-level stores to `name` by their value when it has
/// effects, or by nothing
fn strip_stores(node: Node, name: &str) -> Node {
    let Typed { node: expr, ty } = node;
    let expr = match expr {
        Expr::Assign { target, op: None, value } if target == name => {
            return if is_pure(&value) {
                Node::block(vec![])
            } else {
                *value
            };
        }
        Expr::Block(items) => Expr::Block(
            items
                .into_iter()
                .map(|s| strip_stores(s, name))
                .filter(|s| !is_empty_block(s))
                .collect(),
        ),
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => Expr::If {
            cond,
            then_branch: Box::new(strip_stores(*then_branch, name)),
            else_branch: else_branch.map(|b| Box::new(strip_stores(*b, name))),
        },
        Expr::While { cond, body } => Expr::While {
            cond,
            body: Box::new(strip_stores(*body, name)),
        },
        Expr::DoWhile { body, cond } => Expr::DoWhile {
            body: Box::new(strip_stores(*body, name)),
            cond,
        },
        Expr::For {
            init,
            cond,
            step,
            body,
        } => Expr::For {
            init: init.into_iter().map(|s| strip_stores(s, name)).collect(),
            cond,
            step: step.into_iter().map(|s| strip_stores(s, name)).collect(),
            body: Box::new(strip_stores(*body, name)),
        },
        Expr::ForEach {
            var,
            iterable,
            body,
        } => Expr::ForEach {
            var,
            iterable,
            body: Box::new(strip_stores(*body, name)),
        },
        other => other,
    };
    Typed::new(expr, ty)
}
