//! Rule table and dispatch
//!
//! Each binary operator owns an ordered slice of [`Rule`]s. The first rule
//! whose domain admits the operating type and whose rewrite succeeds wins.
//! Symmetric rules are retried with the operands exchanged, so `0 + x` and
//! `x + 0` share one rule.

use crate::ast::{BinOp, Node, Type};

use super::context::OptimizeContext;
use super::rules;

/// Rewrite function: `None` when the rule does not apply
pub type RewriteFn = fn(&OptimizeContext<'_>) -> Option<Node>;

/// Type category a rule is valid for, tested against the operating type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Any,
    Numeric,
    Integer,
    Float,
    SignedOrFloat,
    Boolean,
    IntegerOrBoolean,
}

impl Domain {
    pub fn admits(self, ty: &Type) -> bool {
        match self {
            Domain::Any => true,
            Domain::Numeric => ty.is_numeric(),
            Domain::Integer => ty.is_integral(),
            Domain::Float => ty.is_float(),
            Domain::SignedOrFloat => ty.is_signed() || ty.is_float(),
            Domain::Boolean => ty.is_bool(),
            Domain::IntegerOrBoolean => ty.is_integral() || ty.is_bool(),
        }
    }
}

/// One named algebraic rewrite
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub domain: Domain,
    /// Also tried with the operands exchanged
    pub symmetric: bool,
    pub apply: RewriteFn,
}

impl Rule {
    pub const fn new(name: &'static str, domain: Domain, apply: RewriteFn) -> Self {
        Rule {
            name,
            domain,
            symmetric: false,
            apply,
        }
    }

    pub const fn symmetric(name: &'static str, domain: Domain, apply: RewriteFn) -> Self {
        Rule {
            name,
            domain,
            symmetric: true,
            apply,
        }
    }

    /// Run the rule, then its mirror image for symmetric rules.
    ///
    /// The mirror is only tried when exchanging the operands cannot reorder
    /// side effects: one side is a literal or both sides are pure.
    pub fn try_apply(&self, ctx: &OptimizeContext<'_>) -> Option<Node> {
        let ty = ctx.op_ty.as_ref()?;
        if !self.domain.admits(ty) {
            return None;
        }
        if let Some(node) = (self.apply)(ctx) {
            return Some(node);
        }
        let reorderable = ctx.left.is_literal()
            || ctx.right.is_literal()
            || (ctx.is_pure(ctx.left) && ctx.is_pure(ctx.right));
        if self.symmetric && reorderable {
            return (self.apply)(&ctx.swapped());
        }
        None
    }
}

/// Rules for an operator, in priority order
pub fn rules_for(op: BinOp) -> &'static [Rule] {
    match op {
        BinOp::Add => rules::add::RULES,
        BinOp::Sub => rules::sub::RULES,
        BinOp::Mul => rules::mul::RULES,
        BinOp::Div => rules::div::RULES,
        BinOp::Rem => rules::rem::RULES,
        BinOp::Shl | BinOp::Shr => rules::shift::RULES,
        BinOp::BitAnd => rules::bitand::RULES,
        BinOp::BitOr => rules::bitor::RULES,
        BinOp::BitXor => rules::bitxor::RULES,
        BinOp::And => rules::logical::AND_RULES,
        BinOp::Or => rules::logical::OR_RULES,
        BinOp::Eq | BinOp::Ne => rules::equality::RULES,
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => rules::relational::RULES,
    }
}

/// First rule that rewrites the expression, with its replacement fitted
/// to the expression's static type
pub fn dispatch(ctx: &OptimizeContext<'_>) -> Option<(&'static str, Node)> {
    rules_for(ctx.op).iter().find_map(|rule| {
        let node = rule.try_apply(ctx)?;
        tracing::trace!(rule = rule.name, op = %ctx.op, "rule fired");
        Some((rule.name, ctx.coerce(node)))
    })
}
