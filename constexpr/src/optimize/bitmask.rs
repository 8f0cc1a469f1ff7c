//! Equality chains to range checks and bit tests
//!
//! `x == k1 || x == k2 || ... || x == kn` over distinct integral constants
//! becomes, depending on the shape of the key set:
//!
//! | keys                         | replacement                                         |
//! |------------------------------|-----------------------------------------------------|
//! | one value                    | `x == k`                                            |
//! | contiguous `min..=max`       | `(u32)(x - min) <= span`                            |
//! | step `d` from `min`          | `(u32)(x - min) <= span && (x - min) % d == 0`      |
//! | anything within 64 bits      | `(u32)(x - min) <= span && ((mask >> i) & 1) != 0`  |
//!
//! The bit index `i` is `x` itself when every key already lies in
//! `0..width`, otherwise `x - min`. The unsigned cast folds the lower and
//! upper bound checks into one comparison: values below `min` wrap around to
//! large unsigned numbers.
//!
//! `x is 1 or 5 or 10` patterns take the same path.

use crate::ast::{BinOp, Expr, Node, Pattern, Type};
use crate::interp::{Environment, Value, numeric};

use super::context::OptimizeContext;

/// Shortest chain worth compacting
const MIN_KEYS: usize = 3;

/// Compact the `||` chain rooted at the context's expression
pub fn compact_or(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let mut terms = Vec::new();
    flatten_or(ctx.left, &mut terms);
    flatten_or(ctx.right, &mut terms);
    if terms.len() < MIN_KEYS {
        return None;
    }

    let mut subject: Option<&Node> = None;
    let mut keys = Vec::new();
    for term in terms {
        let (found, found_keys) = equality_term(term, ctx.env)?;
        match subject {
            Some(existing) if !ctx.same_value(existing, found) => return None,
            Some(_) => {}
            None => subject = Some(found),
        }
        keys.extend(found_keys);
    }
    let subject = subject?;
    if !ctx.is_pure(subject) {
        return None;
    }
    let ty = ctx.type_of(subject)?;
    emit(subject, &ty, keys)
}

/// Compact `x is k1 or k2 or ...` and `x is >= lo and <= hi`
pub fn compact_pattern(operand: &Node, pattern: &Pattern, env: &Environment) -> Option<Node> {
    if !crate::analysis::is_pure(operand) {
        return None;
    }
    let ty = crate::analysis::infer_type(operand, env)?;
    if !ty.is_integral() {
        return None;
    }
    if let Some((lo, hi)) = pattern_bounds(pattern) {
        if !ty.contains(lo) || !ty.contains(hi) || lo > hi {
            return None;
        }
        return range_check(operand, &ty, lo, hi);
    }
    let mut keys = Vec::new();
    pattern_keys(pattern, &mut keys)?;
    if keys.len() < MIN_KEYS {
        return None;
    }
    emit(operand, &ty, keys)
}

fn flatten_or<'n>(node: &'n Node, out: &mut Vec<&'n Node>) {
    match node.as_binary() {
        Some((BinOp::Or, left, right)) => {
            flatten_or(left, out);
            flatten_or(right, out);
        }
        _ => out.push(node),
    }
}

/// `x == k`, `k == x` or `x is k1 or k2`
fn equality_term<'n>(term: &'n Node, env: &Environment) -> Option<(&'n Node, Vec<i128>)> {
    if let Expr::Is { operand, pattern } = &term.node {
        let mut keys = Vec::new();
        pattern_keys(pattern, &mut keys)?;
        return Some((&**operand, keys));
    }
    let (left, right) = match term.as_binary()? {
        (BinOp::Eq, left, right) => (left, right),
        _ => return None,
    };
    let constant = |node: &Node| match node.as_literal() {
        Some(value) => value.as_i128(),
        None => node.as_var().and_then(|name| env.value(name)).and_then(Value::as_i128),
    };
    match (constant(left), constant(right)) {
        (None, Some(k)) => Some((left, vec![k])),
        (Some(k), None) => Some((right, vec![k])),
        _ => None,
    }
}

fn pattern_keys(pattern: &Pattern, out: &mut Vec<i128>) -> Option<()> {
    match pattern {
        Pattern::Constant(value) => out.push(value.as_i128()?),
        Pattern::Or(a, b) => {
            pattern_keys(a, out)?;
            pattern_keys(b, out)?;
        }
        _ => return None,
    }
    Some(())
}

/// `>= lo and <= hi` (or the strict forms) as an inclusive range
fn pattern_bounds(pattern: &Pattern) -> Option<(i128, i128)> {
    let Pattern::And(a, b) = pattern else {
        return None;
    };
    let bound = |p: &Pattern| match p {
        Pattern::Relational { op, value } => Some((*op, value.as_i128()?)),
        _ => None,
    };
    let (lo, hi) = match (bound(a)?, bound(b)?) {
        (lower @ (BinOp::Ge | BinOp::Gt, _), upper @ (BinOp::Le | BinOp::Lt, _)) => (lower, upper),
        (upper @ (BinOp::Le | BinOp::Lt, _), lower @ (BinOp::Ge | BinOp::Gt, _)) => (lower, upper),
        _ => return None,
    };
    let lo = if lo.0 == BinOp::Gt { lo.1.checked_add(1)? } else { lo.1 };
    let hi = if hi.0 == BinOp::Lt { hi.1.checked_sub(1)? } else { hi.1 };
    Some((lo, hi))
}

fn literal(ty: &Type, n: i128) -> Option<Node> {
    Value::from_i128(ty, n).map(Node::literal)
}

/// `subject - min` computed in the subject's promoted type
fn offset(subject: &Node, ty: &Type, min: i128) -> Option<Node> {
    let promoted = numeric::unary_promote(ty)?;
    if min == 0 {
        return Some(subject.clone());
    }
    Some(Node::binary(BinOp::Sub, subject.clone(), literal(&promoted, min)?))
}

/// `lo <= subject && subject <= hi` as a single unsigned comparison
pub fn range_check(subject: &Node, ty: &Type, lo: i128, hi: i128) -> Option<Node> {
    let promoted = numeric::unary_promote(ty)?;
    if !promoted.is_integer() || !promoted.contains(lo) || !promoted.contains(hi) || lo > hi {
        return None;
    }
    let unsigned = promoted.to_unsigned();
    let shifted = offset(subject, ty, lo)?;
    let lhs = if promoted.is_unsigned() {
        shifted
    } else {
        Node::cast(unsigned.clone(), shifted)
    };
    Some(Node::binary(BinOp::Le, lhs, literal(&unsigned, hi - lo)?))
}

/// Distinct keys, ascending, all representable in `ty`
fn normalize(ty: &Type, mut keys: Vec<i128>) -> Option<Vec<i128>> {
    keys.sort_unstable();
    keys.dedup();
    keys.iter().all(|k| ty.contains(*k)).then_some(keys)
}

/// Common difference of an arithmetic progression of at least three keys
fn stride(keys: &[i128]) -> Option<i128> {
    let step = keys.get(1)? - keys.first()?;
    let uniform = keys.len() >= MIN_KEYS && keys.windows(2).all(|w| w[1] - w[0] == step);
    (uniform && step > 1).then_some(step)
}

fn emit(subject: &Node, ty: &Type, keys: Vec<i128>) -> Option<Node> {
    if !ty.is_integral() {
        return None;
    }
    let keys = normalize(ty, keys)?;
    let promoted = numeric::unary_promote(ty)?;
    let (&min, &max) = (keys.first()?, keys.last()?);
    let span = max - min;

    if keys.len() == 1 {
        return Some(Node::binary(BinOp::Eq, subject.clone(), literal(&promoted, min)?));
    }
    let bounds = range_check(subject, ty, min, max)?;
    if span + 1 == keys.len() as i128 {
        return Some(bounds);
    }

    let membership = match stride(&keys) {
        Some(step) => {
            let rem = Node::binary(BinOp::Rem, offset(subject, ty, min)?, literal(&promoted, step)?);
            Node::binary(BinOp::Eq, rem, literal(&promoted, 0)?)
        }
        None => bit_test(subject, ty, &keys, min, max)?,
    };
    Some(Node::binary(BinOp::And, bounds, membership))
}

/// `((mask >> index) & 1) != 0` with the narrowest mask that holds the keys
fn bit_test(subject: &Node, ty: &Type, keys: &[i128], min: i128, max: i128) -> Option<Node> {
    let (mask_ty, base) = [(Type::U32, 32), (Type::U64, 64)]
        .into_iter()
        .find_map(|(mask_ty, width)| {
            if min >= 0 && max < width {
                Some((mask_ty, 0))
            } else if max - min < width {
                Some((mask_ty, min))
            } else {
                None
            }
        })?;
    let mask = keys.iter().fold(0i128, |mask, k| mask | (1i128 << (k - base)));
    let index = offset(subject, ty, base)?;
    let shifted = Node::binary(BinOp::Shr, literal(&mask_ty, mask)?, index);
    let bit = Node::binary(BinOp::BitAnd, shifted, literal(&mask_ty, 1)?);
    Some(Node::binary(BinOp::Ne, bit, literal(&mask_ty, 0)?))
}
