//! Type annotation tracking

use serde::{Deserialize, Serialize};

use super::Type;

/// A value with its optional resolved semantic type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Typed<T> {
    pub node: T,
    #[serde(default)]
    pub ty: Option<Type>,
}

impl<T> Typed<T> {
    pub fn new(node: T, ty: Option<Type>) -> Self {
        Self { node, ty }
    }

    pub fn untyped(node: T) -> Self {
        Self { node, ty: None }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Typed<U> {
        Typed {
            node: f(self.node),
            ty: self.ty,
        }
    }

    /// Replace the annotation
    pub fn with_ty(mut self, ty: Option<Type>) -> Self {
        self.ty = ty;
        self
    }
}

/// Annotations are not part of a node's identity: two trees that differ only
/// in how much type information was resolved are the same tree.
impl<T: PartialEq> PartialEq for Typed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}
