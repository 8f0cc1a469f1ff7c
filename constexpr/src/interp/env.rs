//! Environment for variable bindings
//!
//! Bindings live in a flat arena of slots. Entering a scope records the
//! arena length; leaving it truncates back, so a lookup that scans from the
//! end always resolves to the innermost active binding. Cloning the
//! environment is how branches and trial evaluations get a private copy.

use serde::{Deserialize, Serialize};

use super::Value;
use crate::ast::Type;

/// Statically known facts about one variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableItem {
    pub ty: Type,
    /// Known value; `None` means unknown
    #[serde(default)]
    pub value: Option<Value>,
    /// Whether the variable has been definitely assigned
    #[serde(default = "default_initialized")]
    pub initialized: bool,
    /// Declared lower bound used for range reasoning
    #[serde(default)]
    pub min: Option<Value>,
    /// Declared upper bound used for range reasoning
    #[serde(default)]
    pub max: Option<Value>,
}

fn default_initialized() -> bool {
    true
}

impl VariableItem {
    pub fn known(value: Value) -> Self {
        VariableItem {
            ty: value.ty(),
            value: Some(value),
            initialized: true,
            min: None,
            max: None,
        }
    }

    pub fn unknown(ty: Type) -> Self {
        VariableItem {
            ty,
            value: None,
            initialized: true,
            min: None,
            max: None,
        }
    }

    /// Declared without initializer
    pub fn uninitialized(ty: Type) -> Self {
        VariableItem {
            initialized: false,
            ..VariableItem::unknown(ty)
        }
    }

    pub fn with_bounds(mut self, min: Option<Value>, max: Option<Value>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    name: String,
    item: VariableItem,
}

/// Scoped variable environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    slots: Vec<Slot>,
    /// Arena length at each scope entry
    marks: Vec<usize>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an environment from bindings, outermost first
    pub fn from_bindings<I, S>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (S, VariableItem)>,
        S: Into<String>,
    {
        let mut env = Environment::new();
        for (name, item) in bindings {
            env.declare(name, item);
        }
        env
    }

    /// Bind a known value, inferring the type from it
    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.declare(name, VariableItem::known(value));
        self
    }

    /// Bind an unknown value of the given type
    pub fn with_unknown(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.declare(name, VariableItem::unknown(ty));
        self
    }

    pub fn push_scope(&mut self) {
        self.marks.push(self.slots.len());
    }

    /// Drop every binding made since the matching `push_scope`
    pub fn pop_scope(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.slots.truncate(mark);
        }
    }

    /// Current scope depth (0 = outermost)
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    /// Introduce a binding in the current scope, shadowing outer ones
    pub fn declare(&mut self, name: impl Into<String>, item: VariableItem) {
        let name = name.into();
        let scope_start = self.marks.last().copied().unwrap_or(0);
        if let Some(slot) = self.slots[scope_start..]
            .iter_mut()
            .find(|slot| slot.name == name)
        {
            slot.item = item;
            return;
        }
        self.slots.push(Slot { name, item });
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().rposition(|slot| slot.name == name)
    }

    pub fn lookup(&self, name: &str) -> Option<&VariableItem> {
        self.position(name).map(|i| &self.slots[i].item)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut VariableItem> {
        self.position(name).map(move |i| &mut self.slots[i].item)
    }

    /// Known value of the innermost binding
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.lookup(name).and_then(|item| item.value.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Update the innermost binding. Returns false when the name is unbound.
    pub fn assign(&mut self, name: &str, value: Option<Value>) -> bool {
        match self.lookup_mut(name) {
            Some(item) => {
                item.value = value;
                item.initialized = true;
                true
            }
            None => false,
        }
    }

    /// Forget the value of a binding, keeping its type
    pub fn invalidate(&mut self, name: &str) {
        if let Some(item) = self.lookup_mut(name) {
            item.value = None;
        }
    }

    /// Read-only view of the visible bindings that have a known value
    pub fn known(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().enumerate().filter_map(move |(i, slot)| {
            let visible = self.position(&slot.name) == Some(i);
            match (&slot.item.value, visible) {
                (Some(value), true) => Some((slot.name.as_str(), value)),
                _ => None,
            }
        })
    }

    /// Visible binding names, innermost binding of each name only
    pub fn names(&self) -> Vec<&str> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(i, slot)| self.position(&slot.name) == Some(*i))
            .map(|(_, slot)| slot.name.as_str())
            .collect()
    }

    /// Join with the environment of another control-flow path: a value stays
    /// known only when both paths agree on it.
    pub fn merge(&mut self, other: &Environment) {
        for (mine, theirs) in self.slots.iter_mut().zip(other.slots.iter()) {
            if mine.name == theirs.name && mine.item.value != theirs.item.value {
                mine.item.value = None;
            }
            if mine.name == theirs.name {
                mine.item.initialized &= theirs.item.initialized;
            }
        }
        if other.slots.len() < self.slots.len() {
            for slot in &mut self.slots[other.slots.len()..] {
                slot.item.value = None;
            }
        }
    }
}
