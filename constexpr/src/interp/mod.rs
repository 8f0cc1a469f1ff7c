//! Interpreter for constant evaluation

mod env;
mod error;
mod eval;
pub mod numeric;
mod value;

pub use env::{Environment, VariableItem};
pub use error::{ErrorKind, EvalError, EvalResult};
pub use eval::Interpreter;
pub use value::Value;
