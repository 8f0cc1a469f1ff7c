//! Evaluation errors for the interpreter
//!
//! None of these escape the public API: a failed evaluation surfaces as
//! "no value". The kinds exist so traces can say why evaluation gave up and
//! so control flow can travel through `?` like any other early exit.

use std::fmt;

use super::Value;

/// Error during evaluation
#[derive(Debug, Clone)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of evaluation errors
#[derive(Debug, Clone)]
pub enum ErrorKind {
    /// An operand has no statically known value
    UnknownValue,
    /// Name not bound in the environment
    UndefinedVariable,
    /// Node kind or operator has no evaluation rule
    Unsupported,
    /// Operand types do not fit the operator
    TypeMismatch,
    /// Integer division or remainder by zero
    DivisionByZero,
    /// Trapping overflow such as `MIN / -1`
    Overflow,
    /// Loop exceeded the configured iteration bound
    IterationLimit,
    /// Nesting exceeded the configured depth bound
    DepthLimit,
    /// Host method could not be resolved or failed
    MethodFailed,
    /// Control flow: break from loop
    Break,
    /// Control flow: continue to next loop iteration
    Continue,
    /// Control flow: early return (with optional value)
    Return(Option<Box<Value>>),
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        // Control-flow payloads are not part of the error identity
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl ErrorKind {
    /// Break, Continue and Return are signals, not failures
    pub fn is_control_flow(&self) -> bool {
        matches!(self, ErrorKind::Break | ErrorKind::Continue | ErrorKind::Return(_))
    }
}

impl EvalError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        EvalError {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_value(what: &str) -> Self {
        Self::new(ErrorKind::UnknownValue, format!("value of {what} is not known"))
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            format!("undefined variable: {name}"),
        )
    }

    pub fn unsupported(what: &str) -> Self {
        Self::new(ErrorKind::Unsupported, format!("cannot evaluate {what}"))
    }

    pub fn type_mismatch(op: &str, got: &str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("operator {op} does not apply to {got}"),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero")
    }

    pub fn overflow(op: &str) -> Self {
        Self::new(ErrorKind::Overflow, format!("arithmetic overflow in {op}"))
    }

    pub fn iteration_limit(limit: usize) -> Self {
        Self::new(
            ErrorKind::IterationLimit,
            format!("loop exceeded {limit} iterations"),
        )
    }

    pub fn depth_limit(limit: usize) -> Self {
        Self::new(
            ErrorKind::DepthLimit,
            format!("evaluation nested deeper than {limit}"),
        )
    }

    pub fn method_failed(name: &str) -> Self {
        Self::new(ErrorKind::MethodFailed, format!("cannot execute {name}"))
    }

    pub fn break_signal() -> Self {
        Self::new(ErrorKind::Break, "break outside of loop")
    }

    pub fn continue_signal() -> Self {
        Self::new(ErrorKind::Continue, "continue outside of loop")
    }

    pub fn return_signal(value: Option<Value>) -> Self {
        Self::new(ErrorKind::Return(value.map(Box::new)), "return")
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Evaluation error: {}", self.message)
    }
}

impl std::error::Error for EvalError {}

/// Result type for interpreter operations
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_value() {
        let err = EvalError::unknown_value("x");
        assert_eq!(err.kind, ErrorKind::UnknownValue);
        assert!(err.message.contains('x'));
    }

    #[test]
    fn test_division_by_zero_message() {
        let err = EvalError::division_by_zero();
        assert_eq!(err.message, "division by zero");
        assert!(err.to_string().starts_with("Evaluation error:"));
    }

    #[test]
    fn test_return_eq_ignores_payload() {
        let a = ErrorKind::Return(Some(Box::new(Value::I32(1))));
        let b = ErrorKind::Return(None);
        assert_eq!(a, b);
        assert_ne!(a, ErrorKind::Break);
    }

    #[test]
    fn test_control_flow_classification() {
        assert!(EvalError::break_signal().kind.is_control_flow());
        assert!(EvalError::continue_signal().kind.is_control_flow());
        assert!(EvalError::return_signal(None).kind.is_control_flow());
        assert!(!EvalError::overflow("/").kind.is_control_flow());
    }

    #[test]
    fn test_iteration_limit_mentions_bound() {
        let err = EvalError::iteration_limit(64);
        assert_eq!(err.kind, ErrorKind::IterationLimit);
        assert!(err.message.contains("64"));
    }
}
