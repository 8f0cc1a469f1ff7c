//! Error types and reporting
//!
//! The engine itself never fails: undecidable or unsupported input simply
//! leaves a tree unchanged. These errors cover the surface around it:
//! reading input files, decoding trees and environments, loading options.

use std::ops::Range;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error outside the engine core
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO error: {message}")]
    Io { message: String },

    /// Malformed JSON tree or environment
    #[error("JSON error at {line}:{column}: {message}")]
    Json {
        message: String,
        line: usize,
        column: usize,
    },

    /// Malformed options file
    #[error("Config error: {message}")]
    Config { message: String },

    /// Well-formed input the engine cannot work with
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl EngineError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Byte range in `source` the error points at, if it has a location
    pub fn span(&self, source: &str) -> Option<Range<usize>> {
        match self {
            Self::Json { line, column, .. } if *line > 0 => {
                let line_start: usize = source
                    .split_inclusive('\n')
                    .take(line - 1)
                    .map(str::len)
                    .sum();
                let start = (line_start + column.saturating_sub(1)).min(source.len());
                Some(start..(start + 1).min(source.len()).max(start))
            }
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Io { message }
            | Self::Json { message, .. }
            | Self::Config { message }
            | Self::InvalidInput { message } => message,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &EngineError) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = match error {
        EngineError::Io { .. } => "IO",
        EngineError::Json { .. } => "JSON",
        EngineError::Config { .. } => "Config",
        EngineError::InvalidInput { .. } => "Input",
    };

    let report = match error.span(source) {
        Some(span) => Report::build(ReportKind::Error, (filename, span.clone()))
            .with_message(format!("{kind} error"))
            .with_label(
                Label::new((filename, span))
                    .with_message(error.message())
                    .with_color(Color::Red),
            )
            .finish(),
        None => Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(format!("{kind} error: {}", error.message()))
            .finish(),
    };
    if report.eprint((filename, Source::from(source))).is_err() {
        eprintln!("{kind} error: {}", error.message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_conversion() {
        let err: EngineError = serde_json::from_str::<serde_json::Value>("{\n  \"a\": ,\n}")
            .unwrap_err()
            .into();
        match &err {
            EngineError::Json { line, .. } => assert_eq!(*line, 2),
            other => panic!("expected JSON error, got {other:?}"),
        }
        assert!(err.to_string().starts_with("JSON error at 2:"));
    }

    #[test]
    fn test_json_span_points_into_source() {
        let source = "{\n  \"a\": ,\n}";
        let err = EngineError::Json {
            message: "expected value".into(),
            line: 2,
            column: 8,
        };
        let span = err.span(source).unwrap();
        assert_eq!(&source[span], ",");
    }

    #[test]
    fn test_errors_without_location() {
        let err = EngineError::config("bad level");
        assert_eq!(err.span("anything"), None);
        assert_eq!(err.message(), "bad level");
        assert_eq!(err.to_string(), "Config error: bad level");
    }
}
