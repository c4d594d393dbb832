//! Engine error types
//!
//! Parse errors are fatal for the stylesheet source they occur in. All
//! evaluation-time errors are contained: expressions degrade to null and the
//! failure is logged, so one broken declaration never prevents a primitive
//! from being styled.

use thiserror::Error;

/// Fatal stylesheet error with source position. Rejects the whole source.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("{line}:{column}: {message}")]
    Syntax { line: u32, column: u32, message: String },

    #[error("{line}:{column}: unknown function '{name}'")]
    UnknownFunction { line: u32, column: u32, name: String },

    #[error("{line}:{column}: wrong number of arguments for '{name}': expected {expected}, got {got}")]
    WrongArity { line: u32, column: u32, name: String, expected: String, got: usize },

    #[error("{line}:{column}: invalid regex /{pattern}/: {message}")]
    InvalidRegex { line: u32, column: u32, pattern: String, message: String },
}

impl ParseError {
    pub(crate) fn syntax(line: u32, column: u32, message: impl Into<String>) -> Self {
        ParseError::Syntax { line, column, message: message.into() }
    }
}

/// Recoverable per-expression failure. Logged by the evaluator, which then
/// yields null for the offending expression.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("type mismatch in '{function}': expected {expected}")]
    TypeMismatch { function: &'static str, expected: &'static str },

    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("missing argument {index} to '{function}'")]
    MissingArgument { function: &'static str, index: usize },
}

/// Contract violation in [`DividedScale::put`](crate::DividedScale::put).
///
/// Raised instead of silently corrupting the cache partition; callers must
/// treat it as a bug signal in the evaluation driver, not as a normal
/// runtime condition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("range violated: {0}")]
pub struct RangeViolation(pub String);
