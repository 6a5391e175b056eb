//! Error types for SQL validation

use thiserror::Error;

/// Validation failures surfaced to callers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// SQL text could not be parsed under the requested dialect
    #[error("Invalid SQL syntax for {dialect}: {message}")]
    InvalidSyntax { dialect: String, message: String },

    /// Parse tree contains a mutating or administrative statement
    #[error(
        "The query must be a SELECT (or UNION of SELECTs). Found disallowed statement: {kind}."
    )]
    DisallowedStatement { kind: String },

    /// Query references tables outside the caller's allow-list
    #[error("Disallowed tables found: {}", .tables.join(", "))]
    DisallowedTable { tables: Vec<String> },

    /// Dialect name not recognised by the parser
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// Configuration value rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure reported by a [`Parser`](crate::sql_parser::Parser) implementation
///
/// The validator wraps these into [`GuardError`] together with the dialect
/// the caller asked for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Text is not valid SQL for the dialect
    #[error("{0}")]
    Syntax(String),

    /// Dialect name unknown to this parser
    #[error("unknown dialect '{0}'")]
    UnknownDialect(String),
}

impl GuardError {
    /// Wrap a parser failure for the given dialect
    pub fn from_parse(err: ParseError, dialect: &str) -> Self {
        match err {
            ParseError::Syntax(message) => GuardError::InvalidSyntax {
                dialect: dialect.to_string(),
                message,
            },
            ParseError::UnknownDialect(name) => GuardError::UnsupportedDialect(name),
        }
    }

    /// Whether this is a policy rejection rather than an input problem
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            GuardError::DisallowedStatement { .. } | GuardError::DisallowedTable { .. }
        )
    }
}
