//! Error types for filter compilation.
//!
//! Every failure the compiler can produce is either a caller-input error
//! (a malformed filter, an unknown column) or a programming error (an
//! unknown node variant, an invalid encoder configuration). None of them
//! are transient, so nothing here is ever retried.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: W{category}{number}
//! - 1xxx: Filter errors (bad JSON, unsupported operator, bad operand)
//! - 2xxx: Column errors (legacy direct-SQL rendering)
//! - 3xxx: AST errors (unknown variant tag)
//! - 4xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use wql_query::{ErrorCode, WqlError};
//!
//! let err = WqlError::unsupported_operator("name", "$regex");
//! assert_eq!(err.code, ErrorCode::UnsupportedOperator);
//! assert!(err.to_string().contains("$regex"));
//! assert!(err.is_user_error());
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for compiler operations.
pub type WqlResult<T> = Result<T, WqlError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Filter errors (1xxx)
    /// Filter text is not valid JSON (W1001).
    InvalidJson = 1001,
    /// Filter has the wrong overall shape (W1002).
    InvalidFilter = 1002,
    /// Operator key is not part of the grammar (W1003).
    UnsupportedOperator = 1003,
    /// Operator used with a value of the wrong shape (W1004).
    InvalidOperand = 1004,

    // Column errors (2xxx)
    /// Column not present in the allow-list (W2001).
    InvalidColumn = 2001,

    // AST errors (3xxx)
    /// Node variant tag outside the closed set (W3001).
    UnknownVariant = 3001,

    // Configuration errors (4xxx)
    /// Invalid encoder configuration (W4001).
    InvalidConfiguration = 4001,

    // Internal errors (9xxx)
    /// Internal error (W9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "W1001").
    pub fn code(&self) -> String {
        format!("W{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidJson => "Invalid JSON",
            Self::InvalidFilter => "Invalid filter",
            Self::UnsupportedOperator => "Unsupported operator",
            Self::InvalidOperand => "Invalid operand",
            Self::InvalidColumn => "Invalid column",
            Self::UnknownVariant => "Unknown query variant",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The filter key involved.
    pub key: Option<String>,
    /// The operator involved.
    pub operator: Option<String>,
    /// The column involved.
    pub column: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur while parsing or compiling a filter.
#[derive(Error, Debug)]
pub struct WqlError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for WqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl WqlError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Set the filter key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.context.key = Some(key.into());
        self
    }

    /// Set the operator.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.context.operator = Some(operator.into());
        self
    }

    /// Set the column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.context.column = Some(column.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Filter text could not be decoded as JSON.
    pub fn invalid_json(source: serde_json::Error) -> Self {
        Self::new(
            ErrorCode::InvalidJson,
            format!("Filter is not valid JSON: {}", source),
        )
        .with_source(source)
    }

    /// Filter has the wrong shape.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFilter, message)
            .with_help("A filter is a JSON object, or an array of objects combined with OR")
    }

    /// Operator key is not part of the grammar.
    pub fn unsupported_operator(key: impl Into<String>, operator: impl Into<String>) -> Self {
        let key = key.into();
        let operator = operator.into();
        Self::new(
            ErrorCode::UnsupportedOperator,
            format!("Unsupported operator '{}' for key '{}'", operator, key),
        )
        .with_key(key)
        .with_operator(operator)
        .with_suggestion("Use one of $neq, $gt, $gte, $lt, $lte, $like or $in")
    }

    /// Operator used with a value of the wrong shape.
    pub fn invalid_operand(
        key: impl Into<String>,
        operator: impl Into<String>,
        expected: &str,
    ) -> Self {
        let key = key.into();
        let operator = operator.into();
        Self::new(
            ErrorCode::InvalidOperand,
            format!(
                "Operator '{}' on key '{}' expects {}",
                operator, key, expected
            ),
        )
        .with_key(key)
        .with_operator(operator)
    }

    /// Column is not in the allow-list.
    pub fn invalid_column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(
            ErrorCode::InvalidColumn,
            format!("Invalid column name: {}", column),
        )
        .with_column(column)
    }

    /// Node variant tag is outside the closed set.
    pub fn unknown_variant(variant: impl Into<String>) -> Self {
        let variant = variant.into();
        Self::new(
            ErrorCode::UnknownVariant,
            format!("Unknown query variant: {}", variant),
        )
        .with_help("Tag queries are produced by query_to_tagquery; this indicates corrupt input")
    }

    /// Encoder configuration is invalid.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    /// Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if this error was caused by the caller's filter input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidJson
                | ErrorCode::InvalidFilter
                | ErrorCode::UnsupportedOperator
                | ErrorCode::InvalidOperand
                | ErrorCode::InvalidColumn
        )
    }

    /// Check if this error indicates a broken invariant or setup.
    pub fn is_fatal(&self) -> bool {
        !self.is_user_error()
    }

    /// Compilation is deterministic, so no error is retryable.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref key) = self.context.key {
            output.push_str(&format!("  → Key: {}\n", key));
        }
        if let Some(ref operator) = self.context.operator {
            output.push_str(&format!("  → Operator: {}\n", operator));
        }
        if let Some(ref column) = self.context.column {
            output.push_str(&format!("  → Column: {}\n", column));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}
