//! Error types for sqlbridge.
//!
//! Two families live here. [`Issue`] is the conversion taxonomy: it never
//! escapes [`crate::convert`] as an `Err`, it is recorded as data and its
//! `Display` text is the reason shown to the reviewer. [`BridgeError`] covers
//! the shell around the engine (files, configuration).

use std::path::PathBuf;

use thiserror::Error;

use crate::mapping::Arity;

/// A problem found while converting one statement or call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Issue {
    #[error("unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated bracketed identifier")]
    UnterminatedIdentifier,

    #[error("unbalanced braces")]
    UnbalancedBraces,

    /// No mapping entry exists for the function.
    #[error("{0} function not supported")]
    UnsupportedFunction(String),

    /// A mapping exists but the call cannot be converted mechanically.
    #[error("{0}")]
    ManualReview(String),

    /// A restructuring rule received the wrong number of arguments.
    #[error("{function} expects {expected} argument(s), found {found}; manual review required")]
    ArityMismatch {
        function: String,
        expected: Arity,
        found: usize,
    },

    /// A dialect construct that has no target equivalent.
    #[error("{0} not supported")]
    UnsupportedConstruct(String),
}

impl Issue {
    /// Create a manual review issue.
    pub fn review(reason: impl Into<String>) -> Self {
        Self::ManualReview(reason.into())
    }
}

/// Errors raised outside the conversion core.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The input file cannot be converted.
    #[error("Invalid input file {path}: {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    /// Configuration file could not be parsed.
    #[error("Configuration error in {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration parsed but holds an unusable value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Report serialization failed.
    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Create an invalid input error for the given path.
    pub fn invalid_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for sqlbridge shell operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display() {
        assert_eq!(Issue::UnbalancedParentheses.to_string(), "unbalanced parentheses");
        assert_eq!(
            Issue::UnsupportedFunction("FOO_BAR".into()).to_string(),
            "FOO_BAR function not supported"
        );
    }

    #[test]
    fn test_arity_display() {
        let issue = Issue::ArityMismatch {
            function: "STARTSWITH".into(),
            expected: Arity::Exact(2),
            found: 1,
        };
        assert_eq!(
            issue.to_string(),
            "STARTSWITH expects 2 argument(s), found 1; manual review required"
        );
    }

    #[test]
    fn test_invalid_input_display() {
        let err = BridgeError::invalid_input("a.csv", "unsupported file type");
        assert_eq!(err.to_string(), "Invalid input file a.csv: unsupported file type");
    }
}
