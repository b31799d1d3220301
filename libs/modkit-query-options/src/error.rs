//! Error taxonomy for parsing, validating and applying query options.
//!
//! Every variant names the offending option so a client can correct the
//! request; see [`Error::option_name`].

use crate::allowed::QueryOptionKind;
use crate::grammar::GrammarError;

/// Unified error type for query-option processing.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A required argument was never supplied.
    #[error("argument '{0}' is required")]
    ArgumentNull(&'static str),

    /// An argument was supplied but names nothing in the schema.
    #[error("argument '{argument}' names unknown schema element '{name}'")]
    UnknownSchemaElement { argument: &'static str, name: String },

    #[error("malformed query string: {0}")]
    InvalidQueryString(String),

    #[error("the query option '{}' must not be empty", .0.canonical_name())]
    EmptyQueryOption(QueryOptionKind),

    #[error("the query option '{}' was specified more than once", .0.canonical_name())]
    DuplicateQueryOption(QueryOptionKind),

    #[error("invalid integer '{value}' for query option '{}'", .option.canonical_name())]
    InvalidInteger {
        option: QueryOptionKind,
        value: String,
    },

    #[error("query option '{}' must be non-negative, got {value}", .option.canonical_name())]
    NegativeValue {
        option: QueryOptionKind,
        value: String,
    },

    #[error("invalid boolean '{value}' for query option '{}'", .option.canonical_name())]
    InvalidBoolean {
        option: QueryOptionKind,
        value: String,
    },

    #[error("invalid {}: {source}", .option.canonical_name())]
    Grammar {
        option: QueryOptionKind,
        #[source]
        source: GrammarError,
    },

    #[error("query option '{0}' is not allowed")]
    DisallowedQueryOption(QueryOptionKind),

    #[error("query option '{}' exceeds a configured limit: {reason}", .option.canonical_name())]
    LimitExceeded {
        option: QueryOptionKind,
        reason: String,
    },
}

impl Error {
    /// The option kind this error is about, when there is one.
    #[must_use]
    pub fn option(&self) -> Option<QueryOptionKind> {
        match self {
            Error::ArgumentNull(_)
            | Error::UnknownSchemaElement { .. }
            | Error::InvalidQueryString(_) => None,
            Error::EmptyQueryOption(kind)
            | Error::DuplicateQueryOption(kind)
            | Error::DisallowedQueryOption(kind) => Some(*kind),
            Error::InvalidInteger { option, .. }
            | Error::NegativeValue { option, .. }
            | Error::InvalidBoolean { option, .. }
            | Error::Grammar { option, .. }
            | Error::LimitExceeded { option, .. } => Some(*option),
        }
    }

    /// Canonical name of the offending option (or argument).
    #[must_use]
    pub fn option_name(&self) -> &'static str {
        match self {
            Error::ArgumentNull(argument) | Error::UnknownSchemaElement { argument, .. } => {
                *argument
            }
            Error::InvalidQueryString(_) => "query",
            other => other
                .option()
                .map_or("", QueryOptionKind::canonical_name),
        }
    }

    pub(crate) fn limit(option: QueryOptionKind, reason: impl Into<String>) -> Self {
        Error::LimitExceeded {
            option,
            reason: reason.into(),
        }
    }
}
