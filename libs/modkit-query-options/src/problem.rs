//! Mapping from query-option errors to RFC 9457 problem details.
//!
//! The problem is pure data; the transport layer adds the instance path and
//! trace id before rendering it.

use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;
use crate::grammar::GrammarError;

pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
fn serialize_status<S: Serializer>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(status.as_u16())
}

fn deserialize_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StatusCode, D::Error> {
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

/// RFC 9457 problem details for a rejected query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    #[serde(serialize_with = "serialize_status", deserialize_with = "deserialize_status")]
    pub status: StatusCode,
    pub detail: String,
    pub instance: String,
    /// Machine-readable error code, e.g. `query_options.disallowed`.
    pub code: String,
    pub trace_id: Option<String>,
    pub errors: Option<Vec<ValidationViolation>>,
}

/// A violation tied to one query option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationViolation {
    /// Canonical option name, e.g. `$filter`.
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_owned(),
            title: title.into(),
            status,
            detail: detail.into(),
            instance: String::new(),
            code: String::new(),
            trace_id: None,
            errors: None,
        }
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = uri.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<ValidationViolation>) -> Self {
        self.errors = Some(errors);
        self
    }
}

impl Error {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Error::ArgumentNull(_) => "query_options.argument_null",
            Error::UnknownSchemaElement { .. } => "query_options.unknown_schema_element",
            Error::InvalidQueryString(_) => "query_options.invalid_query_string",
            Error::EmptyQueryOption(_) => "query_options.empty",
            Error::DuplicateQueryOption(_) => "query_options.duplicate",
            Error::InvalidInteger { .. } => "query_options.invalid_integer",
            Error::NegativeValue { .. } => "query_options.negative_value",
            Error::InvalidBoolean { .. } => "query_options.invalid_boolean",
            Error::Grammar { source, .. } => match source {
                GrammarError::ParsingUnavailable(_) => "query_options.parsing_unavailable",
                _ => "query_options.syntax",
            },
            Error::DisallowedQueryOption(_) => "query_options.disallowed",
            Error::LimitExceeded { .. } => "query_options.limit_exceeded",
        }
    }

    /// 500 for misconfiguration, 400 for anything the client sent.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Error::ArgumentNull(_)
            | Error::UnknownSchemaElement { .. }
            | Error::Grammar {
                source: GrammarError::ParsingUnavailable(_),
                ..
            } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<Error> for Problem {
    fn from(err: Error) -> Self {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(error = %err, "query option processing misconfigured");
            return Problem::new(
                status,
                "Internal Server Error",
                "An internal error occurred while processing the query options",
            )
            .with_code(err.code());
        }

        let title = match &err {
            Error::DisallowedQueryOption(_) => "Query Option Not Allowed",
            Error::LimitExceeded { .. } => "Query Option Limit Exceeded",
            _ => "Invalid Query Option",
        };
        let detail = err.to_string();
        Problem::new(status, title, detail.clone())
            .with_code(err.code())
            .with_errors(vec![ValidationViolation {
                field: err.option_name().to_owned(),
                message: detail,
                code: Some(err.code().to_owned()),
            }])
    }
}
