use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::form::Field;

/// Service-supplied explanation of an HTTP failure.
///
/// The prediction service returns either a plain string or an arbitrary JSON
/// value under `detail`; both are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Text(String),
    Structured(serde_json::Value),
}

impl ErrorDetail {
    /// Render the detail as a single line of text. Whitespace runs in text
    /// collapse to one space; structured values use compact JSON.
    pub fn render(&self) -> String {
        match self {
            ErrorDetail::Text(text) => collapse_whitespace(text),
            ErrorDetail::Structured(value) => value.to_string(),
        }
    }
}

/// Join whitespace-separated words with single spaces, dropping newlines.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Failure of a single prediction attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    /// A response was obtained but its status indicated failure.
    #[error("Error {status}: {detail}")]
    Http { status: u16, detail: ErrorDetail },

    /// No response was obtained (connection refused, DNS failure, timeout).
    #[error("{message}")]
    Network { message: String },
}

impl RequestError {
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Http { .. } => "http",
            RequestError::Network { .. } => "network",
        }
    }
}

/// A single field that could not be coerced into its typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{field}: '{raw}' is not a number")]
    NotANumber { field: Field, raw: String },

    #[error("{field}: a date is required")]
    MissingDate { field: Field },

    #[error("{field}: '{raw}' is not a YYYY-MM-DD date")]
    InvalidDate { field: Field, raw: String },

    #[error("Unknown field '{0}'")]
    UnknownField(String),
}

impl FieldError {
    pub fn field(&self) -> Option<Field> {
        match self {
            FieldError::NotANumber { field, .. }
            | FieldError::MissingDate { field }
            | FieldError::InvalidDate { field, .. } => Some(*field),
            FieldError::UnknownField(_) => None,
        }
    }
}

/// Blocks submission: at least one field does not hold a valid value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid input: {}", join_issues(.issues))]
pub struct FormError {
    pub issues: Vec<FieldError>,
}

fn join_issues(issues: &[FieldError]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
