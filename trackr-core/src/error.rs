//! Error types for trackr operations

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failures talking to the remote tracker.
///
/// Every variant names the operation that failed. These are never
/// reinterpreted as resolution outcomes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("{operation} failed with status {status}: {message}")]
    Http {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("{operation} failed: {reason}")]
    Network { operation: String, reason: String },

    #[error("{operation} returned an unreadable response: {reason}")]
    Decode { operation: String, reason: String },

    #[error("{operation} timed out after {elapsed_ms}ms")]
    Timeout { operation: String, elapsed_ms: u64 },

    #[error("{operation} still returned full pages after {pages} pages; refusing to continue")]
    SweepLimitExceeded { operation: String, pages: usize },
}

impl TransportError {
    pub fn operation(&self) -> &str {
        match self {
            Self::Http { operation, .. }
            | Self::Network { operation, .. }
            | Self::Decode { operation, .. }
            | Self::Timeout { operation, .. }
            | Self::SweepLimitExceeded { operation, .. } => operation,
        }
    }
}

/// Field metadata that exists but cannot back an enum resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Project {project} has no field named {field}")]
    UnknownField { project: String, field: String },

    #[error("Field {field} in project {project} is a {kind} field and has no fixed values")]
    NotEnumerable {
        project: String,
        field: String,
        kind: String,
    },
}

/// Malformed caller input detected before any remote call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Command does not name any known field: {command}")]
    UnrecognizedCommand { command: String },
}

/// Why a resolution attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveErrorKind {
    EmptyQuery,
    NotFound,
    Ambiguous,
}

/// A resolution failure meant to be shown verbatim to the user or agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveError {
    pub kind: ResolveErrorKind,
    pub field: String,
    pub query: String,
    pub message: String,
    /// Display strings, not raw entities.
    pub candidates: Vec<String>,
    pub suggestion: String,
}

impl ResolveError {
    pub fn empty_query(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            kind: ResolveErrorKind::EmptyQuery,
            message: format!("No value given for {}", field),
            suggestion: format!("Provide a non-empty value for {}", field),
            field,
            query: String::new(),
            candidates: Vec::new(),
        }
    }

    pub fn not_found(
        field: impl Into<String>,
        query: impl Into<String>,
        candidates: Vec<String>,
    ) -> Self {
        let field = field.into();
        let query = query.into();
        Self {
            kind: ResolveErrorKind::NotFound,
            message: format!("No {} matches '{}'", field, query),
            suggestion: format!("Use one of the listed {} values", field),
            field,
            query,
            candidates,
        }
    }

    pub fn ambiguous(
        field: impl Into<String>,
        query: impl Into<String>,
        candidates: Vec<String>,
    ) -> Self {
        let field = field.into();
        let query = query.into();
        Self {
            kind: ResolveErrorKind::Ambiguous,
            message: format!(
                "'{}' matches {} {} values equally well",
                query,
                candidates.len(),
                field
            ),
            suggestion: "Use a more specific query, such as the exact value".to_string(),
            field,
            query,
            candidates,
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.candidates.is_empty() {
            write!(f, "\nCandidates:")?;
            for candidate in &self.candidates {
                write!(f, "\n  - {}", candidate)?;
            }
        }
        write!(f, "\n{}", self.suggestion)
    }
}

impl std::error::Error for ResolveError {}

/// Master error type for all trackr errors.
#[derive(Debug, Clone, Error)]
pub enum TrackrError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Field error: {0}")]
    Field(#[from] FieldError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("{0}")]
    Resolve(#[from] ResolveError),
}

/// Result type alias for trackr operations.
pub type TrackrResult<T> = Result<T, TrackrError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_names_operation() {
        let err = TransportError::Http {
            operation: "list_members".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.operation(), "list_members");
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_resolve_error_display_lists_candidates() {
        let err = ResolveError::ambiguous(
            "Assignee",
            "doe",
            vec!["john.doe (John Doe)".to_string(), "jane.doe (Jane Doe)".to_string()],
        );
        let text = err.to_string();
        assert!(text.contains("'doe' matches 2 Assignee values"));
        assert!(text.contains("  - john.doe (John Doe)"));
        assert!(text.ends_with(&err.suggestion));
    }

    #[test]
    fn test_empty_query_has_no_candidates() {
        let err = ResolveError::empty_query("State");
        assert_eq!(err.kind, ResolveErrorKind::EmptyQuery);
        assert!(err.candidates.is_empty());
    }

    #[test]
    fn test_resolve_error_passes_through_master_error() {
        let err: TrackrError = ResolveError::not_found("State", "xyz", Vec::new()).into();
        assert!(err.to_string().starts_with("No State matches 'xyz'"));
    }
}
