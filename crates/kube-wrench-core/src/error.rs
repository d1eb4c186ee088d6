//! Error types shared across kube-wrench crates.

use thiserror::Error;

/// A result type for cluster queries.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Errors returned by a cluster query.
///
/// The diagnosis engine treats every variant as "data unavailable": the
/// failing sub-check is reported and skipped, the scan continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The query did not complete within the configured timeout.
    #[error("query {operation} timed out after {seconds}s")]
    Timeout {
        /// The query that timed out.
        operation: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// The requested object does not exist.
    #[error("{kind} {name} not found")]
    NotFound {
        /// Object kind (Pod, Secret, ...).
        kind: String,
        /// Object name.
        name: String,
    },

    /// The API server refused the request.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The response was missing an expected field.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Any other transport or API failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl QueryError {
    /// Create a not-found error for the given kind and name.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Check if this error means the object is absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors raised while normalizing a resource quantity string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// The numeric part could not be parsed.
    #[error("invalid number in quantity {0:?}")]
    InvalidNumber(String),

    /// The unit suffix is not one we normalize.
    #[error("unsupported unit in quantity {0:?}")]
    UnsupportedUnit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_display() {
        let err = QueryError::Timeout {
            operation: "list_pods".to_string(),
            seconds: 10,
        };
        assert_eq!(err.to_string(), "query list_pods timed out after 10s");

        let err = QueryError::not_found("Secret", "db-creds");
        assert_eq!(err.to_string(), "Secret db-creds not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn only_not_found_is_absence() {
        assert!(!QueryError::Forbidden("nope".into()).is_not_found());
        assert!(!QueryError::Transport("x".into()).is_not_found());
        assert_eq!(
            QueryError::Malformed("missing status".into()).to_string(),
            "malformed response: missing status"
        );
    }
}
