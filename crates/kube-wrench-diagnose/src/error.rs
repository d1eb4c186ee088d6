//! Error types for the diagnosis engine.

use thiserror::Error;

/// Errors raised before a scan starts.
///
/// Once a scan runs it never fails: query errors become findings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnoseError {
    /// Invalid scan configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The namespace selector could not be parsed.
    #[error("Invalid namespace selector: {0:?}")]
    InvalidSelector(String),
}

/// A specialized Result type for diagnosis setup.
pub type Result<T> = std::result::Result<T, DiagnoseError>;
