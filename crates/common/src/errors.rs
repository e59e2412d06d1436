use thiserror::Error;

/// Common error types for the application.
#[derive(Error, Debug, PartialEq)]
pub enum CommonError {
    /// Represents an error during data parsing or deserialization.
    #[error("Parse error: {0}")]
    ParseError(String),
}
