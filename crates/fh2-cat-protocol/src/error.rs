//! Error types for the CAT protocol.

use thiserror::Error;

/// Errors that can occur when working with the CAT protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatError {
    /// Failed to parse a numeric field of a response.
    #[error("failed to parse {field}: {text:?}")]
    ParseError {
        /// The response field being parsed.
        field: &'static str,
        /// The text that failed to parse.
        text: String,
    },

    /// A parsed value lies outside the range the protocol allows.
    #[error("{field} out of range: {value} (max {max})")]
    OutOfRange {
        /// The field that was out of range.
        field: &'static str,
        /// The offending value.
        value: i64,
        /// Largest accepted value.
        max: i64,
    },

    /// The response was cut off before its value.
    #[error("truncated response: {0:?}")]
    Truncated(String),

    /// Invalid command format.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

/// Result type alias for CAT operations.
pub type CatResult<T> = Result<T, CatError>;
