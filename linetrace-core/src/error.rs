//! Error types for linetrace-core.

use thiserror::Error;

/// Result type alias for linetrace-core operations.
pub type Result<T> = std::result::Result<T, LookupError>;

/// Errors that can occur while building or running a lookup.
///
/// An empty result set is never an error.
#[derive(Error, Debug)]
pub enum LookupError {
    /// An identifier did not have the format the store expects.
    #[error("Invalid {field}: '{value}' is not a 24-digit hex identifier")]
    InvalidIdentifier {
        /// Name of the offending parameter.
        field: &'static str,
        /// The rejected input.
        value: String,
    },

    /// Machine name was empty or whitespace.
    #[error("Machine name must not be empty")]
    EmptyMachineName,

    /// A page limit of zero was requested.
    #[error("Limit must be greater than zero")]
    InvalidLimit,

    /// Connection settings could not be turned into client options.
    #[error("Invalid connection configuration: {0}")]
    InvalidConfig(String),

    /// The store could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The store rejected or failed the pipeline.
    #[error("Query against '{collection}' failed: {message}")]
    Query {
        /// Collection the pipeline ran against.
        collection: String,
        /// Driver-level description of the failure.
        message: String,
    },

    /// The in-memory evaluator met a stage shape it does not support.
    #[error("Unsupported pipeline stage: {0}")]
    UnsupportedStage(String),
}

impl LookupError {
    /// True for failures that happen before anything is sent to the store.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            LookupError::InvalidIdentifier { .. }
                | LookupError::EmptyMachineName
                | LookupError::InvalidLimit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LookupError::InvalidIdentifier {
            field: "plan id",
            value: "nope".to_string(),
        };
        assert!(err.to_string().contains("plan id"));
        assert!(err.to_string().contains("'nope'"));

        let err = LookupError::Query {
            collection: "plan".to_string(),
            message: "bad stage".to_string(),
        };
        assert_eq!(err.to_string(), "Query against 'plan' failed: bad stage");
    }

    #[test]
    fn test_input_errors() {
        assert!(LookupError::EmptyMachineName.is_input_error());
        assert!(LookupError::InvalidLimit.is_input_error());
        assert!(!LookupError::Connection("refused".into()).is_input_error());
    }
}
