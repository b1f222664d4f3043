use thiserror::Error;

/// Unified error type for all data source operations
#[derive(Error, Debug)]
pub enum DataError {
    /// Connection failed (authentication, network, etc.)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection lost or closed unexpectedly
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Operation not supported by this backend
    #[error("Operation not supported: {0}")]
    OperationNotSupported(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DataError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        DataError::InvalidConfiguration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

/// Failure of a call made through a declared query interface.
#[derive(Error, Debug)]
pub enum MapperError {
    /// The template has more placeholders than the call supplied arguments
    #[error("Template expects {expected} argument(s) but {actual} were supplied")]
    ArgumentCountMismatch { expected: usize, actual: usize },

    /// Connection acquisition or statement execution failed
    #[error(transparent)]
    DataAccess(#[from] DataError),

    /// A single-row return type received no rows
    #[error("Query for {method} returned no rows")]
    EmptyResult { method: String },

    /// The method signature resolves to a different target type than the one being mapped
    #[error("Method declares target type {declared} but is mapped into {expected}")]
    TargetMismatch {
        declared: &'static str,
        expected: &'static str,
    },
}

pub type MapperResult<T> = std::result::Result<T, MapperError>;

/// Why a row could not be converted into its target type.
///
/// Faults stop row processing but are never surfaced as call failures;
/// rows mapped before the fault are still returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingFault {
    /// The result has a column that no field of the target declares
    #[error("Column '{column}' has no matching field on {target}")]
    UnknownColumn {
        column: String,
        target: &'static str,
    },

    /// The column value cannot be stored in the matching field
    #[error("Column '{column}' cannot be assigned to {target}: {reason}")]
    IncompatibleValue {
        column: String,
        target: &'static str,
        reason: String,
    },
}
