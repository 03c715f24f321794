//! Error types for the hostlist system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for hostlist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the hostlist system
#[derive(Error, Debug)]
pub enum Error {
    /// A single entity failed field-level validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// The consistency checker found one or more problems
    ///
    /// Every individual problem has already been logged when this is returned.
    #[error("Consistency check failed with {} problem(s): {}", failures.len(), failures.join("; "))]
    Consistency {
        /// One line per failed check
        failures: Vec<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input files (YAML sections, alias lines)
    #[error("Parse error in {source_name}: {message}")]
    Parse {
        /// File or line the error was found in
        source_name: String,
        /// What went wrong
        message: String,
    },

    /// Remote record store errors
    #[error("Record store error: {0}")]
    Store(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid operator input (conflicting flags and the like)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Store-specific error
    #[error("Store error ({store}): {message}")]
    Provider {
        /// Store name
        store: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a consistency error from the collected failures
    pub fn consistency(failures: Vec<String>) -> Self {
        Self::Consistency { failures }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a record store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a store-specific error
    pub fn provider(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from talking to the remote store
    ///
    /// The sync driver degrades to local-only mode on these instead of
    /// aborting the run.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Store(_)
                | Self::Http(_)
                | Self::Authentication(_)
                | Self::NotFound(_)
                | Self::Provider { .. }
                | Self::Json(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
