//! Error types for the view-event observer.
//!
//! Hook failures never leave the interception boundary; everything else
//! (configuration, host lookups, command dispatch) is reported through
//! [`ViewEventError`].

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the view-event crate.
#[derive(Debug, Error)]
pub enum ViewEventError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Signing secret is required but the host did not provide one")]
    MissingSecret,

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Input validation
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    // Host collaborators
    #[error("Unknown command: {command_type}")]
    UnknownCommand { command_type: String },

    #[error("Hook failed: {message}")]
    Hook { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for view-event operations.
pub type Result<T> = std::result::Result<T, ViewEventError>;

impl From<std::io::Error> for ViewEventError {
    fn from(err: std::io::Error) -> Self {
        ViewEventError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ViewEventError {
    fn from(err: serde_json::Error) -> Self {
        ViewEventError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl ViewEventError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ViewEventError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Shorthand for a hook failure.
    pub fn hook(message: impl Into<String>) -> Self {
        ViewEventError::Hook {
            message: message.into(),
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Standard JSON-RPC error codes:
    /// - -32601: Method not found
    /// - -32602: Invalid params
    /// - -32603: Internal error
    ///
    /// Custom error codes (application-defined, -32000 to -32099):
    /// - -32010: Configuration error
    /// - -32011: Hook failure
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            ViewEventError::UnknownCommand { .. } => -32601,

            ViewEventError::Validation { .. }
            | ViewEventError::InvalidMethod(_)
            | ViewEventError::Json { .. } => -32602,

            ViewEventError::Config { .. } | ViewEventError::MissingSecret => -32010,

            ViewEventError::Hook { .. } => -32011,

            _ => -32603,
        }
    }
}
