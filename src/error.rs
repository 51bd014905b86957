//! Error types for the policy builder.
//!
//! Errors fall into two classes. User input errors (bad form text, malformed
//! JSON pasted into the preview) are reported back to the offending field and
//! leave the document untouched. Contract errors (an edit addressed at a path
//! that does not resolve to the expected node) are defects in the caller.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the policy builder.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid form input (parameter names, values, details edits)
    #[error("Validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
        /// Form field that caused the error, if applicable
        field: Option<String>,
    },

    /// Policy text could be read as JSON but not as a policy document
    #[error("Policy parse error: {message}")]
    Parse {
        /// Detailed error message
        message: String,
        /// Line number where error occurred, if applicable
        line: Option<usize>,
    },

    /// An edit addressed a node that does not exist or has the wrong shape
    #[error("Invalid condition path {path}: {reason}")]
    InvalidPath {
        /// The offending path, rendered as `/0/1`
        path: String,
        /// Why the path could not be used
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Detailed error message
        message: String,
        /// Configuration key that caused the error
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (unexpected condition)
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field context.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
            line: None,
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: None,
        }
    }

    /// Create a configuration error with key context.
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Check if this error was caused by user input rather than a caller defect.
    ///
    /// User errors are shown next to the form field; the session carries on.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. } | Error::Parse { .. } | Error::Serialization(_)
        )
    }

    /// The form field this error belongs to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    /// Get the error category for logs and counters.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation",
            Error::Parse { .. } => "parse",
            Error::InvalidPath { .. } => "invalid_path",
            Error::Config { .. } => "config",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Internal { .. } => "internal",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::config(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Add field context to validation errors.
    fn with_field(self, field: impl Into<String>) -> Result<T>;
}

impl<T> ErrorContext<T> for Result<T> {
    fn with_field(self, field: impl Into<String>) -> Result<T> {
        self.map_err(|e| match e {
            Error::Validation { message, .. } => Error::Validation {
                message,
                field: Some(field.into()),
            },
            other => other,
        })
    }
}
