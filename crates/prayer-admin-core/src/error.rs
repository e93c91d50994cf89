//! Error types for the prayer admin dashboard

use std::{error::Error as StdError, fmt};

/// Main error type for the prayer admin dashboard
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Configuration error
    Configuration {
        /// Error message
        message: String,
    },

    /// Validation error
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// Backend operation failed
    Backend(String),

    /// Authentication error
    Authentication(String),

    /// Timeout error
    Timeout {
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// Not found error
    NotFound {
        /// Resource that was not found
        resource: String,
    },

    /// Invalid approval status transition
    InvalidTransition {
        /// Status the record is in
        from: String,
        /// Status that was requested
        to: String,
    },

    /// Serialization error
    Serialization(serde_json::Error),

    /// Other error
    Other(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a validation error for a field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the error was raised before any backend call was made
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Configuration { message } => write!(f, "Configuration error: {message}"),
            Self::Validation { field, message } => {
                write!(f, "Validation error: {field} - {message}")
            }
            Self::Backend(msg) => write!(f, "Backend error: {msg}"),
            Self::Authentication(msg) => write!(f, "Authentication failed: {msg}"),
            Self::Timeout { duration_ms } => {
                write!(f, "Operation timed out after {duration_ms}ms")
            }
            Self::NotFound { resource } => write!(f, "Resource not found: {resource}"),
            Self::InvalidTransition { from, to } => {
                write!(f, "Cannot move request from {from} to {to}")
            }
            Self::Serialization(err) => write!(f, "Serialization error: {err}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::uninlined_format_args
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "config.toml missing");
        let app_error = Error::from(io_error);

        match app_error {
            Error::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }

        assert!(app_error.to_string().contains("I/O error"));
        assert!(app_error.source().is_some());
    }

    #[test]
    fn test_validation_error() {
        let error = Error::validation("name", "Name is required");

        assert!(error.is_validation());
        assert_eq!(error.to_string(), "Validation error: name - Name is required");
    }

    #[test]
    fn test_backend_error() {
        let error = Error::Backend("relation \"prayer_types\" does not exist".to_string());
        assert_eq!(
            error.to_string(),
            "Backend error: relation \"prayer_types\" does not exist"
        );
        assert!(!error.is_validation());
    }

    #[test]
    fn test_invalid_transition_error() {
        let error = Error::InvalidTransition {
            from: "approved".to_string(),
            to: "denied".to_string(),
        };
        assert_eq!(error.to_string(), "Cannot move request from approved to denied");
    }

    #[test]
    fn test_serialization_error_source() {
        let json_error = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let app_error = Error::from(json_error);

        assert!(app_error.source().is_some());
        assert!(app_error.to_string().starts_with("Serialization error"));
    }

    #[test]
    fn test_display_variants() {
        let cases = vec![
            (Error::configuration("missing url"), "Configuration error: missing url"),
            (
                Error::Authentication("bad password".to_string()),
                "Authentication failed: bad password",
            ),
            (Error::Timeout { duration_ms: 5000 }, "Operation timed out after 5000ms"),
            (
                Error::NotFound {
                    resource: "prayer_types/42".to_string(),
                },
                "Resource not found: prayer_types/42",
            ),
            (Error::Other("plain".to_string()), "plain"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
            assert!(error.source().is_none());
        }
    }
}
