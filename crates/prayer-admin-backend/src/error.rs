//! Error types for backend operations

use thiserror::Error;

/// Result type alias for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur while talking to the hosted backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Backend returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// Response body could not be decoded
    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Operation exceeded its time bound
    #[error("Backend did not answer within {millis}ms")]
    Timeout {
        /// Bound in milliseconds
        millis: u64,
    },

    /// Record missing, or no longer in the expected state
    #[error("Not found: {resource}")]
    NotFound {
        /// Description of the missing record
        resource: String,
    },

    /// Request rejected before it was sent
    #[error("Validation error: {message}")]
    Validation {
        /// Error message
        message: String,
    },

    /// Backend is unreachable
    #[error("Backend unavailable: {message}")]
    Unavailable {
        /// Error message
        message: String,
    },
}

impl BackendError {
    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Whether the error means the backend could not be reached at all
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect() || err.is_timeout(),
            Self::Timeout { .. } | Self::Unavailable { .. } => true,
            _ => false,
        }
    }
}

impl From<prayer_admin_core::Error> for BackendError {
    fn from(err: prayer_admin_core::Error) -> Self {
        match err {
            prayer_admin_core::Error::Timeout { duration_ms } => Self::Timeout {
                millis: duration_ms,
            },
            prayer_admin_core::Error::NotFound { resource } => Self::NotFound { resource },
            prayer_admin_core::Error::Validation { field, message } => Self::Validation {
                message: format!("{field}: {message}"),
            },
            other => Self::Validation {
                message: other.to_string(),
            },
        }
    }
}

impl From<BackendError> for prayer_admin_core::Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout { millis } => Self::Timeout {
                duration_ms: millis,
            },
            BackendError::NotFound { resource } => Self::NotFound { resource },
            BackendError::Validation { message } => Self::Validation {
                field: "request".to_string(),
                message,
            },
            BackendError::Status { status: 401 | 403, message } => Self::Authentication(message),
            other => Self::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_error_display() {
        let err = BackendError::Status {
            status: 409,
            message: "duplicate key value violates unique constraint".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Backend returned 409: duplicate key value violates unique constraint"
        );
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(BackendError::Timeout { millis: 5000 }.is_connectivity());
        assert!(BackendError::unavailable("offline").is_connectivity());
        assert!(!BackendError::not_found("prayer_types/9").is_connectivity());
    }

    #[test]
    fn test_conversion_into_core_error() {
        let core: prayer_admin_core::Error = BackendError::Status {
            status: 401,
            message: "JWT expired".to_string(),
        }
        .into();
        assert!(matches!(core, prayer_admin_core::Error::Authentication(_)));

        let core: prayer_admin_core::Error = BackendError::Timeout { millis: 250 }.into();
        assert_eq!(core.to_string(), "Operation timed out after 250ms");

        let core: prayer_admin_core::Error = BackendError::unavailable("down").into();
        assert_eq!(core.to_string(), "Backend error: Backend unavailable: down");
    }

    #[test]
    fn test_conversion_from_core_validation() {
        let err: BackendError =
            prayer_admin_core::Error::validation("name", "Name is required").into();
        assert_eq!(err.to_string(), "Validation error: name: Name is required");

        let err: BackendError = prayer_admin_core::Error::InvalidTransition {
            from: "approved".to_string(),
            to: "denied".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Validation error: Cannot move request from approved to denied"
        );
    }
}
