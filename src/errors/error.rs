use std::fmt;
use serde::Serialize;
use thiserror::Error;

/// Domain-level errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File error: {0}")]
    File(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("External error: {0}")]
    External(String),
}

impl From<std::io::Error> for DomainError {
    fn from(error: std::io::Error) -> Self {
        DomainError::File(error.to_string())
    }
}

/// Service-level errors (application specific)
#[derive(Debug, Error, Clone, Serialize)]
pub enum ServiceError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("User interface error: {0}")]
    Ui(String),

    #[error("A compression is already in progress")]
    Busy,

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Short message suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Domain(DomainError::Validation(v)) => v.to_string(),
            ServiceError::Domain(DomainError::UnsupportedFileType(mime)) => {
                format!("Unsupported file type: {}", mime)
            }
            // Library details stay in the log, the user gets the short form
            ServiceError::Domain(DomainError::Compression(msg)) => msg.clone(),
            ServiceError::Domain(DomainError::File(msg)) => format!("File error: {}", msg),
            ServiceError::Domain(DomainError::Internal(_)) => "Unknown error occurred".to_string(),
            ServiceError::Domain(DomainError::External(msg)) => msg.clone(),
            ServiceError::Ui(msg) => msg.clone(),
            ServiceError::Busy => "A compression is already in progress".to_string(),
            ServiceError::NotImplemented(msg) => msg.clone(),
            ServiceError::Configuration(msg) => format!("Configuration error: {}", msg),
        }
    }
}

/// Validation errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required {
        field: String,
    },

    #[error("Field '{field}' must be between {min} and {max}")]
    Range {
        field: String,
        min: String,
        max: String,
    },

    #[error("Field '{field}' contains an invalid value: {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },

    #[error("{0}")]
    Custom(String),
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        Self::Required {
            field: field.to_string(),
        }
    }

    pub fn range<T: fmt::Display>(field: &str, min: T, max: T) -> Self {
        Self::Range {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn custom(message: &str) -> Self {
        Self::Custom(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_internal_details() {
        let err = ServiceError::Domain(DomainError::Internal("Task join error: panicked".to_string()));
        assert_eq!(err.user_message(), "Unknown error occurred");

        let err = ServiceError::Domain(DomainError::Compression("Failed to compress image".to_string()));
        assert_eq!(err.user_message(), "Failed to compress image");
    }

    #[test]
    fn test_validation_messages() {
        let err = ValidationError::range("quality", 1, 100);
        assert_eq!(err.to_string(), "Field 'quality' must be between 1 and 100");

        let err: DomainError = ValidationError::required("file").into();
        assert_eq!(err.to_string(), "Validation error: Field 'file' is required");
    }
}
