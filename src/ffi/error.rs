use std::fmt;
use serde::{Deserialize, Serialize};
use crate::errors::{DomainError, ServiceError, ValidationError};

/// Error codes for FFI boundary
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Success (no error)
    Success = 0,

    // General errors (1-99)
    Unknown = 1,
    InvalidArgument = 2,
    NullPointer = 3,
    InvalidUtf8 = 4,
    InternalError = 6,

    // Domain errors (200-299)
    DomainGeneral = 200,
    ValidationFailed = 204,
    FileError = 207,
    CompressionError = 208,
    UnsupportedFileType = 209,
    ExternalToolError = 210,

    // Service errors (300-399)
    UiError = 302,
    Busy = 303,
    NotImplemented = 304,
    ConfigurationError = 310,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, *self as i32)
    }
}

/// Error type for FFI boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FFIError {
    /// Error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    pub details: Option<String>,
}

impl fmt::Display for FFIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(details) = &self.details {
            write!(f, "{}: {} ({})", self.code, self.message, details)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for FFIError {}

impl FFIError {
    pub fn new(code: ErrorCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: &str, details: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: Some(details.to_string()),
        }
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn internal(message: String) -> Self {
        Self::new(ErrorCode::InternalError, &message)
    }
}

impl From<ValidationError> for FFIError {
    fn from(err: ValidationError) -> Self {
        Self::new(ErrorCode::ValidationFailed, &err.to_string())
    }
}

impl From<DomainError> for FFIError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(validation_err) => validation_err.into(),
            DomainError::UnsupportedFileType(mime) => Self::with_details(
                ErrorCode::UnsupportedFileType,
                &format!("Unsupported file type: {}", mime),
                &mime,
            ),
            DomainError::File(msg) => Self::new(ErrorCode::FileError, &msg),
            DomainError::Compression(msg) => Self::new(ErrorCode::CompressionError, &msg),
            DomainError::External(msg) => Self::new(ErrorCode::ExternalToolError, &msg),
            DomainError::Internal(msg) => Self::with_details(
                ErrorCode::InternalError,
                "Unknown error occurred",
                &msg,
            ),
        }
    }
}

impl From<ServiceError> for FFIError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(domain_err) => domain_err.into(),
            ServiceError::Ui(msg) => Self::new(ErrorCode::UiError, &msg),
            ServiceError::Busy => {
                Self::new(ErrorCode::Busy, "A compression is already in progress")
            }
            ServiceError::NotImplemented(msg) => Self::new(ErrorCode::NotImplemented, &msg),
            ServiceError::Configuration(msg) => Self::new(ErrorCode::ConfigurationError, &msg),
        }
    }
}

// Result type alias for FFI functions
pub type FFIResult<T> = Result<T, FFIError>;
