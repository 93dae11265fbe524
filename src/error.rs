//! Error types for manga-dl
//!
//! This module provides comprehensive error handling for the library, including:
//! - Domain-specific error types (Task, Fetch, Convert, Config)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//! - Context information (selector, file path, task ID, etc.)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for manga-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for manga-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "work_dir")
        key: Option<String>,
    },

    /// Task registry or lifecycle error
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Fetch-stage error (browser session, navigation, element queries)
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Conversion error (folder scan, page decode, PDF assembly)
    #[error("conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// The task's cancellation token was signalled
    #[error("download stopped by user")]
    Cancelled,

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Task registry and lifecycle errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task not found in the registry
    #[error("task {id} not found")]
    NotFound {
        /// The task ID that was not found
        id: u64,
    },

    /// A record with this ID is already registered
    #[error("task {id} already registered")]
    AlreadyExists {
        /// The task ID that collided
        id: u64,
    },

    /// Cannot perform operation in current status
    #[error("cannot {operation} task {id} in status {current_status}")]
    InvalidState {
        /// The task ID that is in an invalid status for the operation
        id: u64,
        /// The operation that was attempted (e.g., "stop")
        operation: String,
        /// The current status that prevents the operation (e.g., "completed")
        current_status: String,
    },
}

/// Fetch-stage errors (browser session and page interaction)
#[derive(Debug, Error)]
pub enum FetchError {
    /// Failed to create or connect the browser session
    #[error("failed to start browser session: {0}")]
    Session(String),

    /// Navigation to a URL failed or timed out
    #[error("failed to open {url}: {reason}")]
    Navigation {
        /// The URL that could not be opened
        url: String,
        /// The reason navigation failed
        reason: String,
    },

    /// A required element was not present on the page
    #[error("element not found: {selector}")]
    ElementNotFound {
        /// The CSS selector that matched nothing
        selector: String,
    },

    /// The requested chapter-list entry does not exist
    #[error("selector {selector} matched {count} elements, index {index} is out of range")]
    IndexOutOfRange {
        /// The chapter-list selector
        selector: String,
        /// The requested entry index
        index: usize,
        /// How many elements actually matched
        count: usize,
    },

    /// Waiting for an element to become visible timed out
    #[error("element {selector} not visible after {seconds}s")]
    WaitTimeout {
        /// The CSS selector that never became visible
        selector: String,
        /// How long the wait lasted
        seconds: u64,
    },

    /// A browser interaction (click, scroll, attribute read) failed
    #[error("browser {action} failed: {reason}")]
    Interaction {
        /// The interaction that failed (e.g., "click", "scroll")
        action: String,
        /// The reason the interaction failed
        reason: String,
    },

    /// A page image could not be downloaded
    #[error("failed to download page {url}: {reason}")]
    PageDownload {
        /// The image URL that failed
        url: String,
        /// The reason the download failed
        reason: String,
    },
}

/// Conversion errors (folder scan and PDF assembly)
///
/// `MangaDirMissing` and `ScanFailed` abort a whole conversion run; the
/// remaining variants describe single-folder failures that the engine
/// absorbs and logs.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The manga directory does not exist under the work dir
    #[error("manga directory not found: {path}")]
    MangaDirMissing {
        /// The directory that was expected to exist
        path: PathBuf,
    },

    /// Enumerating the manga directory failed
    #[error("failed to scan {path}: {reason}")]
    ScanFailed {
        /// The directory that could not be read
        path: PathBuf,
        /// The reason the scan failed
        reason: String,
    },

    /// A page image could not be decoded
    #[error("failed to decode {path}: {reason}")]
    Decode {
        /// The image file that failed to decode
        path: PathBuf,
        /// The reason decoding failed
        reason: String,
    },

    /// Writing the assembled PDF failed
    #[error("failed to write {path}: {reason}")]
    DocumentWrite {
        /// The PDF path that could not be written
        path: PathBuf,
        /// The reason the write failed
        reason: String,
    },
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
/// It follows a standard format with machine-readable error codes,
/// human-readable messages, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task 123 not found",
///     "details": {
///       "task_id": 123
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "task_not_found", "validation_error")
    ///
    /// Clients can use this for programmatic error handling.
    pub code: String,

    /// Human-readable error message
    ///
    /// This is suitable for displaying to end users.
    pub message: String,

    /// Optional additional context about the error
    ///
    /// This can include fields like task_id, selectors, file paths, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    /// Create a "service unavailable" error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new("service_unavailable", message)
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::Task(TaskError::NotFound { .. }) => 404,
            Error::Convert(ConvertError::MangaDirMissing { .. }) => 404,

            // 409 Conflict - Resource in the wrong state for the operation
            Error::Task(TaskError::AlreadyExists { .. }) => 409,
            Error::Task(TaskError::InvalidState { .. }) => 409,
            Error::Cancelled => 409,

            // 422 Unprocessable Entity - Semantic errors
            Error::Convert(ConvertError::Decode { .. }) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Convert(ConvertError::ScanFailed { .. }) => 500,
            Error::Convert(ConvertError::DocumentWrite { .. }) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,

            // 502 Bad Gateway - External collaborator errors
            Error::Fetch(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Task(e) => match e {
                TaskError::NotFound { .. } => "task_not_found",
                TaskError::AlreadyExists { .. } => "task_already_exists",
                TaskError::InvalidState { .. } => "invalid_state",
            },
            Error::Fetch(e) => match e {
                FetchError::Session(_) => "session_failed",
                FetchError::Navigation { .. } => "navigation_failed",
                FetchError::ElementNotFound { .. } => "element_not_found",
                FetchError::IndexOutOfRange { .. } => "index_out_of_range",
                FetchError::WaitTimeout { .. } => "wait_timeout",
                FetchError::Interaction { .. } => "interaction_failed",
                FetchError::PageDownload { .. } => "page_download_failed",
            },
            Error::Convert(e) => match e {
                ConvertError::MangaDirMissing { .. } => "manga_not_found",
                ConvertError::ScanFailed { .. } => "scan_failed",
                ConvertError::Decode { .. } => "page_decode_failed",
                ConvertError::DocumentWrite { .. } => "document_write_failed",
            },
            Error::Cancelled => "cancelled",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::Task(TaskError::NotFound { id }) => Some(serde_json::json!({
                "task_id": id,
            })),
            Error::Task(TaskError::AlreadyExists { id }) => Some(serde_json::json!({
                "task_id": id,
            })),
            Error::Task(TaskError::InvalidState {
                id,
                operation,
                current_status,
            }) => Some(serde_json::json!({
                "task_id": id,
                "operation": operation,
                "current_status": current_status,
            })),
            Error::Fetch(FetchError::WaitTimeout { selector, seconds }) => {
                Some(serde_json::json!({
                    "selector": selector,
                    "seconds": seconds,
                }))
            }
            Error::Fetch(FetchError::IndexOutOfRange {
                selector,
                index,
                count,
            }) => Some(serde_json::json!({
                "selector": selector,
                "index": index,
                "count": count,
            })),
            Error::Convert(ConvertError::MangaDirMissing { path }) => Some(serde_json::json!({
                "path": path,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
