//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] — Download task management
//! - [`convert`] — Manual conversion
//! - [`system`] — Health, events, OpenAPI, shutdown

use serde::{Deserialize, Serialize};

mod convert;
mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use convert::*;
pub use jobs::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /convert
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ConvertRequest {
    /// Name of the manga directory under the work dir
    pub manga_name: String,
}

/// Response body for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StartedResponse {
    /// Id of the newly started task
    pub task_id: crate::types::TaskId,
}

/// Response body for POST /stop/:id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StopResponse {
    /// Id of the task being stopped
    pub task_id: crate::types::TaskId,
    /// Status after the stop request was accepted (always "stopping")
    pub status: String,
}
