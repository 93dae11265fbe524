//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the manga-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the manga-dl REST API
///
/// This struct is used to generate the OpenAPI 3.1 specification that
/// describes all available endpoints, request/response types, and API
/// behavior.
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "manga-dl REST API",
        version = "0.2.0",
        description = "REST API for starting, monitoring, and stopping manga download tasks and converting downloaded chapters to PDF",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::start_download,
        crate::api::routes::get_status,
        crate::api::routes::stop_task,
        crate::api::routes::list_tasks,

        // Conversion
        crate::api::routes::convert_manga,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::shutdown,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::TaskStatus,
        crate::types::TaskInfo,
        crate::types::JobRequest,
        crate::types::Chapter,
        crate::types::ConversionReport,

        // API request/response types from routes
        crate::api::routes::ConvertRequest,
        crate::api::routes::StartedResponse,
        crate::api::routes::StopResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Download tasks - Start, monitor, and stop manga downloads"),
        (name = "convert", description = "Conversion - Turn downloaded chapter folders into PDFs"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events, shutdown"),
    )
)]
pub struct ApiDoc;
