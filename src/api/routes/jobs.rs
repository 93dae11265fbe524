//! Task handlers: start, status, stop, list.

use crate::api::AppState;
use crate::api::routes::{StartedResponse, StopResponse};
use crate::error::Error;
use crate::types::{JobRequest, TaskId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// POST /download - Start a download task
#[utoipa::path(
    post,
    path = "/download",
    tag = "tasks",
    request_body = JobRequest,
    responses(
        (status = 202, description = "Task started", body = StartedResponse),
        (status = 400, description = "Missing or invalid url", body = crate::error::ApiError),
        (status = 503, description = "Shutdown in progress", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Result<impl IntoResponse, Error> {
    let task_id = state.downloader.start_job(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartedResponse { task_id }),
    ))
}

/// GET /status/:id - Get one task's record
#[utoipa::path(
    get,
    path = "/status/{id}",
    tag = "tasks",
    params(
        ("id" = u64, Path, description = "Task id")
    ),
    responses(
        (status = 200, description = "Task record", body = TaskInfo),
        (status = 404, description = "Unknown task id", body = crate::error::ApiError)
    )
)]
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, Error> {
    let info = state.downloader.status(TaskId(id)).await?;
    Ok(Json(info))
}

/// POST /stop/:id - Request a running task to stop
#[utoipa::path(
    post,
    path = "/stop/{id}",
    tag = "tasks",
    params(
        ("id" = u64, Path, description = "Task id")
    ),
    responses(
        (status = 200, description = "Stop signal sent", body = StopResponse),
        (status = 404, description = "Unknown task id", body = crate::error::ApiError),
        (status = 409, description = "Task is not running", body = crate::error::ApiError)
    )
)]
pub async fn stop_task(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, Error> {
    state.downloader.stop(TaskId(id)).await?;

    Ok(Json(StopResponse {
        task_id: TaskId(id),
        status: "stopping".to_string(),
    }))
}

/// GET /tasks - List every task started since process start
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "Map of task id to record", body = HashMap<u64, TaskInfo>)
    )
)]
pub async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    let tasks = state.downloader.list().await;
    Json(tasks)
}
