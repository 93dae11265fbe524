//! Conversion handler: manual folder-to-PDF runs.

use crate::api::AppState;
use crate::api::routes::ConvertRequest;
use crate::error::Error;
use axum::{Json, extract::State, response::IntoResponse};

/// POST /convert - Convert a manga's chapter folders to PDFs
///
/// Runs synchronously; the response carries the full report. Folders that
/// fail to convert are counted in the report, only a missing or unreadable
/// manga directory is an error.
#[utoipa::path(
    post,
    path = "/convert",
    tag = "convert",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Conversion report", body = ConversionReport),
        (status = 404, description = "Manga directory not found", body = crate::error::ApiError),
        (status = 503, description = "Shutdown in progress", body = crate::error::ApiError)
    )
)]
pub async fn convert_manga(
    State(state): State<AppState>,
    Json(request): Json<ConvertRequest>,
) -> Result<impl IntoResponse, Error> {
    let report = state.downloader.convert(&request.manga_name).await?;
    Ok(Json(report))
}
