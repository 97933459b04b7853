//! Import session endpoints.
//!
//! `import-data-to-redis` and `resume-import-data-to-redis` answer once the
//! session's loop stops (completed, paused, stopped or failed); progress in
//! between is pushed over the session's WebSocket.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use loader_core::{ImportRequest, PreloadRequest, ResumeRequest};
use loader_pipeline::{ImportOutcome, PreloadOutcome};

use super::{api_error, ApiResult, ErrorResponse};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/import-data-to-redis",
    tag = "Import",
    request_body(content = Object, description = "Import request (camelCase)"),
    responses(
        (status = 200, description = "Session outcome", body = Object),
        (status = 400, description = "Invalid request, credentials, source or transform", body = ErrorResponse),
        (status = 409, description = "Session busy", body = ErrorResponse),
        (status = 500, description = "Connection or internal error", body = ErrorResponse)
    )
)]
pub async fn import_data(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<ImportOutcome> {
    state.orchestrator.run(request).await.map(Json).map_err(api_error)
}

#[utoipa::path(
    post,
    path = "/api/resume-import-data-to-redis",
    tag = "Import",
    request_body(content = Object, description = "Resume request (camelCase)"),
    responses(
        (status = 200, description = "Session outcome", body = Object),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 409, description = "Session busy or not resumable", body = ErrorResponse)
    )
)]
pub async fn resume_import(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResumeRequest>,
) -> ApiResult<ImportOutcome> {
    state.orchestrator.resume(request).await.map(Json).map_err(api_error)
}

#[utoipa::path(
    post,
    path = "/api/pause-import/{socket_id}",
    tag = "Import",
    params(("socket_id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Pause requested", body = Object),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 409, description = "Session is not running", body = ErrorResponse)
    )
)]
pub async fn pause_import(
    State(state): State<Arc<AppState>>,
    Path(socket_id): Path<String>,
) -> ApiResult<ImportOutcome> {
    state.orchestrator.pause(&socket_id).map(Json).map_err(api_error)
}

#[utoipa::path(
    post,
    path = "/api/stop-import/{socket_id}",
    tag = "Import",
    params(("socket_id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Stopped, or stop requested", body = Object),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 409, description = "Session already finished", body = ErrorResponse)
    )
)]
pub async fn stop_import(
    State(state): State<Arc<AppState>>,
    Path(socket_id): Path<String>,
) -> ApiResult<ImportOutcome> {
    state.orchestrator.stop(&socket_id).await.map(Json).map_err(api_error)
}

#[utoipa::path(
    get,
    path = "/api/import-sessions/{socket_id}",
    tag = "Import",
    params(("socket_id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Current snapshot", body = Object),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
pub async fn get_import(
    State(state): State<Arc<AppState>>,
    Path(socket_id): Path<String>,
) -> ApiResult<ImportOutcome> {
    state.orchestrator.status(&socket_id).await.map(Json).map_err(api_error)
}

/// Forget a finished session and delete its checkpoint.
#[utoipa::path(
    delete,
    path = "/api/import-sessions/{socket_id}",
    tag = "Import",
    params(("socket_id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Final snapshot", body = Object),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 409, description = "Session still active", body = ErrorResponse)
    )
)]
pub async fn acknowledge_import(
    State(state): State<Arc<AppState>>,
    Path(socket_id): Path<String>,
) -> ApiResult<ImportOutcome> {
    state
        .orchestrator
        .acknowledge(&socket_id)
        .await
        .map(Json)
        .map_err(api_error)
}

#[utoipa::path(
    post,
    path = "/api/load-data-sources-in-redis",
    tag = "Import",
    request_body(content = Object, description = "`{ids, isAll?}`"),
    responses(
        (status = 200, description = "One outcome per data source", body = Object),
        (status = 400, description = "Unknown data source or empty selection", body = ErrorResponse)
    )
)]
pub async fn load_data_sources(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PreloadRequest>,
) -> ApiResult<Vec<PreloadOutcome>> {
    state.orchestrator.preload(request).await.map(Json).map_err(api_error)
}
