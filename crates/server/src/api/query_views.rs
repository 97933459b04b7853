use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use loader_core::ResolvedQueryView;

use crate::state::AppState;

/// Catalog query templates with their index names filled in.
#[utoipa::path(
    get,
    path = "/api/query-views",
    tag = "Catalog",
    responses((status = 200, description = "Resolved query views", body = Object))
)]
pub async fn query_views(State(state): State<Arc<AppState>>) -> Json<Vec<ResolvedQueryView>> {
    Json(state.orchestrator.catalog().resolved_query_views())
}
