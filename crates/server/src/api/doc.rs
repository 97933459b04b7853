//! OpenAPI documentation, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "redis-loader API",
        version = "0.1.0",
        description = "Resumable batch imports of JSON and CSV uploads into Redis.",
    ),
    tags(
        (name = "Health", description = "Server liveness"),
        (name = "Import", description = "Import sessions: start, resume, pause, stop, status and catalog preloads"),
        (name = "Catalog", description = "Read-only catalog views"),
    ),
    paths(
        crate::api::health::health,
        crate::api::import::import_data,
        crate::api::import::resume_import,
        crate::api::import::pause_import,
        crate::api::import::stop_import,
        crate::api::import::get_import,
        crate::api::import::acknowledge_import,
        crate::api::import::load_data_sources,
        crate::api::query_views::query_views,
    ),
    components(schemas(crate::api::ErrorResponse, crate::api::health::HealthResponse))
)]
pub struct ApiDoc;
