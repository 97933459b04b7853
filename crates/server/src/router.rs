//! HTTP router construction.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::state::AppState;
use crate::{api, live};

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origins);

    Router::new()
        .route("/health", get(api::health))
        .route("/ws", get(live::ws_upgrade))
        .route("/api/import-data-to-redis", post(api::import_data))
        .route("/api/resume-import-data-to-redis", post(api::resume_import))
        .route("/api/pause-import/{socket_id}", post(api::pause_import))
        .route("/api/stop-import/{socket_id}", post(api::stop_import))
        .route(
            "/api/import-sessions/{socket_id}",
            get(api::get_import).delete(api::acknowledge_import),
        )
        .route("/api/load-data-sources-in-redis", post(api::load_data_sources))
        .route("/api/query-views", get(api::query_views))
        .layer(cors)
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}

/// An empty origin list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(values))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use loader_core::{Catalog, Config};
    use loader_pipeline::{MemoryCheckpointStore, Orchestrator, OrchestratorSettings};
    use loader_store::MemoryConnector;

    use crate::live::SocketRegistry;

    const URL: &str = "redis://memory";

    fn app(catalog: Catalog) -> (Router, MemoryConnector) {
        let config = Config::for_profile("");
        let connector = MemoryConnector::new();
        let sockets = Arc::new(SocketRegistry::new());
        let orchestrator = Orchestrator::new(
            OrchestratorSettings {
                default_store_url: URL.to_string(),
                ..Default::default()
            },
            Arc::new(connector.clone()),
            Arc::new(MemoryCheckpointStore::new()),
        )
        .with_reporter(sockets.clone())
        .with_catalog(Arc::new(catalog));
        let state = Arc::new(AppState {
            config,
            orchestrator,
            sockets,
        });
        (build_router(state), connector)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                req = req.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _) = app(Catalog::default());
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn import_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        for i in 1..=3 {
            fs::write(dir.path().join(format!("{}.json", i)), format!(r#"{{"sku": "S{}"}}"#, i)).unwrap();
        }
        let (app, connector) = app(Catalog::default());

        let (status, body) = call(
            &app,
            "POST",
            "/api/import-data-to-redis",
            Some(serde_json::json!({
                "redisConUrl": URL,
                "socketId": "http-1",
                "idField": "sku",
                "keyPrefix": "sku:",
                "uploadPath": dir.path().to_string_lossy(),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["stats"]["processed"], 3);
        assert_eq!(body["stats"]["totalFiles"], 3);
        assert_eq!(connector.store(URL).await.keys().await, vec!["sku:S1", "sku:S2", "sku:S3"]);

        // No socket was connected, so the finished session is gone.
        let (status, body) = call(&app, "GET", "/api/import-sessions/http-1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "session");
    }

    #[tokio::test]
    async fn missing_credentials_are_a_bad_request() {
        let (app, _) = app(Catalog::default());
        let (status, body) = call(
            &app,
            "POST",
            "/api/import-data-to-redis",
            Some(serde_json::json!({ "uploadPath": "/tmp" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "credential");
    }

    #[tokio::test]
    async fn unknown_sessions_are_not_found() {
        let (app, _) = app(Catalog::default());
        for (method, uri) in [
            ("POST", "/api/pause-import/ghost"),
            ("POST", "/api/stop-import/ghost"),
            ("DELETE", "/api/import-sessions/ghost"),
        ] {
            let (status, body) = call(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
            assert_eq!(body["kind"], "session");
        }

        let (status, _) = call(
            &app,
            "POST",
            "/api/resume-import-data-to-redis",
            Some(serde_json::json!({ "socketId": "ghost", "uploadPath": "/tmp" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn encoded_path_ids_are_rejected() {
        let (app, _) = app(Catalog::default());
        for (method, uri) in [
            ("GET", "/api/import-sessions/..%2Fvictim"),
            ("DELETE", "/api/import-sessions/..%2Fvictim"),
            ("POST", "/api/stop-import/..%2F..%2Fetc"),
        ] {
            let (status, body) = call(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
            assert_eq!(body["kind"], "validation");
        }
    }

    #[tokio::test]
    async fn preload_and_query_views_use_the_catalog() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"{"id": "a"}"#).unwrap();
        let yaml = format!(
            "dataSources:\n  - id: items\n    uploadPath: {}\n    keyPrefix: 'item:'\n    idField: id\nindexes:\n  - id: idx1\n    name: itemIdx\nqueryViews:\n  - query: 'FT.SEARCH {{dbIndexName}} *'\n    dbIndexId: idx1\n    dataSourceId: items\n",
            dir.path().display()
        );
        let (app, connector) = app(Catalog::from_yaml_str(&yaml).unwrap());

        let (status, body) = call(&app, "GET", "/api/query-views", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["query"], "FT.SEARCH itemIdx *");

        let (status, body) = call(
            &app,
            "POST",
            "/api/load-data-sources-in-redis",
            Some(serde_json::json!({ "ids": ["items"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body[0]["dataSourceId"], "items");
        assert_eq!(body[0]["status"], "completed");
        assert!(connector.store(URL).await.get("item:a").await.is_some());

        let (status, body) = call(
            &app,
            "POST",
            "/api/load-data-sources-in-redis",
            Some(serde_json::json!({ "ids": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");
    }
}
