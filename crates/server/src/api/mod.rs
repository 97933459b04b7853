//! HTTP endpoints.
//!
//! Shared error mapping lives here; handlers are grouped by concern.

pub mod doc;
mod health;
mod import;
mod query_views;

pub use health::health;
pub use import::{
    acknowledge_import, get_import, import_data, load_data_sources, pause_import, resume_import, stop_import,
};
pub use query_views::query_views;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use loader_core::ErrorKind;
use loader_pipeline::{ImportError, SessionError};

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable classification, e.g. `credential` or `connection`.
    pub kind: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn status_for(err: &ImportError) -> StatusCode {
    match err {
        ImportError::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
        ImportError::Session(_) => StatusCode::CONFLICT,
        _ => match err.kind() {
            ErrorKind::Validation | ErrorKind::Credential | ErrorKind::Source | ErrorKind::Transform => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

pub(crate) fn api_error(err: ImportError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(kind = %err.kind(), error = %err, "request failed");
    } else {
        tracing::debug!(kind = %err.kind(), error = %err, "request rejected");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind().to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use loader_core::{ImportStatus, ValidationError};
    use loader_credential::CredentialError;
    use loader_store::StoreError;

    #[test]
    fn maps_error_kinds_to_status_codes() {
        assert_eq!(
            status_for(&ValidationError("x".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&CredentialError::DecryptFailed("tag".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&SessionError::NotFound("s".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&SessionError::Busy("s".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(
                &SessionError::NotFinished {
                    id: "s".into(),
                    status: ImportStatus::Running
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&StoreError::Connection("refused".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&ImportError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_body_carries_kind() {
        let (status, Json(body)) = api_error(CredentialError::Missing.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.kind, "credential");
        assert_eq!(body.error, "no store connection URL supplied");
    }
}
