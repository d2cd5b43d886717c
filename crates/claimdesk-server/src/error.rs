use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use claimdesk_core::{CoreError, Reviewable};
use serde_json::json;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Internal sentinels carried through the `anyhow::Error` chain
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
#[error("{0}")]
struct BadRequest(String);

/// A version conflict together with the reviewable as it now stands.
#[derive(Debug, Error)]
#[error("{source}")]
struct StaleVersion {
    source: CoreError,
    current: Box<Reviewable>,
}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
///
/// The body is `{"error": message, "error_type": kind}`, plus `reviewable`
/// for version conflicts.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequest(msg.into()).into())
    }

    /// Construct a 409 version conflict that carries the current reviewable.
    pub fn version_conflict(source: CoreError, current: Reviewable) -> Self {
        Self(
            StaleVersion {
                source,
                current: Box::new(current),
            }
            .into(),
        )
    }
}

fn status_for(kind: &str) -> StatusCode {
    match kind {
        "not_found" => StatusCode::NOT_FOUND,
        "version_conflict" | "claim_conflict" => StatusCode::CONFLICT,
        "claim_required" | "already_resolved" => StatusCode::UNPROCESSABLE_ENTITY,
        "invalid" => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(e) = self.0.downcast_ref::<BadRequest>() {
            let body = json!({ "error": e.0, "error_type": "invalid" });
            return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
        }
        if let Some(e) = self.0.downcast_ref::<StaleVersion>() {
            let body = json!({
                "error": e.source.to_string(),
                "error_type": e.source.kind(),
                "reviewable": e.current,
            });
            return (StatusCode::CONFLICT, axum::Json(body)).into_response();
        }

        let kind = self
            .0
            .downcast_ref::<CoreError>()
            .map(CoreError::kind)
            .unwrap_or("internal");
        let body = json!({ "error": self.0.to_string(), "error_type": kind });
        (status_for(kind), axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
