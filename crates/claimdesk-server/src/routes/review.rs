use axum::extract::{Path, Query, State};
use axum::Json;
use bytes::Bytes;
use claimdesk_core::{CoreError, PerformResponse, ReviewableId};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::AppError;
use crate::queue::ReviewQueue;
use crate::routes::moderator::Moderator;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    version: Option<u64>,
}

impl VersionQuery {
    fn required(&self) -> Result<u64, AppError> {
        self.version
            .ok_or_else(|| AppError::bad_request("version query parameter is required"))
    }
}

#[derive(Debug, Deserialize)]
struct UpdateBody {
    #[serde(default)]
    reviewable: Map<String, Value>,
}

/// Parse an optional JSON object body. An empty body is an empty object.
pub(crate) fn json_object(body: &Bytes) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    serde_json::from_slice(body).map_err(|e| AppError::bad_request(format!("invalid body: {e}")))
}

/// Attach the current reviewable to a version conflict.
fn conflict(queue: &ReviewQueue, err: CoreError) -> AppError {
    match &err {
        CoreError::VersionConflict { id, .. } => match queue.get(*id) {
            Ok(current) => AppError::version_conflict(err, current.clone()),
            Err(_) => AppError(err.into()),
        },
        _ => AppError(err.into()),
    }
}

/// GET /review: pending reviewables.
pub async fn list_reviewables(State(app): State<AppState>) -> Json<Value> {
    let queue = app.queue();
    Json(json!({
        "reviewables": queue.pending(),
        "reviewable_count": queue.pending_count(),
    }))
}

/// GET /review/{id}
pub async fn get_reviewable(
    State(app): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    let reviewable = app.queue().get(ReviewableId(id))?.clone();
    Ok(Json(json!({ "reviewable": reviewable })))
}

/// PUT /review/{id}?version=N: merge field edits.
pub async fn update_reviewable(
    State(app): State<AppState>,
    Moderator(actor): Moderator,
    Path(id): Path<u64>,
    Query(query): Query<VersionQuery>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let version = query.required()?;
    let body: UpdateBody = if body.is_empty() {
        UpdateBody {
            reviewable: Map::new(),
        }
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::bad_request(format!("invalid body: {e}")))?
    };

    let mut queue = app.queue();
    let reviewable = queue
        .update(ReviewableId(id), version, &actor, &body.reviewable)
        .map_err(|e| conflict(&queue, e))?;
    tracing::info!(id, user = %actor.username, "reviewable updated");
    Ok(Json(json!({ "reviewable": reviewable })))
}

/// PUT /review/{id}/perform/{action}?version=N
pub async fn perform_action(
    State(app): State<AppState>,
    Moderator(actor): Moderator,
    Path((id, action)): Path<(u64, String)>,
    Query(query): Query<VersionQuery>,
    body: Bytes,
) -> Result<Json<PerformResponse>, AppError> {
    let version = query.required()?;
    let data = json_object(&body)?;

    let mut queue = app.queue();
    let performed = queue
        .perform(ReviewableId(id), &action, version, &actor, &data)
        .map_err(|e| conflict(&queue, e))?;
    tracing::info!(id, action = %action, user = %actor.username, "action performed");
    app.broadcast(performed.events);
    drop(queue);

    Ok(Json(PerformResponse {
        reviewable_perform_result: performed.result,
    }))
}
