use axum::extract::{Path, State};
use axum::Json;
use bytes::Bytes;
use claimdesk_core::{TopicId, UserRef};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::routes::moderator::Moderator;
use crate::routes::review::json_object;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ClaimBody {
    topic_id: TopicId,
    #[serde(default)]
    automatic: bool,
}

/// POST /reviewable_claimed_topics: claim a topic.
pub async fn claim_topic(
    State(app): State<AppState>,
    Moderator(actor): Moderator,
    Json(body): Json<ClaimBody>,
) -> Result<Json<Value>, AppError> {
    let mut queue = app.queue();
    let (claim, event) = queue.claim(body.topic_id, &actor, body.automatic)?;
    tracing::info!(
        topic = %body.topic_id,
        user = %actor.username,
        automatic = body.automatic,
        "topic claimed"
    );
    app.broadcast(event);
    drop(queue);
    Ok(Json(json!({ "claimed_by": claim })))
}

/// DELETE /reviewable_claimed_topics/{topic_id}: release a claim.
///
/// The body may carry `{"automatic": bool}`. An automatic release leaves an
/// explicit claim in place.
pub async fn release_topic(
    State(app): State<AppState>,
    Moderator(actor): Moderator,
    Path(topic_id): Path<u64>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let automatic = json_object(&body)?
        .get("automatic")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let topic = TopicId(topic_id);
    let mut queue = app.queue();
    let event = queue.unclaim(topic, &actor, automatic)?;
    log_release(topic, &actor, automatic, event.is_some());
    app.broadcast(event);
    drop(queue);
    Ok(Json(json!({ "success": "OK" })))
}

fn log_release(topic: TopicId, actor: &UserRef, automatic: bool, released: bool) {
    if released {
        tracing::info!(topic = %topic, user = %actor.username, automatic, "topic released");
    } else {
        tracing::debug!(topic = %topic, automatic, "release ignored: nothing to release");
    }
}
