use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /health: liveness plus the queue's claim mode and pending count.
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    let queue = app.queue();
    Json(serde_json::json!({
        "status": "ok",
        "claim_mode": queue.claim_mode(),
        "pending": queue.pending_count(),
    }))
}
