use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use claimdesk_core::events::RESYNC;
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::state::AppState;

/// GET /events: SSE stream of `claim-transfer` and `action-completed`
/// events, one named event per broadcast.
///
/// A subscriber that falls behind gets a `resync` event in place of the
/// events it missed.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let rx = app.event_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        let event = match msg {
            Ok(msg) => {
                let data = msg.payload_json().ok()?;
                Event::default().event(msg.channel()).data(data)
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "SSE subscriber lagged, sending resync");
                Event::default()
                    .event(RESYNC)
                    .data(json!({ "skipped": skipped }).to_string())
            }
        };
        Some(Ok::<Event, Infallible>(event))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
