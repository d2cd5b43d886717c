//! HTTP backend for the review queue.
//!
//! Serves the review and claim endpoints over an in-memory [`ReviewQueue`]
//! and fans every broadcast out to connected sessions over SSE.

pub mod error;
pub mod queue;
pub mod routes;
pub mod state;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use queue::{Performed, ReviewQueue, SeedFile};
pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health))
        // Events (SSE)
        .route("/events", get(routes::events::sse_events))
        // Review queue
        .route("/review", get(routes::review::list_reviewables))
        .route(
            "/review/{id}",
            get(routes::review::get_reviewable).put(routes::review::update_reviewable),
        )
        .route(
            "/review/{id}/perform/{action}",
            put(routes::review::perform_action),
        )
        // Claims
        .route(
            "/reviewable_claimed_topics",
            post(routes::claims::claim_topic),
        )
        .route(
            "/reviewable_claimed_topics/{topic_id}",
            delete(routes::claims::release_topic),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Serve `queue` on `0.0.0.0:port`.
pub async fn serve(queue: ReviewQueue, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(listener, AppState::new(queue)).await
}

/// Serve on a pre-bound listener.
///
/// Lets the caller read the actual port first when binding to port 0.
pub async fn serve_on(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let claim_mode = state.queue().claim_mode();
    let app = build_router(state);

    tracing::info!(%claim_mode, "claimdesk server listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
