use axum::http::StatusCode;
use claimdesk_core::{
    ActionCompleted, BusMessage, ClaimMode, PerformableAction, Reviewable, ReviewableId, TopicId,
    UserRef,
};
use claimdesk_server::{build_router, AppState, ReviewQueue};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn alice() -> UserRef {
    UserRef::new(1, "alice")
}

fn bob() -> UserRef {
    UserRef::new(2, "bob")
}

/// Two flagged posts in topic 10 and a queued user with no topic.
fn state_with(mode: ClaimMode) -> AppState {
    let mut queue = ReviewQueue::new(mode);
    queue.insert(
        Reviewable::new(1, "ReviewableFlaggedPost")
            .with_topic(10)
            .with_version(2)
            .with_action(PerformableAction::new("agree_and_hide"))
            .with_action(PerformableAction::new("disagree")),
    );
    queue.insert(Reviewable::new(2, "ReviewableFlaggedPost").with_topic(10));
    queue.insert(Reviewable::new(3, "ReviewableUser"));
    AppState::new(queue)
}

/// Send a request as `actor` via `oneshot` and return (status, parsed JSON body).
async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    actor: Option<&UserRef>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut req = axum::http::Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        req = req
            .header("x-moderator-id", actor.id.to_string())
            .header("x-moderator-username", actor.username.as_str());
    }
    let body = match body {
        Some(body) => {
            req = req.header("content-type", "application/json");
            axum::body::Body::from(serde_json::to_vec(&body).unwrap())
        }
        None => axum::body::Body::empty(),
    };
    let response = build_router(state.clone())
        .oneshot(req.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, serde_json::Value) {
    send(state, "GET", uri, None, None).await
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<BusMessage>) -> Vec<BusMessage> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_mode_and_pending() {
    let state = state_with(ClaimMode::Required);
    let (status, body) = get(&state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["claim_mode"], "required");
    assert_eq!(body["pending"], 3);
}

#[tokio::test]
async fn list_and_get_reviewables() {
    let state = state_with(ClaimMode::Optional);
    let (status, body) = get(&state, "/review").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviewables"].as_array().unwrap().len(), 3);
    assert_eq!(body["reviewable_count"], 3);

    let (status, body) = get(&state, "/review/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviewable"]["type"], "ReviewableFlaggedPost");
    assert_eq!(body["reviewable"]["version"], 2);

    let (status, body) = get(&state, "/review/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");
}

// ---------------------------------------------------------------------------
// Perform
// ---------------------------------------------------------------------------

#[tokio::test]
async fn perform_resolves_bumps_version_and_broadcasts() {
    let state = state_with(ClaimMode::Optional);
    let mut rx = state.event_tx.subscribe();

    let (status, body) = send(
        &state,
        "PUT",
        "/review/1/perform/agree_and_hide?version=2",
        Some(&alice()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let result = &body["reviewable_perform_result"];
    assert_eq!(result["success"], true);
    assert_eq!(result["version"], 3);
    assert_eq!(result["transition_to"], "approved");
    assert_eq!(result["remove_reviewable_ids"], json!([1]));
    assert_eq!(result["reviewable_count"], 2);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    let BusMessage::ActionCompleted(ev) = &events[0] else {
        panic!("expected action-completed")
    };
    assert_eq!(ev.remove_reviewable_ids, vec![ReviewableId(1)]);

    let (_, body) = get(&state, "/review").await;
    assert_eq!(body["reviewables"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn perform_stores_reject_reason() {
    let state = state_with(ClaimMode::Optional);
    let (status, body) = send(
        &state,
        "PUT",
        "/review/3/perform/reject_user_delete?version=0",
        Some(&alice()),
        Some(json!({ "reject_reason": "spam", "send_email": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let reviewable = &body["reviewable_perform_result"]["reviewable"];
    assert_eq!(reviewable["reject_reason"], "spam");
    assert_eq!(reviewable["send_email"], false);
    assert_eq!(reviewable["status"], "rejected");
}

#[tokio::test]
async fn stale_version_returns_conflict_with_current_reviewable() {
    let state = state_with(ClaimMode::Optional);
    let (status, body) = send(
        &state,
        "PUT",
        "/review/1/perform/agree_and_hide?version=1",
        Some(&alice()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_type"], "version_conflict");
    assert_eq!(body["reviewable"]["version"], 2);
}

#[tokio::test]
async fn perform_rejects_unlisted_action_and_missing_version() {
    let state = state_with(ClaimMode::Optional);
    let (status, body) = send(
        &state,
        "PUT",
        "/review/1/perform/approve_post?version=2",
        Some(&alice()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid");

    let (status, _) = send(
        &state,
        "PUT",
        "/review/1/perform/agree_and_hide",
        Some(&alice()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn perform_twice_reports_already_resolved() {
    let state = state_with(ClaimMode::Optional);
    let uri = "/review/3/perform/approve_user?version=0";
    let (status, _) = send(&state, "PUT", uri, Some(&alice()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&state, "PUT", uri, Some(&bob()), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_type"], "already_resolved");
}

#[tokio::test]
async fn missing_identity_headers_are_rejected() {
    let state = state_with(ClaimMode::Optional);
    let (status, body) = send(
        &state,
        "PUT",
        "/review/3/perform/approve_user?version=0",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("x-moderator-id"));
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

#[tokio::test]
async fn claim_blocks_other_moderators() {
    let state = state_with(ClaimMode::Optional);
    let mut rx = state.event_tx.subscribe();

    let (status, body) = send(
        &state,
        "POST",
        "/reviewable_claimed_topics",
        Some(&alice()),
        Some(json!({ "topic_id": 10, "automatic": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["claimed_by"]["user"]["username"], "alice");
    assert_eq!(body["claimed_by"]["automatic"], false);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].channel(), "claim-transfer");

    let (status, body) = send(
        &state,
        "POST",
        "/reviewable_claimed_topics",
        Some(&bob()),
        Some(json!({ "topic_id": 10, "automatic": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_type"], "claim_conflict");

    let (status, body) = send(
        &state,
        "PUT",
        "/review/2/perform/disagree?version=0",
        Some(&bob()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_type"], "claim_conflict");
}

#[tokio::test]
async fn required_mode_needs_a_claim_before_acting() {
    let state = state_with(ClaimMode::Required);
    let (status, body) = send(
        &state,
        "PUT",
        "/review/2/perform/disagree?version=0",
        Some(&alice()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_type"], "claim_required");

    // Reviewables without a topic are never gated.
    let (status, _) = send(
        &state,
        "PUT",
        "/review/3/perform/approve_user?version=0",
        Some(&alice()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn release_broadcasts_null_user_and_accepts_automatic_body() {
    let state = state_with(ClaimMode::Optional);
    send(
        &state,
        "POST",
        "/reviewable_claimed_topics",
        Some(&alice()),
        Some(json!({ "topic_id": 10, "automatic": true })),
    )
    .await;
    let mut rx = state.event_tx.subscribe();

    let (status, _) = send(
        &state,
        "DELETE",
        "/reviewable_claimed_topics/10",
        Some(&alice()),
        Some(json!({ "automatic": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = drain(&mut rx);
    let [BusMessage::ClaimTransfer(ev)] = events.as_slice() else {
        panic!("expected one claim-transfer, got {events:?}")
    };
    assert_eq!(ev.topic_id, TopicId(10));
    assert!(ev.user.is_none());

    // Releasing again is a quiet no-op.
    let (status, _) = send(
        &state,
        "DELETE",
        "/reviewable_claimed_topics/10",
        Some(&alice()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn automatic_requests_leave_an_explicit_claim_alone() {
    let state = state_with(ClaimMode::Optional);
    send(
        &state,
        "POST",
        "/reviewable_claimed_topics",
        Some(&alice()),
        Some(json!({ "topic_id": 10 })),
    )
    .await;
    let mut rx = state.event_tx.subscribe();

    let (status, body) = send(
        &state,
        "POST",
        "/reviewable_claimed_topics",
        Some(&alice()),
        Some(json!({ "topic_id": 10, "automatic": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["claimed_by"]["automatic"], false);

    let (status, _) = send(
        &state,
        "DELETE",
        "/reviewable_claimed_topics/10",
        Some(&alice()),
        Some(json!({ "automatic": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(drain(&mut rx).is_empty());
    let claim = state.queue().topic_claim(TopicId(10)).cloned().unwrap();
    assert_eq!(claim.user, alice());
    assert!(!claim.automatic);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_broadcast_in_applied_order() {
    let state = state_with(ClaimMode::Optional);
    let mut rx = state.event_tx.subscribe();

    let mut tasks = Vec::new();
    for round in 0..40 {
        let state = state.clone();
        tasks.push(tokio::spawn(async move {
            let reply = if round % 2 == 0 {
                send(
                    &state,
                    "POST",
                    "/reviewable_claimed_topics",
                    Some(&alice()),
                    Some(json!({ "topic_id": 10 })),
                )
                .await
            } else {
                send(
                    &state,
                    "DELETE",
                    "/reviewable_claimed_topics/10",
                    Some(&alice()),
                    None,
                )
                .await
            };
            reply
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().0, StatusCode::OK);
    }

    let last = drain(&mut rx)
        .into_iter()
        .filter_map(|msg| match msg {
            BusMessage::ClaimTransfer(ev) => Some(ev),
            _ => None,
        })
        .last()
        .expect("at least one claim-transfer");
    let held = state.queue().topic_claim(TopicId(10)).map(|c| c.user.clone());
    assert_eq!(last.user, held);
}

#[tokio::test]
async fn resolving_last_item_drops_automatic_claim() {
    let state = state_with(ClaimMode::Optional);
    send(
        &state,
        "POST",
        "/reviewable_claimed_topics",
        Some(&alice()),
        Some(json!({ "topic_id": 10, "automatic": true })),
    )
    .await;
    send(
        &state,
        "PUT",
        "/review/1/perform/agree_and_hide?version=2",
        Some(&alice()),
        None,
    )
    .await;
    let mut rx = state.event_tx.subscribe();

    let (status, _) = send(
        &state,
        "PUT",
        "/review/2/perform/disagree?version=0",
        Some(&alice()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let channels: Vec<_> = drain(&mut rx).iter().map(BusMessage::channel).collect();
    assert_eq!(channels, vec!["claim-transfer", "action-completed"]);
    assert!(state.queue().topic_claim(TopicId(10)).is_none());
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_merges_fields_under_version_guard() {
    let state = state_with(ClaimMode::Optional);
    let (status, body) = send(
        &state,
        "PUT",
        "/review/3?version=0",
        Some(&alice()),
        Some(json!({ "reviewable": { "payload": { "note": "edited" } } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reviewable"]["version"], 1);

    let (status, body) = send(
        &state,
        "PUT",
        "/review/3?version=0",
        Some(&bob()),
        Some(json!({ "reviewable": { "payload": { "note": "late" } } })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reviewable"]["version"], 1);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

async fn next_chunk(body: &mut axum::body::Body) -> String {
    let frame = tokio::time::timeout(std::time::Duration::from_secs(2), body.frame())
        .await
        .expect("sse frame")
        .expect("stream open")
        .unwrap();
    String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap()
}

#[tokio::test]
async fn lagging_event_subscriber_is_told_to_resync() {
    let mut queue = ReviewQueue::new(ClaimMode::Optional);
    queue.insert(Reviewable::new(1, "ReviewableUser"));
    let state = AppState::with_capacity(queue, 1);

    let response = build_router(state.clone())
        .oneshot(
            axum::http::Request::builder()
                .uri("/events")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body();

    state.broadcast((1..=3).map(|id| {
        BusMessage::ActionCompleted(ActionCompleted {
            remove_reviewable_ids: vec![ReviewableId(id)],
            ..Default::default()
        })
    }));

    let first = next_chunk(&mut body).await;
    assert!(first.contains("event: resync"), "{first}");
    assert!(first.contains(r#"{"skipped":2}"#), "{first}");
    let second = next_chunk(&mut body).await;
    assert!(second.contains("event: action-completed"), "{second}");
    assert!(second.contains("[3]"), "{second}");
}
