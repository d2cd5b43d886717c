use async_trait::async_trait;
use claimdesk_core::{
    Claim, PerformResponse, PerformResult, Reviewable, ReviewableId, TopicId, UserRef,
    MODERATOR_ID_HEADER, MODERATOR_USERNAME_HEADER,
};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::api::ReviewApi;
use crate::error::ApiError;
use crate::sse::EventFeed;

// ─── Response envelopes ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct ClaimEnvelope {
    claimed_by: Claim,
}

#[derive(Deserialize)]
struct ReviewableEnvelope {
    reviewable: Reviewable,
}

#[derive(Deserialize)]
struct ListEnvelope {
    reviewables: Vec<Reviewable>,
}

#[derive(Deserialize)]
struct Ack {}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    reviewable: Option<Reviewable>,
}

fn error_from(status: u16, body: ErrorBody) -> ApiError {
    let message = body
        .error
        .unwrap_or_else(|| format!("server responded with status {status}"));
    match body.error_type.as_deref() {
        Some("version_conflict") => ApiError::VersionConflict {
            message,
            current: body.reviewable.map(Box::new),
        },
        Some("claim_conflict") => ApiError::ClaimConflict { message },
        kind => ApiError::Rejected {
            status,
            kind: kind.unwrap_or("error").to_string(),
            message,
        },
    }
}

// ─── HttpReviewApi ────────────────────────────────────────────────────────

/// [`ReviewApi`] over HTTP, acting as one moderator.
///
/// The moderator identity is sent with every request in the
/// `x-moderator-id` / `x-moderator-username` headers.
#[derive(Clone)]
pub struct HttpReviewApi {
    client: reqwest::Client,
    base_url: String,
    actor: UserRef,
}

impl HttpReviewApi {
    pub fn new(base_url: impl Into<String>, actor: UserRef) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, actor)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, actor: UserRef) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            actor,
        }
    }

    pub fn actor(&self) -> &UserRef {
        &self.actor
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(MODERATOR_ID_HEADER, self.actor.id.to_string())
            .header(MODERATOR_USERNAME_HEADER, &self.actor.username)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()));
        }
        let body = resp.json::<ErrorBody>().await.unwrap_or_default();
        Err(error_from(status.as_u16(), body))
    }

    /// Open the `GET /events` stream carrying both broadcast channels.
    pub async fn connect_events(&self) -> Result<EventFeed, ApiError> {
        let resp = self
            .request(Method::GET, "/events")
            .header("accept", "text/event-stream")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.json::<ErrorBody>().await.unwrap_or_default();
            return Err(error_from(status.as_u16(), body));
        }
        Ok(EventFeed::new(resp))
    }
}

#[async_trait]
impl ReviewApi for HttpReviewApi {
    async fn perform(
        &self,
        id: ReviewableId,
        server_action: &str,
        version: u64,
        data: &Map<String, Value>,
    ) -> Result<PerformResult, ApiError> {
        let req = self
            .request(Method::PUT, &format!("/review/{id}/perform/{server_action}"))
            .query(&[("version", version)])
            .json(data);
        let resp: PerformResponse = self.send(req).await?;
        Ok(resp.reviewable_perform_result)
    }

    async fn claim_topic(&self, topic: TopicId, automatic: bool) -> Result<Claim, ApiError> {
        let req = self
            .request(Method::POST, "/reviewable_claimed_topics")
            .json(&json!({ "topic_id": topic, "automatic": automatic }));
        let resp: ClaimEnvelope = self.send(req).await?;
        Ok(resp.claimed_by)
    }

    async fn release_topic(&self, topic: TopicId, automatic: bool) -> Result<(), ApiError> {
        let req = self
            .request(Method::DELETE, &format!("/reviewable_claimed_topics/{topic}"))
            .json(&json!({ "automatic": automatic }));
        let _: Ack = self.send(req).await?;
        Ok(())
    }

    async fn fetch(&self, id: ReviewableId) -> Result<Reviewable, ApiError> {
        let resp: ReviewableEnvelope = self.send(self.request(Method::GET, &format!("/review/{id}"))).await?;
        Ok(resp.reviewable)
    }

    async fn list(&self) -> Result<Vec<Reviewable>, ApiError> {
        let resp: ListEnvelope = self.send(self.request(Method::GET, "/review")).await?;
        Ok(resp.reviewables)
    }

    async fn update(
        &self,
        id: ReviewableId,
        version: u64,
        updates: &Map<String, Value>,
    ) -> Result<Reviewable, ApiError> {
        let req = self
            .request(Method::PUT, &format!("/review/{id}"))
            .query(&[("version", version)])
            .json(&json!({ "reviewable": updates }));
        let resp: ReviewableEnvelope = self.send(req).await?;
        Ok(resp.reviewable)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn api(server: &mockito::ServerGuard) -> HttpReviewApi {
        HttpReviewApi::new(server.url(), UserRef::new(7, "mod_a"))
    }

    #[tokio::test]
    async fn perform_sends_version_identity_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/review/1/perform/approve_post")
            .match_query(Matcher::UrlEncoded("version".into(), "3".into()))
            .match_header("x-moderator-id", "7")
            .match_header("x-moderator-username", "mod_a")
            .match_body(Matcher::Json(json!({ "send_email": true })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"reviewable_perform_result":{"success":true,"version":4,"reviewable_count":2}}"#,
            )
            .create_async()
            .await;

        let mut data = Map::new();
        data.insert("send_email".into(), json!(true));
        let result = api(&server)
            .perform(ReviewableId(1), "approve_post", 3, &data)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.success);
        assert_eq!(result.version, Some(4));
        assert_eq!(result.reviewable_count, Some(2));
    }

    #[tokio::test]
    async fn version_conflict_carries_current_reviewable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/review/1/perform/approve_post")
            .match_query(Matcher::Any)
            .with_status(409)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error":"stale","error_type":"version_conflict","reviewable":{"id":1,"type":"ReviewableFlaggedPost","version":5}}"#,
            )
            .create_async()
            .await;

        let err = api(&server)
            .perform(ReviewableId(1), "approve_post", 3, &Map::new())
            .await
            .unwrap_err();
        match err {
            ApiError::VersionConflict { message, current } => {
                assert_eq!(message, "stale");
                assert_eq!(current.unwrap().version, 5);
            }
            other => panic!("expected VersionConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn claim_conflict_is_distinguished() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/reviewable_claimed_topics")
            .match_body(Matcher::Json(json!({ "topic_id": 9, "automatic": true })))
            .with_status(409)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"topic 9 is already claimed by mod_b","error_type":"claim_conflict"}"#)
            .create_async()
            .await;

        let err = api(&server).claim_topic(TopicId(9), true).await.unwrap_err();
        assert!(matches!(err, ApiError::ClaimConflict { .. }));
    }

    #[tokio::test]
    async fn claim_and_release_round_trip() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/reviewable_claimed_topics")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"claimed_by":{"user":{"id":7,"username":"mod_a"},"automatic":true}}"#)
            .create_async()
            .await;
        let release = server
            .mock("DELETE", "/reviewable_claimed_topics/9")
            .match_body(Matcher::Json(json!({ "automatic": true })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        let api = api(&server);
        let claim = api.claim_topic(TopicId(9), true).await.unwrap();
        assert!(claim.automatic);
        assert_eq!(claim.user.username, "mod_a");
        api.release_topic(TopicId(9), true).await.unwrap();
        release.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_without_json_body_is_rejected_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/review/4")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = api(&server).fetch(ReviewableId(4)).await.unwrap_err();
        match err {
            ApiError::Rejected { status, message, .. } => {
                assert_eq!(status, 502);
                assert!(message.contains("502"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }
}
