use async_trait::async_trait;
use claimdesk_core::{Claim, PerformResult, Reviewable, ReviewableId, TopicId};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// The review backend as seen by one moderator session.
///
/// Every call is made on behalf of the session's actor; implementations carry
/// the identity themselves.
#[async_trait]
pub trait ReviewApi: Send + Sync {
    /// `PUT /review/{id}/perform/{server_action}?version={version}`
    async fn perform(
        &self,
        id: ReviewableId,
        server_action: &str,
        version: u64,
        data: &Map<String, Value>,
    ) -> Result<PerformResult, ApiError>;

    /// `POST /reviewable_claimed_topics`. Returns the claim now on record.
    async fn claim_topic(&self, topic: TopicId, automatic: bool) -> Result<Claim, ApiError>;

    /// `DELETE /reviewable_claimed_topics/{topic}`
    async fn release_topic(&self, topic: TopicId, automatic: bool) -> Result<(), ApiError>;

    /// `GET /review/{id}`
    async fn fetch(&self, id: ReviewableId) -> Result<Reviewable, ApiError>;

    /// `GET /review`
    async fn list(&self) -> Result<Vec<Reviewable>, ApiError>;

    /// `PUT /review/{id}?version={version}`
    async fn update(
        &self,
        id: ReviewableId,
        version: u64,
        updates: &Map<String, Value>,
    ) -> Result<Reviewable, ApiError>;
}
