use std::sync::Arc;

use claimdesk_core::{Claim, ClaimMode, Reviewable, ReviewableId, UserRef};
use tracing::debug;

use crate::api::ReviewApi;
use crate::error::{ApiError, ClientError};
use crate::notify::Notifier;
use crate::store::ReviewableStore;

/// How a reviewable's claim looks to the acting moderator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimStatus {
    ClaimedByYou,
    AutomaticallyClaimedBy(UserRef),
    ClaimedByOther(UserRef),
    /// Unclaimed; claiming is optional.
    Optional,
    /// Unclaimed in any mode other than optional.
    Required,
}

/// Topic claims for one moderator.
pub struct ClaimManager {
    api: Arc<dyn ReviewApi>,
    store: Arc<ReviewableStore>,
    notifier: Arc<dyn Notifier>,
    actor: UserRef,
    mode: ClaimMode,
}

impl ClaimManager {
    pub fn new(
        api: Arc<dyn ReviewApi>,
        store: Arc<ReviewableStore>,
        notifier: Arc<dyn Notifier>,
        actor: UserRef,
        mode: ClaimMode,
    ) -> Self {
        Self {
            api,
            store,
            notifier,
            actor,
            mode,
        }
    }

    pub fn actor(&self) -> &UserRef {
        &self.actor
    }

    pub fn mode(&self) -> ClaimMode {
        self.mode
    }

    /// Make sure the actor holds the claim on the reviewable's topic, taking
    /// an automatic claim if the topic is free.
    ///
    /// Returns `false` without touching local state when someone else holds
    /// the claim or the backend refuses it.
    pub async fn ensure_claimed(&self, id: ReviewableId) -> bool {
        let Some(reviewable) = self.store.get(id) else {
            return false;
        };
        let Some(topic) = reviewable.topic_id else {
            return true;
        };
        if reviewable.is_claimed_by(self.actor.id) {
            return true;
        }
        if let Some(other) = reviewable.claimed_by_other(self.actor.id) {
            debug!(%id, %topic, holder = %other.user.username, "topic claimed by another moderator");
            return false;
        }

        match self.api.claim_topic(topic, true).await {
            Ok(claim) => {
                let mine = claim.user.id == self.actor.id;
                self.store.set_topic_claim(topic, Some(claim));
                mine
            }
            Err(ApiError::ClaimConflict { message }) => {
                debug!(%id, %topic, "automatic claim refused: {message}");
                false
            }
            Err(e) => {
                self.notifier.error(&e.to_string());
                false
            }
        }
    }

    /// Roll back an automatic claim held by the actor, given the reviewable
    /// as it looked when the claim was captured.
    ///
    /// Explicit claims and claims held by others are left alone; returns
    /// whether a release was sent.
    pub async fn release(&self, snapshot: &Reviewable) -> Result<bool, ApiError> {
        let Some(topic) = snapshot.topic_id else {
            return Ok(false);
        };
        match &snapshot.claimed_by {
            Some(claim) if claim.automatic && claim.user.id == self.actor.id => {}
            _ => return Ok(false),
        }
        self.api.release_topic(topic, true).await?;
        self.store.set_topic_claim(topic, None);
        debug!(id = %snapshot.id, %topic, "released automatic claim");
        Ok(true)
    }

    /// Take an explicit claim on the reviewable's topic.
    pub async fn claim(&self, id: ReviewableId) -> Result<Claim, ClientError> {
        let reviewable = self
            .store
            .get(id)
            .ok_or(ClientError::UnknownReviewable(id))?;
        let Some(topic) = reviewable.topic_id else {
            return Err(ClientError::NoTopic(id));
        };
        let claim = self.api.claim_topic(topic, false).await?;
        self.store.set_topic_claim(topic, Some(claim.clone()));
        Ok(claim)
    }

    /// Release the actor's own claim on the reviewable's topic.
    pub async fn unclaim(&self, id: ReviewableId) -> Result<(), ClientError> {
        let reviewable = self
            .store
            .get(id)
            .ok_or(ClientError::UnknownReviewable(id))?;
        let Some(topic) = reviewable.topic_id else {
            return Err(ClientError::NoTopic(id));
        };
        let automatic = reviewable.claimed_by.as_ref().is_some_and(|c| c.automatic);
        self.api.release_topic(topic, automatic).await?;
        self.store.set_topic_claim(topic, None);
        Ok(())
    }

    pub fn claim_enabled(&self, reviewable: &Reviewable) -> bool {
        let automatic = reviewable.claimed_by.as_ref().is_some_and(|c| c.automatic);
        reviewable.topic_id.is_some() && (self.mode != ClaimMode::Disabled || automatic)
    }

    /// Whether the actor may act on the reviewable under the claim mode.
    pub fn can_perform(&self, reviewable: &Reviewable) -> bool {
        if !self.claim_enabled(reviewable) {
            return true;
        }
        match &reviewable.claimed_by {
            Some(claim) => claim.user.id == self.actor.id,
            None => self.mode != ClaimMode::Required,
        }
    }

    pub fn claim_status(&self, reviewable: &Reviewable) -> ClaimStatus {
        match &reviewable.claimed_by {
            Some(claim) if claim.user.id == self.actor.id => ClaimStatus::ClaimedByYou,
            Some(claim) if claim.automatic => ClaimStatus::AutomaticallyClaimedBy(claim.user.clone()),
            Some(claim) => ClaimStatus::ClaimedByOther(claim.user.clone()),
            None if self.mode == ClaimMode::Optional => ClaimStatus::Optional,
            None => ClaimStatus::Required,
        }
    }
}
