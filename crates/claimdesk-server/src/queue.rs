use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use claimdesk_core::error::{CoreError, Result};
use claimdesk_core::{
    ActionCompleted, BusMessage, Claim, ClaimMode, ClaimTransfer, PerformResult, Reviewable,
    ReviewableId, ReviewableStatus, TopicId, UserRef,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Seed file
// ---------------------------------------------------------------------------

/// YAML seed for a review queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub claim_mode: ClaimMode,
    #[serde(default)]
    pub reviewables: Vec<Reviewable>,
}

/// A successful perform: the result to return and what to broadcast.
#[derive(Debug, Clone)]
pub struct Performed {
    pub result: PerformResult,
    pub events: Vec<BusMessage>,
}

// ---------------------------------------------------------------------------
// ReviewQueue
// ---------------------------------------------------------------------------

/// The backend's source of truth: reviewables, versions and topic claims.
#[derive(Debug, Default)]
pub struct ReviewQueue {
    items: BTreeMap<ReviewableId, Reviewable>,
    claims: HashMap<TopicId, Claim>,
    claim_mode: ClaimMode,
}

impl ReviewQueue {
    pub fn new(claim_mode: ClaimMode) -> Self {
        Self {
            claim_mode,
            ..Default::default()
        }
    }

    pub fn from_seed(seed: SeedFile) -> Self {
        let mut queue = Self::new(seed.claim_mode);
        for reviewable in seed.reviewables {
            queue.insert(reviewable);
        }
        queue
    }

    pub fn load_seed(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let seed: SeedFile = serde_yaml::from_str(&data)?;
        Ok(Self::from_seed(seed))
    }

    pub fn claim_mode(&self) -> ClaimMode {
        self.claim_mode
    }

    pub fn set_claim_mode(&mut self, mode: ClaimMode) {
        self.claim_mode = mode;
    }

    /// Add a reviewable. A claim it carries becomes the topic's claim.
    pub fn insert(&mut self, mut reviewable: Reviewable) {
        if let Some(topic) = reviewable.topic_id {
            match (&reviewable.claimed_by, self.claims.get(&topic)) {
                (_, Some(existing)) => reviewable.claimed_by = Some(existing.clone()),
                (Some(claim), None) => {
                    self.claims.insert(topic, claim.clone());
                }
                (None, None) => {}
            }
        }
        self.items.insert(reviewable.id, reviewable);
    }

    pub fn get(&self, id: ReviewableId) -> Result<&Reviewable> {
        self.items.get(&id).ok_or(CoreError::ReviewableNotFound(id))
    }

    pub fn pending(&self) -> Vec<Reviewable> {
        self.items
            .values()
            .filter(|r| !r.status.is_resolved())
            .cloned()
            .collect()
    }

    pub fn pending_count(&self) -> u64 {
        self.items
            .values()
            .filter(|r| !r.status.is_resolved())
            .count() as u64
    }

    pub fn topic_claim(&self, topic: TopicId) -> Option<&Claim> {
        self.claims.get(&topic)
    }

    fn set_topic_claim(&mut self, topic: TopicId, claim: Option<Claim>) {
        match &claim {
            Some(c) => {
                self.claims.insert(topic, c.clone());
            }
            None => {
                self.claims.remove(&topic);
            }
        }
        for item in self.items.values_mut().filter(|r| r.topic_id == Some(topic)) {
            item.claimed_by = claim.clone();
        }
    }

    /// Reject a mutation on `reviewable` by `actor` unless it is pending, at
    /// `version`, and not locked by another moderator's claim.
    fn check_writable(&self, reviewable: &Reviewable, version: u64, actor: &UserRef) -> Result<()> {
        if reviewable.status.is_resolved() {
            return Err(CoreError::AlreadyResolved(reviewable.id));
        }
        if reviewable.version != version {
            return Err(CoreError::VersionConflict {
                id: reviewable.id,
                expected: version,
                current: reviewable.version,
            });
        }
        if let Some(topic) = reviewable.topic_id {
            match self.claims.get(&topic) {
                Some(claim) if claim.user.id != actor.id => {
                    return Err(CoreError::ClaimConflict {
                        topic,
                        holder: claim.user.username.clone(),
                    });
                }
                None if self.claim_mode == ClaimMode::Required => {
                    return Err(CoreError::ClaimRequired(topic));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply `action` to a pending reviewable at `version`.
    ///
    /// Resolving the last pending reviewable of a topic drops an automatic
    /// claim on it.
    pub fn perform(
        &mut self,
        id: ReviewableId,
        action: &str,
        version: u64,
        actor: &UserRef,
        data: &Map<String, Value>,
    ) -> Result<Performed> {
        let reviewable = self.get(id)?;
        self.check_writable(reviewable, version, actor)?;
        if !reviewable.actions.is_empty() && reviewable.action(action).is_none() {
            return Err(CoreError::UnknownAction(action.to_string()));
        }
        let status = ReviewableStatus::for_action(action)
            .ok_or_else(|| CoreError::UnknownAction(action.to_string()))?;
        let topic = reviewable.topic_id;

        let item = self
            .items
            .get_mut(&id)
            .ok_or(CoreError::ReviewableNotFound(id))?;
        item.status = status;
        item.version += 1;
        if let Some(reason) = data.get("reject_reason").and_then(Value::as_str) {
            item.reject_reason = Some(reason.to_string());
        }
        if let Some(send_email) = data.get("send_email").and_then(Value::as_bool) {
            item.send_email = Some(send_email);
        }
        let new_version = item.version;

        let mut events = Vec::new();
        if let Some(topic) = topic {
            let topic_done = !self
                .items
                .values()
                .any(|r| r.topic_id == Some(topic) && !r.status.is_resolved());
            let automatic = self.claims.get(&topic).is_some_and(|c| c.automatic);
            if topic_done && automatic {
                self.set_topic_claim(topic, None);
                events.push(BusMessage::ClaimTransfer(ClaimTransfer {
                    topic_id: topic,
                    user: None,
                    automatic: None,
                }));
            }
        }

        let reviewable_count = self.pending_count();
        events.push(BusMessage::ActionCompleted(ActionCompleted {
            remove_reviewable_ids: vec![id],
            reviewable_count: Some(reviewable_count),
            unseen_reviewable_count: None,
        }));

        let result = PerformResult {
            success: true,
            transition_to: Some(status),
            version: Some(new_version),
            reviewable: self.items.get(&id).cloned(),
            remove_reviewable_ids: Some(vec![id]),
            reviewable_count: Some(reviewable_count),
            unseen_reviewable_count: None,
        };
        Ok(Performed { result, events })
    }

    /// Claim `topic` for `actor`. Claiming a topic you already hold returns
    /// the existing claim and broadcasts nothing, except that an explicit
    /// request upgrades an automatic claim. An explicit claim is never
    /// downgraded.
    pub fn claim(
        &mut self,
        topic: TopicId,
        actor: &UserRef,
        automatic: bool,
    ) -> Result<(Claim, Option<BusMessage>)> {
        if let Some(existing) = self.claims.get(&topic) {
            if existing.user.id != actor.id {
                return Err(CoreError::ClaimConflict {
                    topic,
                    holder: existing.user.username.clone(),
                });
            }
            if !existing.automatic || automatic {
                return Ok((existing.clone(), None));
            }
        }
        let claim = Claim {
            user: actor.clone(),
            automatic,
        };
        self.set_topic_claim(topic, Some(claim.clone()));
        let event = BusMessage::ClaimTransfer(ClaimTransfer {
            topic_id: topic,
            user: Some(actor.clone()),
            automatic: Some(automatic),
        });
        Ok((claim, Some(event)))
    }

    /// Release `actor`'s claim on `topic`. Releasing an unclaimed topic is a
    /// no-op, and so is an automatic release of an explicit claim.
    pub fn unclaim(
        &mut self,
        topic: TopicId,
        actor: &UserRef,
        automatic: bool,
    ) -> Result<Option<BusMessage>> {
        match self.claims.get(&topic) {
            None => Ok(None),
            Some(existing) if existing.user.id != actor.id => Err(CoreError::ClaimConflict {
                topic,
                holder: existing.user.username.clone(),
            }),
            Some(existing) if automatic && !existing.automatic => Ok(None),
            Some(_) => {
                self.set_topic_claim(topic, None);
                Ok(Some(BusMessage::ClaimTransfer(ClaimTransfer {
                    topic_id: topic,
                    user: None,
                    automatic: None,
                })))
            }
        }
    }

    /// Merge field edits into a pending reviewable at `version`.
    pub fn update(
        &mut self,
        id: ReviewableId,
        version: u64,
        actor: &UserRef,
        updates: &Map<String, Value>,
    ) -> Result<Reviewable> {
        let reviewable = self.get(id)?;
        self.check_writable(reviewable, version, actor)?;
        let item = self
            .items
            .get_mut(&id)
            .ok_or(CoreError::ReviewableNotFound(id))?;
        item.apply_updates(updates);
        item.version += 1;
        Ok(item.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
