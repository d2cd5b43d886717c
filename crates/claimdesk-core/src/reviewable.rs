use crate::action::PerformableAction;
use crate::types::{ReviewableId, ReviewableStatus, TopicId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// UserRef / Claim
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub username: String,
}

impl UserRef {
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            username: username.into(),
        }
    }
}

/// Exclusivity marker on a reviewable's topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub user: UserRef,
    /// True when the claim was taken as a side effect of starting an action.
    #[serde(default)]
    pub automatic: bool,
}

impl Claim {
    pub fn automatic(user: UserRef) -> Self {
        Self {
            user,
            automatic: true,
        }
    }

    pub fn explicit(user: UserRef) -> Self {
        Self {
            user,
            automatic: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Reviewable
// ---------------------------------------------------------------------------

/// A unit of moderator work: a flagged post, a queued user, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reviewable {
    pub id: ReviewableId,
    #[serde(rename = "type")]
    pub reviewable_type: String,
    #[serde(default)]
    pub status: ReviewableStatus,
    /// Optimistic-concurrency token owned by the backend.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub topic_id: Option<TopicId>,
    #[serde(default)]
    pub claimed_by: Option<Claim>,
    #[serde(default)]
    pub target_created_by: Option<UserRef>,
    #[serde(default)]
    pub post_id: Option<u64>,
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub send_email: Option<bool>,
    #[serde(default)]
    pub reject_reason: Option<String>,
    #[serde(default)]
    pub created_from_flag: bool,
    #[serde(default)]
    pub category_id: Option<u64>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub actions: Vec<PerformableAction>,
    /// Type-specific attributes not modelled above.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Reviewable {
    pub fn new(id: u64, reviewable_type: impl Into<String>) -> Self {
        Self {
            id: ReviewableId(id),
            reviewable_type: reviewable_type.into(),
            status: ReviewableStatus::Pending,
            version: 0,
            topic_id: None,
            claimed_by: None,
            target_created_by: None,
            post_id: None,
            raw: None,
            send_email: None,
            reject_reason: None,
            created_from_flag: false,
            category_id: None,
            created_at: Utc::now(),
            actions: Vec::new(),
            fields: Map::new(),
        }
    }

    pub fn with_topic(mut self, topic: u64) -> Self {
        self.topic_id = Some(TopicId(topic));
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn with_action(mut self, action: PerformableAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn is_claimed_by(&self, user: UserId) -> bool {
        self.claimed_by.as_ref().is_some_and(|c| c.user.id == user)
    }

    /// The current claim if it belongs to someone other than `user`.
    pub fn claimed_by_other(&self, user: UserId) -> Option<&Claim> {
        self.claimed_by.as_ref().filter(|c| c.user.id != user)
    }

    pub fn action(&self, server_action: &str) -> Option<&PerformableAction> {
        self.actions.iter().find(|a| a.server_action == server_action)
    }

    /// Look up a field by name, checking typed attributes before the
    /// type-specific map.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "post_id" => self.post_id.map(Value::from),
            "raw" => self.raw.clone().map(Value::from),
            "category_id" => self.category_id.map(Value::from),
            "send_email" => self.send_email.map(Value::from),
            "reject_reason" => self.reject_reason.clone().map(Value::from),
            _ => self.fields.get(name).cloned(),
        }
    }

    /// Merge edit updates. `category_id` is typed; `payload` objects are
    /// merged key by key; everything else lands in the type-specific map.
    pub fn apply_updates(&mut self, updates: &Map<String, Value>) {
        for (key, value) in updates {
            match key.as_str() {
                "category_id" => self.category_id = value.as_u64(),
                "payload" => {
                    let Value::Object(incoming) = value else {
                        continue;
                    };
                    let slot = self
                        .fields
                        .entry("payload")
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(existing) = slot {
                        for (k, v) in incoming {
                            existing.insert(k.clone(), v.clone());
                        }
                    } else {
                        *slot = Value::Object(incoming.clone());
                    }
                }
                _ => {
                    self.fields.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// Drop nested objects that carry no updates.
pub fn prune_empty_updates(updates: &mut Map<String, Value>) {
    updates.retain(|_, v| !matches!(v, Value::Object(m) if m.is_empty()));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
