use crate::reviewable::UserRef;
use crate::types::{ReviewableId, TopicId};
use serde::{Deserialize, Serialize};

pub const CLAIM_TRANSFER: &str = "claim-transfer";
pub const ACTION_COMPLETED: &str = "action-completed";
/// Sent to a subscriber that fell behind and missed events.
pub const RESYNC: &str = "resync";

/// Claim on a topic changed hands. A missing `user` means released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTransfer {
    pub topic_id: TopicId,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub automatic: Option<bool>,
}

/// Some session resolved reviewables.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionCompleted {
    #[serde(default)]
    pub remove_reviewable_ids: Vec<ReviewableId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewable_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unseen_reviewable_count: Option<u64>,
}

/// A message on one of the broadcast channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMessage {
    ClaimTransfer(ClaimTransfer),
    ActionCompleted(ActionCompleted),
    /// Events were dropped; the receiver should reload the whole queue.
    Resync,
}

impl BusMessage {
    pub fn channel(&self) -> &'static str {
        match self {
            BusMessage::ClaimTransfer(_) => CLAIM_TRANSFER,
            BusMessage::ActionCompleted(_) => ACTION_COMPLETED,
            BusMessage::Resync => RESYNC,
        }
    }

    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            BusMessage::ClaimTransfer(ev) => serde_json::to_string(ev),
            BusMessage::ActionCompleted(ev) => serde_json::to_string(ev),
            BusMessage::Resync => Ok("{}".to_string()),
        }
    }

    /// Decode a message from its channel name and JSON payload. Unknown
    /// channels yield `Ok(None)`. A `resync` payload is ignored.
    pub fn decode(channel: &str, payload: &str) -> serde_json::Result<Option<BusMessage>> {
        match channel {
            CLAIM_TRANSFER => {
                serde_json::from_str(payload).map(|ev| Some(BusMessage::ClaimTransfer(ev)))
            }
            ACTION_COMPLETED => {
                serde_json::from_str(payload).map(|ev| Some(BusMessage::ActionCompleted(ev)))
            }
            RESYNC => Ok(Some(BusMessage::Resync)),
            _ => Ok(None),
        }
    }
}
