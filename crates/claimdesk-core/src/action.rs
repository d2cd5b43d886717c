use crate::reviewable::Reviewable;
use crate::types::{ReviewableId, ReviewableStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// PerformableAction
// ---------------------------------------------------------------------------

/// An action the current moderator may take on a reviewable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerformableAction {
    /// Name sent to the backend in the perform URL.
    pub server_action: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Pre-action workflow that runs on the client before dispatch.
    #[serde(default)]
    pub client_action: Option<String>,
    #[serde(default)]
    pub confirm_message: Option<String>,
    #[serde(default)]
    pub require_reject_reason: bool,
    #[serde(default)]
    pub completed_message: Option<String>,
}

impl PerformableAction {
    pub fn new(server_action: impl Into<String>) -> Self {
        Self {
            server_action: server_action.into(),
            ..Default::default()
        }
    }

    pub fn with_client_action(mut self, client_action: impl Into<String>) -> Self {
        self.client_action = Some(client_action.into());
        self
    }

    pub fn with_confirm(mut self, message: impl Into<String>) -> Self {
        self.confirm_message = Some(message.into());
        self
    }

    pub fn with_completed_message(mut self, message: impl Into<String>) -> Self {
        self.completed_message = Some(message.into());
        self
    }

    pub fn requiring_reject_reason(mut self) -> Self {
        self.require_reject_reason = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Perform payload
// ---------------------------------------------------------------------------

/// Build the body of a perform request.
///
/// Order of precedence, lowest first: the reviewable's `send_email` and
/// `reject_reason`, then the action's extra data, then any registered
/// per-type parameters whose local value is truthy.
pub fn build_perform_payload(
    reviewable: &Reviewable,
    extra: &Map<String, Value>,
    type_params: &[String],
) -> Map<String, Value> {
    let mut data = Map::new();
    if let Some(send_email) = reviewable.send_email {
        data.insert("send_email".into(), Value::Bool(send_email));
    }
    if let Some(reason) = &reviewable.reject_reason {
        data.insert("reject_reason".into(), Value::String(reason.clone()));
    }
    for (k, v) in extra {
        data.insert(k.clone(), v.clone());
    }
    for param in type_params {
        if let Some(value) = reviewable.field(param).filter(is_truthy) {
            data.insert(param.clone(), value);
        }
    }
    data
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ---------------------------------------------------------------------------
// PerformResult
// ---------------------------------------------------------------------------

/// Backend response to a perform request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_to: Option<ReviewableStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Definitive post-action representation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewable: Option<Reviewable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_reviewable_ids: Option<Vec<ReviewableId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewable_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unseen_reviewable_count: Option<u64>,
}

/// Envelope the backend wraps around a [`PerformResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformResponse {
    pub reviewable_perform_result: PerformResult,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
