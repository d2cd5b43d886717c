use thiserror::Error;

use crate::types::{ReviewableId, TopicId};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("reviewable not found: {0}")]
    ReviewableNotFound(ReviewableId),

    #[error("reviewable {0} has already been resolved")]
    AlreadyResolved(ReviewableId),

    #[error("reviewable {id} was modified by someone else (expected version {expected}, current version {current})")]
    VersionConflict {
        id: ReviewableId,
        expected: u64,
        current: u64,
    },

    #[error("topic {topic} is already claimed by {holder}")]
    ClaimConflict { topic: TopicId, holder: String },

    #[error("you must claim topic {0} before acting on it")]
    ClaimRequired(TopicId),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid claim mode: {0}")]
    InvalidClaimMode(String),

    #[error("cannot override built-in workflow for '{action}' (mapped to '{workflow}')")]
    ReservedWorkflow { action: String, workflow: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Stable machine-readable tag, sent alongside the message in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::ReviewableNotFound(_) => "not_found",
            CoreError::AlreadyResolved(_) => "already_resolved",
            CoreError::VersionConflict { .. } => "version_conflict",
            CoreError::ClaimConflict { .. } => "claim_conflict",
            CoreError::ClaimRequired(_) => "claim_required",
            CoreError::UnknownAction(_)
            | CoreError::InvalidStatus(_)
            | CoreError::InvalidClaimMode(_)
            | CoreError::ReservedWorkflow { .. }
            | CoreError::InvalidConfig(_) => "invalid",
            CoreError::Io(_) | CoreError::Yaml(_) | CoreError::Json(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
