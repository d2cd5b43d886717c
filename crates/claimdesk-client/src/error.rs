use claimdesk_core::{CoreError, Reviewable, ReviewableId};
use thiserror::Error;

/// Failure talking to the review backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The topic is claimed by someone else. A normal flow-control outcome.
    #[error("{message}")]
    ClaimConflict { message: String },

    /// The local version is stale. `current` carries the server's copy when
    /// the response included one.
    #[error("{message}")]
    VersionConflict {
        message: String,
        current: Option<Box<Reviewable>>,
    },

    /// Any other non-2xx response.
    #[error("{message}")]
    Rejected {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("an action on reviewable {0} is already in progress")]
    InFlight(ReviewableId),

    #[error("reviewable {0} is not loaded in this session")]
    UnknownReviewable(ReviewableId),

    #[error("the action on reviewable {0} was already sent")]
    AlreadyDispatched(ReviewableId),

    #[error("reviewable {0} has no topic to claim")]
    NoTopic(ReviewableId),

    #[error("reviewable {id} has no action '{action}'")]
    UnknownAction { id: ReviewableId, action: String },

    #[error("no handler registered for workflow '{0}'")]
    UnregisteredWorkflow(String),

    #[error("action '{action}' is mapped to workflow '{workflow}' but no form is registered for it")]
    MissingForm { action: String, workflow: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
