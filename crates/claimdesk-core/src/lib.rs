pub mod action;
pub mod config;
pub mod error;
pub mod events;
pub mod reviewable;
pub mod types;

pub use action::{build_perform_payload, PerformResponse, PerformResult, PerformableAction};
pub use config::CoordinatorConfig;
pub use error::{CoreError, Result};
pub use events::{ActionCompleted, BusMessage, ClaimTransfer};
pub use reviewable::{Claim, Reviewable, UserRef};
pub use types::{
    ClaimMode, ReviewableId, ReviewableStatus, TopicId, UserId, MODERATOR_ID_HEADER,
    MODERATOR_USERNAME_HEADER,
};
