//! Moderator-side client for the claimdesk review queue.
//!
//! A [`ModeratorSession`] wires together:
//!
//! - a [`ReviewableStore`] holding the local view of the queue,
//! - a [`ClaimManager`] for topic claims,
//! - an [`ActionCoordinator`] that runs actions under the version guard,
//! - a [`LiveUpdateChannel`] merging broadcasts from other sessions.
//!
//! The backend is reached through the [`ReviewApi`] trait; [`HttpReviewApi`]
//! implements it over HTTP.
//!
//! ```no_run
//! use std::sync::Arc;
//! use claimdesk_client::{HttpReviewApi, ModeratorSession};
//! use claimdesk_core::{ReviewableId, UserRef};
//!
//! # async fn run() -> claimdesk_client::Result<()> {
//! let actor = UserRef::new(1, "alice");
//! let http = HttpReviewApi::new("http://localhost:7800", actor.clone());
//! let session = ModeratorSession::builder(Arc::new(http.clone()), actor).build()?;
//! session.load_queue().await?;
//! let _live = session.subscribe();
//! session.follow(http.connect_events().await?);
//! session
//!     .perform(ReviewableId(1), "approve_post", Default::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod claim;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod live;
pub mod notify;
pub mod penalty;
pub mod session;
pub mod sse;
pub mod store;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use api::ReviewApi;
pub use claim::{ClaimManager, ClaimStatus};
pub use coordinator::{AbortReason, ActionCoordinator, Completion, Dispatch, PerformOutcome};
pub use error::{ApiError, ClientError};
pub use http::HttpReviewApi;
pub use live::{LiveSubscription, LiveUpdateChannel, MessageBus};
pub use notify::{AutoConfirm, Notifier, Prompt, TracingNotifier};
pub use penalty::{PenaltyContext, PenaltyKind, PenaltyResult, PenaltyTool, PenaltyWorkflow};
pub use session::{ModeratorSession, SessionBuilder};
pub use sse::EventFeed;
pub use store::{ReviewCounts, ReviewableStore, StoreChange, UpdateGuard};
pub use workflow::{
    ActionForm, ClientWorkflow, EditWorkflow, PostEditor, StaticForm, WorkflowRegistry,
};

pub type Result<T> = std::result::Result<T, ClientError>;
