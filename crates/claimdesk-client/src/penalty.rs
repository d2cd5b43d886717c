use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use claimdesk_core::{Reviewable, ReviewableId, UserRef};
use tracing::{debug, warn};

use crate::claim::ClaimManager;
use crate::coordinator::Dispatch;
use crate::error::ClientError;
use crate::notify::Notifier;
use crate::workflow::ClientWorkflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PenaltyKind {
    Suspend,
    Silence,
}

impl PenaltyKind {
    /// Client action name that selects this penalty.
    pub fn as_str(self) -> &'static str {
        match self {
            PenaltyKind::Suspend => "suspend",
            PenaltyKind::Silence => "silence",
        }
    }
}

impl fmt::Display for PenaltyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the penalty tool gets to work with.
pub struct PenaltyContext<'a> {
    pub reviewable_id: ReviewableId,
    pub post_id: Option<u64>,
    /// The reviewed post's raw body.
    pub post_edit: Option<String>,
    /// Sends the pending moderation action.
    pub before: &'a Dispatch<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PenaltyResult {
    pub success: bool,
}

/// Applies a suspension or silence to a user.
#[async_trait]
pub trait PenaltyTool: Send + Sync {
    async fn penalize(
        &self,
        kind: PenaltyKind,
        user: &UserRef,
        ctx: PenaltyContext<'_>,
    ) -> PenaltyResult;
}

/// The `suspend` / `silence` client workflows.
///
/// On a failed penalty, an automatic claim taken for this action is released
/// so the topic is not left locked. Explicit claims stay.
pub struct PenaltyWorkflow {
    kind: PenaltyKind,
    tool: Option<Arc<dyn PenaltyTool>>,
    claims: Arc<ClaimManager>,
    notifier: Arc<dyn Notifier>,
}

impl PenaltyWorkflow {
    pub fn new(
        kind: PenaltyKind,
        tool: Option<Arc<dyn PenaltyTool>>,
        claims: Arc<ClaimManager>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            kind,
            tool,
            claims,
            notifier,
        }
    }

    pub fn kind(&self) -> PenaltyKind {
        self.kind
    }

    /// Run the penalty against the reviewable's target user. `None` when no
    /// penalty tool is available.
    pub async fn penalize(
        &self,
        reviewable: &Reviewable,
        dispatch: &Dispatch<'_>,
    ) -> Option<PenaltyResult> {
        let tool = self.tool.as_ref()?;
        let result = match &reviewable.target_created_by {
            Some(user) => {
                let ctx = PenaltyContext {
                    reviewable_id: reviewable.id,
                    post_id: reviewable.post_id,
                    post_edit: reviewable.raw.clone(),
                    before: dispatch,
                };
                tool.penalize(self.kind, user, ctx).await
            }
            None => {
                warn!(id = %reviewable.id, kind = %self.kind, "reviewable has no target user");
                PenaltyResult::default()
            }
        };

        if !result.success {
            // `reviewable` is the snapshot taken when the workflow started.
            match self.claims.release(reviewable).await {
                Ok(true) => debug!(id = %reviewable.id, kind = %self.kind, "penalty failed, claim rolled back"),
                Ok(false) => {}
                Err(e) => self.notifier.error(&e.to_string()),
            }
        }
        Some(result)
    }
}

#[async_trait]
impl ClientWorkflow for PenaltyWorkflow {
    async fn run(&self, reviewable: &Reviewable, dispatch: &Dispatch<'_>) -> Result<(), ClientError> {
        if self.penalize(reviewable, dispatch).await.is_none() {
            debug!(id = %reviewable.id, kind = %self.kind, "no penalty tool available");
        }
        Ok(())
    }
}
