use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use claimdesk_core::config::{BUILTIN_ACTION_WORKFLOWS, REJECT_REASON_WORKFLOW};
use claimdesk_core::reviewable::prune_empty_updates;
use claimdesk_core::{
    build_perform_payload, CoordinatorConfig, PerformResult, PerformableAction, Reviewable,
    ReviewableId,
};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::api::ReviewApi;
use crate::claim::ClaimManager;
use crate::error::{ApiError, ClientError};
use crate::notify::{Notifier, Prompt};
use crate::store::ReviewableStore;
use crate::workflow::WorkflowRegistry;
use crate::Result;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A dispatched action and what it did to the local store.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub result: PerformResult,
    /// Tracked ids removed because the result listed them.
    pub removed: Vec<ReviewableId>,
    /// Server copy the local reviewable was refreshed from, if any.
    pub refreshed: Option<Reviewable>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Someone else holds the topic claim, or the claim request failed.
    ClaimRefused,
    ConfirmationDismissed,
    FormDismissed,
    /// The client workflow finished without dispatching.
    WorkflowIncomplete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PerformOutcome {
    Completed(Completion),
    Aborted(AbortReason),
}

impl PerformOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PerformOutcome::Completed(_))
    }

    pub fn completion(&self) -> Option<&Completion> {
        match self {
            PerformOutcome::Completed(c) => Some(c),
            PerformOutcome::Aborted(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Handle a client workflow uses to send the pending action.
pub struct Dispatch<'a> {
    coordinator: &'a ActionCoordinator,
    id: ReviewableId,
    action: &'a PerformableAction,
    extra: Map<String, Value>,
    sent: AtomicBool,
    completion: Mutex<Option<Completion>>,
}

impl<'a> Dispatch<'a> {
    fn new(
        coordinator: &'a ActionCoordinator,
        id: ReviewableId,
        action: &'a PerformableAction,
        extra: Map<String, Value>,
    ) -> Self {
        Self {
            coordinator,
            id,
            action,
            extra,
            sent: AtomicBool::new(false),
            completion: Mutex::new(None),
        }
    }

    pub fn reviewable_id(&self) -> ReviewableId {
        self.id
    }

    pub fn action(&self) -> &PerformableAction {
        self.action
    }

    pub async fn perform(&self) -> Result<Completion> {
        self.perform_with(Map::new()).await
    }

    /// Send the action with additional payload fields on top of the ones
    /// already collected.
    ///
    /// The action is sent at most once: after a successful send, further
    /// calls fail with [`ClientError::AlreadyDispatched`]. A failed send may
    /// be retried.
    pub async fn perform_with(&self, more: Map<String, Value>) -> Result<Completion> {
        if self.sent.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyDispatched(self.id));
        }
        let mut data = self.extra.clone();
        data.extend(more);
        let completion = match self.coordinator.dispatch(self.id, self.action, &data).await {
            Ok(completion) => completion,
            Err(e) => {
                self.sent.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        *self.completion.lock().unwrap_or_else(|e| e.into_inner()) = Some(completion.clone());
        Ok(completion)
    }

    fn into_completion(self) -> Option<Completion> {
        self.completion.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// ActionCoordinator
// ---------------------------------------------------------------------------

/// Runs moderation actions: claim, pre-action workflow, versioned dispatch,
/// and reconciliation of the result into the store.
pub struct ActionCoordinator {
    api: Arc<dyn ReviewApi>,
    store: Arc<ReviewableStore>,
    claims: Arc<ClaimManager>,
    config: Arc<CoordinatorConfig>,
    workflows: WorkflowRegistry,
    notifier: Arc<dyn Notifier>,
    prompt: Arc<dyn Prompt>,
}

impl ActionCoordinator {
    /// Every configured action→form mapping must have a registered form,
    /// except the built-in ones.
    pub fn new(
        api: Arc<dyn ReviewApi>,
        store: Arc<ReviewableStore>,
        claims: Arc<ClaimManager>,
        config: Arc<CoordinatorConfig>,
        workflows: WorkflowRegistry,
        notifier: Arc<dyn Notifier>,
        prompt: Arc<dyn Prompt>,
    ) -> Result<Self> {
        for (action, workflow) in config.action_workflows() {
            let builtin = BUILTIN_ACTION_WORKFLOWS.iter().any(|(a, _)| *a == action);
            if !builtin && !workflows.has_form(workflow) {
                return Err(ClientError::MissingForm {
                    action: action.to_string(),
                    workflow: workflow.to_string(),
                });
            }
        }
        Ok(Self {
            api,
            store,
            claims,
            config,
            workflows,
            notifier,
            prompt,
        })
    }

    pub fn store(&self) -> &Arc<ReviewableStore> {
        &self.store
    }

    pub fn claims(&self) -> &Arc<ClaimManager> {
        &self.claims
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Perform the reviewable's action named `server_action`.
    pub async fn perform_action(
        &self,
        id: ReviewableId,
        server_action: &str,
        extra: Map<String, Value>,
    ) -> Result<PerformOutcome> {
        let reviewable = self.store.get(id).ok_or(ClientError::UnknownReviewable(id))?;
        let action = reviewable
            .action(server_action)
            .cloned()
            .ok_or_else(|| ClientError::UnknownAction {
                id,
                action: server_action.to_string(),
            })?;
        self.perform(id, &action, extra).await
    }

    /// Request an action on a tracked reviewable.
    ///
    /// Fails with [`ClientError::InFlight`] before any network call when an
    /// action on the same reviewable has not finished.
    pub async fn perform(
        &self,
        id: ReviewableId,
        action: &PerformableAction,
        mut extra: Map<String, Value>,
    ) -> Result<PerformOutcome> {
        let _guard = self.store.begin_update(id)?;

        if let Some(name) = &action.client_action {
            if self.workflows.client_workflow(name).is_none() {
                error!(%id, action = %action.server_action, "no handler for client action '{name}'");
                return Err(ClientError::UnregisteredWorkflow(name.clone()));
            }
        }

        let form_name = if action.require_reject_reason {
            Some(REJECT_REASON_WORKFLOW)
        } else {
            self.config.workflow_for(&action.server_action)
        };

        if let Some(message) = &action.confirm_message {
            if !self.claims.ensure_claimed(id).await {
                return Ok(PerformOutcome::Aborted(AbortReason::ClaimRefused));
            }
            // A dismissed prompt keeps the automatic claim just taken.
            if !self.prompt.confirm(message).await {
                debug!(%id, action = %action.server_action, "confirmation dismissed");
                return Ok(PerformOutcome::Aborted(AbortReason::ConfirmationDismissed));
            }
        } else if let Some(form_name) = form_name {
            let form = self
                .workflows
                .form(form_name)
                .ok_or_else(|| ClientError::MissingForm {
                    action: action.server_action.clone(),
                    workflow: form_name.to_string(),
                })?;
            if !self.claims.ensure_claimed(id).await {
                return Ok(PerformOutcome::Aborted(AbortReason::ClaimRefused));
            }
            let snapshot = self.store.get(id).ok_or(ClientError::UnknownReviewable(id))?;
            match form.collect(&snapshot, action).await {
                Some(data) => extra.extend(data),
                None => {
                    debug!(%id, form = form_name, "form dismissed");
                    return Ok(PerformOutcome::Aborted(AbortReason::FormDismissed));
                }
            }
        }

        self.perform_confirmed(id, action, extra).await
    }

    async fn perform_confirmed(
        &self,
        id: ReviewableId,
        action: &PerformableAction,
        extra: Map<String, Value>,
    ) -> Result<PerformOutcome> {
        if !self.claims.ensure_claimed(id).await {
            return Ok(PerformOutcome::Aborted(AbortReason::ClaimRefused));
        }

        let Some(name) = &action.client_action else {
            let completion = self.dispatch(id, action, &extra).await?;
            return Ok(PerformOutcome::Completed(completion));
        };

        let workflow = self
            .workflows
            .client_workflow(name)
            .ok_or_else(|| ClientError::UnregisteredWorkflow(name.clone()))?;
        let snapshot = self.store.get(id).ok_or(ClientError::UnknownReviewable(id))?;
        let dispatch = Dispatch::new(self, id, action, extra);
        workflow.run(&snapshot, &dispatch).await?;

        Ok(match dispatch.into_completion() {
            Some(completion) => PerformOutcome::Completed(completion),
            None => {
                debug!(%id, workflow = %name, "workflow finished without dispatching");
                PerformOutcome::Aborted(AbortReason::WorkflowIncomplete)
            }
        })
    }

    /// Send the versioned perform request and reconcile the result.
    async fn dispatch(
        &self,
        id: ReviewableId,
        action: &PerformableAction,
        extra: &Map<String, Value>,
    ) -> Result<Completion> {
        let snapshot = self.store.get(id).ok_or(ClientError::UnknownReviewable(id))?;
        let params = self.config.type_params(&snapshot.reviewable_type);
        let data = build_perform_payload(&snapshot, extra, params);
        debug!(%id, action = %action.server_action, version = snapshot.version, "dispatching action");

        match self
            .api
            .perform(id, &action.server_action, snapshot.version, &data)
            .await
        {
            Ok(result) => Ok(self.apply_result(id, action, result).await),
            Err(e) => {
                self.report_failure(id, &e);
                Err(e.into())
            }
        }
    }

    async fn apply_result(
        &self,
        id: ReviewableId,
        action: &PerformableAction,
        result: PerformResult,
    ) -> Completion {
        self.store
            .apply_counts(result.reviewable_count, result.unseen_reviewable_count);
        if let Some(message) = &action.completed_message {
            self.notifier.success(message);
        }

        let mut refreshed = result.reviewable.clone();
        if let Some(reviewable) = &refreshed {
            self.store.refresh(reviewable.clone());
        }
        let removed = match &result.remove_reviewable_ids {
            Some(ids) => self.store.remove(ids),
            None => Vec::new(),
        };
        if result.remove_reviewable_ids.is_none() && refreshed.is_none() {
            match self.api.fetch(id).await {
                Ok(reviewable) => {
                    self.store.refresh(reviewable.clone());
                    refreshed = Some(reviewable);
                }
                Err(e) => {
                    warn!(%id, "could not reload reviewable after action: {e}");
                    self.notifier.error(&e.to_string());
                }
            }
        }

        info!(%id, action = %action.server_action, removed = removed.len(), "action completed");
        Completion {
            result,
            removed,
            refreshed,
        }
    }

    /// Save field edits to a reviewable under the version guard.
    pub async fn save_edit(
        &self,
        id: ReviewableId,
        mut updates: Map<String, Value>,
    ) -> Result<Reviewable> {
        let _guard = self.store.begin_update(id)?;
        prune_empty_updates(&mut updates);
        let snapshot = self.store.get(id).ok_or(ClientError::UnknownReviewable(id))?;

        match self.api.update(id, snapshot.version, &updates).await {
            Ok(reviewable) => {
                self.store.refresh(reviewable.clone());
                Ok(reviewable)
            }
            Err(e) => {
                self.report_failure(id, &e);
                Err(e.into())
            }
        }
    }

    fn report_failure(&self, id: ReviewableId, e: &ApiError) {
        if let ApiError::VersionConflict {
            current: Some(current),
            ..
        } = e
        {
            self.store.refresh((**current).clone());
        }
        warn!(%id, "request failed: {e}");
        self.notifier.error(&e.to_string());
    }
}
