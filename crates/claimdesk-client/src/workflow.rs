//! Client-side workflows that run before an action is dispatched.
//!
//! Two kinds are looked up by name in a [`WorkflowRegistry`]:
//!
//! - **client workflows** ([`ClientWorkflow`]) named by an action's
//!   `client_action`. They receive a [`Dispatch`] handle and decide whether
//!   and when the action is sent.
//! - **forms** ([`ActionForm`]) that collect extra data for an action and
//!   may be dismissed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use claimdesk_core::{PerformableAction, Reviewable};
use serde_json::{Map, Value};
use tracing::debug;

use crate::coordinator::Dispatch;
use crate::error::ClientError;

pub const EDIT_WORKFLOW: &str = "edit";

// ─── Traits ───────────────────────────────────────────────────────────────

#[async_trait]
pub trait ClientWorkflow: Send + Sync {
    /// Run the workflow. Calling `dispatch.perform()` sends the action; not
    /// calling it leaves the action undone.
    async fn run(&self, reviewable: &Reviewable, dispatch: &Dispatch<'_>) -> Result<(), ClientError>;
}

#[async_trait]
pub trait ActionForm: Send + Sync {
    /// Collect extra perform data, or `None` when dismissed.
    async fn collect(
        &self,
        reviewable: &Reviewable,
        action: &PerformableAction,
    ) -> Option<Map<String, Value>>;
}

// ─── WorkflowRegistry ─────────────────────────────────────────────────────

/// Named client workflows and forms for one session.
#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    client_workflows: HashMap<String, Arc<dyn ClientWorkflow>>,
    forms: HashMap<String, Arc<dyn ActionForm>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_workflow(
        mut self,
        name: impl Into<String>,
        workflow: Arc<dyn ClientWorkflow>,
    ) -> Self {
        self.client_workflows.insert(name.into(), workflow);
        self
    }

    pub fn with_form(mut self, name: impl Into<String>, form: Arc<dyn ActionForm>) -> Self {
        self.forms.insert(name.into(), form);
        self
    }

    pub fn client_workflow(&self, name: &str) -> Option<Arc<dyn ClientWorkflow>> {
        self.client_workflows.get(name).cloned()
    }

    pub fn form(&self, name: &str) -> Option<Arc<dyn ActionForm>> {
        self.forms.get(name).cloned()
    }

    pub fn has_form(&self, name: &str) -> bool {
        self.forms.contains_key(name)
    }

    pub fn client_workflow_names(&self) -> impl Iterator<Item = &str> {
        self.client_workflows.keys().map(String::as_str)
    }
}

// ─── StaticForm ───────────────────────────────────────────────────────────

/// A form whose answer is known up front, e.g. from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct StaticForm {
    values: Option<Map<String, Value>>,
}

impl StaticForm {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values: Some(values),
        }
    }

    /// A form that is always dismissed.
    pub fn dismissed() -> Self {
        Self { values: None }
    }
}

#[async_trait]
impl ActionForm for StaticForm {
    async fn collect(
        &self,
        _reviewable: &Reviewable,
        _action: &PerformableAction,
    ) -> Option<Map<String, Value>> {
        self.values.clone()
    }
}

// ─── EditWorkflow ─────────────────────────────────────────────────────────

/// Opens the post behind a reviewable for editing.
#[async_trait]
pub trait PostEditor: Send + Sync {
    /// `false` when the post cannot be edited.
    async fn open(&self, reviewable: &Reviewable) -> bool;
}

/// The `edit` client action: open the editor, then dispatch.
pub struct EditWorkflow {
    editor: Arc<dyn PostEditor>,
}

impl EditWorkflow {
    pub fn new(editor: Arc<dyn PostEditor>) -> Self {
        Self { editor }
    }
}

#[async_trait]
impl ClientWorkflow for EditWorkflow {
    async fn run(&self, reviewable: &Reviewable, dispatch: &Dispatch<'_>) -> Result<(), ClientError> {
        if !self.editor.open(reviewable).await {
            debug!(id = %reviewable.id, post_id = ?reviewable.post_id, "post is not editable");
            return Ok(());
        }
        dispatch.perform().await?;
        Ok(())
    }
}
