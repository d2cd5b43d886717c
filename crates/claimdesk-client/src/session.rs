use std::sync::Arc;

use claimdesk_core::{Claim, CoordinatorConfig, ReviewableId, UserRef};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::ReviewApi;
use crate::claim::ClaimManager;
use crate::coordinator::{ActionCoordinator, PerformOutcome};
use crate::live::{LiveSubscription, LiveUpdateChannel, MessageBus};
use crate::notify::{AutoConfirm, Notifier, Prompt, TracingNotifier};
use crate::penalty::{PenaltyKind, PenaltyTool, PenaltyWorkflow};
use crate::sse::EventFeed;
use crate::store::ReviewableStore;
use crate::workflow::{
    ActionForm, ClientWorkflow, EditWorkflow, PostEditor, WorkflowRegistry, EDIT_WORKFLOW,
};
use crate::Result;

/// One moderator's client: store, claims, coordinator and live updates
/// wired together.
pub struct ModeratorSession {
    api: Arc<dyn ReviewApi>,
    store: Arc<ReviewableStore>,
    claims: Arc<ClaimManager>,
    coordinator: Arc<ActionCoordinator>,
    live: Arc<LiveUpdateChannel>,
    bus: MessageBus,
}

impl ModeratorSession {
    pub fn builder(api: Arc<dyn ReviewApi>, actor: UserRef) -> SessionBuilder {
        SessionBuilder {
            api,
            actor,
            config: CoordinatorConfig::default(),
            notifier: Arc::new(TracingNotifier),
            prompt: Arc::new(AutoConfirm),
            penalty_tool: None,
            editor: None,
            registry: WorkflowRegistry::new(),
        }
    }

    pub fn actor(&self) -> &UserRef {
        self.claims.actor()
    }

    pub fn store(&self) -> &Arc<ReviewableStore> {
        &self.store
    }

    pub fn claims(&self) -> &Arc<ClaimManager> {
        &self.claims
    }

    pub fn coordinator(&self) -> &Arc<ActionCoordinator> {
        &self.coordinator
    }

    pub fn live(&self) -> &Arc<LiveUpdateChannel> {
        &self.live
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Replace the local queue with the backend's pending list.
    pub async fn load_queue(&self) -> Result<usize> {
        let items = self.api.list().await?;
        let count = items.len();
        self.store.replace_all(items);
        info!(count, "review queue loaded");
        Ok(count)
    }

    pub async fn perform(
        &self,
        id: ReviewableId,
        server_action: &str,
        extra: Map<String, Value>,
    ) -> Result<PerformOutcome> {
        self.coordinator.perform_action(id, server_action, extra).await
    }

    pub async fn claim(&self, id: ReviewableId) -> Result<Claim> {
        self.claims.claim(id).await
    }

    pub async fn unclaim(&self, id: ReviewableId) -> Result<()> {
        self.claims.unclaim(id).await
    }

    /// Apply broadcasts to the store until the guard drops.
    pub fn subscribe(&self) -> LiveSubscription {
        self.live.scoped()
    }

    /// Forward a backend event stream into this session's bus.
    pub fn follow(&self, feed: EventFeed) -> JoinHandle<()> {
        let bus = self.bus.clone();
        tokio::spawn(async move {
            if let Err(e) = feed.forward(bus).await {
                warn!("event stream failed: {e}");
            }
        })
    }
}

pub struct SessionBuilder {
    api: Arc<dyn ReviewApi>,
    actor: UserRef,
    config: CoordinatorConfig,
    notifier: Arc<dyn Notifier>,
    prompt: Arc<dyn Prompt>,
    penalty_tool: Option<Arc<dyn PenaltyTool>>,
    editor: Option<Arc<dyn PostEditor>>,
    registry: WorkflowRegistry,
}

impl SessionBuilder {
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn prompt(mut self, prompt: Arc<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn penalty_tool(mut self, tool: Arc<dyn PenaltyTool>) -> Self {
        self.penalty_tool = Some(tool);
        self
    }

    pub fn editor(mut self, editor: Arc<dyn PostEditor>) -> Self {
        self.editor = Some(editor);
        self
    }

    pub fn form(mut self, name: impl Into<String>, form: Arc<dyn ActionForm>) -> Self {
        self.registry = self.registry.with_form(name, form);
        self
    }

    pub fn client_workflow(
        mut self,
        name: impl Into<String>,
        workflow: Arc<dyn ClientWorkflow>,
    ) -> Self {
        self.registry = self.registry.with_client_workflow(name, workflow);
        self
    }

    /// Wire the session. Fails when a configured form mapping has no form.
    pub fn build(self) -> Result<ModeratorSession> {
        let store = Arc::new(ReviewableStore::new());
        let claims = Arc::new(ClaimManager::new(
            self.api.clone(),
            store.clone(),
            self.notifier.clone(),
            self.actor,
            self.config.claim_mode(),
        ));

        let mut registry = self.registry;
        for kind in [PenaltyKind::Suspend, PenaltyKind::Silence] {
            let workflow = PenaltyWorkflow::new(
                kind,
                self.penalty_tool.clone(),
                claims.clone(),
                self.notifier.clone(),
            );
            registry = registry.with_client_workflow(kind.as_str(), Arc::new(workflow));
        }
        if let Some(editor) = self.editor {
            registry =
                registry.with_client_workflow(EDIT_WORKFLOW, Arc::new(EditWorkflow::new(editor)));
        }

        let coordinator = Arc::new(ActionCoordinator::new(
            self.api.clone(),
            store.clone(),
            claims.clone(),
            Arc::new(self.config),
            registry,
            self.notifier,
            self.prompt,
        )?);
        let bus = MessageBus::default();
        let live = Arc::new(LiveUpdateChannel::new(
            self.api.clone(),
            store.clone(),
            bus.clone(),
        ));

        Ok(ModeratorSession {
            api: self.api,
            store,
            claims,
            coordinator,
            live,
            bus,
        })
    }
}
