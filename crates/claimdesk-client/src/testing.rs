//! In-crate fakes for the client's seams.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use claimdesk_core::{
    Claim, CoordinatorConfig, PerformResult, Reviewable, ReviewableId, TopicId, UserRef,
};
use serde_json::{Map, Value};
use tokio::sync::Notify;

use crate::api::ReviewApi;
use crate::claim::ClaimManager;
use crate::coordinator::ActionCoordinator;
use crate::error::{ApiError, ClientError};
use crate::notify::{Notifier, Prompt};
use crate::penalty::{PenaltyContext, PenaltyKind, PenaltyResult, PenaltyTool, PenaltyWorkflow};
use crate::store::ReviewableStore;
use crate::workflow::{ActionForm, ClientWorkflow, PostEditor, WorkflowRegistry};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap()
}

pub fn me() -> UserRef {
    UserRef::new(1, "me")
}

pub fn other() -> UserRef {
    UserRef::new(2, "other")
}

// ─── FakeApi ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Perform {
        id: ReviewableId,
        action: String,
        version: u64,
        data: Map<String, Value>,
    },
    Claim {
        topic: TopicId,
        automatic: bool,
    },
    Release {
        topic: TopicId,
        automatic: bool,
    },
    Fetch(ReviewableId),
    List,
    Update {
        id: ReviewableId,
        version: u64,
        updates: Map<String, Value>,
    },
}

/// Records every call and answers from per-endpoint reply queues.
///
/// With an empty queue: claims succeed for the actor, releases succeed,
/// performs succeed and remove the acted-on id, fetches and updates fail.
pub struct FakeApi {
    actor: UserRef,
    calls: Mutex<Vec<Call>>,
    claims: Mutex<VecDeque<Result<Claim, ApiError>>>,
    releases: Mutex<VecDeque<Result<(), ApiError>>>,
    performs: Mutex<VecDeque<Result<PerformResult, ApiError>>>,
    fetches: Mutex<VecDeque<Result<Reviewable, ApiError>>>,
    updates: Mutex<VecDeque<Result<Reviewable, ApiError>>>,
    listing: Mutex<Vec<Reviewable>>,
    perform_gate: Mutex<Option<Arc<Notify>>>,
}

fn not_found() -> ApiError {
    ApiError::Rejected {
        status: 404,
        kind: "not_found".into(),
        message: "not found".into(),
    }
}

impl FakeApi {
    pub fn new(actor: UserRef) -> Self {
        Self {
            actor,
            calls: Mutex::default(),
            claims: Mutex::default(),
            releases: Mutex::default(),
            performs: Mutex::default(),
            fetches: Mutex::default(),
            updates: Mutex::default(),
            listing: Mutex::default(),
            perform_gate: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn push_claim(&self, reply: Result<Claim, ApiError>) {
        lock(&self.claims).push_back(reply);
    }

    pub fn push_release(&self, reply: Result<(), ApiError>) {
        lock(&self.releases).push_back(reply);
    }

    pub fn push_perform(&self, reply: Result<PerformResult, ApiError>) {
        lock(&self.performs).push_back(reply);
    }

    pub fn push_fetch(&self, reply: Result<Reviewable, ApiError>) {
        lock(&self.fetches).push_back(reply);
    }

    pub fn push_update(&self, reply: Result<Reviewable, ApiError>) {
        lock(&self.updates).push_back(reply);
    }

    pub fn set_listing(&self, items: Vec<Reviewable>) {
        *lock(&self.listing) = items;
    }

    /// Make every perform wait until the returned handle is notified.
    pub fn hold_performs(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.perform_gate) = Some(gate.clone());
        gate
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl ReviewApi for FakeApi {
    async fn perform(
        &self,
        id: ReviewableId,
        server_action: &str,
        version: u64,
        data: &Map<String, Value>,
    ) -> Result<PerformResult, ApiError> {
        self.record(Call::Perform {
            id,
            action: server_action.to_string(),
            version,
            data: data.clone(),
        });
        let gate = lock(&self.perform_gate).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let reply = lock(&self.performs).pop_front();
        reply.unwrap_or_else(|| {
            Ok(PerformResult {
                success: true,
                remove_reviewable_ids: Some(vec![id]),
                ..Default::default()
            })
        })
    }

    async fn claim_topic(&self, topic: TopicId, automatic: bool) -> Result<Claim, ApiError> {
        self.record(Call::Claim { topic, automatic });
        let reply = lock(&self.claims).pop_front();
        reply.unwrap_or_else(|| {
            Ok(Claim {
                user: self.actor.clone(),
                automatic,
            })
        })
    }

    async fn release_topic(&self, topic: TopicId, automatic: bool) -> Result<(), ApiError> {
        self.record(Call::Release { topic, automatic });
        let reply = lock(&self.releases).pop_front();
        reply.unwrap_or(Ok(()))
    }

    async fn fetch(&self, id: ReviewableId) -> Result<Reviewable, ApiError> {
        self.record(Call::Fetch(id));
        let reply = lock(&self.fetches).pop_front();
        reply.unwrap_or_else(|| Err(not_found()))
    }

    async fn list(&self) -> Result<Vec<Reviewable>, ApiError> {
        self.record(Call::List);
        Ok(lock(&self.listing).clone())
    }

    async fn update(
        &self,
        id: ReviewableId,
        version: u64,
        updates: &Map<String, Value>,
    ) -> Result<Reviewable, ApiError> {
        self.record(Call::Update {
            id,
            version,
            updates: updates.clone(),
        });
        let reply = lock(&self.updates).pop_front();
        reply.unwrap_or_else(|| Err(not_found()))
    }
}

// ─── Notifier / Prompt ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    successes: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn successes(&self) -> Vec<String> {
        lock(&self.successes).clone()
    }

    pub fn errors(&self) -> Vec<String> {
        lock(&self.errors).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        lock(&self.successes).push(message.to_string());
    }

    fn error(&self, message: &str) {
        lock(&self.errors).push(message.to_string());
    }
}

pub struct ScriptedPrompt {
    answer: bool,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::default(),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        lock(&self.asked).clone()
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn confirm(&self, message: &str) -> bool {
        lock(&self.asked).push(message.to_string());
        self.answer
    }
}

// ─── Penalty tool / editor ────────────────────────────────────────────────

/// Penalty tool that optionally dispatches the pending action first, then
/// reports the scripted result.
pub struct FakePenaltyTool {
    success: bool,
    dispatch_first: bool,
    seen: Mutex<Vec<(PenaltyKind, UserRef, Option<u64>, Option<String>)>>,
}

impl FakePenaltyTool {
    pub fn new(success: bool, dispatch_first: bool) -> Self {
        Self {
            success,
            dispatch_first,
            seen: Mutex::default(),
        }
    }

    pub fn seen(&self) -> Vec<(PenaltyKind, UserRef, Option<u64>, Option<String>)> {
        lock(&self.seen).clone()
    }
}

#[async_trait]
impl PenaltyTool for FakePenaltyTool {
    async fn penalize(
        &self,
        kind: PenaltyKind,
        user: &UserRef,
        ctx: PenaltyContext<'_>,
    ) -> PenaltyResult {
        lock(&self.seen).push((kind, user.clone(), ctx.post_id, ctx.post_edit.clone()));
        if self.dispatch_first && ctx.before.perform().await.is_err() {
            return PenaltyResult { success: false };
        }
        PenaltyResult {
            success: self.success,
        }
    }
}

pub struct FakeEditor {
    editable: bool,
}

impl FakeEditor {
    pub fn new(editable: bool) -> Self {
        Self { editable }
    }
}

#[async_trait]
impl PostEditor for FakeEditor {
    async fn open(&self, _reviewable: &Reviewable) -> bool {
        self.editable
    }
}

// ─── Harness ──────────────────────────────────────────────────────────────

/// A coordinator wired to fakes, acting as [`me`].
pub struct Harness {
    pub api: Arc<FakeApi>,
    pub store: Arc<ReviewableStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub prompt: Arc<ScriptedPrompt>,
    pub claims: Arc<ClaimManager>,
    pub coordinator: Arc<ActionCoordinator>,
}

impl Harness {
    pub fn new(items: Vec<Reviewable>) -> Self {
        Self::builder(items).build()
    }

    pub fn builder(items: Vec<Reviewable>) -> HarnessBuilder {
        HarnessBuilder {
            items,
            config: CoordinatorConfig::default(),
            confirm: true,
            registry: WorkflowRegistry::new(),
            penalty_tool: None,
        }
    }
}

pub struct HarnessBuilder {
    items: Vec<Reviewable>,
    config: CoordinatorConfig,
    confirm: bool,
    registry: WorkflowRegistry,
    penalty_tool: Option<Option<Arc<dyn PenaltyTool>>>,
}

impl HarnessBuilder {
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn confirm(mut self, answer: bool) -> Self {
        self.confirm = answer;
        self
    }

    pub fn form(mut self, name: &str, form: impl ActionForm + 'static) -> Self {
        self.registry = self.registry.with_form(name, Arc::new(form));
        self
    }

    pub fn client_workflow(mut self, name: &str, workflow: Arc<dyn ClientWorkflow>) -> Self {
        self.registry = self.registry.with_client_workflow(name, workflow);
        self
    }

    /// Register the `suspend` and `silence` workflows backed by `tool`.
    pub fn penalty_tool(mut self, tool: Arc<dyn PenaltyTool>) -> Self {
        self.penalty_tool = Some(Some(tool));
        self
    }

    /// Register the `suspend` and `silence` workflows with no tool behind them.
    pub fn without_penalty_tool(mut self) -> Self {
        self.penalty_tool = Some(None);
        self
    }

    pub fn try_build(self) -> Result<Harness, ClientError> {
        let api = Arc::new(FakeApi::new(me()));
        let store = Arc::new(ReviewableStore::new());
        store.replace_all(self.items);
        let notifier = Arc::new(RecordingNotifier::default());
        let prompt = Arc::new(ScriptedPrompt::new(self.confirm));
        let claims = Arc::new(ClaimManager::new(
            api.clone(),
            store.clone(),
            notifier.clone(),
            me(),
            self.config.claim_mode(),
        ));

        let mut registry = self.registry;
        if let Some(tool) = self.penalty_tool {
            for kind in [PenaltyKind::Suspend, PenaltyKind::Silence] {
                let workflow =
                    PenaltyWorkflow::new(kind, tool.clone(), claims.clone(), notifier.clone());
                registry = registry.with_client_workflow(kind.as_str(), Arc::new(workflow));
            }
        }

        let coordinator = Arc::new(ActionCoordinator::new(
            api.clone(),
            store.clone(),
            claims.clone(),
            Arc::new(self.config),
            registry,
            notifier.clone(),
            prompt.clone(),
        )?);
        Ok(Harness {
            api,
            store,
            notifier,
            prompt,
            claims,
            coordinator,
        })
    }

    pub fn build(self) -> Harness {
        self.try_build().unwrap()
    }
}
