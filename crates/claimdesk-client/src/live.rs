use std::sync::{Arc, Mutex, MutexGuard};

use claimdesk_core::{ActionCompleted, BusMessage, Claim, ClaimTransfer, ReviewableId};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ReviewApi;
use crate::error::ApiError;
use crate::store::ReviewableStore;

const DEFAULT_CAPACITY: usize = 256;

// ─── MessageBus ───────────────────────────────────────────────────────────

/// In-process fan-out of the broadcast channels.
#[derive(Clone)]
pub struct MessageBus {
    claims: broadcast::Sender<ClaimTransfer>,
    actions: broadcast::Sender<ActionCompleted>,
    resync: broadcast::Sender<()>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        let (claims, _) = broadcast::channel(capacity);
        let (actions, _) = broadcast::channel(capacity);
        let (resync, _) = broadcast::channel(1);
        Self {
            claims,
            actions,
            resync,
        }
    }

    pub fn publish(&self, msg: BusMessage) {
        // Send only fails with no subscribers.
        match msg {
            BusMessage::ClaimTransfer(ev) => {
                let _ = self.claims.send(ev);
            }
            BusMessage::ActionCompleted(ev) => {
                let _ = self.actions.send(ev);
            }
            BusMessage::Resync => {
                let _ = self.resync.send(());
            }
        }
    }

    pub fn subscribe_claims(&self) -> broadcast::Receiver<ClaimTransfer> {
        self.claims.subscribe()
    }

    pub fn subscribe_actions(&self) -> broadcast::Receiver<ActionCompleted> {
        self.actions.subscribe()
    }

    pub fn subscribe_resync(&self) -> broadcast::Receiver<()> {
        self.resync.subscribe()
    }
}

// ─── Reconciliation ───────────────────────────────────────────────────────

/// Overwrite the claim on every tracked reviewable in the topic. Returns
/// how many changed.
pub fn apply_claim_transfer(store: &ReviewableStore, ev: &ClaimTransfer) -> usize {
    let claim = ev.user.clone().map(|user| Claim {
        user,
        automatic: ev.automatic.unwrap_or(false),
    });
    let changed = store.set_topic_claim(ev.topic_id, claim);
    debug!(topic = %ev.topic_id, changed, "claim transfer applied");
    changed
}

/// Remove listed reviewables that are tracked and apply any counters.
/// Returns the ids actually removed.
pub fn apply_action_completed(store: &ReviewableStore, ev: &ActionCompleted) -> Vec<ReviewableId> {
    store.apply_counts(ev.reviewable_count, ev.unseen_reviewable_count);
    let removed = store.remove(&ev.remove_reviewable_ids);
    debug!(removed = removed.len(), "action completion applied");
    removed
}

/// Replace the store with the backend's pending list. Used after events were
/// missed. Returns how many reviewables are now tracked.
pub async fn resync(api: &dyn ReviewApi, store: &ReviewableStore) -> Result<usize, ApiError> {
    let items = api.list().await?;
    let count = items.len();
    store.replace_all(items);
    info!(count, "review queue resynced");
    Ok(count)
}

// ─── LiveUpdateChannel ────────────────────────────────────────────────────

/// Keeps a store in step with broadcasts from other sessions.
///
/// All channels are subscribed and torn down together. Subscribing twice,
/// or unsubscribing when not subscribed, is a no-op. When events are missed,
/// either locally or upstream, the store is reloaded through the API.
pub struct LiveUpdateChannel {
    api: Arc<dyn ReviewApi>,
    store: Arc<ReviewableStore>,
    bus: MessageBus,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveUpdateChannel {
    pub fn new(api: Arc<dyn ReviewApi>, store: Arc<ReviewableStore>, bus: MessageBus) -> Self {
        Self {
            api,
            store,
            bus,
            task: Mutex::new(None),
        }
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start applying broadcasts. Must be called inside a tokio runtime.
    /// Returns `false` if already subscribed.
    pub fn subscribe(&self) -> bool {
        let mut task = self.task();
        if task.is_some() {
            return false;
        }
        let receivers = Receivers {
            claims: self.bus.subscribe_claims(),
            actions: self.bus.subscribe_actions(),
            resync: self.bus.subscribe_resync(),
        };
        *task = Some(tokio::spawn(pump(
            self.api.clone(),
            self.store.clone(),
            receivers,
        )));
        debug!("live updates subscribed");
        true
    }

    /// Stop applying broadcasts. Returns `false` if not subscribed.
    pub fn unsubscribe(&self) -> bool {
        match self.task().take() {
            Some(handle) => {
                handle.abort();
                debug!("live updates unsubscribed");
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.task().is_some()
    }

    /// Subscribe for as long as the returned guard lives.
    pub fn scoped(self: &Arc<Self>) -> LiveSubscription {
        self.subscribe();
        LiveSubscription {
            channel: Arc::clone(self),
        }
    }

    pub async fn apply(&self, msg: &BusMessage) {
        match msg {
            BusMessage::ClaimTransfer(ev) => {
                apply_claim_transfer(&self.store, ev);
            }
            BusMessage::ActionCompleted(ev) => {
                apply_action_completed(&self.store, ev);
            }
            BusMessage::Resync => reload(self.api.as_ref(), &self.store).await,
        }
    }
}

impl Drop for LiveUpdateChannel {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Unsubscribes its channel on drop.
#[must_use = "the channel unsubscribes as soon as the guard drops"]
pub struct LiveSubscription {
    channel: Arc<LiveUpdateChannel>,
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.channel.unsubscribe();
    }
}

struct Receivers {
    claims: broadcast::Receiver<ClaimTransfer>,
    actions: broadcast::Receiver<ActionCompleted>,
    resync: broadcast::Receiver<()>,
}

async fn reload(api: &dyn ReviewApi, store: &ReviewableStore) {
    if let Err(e) = resync(api, store).await {
        warn!("resync failed: {e}");
    }
}

async fn pump(api: Arc<dyn ReviewApi>, store: Arc<ReviewableStore>, mut rx: Receivers) {
    loop {
        tokio::select! {
            msg = rx.claims.recv() => match msg {
                Ok(ev) => {
                    apply_claim_transfer(&store, &ev);
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("claim-transfer subscriber lagged by {n} messages");
                    reload(api.as_ref(), &store).await;
                }
                Err(RecvError::Closed) => break,
            },
            msg = rx.actions.recv() => match msg {
                Ok(ev) => {
                    apply_action_completed(&store, &ev);
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("action-completed subscriber lagged by {n} messages");
                    reload(api.as_ref(), &store).await;
                }
                Err(RecvError::Closed) => break,
            },
            msg = rx.resync.recv() => match msg {
                // A lagged resync receiver still owes one reload.
                Ok(()) | Err(RecvError::Lagged(_)) => reload(api.as_ref(), &store).await,
                Err(RecvError::Closed) => break,
            },
        }
    }
}
