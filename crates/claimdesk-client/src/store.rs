use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use claimdesk_core::{Claim, Reviewable, ReviewableId, TopicId};
use tokio::sync::broadcast;

use crate::error::ClientError;

/// Aggregate queue counters pushed by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewCounts {
    pub reviewable_count: Option<u64>,
    pub unseen_reviewable_count: Option<u64>,
}

/// What changed in the store. Sent to listeners after the lock is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Updated(ReviewableId),
    Removed(Vec<ReviewableId>),
    Counts(ReviewCounts),
    Reloaded,
}

struct Entry {
    reviewable: Reviewable,
    updating: bool,
}

#[derive(Default)]
struct StoreInner {
    items: BTreeMap<ReviewableId, Entry>,
    counts: ReviewCounts,
}

/// The session's local view of the review queue.
///
/// Every method takes the lock for the duration of one synchronous update
/// and never across an await.
pub struct ReviewableStore {
    inner: Mutex<StoreInner>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for ReviewableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewableStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(StoreInner::default()),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, change: StoreChange) {
        // No listeners is fine.
        let _ = self.changes.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn get(&self, id: ReviewableId) -> Option<Reviewable> {
        self.lock().items.get(&id).map(|e| e.reviewable.clone())
    }

    pub fn contains(&self, id: ReviewableId) -> bool {
        self.lock().items.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<ReviewableId> {
        self.lock().items.keys().copied().collect()
    }

    pub fn snapshot(&self) -> Vec<Reviewable> {
        self.lock()
            .items
            .values()
            .map(|e| e.reviewable.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_updating(&self, id: ReviewableId) -> bool {
        self.lock().items.get(&id).is_some_and(|e| e.updating)
    }

    pub fn counts(&self) -> ReviewCounts {
        self.lock().counts
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Track a reviewable, replacing any previous copy.
    pub fn insert(&self, reviewable: Reviewable) {
        let id = reviewable.id;
        {
            let mut inner = self.lock();
            let updating = inner.items.get(&id).is_some_and(|e| e.updating);
            inner.items.insert(
                id,
                Entry {
                    reviewable,
                    updating,
                },
            );
        }
        self.emit(StoreChange::Updated(id));
    }

    /// Replace the whole tracked set. In-flight markers on items that stay
    /// are preserved.
    pub fn replace_all(&self, reviewables: Vec<Reviewable>) {
        {
            let mut inner = self.lock();
            let mut items = BTreeMap::new();
            for reviewable in reviewables {
                let updating = inner
                    .items
                    .get(&reviewable.id)
                    .is_some_and(|e| e.updating);
                items.insert(
                    reviewable.id,
                    Entry {
                        reviewable,
                        updating,
                    },
                );
            }
            inner.items = items;
        }
        self.emit(StoreChange::Reloaded);
    }

    /// Overwrite a tracked reviewable with a server-confirmed copy. Untracked
    /// ids are ignored. Returns whether anything changed.
    pub fn refresh(&self, reviewable: Reviewable) -> bool {
        let id = reviewable.id;
        let changed = {
            let mut inner = self.lock();
            match inner.items.get_mut(&id) {
                Some(entry) if entry.reviewable != reviewable => {
                    entry.reviewable = reviewable;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.emit(StoreChange::Updated(id));
        }
        changed
    }

    /// Drop the listed ids. Returns the ones that were actually tracked.
    pub fn remove(&self, ids: &[ReviewableId]) -> Vec<ReviewableId> {
        let removed: Vec<ReviewableId> = {
            let mut inner = self.lock();
            ids.iter()
                .copied()
                .filter(|id| inner.items.remove(id).is_some())
                .collect()
        };
        if !removed.is_empty() {
            self.emit(StoreChange::Removed(removed.clone()));
        }
        removed
    }

    pub fn set_claim(&self, id: ReviewableId, claim: Option<Claim>) -> bool {
        let changed = {
            let mut inner = self.lock();
            match inner.items.get_mut(&id) {
                Some(entry) if entry.reviewable.claimed_by != claim => {
                    entry.reviewable.claimed_by = claim;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.emit(StoreChange::Updated(id));
        }
        changed
    }

    /// Overwrite the claim on every tracked reviewable in `topic`. Returns the
    /// number of reviewables whose claim changed.
    pub fn set_topic_claim(&self, topic: TopicId, claim: Option<Claim>) -> usize {
        let changed: Vec<ReviewableId> = {
            let mut inner = self.lock();
            inner
                .items
                .values_mut()
                .filter(|e| e.reviewable.topic_id == Some(topic))
                .filter(|e| e.reviewable.claimed_by != claim)
                .map(|e| {
                    e.reviewable.claimed_by = claim.clone();
                    e.reviewable.id
                })
                .collect()
        };
        for id in &changed {
            self.emit(StoreChange::Updated(*id));
        }
        changed.len()
    }

    /// Apply counters that are present and different. Returns whether
    /// anything changed.
    pub fn apply_counts(&self, reviewable_count: Option<u64>, unseen: Option<u64>) -> bool {
        let counts = {
            let mut inner = self.lock();
            let mut changed = false;
            if reviewable_count.is_some() && inner.counts.reviewable_count != reviewable_count {
                inner.counts.reviewable_count = reviewable_count;
                changed = true;
            }
            if unseen.is_some() && inner.counts.unseen_reviewable_count != unseen {
                inner.counts.unseen_reviewable_count = unseen;
                changed = true;
            }
            changed.then_some(inner.counts)
        };
        match counts {
            Some(counts) => {
                self.emit(StoreChange::Counts(counts));
                true
            }
            None => false,
        }
    }

    // ---------------------------------------------------------------------
    // In-flight marker
    // ---------------------------------------------------------------------

    /// Mark `id` as having an action in flight. The marker is cleared when
    /// the returned guard drops.
    pub fn begin_update(self: &Arc<Self>, id: ReviewableId) -> Result<UpdateGuard, ClientError> {
        let mut inner = self.lock();
        let entry = inner
            .items
            .get_mut(&id)
            .ok_or(ClientError::UnknownReviewable(id))?;
        if entry.updating {
            return Err(ClientError::InFlight(id));
        }
        entry.updating = true;
        Ok(UpdateGuard {
            store: Arc::clone(self),
            id,
        })
    }

    fn end_update(&self, id: ReviewableId) {
        if let Some(entry) = self.lock().items.get_mut(&id) {
            entry.updating = false;
        }
    }
}

/// Scoped in-flight marker for one reviewable.
#[must_use = "the in-flight marker is cleared as soon as the guard drops"]
pub struct UpdateGuard {
    store: Arc<ReviewableStore>,
    id: ReviewableId,
}

impl UpdateGuard {
    pub fn id(&self) -> ReviewableId {
        self.id
    }
}

impl Drop for UpdateGuard {
    fn drop(&mut self) {
        self.store.end_update(self.id);
    }
}
