use std::sync::{Arc, Mutex, MutexGuard};

use claimdesk_core::BusMessage;
use tokio::sync::broadcast;

use crate::queue::ReviewQueue;

const EVENT_CAPACITY: usize = 256;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    queue: Arc<Mutex<ReviewQueue>>,
    /// Broadcast channel for SSE events: claim transfers and completed actions.
    pub event_tx: broadcast::Sender<BusMessage>,
}

impl AppState {
    pub fn new(queue: ReviewQueue) -> Self {
        Self::with_capacity(queue, EVENT_CAPACITY)
    }

    /// Like [`AppState::new`] with a custom broadcast buffer per subscriber.
    pub fn with_capacity(queue: ReviewQueue, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            queue: Arc::new(Mutex::new(queue)),
            event_tx: tx,
        }
    }

    /// Lock the queue. Every mutation completes while the lock is held, so a
    /// poisoned lock still guards a consistent queue.
    pub fn queue(&self) -> MutexGuard<'_, ReviewQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Send events to every SSE subscriber. Callers hold the queue lock so
    /// events leave in the order their mutations were applied.
    pub fn broadcast(&self, events: impl IntoIterator<Item = BusMessage>) {
        for event in events {
            tracing::debug!(channel = event.channel(), "broadcast");
            // No receivers is fine.
            let _ = self.event_tx.send(event);
        }
    }
}
