//! Event Bus
//!
//! Publish/subscribe registry keyed by event name. Each subscription gets an
//! unbounded queue and its own worker task, so a subscriber sees its events
//! strictly in emission order while separate subscribers run interleaved.

use crate::events::{EventKind, SyncEvent};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<Arc<SyncEvent>>,
    worker: JoinHandle<()>,
}

#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    channels: Mutex<HashMap<&'static str, Vec<Subscription>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handler to one event name. Must be called inside a tokio
    /// runtime.
    pub fn subscribe<F, Fut>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(Arc<SyncEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, mut rx) = mpsc::unbounded_channel::<Arc<SyncEvent>>();

        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handler(event).await;
            }
        });

        self.lock()
            .entry(kind.as_str())
            .or_default()
            .push(Subscription { id, tx, worker });
        tracing::debug!(event = kind.as_str(), id = id.0, "Subscribed");
        id
    }

    /// Detach a subscription. Events already queued for it are still handled.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut channels = self.lock();
        for subs in channels.values_mut() {
            if let Some(pos) = subs.iter().position(|s| s.id == id) {
                // Dropping the sender lets the worker drain and exit
                subs.remove(pos);
                return true;
            }
        }
        false
    }

    /// Queue an event for every subscriber of its name. Never blocks.
    pub fn emit(&self, event: SyncEvent) {
        let name = event.kind().as_str();
        let event = Arc::new(event);
        let channels = self.lock();
        let Some(subs) = channels.get(name) else {
            tracing::trace!(event = name, "No subscribers");
            return;
        };
        for sub in subs {
            if sub.tx.send(Arc::clone(&event)).is_err() {
                tracing::warn!(event = name, id = sub.id.0, "Subscriber worker is gone");
            }
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.lock().get(kind.as_str()).map_or(0, Vec::len)
    }

    /// Detach everything and wait until every queued event has been handled.
    pub async fn close(&self) {
        let workers: Vec<JoinHandle<()>> = {
            let mut channels = self.lock();
            channels
                .drain()
                .flat_map(|(_, subs)| subs)
                .map(|sub| sub.worker)
                .collect()
        };
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!("Event handler task failed: {}", e);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<&'static str, Vec<Subscription>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
