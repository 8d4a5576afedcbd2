//! Synchronization Engine
//!
//! Reconciles the protocol event stream of one session into the store. Each
//! entity kind has its own component that subscribes to the events it cares
//! about on an [`EventBus`]:
//!
//! - [`ChatSync`]: history snapshots, chat upserts/updates/deletes
//! - [`ContactSync`]: history snapshots, contact upserts/updates, own identity
//! - [`MessageSync`]: history snapshots, message upserts/updates/deletes,
//!   receipts and reactions
//!
//! Handlers never return errors. Failures are logged and isolated to the item
//! or batch they hit; notifications go out through a [`Notifier`] and never
//! block the write path.

mod chat;
mod contact;
pub mod hash;
mod merge;
mod message;
pub mod normalize;
mod resolve;

pub use chat::ChatSync;
pub use contact::{ContactSync, derive_name};
pub use merge::{apply_reaction, merge_receipt};
pub use message::MessageSync;
pub use resolve::ChatResolver;

use crate::bus::{EventBus, SubscriptionId};
use crate::client::ProtocolClient;
use crate::config::SyncConfig;
use crate::events::{EventKind, SyncEvent};
use crate::store::{ChatStore, ContactStore, MessageStore};
use crate::webhook::{Notifier, NotifierWorker, WebhookSink};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

/// Entry point the bus calls for every event a component subscribed to.
#[async_trait]
trait Dispatch: Send + Sync {
    async fn dispatch(&self, event: &SyncEvent);
}

/// Bus subscriptions held by one component.
#[derive(Default)]
struct Subscriptions(Mutex<Vec<SubscriptionId>>);

impl Subscriptions {
    /// Subscribe `component` to every kind in `kinds`. No-op when already
    /// attached.
    fn attach<T>(&self, bus: &EventBus, kinds: &[EventKind], component: &Arc<T>)
    where
        T: Dispatch + 'static,
    {
        let mut ids = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.is_empty() {
            return;
        }
        for &kind in kinds {
            let component = Arc::clone(component);
            ids.push(bus.subscribe(kind, move |event| {
                let component = Arc::clone(&component);
                async move { component.dispatch(&event).await }
            }));
        }
    }

    fn detach(&self, bus: &EventBus) {
        let mut ids = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        for id in ids.drain(..) {
            bus.unsubscribe(id);
        }
    }
}

/// All sync components of one session, sharing a store and a notifier.
pub struct SyncEngine {
    session_id: String,
    chats: Arc<ChatSync>,
    contacts: Arc<ContactSync>,
    messages: Arc<MessageSync>,
    notifier: Notifier,
    worker: NotifierWorker,
}

impl SyncEngine {
    /// Build the engine and spawn its notification worker.
    pub fn new<S>(
        session_id: impl Into<String>,
        store: Arc<S>,
        client: Arc<dyn ProtocolClient>,
        sink: Arc<dyn WebhookSink>,
        config: SyncConfig,
    ) -> Self
    where
        S: ChatStore + ContactStore + MessageStore + 'static,
    {
        let session_id = session_id.into();
        let (notifier, worker) = Notifier::spawn(session_id.clone(), sink);

        let chat_store: Arc<dyn ChatStore> = store.clone();
        let contact_store: Arc<dyn ContactStore> = store.clone();
        let message_store: Arc<dyn MessageStore> = store;

        let chats = Arc::new(ChatSync::new(
            &session_id,
            Arc::clone(&chat_store),
            notifier.clone(),
        ));
        let contacts = Arc::new(ContactSync::new(&session_id, contact_store, client, config));
        let messages = Arc::new(MessageSync::new(
            &session_id,
            message_store,
            ChatResolver::new(&session_id, chat_store),
            Arc::clone(&chats),
            notifier.clone(),
        ));

        Self {
            session_id,
            chats,
            contacts,
            messages,
            notifier,
            worker,
        }
    }

    /// Attach every component to the bus. Calling it twice is a no-op.
    pub fn listen(&self, bus: &EventBus) {
        self.chats.start(bus);
        self.contacts.start(bus);
        self.messages.start(bus);
        tracing::info!(session = %self.session_id, "Sync engine listening");
    }

    /// Detach every component. Calling it twice is a no-op.
    pub fn unlisten(&self, bus: &EventBus) {
        self.chats.stop(bus);
        self.contacts.stop(bus);
        self.messages.stop(bus);
        tracing::info!(session = %self.session_id, "Sync engine detached");
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn chats(&self) -> &Arc<ChatSync> {
        &self.chats
    }

    pub fn contacts(&self) -> &Arc<ContactSync> {
        &self.contacts
    }

    pub fn messages(&self) -> &Arc<MessageSync> {
        &self.messages
    }

    /// Wait until all notifications queued so far reached the sink.
    pub async fn flush(&self) {
        self.notifier.flush().await;
    }

    /// Stop the notification worker once every queued notification is
    /// delivered. Close the bus first so no handler is still running.
    pub async fn shutdown(self) {
        let Self {
            session_id,
            chats,
            contacts,
            messages,
            notifier,
            worker,
        } = self;
        drop((chats, contacts, messages, notifier));
        worker.join().await;
        tracing::info!(session = %session_id, "Sync engine stopped");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::store::SqlxStore;
    use crate::webhook::{ChannelSink, Notification, Notifier, WebhookEvent};
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    pub(crate) const SESSION: &str = "S1";

    /// In-memory store plus a notifier whose output the test can inspect.
    pub(crate) struct Harness {
        pub store: Arc<SqlxStore>,
        pub notifier: Notifier,
        rx: UnboundedReceiver<Notification>,
    }

    impl Harness {
        pub async fn new() -> Self {
            let store = Arc::new(SqlxStore::in_memory().await.unwrap());
            let (sink, rx) = ChannelSink::new();
            let (notifier, _worker) = Notifier::spawn(SESSION, Arc::new(sink));
            Self { store, notifier, rx }
        }

        /// Every notification sent so far.
        pub async fn drain(&mut self) -> Vec<Notification> {
            self.notifier.flush().await;
            let mut out = Vec::new();
            while let Ok(n) = self.rx.try_recv() {
                out.push(n);
            }
            out
        }
    }

    pub(crate) fn of_kind(list: &[Notification], event: WebhookEvent) -> Vec<&Notification> {
        list.iter().filter(|n| n.event == event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NoopClient;
    use crate::proto::Chat;
    use crate::store::SqlxStore;
    use crate::webhook::{ChannelSink, WebhookEvent};
    use serde_json::Value;
    use std::time::Duration;
    use tokio::sync::watch;

    /// Holds every delivery until the gate opens.
    struct GatedSink {
        gate: watch::Receiver<bool>,
        inner: ChannelSink,
    }

    #[async_trait]
    impl WebhookSink for GatedSink {
        async fn send(
            &self,
            session_id: &str,
            event: WebhookEvent,
            payload: Value,
        ) -> anyhow::Result<()> {
            let mut gate = self.gate.clone();
            gate.wait_for(|open| *open).await?;
            self.inner.send(session_id, event, payload).await
        }
    }

    fn chat(id: &str) -> Chat {
        Chat {
            id: id.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_engine_listens_once_and_processes_bus_events() {
        let store = Arc::new(SqlxStore::in_memory().await.unwrap());
        let (sink, mut rx) = ChannelSink::new();
        let engine = SyncEngine::new(
            "S1",
            Arc::clone(&store),
            Arc::new(NoopClient),
            Arc::new(sink),
            SyncConfig::default(),
        );
        let bus = EventBus::new();
        engine.listen(&bus);
        engine.listen(&bus);
        assert_eq!(bus.subscriber_count(EventKind::ChatsUpsert), 1);
        // Chats, contacts and messages all consume history snapshots
        assert_eq!(bus.subscriber_count(EventKind::HistorySet), 3);

        bus.emit(SyncEvent::ChatsUpsert(vec![Chat {
            id: "a@s.whatsapp.net".into(),
            ..Default::default()
        }]));
        bus.close().await;
        engine.shutdown().await;

        assert!(store.chat_exists("S1", "a@s.whatsapp.net").await.unwrap());
        let note = rx.recv().await.unwrap();
        assert_eq!(note.event, WebhookEvent::NewDialog);
    }

    #[tokio::test]
    async fn test_unlisten_detaches_all_components() {
        let store = Arc::new(SqlxStore::in_memory().await.unwrap());
        let (sink, _rx) = ChannelSink::new();
        let engine = SyncEngine::new(
            "S1",
            store,
            Arc::new(NoopClient),
            Arc::new(sink),
            SyncConfig::default(),
        );
        let bus = EventBus::new();
        engine.listen(&bus);
        engine.unlisten(&bus);
        engine.unlisten(&bus);
        assert_eq!(bus.subscriber_count(EventKind::HistorySet), 0);
        assert_eq!(bus.subscriber_count(EventKind::CredsUpdate), 0);

        // Can attach again after a detach
        engine.listen(&bus);
        assert_eq!(bus.subscriber_count(EventKind::MessagesReaction), 1);
    }

    #[tokio::test]
    async fn test_stalled_sink_does_not_block_writes() {
        let store = Arc::new(SqlxStore::in_memory().await.unwrap());
        let (open, gate) = watch::channel(false);
        let (inner, mut rx) = ChannelSink::new();
        let engine = SyncEngine::new(
            "S1",
            Arc::clone(&store),
            Arc::new(NoopClient),
            Arc::new(GatedSink { gate, inner }),
            SyncConfig::default(),
        );

        // Direct write returns while its notification is stuck in the sink
        tokio::time::timeout(
            Duration::from_secs(5),
            engine.chats().upsert(&[chat("a@s.whatsapp.net")]),
        )
        .await
        .unwrap();
        assert!(store.chat_exists("S1", "a@s.whatsapp.net").await.unwrap());

        // Later events keep flowing through the bus
        let bus = EventBus::new();
        engine.listen(&bus);
        bus.emit(SyncEvent::ChatsUpsert(vec![chat("b@s.whatsapp.net")]));
        bus.emit(SyncEvent::ChatsUpsert(vec![chat("c@s.whatsapp.net")]));
        tokio::time::timeout(Duration::from_secs(5), bus.close())
            .await
            .unwrap();
        assert!(store.chat_exists("S1", "b@s.whatsapp.net").await.unwrap());
        assert!(store.chat_exists("S1", "c@s.whatsapp.net").await.unwrap());
        assert!(rx.try_recv().is_err());

        open.send(true).unwrap();
        engine.shutdown().await;
        let mut delivered = 0;
        while rx.try_recv().is_ok() {
            delivered += 1;
        }
        assert_eq!(delivered, 3);
    }
}
