//! Chat Sync

use super::hash::assign_api_id;
use super::normalize::normalize_object;
use super::{Dispatch, Subscriptions};
use crate::bus::EventBus;
use crate::events::{EventKind, SyncEvent};
use crate::proto::Chat;
use crate::store::{ChatRecord, ChatStore, CounterUpdate};
use crate::webhook::{Notifier, WebhookEvent};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;

const KINDS: &[EventKind] = &[
    EventKind::HistorySet,
    EventKind::ChatsUpsert,
    EventKind::ChatsUpdate,
    EventKind::ChatsDelete,
];

pub struct ChatSync {
    session_id: String,
    store: Arc<dyn ChatStore>,
    notifier: Notifier,
    subscriptions: Subscriptions,
}

impl ChatSync {
    pub fn new(session_id: &str, store: Arc<dyn ChatStore>, notifier: Notifier) -> Self {
        Self {
            session_id: session_id.to_string(),
            store,
            notifier,
            subscriptions: Subscriptions::default(),
        }
    }

    pub fn start(self: &Arc<Self>, bus: &EventBus) {
        self.subscriptions.attach(bus, KINDS, self);
    }

    pub fn stop(&self, bus: &EventBus) {
        self.subscriptions.detach(bus);
    }

    fn prepare(&self, chat: &Chat) -> ChatRecord {
        let mut doc = normalize_object(&chat.to_object());
        assign_api_id(&self.session_id, &mut doc);
        ChatRecord::from_document(doc)
    }

    fn prepare_all(&self, chats: &[Chat]) -> Vec<ChatRecord> {
        chats
            .iter()
            .map(|c| self.prepare(c))
            .filter(|r| {
                if r.id.is_empty() {
                    tracing::warn!(session = %self.session_id, "Skipping chat without id");
                }
                !r.id.is_empty()
            })
            .collect()
    }

    /// History snapshot: atomic replace (`is_latest`) or additive insert.
    pub async fn set(&self, chats: &[Chat], is_latest: bool) {
        let records = self.prepare_all(chats);
        match self
            .store
            .replace_chats(&self.session_id, &records, is_latest)
            .await
        {
            Ok(added) => {
                for chat in &added {
                    self.notifier
                        .notify(WebhookEvent::NewDialog, Value::Object(chat.to_document()));
                }
                tracing::info!(
                    session = %self.session_id,
                    chats_added = added.len(),
                    is_latest,
                    "Synced chat history"
                );
            }
            Err(e) => {
                tracing::error!(session = %self.session_id, "Failed to sync chat history: {}", e);
            }
        }
    }

    /// Create or overwrite each chat. Items fail independently; every item
    /// is announced once the batch settles.
    pub async fn upsert(&self, chats: &[Chat]) {
        let records = self.prepare_all(chats);
        let results = join_all(
            records
                .iter()
                .map(|r| self.store.upsert_chat(&self.session_id, r)),
        )
        .await;

        for (record, result) in records.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!(
                    session = %self.session_id,
                    chat = %record.id,
                    "Failed to upsert chat: {}",
                    e
                );
            }
        }
        for record in &records {
            self.notifier
                .notify(WebhookEvent::NewDialog, Value::Object(record.to_document()));
        }
    }

    /// Partial updates. A positive `unreadCount` is added to the stored
    /// counter, zero or less replaces it.
    pub async fn update(&self, updates: &[Chat]) {
        for mut record in self.prepare_all(updates) {
            let payload = Value::Object(record.to_document());
            let unread = record.unread_count.take().map(|n| {
                if n > 0 {
                    CounterUpdate::Increment(n)
                } else {
                    CounterUpdate::Set(n)
                }
            });

            match self.store.update_chat(&self.session_id, &record, unread).await {
                Ok(()) => self.notifier.notify(WebhookEvent::UpdateDialog, payload),
                Err(e) if e.is_not_found() => {
                    tracing::info!(
                        session = %self.session_id,
                        chat = %record.id,
                        "Got update for non existent chat"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        session = %self.session_id,
                        chat = %record.id,
                        "Failed to update chat: {}",
                        e
                    );
                }
            }
        }
    }

    pub async fn delete(&self, ids: &[String]) {
        match self.store.delete_chats(&self.session_id, ids).await {
            Ok(removed) => {
                tracing::info!(session = %self.session_id, removed, "Deleted chats");
                self.notifier
                    .notify(WebhookEvent::DeleteDialogs, Value::from(ids.to_vec()));
            }
            Err(e) => {
                tracing::error!(session = %self.session_id, "Failed to delete chats: {}", e);
            }
        }
    }
}

#[async_trait]
impl Dispatch for ChatSync {
    async fn dispatch(&self, event: &SyncEvent) {
        match event {
            SyncEvent::HistorySet(set) => self.set(&set.chats, set.is_latest).await,
            SyncEvent::ChatsUpsert(chats) => self.upsert(chats).await,
            SyncEvent::ChatsUpdate(updates) => self.update(updates).await,
            SyncEvent::ChatsDelete(ids) => self.delete(ids).await,
            SyncEvent::ContactsUpsert(_)
            | SyncEvent::ContactsUpdate(_)
            | SyncEvent::MessagesUpsert(_)
            | SyncEvent::MessagesUpdate(_)
            | SyncEvent::MessagesDelete(_)
            | SyncEvent::ReceiptUpdate(_)
            | SyncEvent::MessagesReaction(_)
            | SyncEvent::CredsUpdate(_) => {
                tracing::debug!(event = %event.kind(), "Chat sync ignores event");
            }
        }
    }
}
