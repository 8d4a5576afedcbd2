//! Message Sync
//!
//! Resolves each message's chat, normalizes the payload and applies history
//! snapshots, live upserts, updates, deletes, receipts and reactions. A
//! `notify` upsert for a chat that is not stored yet creates that chat through
//! [`ChatSync::upsert`].

use super::hash::api_id;
use super::merge::{apply_reaction, merge_receipt};
use super::normalize::normalize_object;
use super::resolve::ChatResolver;
use super::{ChatSync, Dispatch, Subscriptions};
use crate::bus::EventBus;
use crate::events::{EventKind, MessagesUpsert, SyncEvent, UpsertKind};
use crate::proto::{
    Chat, MessageDelete, MessageUpdate, ProtoValue, ReactionUpdate, ReceiptUpdate, WebMessage,
    normalized_user,
};
use crate::store::{MessageRecord, MessageRef, MessageStore, Reaction, UserReceipt};
use crate::webhook::{Notifier, WebhookEvent};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const KINDS: &[EventKind] = &[
    EventKind::HistorySet,
    EventKind::MessagesUpsert,
    EventKind::MessagesUpdate,
    EventKind::MessagesDelete,
    EventKind::ReceiptUpdate,
    EventKind::MessagesReaction,
];

pub struct MessageSync {
    session_id: String,
    store: Arc<dyn MessageStore>,
    resolver: ChatResolver,
    chats: Arc<ChatSync>,
    notifier: Notifier,
    subscriptions: Subscriptions,
}

impl MessageSync {
    pub fn new(
        session_id: &str,
        store: Arc<dyn MessageStore>,
        resolver: ChatResolver,
        chats: Arc<ChatSync>,
        notifier: Notifier,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            store,
            resolver,
            chats,
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

    /// Storage record for a message, or `None` when its key is incomplete.
    fn prepare(&self, message: &WebMessage) -> Option<MessageRecord> {
        let mut record = MessageRecord::from_document(normalize_object(&message.to_object()))?;
        record.api_id = Some(api_id(&self.session_id, &record.id));
        Some(record)
    }

    fn prepare_all(&self, messages: &[WebMessage]) -> Vec<MessageRecord> {
        let records: Vec<MessageRecord> = messages.iter().filter_map(|m| self.prepare(m)).collect();
        if records.len() < messages.len() {
            tracing::warn!(
                session = %self.session_id,
                skipped = messages.len() - records.len(),
                "Skipping messages without chat JID or id"
            );
        }
        records
    }

    async fn chat_ids(&self, records: &[MessageRecord]) -> crate::error::Result<HashMap<String, i64>> {
        self.resolver
            .resolve(records.iter().map(|r| r.remote_jid.as_str()))
            .await
    }

    /// History snapshot, written in one transaction.
    pub async fn set(&self, messages: &[WebMessage], is_latest: bool) {
        let mut records = self.prepare_all(messages);
        let chat_map = match self.chat_ids(&records).await {
            Ok(map) => map,
            Err(e) => {
                tracing::error!(session = %self.session_id, "Failed to sync message history: {}", e);
                return;
            }
        };
        for record in &mut records {
            record.chat_id = chat_map.get(&record.remote_jid).copied();
        }

        match self
            .store
            .insert_messages(&self.session_id, &records, is_latest)
            .await
        {
            Ok(inserted) => {
                self.notifier
                    .notify(WebhookEvent::HistorySync, json!({ "channelId": self.session_id }));
                tracing::info!(
                    session = %self.session_id,
                    messages = messages.len(),
                    inserted,
                    is_latest,
                    "Synced messages"
                );
            }
            Err(e) => {
                tracing::error!(session = %self.session_id, "Failed to sync message history: {}", e);
            }
        }
    }

    /// Live messages. Only `append` and `notify` batches are stored.
    pub async fn upsert(&self, batch: &MessagesUpsert) {
        match batch.kind {
            UpsertKind::Append | UpsertKind::Notify => {}
            UpsertKind::Other => {
                tracing::debug!(
                    session = %self.session_id,
                    count = batch.messages.len(),
                    "Ignoring message upsert of unhandled type"
                );
                return;
            }
        }

        let records = self.prepare_all(&batch.messages);
        let chat_map = self.chat_ids(&records).await.unwrap_or_else(|e| {
            tracing::warn!(session = %self.session_id, "Chat lookup failed, storing unlinked: {}", e);
            HashMap::new()
        });

        for mut record in records {
            record.chat_id = chat_map.get(&record.remote_jid).copied();
            if let Err(e) = self.store.upsert_message(&self.session_id, &record).await {
                tracing::error!(
                    session = %self.session_id,
                    message = %record.id,
                    "Failed to upsert message: {}",
                    e
                );
                continue;
            }
            self.notifier
                .notify(WebhookEvent::NewMessage, record.to_payload());

            if batch.kind == UpsertKind::Notify {
                self.ensure_chat(&record).await;
            }
        }
    }

    /// Create a stub chat for a newly received message in an unknown chat.
    async fn ensure_chat(&self, record: &MessageRecord) {
        match self.resolver.exists(&record.remote_jid).await {
            Ok(true) => {}
            Ok(false) => {
                let stub = Chat {
                    id: record.remote_jid.clone(),
                    unread_count: Some(1),
                    conversation_timestamp: record.message_timestamp.map(ProtoValue::Int),
                    ..Default::default()
                };
                self.chats.upsert(&[stub]).await;
            }
            Err(e) => {
                tracing::warn!(session = %self.session_id, chat = %record.remote_jid, "Chat lookup failed: {}", e);
            }
        }
    }

    /// Merge each update into the stored message and re-insert it under the
    /// possibly changed key.
    pub async fn update(&self, updates: &[MessageUpdate]) {
        if updates.is_empty() {
            return;
        }
        for item in updates {
            let Some(key) = MessageRef::from_key(&item.key) else {
                tracing::warn!(session = %self.session_id, "Skipping message update without full key");
                continue;
            };
            let patch = normalize_object(&item.update);
            let session_id = self.session_id.clone();
            let merge = move |previous: MessageRecord| merge_update(&session_id, previous, &patch);

            match self
                .store
                .recreate_message(&self.session_id, &key, &merge)
                .await
            {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    tracing::info!(
                        session = %self.session_id,
                        message = %key.id,
                        "Got update for non existent message"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        session = %self.session_id,
                        message = %key.id,
                        "Failed to update message: {}",
                        e
                    );
                }
            }
        }

        let payload: Vec<Value> = updates
            .iter()
            .map(|u| json!({ "key": u.key, "update": normalize_object(&u.update) }))
            .collect();
        self.notifier
            .notify(WebhookEvent::UpdateMessages, Value::Array(payload));
    }

    pub async fn delete(&self, item: &MessageDelete) {
        let ids = match item {
            MessageDelete::All { jid } => {
                let jid = normalized_user(jid);
                match self.store.delete_chat_messages(&self.session_id, &jid).await {
                    Ok(ids) => ids,
                    Err(e) => {
                        tracing::error!(session = %self.session_id, chat = %jid, "Failed to delete chat messages: {}", e);
                        return;
                    }
                }
            }
            MessageDelete::Keys { keys } => {
                let mut by_chat: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for key in keys.iter().filter_map(MessageRef::from_key) {
                    by_chat.entry(key.remote_jid).or_default().push(key.id);
                }
                let mut ids = Vec::new();
                for (jid, group) in by_chat {
                    match self.store.delete_messages(&self.session_id, &jid, &group).await {
                        Ok(_) => ids.extend(group),
                        Err(e) => {
                            tracing::error!(session = %self.session_id, chat = %jid, "Failed to delete messages: {}", e);
                        }
                    }
                }
                ids
            }
        };

        if ids.is_empty() {
            return;
        }
        let hashed: Vec<String> = ids.iter().map(|id| api_id(&self.session_id, id)).collect();
        self.notifier
            .notify(WebhookEvent::DeleteMessages, json!({ "ids": hashed }));
    }

    pub async fn update_receipts(&self, updates: &[ReceiptUpdate]) {
        let mut batch = Vec::with_capacity(updates.len());
        for item in updates {
            let fields = Value::Object(normalize_object(&item.receipt));
            batch.push(json!({ "key": item.key, "receipt": fields.clone() }));

            let Some(key) = MessageRef::from_key(&item.key) else {
                continue;
            };
            let receipt: UserReceipt = match serde_json::from_value(fields) {
                Ok(receipt) => receipt,
                Err(e) => {
                    tracing::warn!(session = %self.session_id, message = %key.id, "Skipping malformed receipt: {}", e);
                    continue;
                }
            };

            let merge = move |list| merge_receipt(list, receipt.clone());
            match self
                .store
                .update_receipts(&self.session_id, &key, &merge)
                .await
            {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    tracing::debug!(
                        session = %self.session_id,
                        message = %key.id,
                        "Got receipt update for non existent message"
                    );
                }
                Err(e) => {
                    tracing::error!(session = %self.session_id, message = %key.id, "Failed to update receipt: {}", e);
                }
            }
        }

        // The whole batch goes out, applied or not
        self.notifier
            .notify(WebhookEvent::UpdateMessages, Value::Array(batch));
    }

    pub async fn update_reactions(&self, updates: &[ReactionUpdate]) {
        let mut results = Vec::new();
        for item in updates {
            let Some(key) = MessageRef::from_key(&item.key) else {
                continue;
            };
            let reaction: Reaction =
                match serde_json::from_value(Value::Object(normalize_object(&item.reaction))) {
                    Ok(reaction) => reaction,
                    Err(e) => {
                        tracing::warn!(session = %self.session_id, message = %key.id, "Skipping malformed reaction: {}", e);
                        continue;
                    }
                };

            let merge = move |list| apply_reaction(list, reaction.clone());
            match self
                .store
                .update_reactions(&self.session_id, &key, &merge)
                .await
            {
                Ok(reactions) => results.push(json!({ "key": item.key, "reactions": reactions })),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(
                        session = %self.session_id,
                        message = %key.id,
                        "Got reaction update for non existent message"
                    );
                }
                Err(e) => {
                    tracing::error!(session = %self.session_id, message = %key.id, "Failed to update reaction: {}", e);
                }
            }
        }

        if !results.is_empty() {
            self.notifier
                .notify(WebhookEvent::UpdateMessages, Value::Array(results));
        }
    }
}

/// Shallow merge of an update over the stored message. The key may change,
/// so the record is split again and its `apiId` recomputed.
fn merge_update(session_id: &str, previous: MessageRecord, patch: &Map<String, Value>) -> MessageRecord {
    let mut doc = previous.to_document();
    doc.extend(patch.clone());
    match MessageRecord::from_document(doc) {
        Some(mut merged) => {
            merged.api_id = Some(api_id(session_id, &merged.id));
            merged
        }
        None => {
            tracing::warn!(message = %previous.id, "Update drops the message key, keeping stored version");
            previous
        }
    }
}

#[async_trait]
impl Dispatch for MessageSync {
    async fn dispatch(&self, event: &SyncEvent) {
        match event {
            SyncEvent::HistorySet(set) => self.set(&set.messages, set.is_latest).await,
            SyncEvent::MessagesUpsert(batch) => self.upsert(batch).await,
            SyncEvent::MessagesUpdate(updates) => self.update(updates).await,
            SyncEvent::MessagesDelete(item) => self.delete(item).await,
            SyncEvent::ReceiptUpdate(updates) => self.update_receipts(updates).await,
            SyncEvent::MessagesReaction(updates) => self.update_reactions(updates).await,
            SyncEvent::ChatsUpsert(_)
            | SyncEvent::ChatsUpdate(_)
            | SyncEvent::ChatsDelete(_)
            | SyncEvent::ContactsUpsert(_)
            | SyncEvent::ContactsUpdate(_)
            | SyncEvent::CredsUpdate(_) => {
                tracing::debug!(event = %event.kind(), "Message sync ignores event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::MessageKey;
    use crate::store::{ChatRecord, ChatStore};
    use crate::sync::testing::{Harness, SESSION, of_kind};

    fn setup(h: &Harness) -> MessageSync {
        let chats = Arc::new(ChatSync::new(SESSION, h.store.clone(), h.notifier.clone()));
        MessageSync::new(
            SESSION,
            h.store.clone(),
            ChatResolver::new(SESSION, h.store.clone()),
            chats,
            h.notifier.clone(),
        )
    }

    fn msg(jid: &str, id: &str, ts: i64) -> WebMessage {
        serde_json::from_value(json!({
            "key": {"remoteJid": jid, "fromMe": false, "id": id},
            "messageTimestamp": ts,
            "message": {"conversation": "hi"}
        }))
        .unwrap()
    }

    fn upsert(kind: UpsertKind, messages: Vec<WebMessage>) -> MessagesUpsert {
        MessagesUpsert { messages, kind }
    }

    fn key(jid: &str, id: &str) -> MessageRef {
        MessageRef {
            remote_jid: jid.into(),
            id: id.into(),
        }
    }

    async fn stored(h: &Harness, jid: &str, id: &str) -> Option<MessageRecord> {
        h.store
            .get_message(SESSION, &key(jid, id))
            .await
            .unwrap()
            .map(|s| s.record)
    }

    async fn seed_chat(h: &Harness, id: &str) -> i64 {
        h.store
            .upsert_chat(SESSION, &ChatRecord { id: id.into(), ..Default::default() })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_history_set_links_chats_and_notifies_once() {
        let mut h = Harness::new().await;
        let messages = setup(&h);
        let pk = seed_chat(&h, "a@s.whatsapp.net").await;

        messages
            .set(
                &[msg("a@s.whatsapp.net", "m1", 1), msg("b@s.whatsapp.net", "m2", 2)],
                false,
            )
            .await;
        let m1 = stored(&h, "a@s.whatsapp.net", "m1").await.unwrap();
        assert_eq!(m1.chat_id, Some(pk));
        assert_eq!(m1.api_id, Some(api_id(SESSION, "m1")));
        let m2 = stored(&h, "b@s.whatsapp.net", "m2").await.unwrap();
        assert_eq!(m2.chat_id, None);

        let notes = h.drain().await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].event, WebhookEvent::HistorySync);
        assert_eq!(notes[0].payload, json!({"channelId": SESSION}));
    }

    #[tokio::test]
    async fn test_history_set_replace_and_additive() {
        let h = Harness::new().await;
        let messages = setup(&h);
        messages.set(&[msg("a@s.whatsapp.net", "old", 1)], false).await;

        messages
            .set(&[msg("a@s.whatsapp.net", "m1", 1), msg("a@s.whatsapp.net", "m2", 2)], true)
            .await;
        assert!(stored(&h, "a@s.whatsapp.net", "old").await.is_none());

        // Re-delivered rows are kept as stored
        let mut changed = msg("a@s.whatsapp.net", "m2", 99);
        changed.fields.insert("status".into(), ProtoValue::Int(4));
        messages
            .set(&[changed, msg("a@s.whatsapp.net", "m3", 3)], false)
            .await;
        let m2 = stored(&h, "a@s.whatsapp.net", "m2").await.unwrap();
        assert_eq!(m2.message_timestamp, Some(2));
        assert!(!m2.data.contains_key("status"));
        assert_eq!(h.store.session_counts(SESSION).await.unwrap().messages, 3);
    }

    #[tokio::test]
    async fn test_notify_for_unknown_chat_creates_it_once() {
        let mut h = Harness::new().await;
        let messages = setup(&h);

        messages
            .upsert(&upsert(
                UpsertKind::Notify,
                vec![msg("a:7@s.whatsapp.net", "m1", 100), msg("a@s.whatsapp.net", "m2", 101)],
            ))
            .await;

        let chat = h.store.get_chat(SESSION, "a@s.whatsapp.net").await.unwrap().unwrap();
        assert_eq!(chat.record.unread_count, Some(1));
        assert_eq!(chat.record.conversation_timestamp, Some(100));
        assert!(stored(&h, "a@s.whatsapp.net", "m1").await.is_some());

        let notes = h.drain().await;
        assert_eq!(of_kind(&notes, WebhookEvent::NewDialog).len(), 1);
        let new_messages = of_kind(&notes, WebhookEvent::NewMessage);
        assert_eq!(new_messages.len(), 2);
        assert_eq!(new_messages[0].payload["remoteJid"], json!("a@s.whatsapp.net"));
        assert!(new_messages[0].payload.get("chatId").is_none());
    }

    #[tokio::test]
    async fn test_append_and_other_kinds_do_not_create_chats() {
        let mut h = Harness::new().await;
        let messages = setup(&h);

        messages
            .upsert(&upsert(UpsertKind::Append, vec![msg("a@s.whatsapp.net", "m1", 1)]))
            .await;
        messages
            .upsert(&upsert(UpsertKind::Other, vec![msg("a@s.whatsapp.net", "m2", 2)]))
            .await;

        assert!(!h.store.chat_exists(SESSION, "a@s.whatsapp.net").await.unwrap());
        assert!(stored(&h, "a@s.whatsapp.net", "m1").await.is_some());
        assert!(stored(&h, "a@s.whatsapp.net", "m2").await.is_none());
        let notes = h.drain().await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].event, WebhookEvent::NewMessage);
    }

    #[tokio::test]
    async fn test_upsert_twice_is_idempotent() {
        let h = Harness::new().await;
        let messages = setup(&h);
        seed_chat(&h, "a@s.whatsapp.net").await;
        let batch = upsert(UpsertKind::Notify, vec![msg("a@s.whatsapp.net", "m1", 1)]);

        messages.upsert(&batch).await;
        let first = h.store.get_message(SESSION, &key("a@s.whatsapp.net", "m1")).await.unwrap();
        messages.upsert(&batch).await;
        let second = h.store.get_message(SESSION, &key("a@s.whatsapp.net", "m1")).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_update_recreates_message() {
        let mut h = Harness::new().await;
        let messages = setup(&h);
        messages
            .upsert(&upsert(UpsertKind::Append, vec![msg("a@s.whatsapp.net", "m1", 1)]))
            .await;
        h.drain().await;

        let update: MessageUpdate = serde_json::from_value(json!({
            "key": {"remoteJid": "a@s.whatsapp.net", "id": "m1"},
            "update": {"status": 3, "messageStubType": null}
        }))
        .unwrap();
        let missing: MessageUpdate = serde_json::from_value(json!({
            "key": {"remoteJid": "a@s.whatsapp.net", "id": "nope"},
            "update": {"status": 3}
        }))
        .unwrap();
        messages.update(&[missing, update]).await;

        let m1 = stored(&h, "a@s.whatsapp.net", "m1").await.unwrap();
        assert_eq!(m1.data["status"], json!(3));
        assert_eq!(m1.data["message"], json!({"conversation": "hi"}));
        assert!(!m1.data.contains_key("messageStubType"));
        assert!(stored(&h, "a@s.whatsapp.net", "nope").await.is_none());

        let notes = h.drain().await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].event, WebhookEvent::UpdateMessages);
        assert_eq!(notes[0].payload[1]["update"], json!({"status": 3}));
    }

    #[tokio::test]
    async fn test_receipts_unique_per_user() {
        let mut h = Harness::new().await;
        let messages = setup(&h);
        messages
            .upsert(&upsert(UpsertKind::Append, vec![msg("a@s.whatsapp.net", "m1", 1)]))
            .await;
        h.drain().await;

        let receipt = |user: &str, ts: i64| -> ReceiptUpdate {
            serde_json::from_value(json!({
                "key": {"remoteJid": "a@s.whatsapp.net", "id": "m1"},
                "receipt": {"userJid": user, "readTimestamp": ts}
            }))
            .unwrap()
        };
        messages
            .update_receipts(&[receipt("u1", 1), receipt("u2", 2)])
            .await;
        messages.update_receipts(&[receipt("u1", 3)]).await;

        let m1 = stored(&h, "a@s.whatsapp.net", "m1").await.unwrap();
        let users: Vec<_> = m1.user_receipt.iter().map(|r| r.user_jid.as_str()).collect();
        assert_eq!(users, vec!["u2", "u1"]);
        assert_eq!(m1.user_receipt[1].fields["readTimestamp"], json!(3));

        let notes = h.drain().await;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].payload.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_receipt_for_missing_message_is_still_announced() {
        let mut h = Harness::new().await;
        let messages = setup(&h);
        let update: ReceiptUpdate = serde_json::from_value(json!({
            "key": {"remoteJid": "a@s.whatsapp.net", "id": "ghost"},
            "receipt": {"userJid": "u1"}
        }))
        .unwrap();
        messages.update_receipts(&[update]).await;

        assert!(stored(&h, "a@s.whatsapp.net", "ghost").await.is_none());
        let notes = h.drain().await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].event, WebhookEvent::UpdateMessages);
        let batch = notes[0].payload.as_array().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0]["key"]["id"], json!("ghost"));
        assert_eq!(batch[0]["receipt"]["userJid"], json!("u1"));
    }

    #[tokio::test]
    async fn test_reaction_then_removal() {
        let mut h = Harness::new().await;
        let messages = setup(&h);
        messages
            .upsert(&upsert(UpsertKind::Append, vec![msg("a@s.whatsapp.net", "m1", 1)]))
            .await;
        h.drain().await;

        let reaction = |text: &str| ReactionUpdate {
            key: MessageKey::new("a@s.whatsapp.net", "m1"),
            reaction: serde_json::from_value(json!({
                "key": {"remoteJid": "a@s.whatsapp.net", "fromMe": true, "id": "r1"},
                "text": text
            }))
            .unwrap(),
        };
        messages.update_reactions(&[reaction("👍")]).await;
        let m1 = stored(&h, "a@s.whatsapp.net", "m1").await.unwrap();
        assert_eq!(m1.reactions.len(), 1);
        assert_eq!(m1.reactions[0].author(), "me");

        messages.update_reactions(&[reaction("")]).await;
        let m1 = stored(&h, "a@s.whatsapp.net", "m1").await.unwrap();
        assert!(m1.reactions.iter().all(|r| r.author() != "me"));

        let notes = h.drain().await;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].payload[0]["reactions"], json!([]));
    }

    #[tokio::test]
    async fn test_delete_notifies_hashed_ids() {
        let mut h = Harness::new().await;
        let messages = setup(&h);
        messages
            .set(
                &[
                    msg("a@s.whatsapp.net", "m1", 1),
                    msg("a@s.whatsapp.net", "m2", 2),
                    msg("a@s.whatsapp.net", "m3", 3),
                ],
                false,
            )
            .await;
        h.drain().await;

        messages
            .delete(&MessageDelete::Keys {
                keys: vec![
                    MessageKey::new("a@s.whatsapp.net", "m1"),
                    MessageKey::new("a@s.whatsapp.net", "m2"),
                ],
            })
            .await;
        assert!(stored(&h, "a@s.whatsapp.net", "m1").await.is_none());

        let notes = h.drain().await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].event, WebhookEvent::DeleteMessages);
        assert_eq!(
            notes[0].payload,
            json!({"ids": [api_id(SESSION, "m1"), api_id(SESSION, "m2")]})
        );
        let raw = notes[0].payload.to_string();
        assert!(!raw.contains("\"m1\""));

        messages
            .delete(&MessageDelete::All {
                jid: "a@s.whatsapp.net".into(),
            })
            .await;
        assert_eq!(h.store.session_counts(SESSION).await.unwrap().messages, 0);
        let notes = h.drain().await;
        assert_eq!(notes[0].payload, json!({"ids": [api_id(SESSION, "m3")]}));
    }
}
