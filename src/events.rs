//! Protocol Events
//!
//! One variant per named event the protocol client emits. The JSON form is
//! `{"event": "<name>", "data": <payload>}`, which is also the line format of
//! recorded replay files.

use crate::proto::{
    Chat, Contact, CredsUpdate, MessageDelete, MessageUpdate, ReactionUpdate, ReceiptUpdate,
    WebMessage,
};
use serde::Deserialize;

/// Event names as the protocol client spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    HistorySet,
    ChatsUpsert,
    ChatsUpdate,
    ChatsDelete,
    ContactsUpsert,
    ContactsUpdate,
    MessagesUpsert,
    MessagesUpdate,
    MessagesDelete,
    ReceiptUpdate,
    MessagesReaction,
    CredsUpdate,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HistorySet => "messaging-history.set",
            Self::ChatsUpsert => "chats.upsert",
            Self::ChatsUpdate => "chats.update",
            Self::ChatsDelete => "chats.delete",
            Self::ContactsUpsert => "contacts.upsert",
            Self::ContactsUpdate => "contacts.update",
            Self::MessagesUpsert => "messages.upsert",
            Self::MessagesUpdate => "messages.update",
            Self::MessagesDelete => "messages.delete",
            Self::ReceiptUpdate => "message-receipt.update",
            Self::MessagesReaction => "messages.reaction",
            Self::CredsUpdate => "creds.update",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bulk history snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistorySet {
    pub chats: Vec<Chat>,
    pub contacts: Vec<Contact>,
    pub messages: Vec<WebMessage>,
    pub is_latest: bool,
}

/// Sub-kind of a live message batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertKind {
    /// Messages appended by this device or history catch-up.
    Append,
    /// Newly received messages that should surface to the user.
    Notify,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessagesUpsert {
    pub messages: Vec<WebMessage>,
    #[serde(rename = "type")]
    pub kind: UpsertKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum SyncEvent {
    #[serde(rename = "messaging-history.set")]
    HistorySet(HistorySet),
    #[serde(rename = "chats.upsert")]
    ChatsUpsert(Vec<Chat>),
    #[serde(rename = "chats.update")]
    ChatsUpdate(Vec<Chat>),
    #[serde(rename = "chats.delete")]
    ChatsDelete(Vec<String>),
    #[serde(rename = "contacts.upsert")]
    ContactsUpsert(Vec<Contact>),
    #[serde(rename = "contacts.update")]
    ContactsUpdate(Vec<Contact>),
    #[serde(rename = "messages.upsert")]
    MessagesUpsert(MessagesUpsert),
    #[serde(rename = "messages.update")]
    MessagesUpdate(Vec<MessageUpdate>),
    #[serde(rename = "messages.delete")]
    MessagesDelete(MessageDelete),
    #[serde(rename = "message-receipt.update")]
    ReceiptUpdate(Vec<ReceiptUpdate>),
    #[serde(rename = "messages.reaction")]
    MessagesReaction(Vec<ReactionUpdate>),
    #[serde(rename = "creds.update")]
    CredsUpdate(CredsUpdate),
}

impl SyncEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::HistorySet(_) => EventKind::HistorySet,
            Self::ChatsUpsert(_) => EventKind::ChatsUpsert,
            Self::ChatsUpdate(_) => EventKind::ChatsUpdate,
            Self::ChatsDelete(_) => EventKind::ChatsDelete,
            Self::ContactsUpsert(_) => EventKind::ContactsUpsert,
            Self::ContactsUpdate(_) => EventKind::ContactsUpdate,
            Self::MessagesUpsert(_) => EventKind::MessagesUpsert,
            Self::MessagesUpdate(_) => EventKind::MessagesUpdate,
            Self::MessagesDelete(_) => EventKind::MessagesDelete,
            Self::ReceiptUpdate(_) => EventKind::ReceiptUpdate,
            Self::MessagesReaction(_) => EventKind::MessagesReaction,
            Self::CredsUpdate(_) => EventKind::CredsUpdate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_set_decodes() {
        let event: SyncEvent = serde_json::from_value(json!({
            "event": "messaging-history.set",
            "data": {"chats": [{"id": "a@s.whatsapp.net"}], "isLatest": true}
        }))
        .unwrap();
        assert_eq!(event.kind(), EventKind::HistorySet);
        assert!(matches!(
            event,
            SyncEvent::HistorySet(HistorySet { is_latest: true, ref chats, ref messages, .. })
                if chats.len() == 1 && messages.is_empty()
        ));
    }

    #[test]
    fn test_unknown_upsert_kind_is_other() {
        let event: SyncEvent = serde_json::from_value(json!({
            "event": "messages.upsert",
            "data": {"type": "prepend", "messages": []}
        }))
        .unwrap();
        assert!(matches!(
            event,
            SyncEvent::MessagesUpsert(MessagesUpsert { kind: UpsertKind::Other, .. })
        ));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result = serde_json::from_value::<SyncEvent>(json!({"event": "presence.update", "data": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(EventKind::ReceiptUpdate.as_str(), "message-receipt.update");
        assert_eq!(EventKind::CredsUpdate.to_string(), "creds.update");
    }
}
