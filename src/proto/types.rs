//! Entity payloads emitted by the protocol client
//!
//! Each struct names the fields the sync handlers reason about and keeps
//! everything else in a flattened [`ProtoObject`] so nothing is lost on the
//! way to storage.

use super::value::{ProtoObject, ProtoValue};
use serde::{Deserialize, Serialize};

/// A chat (dialog) as sent in history snapshots, upserts and partial updates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub unread_count: Option<i64>,
    pub conversation_timestamp: Option<ProtoValue>,
    #[serde(flatten)]
    pub metadata: ProtoObject,
}

impl Chat {
    pub fn to_object(&self) -> ProtoObject {
        let mut obj = self.metadata.clone();
        if !self.id.is_empty() {
            obj.insert("id".into(), self.id.as_str().into());
        }
        if let Some(n) = self.unread_count {
            obj.insert("unreadCount".into(), ProtoValue::Int(n));
        }
        if let Some(ts) = &self.conversation_timestamp {
            obj.insert("conversationTimestamp".into(), ts.clone());
        }
        obj
    }
}

/// A contact as sent in history snapshots, upserts and partial updates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: Option<String>,
    pub notify: Option<String>,
    pub verified_name: Option<String>,
    pub img_url: Option<String>,
    #[serde(flatten)]
    pub metadata: ProtoObject,
}

impl Contact {
    pub fn to_object(&self) -> ProtoObject {
        let mut obj = self.metadata.clone();
        if !self.id.is_empty() {
            obj.insert("id".into(), self.id.as_str().into());
        }
        let named = [
            ("name", &self.name),
            ("notify", &self.notify),
            ("verifiedName", &self.verified_name),
            ("imgUrl", &self.img_url),
        ];
        for (field, value) in named {
            if let Some(v) = value {
                obj.insert(field.into(), v.as_str().into());
            }
        }
        obj
    }
}

/// Message key: addresses one message within one chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageKey {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_jid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_me: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
}

impl MessageKey {
    pub fn new(remote_jid: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            remote_jid: Some(remote_jid.into()),
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Who authored whatever this key points at: `"me"` for own messages,
    /// otherwise the group participant or the chat JID.
    pub fn author(&self) -> String {
        if self.from_me == Some(true) {
            return "me".to_string();
        }
        [&self.participant, &self.remote_jid]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_default()
    }

    pub fn to_object(&self) -> ProtoObject {
        let mut obj = ProtoObject::new();
        if let Some(jid) = &self.remote_jid {
            obj.insert("remoteJid".into(), jid.as_str().into());
        }
        if let Some(from_me) = self.from_me {
            obj.insert("fromMe".into(), from_me.into());
        }
        if let Some(id) = &self.id {
            obj.insert("id".into(), id.as_str().into());
        }
        if let Some(participant) = &self.participant {
            obj.insert("participant".into(), participant.as_str().into());
        }
        obj
    }
}

/// A full message envelope (key, timestamp, content and status fields).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebMessage {
    pub key: MessageKey,
    pub message_timestamp: Option<ProtoValue>,
    #[serde(flatten)]
    pub fields: ProtoObject,
}

impl WebMessage {
    pub fn to_object(&self) -> ProtoObject {
        let mut obj = self.fields.clone();
        obj.insert("key".into(), ProtoValue::Object(self.key.to_object()));
        if let Some(ts) = &self.message_timestamp {
            obj.insert("messageTimestamp".into(), ts.clone());
        }
        obj
    }
}

/// Partial message update addressed by key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MessageUpdate {
    pub key: MessageKey,
    pub update: ProtoObject,
}

/// Delivery/read receipt for one user on one message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReceiptUpdate {
    pub key: MessageKey,
    pub receipt: ProtoObject,
}

/// Reaction change on one message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReactionUpdate {
    pub key: MessageKey,
    pub reaction: ProtoObject,
}

/// Message deletion: specific keys, or everything in one chat.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MessageDelete {
    Keys { keys: Vec<MessageKey> },
    All { jid: String },
}

/// The account's own identity, as carried by credential refreshes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Me {
    pub id: String,
    pub name: Option<String>,
}

/// Credential refresh. Only the identity part matters to the store.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CredsUpdate {
    pub me: Option<Me>,
}
