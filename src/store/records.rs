//! Storage-shaped records
//!
//! Normalized documents split into the columns the store indexes or mutates
//! field-wise, plus a free-form JSON remainder.

use crate::proto::{MessageKey, normalized_user};
use crate::sync::hash::API_ID_FIELD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored row together with its internal key.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub pk_id: i64,
    pub record: T,
}

/// Counter write with increment-or-set semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    Increment(i64),
    Set(i64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRecord {
    pub id: String,
    pub api_id: Option<String>,
    pub unread_count: Option<i64>,
    pub conversation_timestamp: Option<i64>,
    pub data: Map<String, Value>,
}

impl ChatRecord {
    pub fn from_document(mut doc: Map<String, Value>) -> Self {
        Self {
            id: take_string(&mut doc, "id").unwrap_or_default(),
            api_id: take_string(&mut doc, API_ID_FIELD),
            unread_count: take_i64(&mut doc, "unreadCount"),
            conversation_timestamp: take_i64(&mut doc, "conversationTimestamp"),
            data: doc,
        }
    }

    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = self.data.clone();
        doc.insert("id".into(), Value::String(self.id.clone()));
        put_opt(&mut doc, API_ID_FIELD, self.api_id.clone().map(Value::String));
        put_opt(&mut doc, "unreadCount", self.unread_count.map(Value::from));
        put_opt(
            &mut doc,
            "conversationTimestamp",
            self.conversation_timestamp.map(Value::from),
        );
        doc
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactRecord {
    pub id: String,
    pub api_id: Option<String>,
    pub name: Option<String>,
    pub notify: Option<String>,
    pub verified_name: Option<String>,
    pub img_url: Option<String>,
    pub data: Map<String, Value>,
}

impl ContactRecord {
    pub fn from_document(mut doc: Map<String, Value>) -> Self {
        Self {
            id: take_string(&mut doc, "id").unwrap_or_default(),
            api_id: take_string(&mut doc, API_ID_FIELD),
            name: take_string(&mut doc, "name"),
            notify: take_string(&mut doc, "notify"),
            verified_name: take_string(&mut doc, "verifiedName"),
            img_url: take_string(&mut doc, "imgUrl"),
            data: doc,
        }
    }

    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = self.data.clone();
        doc.insert("id".into(), Value::String(self.id.clone()));
        let named = [
            (API_ID_FIELD, &self.api_id),
            ("name", &self.name),
            ("notify", &self.notify),
            ("verifiedName", &self.verified_name),
            ("imgUrl", &self.img_url),
        ];
        for (field, value) in named {
            put_opt(&mut doc, field, value.clone().map(Value::String));
        }
        doc
    }
}

/// Per-user delivery/read state on a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReceipt {
    pub user_jid: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// One author's reaction on a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<MessageKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Reaction {
    pub fn author(&self) -> String {
        self.key.as_ref().map(MessageKey::author).unwrap_or_default()
    }

    /// Empty text withdraws the author's reaction.
    pub fn is_removal(&self) -> bool {
        self.text.as_deref().is_none_or(str::is_empty)
    }
}

/// Natural key of a message within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub remote_jid: String,
    pub id: String,
}

impl MessageRef {
    /// Requires both `remoteJid` and `id`; the JID is normalized.
    pub fn from_key(key: &MessageKey) -> Option<Self> {
        match (&key.remote_jid, &key.id) {
            (Some(jid), Some(id)) if !jid.is_empty() && !id.is_empty() => Some(Self {
                remote_jid: normalized_user(jid),
                id: id.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageRecord {
    pub remote_jid: String,
    pub id: String,
    pub api_id: Option<String>,
    pub chat_id: Option<i64>,
    pub message_timestamp: Option<i64>,
    pub user_receipt: Vec<UserReceipt>,
    pub reactions: Vec<Reaction>,
    /// Remaining document, including `key`.
    pub data: Map<String, Value>,
}

impl MessageRecord {
    /// Split a normalized message document. Returns `None` when the key
    /// lacks a chat JID or message id.
    pub fn from_document(mut doc: Map<String, Value>) -> Option<Self> {
        let key: MessageKey = serde_json::from_value(doc.get("key")?.clone()).ok()?;
        let MessageRef { remote_jid, id } = MessageRef::from_key(&key)?;
        let user_receipt = take_list(&mut doc, "userReceipt");
        let reactions = take_list(&mut doc, "reactions");
        Some(Self {
            remote_jid,
            id,
            api_id: take_string(&mut doc, API_ID_FIELD),
            chat_id: None,
            message_timestamp: doc.get("messageTimestamp").and_then(Value::as_i64),
            user_receipt,
            reactions,
            data: doc,
        })
    }

    pub fn key_ref(&self) -> MessageRef {
        MessageRef {
            remote_jid: self.remote_jid.clone(),
            id: self.id.clone(),
        }
    }

    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = self.data.clone();
        put_opt(&mut doc, API_ID_FIELD, self.api_id.clone().map(Value::String));
        put_list(&mut doc, "userReceipt", &self.user_receipt);
        put_list(&mut doc, "reactions", &self.reactions);
        doc
    }

    /// Outbound shape: the document plus top-level `remoteJid`/`id`.
    /// Internal keys (`pkId`, `chatId`) are never included.
    pub fn to_payload(&self) -> Value {
        let mut doc = self.to_document();
        doc.insert("remoteJid".into(), Value::String(self.remote_jid.clone()));
        doc.insert("id".into(), Value::String(self.id.clone()));
        Value::Object(doc)
    }
}

/// Row counts for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounts {
    pub chats: i64,
    pub contacts: i64,
    pub messages: i64,
}

fn take_string(doc: &mut Map<String, Value>, key: &str) -> Option<String> {
    match doc.get(key) {
        Some(Value::String(_)) => match doc.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}

fn take_i64(doc: &mut Map<String, Value>, key: &str) -> Option<i64> {
    let n = doc.get(key).and_then(Value::as_i64)?;
    doc.remove(key);
    Some(n)
}

fn take_list<T: for<'de> Deserialize<'de>>(doc: &mut Map<String, Value>, key: &str) -> Vec<T> {
    match doc.get(key).cloned().map(serde_json::from_value::<Vec<T>>) {
        Some(Ok(items)) => {
            doc.remove(key);
            items
        }
        Some(Err(e)) => {
            tracing::warn!(field = key, error = %e, "Keeping malformed list in document");
            Vec::new()
        }
        None => Vec::new(),
    }
}

fn put_opt(doc: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(v) = value {
        doc.insert(key.to_string(), v);
    }
}

/// Empty lists are left out of the document.
fn put_list<T: Serialize>(doc: &mut Map<String, Value>, key: &str, items: &[T]) {
    if items.is_empty() {
        return;
    }
    match serde_json::to_value(items) {
        Ok(value) => {
            doc.insert(key.to_string(), value);
        }
        Err(e) => {
            tracing::warn!(field = key, error = %e, "Leaving unserializable list out of document");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_chat_record_split() {
        let record = ChatRecord::from_document(doc(json!({
            "id": "a@s.whatsapp.net",
            "apiId": "h",
            "unreadCount": 2,
            "conversationTimestamp": 100,
            "archived": true
        })));
        assert_eq!(record.id, "a@s.whatsapp.net");
        assert_eq!(record.unread_count, Some(2));
        assert_eq!(record.data, doc(json!({"archived": true})));
        assert_eq!(record.to_document()["unreadCount"], json!(2));
    }

    #[test]
    fn test_message_record_requires_full_key() {
        assert!(MessageRecord::from_document(doc(json!({"key": {"id": "m1"}}))).is_none());
        assert!(MessageRecord::from_document(doc(json!({"message": {}}))).is_none());
    }

    #[test]
    fn test_message_record_split() {
        let record = MessageRecord::from_document(doc(json!({
            "key": {"remoteJid": "a:2@s.whatsapp.net", "id": "m1"},
            "messageTimestamp": 5,
            "userReceipt": [{"userJid": "u1", "readTimestamp": 9}],
            "reactions": [{"key": {"fromMe": true}, "text": "x"}]
        })))
        .unwrap();
        assert_eq!(record.remote_jid, "a@s.whatsapp.net");
        assert_eq!(record.message_timestamp, Some(5));
        assert_eq!(record.user_receipt[0].user_jid, "u1");
        assert_eq!(record.reactions[0].author(), "me");
        assert!(!record.data.contains_key("userReceipt"));

        let payload = record.to_payload();
        assert_eq!(payload["id"], json!("m1"));
        assert!(payload.get("chatId").is_none());
        assert_eq!(payload["userReceipt"][0]["readTimestamp"], json!(9));
    }

    #[test]
    fn test_reaction_removal() {
        let empty: Reaction = serde_json::from_value(json!({"text": ""})).unwrap();
        assert!(empty.is_removal());
        let missing = Reaction::default();
        assert!(missing.is_removal());
        let thumbs: Reaction = serde_json::from_value(json!({"text": "👍"})).unwrap();
        assert!(!thumbs.is_removal());
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("unserializable"))
        }
    }

    #[test]
    fn test_put_list_skips_empty_and_unserializable() {
        let mut doc = Map::new();
        put_list::<Reaction>(&mut doc, "reactions", &[]);
        put_list(&mut doc, "userReceipt", &[Unserializable]);
        assert!(doc.is_empty());

        put_list(&mut doc, "reactions", &[Reaction::default()]);
        assert_eq!(doc["reactions"], json!([{}]));
    }
}
