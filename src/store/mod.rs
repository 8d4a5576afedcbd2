//! Persistence Seam
//!
//! The sync handlers talk to storage only through these traits. Every method
//! that reads and then writes the same row runs inside one transaction on the
//! implementation side; merge policy stays with the caller and is passed in
//! as a closure.

mod records;
mod sqlx_store;

pub use records::{
    ChatRecord, ContactRecord, CounterUpdate, MessageRecord, MessageRef, Reaction,
    SessionCounts, Stored, UserReceipt,
};
pub use sqlx_store::SqlxStore;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub type ReceiptMerge = dyn Fn(Vec<UserReceipt>) -> Vec<UserReceipt> + Send + Sync;
pub type ReactionMerge = dyn Fn(Vec<Reaction>) -> Vec<Reaction> + Send + Sync;
pub type MessageMerge = dyn Fn(MessageRecord) -> MessageRecord + Send + Sync;

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Apply a history snapshot atomically. With `is_latest`, every chat of
    /// the session is removed first. Only ids not yet stored are inserted,
    /// then messages whose `remote_jid` matches a stored chat get their
    /// `chat_id` linked. Returns the records actually inserted.
    async fn replace_chats(
        &self,
        session_id: &str,
        chats: &[ChatRecord],
        is_latest: bool,
    ) -> Result<Vec<ChatRecord>>;

    /// Create, or overwrite the supplied fields of, one chat.
    async fn upsert_chat(&self, session_id: &str, chat: &ChatRecord) -> Result<i64>;

    /// Merge a partial chat. `unread` replaces whatever `chat.unread_count`
    /// carries. Fails with `NotFound` when the chat does not exist.
    async fn update_chat(
        &self,
        session_id: &str,
        chat: &ChatRecord,
        unread: Option<CounterUpdate>,
    ) -> Result<()>;

    async fn delete_chats(&self, session_id: &str, ids: &[String]) -> Result<u64>;

    async fn chat_exists(&self, session_id: &str, id: &str) -> Result<bool>;

    /// Internal keys for the given chat ids; unknown ids are absent.
    async fn chat_pk_ids(&self, session_id: &str, ids: &[String]) -> Result<HashMap<String, i64>>;

    async fn get_chat(&self, session_id: &str, id: &str) -> Result<Option<Stored<ChatRecord>>>;

    async fn list_chat_ids(&self, session_id: &str) -> Result<Vec<String>>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn upsert_contact(&self, session_id: &str, contact: &ContactRecord) -> Result<i64>;

    /// Merge a partial contact. Fails with `NotFound` when absent.
    async fn update_contact(&self, session_id: &str, contact: &ContactRecord) -> Result<()>;

    async fn contacts_without_name(&self, session_id: &str) -> Result<Vec<ContactRecord>>;

    async fn contacts_without_image(&self, session_id: &str) -> Result<Vec<String>>;

    async fn set_contact_name(&self, session_id: &str, id: &str, name: &str) -> Result<()>;

    async fn set_contact_image(&self, session_id: &str, id: &str, img_url: &str) -> Result<()>;

    async fn get_contact(&self, session_id: &str, id: &str)
    -> Result<Option<Stored<ContactRecord>>>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Bulk insert inside one transaction. With `is_latest`, every message of
    /// the session is removed first; otherwise existing keys are left as-is.
    async fn insert_messages(
        &self,
        session_id: &str,
        messages: &[MessageRecord],
        is_latest: bool,
    ) -> Result<u64>;

    async fn upsert_message(&self, session_id: &str, message: &MessageRecord) -> Result<i64>;

    /// Read, merge, delete and re-insert one message atomically. The chat
    /// link is resolved again for the merged key. `NotFound` when absent.
    async fn recreate_message(
        &self,
        session_id: &str,
        key: &MessageRef,
        merge: &MessageMerge,
    ) -> Result<MessageRecord>;

    /// Atomically rewrite a message's receipt list. `NotFound` when absent.
    async fn update_receipts(
        &self,
        session_id: &str,
        key: &MessageRef,
        merge: &ReceiptMerge,
    ) -> Result<Vec<UserReceipt>>;

    /// Atomically rewrite a message's reaction list. `NotFound` when absent.
    async fn update_reactions(
        &self,
        session_id: &str,
        key: &MessageRef,
        merge: &ReactionMerge,
    ) -> Result<Vec<Reaction>>;

    /// Delete every message of one chat, returning the removed message ids.
    async fn delete_chat_messages(&self, session_id: &str, remote_jid: &str)
    -> Result<Vec<String>>;

    /// Delete the given ids within one chat, returning the removed ids.
    async fn delete_messages(
        &self,
        session_id: &str,
        remote_jid: &str,
        ids: &[String],
    ) -> Result<Vec<String>>;

    async fn get_message(
        &self,
        session_id: &str,
        key: &MessageRef,
    ) -> Result<Option<Stored<MessageRecord>>>;
}
