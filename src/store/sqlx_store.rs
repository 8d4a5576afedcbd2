//! SQLx-backed session store
//!
//! Implements the chat, contact and message stores on SQLite through `sqlx`.
//! All sessions share one database; every row is partitioned by `session_id`.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use super::{
    ChatRecord, ChatStore, ContactRecord, ContactStore, CounterUpdate, MessageMerge,
    MessageRecord, MessageRef, MessageStore, Reaction, ReactionMerge, ReceiptMerge,
    SessionCounts, Stored, UserReceipt,
};
use crate::error::{Result, StoreError};

/// Upper bound on bound parameters per `IN (..)` list.
const IN_LIST_CHUNK: usize = 500;

const LINK_MESSAGES_TO_CHATS: &str = "
    UPDATE messages
    SET chat_id = (
        SELECT chats.pk_id FROM chats
        WHERE chats.session_id = messages.session_id AND chats.id = messages.remote_jid
    )
    WHERE session_id = ?
      AND EXISTS (
        SELECT 1 FROM chats
        WHERE chats.session_id = messages.session_id AND chats.id = messages.remote_jid
      )";

const INSERT_MESSAGE: &str = "
    INSERT INTO messages
        (session_id, remote_jid, id, api_id, chat_id, message_timestamp, user_receipt, reactions, data)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// SQLite storage for synchronized chats, contacts and messages.
#[derive(Clone)]
pub struct SqlxStore {
    pool: SqlitePool,
}

impl SqlxStore {
    /// Open (or create) the store at the given path.
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Private in-memory database. A single pinned connection keeps the data
    /// alive for the lifetime of the store.
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        let sql = r#"
            CREATE TABLE IF NOT EXISTS chats (
                pk_id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id              TEXT NOT NULL,
                id                      TEXT NOT NULL,
                api_id                  TEXT,
                unread_count            INTEGER,
                conversation_timestamp  INTEGER,
                data                    TEXT NOT NULL DEFAULT '{}',
                UNIQUE (session_id, id)
            );
            CREATE TABLE IF NOT EXISTS contacts (
                pk_id           INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id      TEXT NOT NULL,
                id              TEXT NOT NULL,
                api_id          TEXT,
                name            TEXT,
                notify          TEXT,
                verified_name   TEXT,
                img_url         TEXT,
                data            TEXT NOT NULL DEFAULT '{}',
                UNIQUE (session_id, id)
            );
            CREATE TABLE IF NOT EXISTS messages (
                pk_id               INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id          TEXT NOT NULL,
                remote_jid          TEXT NOT NULL,
                id                  TEXT NOT NULL,
                api_id              TEXT,
                chat_id             INTEGER REFERENCES chats (pk_id) ON DELETE SET NULL,
                message_timestamp   INTEGER,
                user_receipt        TEXT NOT NULL DEFAULT '[]',
                reactions           TEXT NOT NULL DEFAULT '[]',
                data                TEXT NOT NULL DEFAULT '{}',
                UNIQUE (session_id, remote_jid, id)
            );
            CREATE INDEX IF NOT EXISTS idx_messages_chat
                ON messages (chat_id);
            CREATE INDEX IF NOT EXISTS idx_contacts_missing_image
                ON contacts (session_id, img_url)
        "#;

        // One statement per call
        for stmt in sql.split(';') {
            let trimmed = stmt.trim();
            if trimmed.is_empty() {
                continue;
            }
            sqlx::query(trimmed)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Migration(e.to_string()))?;
        }
        Ok(())
    }

    /// Row counts for one session.
    pub async fn session_counts(&self, session_id: &str) -> Result<SessionCounts> {
        let mut counts = SessionCounts::default();
        for (table, slot) in [
            ("chats", &mut counts.chats),
            ("contacts", &mut counts.contacts),
            ("messages", &mut counts.messages),
        ] {
            *slot = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {table} WHERE session_id = ?"
            ))
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;
        }
        Ok(counts)
    }

    /// Transaction holding the write lock from `BEGIN`, so its reads cannot be
    /// invalidated by a commit on another pooled connection.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Read-modify-write of one JSON list column in a single transaction.
    async fn rewrite_list<T>(
        &self,
        session_id: &str,
        key: &MessageRef,
        column: &'static str,
        merge: &(dyn Fn(Vec<T>) -> Vec<T> + Send + Sync),
    ) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Send,
    {
        let mut tx = self.begin_write().await?;
        let raw: Option<String> = sqlx::query_scalar(&format!(
            "SELECT {column} FROM messages WHERE session_id = ? AND remote_jid = ? AND id = ?"
        ))
        .bind(session_id)
        .bind(&key.remote_jid)
        .bind(&key.id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(raw) = raw else {
            return Err(not_found_message(key));
        };

        let current: Vec<T> = serde_json::from_str(&raw)?;
        let next = merge(current);

        sqlx::query(&format!(
            "UPDATE messages SET {column} = ? WHERE session_id = ? AND remote_jid = ? AND id = ?"
        ))
        .bind(serde_json::to_string(&next)?)
        .bind(session_id)
        .bind(&key.remote_jid)
        .bind(&key.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(next)
    }
}

// ─── ChatStore ────────────────────────────────────────────────────────────────

#[async_trait]
impl ChatStore for SqlxStore {
    async fn replace_chats(
        &self,
        session_id: &str,
        chats: &[ChatRecord],
        is_latest: bool,
    ) -> Result<Vec<ChatRecord>> {
        let mut tx = self.begin_write().await?;

        if is_latest {
            sqlx::query("DELETE FROM chats WHERE session_id = ?")
                .bind(session_id)
                .execute(&mut *tx)
                .await?;
        }

        let mut added = Vec::new();
        for chat in chats {
            let inserted = sqlx::query(
                "INSERT INTO chats (session_id, id, api_id, unread_count, conversation_timestamp, data)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(session_id, id) DO NOTHING",
            )
            .bind(session_id)
            .bind(&chat.id)
            .bind(&chat.api_id)
            .bind(chat.unread_count)
            .bind(chat.conversation_timestamp)
            .bind(to_json(&chat.data)?)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if inserted > 0 {
                added.push(chat.clone());
            }
        }

        sqlx::query(LINK_MESSAGES_TO_CHATS)
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(added)
    }

    async fn upsert_chat(&self, session_id: &str, chat: &ChatRecord) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO chats (session_id, id, api_id, unread_count, conversation_timestamp, data)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(session_id, id) DO UPDATE SET
                api_id = COALESCE(excluded.api_id, chats.api_id),
                unread_count = COALESCE(excluded.unread_count, chats.unread_count),
                conversation_timestamp = COALESCE(excluded.conversation_timestamp, chats.conversation_timestamp),
                data = json_patch(chats.data, excluded.data)
             RETURNING pk_id",
        )
        .bind(session_id)
        .bind(&chat.id)
        .bind(&chat.api_id)
        .bind(chat.unread_count)
        .bind(chat.conversation_timestamp)
        .bind(to_json(&chat.data)?)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("pk_id")?)
    }

    async fn update_chat(
        &self,
        session_id: &str,
        chat: &ChatRecord,
        unread: Option<CounterUpdate>,
    ) -> Result<()> {
        let (mode, amount) = match unread {
            Some(CounterUpdate::Increment(n)) => (Some("increment"), Some(n)),
            Some(CounterUpdate::Set(n)) => (Some("set"), Some(n)),
            None => (None, None),
        };

        let affected = sqlx::query(
            "UPDATE chats SET
                api_id = COALESCE(?, api_id),
                unread_count = CASE ?
                    WHEN 'increment' THEN COALESCE(unread_count, 0) + ?
                    WHEN 'set' THEN ?
                    ELSE unread_count
                END,
                conversation_timestamp = COALESCE(?, conversation_timestamp),
                data = json_patch(data, ?)
             WHERE session_id = ? AND id = ?",
        )
        .bind(&chat.api_id)
        .bind(mode)
        .bind(amount)
        .bind(amount)
        .bind(chat.conversation_timestamp)
        .bind(to_json(&chat.data)?)
        .bind(session_id)
        .bind(&chat.id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::NotFound(format!("chat {}", chat.id)));
        }
        Ok(())
    }

    async fn delete_chats(&self, session_id: &str, ids: &[String]) -> Result<u64> {
        let mut tx = self.begin_write().await?;
        let mut removed = 0;
        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM chats WHERE session_id = ");
            qb.push_bind(session_id);
            qb.push(" AND id");
            push_in_list(&mut qb, chunk);
            removed += qb.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }

    async fn chat_exists(&self, session_id: &str, id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM chats WHERE session_id = ? AND id = ?")
            .bind(session_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn chat_pk_ids(&self, session_id: &str, ids: &[String]) -> Result<HashMap<String, i64>> {
        let mut map = HashMap::new();
        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, pk_id FROM chats WHERE session_id = ");
            qb.push_bind(session_id);
            qb.push(" AND id");
            push_in_list(&mut qb, chunk);
            for row in qb.build().fetch_all(&self.pool).await? {
                map.insert(row.try_get("id")?, row.try_get("pk_id")?);
            }
        }
        Ok(map)
    }

    async fn get_chat(&self, session_id: &str, id: &str) -> Result<Option<Stored<ChatRecord>>> {
        let row = sqlx::query("SELECT * FROM chats WHERE session_id = ? AND id = ?")
            .bind(session_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(chat_from_row).transpose()
    }

    async fn list_chat_ids(&self, session_id: &str) -> Result<Vec<String>> {
        Ok(
            sqlx::query_scalar("SELECT id FROM chats WHERE session_id = ? ORDER BY pk_id")
                .bind(session_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }
}

// ─── ContactStore ─────────────────────────────────────────────────────────────

#[async_trait]
impl ContactStore for SqlxStore {
    async fn upsert_contact(&self, session_id: &str, contact: &ContactRecord) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO contacts (session_id, id, api_id, name, notify, verified_name, img_url, data)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(session_id, id) DO UPDATE SET
                api_id = COALESCE(excluded.api_id, contacts.api_id),
                name = COALESCE(excluded.name, contacts.name),
                notify = COALESCE(excluded.notify, contacts.notify),
                verified_name = COALESCE(excluded.verified_name, contacts.verified_name),
                img_url = COALESCE(excluded.img_url, contacts.img_url),
                data = json_patch(contacts.data, excluded.data)
             RETURNING pk_id",
        )
        .bind(session_id)
        .bind(&contact.id)
        .bind(&contact.api_id)
        .bind(&contact.name)
        .bind(&contact.notify)
        .bind(&contact.verified_name)
        .bind(&contact.img_url)
        .bind(to_json(&contact.data)?)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("pk_id")?)
    }

    async fn update_contact(&self, session_id: &str, contact: &ContactRecord) -> Result<()> {
        let affected = sqlx::query(
            "UPDATE contacts SET
                api_id = COALESCE(?, api_id),
                name = COALESCE(?, name),
                notify = COALESCE(?, notify),
                verified_name = COALESCE(?, verified_name),
                img_url = COALESCE(?, img_url),
                data = json_patch(data, ?)
             WHERE session_id = ? AND id = ?",
        )
        .bind(&contact.api_id)
        .bind(&contact.name)
        .bind(&contact.notify)
        .bind(&contact.verified_name)
        .bind(&contact.img_url)
        .bind(to_json(&contact.data)?)
        .bind(session_id)
        .bind(&contact.id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::NotFound(format!("contact {}", contact.id)));
        }
        Ok(())
    }

    async fn contacts_without_name(&self, session_id: &str) -> Result<Vec<ContactRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM contacts WHERE session_id = ? AND name IS NULL ORDER BY pk_id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| contact_from_row(r).map(|s| s.record))
            .collect()
    }

    async fn contacts_without_image(&self, session_id: &str) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar(
            "SELECT id FROM contacts WHERE session_id = ? AND img_url IS NULL ORDER BY pk_id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn set_contact_name(&self, session_id: &str, id: &str, name: &str) -> Result<()> {
        let affected = sqlx::query("UPDATE contacts SET name = ? WHERE session_id = ? AND id = ?")
            .bind(name)
            .bind(session_id)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(StoreError::NotFound(format!("contact {id}")));
        }
        Ok(())
    }

    async fn set_contact_image(&self, session_id: &str, id: &str, img_url: &str) -> Result<()> {
        let affected =
            sqlx::query("UPDATE contacts SET img_url = ? WHERE session_id = ? AND id = ?")
                .bind(img_url)
                .bind(session_id)
                .bind(id)
                .execute(&self.pool)
                .await?
                .rows_affected();
        if affected == 0 {
            return Err(StoreError::NotFound(format!("contact {id}")));
        }
        Ok(())
    }

    async fn get_contact(
        &self,
        session_id: &str,
        id: &str,
    ) -> Result<Option<Stored<ContactRecord>>> {
        let row = sqlx::query("SELECT * FROM contacts WHERE session_id = ? AND id = ?")
            .bind(session_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(contact_from_row).transpose()
    }
}

// ─── MessageStore ─────────────────────────────────────────────────────────────

#[async_trait]
impl MessageStore for SqlxStore {
    async fn insert_messages(
        &self,
        session_id: &str,
        messages: &[MessageRecord],
        is_latest: bool,
    ) -> Result<u64> {
        let mut tx = self.begin_write().await?;

        if is_latest {
            sqlx::query("DELETE FROM messages WHERE session_id = ?")
                .bind(session_id)
                .execute(&mut *tx)
                .await?;
        }

        let sql = format!("{INSERT_MESSAGE} ON CONFLICT(session_id, remote_jid, id) DO NOTHING");
        let mut inserted = 0;
        for message in messages {
            inserted += insert_message(&mut tx, &sql, session_id, message).await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn upsert_message(&self, session_id: &str, message: &MessageRecord) -> Result<i64> {
        let row = sqlx::query(&format!(
            "{INSERT_MESSAGE}
             ON CONFLICT(session_id, remote_jid, id) DO UPDATE SET
                api_id = COALESCE(excluded.api_id, messages.api_id),
                chat_id = COALESCE(excluded.chat_id, messages.chat_id),
                message_timestamp = COALESCE(excluded.message_timestamp, messages.message_timestamp),
                user_receipt = CASE excluded.user_receipt
                    WHEN '[]' THEN messages.user_receipt ELSE excluded.user_receipt END,
                reactions = CASE excluded.reactions
                    WHEN '[]' THEN messages.reactions ELSE excluded.reactions END,
                data = json_patch(messages.data, excluded.data)
             RETURNING pk_id"
        ))
        .bind(session_id)
        .bind(&message.remote_jid)
        .bind(&message.id)
        .bind(&message.api_id)
        .bind(message.chat_id)
        .bind(message.message_timestamp)
        .bind(serde_json::to_string(&message.user_receipt)?)
        .bind(serde_json::to_string(&message.reactions)?)
        .bind(to_json(&message.data)?)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("pk_id")?)
    }

    async fn recreate_message(
        &self,
        session_id: &str,
        key: &MessageRef,
        merge: &MessageMerge,
    ) -> Result<MessageRecord> {
        let mut tx = self.begin_write().await?;

        let row = sqlx::query(
            "SELECT * FROM messages WHERE session_id = ? AND remote_jid = ? AND id = ?",
        )
        .bind(session_id)
        .bind(&key.remote_jid)
        .bind(&key.id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Err(not_found_message(key));
        };

        let previous = message_from_row(&row)?.record;
        let mut merged = merge(previous);

        sqlx::query("DELETE FROM messages WHERE session_id = ? AND remote_jid = ? AND id = ?")
            .bind(session_id)
            .bind(&key.remote_jid)
            .bind(&key.id)
            .execute(&mut *tx)
            .await?;

        merged.chat_id = sqlx::query_scalar("SELECT pk_id FROM chats WHERE session_id = ? AND id = ?")
            .bind(session_id)
            .bind(&merged.remote_jid)
            .fetch_optional(&mut *tx)
            .await?;

        insert_message(&mut tx, INSERT_MESSAGE, session_id, &merged).await?;
        tx.commit().await?;
        Ok(merged)
    }

    async fn update_receipts(
        &self,
        session_id: &str,
        key: &MessageRef,
        merge: &ReceiptMerge,
    ) -> Result<Vec<UserReceipt>> {
        self.rewrite_list(session_id, key, "user_receipt", merge).await
    }

    async fn update_reactions(
        &self,
        session_id: &str,
        key: &MessageRef,
        merge: &ReactionMerge,
    ) -> Result<Vec<Reaction>> {
        self.rewrite_list(session_id, key, "reactions", merge).await
    }

    async fn delete_chat_messages(
        &self,
        session_id: &str,
        remote_jid: &str,
    ) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar(
            "DELETE FROM messages WHERE session_id = ? AND remote_jid = ? RETURNING id",
        )
        .bind(session_id)
        .bind(remote_jid)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete_messages(
        &self,
        session_id: &str,
        remote_jid: &str,
        ids: &[String],
    ) -> Result<Vec<String>> {
        let mut tx = self.begin_write().await?;
        let mut removed = Vec::new();
        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM messages WHERE session_id = ");
            qb.push_bind(session_id);
            qb.push(" AND remote_jid = ");
            qb.push_bind(remote_jid);
            qb.push(" AND id");
            push_in_list(&mut qb, chunk);
            qb.push(" RETURNING id");
            for row in qb.build().fetch_all(&mut *tx).await? {
                removed.push(row.try_get("id")?);
            }
        }
        tx.commit().await?;
        Ok(removed)
    }

    async fn get_message(
        &self,
        session_id: &str,
        key: &MessageRef,
    ) -> Result<Option<Stored<MessageRecord>>> {
        let row = sqlx::query(
            "SELECT * FROM messages WHERE session_id = ? AND remote_jid = ? AND id = ?",
        )
        .bind(session_id)
        .bind(&key.remote_jid)
        .bind(&key.id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(message_from_row).transpose()
    }
}

// ─── Row mapping ──────────────────────────────────────────────────────────────

async fn insert_message(
    conn: &mut SqliteConnection,
    sql: &str,
    session_id: &str,
    message: &MessageRecord,
) -> Result<u64> {
    Ok(sqlx::query(sql)
        .bind(session_id)
        .bind(&message.remote_jid)
        .bind(&message.id)
        .bind(&message.api_id)
        .bind(message.chat_id)
        .bind(message.message_timestamp)
        .bind(serde_json::to_string(&message.user_receipt)?)
        .bind(serde_json::to_string(&message.reactions)?)
        .bind(to_json(&message.data)?)
        .execute(conn)
        .await?
        .rows_affected())
}

fn push_in_list<'a>(qb: &mut QueryBuilder<'a, Sqlite>, ids: &'a [String]) {
    qb.push(" IN (");
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(id.as_str());
    }
    list.push_unseparated(")");
}

fn not_found_message(key: &MessageRef) -> StoreError {
    StoreError::NotFound(format!("message {} in {}", key.id, key.remote_jid))
}

fn to_json(data: &Map<String, Value>) -> Result<String> {
    Ok(serde_json::to_string(data)?)
}

fn parse_map(row: &SqliteRow, column: &str) -> Result<Map<String, Value>> {
    let raw: String = row.try_get(column)?;
    Ok(serde_json::from_str(&raw)?)
}

fn parse_list<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<Vec<T>> {
    let raw: String = row.try_get(column)?;
    Ok(serde_json::from_str(&raw)?)
}

fn chat_from_row(row: &SqliteRow) -> Result<Stored<ChatRecord>> {
    Ok(Stored {
        pk_id: row.try_get("pk_id")?,
        record: ChatRecord {
            id: row.try_get("id")?,
            api_id: row.try_get("api_id")?,
            unread_count: row.try_get("unread_count")?,
            conversation_timestamp: row.try_get("conversation_timestamp")?,
            data: parse_map(row, "data")?,
        },
    })
}

fn contact_from_row(row: &SqliteRow) -> Result<Stored<ContactRecord>> {
    Ok(Stored {
        pk_id: row.try_get("pk_id")?,
        record: ContactRecord {
            id: row.try_get("id")?,
            api_id: row.try_get("api_id")?,
            name: row.try_get("name")?,
            notify: row.try_get("notify")?,
            verified_name: row.try_get("verified_name")?,
            img_url: row.try_get("img_url")?,
            data: parse_map(row, "data")?,
        },
    })
}

fn message_from_row(row: &SqliteRow) -> Result<Stored<MessageRecord>> {
    Ok(Stored {
        pk_id: row.try_get("pk_id")?,
        record: MessageRecord {
            remote_jid: row.try_get("remote_jid")?,
            id: row.try_get("id")?,
            api_id: row.try_get("api_id")?,
            chat_id: row.try_get("chat_id")?,
            message_timestamp: row.try_get("message_timestamp")?,
            user_receipt: parse_list(row, "user_receipt")?,
            reactions: parse_list(row, "reactions")?,
            data: parse_map(row, "data")?,
        },
    })
}
