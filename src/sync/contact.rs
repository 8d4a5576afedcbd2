//! Contact Sync
//!
//! Contacts are never deleted here. After bulk writes the handler may fill in
//! missing names and look up missing profile pictures, both behind
//! [`SyncConfig`] switches.

use super::hash::assign_api_id;
use super::normalize::normalize_object;
use super::{Dispatch, Subscriptions};
use crate::bus::EventBus;
use crate::client::ProtocolClient;
use crate::config::SyncConfig;
use crate::events::{EventKind, SyncEvent};
use crate::proto::{Contact, Me};
use crate::store::{ContactRecord, ContactStore};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

const KINDS: &[EventKind] = &[
    EventKind::HistorySet,
    EventKind::ContactsUpsert,
    EventKind::ContactsUpdate,
    EventKind::CredsUpdate,
];

pub struct ContactSync {
    session_id: String,
    store: Arc<dyn ContactStore>,
    client: Arc<dyn ProtocolClient>,
    config: SyncConfig,
    subscriptions: Subscriptions,
}

/// Display name for a contact that has none: its push name, else the user
/// part of its JID.
pub fn derive_name(contact: &ContactRecord) -> String {
    match contact.notify.as_deref() {
        Some(notify) if !notify.is_empty() => notify.to_string(),
        _ => contact
            .id
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

impl ContactSync {
    pub fn new(
        session_id: &str,
        store: Arc<dyn ContactStore>,
        client: Arc<dyn ProtocolClient>,
        config: SyncConfig,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            store,
            client,
            config,
            subscriptions: Subscriptions::default(),
        }
    }

    pub fn start(self: &Arc<Self>, bus: &EventBus) {
        self.subscriptions.attach(bus, KINDS, self);
    }

    pub fn stop(&self, bus: &EventBus) {
        self.subscriptions.detach(bus);
    }

    fn prepare(&self, contact: &Contact) -> ContactRecord {
        let mut doc = normalize_object(&contact.to_object());
        assign_api_id(&self.session_id, &mut doc);
        ContactRecord::from_document(doc)
    }

    /// History snapshot. Contacts are always merged, never replaced.
    pub async fn set(&self, contacts: &[Contact]) {
        if contacts.is_empty() {
            return;
        }
        let written = self.upsert_all(contacts).await;
        self.fill_empty_names().await;
        self.fetch_profile_pictures().await;
        tracing::info!(session = %self.session_id, new_contacts = written, "Synced contacts");
    }

    pub async fn upsert(&self, contacts: &[Contact]) {
        self.upsert_all(contacts).await;
        self.fill_empty_names().await;
        self.fetch_profile_pictures().await;
    }

    pub async fn update(&self, updates: &[Contact]) {
        for update in updates {
            let record = self.prepare(update);
            if record.id.is_empty() {
                tracing::warn!(session = %self.session_id, "Skipping contact update without id");
                continue;
            }
            match self.store.update_contact(&self.session_id, &record).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    tracing::info!(
                        session = %self.session_id,
                        contact = %record.id,
                        "Got update for non existent contact"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        session = %self.session_id,
                        contact = %record.id,
                        "Failed to update contact: {}",
                        e
                    );
                }
            }
        }
        self.fill_empty_names().await;
    }

    /// Store the account's own profile from a credential refresh.
    pub async fn self_upsert(&self, me: &Me) {
        if me.id.is_empty() {
            return;
        }
        let img_url = if self.config.fetch_profile_pictures {
            self.lookup_picture(&me.id).await
        } else {
            None
        };

        let contact = Contact {
            id: me.id.clone(),
            name: me.name.clone(),
            img_url,
            ..Default::default()
        };
        let record = self.prepare(&contact);
        match self.store.upsert_contact(&self.session_id, &record).await {
            Ok(_) => tracing::info!(session = %self.session_id, "Synced self contact"),
            Err(e) => {
                tracing::error!(session = %self.session_id, "Failed to sync self contact: {}", e);
            }
        }
    }

    /// Concurrent upserts; returns how many succeeded.
    async fn upsert_all(&self, contacts: &[Contact]) -> usize {
        let records: Vec<ContactRecord> = contacts
            .iter()
            .map(|c| self.prepare(c))
            .filter(|r| !r.id.is_empty())
            .collect();
        let results = join_all(
            records
                .iter()
                .map(|r| self.store.upsert_contact(&self.session_id, r)),
        )
        .await;

        let mut written = 0;
        for (record, result) in records.iter().zip(results) {
            match result {
                Ok(_) => written += 1,
                Err(e) => tracing::error!(
                    session = %self.session_id,
                    contact = %record.id,
                    "Failed to upsert contact: {}",
                    e
                ),
            }
        }
        written
    }

    async fn fill_empty_names(&self) {
        if !self.config.fill_empty_names {
            return;
        }
        let unnamed = match self.store.contacts_without_name(&self.session_id).await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(session = %self.session_id, "Failed to list unnamed contacts: {}", e);
                return;
            }
        };

        let names: Vec<(String, String)> = unnamed
            .iter()
            .map(|c| (c.id.clone(), derive_name(c)))
            .filter(|(_, name)| !name.is_empty())
            .collect();
        let results = join_all(
            names
                .iter()
                .map(|(id, name)| self.store.set_contact_name(&self.session_id, id, name)),
        )
        .await;
        for ((id, _), result) in names.iter().zip(results) {
            if let Err(e) = result {
                tracing::debug!(session = %self.session_id, contact = %id, "Name fill failed: {}", e);
            }
        }
    }

    /// One lookup per contact without an image, in sequence.
    async fn fetch_profile_pictures(&self) {
        if !self.config.fetch_profile_pictures {
            return;
        }
        let ids = match self.store.contacts_without_image(&self.session_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(session = %self.session_id, "Failed to list contacts without image: {}", e);
                return;
            }
        };

        let mut stored = 0usize;
        for id in &ids {
            let Some(url) = self.lookup_picture(id).await else {
                continue;
            };
            match self.store.set_contact_image(&self.session_id, id, &url).await {
                Ok(()) => stored += 1,
                Err(e) => {
                    tracing::warn!(session = %self.session_id, contact = %id, "Failed to store profile picture: {}", e);
                }
            }
        }
        tracing::debug!(
            session = %self.session_id,
            checked = ids.len(),
            stored,
            "Profile picture pass done"
        );
    }

    async fn lookup_picture(&self, jid: &str) -> Option<String> {
        match self
            .client
            .profile_picture_url(jid, self.config.picture_type)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(session = %self.session_id, contact = %jid, "Profile picture lookup failed: {:#}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Dispatch for ContactSync {
    async fn dispatch(&self, event: &SyncEvent) {
        match event {
            SyncEvent::HistorySet(set) => self.set(&set.contacts).await,
            SyncEvent::ContactsUpsert(contacts) => self.upsert(contacts).await,
            SyncEvent::ContactsUpdate(updates) => self.update(updates).await,
            SyncEvent::CredsUpdate(creds) => {
                if let Some(me) = &creds.me {
                    self.self_upsert(me).await;
                }
            }
            SyncEvent::ChatsUpsert(_)
            | SyncEvent::ChatsUpdate(_)
            | SyncEvent::ChatsDelete(_)
            | SyncEvent::MessagesUpsert(_)
            | SyncEvent::MessagesUpdate(_)
            | SyncEvent::MessagesDelete(_)
            | SyncEvent::ReceiptUpdate(_)
            | SyncEvent::MessagesReaction(_) => {
                tracing::debug!(event = %event.kind(), "Contact sync ignores event");
            }
        }
    }
}
