//! Chat reference resolution: chat JID to internal chat key.

use crate::error::Result;
use crate::store::ChatStore;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Clone)]
pub struct ChatResolver {
    session_id: String,
    store: Arc<dyn ChatStore>,
}

impl ChatResolver {
    pub fn new(session_id: impl Into<String>, store: Arc<dyn ChatStore>) -> Self {
        Self {
            session_id: session_id.into(),
            store,
        }
    }

    /// One bulk lookup for a batch; duplicate and empty JIDs are collapsed.
    /// JIDs with no stored chat are absent from the map.
    pub async fn resolve<'a, I>(&self, jids: I) -> Result<HashMap<String, i64>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: Vec<String> = jids
            .into_iter()
            .filter(|jid| !jid.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }
        self.store.chat_pk_ids(&self.session_id, &unique).await
    }

    pub async fn exists(&self, jid: &str) -> Result<bool> {
        self.store.chat_exists(&self.session_id, jid).await
    }
}
