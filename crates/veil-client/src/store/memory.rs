use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use veil_types::{Message, Owner};

use super::{LinkStore, NewOwner};
use crate::error::StoreError;

/// In-process [`LinkStore`]. Enforces the same unique link id constraint as
/// the SQLite store and can be switched offline to exercise failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
    offline: AtomicBool,
}

#[derive(Debug, Default)]
struct Tables {
    owners: HashMap<String, Owner>,
    /// Insertion order; listing reverses it.
    messages: Vec<Message>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn owner_count(&self) -> usize {
        self.tables().map(|t| t.owners.len()).unwrap_or(0)
    }

    fn tables(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".into()));
        }
        self.inner
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("store lock poisoned: {e}")))
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn create_owner(&self, new: &NewOwner) -> Result<Owner, StoreError> {
        let mut tables = self.tables()?;
        if tables.owners.contains_key(&new.unique_id) {
            return Err(StoreError::Conflict);
        }

        let owner = Owner {
            id: Uuid::new_v4(),
            unique_id: new.unique_id.clone(),
            name: new.name.clone(),
            wallet_address: new.wallet_address.clone(),
            created_at: Utc::now(),
        };
        tables.owners.insert(owner.unique_id.clone(), owner.clone());
        Ok(owner)
    }

    async fn owner_by_link(&self, link_id: &str) -> Result<Option<Owner>, StoreError> {
        Ok(self.tables()?.owners.get(link_id).cloned())
    }

    async fn messages_for(&self, owner: &Owner) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .tables()?
            .messages
            .iter()
            .rev()
            .filter(|m| m.owner_id == owner.id)
            .cloned()
            .collect())
    }

    async fn insert_message(&self, owner: &Owner, text: &str) -> Result<Message, StoreError> {
        let mut tables = self.tables()?;
        if !tables.owners.values().any(|o| o.id == owner.id) {
            return Err(StoreError::NotFound);
        }

        let message = Message {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn delete_message(&self, owner: &Owner, message_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        let before = tables.messages.len();
        tables
            .messages
            .retain(|m| !(m.id == message_id && m.owner_id == owner.id));

        if tables.messages.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
