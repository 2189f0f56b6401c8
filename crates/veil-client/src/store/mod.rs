//! Data access for owners and messages.
//!
//! The client only needs four operations from its store: point lookup by
//! link id, insert, ordered scan of an owner's messages, and delete by id.

mod http;
mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use veil_types::{Message, Owner};

use crate::error::StoreError;

pub use http::HttpStore;
pub use memory::MemoryStore;

/// Fields for a new owner; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOwner {
    pub unique_id: String,
    pub name: String,
    pub wallet_address: String,
}

#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Insert a new owner. A taken `unique_id` fails with [`StoreError::Conflict`].
    async fn create_owner(&self, owner: &NewOwner) -> Result<Owner, StoreError>;

    async fn owner_by_link(&self, link_id: &str) -> Result<Option<Owner>, StoreError>;

    /// Every message sent to `owner`, newest first.
    async fn messages_for(&self, owner: &Owner) -> Result<Vec<Message>, StoreError>;

    /// Store an anonymous message. `text` is already validated.
    async fn insert_message(&self, owner: &Owner, text: &str) -> Result<Message, StoreError>;

    /// A missing message fails with [`StoreError::NotFound`].
    async fn delete_message(&self, owner: &Owner, message_id: Uuid) -> Result<(), StoreError>;
}
