//! Sending side of a link: anyone holding the link can drop a message.

use tracing::debug;

use veil_types::{Message, Owner, validate};

use crate::error::ClientError;
use crate::store::LinkStore;

/// Look up who a link belongs to, for the send page header.
pub async fn resolve_recipient(store: &dyn LinkStore, link_id: &str) -> Result<Owner, ClientError> {
    store
        .owner_by_link(link_id)
        .await?
        .ok_or_else(|| ClientError::NotFound(link_id.to_string()))
}

/// Send an anonymous message. Nothing about the sender is recorded.
pub async fn send_anonymous(
    store: &dyn LinkStore,
    link_id: &str,
    text: &str,
) -> Result<Message, ClientError> {
    let text = validate::message_text(text)?;
    let owner = resolve_recipient(store, link_id).await?;
    let message = store.insert_message(&owner, text).await?;
    debug!("Sent message {} to {}", message.id, link_id);
    Ok(message)
}
