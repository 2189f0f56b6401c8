use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The person behind a shareable link. Messages sent to the link land in
/// this owner's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: Uuid,
    /// Public, routable link token.
    pub unique_id: String,
    pub name: String,
    /// Lowercased. Only used to correlate a local session, never for access control.
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
}

/// An anonymous message. Carries no sender identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
