//! Row → API model conversion. A row with a corrupt id is logged and skipped;
//! a corrupt timestamp is logged and defaulted.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use veil_db::models::{MessageRow, OwnerRow};
use veil_types::{Message, Owner};

pub fn owner_from_row(row: OwnerRow) -> Option<Owner> {
    Some(Owner {
        id: parse_id(&row.id, "owner", &row.unique_id)?,
        created_at: parse_timestamp(&row.created_at, &row.unique_id),
        unique_id: row.unique_id,
        name: row.name,
        wallet_address: row.wallet_address,
    })
}

pub fn message_from_row(row: MessageRow) -> Option<Message> {
    Some(Message {
        id: parse_id(&row.id, "message", &row.id)?,
        owner_id: parse_id(&row.owner_id, "owner_id", &row.id)?,
        created_at: parse_timestamp(&row.created_at, &row.id),
        text: row.text,
    })
}

fn parse_id(raw: &str, what: &str, context: &str) -> Option<Uuid> {
    match raw.parse() {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("Skipping row with corrupt {} id '{}' on '{}': {}", what, raw, context, e);
            None
        }
    }
}

fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand through the sqlite shell use "YYYY-MM-DD HH:MM:SS".
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on '{}': {}", raw, context, e);
            DateTime::default()
        })
}
