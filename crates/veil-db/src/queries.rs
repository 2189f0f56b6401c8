use crate::Database;
use crate::models::{MessageRow, OwnerRow};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE;
use uuid::Uuid;

/// Fields a caller supplies for a new owner. Id and timestamp are assigned here.
#[derive(Debug, Clone, Copy)]
pub struct CreateOwner<'a> {
    pub unique_id: &'a str,
    pub name: &'a str,
    pub wallet_address: &'a str,
}

impl Database {
    // -- Owners --

    /// Insert a new owner. Returns `None` if `unique_id` is already taken.
    pub fn create_owner(&self, new: CreateOwner<'_>) -> Result<Option<OwnerRow>> {
        let row = OwnerRow {
            id: Uuid::new_v4().to_string(),
            unique_id: new.unique_id.to_string(),
            name: new.name.to_string(),
            wallet_address: new.wallet_address.to_string(),
            created_at: now_timestamp(),
        };

        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO owners (id, unique_id, name, wallet_address, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    row.id,
                    row.unique_id,
                    row.name,
                    row.wallet_address,
                    row.created_at
                ],
            );

            match inserted {
                Ok(_) => Ok(Some(row)),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_owner_by_unique_id(&self, unique_id: &str) -> Result<Option<OwnerRow>> {
        self.with_conn(|conn| query_owner_by_unique_id(conn, unique_id))
    }

    // -- Messages --

    pub fn insert_message(&self, owner_id: &str, text: &str) -> Result<MessageRow> {
        let row = MessageRow {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            text: text.to_string(),
            created_at: now_timestamp(),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, owner_id, text, sender_address, tx_hash, created_at)
                 VALUES (?1, ?2, ?3, NULL, NULL, ?4)",
                rusqlite::params![row.id, row.owner_id, row.text, row.created_at],
            )?;
            Ok(row)
        })
    }

    /// All messages for an owner, newest first.
    pub fn get_messages_for_owner(&self, owner_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, owner_id))
    }

    /// Returns false if no such message belongs to the owner.
    pub fn delete_message(&self, owner_id: &str, message_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM messages WHERE id = ?1 AND owner_id = ?2",
                [message_id, owner_id],
            )?;
            Ok(affected > 0)
        })
    }
}

/// Fixed-width RFC 3339 so lexical order matches time order.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_owner_by_unique_id(conn: &Connection, unique_id: &str) -> Result<Option<OwnerRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, unique_id, name, wallet_address, created_at FROM owners WHERE unique_id = ?1",
    )?;

    let row = stmt
        .query_row([unique_id], |row| {
            Ok(OwnerRow {
                id: row.get(0)?,
                unique_id: row.get(1)?,
                name: row.get(2)?,
                wallet_address: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_messages(conn: &Connection, owner_id: &str) -> Result<Vec<MessageRow>> {
    // rowid breaks ties between messages stored within the same microsecond
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, text, created_at
         FROM messages
         WHERE owner_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;

    let rows = stmt
        .query_map([owner_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                text: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(db: &Database, unique_id: &str) -> OwnerRow {
        db.create_owner(CreateOwner {
            unique_id,
            name: "Ava",
            wallet_address: "0xabc",
        })
        .unwrap()
        .unwrap()
    }

    #[test]
    fn unique_id_is_a_hard_constraint() {
        let db = Database::open_in_memory().unwrap();
        owner(&db, "T0k3n_-abc");

        let dup = db
            .create_owner(CreateOwner {
                unique_id: "T0k3n_-abc",
                name: "Someone else",
                wallet_address: "0xdef",
            })
            .unwrap();
        assert!(dup.is_none());
    }

    #[test]
    fn other_constraint_failures_are_errors() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_blocked BEFORE INSERT ON owners
                 WHEN NEW.name = 'blocked'
                 BEGIN SELECT RAISE(ABORT, 'blocked name'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let err = db.create_owner(CreateOwner {
            unique_id: "T0k3n_-abc",
            name: "blocked",
            wallet_address: "0xabc",
        });
        assert!(err.is_err());
    }

    #[test]
    fn owner_lookup_by_unique_id() {
        let db = Database::open_in_memory().unwrap();
        let created = owner(&db, "abcdefghij");

        let found = db.get_owner_by_unique_id("abcdefghij").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "Ava");
        assert!(db.get_owner_by_unique_id("missing123").unwrap().is_none());
    }

    #[test]
    fn messages_are_listed_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let ava = owner(&db, "abcdefghij");
        let other = owner(&db, "0123456789");

        for text in ["first", "second", "third"] {
            db.insert_message(&ava.id, text).unwrap();
        }
        db.insert_message(&other.id, "not for ava").unwrap();

        let texts: Vec<String> = db
            .get_messages_for_owner(&ava.id)
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["third", "second", "first"]);
    }

    #[test]
    fn delete_is_scoped_to_owner() {
        let db = Database::open_in_memory().unwrap();
        let ava = owner(&db, "abcdefghij");
        let other = owner(&db, "0123456789");
        let msg = db.insert_message(&ava.id, "hello").unwrap();

        assert!(!db.delete_message(&other.id, &msg.id).unwrap());
        assert!(db.delete_message(&ava.id, &msg.id).unwrap());
        assert!(!db.delete_message(&ava.id, &msg.id).unwrap());
        assert!(db.get_messages_for_owner(&ava.id).unwrap().is_empty());
    }

    #[test]
    fn message_needs_existing_owner() {
        let db = Database::open_in_memory().unwrap();
        let orphan = db.insert_message(&Uuid::new_v4().to_string(), "hello");
        assert!(orphan.is_err());
    }
}
