use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version = current_version(conn)?;

    if version < 1 {
        info!("Running migration v1 (owners, messages)");
        conn.execute_batch(
            "
            CREATE TABLE owners (
                id              TEXT PRIMARY KEY,
                unique_id       TEXT NOT NULL UNIQUE,
                name            TEXT NOT NULL,
                wallet_address  TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            -- sender_address and tx_hash are kept for schema compatibility
            -- and are always NULL.
            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL REFERENCES owners(id) ON DELETE CASCADE,
                text            TEXT NOT NULL,
                sender_address  TEXT,
                tx_hash         TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_owner
                ON messages(owner_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

pub fn current_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
}
