//! Database row types. These map directly to SQLite rows.
//! Distinct from veil-types API models to keep the DB layer independent.

pub struct OwnerRow {
    pub id: String,
    pub unique_id: String,
    pub name: String,
    pub wallet_address: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub owner_id: String,
    pub text: String,
    pub created_at: String,
}
