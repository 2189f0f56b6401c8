//! Types shared by the Veil server, store and client crates.

pub mod api;
pub mod link_id;
pub mod models;
pub mod validate;

pub use models::{Message, Owner};
pub use validate::ValidationError;
