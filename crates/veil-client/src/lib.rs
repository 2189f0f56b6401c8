//! Client core for Veil links.
//!
//! [`LinkManager`] gates link creation behind a wallet connection and keeps a
//! local session so a returning owner lands straight on their link.
//! [`InboxPoller`] keeps an owner's inbox fresh by re-fetching it on an
//! interval, discarding any response that was overtaken by a newer one.
//! Both talk to the owner/message store through [`LinkStore`].

pub mod compose;
pub mod config;
pub mod error;
pub mod link;
pub mod poller;
pub mod routes;
pub mod session;
pub mod store;
pub mod token;
pub mod wallet;

pub use config::ClientConfig;
pub use error::{ClientError, StoreError};
pub use link::{LinkForm, LinkManager};
pub use poller::{InboxPoller, InboxView, PollHandle};
pub use routes::AppRoute;
pub use session::{FileSessionStore, LocalSession, MemorySessionStore, SessionCache, SessionStore};
pub use store::{HttpStore, LinkStore, MemoryStore, NewOwner};
pub use wallet::{InjectedWallet, WalletConnector, WalletStatus};
