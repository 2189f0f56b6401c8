//! The local session: a single cached record tying a wallet to the link it
//! created, so a returning owner can skip the creation form.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClientConfig;

/// Fixed storage key of the session record.
pub const SESSION_KEY: &str = "secretMessageSession";

/// Records written with any other version are discarded on load.
pub const SESSION_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSession {
    pub version: u32,
    pub link_id: String,
    /// Always lowercase.
    pub wallet_address: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

impl LocalSession {
    pub fn new(link_id: &str, wallet_address: &str, name: &str) -> Self {
        Self {
            version: SESSION_VERSION,
            link_id: link_id.to_string(),
            wallet_address: wallet_address.to_lowercase(),
            name: name.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// The only validity predicate: the record belongs to the connected wallet.
    pub fn belongs_to(&self, wallet_address: &str) -> bool {
        self.wallet_address.to_lowercase() == wallet_address.to_lowercase()
    }
}

/// Durable storage for one serialized session record.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> io::Result<Option<String>>;
    fn save(&self, raw: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// Keeps the record in `<dir>/secretMessageSession.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{SESSION_KEY}.json")),
        }
    }

    /// Store under the configured `session_dir`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.session_dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, raw: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write then rename so a crash never leaves a half-written record.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with raw contents, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    fn slot(&self) -> io::Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.slot
            .lock()
            .map_err(|e| io::Error::other(format!("session lock poisoned: {e}")))
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, raw: &str) -> io::Result<()> {
        *self.slot()? = Some(raw.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}

/// Typed access to the session record. Unreadable, corrupt or outdated
/// records behave as if absent and are removed.
pub struct SessionCache {
    store: Box<dyn SessionStore>,
}

impl SessionCache {
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn load(&self) -> Option<LocalSession> {
        let raw = match self.store.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read local session: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<LocalSession>(&raw) {
            Ok(session) if session.version == SESSION_VERSION => Some(session),
            Ok(session) => {
                warn!("Discarding local session with version {}", session.version);
                self.clear();
                None
            }
            Err(e) => {
                warn!("Discarding corrupt local session: {}", e);
                self.clear();
                None
            }
        }
    }

    /// The record, only if it belongs to `wallet_address`. A record left by
    /// another wallet is removed.
    pub fn load_for(&self, wallet_address: &str) -> Option<LocalSession> {
        let session = self.load()?;
        if session.belongs_to(wallet_address) {
            return Some(session);
        }

        debug!("Local session belongs to another wallet, clearing");
        self.clear();
        None
    }

    pub fn save(&self, session: &LocalSession) -> io::Result<()> {
        let raw = serde_json::to_string(session)?;
        self.store.save(&raw)
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear local session: {}", e);
        }
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache").finish_non_exhaustive()
    }
}
