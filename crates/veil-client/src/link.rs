use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use veil_types::{ValidationError, validate};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::routes::AppRoute;
use crate::session::{LocalSession, SessionCache};
use crate::store::{LinkStore, NewOwner};
use crate::token::generate_link_id;
use crate::wallet::{WalletConnector, WalletStatus, short_address};

/// What the owner submits on the entry page.
#[derive(Debug, Clone, Default)]
pub struct LinkForm {
    pub name: String,
    pub terms_accepted: bool,
}

/// Decides whether an owner needs the creation form and creates links.
pub struct LinkManager {
    store: Arc<dyn LinkStore>,
    wallet: Arc<dyn WalletConnector>,
    sessions: SessionCache,
    app_base_url: String,
    settle_timeout: Duration,
    in_flight: AtomicBool,
}

impl LinkManager {
    pub fn new(
        store: Arc<dyn LinkStore>,
        wallet: Arc<dyn WalletConnector>,
        sessions: SessionCache,
        config: &ClientConfig,
    ) -> Self {
        Self {
            store,
            wallet,
            sessions,
            app_base_url: config.app_base_url.trim_end_matches('/').to_string(),
            settle_timeout: config.wallet_settle_timeout,
            in_flight: AtomicBool::new(false),
        }
    }

    /// The cached link for `connected_wallet`, if the local session belongs to
    /// it. A session left by another wallet is cleared.
    pub fn restore_for(&self, connected_wallet: &str) -> Option<String> {
        self.sessions.load_for(connected_wallet).map(|s| s.link_id)
    }

    /// Entry-page check: give the wallet a bounded window to report a
    /// connection, then look up its session. `None` means show the form.
    pub async fn restore_session(&self) -> Option<String> {
        let address = self.settled_wallet().await?;
        let link_id = self.restore_for(&address);
        if let Some(link_id) = &link_id {
            info!("Restored link {} for {}", link_id, short_address(&address));
        }
        link_id
    }

    async fn settled_wallet(&self) -> Option<String> {
        if let Some(address) = self.wallet.current_address() {
            return Some(address);
        }

        let mut status = self.wallet.status();
        let settled = tokio::time::timeout(
            self.settle_timeout,
            status.wait_for(|s| matches!(s, WalletStatus::Connected(_))),
        )
        .await;

        match settled {
            Ok(Ok(status)) => status.address().map(str::to_string),
            Ok(Err(_)) => None,
            Err(_) => {
                debug!("Wallet did not connect within {:?}", self.settle_timeout);
                None
            }
        }
    }

    /// Create a link for the connected wallet, connecting it first if needed.
    ///
    /// Only one submission may be in flight; each call mints a new token, so a
    /// second concurrent call is rejected rather than creating a second owner.
    /// Store failures are returned as-is and never retried.
    pub async fn create_link(&self, form: &LinkForm) -> Result<String, ClientError> {
        let name = validate::owner_name(&form.name)?;
        if !form.terms_accepted {
            return Err(ValidationError::TermsNotAccepted.into());
        }

        let _guard = InFlight::acquire(&self.in_flight).ok_or(ClientError::SubmissionInFlight)?;

        let address = self.connected_wallet().await?;
        let wallet_address = validate::wallet_address(&address)?;

        let owner = self
            .store
            .create_owner(&NewOwner {
                unique_id: generate_link_id(),
                name: name.to_string(),
                wallet_address: wallet_address.clone(),
            })
            .await?;

        let session = LocalSession::new(&owner.unique_id, &wallet_address, &owner.name);
        if let Err(e) = self.sessions.save(&session) {
            // The link exists either way; the owner just won't be redirected next time.
            warn!("Failed to persist local session: {}", e);
        }

        info!("Created link {} for {}", owner.unique_id, short_address(&wallet_address));
        Ok(owner.unique_id)
    }

    /// Wallet connection always resolves before anything is written.
    async fn connected_wallet(&self) -> Result<String, ClientError> {
        if let Some(address) = self.wallet.current_address() {
            return Ok(address);
        }
        if let Some(address) = self.pending_connection().await {
            return Ok(address);
        }
        if !self.wallet.is_available() {
            return Err(ClientError::WalletUnavailable);
        }

        debug!("Wallet not connected, connecting before link creation");
        self.wallet.connect().await.map_err(|e| match e {
            ClientError::WalletUnavailable | ClientError::WalletConnect(_) => e,
            other => ClientError::WalletConnect(other.to_string()),
        })
    }

    /// A connection already under way is awaited rather than started again.
    /// `None` if nothing was pending or it ended without an address.
    async fn pending_connection(&self) -> Option<String> {
        let mut status = self.wallet.status();
        if !matches!(*status.borrow(), WalletStatus::Connecting) {
            return None;
        }

        debug!("Wallet connection pending, deferring link creation");
        status
            .wait_for(|s| !matches!(s, WalletStatus::Connecting))
            .await
            .ok()
            .and_then(|s| s.address().map(str::to_string))
    }

    /// True while a `create_link` call is running. Forms disable submit on it.
    pub fn is_creating(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// "Generate new link": forget the cached link.
    pub fn clear_session(&self) {
        self.sessions.clear();
        info!("Local session cleared");
    }

    /// Public URL visitors use to send messages to `link_id`.
    pub fn share_url(&self, link_id: &str) -> String {
        format!(
            "{}{}",
            self.app_base_url,
            AppRoute::Send(link_id.to_string()).path()
        )
    }
}

impl std::fmt::Debug for LinkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkManager")
            .field("app_base_url", &self.app_base_url)
            .field("settle_timeout", &self.settle_timeout)
            .field("in_flight", &self.is_creating())
            .finish_non_exhaustive()
    }
}

/// Holds the submission flag for the duration of one `create_link`.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
