use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletStatus {
    Disconnected,
    Connecting,
    Connected(String),
}

impl WalletStatus {
    pub fn address(&self) -> Option<&str> {
        match self {
            WalletStatus::Connected(address) => Some(address),
            _ => None,
        }
    }
}

/// The identity gate in front of link creation. How a connection is
/// negotiated is up to the implementation; callers only need an address.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// False when no connector is installed at all.
    fn is_available(&self) -> bool;

    fn current_address(&self) -> Option<String>;

    /// Connect (or return the already connected address).
    async fn connect(&self) -> Result<String, ClientError>;

    fn status(&self) -> watch::Receiver<WalletStatus>;
}

/// A wallet whose address the host already knows, e.g. one injected by the
/// embedding app. `None` means no wallet is installed.
#[derive(Debug)]
pub struct InjectedWallet {
    address: Option<String>,
    status: watch::Sender<WalletStatus>,
}

impl InjectedWallet {
    pub fn new(address: Option<String>) -> Self {
        let (status, _) = watch::channel(WalletStatus::Disconnected);
        Self { address, status }
    }

    /// A wallet that reports as connected from the start.
    pub fn connected(address: impl Into<String>) -> Self {
        let wallet = Self::new(Some(address.into()));
        if let Some(address) = &wallet.address {
            wallet.status.send_replace(WalletStatus::Connected(address.clone()));
        }
        wallet
    }

    pub fn disconnect(&self) {
        self.status.send_replace(WalletStatus::Disconnected);
    }
}

#[async_trait]
impl WalletConnector for InjectedWallet {
    fn is_available(&self) -> bool {
        self.address.is_some()
    }

    fn current_address(&self) -> Option<String> {
        self.status.borrow().address().map(str::to_string)
    }

    async fn connect(&self) -> Result<String, ClientError> {
        let address = self.address.clone().ok_or(ClientError::WalletUnavailable)?;
        self.status.send_replace(WalletStatus::Connecting);
        self.status.send_replace(WalletStatus::Connected(address.clone()));
        info!("Wallet connected: {}", short_address(&address));
        Ok(address)
    }

    fn status(&self) -> watch::Receiver<WalletStatus> {
        self.status.subscribe()
    }
}

/// `0x1234...abcd` form for logs.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
