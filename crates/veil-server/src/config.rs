//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so `veil` starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Env: `VEIL_HOST`, default `0.0.0.0`
    pub host: String,

    /// Env: `VEIL_PORT`, default `3000`
    pub port: u16,

    /// SQLite file holding owners and messages.
    /// Env: `VEIL_DB_PATH`, default `veil.db`
    pub db_path: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("VEIL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("VEIL_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()?;
        let db_path = std::env::var("VEIL_DB_PATH")
            .unwrap_or_else(|_| "veil.db".into())
            .into();

        Ok(Self {
            host,
            port,
            db_path,
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
