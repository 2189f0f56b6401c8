use std::path::PathBuf;
use std::time::Duration;

/// Client settings. `Default` matches the hosted app; `from_env` lets a
/// deployment point the client elsewhere.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Veil HTTP API.
    /// Env: `VEIL_API_URL`
    pub api_base_url: String,

    /// Public URL links are shared under.
    /// Env: `VEIL_APP_URL`
    pub app_base_url: String,

    /// Env: `VEIL_POLL_INTERVAL_MS`
    pub poll_interval: Duration,

    /// How long to wait for a wallet to report a connection before showing
    /// the creation form.
    /// Env: `VEIL_WALLET_SETTLE_MS`
    pub wallet_settle_timeout: Duration,

    /// Directory holding the local session file.
    /// Env: `VEIL_SESSION_DIR`
    pub session_dir: PathBuf,

    /// Env: `VEIL_HTTP_TIMEOUT_SECS`
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000".into(),
            app_base_url: "https://secret-message-miniapp.vercel.app".into(),
            poll_interval: Duration::from_millis(3000),
            wallet_settle_timeout: Duration::from_millis(3000),
            session_dir: PathBuf::from("."),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Load overrides from the environment (and `.env` if present). Unset or
    /// unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str| {
            var(key)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
        };

        Self {
            api_base_url: var("VEIL_API_URL").unwrap_or(defaults.api_base_url),
            app_base_url: var("VEIL_APP_URL").unwrap_or(defaults.app_base_url),
            poll_interval: millis("VEIL_POLL_INTERVAL_MS").unwrap_or(defaults.poll_interval),
            wallet_settle_timeout: millis("VEIL_WALLET_SETTLE_MS")
                .unwrap_or(defaults.wallet_settle_timeout),
            session_dir: var("VEIL_SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_dir),
            http_timeout: var("VEIL_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_hosted_app() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.wallet_settle_timeout, Duration::from_secs(3));
        assert!(config.app_base_url.starts_with("https://"));
    }

    #[test]
    fn env_overrides_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("VEIL_API_URL", "http://api.internal:8080"),
            ("VEIL_POLL_INTERVAL_MS", "500"),
            ("VEIL_WALLET_SETTLE_MS", "soon"),
            ("VEIL_SESSION_DIR", "/var/lib/veil"),
            ("VEIL_HTTP_TIMEOUT_SECS", "5"),
        ]);
        let config = ClientConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base_url, "http://api.internal:8080");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.session_dir, PathBuf::from("/var/lib/veil"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        // Unparseable and unset values fall back.
        assert_eq!(config.wallet_settle_timeout, Duration::from_secs(3));
        assert_eq!(config.app_base_url, ClientConfig::default().app_base_url);
    }
}
