//! Session configuration.
//!
//! Routes, timeouts, storage names, and the monitored activity signals are
//! consumed by the core, never computed by it. Configuration is stored at
//! `~/.config/dashguard/config.json`; a missing file means defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::ActivitySignal;
use crate::token::{
    DurableStore, FileCookieJar, KeyringStore, SessionFile, StorePolicy, TokenStore,
};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "dashguard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment overrides
const ENV_API_URL: &str = "DASHGUARD_API_URL";
const ENV_SESSION_TIMEOUT_MS: &str = "DASHGUARD_SESSION_TIMEOUT_MS";

/// Where the durable copy of the token lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurableBackend {
    /// `session.json` in the cache directory
    #[default]
    File,
    /// OS keychain (macOS Keychain, Windows Credential Manager, Linux keyutils)
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin of the remote authentication service
    pub api_base_url: String,
    /// Inactivity window before a forced logout
    pub session_timeout_ms: u64,
    /// Lifetime of the cookie mirror
    pub token_ttl_hours: i64,
    pub login_route: String,
    pub dashboard_route: String,
    pub storage_key: String,
    pub cookie_name: String,
    pub durable_store: DurableBackend,
    pub activity_signals: Vec<ActivitySignal>,
    /// Timeout for calls to the authentication service
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            session_timeout_ms: 15 * 60 * 1000,
            token_ttl_hours: 24,
            login_route: "/login".to_string(),
            dashboard_route: "/dashboard".to_string(),
            storage_key: "auth_token".to_string(),
            cookie_name: "auth_token".to_string(),
            durable_store: DurableBackend::File,
            activity_signals: ActivitySignal::DEFAULT_SET.to_vec(),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load from the config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Ok(raw) = std::env::var(ENV_SESSION_TIMEOUT_MS) {
            match raw.parse() {
                Ok(ms) => self.session_timeout_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", ENV_SESSION_TIMEOUT_MS),
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// The cookie carries `Secure` when the service origin is HTTPS.
    pub fn is_secure_origin(&self) -> bool {
        Url::parse(&self.api_base_url)
            .map(|url| url.scheme() == "https")
            .unwrap_or(false)
    }

    pub fn store_policy(&self) -> StorePolicy {
        StorePolicy {
            storage_key: self.storage_key.clone(),
            cookie_name: self.cookie_name.clone(),
            ttl: chrono::Duration::hours(self.token_ttl_hours),
            secure: self.is_secure_origin(),
        }
    }

    /// Token store for this host: the configured durable medium plus the
    /// cookie jar, both rooted at `cache_dir`.
    pub fn open_token_store(&self, cache_dir: PathBuf) -> TokenStore {
        let durable: Box<dyn DurableStore> = match self.durable_store {
            DurableBackend::File => Box::new(SessionFile::new(cache_dir.clone())),
            DurableBackend::Keyring => Box::new(KeyringStore::new()),
        };
        TokenStore::new(durable, Box::new(FileCookieJar::new(cache_dir)), self.store_policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.login_route, "/login");
        assert_eq!(config.dashboard_route, "/dashboard");
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.session_timeout(), Duration::from_secs(15 * 60));
        assert_eq!(config.activity_signals.len(), 5);
        assert_eq!(config.durable_store, DurableBackend::File);
    }

    #[test]
    fn test_opened_store_reads_durable_copy_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();

        config.open_token_store(dir.path().to_path_buf()).store("a.b.c");
        // Without the cookie mirror the durable copy alone must carry the session
        std::fs::remove_file(dir.path().join("cookies.json")).unwrap();

        let reopened = config.open_token_store(dir.path().to_path_buf());
        assert_eq!(reopened.retrieve().as_deref(), Some("a.b.c"));

        reopened.clear();
        assert_eq!(config.open_token_store(dir.path().to_path_buf()).retrieve(), None);
    }

    #[test]
    fn test_durable_backend_names() {
        let config: Config = serde_json::from_str(r#"{"durable_store": "keyring"}"#).unwrap();
        assert_eq!(config.durable_store, DurableBackend::Keyring);
    }

    #[test]
    fn test_secure_origin() {
        let mut config = Config::default();
        assert!(!config.is_secure_origin());
        assert!(!config.store_policy().secure);

        config.api_base_url = "https://api.example.com".to_string();
        assert!(config.is_secure_origin());
        assert!(config.store_policy().secure);

        config.api_base_url = "not a url".to_string();
        assert!(!config.is_secure_origin());
    }

    #[test]
    fn test_partial_config_file_fills_defaults() {
        let json = r#"{"session_timeout_ms": 1000, "activity_signals": ["key-down", "click"]}"#;
        let config: Config = serde_json::from_str(json).expect("config should parse");

        assert_eq!(config.session_timeout_ms, 1000);
        assert_eq!(
            config.activity_signals,
            vec![ActivitySignal::KeyDown, ActivitySignal::Click]
        );
        assert_eq!(config.login_route, "/login");
    }
}
