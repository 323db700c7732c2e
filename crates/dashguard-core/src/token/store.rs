//! Dual-medium token persistence.
//!
//! The token lives in two places: a durable key/value store (the primary copy)
//! and a cookie mirror that request-time code can read without access to the
//! durable store. Writes go to both, reads prefer the durable copy, and clears
//! hit both. Sink failures are logged and absorbed: authentication degrades to
//! "logged out", it never takes the host down.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use super::cookie::{Cookie, SameSite};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt storage data: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),
}

/// Durable key/value medium holding the raw token string.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Cookie medium mirroring the token.
pub trait CookieJar: Send + Sync {
    /// Returns the cookie if present, regardless of expiry.
    fn get(&self, name: &str) -> Result<Option<Cookie>, StoreError>;
    fn set(&self, cookie: Cookie) -> Result<(), StoreError>;
}

/// Names and policy for the two mediums.
#[derive(Debug, Clone)]
pub struct StorePolicy {
    pub storage_key: String,
    pub cookie_name: String,
    pub ttl: Duration,
    /// Set `Secure` on the cookie (origin is HTTPS)
    pub secure: bool,
}

pub struct TokenStore {
    durable: Option<Box<dyn DurableStore>>,
    cookies: Option<Box<dyn CookieJar>>,
    policy: StorePolicy,
}

impl TokenStore {
    pub fn new(
        durable: Box<dyn DurableStore>,
        cookies: Box<dyn CookieJar>,
        policy: StorePolicy,
    ) -> Self {
        Self {
            durable: Some(durable),
            cookies: Some(cookies),
            policy,
        }
    }

    /// A store with no backing mediums. Every operation is a silent no-op and
    /// `retrieve` always returns `None`.
    pub fn detached(policy: StorePolicy) -> Self {
        Self {
            durable: None,
            cookies: None,
            policy,
        }
    }

    pub fn with_durable(mut self, durable: Box<dyn DurableStore>) -> Self {
        self.durable = Some(durable);
        self
    }

    pub fn with_cookies(mut self, cookies: Box<dyn CookieJar>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn policy(&self) -> &StorePolicy {
        &self.policy
    }

    /// Write the token to both mediums.
    pub fn store(&self, token: &str) {
        self.store_at(token, Utc::now());
    }

    pub(crate) fn store_at(&self, token: &str, now: DateTime<Utc>) {
        if let Some(ref durable) = self.durable {
            if let Err(e) = durable.set(&self.policy.storage_key, token) {
                warn!(error = %e, "Failed to write token to durable store");
            }
        }

        if let Some(ref cookies) = self.cookies {
            let cookie = Cookie {
                name: self.policy.cookie_name.clone(),
                value: token.to_string(),
                path: "/".to_string(),
                expires: now + self.policy.ttl,
                same_site: SameSite::Lax,
                secure: self.policy.secure,
            };
            if let Err(e) = cookies.set(cookie) {
                // Durable copy still governs reads
                warn!(error = %e, "Failed to write token cookie");
            }
        }
        debug!("Token stored");
    }

    /// Read the token, durable copy first, then the cookie mirror.
    pub fn retrieve(&self) -> Option<String> {
        self.retrieve_at(Utc::now())
    }

    pub(crate) fn retrieve_at(&self, now: DateTime<Utc>) -> Option<String> {
        if let Some(ref durable) = self.durable {
            match durable.get(&self.policy.storage_key) {
                Ok(Some(token)) if !token.is_empty() => return Some(token),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to read durable store, trying cookie"),
            }
        }

        let cookies = self.cookies.as_ref()?;
        match cookies.get(&self.policy.cookie_name) {
            Ok(Some(cookie)) if !cookie.is_expired_at(now) && !cookie.value.is_empty() => {
                debug!("Token read from cookie mirror");
                Some(cookie.value)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read token cookie");
                None
            }
        }
    }

    /// Remove the durable entry and expire the cookie. Idempotent.
    pub fn clear(&self) {
        if let Some(ref durable) = self.durable {
            if let Err(e) = durable.remove(&self.policy.storage_key) {
                warn!(error = %e, "Failed to remove token from durable store");
            }
        }

        if let Some(ref cookies) = self.cookies {
            let expired = Cookie::expired(&self.policy.cookie_name, self.policy.secure);
            if let Err(e) = cookies.set(expired) {
                warn!(error = %e, "Failed to expire token cookie");
            }
        }
        debug!("Token cleared");
    }
}
